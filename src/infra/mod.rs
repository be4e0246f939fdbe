pub mod browserless;
pub mod claude_extractor;
pub mod pacer;
pub mod supabase_store;

pub use browserless::BrowserlessFetcher;
pub use claude_extractor::ClaudeExtractor;
pub use pacer::TokioPacer;
pub use supabase_store::SupabaseRecordStore;
