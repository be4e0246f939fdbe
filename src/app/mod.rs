pub mod dedup;
pub mod detail;
pub mod listing;
pub mod orchestrator;
pub mod ports;

pub use orchestrator::{CrawlerDeps, Orchestrator, RunOutcome, RunState};
