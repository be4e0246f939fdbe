pub mod clock;
pub mod config;
pub mod constants;
pub mod error;
pub mod logging;
pub mod metrics;
pub mod output;
pub mod resolver;
pub mod storage;
pub mod timestamp;
pub mod types;

// Application layer (use cases + ports) and adapters to external services
pub mod app;
pub mod infra;
