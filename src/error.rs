use thiserror::Error;

#[derive(Error, Debug)]
pub enum CrawlerError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON deserialization failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML deserialization failed: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Missing environment variable: {0}")]
    MissingEnv(String),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Record store error: {0}")]
    Store(String),

    #[error("Listing crawl aborted: {0}")]
    Aborted(String),
}

pub type Result<T> = std::result::Result<T, CrawlerError>;
