use crate::error::Result;
use crate::types::{CandidateEvent, EventRecord};
use async_trait::async_trait;
use chrono::NaiveDate;
use std::time::Duration;

/// How long and for what a renderer should wait before returning HTML.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FetchRequest {
    pub url: String,
    pub wait_until: String,
    pub timeout_ms: u64,
}

impl FetchRequest {
    pub fn new(url: impl Into<String>, wait_until: impl Into<String>, timeout_ms: u64) -> Self {
        Self {
            url: url.into(),
            wait_until: wait_until.into(),
            timeout_ms,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PageFetch {
    pub success: bool,
    pub html: String,
    pub error: Option<String>,
}

impl PageFetch {
    pub fn ok(html: impl Into<String>) -> Self {
        Self { success: true, html: html.into(), error: None }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self { success: false, html: String::new(), error: Some(error.into()) }
    }

    /// The HTML of a successful, non-empty fetch.
    pub fn into_html(self) -> std::result::Result<String, String> {
        match (self.success, self.html.trim().is_empty()) {
            (true, false) => Ok(self.html),
            (true, true) => Err("empty document".to_string()),
            (false, _) => Err(self.error.unwrap_or_else(|| "unknown fetch error".to_string())),
        }
    }
}

/// Renders a URL (client-side scripts included) and returns its HTML.
/// Failures are reported in the returned [`PageFetch`], never raised.
#[async_trait]
pub trait PageFetcherPort: Send + Sync {
    async fn fetch(&self, request: &FetchRequest) -> PageFetch;
}

/// Turns cleaned listing HTML into candidate events dated on or after `today`.
#[async_trait]
pub trait StructuredExtractorPort: Send + Sync {
    async fn extract(&self, cleaned_html: &str, today: NaiveDate) -> Result<Vec<CandidateEvent>>;
}

#[async_trait]
pub trait RecordStorePort: Send + Sync {
    /// Whether a record with this title and venue exists (case-insensitive).
    async fn exists(&self, title: &str, venue: &str) -> Result<bool>;
    async fn insert(&self, record: &EventRecord) -> Result<()>;
}

/// Fixed delays between requests to the target site.
#[async_trait]
pub trait PacerPort: Send + Sync {
    async fn pause(&self, delay: Duration);
}
