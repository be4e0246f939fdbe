use crate::app::ports::RecordStorePort;
use crate::constants::STORE_REQUEST_TIMEOUT_SECS;
use crate::error::{CrawlerError, Result};
use crate::types::EventRecord;
use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

/// Record store over Supabase's PostgREST interface.
///
/// Uses the service role key for both the `apikey` and bearer headers.
pub struct SupabaseRecordStore {
    client: reqwest::Client,
    endpoint: String,
    key: String,
    timeout: Duration,
}

impl SupabaseRecordStore {
    pub fn new(url: &str, key: &str, table: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: format!("{}/rest/v1/{}", url.trim_end_matches('/'), table),
            key: key.to_string(),
            timeout: Duration::from_secs(STORE_REQUEST_TIMEOUT_SECS),
        }
    }

    /// Overrides the per-request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn request(&self, method: reqwest::Method) -> reqwest::RequestBuilder {
        self.client
            .request(method, &self.endpoint)
            .header("apikey", &self.key)
            .header("Authorization", format!("Bearer {}", self.key))
            .timeout(self.timeout)
    }

    async fn rows(resp: reqwest::Response) -> Result<Vec<Value>> {
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(CrawlerError::Store(format!("Supabase returned {}: {}", status, body)));
        }
        Ok(resp.json().await?)
    }
}

#[async_trait]
impl RecordStorePort for SupabaseRecordStore {
    async fn exists(&self, title: &str, venue: &str) -> Result<bool> {
        let resp = self
            .request(reqwest::Method::GET)
            .query(&[
                ("select", "id".to_string()),
                ("title", format!("ilike.{}", ilike_literal(title))),
                ("venue", format!("ilike.{}", ilike_literal(venue))),
                ("limit", "1".to_string()),
            ])
            .send()
            .await?;

        let rows = Self::rows(resp).await?;
        debug!(title, venue, matches = rows.len(), "Duplicate lookup");
        Ok(!rows.is_empty())
    }

    async fn insert(&self, record: &EventRecord) -> Result<()> {
        let resp = self
            .request(reqwest::Method::POST)
            .header("Prefer", "return=representation")
            .json(record)
            .send()
            .await?;

        if Self::rows(resp).await?.is_empty() {
            return Err(CrawlerError::Store(format!(
                "insert of '{}' returned no rows",
                record.title
            )));
        }
        Ok(())
    }
}

/// Escapes LIKE metacharacters so the pattern matches the trimmed value
/// literally (case-insensitively under `ilike`).
///
/// PostgREST rewrites every `*` to `%` before escapes apply, so a literal
/// asterisk is narrowed to a single-character `_` instead.
fn ilike_literal(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.trim().chars() {
        match c {
            '\\' | '%' | '_' => {
                out.push('\\');
                out.push(c);
            }
            '*' => out.push('_'),
            _ => out.push(c),
        }
    }
    out
}
