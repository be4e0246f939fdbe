use crate::app::ports::StructuredExtractorPort;
use crate::config::ExtractorConfig;
use crate::constants::EXTRACTOR_REQUEST_TIMEOUT_SECS;
use crate::error::{CrawlerError, Result};
use crate::types::CandidateEvent;
use async_trait::async_trait;
use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, info, warn};

const ANTHROPIC_API_URL: &str = "https://api.anthropic.com/v1";
const ANTHROPIC_VERSION: &str = "2023-06-01";

static JSON_ARRAY: Lazy<Regex> = Lazy::new(|| Regex::new(r"\[[\s\S]*\]").unwrap());

#[derive(Debug, Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    temperature: f32,
    messages: Vec<Message>,
}

#[derive(Debug, Serialize)]
struct Message {
    role: &'static str,
    content: String,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    content: Vec<ContentBlock>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
enum ContentBlock {
    #[serde(rename = "text")]
    Text { text: String },
    #[serde(other)]
    Other,
}

/// Structured extractor that asks Claude to list the events on a listing page.
pub struct ClaudeExtractor {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
    max_tokens: u32,
    temperature: f32,
    timeout: Duration,
}

impl ClaudeExtractor {
    pub fn new(api_key: &str, config: &ExtractorConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_key: api_key.to_string(),
            base_url: config
                .base_url
                .as_deref()
                .unwrap_or(ANTHROPIC_API_URL)
                .trim_end_matches('/')
                .to_string(),
            model: config.model.clone(),
            max_tokens: config.max_tokens,
            temperature: config.temperature,
            timeout: Duration::from_secs(EXTRACTOR_REQUEST_TIMEOUT_SECS),
        }
    }

    /// Overrides the per-request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn headers(&self) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        let key = HeaderValue::from_str(&self.api_key)
            .map_err(|e| CrawlerError::Config(format!("Invalid API key header: {e}")))?;
        headers.insert("x-api-key", key);
        headers.insert("anthropic-version", HeaderValue::from_static(ANTHROPIC_VERSION));
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        Ok(headers)
    }

    async fn complete(&self, prompt: String) -> Result<String> {
        let request = MessagesRequest {
            model: &self.model,
            max_tokens: self.max_tokens,
            temperature: self.temperature,
            messages: vec![Message { role: "user", content: prompt }],
        };

        debug!(model = %self.model, "Claude extraction request");
        let response = self
            .http
            .post(format!("{}/messages", self.base_url))
            .headers(self.headers()?)
            .timeout(self.timeout)
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response.text().await.unwrap_or_default();
            return Err(CrawlerError::Api { status, message });
        }

        let body: MessagesResponse = response.json().await?;
        Ok(body
            .content
            .into_iter()
            .filter_map(|block| match block {
                ContentBlock::Text { text } => Some(text),
                ContentBlock::Other => None,
            })
            .collect::<Vec<_>>()
            .join("\n"))
    }
}

#[async_trait]
impl StructuredExtractorPort for ClaudeExtractor {
    async fn extract(&self, cleaned_html: &str, today: NaiveDate) -> Result<Vec<CandidateEvent>> {
        let text = self.complete(extraction_prompt(cleaned_html, today)).await?;
        let events = parse_events(&text);
        info!(count = events.len(), "Claude extracted events");
        Ok(events)
    }
}

pub fn extraction_prompt(cleaned_html: &str, today: NaiveDate) -> String {
    let today = today.format("%Y-%m-%d");
    format!(
        r#"You are an expert at extracting event information from CatchDesMoines.com.
Your task is to find EVERY EVENT on this page.

CURRENT DATE: {today}
WEBSITE CONTENT:
{cleaned_html}

EXTRACTION RULES:

1. Find all events: event titles, event cards, list items and links to event
   detail pages (format: /event/event-name/12345/).

2. Dates are Central Time in the format YYYY-MM-DD HH:MM:SS.
   Use 19:00:00 when no time is given.
   Only include events on or after {today}.

3. Always extract the event detail URL path (e.g. /event/event-name/12345/).

For each event return:
- title: event name
- description: brief description
- date: YYYY-MM-DD HH:MM:SS (Central Time)
- location: city or area (default "Des Moines, IA")
- venue: specific venue name
- category: Music/Sports/Arts/Community/Entertainment/Festival/Food
- price: price or "See website"
- detail_url: event detail page path

Respond with a JSON array only:
[
  {{
    "title": "Event Name",
    "description": "Event details",
    "date": "YYYY-MM-DD HH:MM:SS",
    "location": "Des Moines, IA",
    "venue": "Venue Name",
    "category": "Category",
    "price": "See website",
    "detail_url": "/event/event-name/12345/"
  }}
]"#
    )
}

/// Pulls the outermost JSON array out of a model reply. Anything that is not
/// a well-formed array yields no events; records without a title are dropped.
pub fn parse_events(text: &str) -> Vec<CandidateEvent> {
    let Some(span) = JSON_ARRAY.find(text) else {
        warn!("No JSON array found in extractor response");
        return Vec::new();
    };

    match serde_json::from_str::<Value>(span.as_str()) {
        Ok(Value::Array(items)) => items.iter().filter_map(CandidateEvent::from_value).collect(),
        Ok(other) => {
            warn!(kind = %json_kind(&other), "Extractor response is not a list");
            Vec::new()
        }
        Err(e) => {
            warn!(error = %e, "Extractor response is not valid JSON");
            Vec::new()
        }
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
