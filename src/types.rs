use crate::constants;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// An event proposed by the structured extractor for one listing page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateEvent {
    pub title: String,
    pub description: String,
    /// Local date-time as the extractor wrote it, e.g. `2026-10-25 19:30:00`
    pub raw_date: String,
    pub location: Option<String>,
    pub venue: Option<String>,
    pub category: Option<String>,
    pub price: Option<String>,
    /// Relative or absolute path to the event's own page on the source site
    pub detail_path: Option<String>,
}

impl CandidateEvent {
    pub fn new(title: &str, raw_date: &str) -> Self {
        Self {
            title: title.to_string(),
            description: String::new(),
            raw_date: raw_date.to_string(),
            location: None,
            venue: None,
            category: None,
            price: None,
            detail_path: None,
        }
    }

    pub fn with_venue(mut self, venue: &str) -> Self {
        self.venue = Some(venue.to_string());
        self
    }

    pub fn with_detail_path(mut self, path: &str) -> Self {
        self.detail_path = Some(path.to_string());
        self
    }

    /// Builds a candidate from one extractor record. Records without a
    /// non-blank title are rejected.
    pub fn from_value(raw: &Value) -> Option<Self> {
        let text = |key: &str| {
            raw.get(key)
                .and_then(Value::as_str)
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        };

        let title = text("title")?;
        Some(Self {
            title,
            description: text("description").unwrap_or_default(),
            raw_date: text("date").unwrap_or_default(),
            location: text("location"),
            venue: text("venue"),
            category: text("category"),
            price: text("price"),
            detail_path: text("detail_url"),
        })
    }

    pub fn location_or_default(&self) -> &str {
        self.location.as_deref().unwrap_or(constants::DEFAULT_LOCATION)
    }

    /// Venue as it will be persisted: the extracted venue, else the
    /// location, else a placeholder.
    pub fn venue_or_default(&self) -> &str {
        self.venue
            .as_deref()
            .or(self.location.as_deref())
            .unwrap_or(constants::DEFAULT_VENUE)
    }

    pub fn category_or_default(&self) -> &str {
        self.category.as_deref().unwrap_or(constants::DEFAULT_CATEGORY)
    }

    pub fn price_or_default(&self) -> &str {
        self.price.as_deref().unwrap_or(constants::DEFAULT_PRICE)
    }
}

/// Where an event's persisted source URL came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceOrigin {
    /// The event's own external site, found on its detail page
    ExternalLink,
    /// Resolution missed or the fetch failed; the detail page itself
    DetailPage,
    /// The candidate had no detail path at all
    ListingPage,
}

/// Outcome of detail resolution for one candidate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedSourceUrl {
    pub url: String,
    pub origin: SourceOrigin,
}

impl ResolvedSourceUrl {
    pub fn external(url: impl Into<String>) -> Self {
        Self { url: url.into(), origin: SourceOrigin::ExternalLink }
    }

    pub fn detail_page(url: impl Into<String>) -> Self {
        Self { url: url.into(), origin: SourceOrigin::DetailPage }
    }

    pub fn listing_page(url: impl Into<String>) -> Self {
        Self { url: url.into(), origin: SourceOrigin::ListingPage }
    }
}

/// A candidate with an absolute start instant and a resolved source URL,
/// ready for persistence.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedEvent {
    pub candidate: CandidateEvent,
    pub starts_at: DateTime<Utc>,
    pub source: ResolvedSourceUrl,
}

/// Row shape written to the `events` table.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EventRecord {
    pub title: String,
    pub original_description: String,
    pub enhanced_description: String,
    pub date: String,
    pub event_start_local: String,
    pub event_timezone: String,
    pub event_start_utc: String,
    pub location: String,
    pub venue: String,
    pub category: String,
    pub price: String,
    pub source_url: String,
    pub is_featured: bool,
    pub is_enhanced: bool,
    pub created_at: String,
    pub updated_at: String,
}

impl EventRecord {
    pub fn from_normalized(event: &NormalizedEvent, timezone: &str, now: DateTime<Utc>) -> Self {
        let candidate = &event.candidate;
        let description = truncate_chars(&candidate.description, constants::DESCRIPTION_MAX_CHARS);
        let starts_at = event.starts_at.to_rfc3339_opts(SecondsFormat::Secs, false);
        let stamp = now.to_rfc3339_opts(SecondsFormat::Micros, false);

        Self {
            title: truncate_chars(&candidate.title, constants::TITLE_MAX_CHARS),
            original_description: description.clone(),
            enhanced_description: description,
            date: starts_at.clone(),
            event_start_local: candidate.raw_date.clone(),
            event_timezone: timezone.to_string(),
            event_start_utc: starts_at,
            location: truncate_chars(candidate.location_or_default(), constants::LOCATION_MAX_CHARS),
            venue: truncate_chars(candidate.venue_or_default(), constants::VENUE_MAX_CHARS),
            category: truncate_chars(candidate.category_or_default(), constants::CATEGORY_MAX_CHARS),
            price: truncate_chars(candidate.price_or_default(), constants::PRICE_MAX_CHARS),
            source_url: event.source.url.clone(),
            is_featured: false,
            is_enhanced: false,
            created_at: stamp.clone(),
            updated_at: stamp,
        }
    }
}

/// Counters accumulated over one crawl run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub total_found: usize,
    pub inserted: usize,
    pub duplicates: usize,
}

impl RunSummary {
    /// `key=value` lines for CI step outputs.
    pub fn to_output_lines(&self) -> String {
        format!(
            "events_found={}\nevents_inserted={}\nduplicates_skipped={}\n",
            self.total_found, self.inserted, self.duplicates
        )
    }
}

/// Truncates to at most `max` characters without splitting a code point.
pub fn truncate_chars(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        Some((idx, _)) => s[..idx].to_string(),
        None => s.to_string(),
    }
}
