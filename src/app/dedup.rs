use crate::app::ports::RecordStorePort;
use crate::types::CandidateEvent;
use std::sync::Arc;
use tracing::{debug, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DedupOutcome {
    Unique,
    Duplicate,
    /// The store could not answer; the caller must not insert blindly.
    Unknown(String),
}

/// Identity check against the record store on trimmed title + venue.
///
/// Matching ignores dates on purpose so recurring series are not re-inserted
/// when the extractor rewords a description.
pub struct Deduplicator {
    store: Arc<dyn RecordStorePort>,
    dry_run: bool,
}

impl Deduplicator {
    pub fn new(store: Arc<dyn RecordStorePort>, dry_run: bool) -> Self {
        Self { store, dry_run }
    }

    pub async fn check(&self, candidate: &CandidateEvent) -> DedupOutcome {
        if self.dry_run {
            return DedupOutcome::Unique;
        }

        let (title, venue) = identity_key(candidate);
        match self.store.exists(title, venue).await {
            Ok(true) => {
                debug!(title, venue, "Existing record matches");
                DedupOutcome::Duplicate
            }
            Ok(false) => DedupOutcome::Unique,
            Err(e) => {
                warn!(title, venue, error = %e, "Duplicate check failed");
                DedupOutcome::Unknown(e.to_string())
            }
        }
    }
}

/// Trimmed title and effective venue. Case folding is the store's job.
pub fn identity_key(candidate: &CandidateEvent) -> (&str, &str) {
    (candidate.title.trim(), candidate.venue_or_default().trim())
}
