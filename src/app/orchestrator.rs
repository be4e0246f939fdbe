use crate::app::dedup::{DedupOutcome, Deduplicator};
use crate::app::detail::DetailResolver;
use crate::app::listing::ListingCrawler;
use crate::app::ports::{PacerPort, PageFetcherPort, RecordStorePort, StructuredExtractorPort};
use crate::clock::Clock;
use crate::config::Config;
use crate::error::{CrawlerError, Result};
use crate::metrics::CrawlMetrics;
use crate::resolver::LinkResolver;
use crate::timestamp::TimestampNormalizer;
use crate::types::{CandidateEvent, EventRecord, NormalizedEvent, ResolvedSourceUrl, RunSummary};
use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{info, instrument, warn};
use url::Url;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RunState {
    Init,
    CrawlingListings,
    ProcessingEvents,
    Done,
    Aborted,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOutcome {
    pub state: RunState,
    pub summary: RunSummary,
}

impl RunOutcome {
    pub fn aborted() -> Self {
        Self { state: RunState::Aborted, summary: RunSummary::default() }
    }

    pub fn is_aborted(&self) -> bool {
        self.state == RunState::Aborted
    }
}

/// External collaborators, constructed by the caller and shared for the run.
#[derive(Clone)]
pub struct CrawlerDeps {
    pub fetcher: Arc<dyn PageFetcherPort>,
    pub extractor: Arc<dyn StructuredExtractorPort>,
    pub store: Arc<dyn RecordStorePort>,
    pub pacer: Arc<dyn PacerPort>,
    pub clock: Arc<dyn Clock>,
}

/// Why a unique candidate did not become a record.
enum Skip {
    UnparseableDate(String),
    PastEvent(DateTime<Utc>),
    InsertFailed(CrawlerError),
}

impl Skip {
    fn log(&self, title: &str) {
        match self {
            Skip::UnparseableDate(raw) => warn!(title, raw_date = %raw, "Skipping event, could not parse date"),
            Skip::PastEvent(starts_at) => warn!(title, starts_at = %starts_at, "Skipping past event"),
            Skip::InsertFailed(e) => warn!(title, error = %e, "Failed to insert event"),
        }
    }
}

/// Drives one crawl: listing pages, then each candidate in order through
/// dedup, detail resolution, timestamp normalization and persistence.
pub struct Orchestrator {
    run_id: Uuid,
    listing: ListingCrawler,
    detail: DetailResolver,
    dedup: Deduplicator,
    normalizer: TimestampNormalizer,
    store: Arc<dyn RecordStorePort>,
    pacer: Arc<dyn PacerPort>,
    clock: Arc<dyn Clock>,
    events_url: String,
    detail_delay: Duration,
    dry_run: bool,
}

impl Orchestrator {
    pub fn new(deps: CrawlerDeps, config: &Config, dry_run: bool) -> Result<Self> {
        let site_base = Url::parse(&config.site.base_url).map_err(|e| {
            CrawlerError::Config(format!("Invalid site base URL '{}': {}", config.site.base_url, e))
        })?;
        let normalizer = TimestampNormalizer::new(&config.site.timezone)?;

        let listing = ListingCrawler::new(
            deps.fetcher.clone(),
            deps.extractor.clone(),
            deps.pacer.clone(),
            config,
        );
        let detail = DetailResolver::new(
            deps.fetcher.clone(),
            LinkResolver::for_site(&config.site.domain),
            site_base,
            config.crawl.wait_until.as_str(),
            config.crawl.detail_timeout_ms,
        );

        Ok(Self {
            run_id: Uuid::new_v4(),
            listing,
            detail,
            dedup: Deduplicator::new(deps.store.clone(), dry_run),
            normalizer,
            store: deps.store,
            pacer: deps.pacer,
            clock: deps.clock,
            events_url: config.events_list_url(),
            detail_delay: config.detail_delay(),
            dry_run,
        })
    }

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    #[instrument(skip(self), fields(run_id = %self.run_id, dry_run = self.dry_run))]
    pub async fn run(&self, max_pages: u32) -> RunOutcome {
        let started = Instant::now();
        let mut state = RunState::Init;
        let today = self.normalizer.local_today(self.clock.now());

        self.transition(&mut state, RunState::CrawlingListings);
        let candidates = match self.listing.crawl(max_pages, today).await {
            Ok(candidates) => candidates,
            Err(e) => {
                warn!(error = %e, "Run aborted while crawling listings");
                self.transition(&mut state, RunState::Aborted);
                CrawlMetrics::record_run_duration(started.elapsed().as_secs_f64());
                return RunOutcome::aborted();
            }
        };

        let mut summary = RunSummary { total_found: candidates.len(), ..Default::default() };
        info!(total = summary.total_found, "Found events on listing pages");

        self.transition(&mut state, RunState::ProcessingEvents);
        for (i, candidate) in candidates.iter().enumerate() {
            info!(
                index = i + 1,
                total = summary.total_found,
                title = %candidate.title,
                "Processing event"
            );

            match self.dedup.check(candidate).await {
                DedupOutcome::Unique => {}
                DedupOutcome::Duplicate => {
                    CrawlMetrics::record_duplicate();
                    info!(title = %candidate.title, "Skipping duplicate");
                    summary.duplicates += 1;
                    continue;
                }
                DedupOutcome::Unknown(e) => {
                    CrawlMetrics::record_dedup_unknown();
                    warn!(title = %candidate.title, error = %e, "Skipping event, duplicate status unknown");
                    continue;
                }
            }

            match self.process(candidate, today).await {
                Ok(()) => summary.inserted += 1,
                Err(skip) => skip.log(&candidate.title),
            }
        }

        self.transition(&mut state, RunState::Done);
        CrawlMetrics::record_run_duration(started.elapsed().as_secs_f64());
        info!(
            found = summary.total_found,
            inserted = summary.inserted,
            duplicates = summary.duplicates,
            "Crawl complete"
        );

        RunOutcome { state, summary }
    }

    async fn process(&self, candidate: &CandidateEvent, today: NaiveDate) -> std::result::Result<(), Skip> {
        let source = self.resolve_source(candidate).await;
        CrawlMetrics::record_source_resolution(source.origin);

        let starts_at = self
            .normalizer
            .normalize(&candidate.raw_date, today)
            .ok_or_else(|| {
                CrawlMetrics::record_normalization_failure();
                Skip::UnparseableDate(candidate.raw_date.clone())
            })?;
        let now = self.clock.now();
        if starts_at < now {
            return Err(Skip::PastEvent(starts_at));
        }

        let event = NormalizedEvent { candidate: candidate.clone(), starts_at, source };
        let record = EventRecord::from_normalized(&event, self.normalizer.timezone_name(), now);

        if self.dry_run {
            info!(
                title = %record.title,
                date = %record.date,
                venue = %record.venue,
                source_url = %record.source_url,
                "[DRY RUN] Would insert event"
            );
            return Ok(());
        }

        self.store.insert(&record).await.map_err(|e| {
            CrawlMetrics::record_insert_error();
            Skip::InsertFailed(e)
        })?;
        CrawlMetrics::record_insert();
        info!(title = %record.title, "Inserted event");
        Ok(())
    }

    async fn resolve_source(&self, candidate: &CandidateEvent) -> ResolvedSourceUrl {
        let detail_url = candidate
            .detail_path
            .as_deref()
            .and_then(|path| self.detail.detail_url(path));

        match detail_url {
            Some(url) => {
                let resolved = self.detail.resolve(&url).await;
                self.pacer.pause(self.detail_delay).await;
                resolved
            }
            None => ResolvedSourceUrl::listing_page(self.events_url.as_str()),
        }
    }

    fn transition(&self, state: &mut RunState, next: RunState) {
        info!(from = ?state, to = ?next, "Run state change");
        *state = next;
    }
}
