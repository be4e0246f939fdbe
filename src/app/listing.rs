use crate::app::ports::{FetchRequest, PacerPort, PageFetcherPort, StructuredExtractorPort};
use crate::config::Config;
use crate::error::{CrawlerError, Result};
use crate::metrics::CrawlMetrics;
use crate::types::{truncate_chars, CandidateEvent};
use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, instrument, warn};

static SCRIPT_BLOCK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<script\b[^>]*>.*?</script\s*>").unwrap());
static STYLE_BLOCK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<style\b[^>]*>.*?</style\s*>").unwrap());

/// Walks the paginated listing and collects extracted candidates in page order.
pub struct ListingCrawler {
    fetcher: Arc<dyn PageFetcherPort>,
    extractor: Arc<dyn StructuredExtractorPort>,
    pacer: Arc<dyn PacerPort>,
    events_url: String,
    page_size: u32,
    wait_until: String,
    timeout_ms: u64,
    char_limit: usize,
    page_delay: Duration,
}

impl ListingCrawler {
    pub fn new(
        fetcher: Arc<dyn PageFetcherPort>,
        extractor: Arc<dyn StructuredExtractorPort>,
        pacer: Arc<dyn PacerPort>,
        config: &Config,
    ) -> Self {
        Self {
            fetcher,
            extractor,
            pacer,
            events_url: config.events_list_url(),
            page_size: config.site.page_size,
            wait_until: config.crawl.wait_until.clone(),
            timeout_ms: config.crawl.listing_timeout_ms,
            char_limit: config.crawl.extraction_char_limit,
            page_delay: config.page_delay(),
        }
    }

    pub fn listing_url(&self, page: u32) -> String {
        if page == 0 {
            self.events_url.clone()
        } else {
            format!(
                "{}?skip={}&bounds=false&view=grid&sort=date",
                self.events_url,
                page * self.page_size
            )
        }
    }

    /// Fails only when the first page cannot be fetched. Later failures and
    /// empty pages end pagination with what has been collected so far.
    #[instrument(skip(self))]
    pub async fn crawl(&self, max_pages: u32, today: NaiveDate) -> Result<Vec<CandidateEvent>> {
        let mut candidates = Vec::new();

        for page in 0..max_pages {
            if page > 0 {
                self.pacer.pause(self.page_delay).await;
            }

            let url = self.listing_url(page);
            info!(page, url = %url, "Fetching listing page");
            let request = FetchRequest::new(url.as_str(), self.wait_until.as_str(), self.timeout_ms);

            let html = match self.fetcher.fetch(&request).await.into_html() {
                Ok(html) => html,
                Err(e) if page == 0 => {
                    CrawlMetrics::record_listing_fetch_error();
                    error!(url = %url, error = %e, "Failed to fetch first listing page");
                    return Err(CrawlerError::Aborted(format!("first listing page failed: {e}")));
                }
                Err(e) => {
                    CrawlMetrics::record_listing_fetch_error();
                    warn!(page, error = %e, "Listing page fetch failed, stopping pagination");
                    break;
                }
            };

            let cleaned = clean_html(&html, self.char_limit);
            let extracted = match self.extractor.extract(&cleaned, today).await {
                Ok(events) => events,
                Err(e) => {
                    CrawlMetrics::record_extraction_error();
                    warn!(page, error = %e, "Extraction failed, treating page as empty");
                    Vec::new()
                }
            };

            CrawlMetrics::record_listing_page(extracted.len());
            if extracted.is_empty() {
                info!(page, "No events on page, stopping pagination");
                break;
            }

            info!(page, count = extracted.len(), "Extracted events from listing page");
            candidates.extend(extracted);
        }

        Ok(candidates)
    }
}

/// Drops `<script>` and `<style>` blocks and caps the result at `limit`
/// characters.
pub fn clean_html(html: &str, limit: usize) -> String {
    let without_scripts = SCRIPT_BLOCK.replace_all(html, "");
    let cleaned = STYLE_BLOCK.replace_all(&without_scripts, "");
    truncate_chars(&cleaned, limit)
}
