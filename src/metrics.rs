//! Crawl run metrics
//!
//! Counters and histograms for one crawl run. A run is a short-lived job, so
//! the rendered snapshot is pushed to a Prometheus Pushgateway at the end
//! instead of being scraped.

use crate::error::{CrawlerError, Result};
use crate::types::SourceOrigin;
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use tracing::{info, warn};

macro_rules! crawl_metric {
    (counter, $name:literal) => {
        concat!("catchdm_crawl_", $name, "_total")
    };
    (histogram, $name:literal) => {
        concat!("catchdm_crawl_", $name)
    };
}

/// Installs the Prometheus recorder. Returns `None` if a recorder is
/// already installed.
pub fn init_metrics() -> Option<PrometheusHandle> {
    match PrometheusBuilder::new().install_recorder() {
        Ok(handle) => {
            CrawlMetrics::register();
            Some(handle)
        }
        Err(e) => {
            warn!("Prometheus recorder install failed (possibly already installed): {}", e);
            None
        }
    }
}

/// Pushes the current snapshot to `{gateway}/metrics/job/{job}/instance/{instance}`.
pub async fn push_metrics(
    client: &reqwest::Client,
    handle: &PrometheusHandle,
    gateway_url: &str,
    job: &str,
    instance: &str,
) -> Result<()> {
    let body = handle.render();
    let push_url = format!(
        "{}/metrics/job/{}/instance/{}",
        gateway_url.trim_end_matches('/'),
        job,
        instance
    );

    let response = client
        .post(&push_url)
        .header("Content-Type", "text/plain; version=0.0.4")
        .body(body)
        .send()
        .await?;

    if !response.status().is_success() {
        let status = response.status().as_u16();
        let message = response.text().await.unwrap_or_default();
        return Err(CrawlerError::Api { status, message });
    }

    info!("Pushed metrics to Pushgateway for instance={}", instance);
    Ok(())
}

pub struct CrawlMetrics;

impl CrawlMetrics {
    pub fn record_listing_page(candidates: usize) {
        ::metrics::counter!(crawl_metric!(counter, "listing_pages")).increment(1);
        ::metrics::histogram!(crawl_metric!(histogram, "candidates_per_page")).record(candidates as f64);
    }

    pub fn record_listing_fetch_error() {
        ::metrics::counter!(crawl_metric!(counter, "listing_fetch_errors")).increment(1);
    }

    pub fn record_extraction_error() {
        ::metrics::counter!(crawl_metric!(counter, "extraction_errors")).increment(1);
    }

    pub fn record_duplicate() {
        ::metrics::counter!(crawl_metric!(counter, "duplicates_skipped")).increment(1);
    }

    pub fn record_dedup_unknown() {
        ::metrics::counter!(crawl_metric!(counter, "dedup_check_errors")).increment(1);
    }

    pub fn record_source_resolution(origin: SourceOrigin) {
        match origin {
            SourceOrigin::ExternalLink => {
                ::metrics::counter!(crawl_metric!(counter, "source_external_links")).increment(1)
            }
            SourceOrigin::DetailPage => {
                ::metrics::counter!(crawl_metric!(counter, "source_detail_pages")).increment(1)
            }
            SourceOrigin::ListingPage => {
                ::metrics::counter!(crawl_metric!(counter, "source_listing_pages")).increment(1)
            }
        }
    }

    pub fn record_normalization_failure() {
        ::metrics::counter!(crawl_metric!(counter, "normalization_failures")).increment(1);
    }

    pub fn record_insert() {
        ::metrics::counter!(crawl_metric!(counter, "events_inserted")).increment(1);
    }

    pub fn record_insert_error() {
        ::metrics::counter!(crawl_metric!(counter, "insert_errors")).increment(1);
    }

    pub fn record_run_duration(duration_secs: f64) {
        ::metrics::histogram!(crawl_metric!(histogram, "run_duration_seconds")).record(duration_secs);
    }

    /// Touch every series so a short run still reports zeros.
    fn register() {
        use metrics::{counter, histogram};

        let _ = counter!(crawl_metric!(counter, "listing_pages"));
        let _ = counter!(crawl_metric!(counter, "listing_fetch_errors"));
        let _ = counter!(crawl_metric!(counter, "extraction_errors"));
        let _ = counter!(crawl_metric!(counter, "duplicates_skipped"));
        let _ = counter!(crawl_metric!(counter, "dedup_check_errors"));
        let _ = counter!(crawl_metric!(counter, "source_external_links"));
        let _ = counter!(crawl_metric!(counter, "source_detail_pages"));
        let _ = counter!(crawl_metric!(counter, "source_listing_pages"));
        let _ = counter!(crawl_metric!(counter, "normalization_failures"));
        let _ = counter!(crawl_metric!(counter, "events_inserted"));
        let _ = counter!(crawl_metric!(counter, "insert_errors"));
        let _ = histogram!(crawl_metric!(histogram, "candidates_per_page"));
        let _ = histogram!(crawl_metric!(histogram, "run_duration_seconds"));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_metric_names() {
        assert_eq!(crawl_metric!(counter, "events_inserted"), "catchdm_crawl_events_inserted_total");
        assert_eq!(crawl_metric!(histogram, "run_duration_seconds"), "catchdm_crawl_run_duration_seconds");
    }

    #[test]
    fn test_recording_without_recorder_is_a_noop() {
        CrawlMetrics::record_listing_page(12);
        CrawlMetrics::record_source_resolution(SourceOrigin::DetailPage);
        CrawlMetrics::record_run_duration(1.5);
    }

    #[tokio::test]
    async fn test_push_posts_rendered_snapshot() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/metrics/job/catchdm_crawler/instance/run-1"))
            .and(header("Content-Type", "text/plain; version=0.0.4"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let handle = PrometheusBuilder::new().build_recorder().handle();
        let client = reqwest::Client::new();
        push_metrics(&client, &handle, &format!("{}/", server.uri()), "catchdm_crawler", "run-1")
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_push_rejection_is_an_api_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(400).set_body_string("bad metric"))
            .mount(&server)
            .await;

        let handle = PrometheusBuilder::new().build_recorder().handle();
        let client = reqwest::Client::new();
        let err = push_metrics(&client, &handle, &server.uri(), "catchdm_crawler", "run-1")
            .await
            .unwrap_err();
        assert!(matches!(err, CrawlerError::Api { status: 400, .. }));
    }
}
