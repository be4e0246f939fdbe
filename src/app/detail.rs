use crate::app::ports::{FetchRequest, PageFetcherPort};
use crate::resolver::LinkResolver;
use crate::types::ResolvedSourceUrl;
use std::sync::Arc;
use tracing::{info, instrument, warn};
use url::Url;

/// Fetches an event's detail page and resolves its outbound link, falling
/// back to the detail page URL on any failure.
pub struct DetailResolver {
    fetcher: Arc<dyn PageFetcherPort>,
    resolver: LinkResolver,
    site_base: Url,
    wait_until: String,
    timeout_ms: u64,
}

impl DetailResolver {
    pub fn new(
        fetcher: Arc<dyn PageFetcherPort>,
        resolver: LinkResolver,
        site_base: Url,
        wait_until: impl Into<String>,
        timeout_ms: u64,
    ) -> Self {
        Self {
            fetcher,
            resolver,
            site_base,
            wait_until: wait_until.into(),
            timeout_ms,
        }
    }

    /// Absolute detail page URL for an extractor-supplied path.
    pub fn detail_url(&self, path: &str) -> Option<Url> {
        let path = path.trim();
        if path.is_empty() {
            return None;
        }
        if path.to_ascii_lowercase().starts_with("http") {
            return Url::parse(path).ok();
        }
        self.site_base.join(path).ok()
    }

    #[instrument(skip(self), fields(url = %detail_url))]
    pub async fn resolve(&self, detail_url: &Url) -> ResolvedSourceUrl {
        let request = FetchRequest::new(detail_url.as_str(), self.wait_until.as_str(), self.timeout_ms);

        let html = match self.fetcher.fetch(&request).await.into_html() {
            Ok(html) => html,
            Err(e) => {
                warn!(error = %e, "Failed to fetch event detail, using detail page as source");
                return ResolvedSourceUrl::detail_page(detail_url.as_str());
            }
        };

        match self.resolver.resolve_with_strategy(&html, detail_url) {
            Some((strategy, url)) => {
                info!(strategy, source_url = %url, "Found event website");
                ResolvedSourceUrl::external(url.as_str())
            }
            None => {
                warn!("No event website found, using detail page as source");
                ResolvedSourceUrl::detail_page(detail_url.as_str())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::ports::PageFetch;
    use crate::types::SourceOrigin;
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct StubFetcher {
        response: PageFetch,
        requests: Mutex<Vec<FetchRequest>>,
    }

    impl StubFetcher {
        fn new(response: PageFetch) -> Arc<Self> {
            Arc::new(Self { response, requests: Mutex::new(Vec::new()) })
        }
    }

    #[async_trait]
    impl PageFetcherPort for StubFetcher {
        async fn fetch(&self, request: &FetchRequest) -> PageFetch {
            self.requests.lock().unwrap().push(request.clone());
            self.response.clone()
        }
    }

    fn step(fetcher: Arc<StubFetcher>) -> DetailResolver {
        DetailResolver::new(
            fetcher,
            LinkResolver::for_site("catchdesmoines.com"),
            Url::parse("https://www.catchdesmoines.com").unwrap(),
            "networkidle",
            20_000,
        )
    }

    #[test]
    fn test_detail_url_joins_relative_paths() {
        let step = step(StubFetcher::new(PageFetch::failed("unused")));
        assert_eq!(
            step.detail_url("/event/jazz-night/55001/").unwrap().as_str(),
            "https://www.catchdesmoines.com/event/jazz-night/55001/"
        );
        assert_eq!(
            step.detail_url("event/jazz-night/55001/").unwrap().as_str(),
            "https://www.catchdesmoines.com/event/jazz-night/55001/"
        );
        assert_eq!(
            step.detail_url("https://www.catchdesmoines.com/event/x/1/").unwrap().as_str(),
            "https://www.catchdesmoines.com/event/x/1/"
        );
        assert!(step.detail_url("  ").is_none());
    }

    #[tokio::test]
    async fn test_resolves_external_link_with_detail_fetch_policy() {
        let fetcher = StubFetcher::new(PageFetch::ok(
            r#"<a href="/events/">Back</a><a href="https://hoytsherman.org/jazz">Visit Website</a>"#,
        ));
        let step = step(fetcher.clone());
        let detail = step.detail_url("/event/jazz-night/55001/").unwrap();

        let resolved = step.resolve(&detail).await;
        assert_eq!(resolved, ResolvedSourceUrl::external("https://hoytsherman.org/jazz"));

        let requests = fetcher.requests.lock().unwrap();
        assert_eq!(
            requests.as_slice(),
            &[FetchRequest::new(detail.as_str(), "networkidle", 20_000)]
        );
    }

    #[tokio::test]
    async fn test_fetch_failure_falls_back_to_detail_page() {
        let step = step(StubFetcher::new(PageFetch::failed("timeout after 20000ms")));
        let detail = step.detail_url("/event/jazz-night/55001/").unwrap();

        let resolved = step.resolve(&detail).await;
        assert_eq!(resolved.origin, SourceOrigin::DetailPage);
        assert_eq!(resolved.url, detail.as_str());
    }

    #[tokio::test]
    async fn test_resolver_miss_falls_back_to_detail_page() {
        let step = step(StubFetcher::new(PageFetch::ok(
            r#"<a href="https://www.facebook.com/x">Facebook</a>"#,
        )));
        let detail = step.detail_url("/event/jazz-night/55001/").unwrap();

        let resolved = step.resolve(&detail).await;
        assert_eq!(resolved, ResolvedSourceUrl::detail_page(detail.as_str()));
    }

    #[tokio::test]
    async fn test_empty_successful_fetch_is_a_miss() {
        let step = step(StubFetcher::new(PageFetch::ok("   ")));
        let detail = step.detail_url("/event/jazz-night/55001/").unwrap();
        assert_eq!(step.resolve(&detail).await.origin, SourceOrigin::DetailPage);
    }
}
