use crate::app::ports::{FetchRequest, PageFetch, PageFetcherPort};
use crate::error::{CrawlerError, Result};
use async_trait::async_trait;
use serde_json::json;
use std::time::Duration;
use tracing::{debug, warn};

/// Slack on top of the render timeout so Browserless reports its own
/// timeout before the HTTP client gives up.
const CLIENT_TIMEOUT_GRACE: Duration = Duration::from_secs(10);

/// Page fetcher backed by a Browserless `/content` endpoint, which renders
/// the page in headless Chrome and returns the final HTML.
pub struct BrowserlessFetcher {
    client: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl BrowserlessFetcher {
    pub fn new(base_url: &str, token: Option<&str>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("catchdm_crawler/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.map(String::from),
        })
    }

    async fn content(&self, request: &FetchRequest) -> Result<String> {
        let body = json!({
            "url": request.url,
            "gotoOptions": {
                "waitUntil": browser_wait_until(&request.wait_until),
                "timeout": request.timeout_ms,
            }
        });

        let mut builder = self
            .client
            .post(format!("{}/content", self.base_url))
            .timeout(Duration::from_millis(request.timeout_ms) + CLIENT_TIMEOUT_GRACE);
        if let Some(ref token) = self.token {
            builder = builder.query(&[("token", token)]);
        }
        let resp = builder.json(&body).send().await?;

        let status = resp.status();
        if !status.is_success() {
            let message = resp.text().await.unwrap_or_default();
            return Err(CrawlerError::Api { status: status.as_u16(), message });
        }

        Ok(resp.text().await?)
    }
}

#[async_trait]
impl PageFetcherPort for BrowserlessFetcher {
    async fn fetch(&self, request: &FetchRequest) -> PageFetch {
        debug!(url = %request.url, wait_until = %request.wait_until, "Rendering page");
        match self.content(request).await {
            Ok(html) => PageFetch::ok(html),
            Err(e) => {
                warn!(url = %request.url, error = %e, "Render failed");
                PageFetch::failed(e.to_string())
            }
        }
    }
}

/// Browserless drives Puppeteer, whose network-idle event is `networkidle0`.
fn browser_wait_until(policy: &str) -> &str {
    match policy {
        "networkidle" => "networkidle0",
        other => other,
    }
}
