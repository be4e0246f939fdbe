use crate::constants;
use crate::error::{CrawlerError, Result};
use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::time::Duration;

pub const DEFAULT_CONFIG_PATH: &str = "crawler.toml";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub site: SiteConfig,
    pub crawl: CrawlConfig,
    pub extractor: ExtractorConfig,
    pub store: StoreConfig,
    pub fetcher: FetcherConfig,
    pub metrics: MetricsConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SiteConfig {
    pub base_url: String,
    pub domain: String,
    pub events_path: String,
    pub page_size: u32,
    pub timezone: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CrawlConfig {
    pub max_pages: u32,
    pub page_delay_ms: u64,
    pub detail_delay_ms: u64,
    pub listing_timeout_ms: u64,
    pub detail_timeout_ms: u64,
    pub wait_until: String,
    pub extraction_char_limit: usize,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ExtractorConfig {
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f32,
    pub base_url: Option<String>,
    #[serde(skip)]
    pub api_key: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub url: Option<String>,
    pub table: String,
    #[serde(skip)]
    pub service_key: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct FetcherConfig {
    pub url: Option<String>,
    #[serde(skip)]
    pub token: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    /// Prometheus Pushgateway base URL; metrics are only pushed when set.
    pub pushgateway_url: Option<String>,
    pub job: String,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            pushgateway_url: None,
            job: constants::METRICS_JOB.to_string(),
        }
    }
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            base_url: constants::SITE_BASE_URL.to_string(),
            domain: constants::SITE_DOMAIN.to_string(),
            events_path: constants::EVENTS_PATH.to_string(),
            page_size: constants::LISTING_PAGE_SIZE,
            timezone: constants::EVENT_TIMEZONE.to_string(),
        }
    }
}

impl Default for CrawlConfig {
    fn default() -> Self {
        Self {
            max_pages: constants::DEFAULT_MAX_PAGES,
            page_delay_ms: constants::PAGE_DELAY_MS,
            detail_delay_ms: constants::DETAIL_DELAY_MS,
            listing_timeout_ms: constants::LISTING_TIMEOUT_MS,
            detail_timeout_ms: constants::DETAIL_TIMEOUT_MS,
            wait_until: constants::WAIT_UNTIL_NETWORK_IDLE.to_string(),
            extraction_char_limit: constants::EXTRACTION_CHAR_LIMIT,
        }
    }
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            model: constants::EXTRACTOR_MODEL.to_string(),
            max_tokens: constants::EXTRACTOR_MAX_TOKENS,
            temperature: constants::EXTRACTOR_TEMPERATURE,
            base_url: None,
            api_key: None,
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            url: None,
            table: constants::EVENTS_TABLE.to_string(),
            service_key: None,
        }
    }
}

impl Config {
    /// Loads defaults, then the TOML file at `path` if it exists, then the
    /// process environment.
    pub fn load(path: &Path) -> Result<Self> {
        let mut config = if path.exists() {
            Self::from_file(path)?
        } else {
            Self::default()
        };
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            CrawlerError::Config(format!("Failed to read config file '{}': {}", path.display(), e))
        })?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Overlays credentials and endpoints from an environment lookup.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(url) = get("SUPABASE_URL") {
            self.store.url = Some(url);
        }
        if let Some(key) = get("SUPABASE_SERVICE_ROLE_KEY") {
            self.store.service_key = Some(key);
        }
        if let Some(key) = get("ANTHROPIC_API_KEY").or_else(|| get("CLAUDE_API")) {
            self.extractor.api_key = Some(key);
        }
        if let Some(url) = get("BROWSERLESS_URL") {
            self.fetcher.url = Some(url);
        }
        if let Some(token) = get("BROWSERLESS_TOKEN") {
            self.fetcher.token = Some(token);
        }
        if let Some(url) = get("PUSHGATEWAY_URL") {
            self.metrics.pushgateway_url = Some(url);
        }
    }

    pub fn events_list_url(&self) -> String {
        format!(
            "{}{}",
            self.site.base_url.trim_end_matches('/'),
            self.site.events_path
        )
    }

    pub fn page_delay(&self) -> Duration {
        Duration::from_millis(self.crawl.page_delay_ms)
    }

    pub fn detail_delay(&self) -> Duration {
        Duration::from_millis(self.crawl.detail_delay_ms)
    }

    /// Store endpoint and key, both required for a live run.
    pub fn store_credentials(&self) -> Result<(&str, &str)> {
        let url = self
            .store
            .url
            .as_deref()
            .ok_or_else(|| CrawlerError::MissingEnv("SUPABASE_URL".into()))?;
        let key = self
            .store
            .service_key
            .as_deref()
            .ok_or_else(|| CrawlerError::MissingEnv("SUPABASE_SERVICE_ROLE_KEY".into()))?;
        Ok((url, key))
    }

    pub fn extractor_api_key(&self) -> Result<&str> {
        self.extractor
            .api_key
            .as_deref()
            .ok_or_else(|| CrawlerError::MissingEnv("ANTHROPIC_API_KEY or CLAUDE_API".into()))
    }

    pub fn fetcher_url(&self) -> Result<&str> {
        self.fetcher
            .url
            .as_deref()
            .ok_or_else(|| CrawlerError::MissingEnv("BROWSERLESS_URL".into()))
    }
}
