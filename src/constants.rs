/// Site and crawl constants shared across the crawler.

// Target site
pub const SITE_BASE_URL: &str = "https://www.catchdesmoines.com";
pub const SITE_DOMAIN: &str = "catchdesmoines.com";
pub const EVENTS_PATH: &str = "/events/";
pub const LISTING_PAGE_SIZE: u32 = 12;

// Venue-local civil time
pub const EVENT_TIMEZONE: &str = "America/Chicago";
pub const DEFAULT_EVENT_HOUR: u32 = 19;

// Rendering
pub const WAIT_UNTIL_NETWORK_IDLE: &str = "networkidle";
pub const LISTING_TIMEOUT_MS: u64 = 30_000;
pub const DETAIL_TIMEOUT_MS: u64 = 20_000;

// Pacing
pub const PAGE_DELAY_MS: u64 = 2_000;
pub const DETAIL_DELAY_MS: u64 = 1_000;
pub const DEFAULT_MAX_PAGES: u32 = 5;

// Structured extraction
pub const EXTRACTOR_MODEL: &str = "claude-sonnet-4-5-20250929";
pub const EXTRACTOR_MAX_TOKENS: u32 = 8_000;
pub const EXTRACTOR_TEMPERATURE: f32 = 0.1;
pub const EXTRACTION_CHAR_LIMIT: usize = 50_000;
pub const EXTRACTOR_REQUEST_TIMEOUT_SECS: u64 = 120;

// Metrics
pub const METRICS_JOB: &str = "catchdm_crawler";

// Record store
pub const EVENTS_TABLE: &str = "events";
pub const STORE_REQUEST_TIMEOUT_SECS: u64 = 30;
pub const TITLE_MAX_CHARS: usize = 200;
pub const DESCRIPTION_MAX_CHARS: usize = 500;
pub const LOCATION_MAX_CHARS: usize = 100;
pub const VENUE_MAX_CHARS: usize = 100;
pub const CATEGORY_MAX_CHARS: usize = 50;
pub const PRICE_MAX_CHARS: usize = 50;

// Extractor field defaults
pub const DEFAULT_LOCATION: &str = "Des Moines, IA";
pub const DEFAULT_VENUE: &str = "TBD";
pub const DEFAULT_CATEGORY: &str = "General";
pub const DEFAULT_PRICE: &str = "See website";

/// Substrings that disqualify an outbound link candidate: the site itself,
/// its CMS vendor, social networks, and analytics/CDN hosts.
pub const EXCLUDED_LINK_PATTERNS: &[&str] = &[
    "catchdesmoines.com",
    "simpleview",
    "facebook.com",
    "twitter.com",
    "instagram.com",
    "youtube.com",
    "vimeo.com",
    "google.com",
    "googleapis.com",
    "cloudflare",
    "doubleclick",
];

/// Link text fragments that mark an external link as the likely event site.
pub const PRIORITY_LINK_KEYWORDS: &[&str] = &["visit", "website", "more info", "details", "tickets"];
