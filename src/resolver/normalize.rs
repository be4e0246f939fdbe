use crate::constants::EXCLUDED_LINK_PATTERNS;
use url::Url;

/// Case-insensitive substring denylist applied to every link candidate.
#[derive(Debug, Clone, Default)]
pub struct Denylist {
    patterns: Vec<String>,
}

impl Denylist {
    pub fn new<I, S>(patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let patterns = patterns
            .into_iter()
            .map(|p| p.as_ref().trim().to_lowercase())
            .filter(|p| !p.is_empty())
            .collect();
        Self { patterns }
    }

    /// The built-in social/analytics/CDN list plus the site's own domain.
    pub fn for_site(domain: &str) -> Self {
        let mut denylist = Self::new(EXCLUDED_LINK_PATTERNS.iter().copied());
        denylist.push(domain);
        denylist
    }

    pub fn push(&mut self, pattern: &str) {
        let pattern = pattern.trim().to_lowercase();
        if !pattern.is_empty() && !self.patterns.contains(&pattern) {
            self.patterns.push(pattern);
        }
    }

    pub fn blocks(&self, url: &str) -> bool {
        let url = url.to_lowercase();
        self.patterns.iter().any(|p| url.contains(p.as_str()))
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }
}

/// Makes a raw `href` absolute: `//host/x` gets `https:`, `/x` is joined to
/// the base origin. Anything that is still not an `http(s)` URL is rejected.
pub fn absolutize(raw: &str, base: &Url) -> Option<Url> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    let candidate = if raw.starts_with("//") {
        format!("https:{raw}")
    } else if raw.starts_with('/') {
        format!("{}{}", base.origin().ascii_serialization(), raw)
    } else {
        raw.to_string()
    };

    if !candidate.to_ascii_lowercase().starts_with("http") {
        return None;
    }

    let url = Url::parse(&candidate).ok()?;
    match url.scheme() {
        "http" | "https" if url.host_str().is_some() => Some(url),
        _ => None,
    }
}

/// Absolutizes and applies the denylist.
pub fn accept(raw: &str, base: &Url, denylist: &Denylist) -> Option<Url> {
    let url = absolutize(raw, base)?;
    if denylist.blocks(url.as_str()) {
        return None;
    }
    Some(url)
}

/// True when `url` points at the same site as `base`, ignoring a leading
/// `www.` and treating subdomains of the base host as the same site.
pub fn is_same_site(url: &Url, base: &Url) -> bool {
    let (Some(host), Some(base_host)) = (url.host_str(), base.host_str()) else {
        return false;
    };
    let host = host.to_ascii_lowercase();
    let site = base_host.to_ascii_lowercase();
    let site = site.strip_prefix("www.").unwrap_or(&site);
    let host = host.strip_prefix("www.").unwrap_or(&host);
    host == site || host.ends_with(&format!(".{site}"))
}

/// `mailto:` and `tel:` links are never event sites.
pub fn is_contact_link(raw: &str) -> bool {
    let raw = raw.trim_start().to_ascii_lowercase();
    raw.starts_with("mailto:") || raw.starts_with("tel:")
}
