//! Outbound "visit website" link resolution.
//!
//! The resolver runs an ordered chain of strategies over a rendered detail
//! page and returns the first accepted candidate. Every candidate is made
//! absolute and checked against the [`Denylist`] before it is accepted.
//! Unparseable or empty pages simply yield `None`.

pub mod normalize;
pub mod strategies;

pub use normalize::Denylist;
use strategies::ParsedPage;
use tracing::debug;
use url::Url;

pub type Strategy = fn(&ParsedPage, &Url, &Denylist) -> Option<Url>;

/// Strategies in evaluation order.
pub const STRATEGIES: &[(&str, Strategy)] = &[
    ("exact_label", strategies::exact_label),
    ("loose_label", strategies::loose_label),
    ("prioritized_external", strategies::prioritized_external),
    ("embedded_data", strategies::embedded_data),
];

#[derive(Debug, Clone)]
pub struct LinkResolver {
    denylist: Denylist,
}

impl LinkResolver {
    pub fn new(denylist: Denylist) -> Self {
        Self { denylist }
    }

    /// Resolver for one source site: the default denylist plus its domain.
    pub fn for_site(domain: &str) -> Self {
        Self::new(Denylist::for_site(domain))
    }

    pub fn denylist(&self) -> &Denylist {
        &self.denylist
    }

    /// Returns the page's single best outbound URL, if any.
    pub fn resolve(&self, html: &str, base: &Url) -> Option<Url> {
        self.resolve_with_strategy(html, base).map(|(_, url)| url)
    }

    /// Like [`resolve`](Self::resolve), also naming the strategy that won.
    pub fn resolve_with_strategy(&self, html: &str, base: &Url) -> Option<(&'static str, Url)> {
        if html.trim().is_empty() {
            return None;
        }
        let page = ParsedPage::parse(html);

        let found = STRATEGIES.iter().find_map(|(name, strategy)| {
            strategy(&page, base, &self.denylist).map(|url| (*name, url))
        });

        match &found {
            Some((name, url)) => debug!(strategy = *name, url = %url, "Resolved outbound link"),
            None => debug!(anchors = page.anchors.len(), "No outbound link candidate"),
        }
        found
    }
}
