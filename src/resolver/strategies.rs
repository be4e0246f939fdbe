//! Individual link-resolution strategies.
//!
//! Each strategy is a pure function over a parsed page and returns the first
//! accepted candidate it finds, or `None`. Ordering between strategies is
//! owned by [`super::LinkResolver`].

use super::normalize::{accept, is_contact_link, is_same_site, Denylist};
use crate::constants::PRIORITY_LINK_KEYWORDS;
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use url::Url;

static ANCHOR: Lazy<Selector> = Lazy::new(|| Selector::parse("a[href]").unwrap());
static BUTTON: Lazy<Selector> = Lazy::new(|| Selector::parse("button[onclick]").unwrap());
static ANY_ELEMENT: Lazy<Selector> = Lazy::new(|| Selector::parse("*").unwrap());

/// `"linkUrl": "https://..."` in inline JSON, tolerating `\/` escapes.
static LINK_URL_JSON: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)["']linkUrl["']\s*:\s*["'](https?:(?:\\?/){2}[^"'\s]+)["']"#).unwrap()
});

/// The same key inside an HTML-escaped attribute value.
static LINK_URL_ESCAPED: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)&quot;linkUrl&quot;\s*:\s*&quot;(https?:(?:\\?/){2}.+?)&quot;"#).unwrap()
});

static ONCLICK_URL: Lazy<Regex> = Lazy::new(|| Regex::new(r#"https?://[^\s'"]+"#).unwrap());

const EXACT_LABEL: &str = "visit website";

/// One `<a href>` with its collapsed, lowercased visible text.
#[derive(Debug, Clone)]
pub struct Anchor {
    pub href: String,
    pub text: String,
}

/// A page parsed once and shared by every strategy.
pub struct ParsedPage<'a> {
    pub raw: &'a str,
    pub document: Html,
    pub anchors: Vec<Anchor>,
}

impl<'a> ParsedPage<'a> {
    pub fn parse(raw: &'a str) -> Self {
        let document = Html::parse_document(raw);
        let anchors = document
            .select(&ANCHOR)
            .filter_map(|el| {
                let href = el.value().attr("href")?.trim().to_string();
                Some(Anchor { href, text: visible_text(&el) })
            })
            .collect();
        Self { raw, document, anchors }
    }
}

fn visible_text(el: &ElementRef) -> String {
    el.text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Label equality that tolerates decoration such as "Visit Website »".
fn is_exact_label(text: &str) -> bool {
    let trimmed = text.trim_matches(|c: char| !c.is_alphanumeric());
    trimmed == EXACT_LABEL
}

/// Strategy 1: a link that reads exactly "Visit Website".
pub fn exact_label(page: &ParsedPage, base: &Url, denylist: &Denylist) -> Option<Url> {
    page.anchors
        .iter()
        .filter(|a| is_exact_label(&a.text))
        .find_map(|a| accept(&a.href, base, denylist))
}

/// Strategy 2: any off-site link whose text mentions "website".
pub fn loose_label(page: &ParsedPage, base: &Url, denylist: &Denylist) -> Option<Url> {
    page.anchors
        .iter()
        .filter(|a| a.text.contains("website") && !is_contact_link(&a.href))
        .filter_map(|a| accept(&a.href, base, denylist))
        .find(|url| !is_same_site(url, base))
}

/// Strategy 3: the first off-site link whose text carries a priority
/// keyword, else the first off-site link in document order. Only absolute
/// `http(s)` hrefs are candidates.
pub fn prioritized_external(page: &ParsedPage, base: &Url, denylist: &Denylist) -> Option<Url> {
    let mut first_external = None;

    for anchor in &page.anchors {
        if !is_absolute_http(&anchor.href) || is_contact_link(&anchor.href) {
            continue;
        }
        let Some(url) = accept(&anchor.href, base, denylist) else {
            continue;
        };
        if is_same_site(&url, base) {
            continue;
        }
        if PRIORITY_LINK_KEYWORDS.iter().any(|k| anchor.text.contains(k)) {
            return Some(url);
        }
        first_external.get_or_insert(url);
    }

    first_external
}

fn is_absolute_http(href: &str) -> bool {
    let lower = href.to_ascii_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://")
}

/// Strategy 4: a `linkUrl` value embedded in attributes or inline scripts,
/// then a "website" button that navigates via `onclick`.
pub fn embedded_data(page: &ParsedPage, base: &Url, denylist: &Denylist) -> Option<Url> {
    link_url_attribute(page, base, denylist)
        .or_else(|| link_url_payload(page, base, denylist))
        .or_else(|| website_button(page, base, denylist))
}

fn link_url_attribute(page: &ParsedPage, base: &Url, denylist: &Denylist) -> Option<Url> {
    page.document.select(&ANY_ELEMENT).find_map(|el| {
        el.value()
            .attrs()
            .filter(|(name, _)| name.replace('-', "").eq_ignore_ascii_case("datalinkurl"))
            .map(|(_, value)| value.trim())
            .filter(|value| value.to_ascii_lowercase().starts_with("http"))
            .find_map(|value| accept(value, base, denylist))
    })
}

fn link_url_payload(page: &ParsedPage, base: &Url, denylist: &Denylist) -> Option<Url> {
    let from_json = LINK_URL_JSON
        .captures_iter(page.raw)
        .map(|caps| caps[1].replace("\\/", "/"));
    let from_escaped = LINK_URL_ESCAPED
        .captures_iter(page.raw)
        .map(|caps| caps[1].replace("\\/", "/").replace("&amp;", "&"));

    from_json
        .chain(from_escaped)
        .find_map(|value| accept(&value, base, denylist))
}

fn website_button(page: &ParsedPage, base: &Url, denylist: &Denylist) -> Option<Url> {
    page.document
        .select(&BUTTON)
        .filter(|el| visible_text(el).contains("website"))
        .filter_map(|el| el.value().attr("onclick"))
        .flat_map(|onclick| ONCLICK_URL.find_iter(onclick))
        .find_map(|m| accept(m.as_str(), base, denylist))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> Url {
        Url::parse("https://www.catchdesmoines.com/event/jazz-night/55001/").unwrap()
    }

    fn denylist() -> Denylist {
        Denylist::for_site("catchdesmoines.com")
    }

    fn run(strategy: fn(&ParsedPage, &Url, &Denylist) -> Option<Url>, html: &str) -> Option<String> {
        let page = ParsedPage::parse(html);
        strategy(&page, &base(), &denylist()).map(|u| u.to_string())
    }

    #[test]
    fn test_exact_label_ignores_case_whitespace_and_decoration() {
        let html = r#"<a href="https://a.example/">Website</a>
            <a class="action-item" href="https://venue.example/show">
                <span>  VISIT
                WEBSITE </span> &raquo;
            </a>"#;
        assert_eq!(run(exact_label, html).as_deref(), Some("https://venue.example/show"));
    }

    #[test]
    fn test_exact_label_rejects_longer_text() {
        let html = r#"<a href="https://venue.example/">Visit Website for details</a>"#;
        assert_eq!(run(exact_label, html), None);
    }

    #[test]
    fn test_exact_label_skips_denylisted_match() {
        let html = r#"<a href="https://www.facebook.com/venue">Visit Website</a>
            <a href="https://venue.example/">Visit Website</a>"#;
        assert_eq!(run(exact_label, html).as_deref(), Some("https://venue.example/"));
    }

    #[test]
    fn test_loose_label_skips_contact_and_same_site() {
        let html = r#"<a href="mailto:info@venue.example">Email the website team</a>
            <a href="/partners/">Partner website</a>
            <a href="https://venue.example/official">Official Website</a>"#;
        assert_eq!(run(loose_label, html).as_deref(), Some("https://venue.example/official"));
    }

    #[test]
    fn test_prioritized_keyword_beats_document_order() {
        let html = r#"<a href="https://sponsor.example/">Our sponsor</a>
            <a href="https://tickets.example/e/1">Buy Tickets</a>"#;
        assert_eq!(run(prioritized_external, html).as_deref(), Some("https://tickets.example/e/1"));
    }

    #[test]
    fn test_prioritized_falls_back_to_first_external() {
        let html = r#"<a href="/events/">All events</a>
            <a href="tel:5155550100">Call</a>
            <a href="https://sponsor.example/">Our sponsor</a>
            <a href="https://other.example/">Other</a>"#;
        assert_eq!(run(prioritized_external, html).as_deref(), Some("https://sponsor.example/"));
    }

    #[test]
    fn test_prioritized_ignores_protocol_relative_links() {
        let html = r#"<a href="//venue.example/a">Tickets</a>
            <a href="HTTPS://sponsor.example/">Our sponsor</a>"#;
        assert_eq!(run(prioritized_external, html).as_deref(), Some("https://sponsor.example/"));

        let html = r#"<a href="//venue.example/a">Tickets</a>"#;
        assert_eq!(run(prioritized_external, html), None);
    }

    #[test]
    fn test_embedded_json_link_url_with_escaped_slashes() {
        let html = r#"<script>window.__data = {"event":{"linkUrl":"https:\/\/desmoinesarts.org\/festival"}};</script>"#;
        assert_eq!(run(embedded_data, html).as_deref(), Some("https://desmoinesarts.org/festival"));
    }

    #[test]
    fn test_embedded_data_attribute() {
        let html = r#"<div data-link-url="https://venue.example/landing"></div>"#;
        assert_eq!(run(embedded_data, html).as_deref(), Some("https://venue.example/landing"));
    }

    #[test]
    fn test_embedded_escaped_attribute_payload() {
        let html = r#"<div data-props="{&quot;linkUrl&quot;:&quot;https://venue.example/a?b=1&amp;c=2&quot;}"></div>"#;
        assert_eq!(run(embedded_data, html).as_deref(), Some("https://venue.example/a?b=1&c=2"));
    }

    #[test]
    fn test_website_button_onclick() {
        let html = r#"<button onclick="window.open('https://venue.example/site','_blank')">Website</button>"#;
        assert_eq!(run(embedded_data, html).as_deref(), Some("https://venue.example/site"));
    }

    #[test]
    fn test_embedded_data_ignores_relative_and_denied_values() {
        let html = r#"<script>{"linkUrl":"/event/1/"}</script>
            <script>{"linkUrl":"https://www.catchdesmoines.com/x"}</script>"#;
        assert_eq!(run(embedded_data, html), None);
    }
}
