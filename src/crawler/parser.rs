//! Link discovery from fetched HTML
//!
//! Links are taken from `<a href>` tags and `<link rel="canonical">`.
//! Downloads, script-like schemes, data URIs and same-page anchors are skipped.

use scraper::{Html, Selector};
use url::Url;

/// Discovers followable links in a parsed document
///
/// # Link Extraction Rules
///
/// **Include:**
/// - `<a href="...">` anywhere in the document
/// - `<link rel="canonical" href="...">`
///
/// **Exclude:**
/// - `<a href="..." download>`
/// - `javascript:`, `mailto:`, `tel:` links
/// - Data URIs
/// - Fragment-only links (`#section`)
/// - Anything that is not http(s) after resolution
///
/// `rel="nofollow"` links are followed. Links are returned in document
/// order with duplicates removed; the first occurrence wins.
pub fn discover_links(document: &Html, base_url: &Url) -> Vec<Url> {
    let mut links: Vec<Url> = Vec::new();

    let mut push = |href: &str| {
        if let Some(url) = resolve_link(href, base_url) {
            if !links.contains(&url) {
                links.push(url);
            }
        }
    };

    if let Ok(anchor) = Selector::parse("a[href]") {
        for element in document.select(&anchor) {
            if element.value().attr("download").is_some() {
                continue;
            }
            if let Some(href) = element.value().attr("href") {
                push(href);
            }
        }
    }

    if let Ok(canonical) = Selector::parse("link[rel='canonical'][href]") {
        for element in document.select(&canonical) {
            if let Some(href) = element.value().attr("href") {
                push(href);
            }
        }
    }

    links
}

/// Parses `html` and discovers its links
///
/// # Example
///
/// ```
/// use multisite_crawler::crawler::extract_links;
/// use url::Url;
///
/// let base = Url::parse("https://example.com/blog/").unwrap();
/// let links = extract_links(r#"<a href="post-1">One</a>"#, &base);
/// assert_eq!(links[0].as_str(), "https://example.com/blog/post-1");
/// ```
pub fn extract_links(html: &str, base_url: &Url) -> Vec<Url> {
    let document = Html::parse_document(html);
    discover_links(&document, base_url)
}

/// Resolves a link href to an absolute http(s) URL
fn resolve_link(href: &str, base_url: &Url) -> Option<Url> {
    let href = href.trim();

    if href.is_empty() || href.starts_with('#') {
        return None;
    }

    let lower = href.to_ascii_lowercase();
    if ["javascript:", "mailto:", "tel:", "data:"]
        .iter()
        .any(|scheme| lower.starts_with(scheme))
    {
        return None;
    }

    let absolute = base_url.join(href).ok()?;
    match absolute.scheme() {
        "http" | "https" => Some(absolute),
        _ => None,
    }
}
