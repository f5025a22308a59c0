//! Record extraction from fetched pages
//!
//! The extractor never fails: a selector that matches nothing leaves its
//! field empty and is reported in [`Extraction::missing_fields`].

use crate::crawler::fetcher::FetchedPage;
use crate::crawler::selector::{Field, SelectorExpr, SelectorMap};
use crate::crawler::types::Record;
use chrono::{DateTime, NaiveDate};
use scraper::node::Node;
use scraper::{ElementRef, Html, Selector};

/// Default cap on `clean_text`, in characters
pub const DEFAULT_CLEAN_TEXT_MAX_CHARS: usize = 10_000;

/// Elements whose text never reaches `clean_text`
const HIDDEN_ELEMENTS: &[&str] = &["script", "style", "noscript", "template", "head"];

/// Elements that separate words from their neighbours
const BLOCK_ELEMENTS: &[&str] = &[
    "address", "article", "aside", "blockquote", "br", "dd", "div", "dl", "dt", "figcaption",
    "figure", "footer", "form", "h1", "h2", "h3", "h4", "h5", "h6", "header", "hr", "li", "main",
    "nav", "ol", "p", "pre", "section", "table", "td", "th", "tr", "ul",
];

/// A record plus the mapped fields that found nothing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Extraction {
    pub record: Record,
    pub missing_fields: Vec<Field>,
}

impl Extraction {
    /// True if at least one mapped field had no match
    pub fn is_partial(&self) -> bool {
        !self.missing_fields.is_empty()
    }

    pub fn missing_field_names(&self) -> Vec<String> {
        self.missing_fields
            .iter()
            .map(|field| field.as_str().to_string())
            .collect()
    }
}

/// Applies a [`SelectorMap`] to fetched content
#[derive(Debug, Clone, Copy)]
pub struct Extractor {
    max_text_chars: usize,
}

impl Default for Extractor {
    fn default() -> Self {
        Self::new(DEFAULT_CLEAN_TEXT_MAX_CHARS)
    }
}

impl Extractor {
    pub fn new(max_text_chars: usize) -> Self {
        Self {
            max_text_chars: max_text_chars.max(1),
        }
    }

    /// Parses the page and extracts a record
    pub fn extract(&self, page: &FetchedPage, selectors: &SelectorMap) -> Extraction {
        let document = Html::parse_document(&page.content);
        self.extract_document(&document, page, selectors)
    }

    /// Extracts a record from an already parsed page
    ///
    /// `source_url` is the requested URL and `raw_html` the full content,
    /// whatever the selectors find.
    pub fn extract_document(
        &self,
        document: &Html,
        page: &FetchedPage,
        selectors: &SelectorMap,
    ) -> Extraction {
        let mut missing_fields = Vec::new();
        let mut value_of = |field: Field| -> Option<String> {
            let expr = selectors.get(field)?;
            let value = apply(expr, document, &page.content);
            if value.is_none() {
                tracing::debug!(
                    "{} selector '{}' matched nothing on {}",
                    field,
                    expr.source(),
                    page.url
                );
                missing_fields.push(field);
            }
            Some(value.unwrap_or_default())
        };

        let title = value_of(Field::Title).unwrap_or_default();
        let author = value_of(Field::Author).unwrap_or_default();
        let publish_date = value_of(Field::PublishDate)
            .map(|raw| normalize_publish_date(&raw))
            .unwrap_or_default();
        let clean_text = value_of(Field::Content).unwrap_or_else(|| body_text(document));

        Extraction {
            record: Record {
                source_url: page.url.clone(),
                title,
                publish_date,
                author,
                raw_html: page.content.clone(),
                clean_text: truncate_chars(&clean_text, self.max_text_chars),
            },
            missing_fields,
        }
    }
}

/// Resolves one expression; `None` means nothing matched
fn apply(expr: &SelectorExpr, document: &Html, raw: &str) -> Option<String> {
    match expr {
        SelectorExpr::Css { selector, .. } => document.select(selector).next().map(element_text),
        SelectorExpr::Attribute {
            selector,
            attribute,
            ..
        } => document
            .select(selector)
            .find_map(|element| element.value().attr(attribute))
            .map(normalize_whitespace),
        SelectorExpr::Regex { regex, .. } => {
            let captures = regex.captures(raw)?;
            let matched = captures.get(1).or_else(|| captures.get(0))?;
            Some(strip_tags(matched.as_str()))
        }
    }
}

/// Visible text of the `<body>`, or of the whole document without one
fn body_text(document: &Html) -> String {
    let body = Selector::parse("body")
        .ok()
        .and_then(|selector| document.select(&selector).next())
        .unwrap_or_else(|| document.root_element());
    element_text(body)
}

fn element_text(element: ElementRef) -> String {
    let mut buffer = String::new();
    collect_text(element, &mut buffer);
    normalize_whitespace(&buffer)
}

fn collect_text(element: ElementRef, buffer: &mut String) {
    for child in element.children() {
        match child.value() {
            Node::Text(text) => buffer.push_str(text),
            Node::Element(_) => {
                let Some(child) = ElementRef::wrap(child) else {
                    continue;
                };
                let name = child.value().name();
                if HIDDEN_ELEMENTS.contains(&name) {
                    continue;
                }
                let block = BLOCK_ELEMENTS.contains(&name);
                if block {
                    buffer.push(' ');
                }
                collect_text(child, buffer);
                if block {
                    buffer.push(' ');
                }
            }
            _ => {}
        }
    }
}

/// Removes markup from an HTML snippet and normalizes its whitespace
pub fn strip_tags(snippet: &str) -> String {
    if !snippet.contains('<') {
        return normalize_whitespace(snippet);
    }
    let fragment = Html::parse_fragment(snippet);
    element_text(fragment.root_element())
}

/// Collapses whitespace runs to single spaces and trims
pub fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Cuts `text` to at most `max_chars` characters
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((end, _)) => text[..end].trim_end().to_string(),
        None => text.to_string(),
    }
}

/// Normalizes recognized date formats to ISO-8601
///
/// | Input | Output |
/// |-------|--------|
/// | RFC 3339 | RFC 3339 |
/// | RFC 2822 | RFC 3339 |
/// | `YYYY-MM-DD` | unchanged |
/// | anything else | the trimmed input |
pub fn normalize_publish_date(raw: &str) -> String {
    let raw = raw.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return parsed.to_rfc3339();
    }
    if let Ok(parsed) = DateTime::parse_from_rfc2822(raw) {
        return parsed.to_rfc3339();
    }
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return date.format("%Y-%m-%d").to_string();
    }
    raw.to_string()
}
