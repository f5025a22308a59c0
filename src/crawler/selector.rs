//! Field selector mappings
//!
//! A site maps record fields to selector expressions. Expressions come in
//! three forms:
//!
//! | Form | Meaning |
//! |------|---------|
//! | `h1.title`, `css:h1.title` | text of the first matching element |
//! | `attr:meta[name=author]@content` | attribute of the first matching element |
//! | `regex:<pattern>` | first match against the raw content, group 1 if present |

use regex::Regex;
use scraper::Selector;
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

/// A record field that can be mapped to a selector
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Field {
    Title,
    Author,
    PublishDate,
    Content,
}

impl Field {
    /// Resolves a configuration key (`content`, `clean_text` and `body` are aliases)
    pub fn from_key(key: &str) -> Option<Self> {
        match key.trim().to_ascii_lowercase().as_str() {
            "title" => Some(Self::Title),
            "author" => Some(Self::Author),
            "publish_date" | "date" => Some(Self::PublishDate),
            "content" | "clean_text" | "body" => Some(Self::Content),
            _ => None,
        }
    }

    /// The record key the field fills
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Title => "title",
            Self::Author => "author",
            Self::PublishDate => "publish_date",
            Self::Content => "clean_text",
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors building a [`SelectorMap`]
#[derive(Debug, Error)]
pub enum SelectorError {
    #[error("Unknown field '{0}' (expected title, author, publish_date or content)")]
    UnknownField(String),

    #[error("Field '{field}' is mapped more than once")]
    DuplicateField { field: Field },

    #[error("Empty selector for field '{field}'")]
    Empty { field: Field },

    #[error("Invalid CSS selector for '{field}': '{expression}' ({message})")]
    InvalidCss {
        field: Field,
        expression: String,
        message: String,
    },

    #[error("Invalid attribute selector for '{field}': '{expression}' (expected attr:<css>@<attribute>)")]
    InvalidAttribute { field: Field, expression: String },

    #[error("Invalid regex for '{field}': '{expression}'")]
    InvalidRegex {
        field: Field,
        expression: String,
        #[source]
        source: regex::Error,
    },
}

/// A parsed selector expression
#[derive(Debug, Clone)]
pub enum SelectorExpr {
    Css {
        source: String,
        selector: Selector,
    },
    Attribute {
        source: String,
        selector: Selector,
        attribute: String,
    },
    Regex {
        source: String,
        regex: Regex,
    },
}

impl SelectorExpr {
    /// Parses one expression for `field`
    pub fn parse(field: Field, expression: &str) -> Result<Self, SelectorError> {
        let source = expression.trim();
        if source.is_empty() {
            return Err(SelectorError::Empty { field });
        }

        if let Some(pattern) = source.strip_prefix("regex:") {
            let regex = Regex::new(pattern).map_err(|e| SelectorError::InvalidRegex {
                field,
                expression: source.to_string(),
                source: e,
            })?;
            return Ok(Self::Regex {
                source: source.to_string(),
                regex,
            });
        }

        if let Some(rest) = source.strip_prefix("attr:") {
            let (css, attribute) = rest
                .rsplit_once('@')
                .map(|(css, attribute)| (css.trim(), attribute.trim()))
                .filter(|(css, attribute)| !css.is_empty() && !attribute.is_empty())
                .ok_or_else(|| SelectorError::InvalidAttribute {
                    field,
                    expression: source.to_string(),
                })?;
            return Ok(Self::Attribute {
                source: source.to_string(),
                selector: parse_css(field, source, css)?,
                attribute: attribute.to_string(),
            });
        }

        let css = source.strip_prefix("css:").unwrap_or(source).trim();
        if css.is_empty() {
            return Err(SelectorError::Empty { field });
        }
        Ok(Self::Css {
            source: source.to_string(),
            selector: parse_css(field, source, css)?,
        })
    }

    /// The expression as written in the configuration
    pub fn source(&self) -> &str {
        match self {
            Self::Css { source, .. } | Self::Attribute { source, .. } | Self::Regex { source, .. } => {
                source
            }
        }
    }
}

fn parse_css(field: Field, expression: &str, css: &str) -> Result<Selector, SelectorError> {
    Selector::parse(css).map_err(|e| SelectorError::InvalidCss {
        field,
        expression: expression.to_string(),
        message: format!("{:?}", e),
    })
}

/// Typed extraction instructions for one site
///
/// Fields absent from the map are not searched for: their record values
/// stay empty (or fall back to the page body for `clean_text`) and they are
/// never reported as missing.
#[derive(Debug, Clone, Default)]
pub struct SelectorMap {
    entries: BTreeMap<Field, SelectorExpr>,
}

impl SelectorMap {
    /// Builds a map from the raw `field -> expression` configuration
    ///
    /// # Example
    ///
    /// ```
    /// use std::collections::BTreeMap;
    /// use multisite_crawler::crawler::{Field, SelectorMap};
    ///
    /// let mut raw = BTreeMap::new();
    /// raw.insert("title".to_string(), "h1".to_string());
    /// raw.insert("author".to_string(), "attr:meta[name=author]@content".to_string());
    ///
    /// let map = SelectorMap::from_mappings(&raw).unwrap();
    /// assert!(map.get(Field::Author).is_some());
    /// assert!(map.get(Field::Content).is_none());
    /// ```
    pub fn from_mappings(mappings: &BTreeMap<String, String>) -> Result<Self, SelectorError> {
        let mut entries = BTreeMap::new();
        for (key, expression) in mappings {
            let field =
                Field::from_key(key).ok_or_else(|| SelectorError::UnknownField(key.clone()))?;
            let expr = SelectorExpr::parse(field, expression)?;
            if entries.insert(field, expr).is_some() {
                return Err(SelectorError::DuplicateField { field });
            }
        }
        Ok(Self { entries })
    }

    pub fn get(&self, field: Field) -> Option<&SelectorExpr> {
        self.entries.get(&field)
    }
}
