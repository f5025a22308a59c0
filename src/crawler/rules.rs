//! Per-site crawl rules
//!
//! Rules come from the free-form `rules` mapping of a site definition.
//! Known rules:
//!
//! - `max_pages`: cap on fetch attempts for the site (integer >= 1)
//! - `allowed_domains`: extra hosts whose links are followed (`example.com`, `*.example.com`)
//! - `include_patterns`: discovered links must match at least one regex
//! - `exclude_patterns`: discovered links matching any regex are skipped
//!
//! Unknown rule names are ignored with a debug log.

use crate::url::is_valid_domain_pattern;
use crate::ConfigError;
use regex::Regex;
use serde_json::Value;
use std::collections::BTreeMap;
use url::Url;

/// Parsed rules for one site
#[derive(Debug, Clone, Default)]
pub struct CrawlRules {
    pub max_pages: Option<usize>,
    pub allowed_domains: Vec<String>,
    pub include_patterns: Vec<Regex>,
    pub exclude_patterns: Vec<Regex>,
}

impl CrawlRules {
    pub fn from_rules(rules: &BTreeMap<String, Value>) -> Result<Self, ConfigError> {
        let mut parsed = Self::default();

        for (name, value) in rules {
            match name.as_str() {
                "max_pages" => parsed.max_pages = Some(parse_max_pages(value)?),
                "allowed_domains" => {
                    let domains = string_list(name, value)?;
                    if let Some(bad) = domains.iter().find(|d| !is_valid_domain_pattern(d)) {
                        return Err(ConfigError::InvalidPattern(format!(
                            "allowed_domains: invalid domain pattern '{}'",
                            bad
                        )));
                    }
                    parsed.allowed_domains = domains;
                }
                "include_patterns" => parsed.include_patterns = regex_list(name, value)?,
                "exclude_patterns" => parsed.exclude_patterns = regex_list(name, value)?,
                other => tracing::debug!("Ignoring unknown crawl rule '{}'", other),
            }
        }

        Ok(parsed)
    }

    /// Returns true if a discovered link passes the include/exclude filters
    pub fn permits(&self, url: &Url) -> bool {
        let target = url.as_str();

        if self.exclude_patterns.iter().any(|re| re.is_match(target)) {
            return false;
        }

        self.include_patterns.is_empty() || self.include_patterns.iter().any(|re| re.is_match(target))
    }

    /// Returns true once `fetches` reached the page cap
    pub fn page_limit_reached(&self, fetches: usize) -> bool {
        matches!(self.max_pages, Some(max) if fetches >= max)
    }
}

fn parse_max_pages(value: &Value) -> Result<usize, ConfigError> {
    value
        .as_u64()
        .filter(|n| *n >= 1)
        .and_then(|n| usize::try_from(n).ok())
        .ok_or_else(|| {
            ConfigError::Validation(format!(
                "max_pages must be an integer >= 1, got {}",
                value
            ))
        })
}

fn string_list(name: &str, value: &Value) -> Result<Vec<String>, ConfigError> {
    let invalid = || ConfigError::Validation(format!("{} must be a list of strings", name));

    // A single string is accepted as a one-element list
    if let Some(single) = value.as_str() {
        return Ok(vec![single.to_string()]);
    }

    value
        .as_array()
        .ok_or_else(invalid)?
        .iter()
        .map(|item| item.as_str().map(str::to_string).ok_or_else(invalid))
        .collect()
}

fn regex_list(name: &str, value: &Value) -> Result<Vec<Regex>, ConfigError> {
    string_list(name, value)?
        .iter()
        .map(|pattern| {
            Regex::new(pattern).map_err(|e| {
                ConfigError::InvalidPattern(format!("{}: '{}': {}", name, pattern, e))
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn rules(pairs: &[(&str, Value)]) -> BTreeMap<String, Value> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn test_empty_rules() {
        let parsed = CrawlRules::from_rules(&BTreeMap::new()).unwrap();
        assert_eq!(parsed.max_pages, None);
        assert!(parsed.permits(&Url::parse("https://example.com/anything").unwrap()));
        assert!(!parsed.page_limit_reached(1_000_000));
    }

    #[test]
    fn test_max_pages() {
        let parsed = CrawlRules::from_rules(&rules(&[("max_pages", json!(3))])).unwrap();
        assert_eq!(parsed.max_pages, Some(3));
        assert!(!parsed.page_limit_reached(2));
        assert!(parsed.page_limit_reached(3));

        for bad in [json!(0), json!(-1), json!("ten"), json!(2.5)] {
            assert!(
                CrawlRules::from_rules(&rules(&[("max_pages", bad.clone())])).is_err(),
                "expected {} to be rejected",
                bad
            );
        }
    }

    #[test]
    fn test_include_and_exclude() {
        let parsed = CrawlRules::from_rules(&rules(&[
            ("include_patterns", json!(["/blog/"])),
            ("exclude_patterns", json!(["\\.pdf$", "/tag/"])),
        ]))
        .unwrap();

        let permits = |s: &str| parsed.permits(&Url::parse(s).unwrap());
        assert!(permits("https://example.com/blog/post-1"));
        assert!(!permits("https://example.com/about"));
        assert!(!permits("https://example.com/blog/tag/rust"));
        assert!(!permits("https://example.com/blog/paper.pdf"));
    }

    #[test]
    fn test_allowed_domains() {
        let parsed =
            CrawlRules::from_rules(&rules(&[("allowed_domains", json!("*.example.com"))])).unwrap();
        assert_eq!(parsed.allowed_domains, ["*.example.com"]);

        let bad = CrawlRules::from_rules(&rules(&[("allowed_domains", json!(["exa mple.com"]))]));
        assert!(matches!(bad, Err(ConfigError::InvalidPattern(_))));

        let bad = CrawlRules::from_rules(&rules(&[("allowed_domains", json!([1, 2]))]));
        assert!(matches!(bad, Err(ConfigError::Validation(_))));
    }

    #[test]
    fn test_invalid_regex() {
        let result = CrawlRules::from_rules(&rules(&[("exclude_patterns", json!(["(unclosed"]))]));
        assert!(matches!(result, Err(ConfigError::InvalidPattern(_))));
    }

    #[test]
    fn test_unknown_rules_ignored() {
        let parsed = CrawlRules::from_rules(&rules(&[("follow_robots", json!(true))])).unwrap();
        assert!(parsed.max_pages.is_none());
    }
}
