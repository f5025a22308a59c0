//! Configuration types

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::time::Duration;

/// Main configuration structure
///
/// Only `sites` is required in a configuration file; the `crawler` and
/// `output` sections fall back to their defaults when omitted.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub crawler: CrawlerConfig,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub sites: Vec<SiteConfig>,
}

/// Crawler behavior configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CrawlerConfig {
    /// User-Agent header sent with every request
    pub user_agent: String,

    /// Per-request timeout (seconds)
    pub request_timeout_secs: u64,

    /// Minimum interval between two outbound requests, across all sites (milliseconds)
    pub request_delay_ms: u64,

    /// Maximum redirect hops to follow; 0 reports 3xx responses as HTTP errors
    pub max_redirects: usize,

    /// Number of sites crawled at the same time
    pub max_concurrent_sites: usize,

    /// Number of fetches in flight within one depth level of a site
    pub max_concurrent_fetches: usize,

    /// Maximum length of a record's `clean_text`, in characters
    pub clean_text_max_chars: usize,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            user_agent: format!("multisite-crawler/{}", env!("CARGO_PKG_VERSION")),
            request_timeout_secs: 10,
            request_delay_ms: 1000,
            max_redirects: 10,
            max_concurrent_sites: 1,
            max_concurrent_fetches: 1,
            clean_text_max_chars: 10_000,
        }
    }
}

impl CrawlerConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn request_delay(&self) -> Duration {
        Duration::from_millis(self.request_delay_ms)
    }
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Path of the JSON file receiving the crawled records
    pub data_path: String,

    /// Optional path of a markdown run report
    pub report_path: Option<String>,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            data_path: "data/output_data.json".to_string(),
            report_path: None,
        }
    }
}

/// One site definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SiteConfig {
    /// Unique site name, used to key per-site errors
    pub name: String,

    /// Disabled sites are skipped entirely
    #[serde(default)]
    pub enabled: bool,

    /// Seed URLs, fetched at depth 0 in this order
    pub start_urls: Vec<String>,

    /// How many link hops to follow from the seeds (0 = seeds only)
    #[serde(default = "default_crawl_depth")]
    pub crawl_depth: u32,

    /// Crawl rules (`max_pages`, `allowed_domains`, `include_patterns`, `exclude_patterns`)
    #[serde(default)]
    pub rules: BTreeMap<String, Value>,

    /// Field name to selector expression
    #[serde(default)]
    pub selector_mappings: BTreeMap<String, String>,
}

fn default_crawl_depth() -> u32 {
    1
}

impl SiteConfig {
    /// Creates an enabled site with the given seeds, depth 0 and no rules or mappings
    pub fn new(name: impl Into<String>, start_urls: Vec<String>) -> Self {
        Self {
            name: name.into(),
            enabled: true,
            start_urls,
            crawl_depth: 0,
            rules: BTreeMap::new(),
            selector_mappings: BTreeMap::new(),
        }
    }

    pub fn with_depth(mut self, crawl_depth: u32) -> Self {
        self.crawl_depth = crawl_depth;
        self
    }

    pub fn with_selector(mut self, field: impl Into<String>, expression: impl Into<String>) -> Self {
        self.selector_mappings.insert(field.into(), expression.into());
        self
    }

    pub fn with_rule(mut self, name: impl Into<String>, value: Value) -> Self {
        self.rules.insert(name.into(), value);
        self
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }
}
