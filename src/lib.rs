//! Multisite-crawler: a configuration-driven content crawler
//!
//! This crate crawls a declarative list of sites, extracts structured records
//! (title, author, publish date, cleaned body text) with per-site selector
//! mappings, aggregates the records of every enabled site in configuration
//! order and validates the aggregate against a fixed output schema.

pub mod config;
pub mod crawler;
pub mod output;
pub mod schema;
pub mod url;

use thiserror::Error;

/// Main error type for crawler operations
///
/// Per-URL fetch failures never surface here: they are recorded as
/// [`crawler::SiteIssue`]s on the crawl run. This type covers precondition
/// violations and faults that must stop the caller.
#[derive(Debug, Error)]
pub enum CrawlerError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Selector error: {0}")]
    Selector(#[from] crawler::SelectorError),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] ::url::ParseError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Failed to parse YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Unsupported config format: {0}")]
    UnsupportedFormat(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),

    #[error("Invalid pattern: {0}")]
    InvalidPattern(String),
}

/// URL-specific errors
#[derive(Debug, Error)]
pub enum UrlError {
    #[error("Failed to parse URL: {0}")]
    Parse(String),

    #[error("Invalid URL scheme: {0}")]
    InvalidScheme(String),

    #[error("Missing domain in URL")]
    MissingDomain,
}

/// Result type alias for crawler operations
pub type Result<T> = std::result::Result<T, CrawlerError>;

// Re-export commonly used types
pub use config::{Config, SiteConfig};
pub use crawler::{CrawlOrchestrator, CrawlRun, Record};
pub use schema::{SchemaValidator, ValidationReport};
