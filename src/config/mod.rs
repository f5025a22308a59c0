//! Configuration module
//!
//! This module handles loading, parsing, and validating the crawler
//! configuration. Both YAML and TOML files are accepted; the format is
//! chosen from the file extension.
//!
//! # Example
//!
//! ```no_run
//! use multisite_crawler::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("crawl_configs.yaml")).unwrap();
//! println!("{} sites configured", config.sites.len());
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{Config, CrawlerConfig, OutputConfig, SiteConfig};

// Re-export parser functions
pub use parser::{
    compute_config_hash, load_config, load_config_with_hash, parse_config, resolve_relative_to,
    ConfigFormat,
};

pub use validation::{validate, validate_site, validate_sites};
