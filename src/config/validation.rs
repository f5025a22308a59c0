//! Configuration validation

use crate::config::types::{Config, CrawlerConfig, OutputConfig, SiteConfig};
use crate::crawler::{CrawlRules, SelectorMap};
use crate::url::crawl_key;
use crate::ConfigError;
use std::collections::HashSet;
use url::Url;

/// Upper bound for both concurrency knobs
const MAX_CONCURRENCY: usize = 64;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_crawler_config(&config.crawler)?;
    validate_output_config(&config.output)?;
    validate_sites(&config.sites)?;
    Ok(())
}

/// Validates crawler configuration
fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    if config.user_agent.trim().is_empty() {
        return Err(ConfigError::Validation(
            "user_agent cannot be empty".to_string(),
        ));
    }

    if config.request_timeout_secs == 0 {
        return Err(ConfigError::Validation(
            "request_timeout_secs must be >= 1".to_string(),
        ));
    }

    for (name, value) in [
        ("max_concurrent_sites", config.max_concurrent_sites),
        ("max_concurrent_fetches", config.max_concurrent_fetches),
    ] {
        if value < 1 || value > MAX_CONCURRENCY {
            return Err(ConfigError::Validation(format!(
                "{} must be between 1 and {}, got {}",
                name, MAX_CONCURRENCY, value
            )));
        }
    }

    if config.clean_text_max_chars < 1 {
        return Err(ConfigError::Validation(
            "clean_text_max_chars must be >= 1".to_string(),
        ));
    }

    Ok(())
}

/// Validates output configuration
fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    if config.data_path.trim().is_empty() {
        return Err(ConfigError::Validation(
            "data_path cannot be empty".to_string(),
        ));
    }

    if matches!(&config.report_path, Some(path) if path.trim().is_empty()) {
        return Err(ConfigError::Validation(
            "report_path cannot be empty when set".to_string(),
        ));
    }

    Ok(())
}

/// Validates a list of sites
///
/// Only enabled sites are checked field by field; disabled sites are never
/// crawled. Names must be unique across the whole list.
pub fn validate_sites(sites: &[SiteConfig]) -> Result<(), ConfigError> {
    let mut names = HashSet::new();
    for site in sites {
        if site.enabled {
            validate_site(site)?;
        }
        if !names.insert(site.name.as_str()) {
            return Err(ConfigError::Validation(format!(
                "Duplicate site name '{}'",
                site.name
            )));
        }
    }
    Ok(())
}

/// Validates one site definition
///
/// A site needs a name and at least one absolute http(s) start URL. Start
/// URLs must be unique; two URLs that differ only by fragment or tracking
/// parameters count as duplicates. Rules and selector mappings must parse.
pub fn validate_site(site: &SiteConfig) -> Result<(), ConfigError> {
    if site.name.trim().is_empty() {
        return Err(ConfigError::Validation(
            "Site name cannot be empty".to_string(),
        ));
    }

    if site.start_urls.is_empty() {
        return Err(ConfigError::Validation(format!(
            "Site '{}' must have at least one start URL",
            site.name
        )));
    }

    let mut seen = HashSet::new();
    for start_url in &site.start_urls {
        let url = Url::parse(start_url).map_err(|e| {
            ConfigError::InvalidUrl(format!(
                "Site '{}': invalid start URL '{}': {}",
                site.name, start_url, e
            ))
        })?;

        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(ConfigError::InvalidUrl(format!(
                "Site '{}': start URL '{}' must use http or https",
                site.name, start_url
            )));
        }

        if url.host_str().is_none() {
            return Err(ConfigError::InvalidUrl(format!(
                "Site '{}': start URL '{}' has no host",
                site.name, start_url
            )));
        }

        if !seen.insert(crawl_key(&url)) {
            return Err(ConfigError::Validation(format!(
                "Site '{}': duplicate start URL '{}'",
                site.name, start_url
            )));
        }
    }

    CrawlRules::from_rules(&site.rules)
        .map_err(|e| ConfigError::Validation(format!("Site '{}': {}", site.name, e)))?;

    SelectorMap::from_mappings(&site.selector_mappings)
        .map_err(|e| ConfigError::Validation(format!("Site '{}': {}", site.name, e)))?;

    Ok(())
}
