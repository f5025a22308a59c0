//! Configuration file loading, format detection and integrity hashing

use crate::config::types::Config;
use crate::config::validation::validate;
use crate::ConfigError;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};

/// Supported configuration file formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Yaml,
    Toml,
}

impl ConfigFormat {
    /// Picks the format from the file extension (`.yaml`, `.yml` or `.toml`)
    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_ascii_lowercase());

        match extension.as_deref() {
            Some("yaml") | Some("yml") => Ok(Self::Yaml),
            Some("toml") => Ok(Self::Toml),
            other => Err(ConfigError::UnsupportedFormat(format!(
                "expected a .yaml, .yml or .toml file, got {:?}",
                other.unwrap_or("no extension")
            ))),
        }
    }
}

/// Parses configuration content without validating it
pub fn parse_config(content: &str, format: ConfigFormat) -> Result<Config, ConfigError> {
    let config = match format {
        ConfigFormat::Yaml => serde_yaml::from_str(content)?,
        ConfigFormat::Toml => toml::from_str(content)?,
    };
    Ok(config)
}

/// Loads and parses a configuration file from the given path
///
/// # Arguments
///
/// * `path` - Path to the YAML or TOML configuration file
///
/// # Returns
///
/// * `Ok(Config)` - Successfully loaded and validated configuration
/// * `Err(ConfigError)` - Failed to load, parse, or validate the configuration
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    let format = ConfigFormat::from_path(path)?;
    let content = std::fs::read_to_string(path)?;

    let config = parse_config(&content, format)?;
    validate(&config)?;

    Ok(config)
}

/// Computes a SHA-256 hash of the configuration file content
///
/// Logged at startup so that an output file can be traced back to the
/// exact configuration that produced it.
pub fn compute_config_hash(path: &Path) -> Result<String, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    Ok(hex::encode(hasher.finalize()))
}

/// Loads a configuration and returns both the config and its hash
pub fn load_config_with_hash(path: &Path) -> Result<(Config, String), ConfigError> {
    let config = load_config(path)?;
    let hash = compute_config_hash(path)?;
    Ok((config, hash))
}

/// Resolves `target` against the directory holding the configuration file
///
/// Absolute targets are returned unchanged.
pub fn resolve_relative_to(config_path: &Path, target: &str) -> PathBuf {
    let target = Path::new(target);
    if target.is_absolute() {
        return target.to_path_buf();
    }

    match config_path.parent() {
        Some(dir) => dir.join(target),
        None => target.to_path_buf(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn create_temp_config(content: &str, suffix: &str) -> NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(suffix).tempfile().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    const YAML_CONFIG: &str = r#"
sites:
  - name: blog
    enabled: true
    start_urls:
      - "https://blog.example.com/"
    crawl_depth: 2
    rules:
      max_pages: 25
    selector_mappings:
      title: "h1"
      author: ".byline"
  - name: news
    start_urls:
      - "https://news.example.com/latest"
"#;

    #[test]
    fn test_load_yaml_config() {
        let file = create_temp_config(YAML_CONFIG, ".yaml");
        let config = load_config(file.path()).unwrap();

        assert_eq!(config.sites.len(), 2);
        let blog = &config.sites[0];
        assert_eq!(blog.name, "blog");
        assert!(blog.enabled);
        assert_eq!(blog.crawl_depth, 2);
        assert_eq!(blog.rules["max_pages"], serde_json::json!(25));
        assert_eq!(blog.selector_mappings["author"], ".byline");

        // Defaults follow the original loader: disabled, depth 1
        let news = &config.sites[1];
        assert!(!news.enabled);
        assert_eq!(news.crawl_depth, 1);
        assert!(news.selector_mappings.is_empty());

        assert_eq!(config.crawler.request_timeout_secs, 10);
        assert_eq!(config.crawler.request_delay_ms, 1000);
        assert_eq!(config.output.data_path, "data/output_data.json");
    }

    #[test]
    fn test_load_toml_config() {
        let content = r#"
[crawler]
request_timeout_secs = 5
request_delay_ms = 250
max_concurrent_sites = 2

[output]
data_path = "out/records.json"

[[sites]]
name = "docs"
enabled = true
start_urls = ["https://docs.example.com/"]
crawl_depth = 0

[sites.selector_mappings]
title = "h1"
"#;
        let file = create_temp_config(content, ".toml");
        let config = load_config(file.path()).unwrap();

        assert_eq!(config.crawler.request_timeout_secs, 5);
        assert_eq!(config.crawler.max_concurrent_sites, 2);
        assert_eq!(config.crawler.max_concurrent_fetches, 1);
        assert_eq!(config.output.data_path, "out/records.json");
        assert_eq!(config.sites[0].crawl_depth, 0);
        assert_eq!(config.sites[0].selector_mappings["title"], "h1");
    }

    #[test]
    fn test_load_config_with_invalid_path() {
        let result = load_config(Path::new("/nonexistent/config.yaml"));
        assert!(matches!(result, Err(ConfigError::Io(_))));
    }

    #[test]
    fn test_unsupported_extension() {
        let file = create_temp_config(YAML_CONFIG, ".ini");
        let result = load_config(file.path());
        assert!(matches!(result, Err(ConfigError::UnsupportedFormat(_))));
    }

    #[test]
    fn test_load_config_with_invalid_yaml() {
        let file = create_temp_config("sites: [ {name: ", ".yaml");
        let result = load_config(file.path());
        assert!(matches!(result, Err(ConfigError::Yaml(_))));
    }

    #[test]
    fn test_missing_start_urls_is_a_parse_error() {
        let file = create_temp_config("sites:\n  - name: blog\n    enabled: true\n", ".yml");
        let result = load_config(file.path());
        assert!(matches!(result, Err(ConfigError::Yaml(_))));
    }

    #[test]
    fn test_load_config_with_validation_error() {
        let content = r#"
sites:
  - name: blog
    enabled: true
    start_urls: []
"#;
        let file = create_temp_config(content, ".yaml");
        let result = load_config(file.path());
        assert!(matches!(result, Err(ConfigError::Validation(_))));
    }

    #[test]
    fn test_disabled_site_with_bad_selector_still_loads() {
        let content = r#"
sites:
  - name: live
    enabled: true
    start_urls: ["https://live.example.com/"]
    selector_mappings:
      title: "h1"
  - name: parked
    enabled: false
    start_urls: ["https://parked.example.com/"]
    selector_mappings:
      summary: "p"
"#;
        let file = create_temp_config(content, ".yaml");
        let config = load_config(file.path()).unwrap();
        assert_eq!(config.sites.len(), 2);
        assert!(!config.sites[1].enabled);
    }

    #[test]
    fn test_compute_config_hash() {
        let file = create_temp_config("test content", ".yaml");

        let hash1 = compute_config_hash(file.path()).unwrap();
        let hash2 = compute_config_hash(file.path()).unwrap();

        assert_eq!(hash1, hash2);
        assert_eq!(hash1.len(), 64);
    }

    #[test]
    fn test_different_content_different_hash() {
        let file1 = create_temp_config("content 1", ".yaml");
        let file2 = create_temp_config("content 2", ".yaml");

        assert_ne!(
            compute_config_hash(file1.path()).unwrap(),
            compute_config_hash(file2.path()).unwrap()
        );
    }

    #[test]
    fn test_resolve_relative_to() {
        let config_path = Path::new("/srv/crawler/config/crawl_configs.yaml");
        assert_eq!(
            resolve_relative_to(config_path, "../data/output_data.json"),
            PathBuf::from("/srv/crawler/config/../data/output_data.json")
        );
        assert_eq!(
            resolve_relative_to(config_path, "/tmp/out.json"),
            PathBuf::from("/tmp/out.json")
        );
    }
}
