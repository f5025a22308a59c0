use url::Url;

/// Extracts the lowercase host from a URL
///
/// # Examples
///
/// ```
/// use url::Url;
/// use multisite_crawler::url::extract_domain;
///
/// let url = Url::parse("https://EXAMPLE.COM/path").unwrap();
/// assert_eq!(extract_domain(&url), Some("example.com".to_string()));
/// ```
pub fn extract_domain(url: &Url) -> Option<String> {
    url.host_str().map(|h| h.to_lowercase())
}

/// Extracts the host used for same-site comparisons
///
/// Identical to [`extract_domain`] except that a leading `www.` is dropped,
/// so `www.example.com` and `example.com` compare equal.
pub fn site_host(url: &Url) -> Option<String> {
    extract_domain(url).map(|host| strip_www(&host).to_string())
}

fn strip_www(host: &str) -> &str {
    host.strip_prefix("www.").unwrap_or(host)
}

/// Checks if a host matches a domain pattern
///
/// 1. Exact match: `example.com` matches `example.com` (and `www.example.com`)
/// 2. Wildcard match: `*.example.com` matches `example.com` and any subdomain
///
/// Comparison is case-insensitive.
///
/// # Examples
///
/// ```
/// use multisite_crawler::url::matches_domain_pattern;
///
/// assert!(matches_domain_pattern("example.com", "www.example.com"));
/// assert!(matches_domain_pattern("*.example.com", "api.v2.example.com"));
/// assert!(!matches_domain_pattern("*.example.com", "example.org"));
/// ```
pub fn matches_domain_pattern(pattern: &str, host: &str) -> bool {
    let pattern = pattern.to_lowercase();
    let host = host.to_lowercase();
    let host = strip_www(&host);

    match pattern.strip_prefix("*.") {
        Some(base) => host == base || host.ends_with(&format!(".{}", base)),
        None => host == strip_www(&pattern),
    }
}

/// Validates a domain pattern (`example.com` or `*.example.com`)
pub fn is_valid_domain_pattern(pattern: &str) -> bool {
    let domain = pattern.strip_prefix("*.").unwrap_or(pattern);

    !domain.is_empty()
        && domain
            .chars()
            .all(|c| c.is_alphanumeric() || c == '.' || c == '-')
        && !domain.starts_with(['.', '-'])
        && !domain.ends_with(['.', '-'])
        && !domain.contains("..")
}
