//! URL handling module
//!
//! This module provides crawl-key normalization, host extraction, domain
//! pattern matching and the same-site link policy used during link
//! discovery.

mod domain;
mod normalize;

// Re-export main functions
pub use domain::{extract_domain, is_valid_domain_pattern, matches_domain_pattern, site_host};
pub use normalize::{crawl_key, normalize_url};

use url::Url;

/// Where a discovered link points relative to the site being crawled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LinkScope {
    /// Same host as one of the site's start URLs
    SameSite,
    /// Another host explicitly listed in the site's `allowed_domains` rule
    Allowed,
    /// Anything else; never followed
    External,
}

impl LinkScope {
    /// Returns true if a link in this scope may be enqueued
    pub fn is_followable(&self) -> bool {
        matches!(self, Self::SameSite | Self::Allowed)
    }
}

/// Classifies a discovered link against the site's hosts
///
/// Link following is same-domain only: `site_hosts` are the hosts of the
/// site's start URLs (as returned by [`site_host`]). Hosts matching one of
/// `allowed_domains` are also followed.
///
/// # Examples
///
/// ```
/// use url::Url;
/// use multisite_crawler::url::{classify_link, LinkScope};
///
/// let hosts = vec!["blog.example.com".to_string()];
/// let link = Url::parse("https://www.blog.example.com/post").unwrap();
/// assert_eq!(classify_link(&link, &hosts, &[]), LinkScope::SameSite);
///
/// let link = Url::parse("https://cdn.example.com/post").unwrap();
/// assert_eq!(classify_link(&link, &hosts, &[]), LinkScope::External);
/// assert_eq!(
///     classify_link(&link, &hosts, &["*.example.com".to_string()]),
///     LinkScope::Allowed
/// );
/// ```
pub fn classify_link(url: &Url, site_hosts: &[String], allowed_domains: &[String]) -> LinkScope {
    let Some(host) = site_host(url) else {
        return LinkScope::External;
    };

    if site_hosts.iter().any(|site| *site == host) {
        return LinkScope::SameSite;
    }

    if allowed_domains
        .iter()
        .any(|pattern| matches_domain_pattern(pattern, &host))
    {
        return LinkScope::Allowed;
    }

    LinkScope::External
}
