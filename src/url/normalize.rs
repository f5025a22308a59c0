use crate::UrlError;
use url::Url;

/// List of tracking query parameters to remove during normalization
const TRACKING_PARAMS: &[&str] = &["fbclid", "gclid", "mc_eid", "mc_cid", "_ga"];

/// Normalizes a URL into the form used for frontier deduplication
///
/// # Normalization Steps
///
/// 1. Parse the URL; reject if malformed
/// 2. Reject anything that is not http or https
/// 3. Lowercase the host
/// 4. Remove the fragment (everything after #)
/// 5. Remove tracking query parameters (`utm_*`, `fbclid`, ...)
/// 6. Sort remaining query parameters by key
/// 7. Remove an empty query string (trailing ?)
///
/// Scheme, `www.` prefix and trailing slashes are left alone: they can
/// address a different resource.
///
/// # Examples
///
/// ```
/// use multisite_crawler::url::normalize_url;
///
/// let url = normalize_url("https://Example.COM/post?b=2&utm_source=x&a=1#top").unwrap();
/// assert_eq!(url.as_str(), "https://example.com/post?a=1&b=2");
/// ```
pub fn normalize_url(url_str: &str) -> Result<Url, UrlError> {
    let url = Url::parse(url_str).map_err(|e| UrlError::Parse(e.to_string()))?;
    normalize_parsed(url)
}

/// Returns the seen-set key for an already parsed URL
///
/// URLs that cannot be normalized (non-http schemes) fall back to their
/// serialized form so that they still deduplicate against themselves.
pub fn crawl_key(url: &Url) -> String {
    match normalize_parsed(url.clone()) {
        Ok(normalized) => normalized.into(),
        Err(_) => url.as_str().to_string(),
    }
}

fn normalize_parsed(mut url: Url) -> Result<Url, UrlError> {
    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(UrlError::InvalidScheme(format!(
            "Only HTTP and HTTPS schemes are supported, got: {}",
            url.scheme()
        )));
    }

    let host = url
        .host_str()
        .map(|h| h.to_lowercase())
        .ok_or(UrlError::MissingDomain)?;
    url.set_host(Some(&host))
        .map_err(|e| UrlError::Parse(format!("Failed to set host: {}", e)))?;

    url.set_fragment(None);

    if url.query().is_some() {
        let params = filter_and_sort_query_params(&url);
        if params.is_empty() {
            url.set_query(None);
        } else {
            url.query_pairs_mut().clear().extend_pairs(params);
        }
    }

    Ok(url)
}

/// Filters out tracking parameters and sorts remaining query parameters
fn filter_and_sort_query_params(url: &Url) -> Vec<(String, String)> {
    let mut params: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(key, _)| !is_tracking_param(key))
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();

    // Stable sort keeps repeated keys in their original order
    params.sort_by(|a, b| a.0.cmp(&b.0));
    params
}

fn is_tracking_param(key: &str) -> bool {
    key.starts_with("utm_") || TRACKING_PARAMS.contains(&key)
}
