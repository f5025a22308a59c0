//! HTTP fetcher implementation
//!
//! This module handles all HTTP requests for the crawler, including:
//! - Building HTTP clients with the configured user agent and redirect policy
//! - GET requests bounded by a per-request timeout
//! - Error classification into [`FailureReason`]
//! - Throttling any fetcher through a shared [`RequestThrottle`]

use crate::config::CrawlerConfig;
use crate::crawler::scheduler::RequestThrottle;
use async_trait::async_trait;
use reqwest::{redirect::Policy, Client};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

/// Default per-request timeout
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Why a fetch failed
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FailureReason {
    /// No complete response within the timeout
    Timeout,
    /// DNS, connect, TLS or body transfer failure
    ConnectionError(String),
    /// The server answered with a non-success status
    HttpError(u16),
    /// The URL cannot be requested (unsupported scheme, malformed)
    InvalidUrl(String),
}

impl FailureReason {
    /// Returns true if retrying the same request could succeed
    ///
    /// | Reason | Retriable |
    /// |--------|-----------|
    /// | Timeout | yes |
    /// | Connection error | yes |
    /// | HTTP 429, 5xx | yes |
    /// | Other HTTP status | no |
    /// | Invalid URL | no |
    pub fn is_retriable(&self) -> bool {
        match self {
            Self::Timeout | Self::ConnectionError(_) => true,
            Self::HttpError(code) => *code == 429 || (500..600).contains(code),
            Self::InvalidUrl(_) => false,
        }
    }

    /// Stable short form: `timeout`, `connection-error`, `http-error:<code>`, `invalid-url`
    pub fn code(&self) -> String {
        match self {
            Self::Timeout => "timeout".to_string(),
            Self::ConnectionError(_) => "connection-error".to_string(),
            Self::HttpError(code) => format!("http-error:{}", code),
            Self::InvalidUrl(_) => "invalid-url".to_string(),
        }
    }

    /// Underlying error text, when there is one
    pub fn detail(&self) -> Option<&str> {
        match self {
            Self::ConnectionError(detail) | Self::InvalidUrl(detail) => Some(detail),
            Self::Timeout | Self::HttpError(_) => None,
        }
    }
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.code())
    }
}

/// A successfully fetched page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedPage {
    /// The requested URL
    pub url: String,
    /// URL after followed redirects; base for resolving relative links
    pub final_url: String,
    pub status_code: u16,
    /// Raw response body
    pub content: String,
}

/// Result of a fetch operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchResult {
    Success(FetchedPage),
    Failure {
        url: String,
        reason: FailureReason,
        is_retriable: bool,
    },
}

impl FetchResult {
    /// Builds a failure, deriving `is_retriable` from the reason
    pub fn failure(url: impl Into<String>, reason: FailureReason) -> Self {
        let is_retriable = reason.is_retriable();
        Self::Failure {
            url: url.into(),
            reason,
            is_retriable,
        }
    }

    /// The requested URL
    pub fn url(&self) -> &str {
        match self {
            Self::Success(page) => &page.url,
            Self::Failure { url, .. } => url,
        }
    }
}

/// Performs one bounded-timeout GET
///
/// Implementations must never panic on network faults: every fault is
/// reported as [`FetchResult::Failure`].
#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch(&self, url: &Url, timeout: Duration) -> FetchResult;
}

/// Builds an HTTP client with proper configuration
///
/// # Example
///
/// ```no_run
/// use multisite_crawler::config::CrawlerConfig;
/// use multisite_crawler::crawler::build_http_client;
///
/// let client = build_http_client(&CrawlerConfig::default()).unwrap();
/// ```
pub fn build_http_client(config: &CrawlerConfig) -> Result<Client, reqwest::Error> {
    let redirect = if config.max_redirects == 0 {
        Policy::none()
    } else {
        Policy::limited(config.max_redirects)
    };

    Client::builder()
        .user_agent(config.user_agent.as_str())
        .connect_timeout(config.request_timeout().min(DEFAULT_TIMEOUT))
        .redirect(redirect)
        .gzip(true)
        .brotli(true)
        .build()
}

/// [`PageFetcher`] backed by a `reqwest` client
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    pub fn from_config(config: &CrawlerConfig) -> Result<Self, reqwest::Error> {
        Ok(Self::new(build_http_client(config)?))
    }
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    async fn fetch(&self, url: &Url, timeout: Duration) -> FetchResult {
        fetch_url(&self.client, url, timeout).await
    }
}

/// Fetches a URL and classifies the outcome
///
/// # Outcome Mapping
///
/// | Condition | Result |
/// |-----------|--------|
/// | 2xx with readable body | `Success` |
/// | Other status (incl. unfollowed 3xx) | `http-error:<code>` |
/// | Timeout (connect, headers or body) | `timeout` |
/// | Connect/TLS/body failure | `connection-error` |
/// | Non-http(s) scheme, builder error | `invalid-url` |
pub async fn fetch_url(client: &Client, url: &Url, timeout: Duration) -> FetchResult {
    if url.scheme() != "http" && url.scheme() != "https" {
        return FetchResult::failure(
            url.as_str(),
            FailureReason::InvalidUrl(format!("unsupported scheme '{}'", url.scheme())),
        );
    }

    let response = match client.get(url.clone()).timeout(timeout).send().await {
        Ok(response) => response,
        Err(e) => return FetchResult::failure(url.as_str(), classify_error(&e)),
    };

    let status = response.status();
    if !status.is_success() {
        return FetchResult::failure(url.as_str(), FailureReason::HttpError(status.as_u16()));
    }

    let final_url = response.url().to_string();
    match response.text().await {
        Ok(content) => FetchResult::Success(FetchedPage {
            url: url.as_str().to_string(),
            final_url,
            status_code: status.as_u16(),
            content,
        }),
        Err(e) => FetchResult::failure(url.as_str(), classify_error(&e)),
    }
}

fn classify_error(error: &reqwest::Error) -> FailureReason {
    if error.is_timeout() {
        FailureReason::Timeout
    } else if error.is_builder() {
        FailureReason::InvalidUrl(error.to_string())
    } else if let Some(status) = error.status() {
        FailureReason::HttpError(status.as_u16())
    } else {
        FailureReason::ConnectionError(error.to_string())
    }
}

/// Applies a shared [`RequestThrottle`] before delegating to another fetcher
///
/// Every fetcher that shares the throttle competes for the same request
/// slots, so the configured delay bounds the outbound rate of the whole run.
pub struct ThrottledFetcher {
    inner: Arc<dyn PageFetcher>,
    throttle: Arc<RequestThrottle>,
}

impl ThrottledFetcher {
    pub fn new(inner: Arc<dyn PageFetcher>, throttle: Arc<RequestThrottle>) -> Self {
        Self { inner, throttle }
    }
}

#[async_trait]
impl PageFetcher for ThrottledFetcher {
    async fn fetch(&self, url: &Url, timeout: Duration) -> FetchResult {
        self.throttle.acquire().await;
        self.inner.fetch(url, timeout).await
    }
}

/// Builds the production fetcher: `reqwest` behind the configured throttle
pub fn build_fetcher(config: &CrawlerConfig) -> Result<Arc<dyn PageFetcher>, reqwest::Error> {
    let http: Arc<dyn PageFetcher> = Arc::new(HttpFetcher::from_config(config)?);
    let throttle = Arc::new(RequestThrottle::new(config.request_delay()));
    Ok(Arc::new(ThrottledFetcher::new(http, throttle)))
}
