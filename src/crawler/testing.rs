//! In-memory fetcher for unit tests

use crate::crawler::fetcher::{FailureReason, FetchResult, FetchedPage, PageFetcher};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;
use url::Url;

#[derive(Debug, Clone)]
enum StubResponse {
    Page { content: String, delay: Duration },
    Fail(FailureReason),
    Hang,
    Panic,
}

/// Serves canned responses keyed by exact URL and records every call
///
/// Unknown URLs answer `http-error:404`.
#[derive(Debug, Default)]
pub struct StubFetcher {
    responses: HashMap<String, StubResponse>,
    calls: Mutex<Vec<String>>,
}

impl StubFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn page(self, url: &str, content: &str) -> Self {
        self.delayed_page(url, content, Duration::ZERO)
    }

    pub fn delayed_page(mut self, url: &str, content: &str, delay: Duration) -> Self {
        self.responses.insert(
            url.to_string(),
            StubResponse::Page {
                content: content.to_string(),
                delay,
            },
        );
        self
    }

    pub fn failing(mut self, url: &str, reason: FailureReason) -> Self {
        self.responses
            .insert(url.to_string(), StubResponse::Fail(reason));
        self
    }

    /// Never answers; the caller's timeout or cancellation must step in
    pub fn hanging(mut self, url: &str) -> Self {
        self.responses.insert(url.to_string(), StubResponse::Hang);
        self
    }

    pub fn panicking(mut self, url: &str) -> Self {
        self.responses.insert(url.to_string(), StubResponse::Panic);
        self
    }

    /// URLs requested so far, in call order
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl PageFetcher for StubFetcher {
    async fn fetch(&self, url: &Url, _timeout: Duration) -> FetchResult {
        self.calls.lock().unwrap().push(url.as_str().to_string());

        match self.responses.get(url.as_str()).cloned() {
            Some(StubResponse::Page { content, delay }) => {
                if !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
                FetchResult::Success(FetchedPage {
                    url: url.as_str().to_string(),
                    final_url: url.as_str().to_string(),
                    status_code: 200,
                    content,
                })
            }
            Some(StubResponse::Fail(reason)) => FetchResult::failure(url.as_str(), reason),
            Some(StubResponse::Hang) => std::future::pending().await,
            Some(StubResponse::Panic) => panic!("stub fetcher panicked on {}", url),
            None => FetchResult::failure(url.as_str(), FailureReason::HttpError(404)),
        }
    }
}
