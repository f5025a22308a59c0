//! Reporter traits and event types
//!
//! This module defines the events the crawl core emits while it runs and
//! the trait interface for receiving them.

use crate::crawler::FailureReason;
use std::sync::Mutex;
use thiserror::Error;

/// Errors that can occur during output operations
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("Failed to write output: {0}")]
    Write(String),

    #[error("Failed to read output: {0}")]
    Read(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type for output operations
pub type OutputResult<T> = Result<T, OutputError>;

/// Something observable that happened during a crawl run
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CrawlEvent {
    RunStarted {
        sites: usize,
    },

    /// The run had nothing to do
    NoSitesEnabled,

    SiteStarted {
        site: String,
        start_urls: usize,
        crawl_depth: u32,
    },

    PageFetched {
        site: String,
        url: String,
        depth: u32,
        status_code: u16,
    },

    FetchFailed {
        site: String,
        url: String,
        reason: FailureReason,
        retriable: bool,
    },

    /// A record was produced with some mapped fields left empty
    PartialExtraction {
        site: String,
        url: String,
        missing_fields: Vec<String>,
    },

    SiteFinished {
        site: String,
        records: usize,
        errors: usize,
        cancelled: bool,
    },

    /// The site's crawl task died; its records are lost
    SiteAborted {
        site: String,
        message: String,
    },

    RunFinished {
        sites: usize,
        records: usize,
        errors: usize,
        cancelled: bool,
    },

    SchemaViolation {
        path: String,
        message: String,
    },
}

/// Trait for crawl event sinks
///
/// Reporters are called from concurrently running site crawls and must be
/// thread-safe. Reporting is fire-and-forget: a reporter cannot fail the run.
pub trait CrawlReporter: Send + Sync {
    fn report(&self, event: &CrawlEvent);
}

/// Forwards every event to `tracing`
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingReporter;

impl CrawlReporter for TracingReporter {
    fn report(&self, event: &CrawlEvent) {
        match event {
            CrawlEvent::RunStarted { sites } => {
                tracing::info!("Starting crawl of {} enabled site(s)", sites)
            }
            CrawlEvent::NoSitesEnabled => {
                tracing::warn!("No enabled sites in configuration, nothing to crawl")
            }
            CrawlEvent::SiteStarted {
                site,
                start_urls,
                crawl_depth,
            } => tracing::info!(
                site = %site,
                "Crawling site ({} start URL(s), depth {})",
                start_urls,
                crawl_depth
            ),
            CrawlEvent::PageFetched {
                site,
                url,
                depth,
                status_code,
            } => tracing::debug!(site = %site, depth, "Fetched {} ({})", url, status_code),
            CrawlEvent::FetchFailed {
                site,
                url,
                reason,
                retriable,
            } => match reason.detail() {
                Some(detail) => tracing::warn!(
                    site = %site,
                    retriable,
                    "Failed to fetch {}: {} ({})",
                    url,
                    reason,
                    detail
                ),
                None => tracing::warn!(site = %site, retriable, "Failed to fetch {}: {}", url, reason),
            },
            CrawlEvent::PartialExtraction {
                site,
                url,
                missing_fields,
            } => tracing::debug!(
                site = %site,
                "No match on {} for: {}",
                url,
                missing_fields.join(", ")
            ),
            CrawlEvent::SiteFinished {
                site,
                records,
                errors,
                cancelled,
            } => {
                if *cancelled {
                    tracing::warn!(
                        site = %site,
                        "Site crawl cancelled after {} record(s), {} error(s)",
                        records,
                        errors
                    )
                } else {
                    tracing::info!(
                        site = %site,
                        "Site crawl finished: {} record(s), {} error(s)",
                        records,
                        errors
                    )
                }
            }
            CrawlEvent::SiteAborted { site, message } => {
                tracing::error!(site = %site, "Site crawl aborted: {}", message)
            }
            CrawlEvent::RunFinished {
                sites,
                records,
                errors,
                cancelled,
            } => tracing::info!(
                cancelled,
                "Crawl finished: {} site(s), {} record(s), {} error(s)",
                sites,
                records,
                errors
            ),
            CrawlEvent::SchemaViolation { path, message } => {
                tracing::warn!("Schema violation at {}: {}", path, message)
            }
        }
    }
}

/// Keeps every event in memory, in the order received
#[derive(Debug, Default)]
pub struct MemoryReporter {
    events: Mutex<Vec<CrawlEvent>>,
}

impl MemoryReporter {
    pub fn new() -> Self {
        Self::default()
    }

    /// A snapshot of the events received so far
    pub fn events(&self) -> Vec<CrawlEvent> {
        match self.events.lock() {
            Ok(events) => events.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Number of received events matching `predicate`
    pub fn count(&self, predicate: impl Fn(&CrawlEvent) -> bool) -> usize {
        self.events().iter().filter(|event| predicate(event)).count()
    }
}

impl CrawlReporter for MemoryReporter {
    fn report(&self, event: &CrawlEvent) {
        let mut events = match self.events.lock() {
            Ok(events) => events,
            Err(poisoned) => poisoned.into_inner(),
        };
        events.push(event.clone());
    }
}
