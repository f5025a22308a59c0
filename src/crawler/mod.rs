//! Crawler module for fetching and extracting site content
//!
//! This module contains the core crawling logic, including:
//! - HTTP fetching behind the [`PageFetcher`] seam, with request throttling
//! - Selector mappings and record extraction
//! - Link discovery and the per-site breadth-first frontier
//! - Multi-site orchestration with per-site and per-URL isolation

mod coordinator;
mod extractor;
mod fetcher;
mod parser;
mod rules;
mod scheduler;
mod selector;
mod site;
mod types;

#[cfg(test)]
pub(crate) mod testing;

pub use coordinator::{run_crawl, CrawlOrchestrator};
pub use extractor::{
    normalize_publish_date, Extraction, Extractor, DEFAULT_CLEAN_TEXT_MAX_CHARS,
};
pub use fetcher::{
    build_fetcher, build_http_client, fetch_url, FailureReason, FetchResult, FetchedPage,
    HttpFetcher, PageFetcher, ThrottledFetcher, DEFAULT_TIMEOUT,
};
pub use parser::{discover_links, extract_links};
pub use rules::CrawlRules;
pub use scheduler::{Frontier, QueuedUrl, RequestThrottle};
pub use selector::{Field, SelectorError, SelectorExpr, SelectorMap};
pub use site::{CrawlSettings, SiteCrawler};
pub use types::{CrawlRun, IssueKind, Record, SiteIssue, SiteOutcome};
