//! Output module for persisting and reporting crawl results
//!
//! This module handles:
//! - Writing and reading the JSON record document
//! - Crawl events and the reporters that receive them
//! - Run statistics and markdown reports

pub mod json;
mod markdown;
pub mod stats;
mod traits;

pub use json::{read_json_document, read_records, write_json_document};
pub use markdown::{format_markdown_report, generate_markdown_report};
pub use stats::{print_statistics, RunStatistics, SiteStatistics};
pub use traits::{
    CrawlEvent, CrawlReporter, MemoryReporter, OutputError, OutputResult, TracingReporter,
};
