//! Records and run aggregates produced by a crawl

use crate::crawler::fetcher::FailureReason;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

/// One extracted page
///
/// Every field is a plain string; fields the extractor could not resolve
/// are empty. `source_url` is serialized under the schema key `url`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    /// The exact URL that was requested
    #[serde(rename = "url")]
    pub source_url: String,
    pub title: String,
    pub publish_date: String,
    pub author: String,
    /// The full fetched content
    pub raw_html: String,
    pub clean_text: String,
}

/// What went wrong (or was degraded) for one URL of a site
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IssueKind {
    /// The fetch failed; no record was produced for the URL
    FetchFailed {
        reason: FailureReason,
        retriable: bool,
    },
    /// A record was produced but some mapped fields did not match
    PartialExtraction { missing_fields: Vec<String> },
    /// The site crawl itself died; records of this site are lost
    SiteAborted { message: String },
}

/// An entry in a site's error list
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SiteIssue {
    pub url: String,
    pub kind: IssueKind,
}

impl SiteIssue {
    pub fn fetch_failed(url: impl Into<String>, reason: FailureReason, retriable: bool) -> Self {
        Self {
            url: url.into(),
            kind: IssueKind::FetchFailed { reason, retriable },
        }
    }

    pub fn partial_extraction(url: impl Into<String>, missing_fields: Vec<String>) -> Self {
        Self {
            url: url.into(),
            kind: IssueKind::PartialExtraction { missing_fields },
        }
    }

    pub fn site_aborted(url: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            kind: IssueKind::SiteAborted {
                message: message.into(),
            },
        }
    }

    /// Partial extractions are warnings; everything else is an error
    pub fn is_warning(&self) -> bool {
        matches!(self.kind, IssueKind::PartialExtraction { .. })
    }
}

impl fmt::Display for SiteIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            IssueKind::FetchFailed { reason, .. } => {
                write!(f, "{}: fetch failed ({})", self.url, reason)
            }
            IssueKind::PartialExtraction { missing_fields } => write!(
                f,
                "{}: no match for {}",
                self.url,
                missing_fields.join(", ")
            ),
            IssueKind::SiteAborted { message } => {
                write!(f, "{}: site aborted ({})", self.url, message)
            }
        }
    }
}

/// Result of crawling one site
#[derive(Debug, Clone, Default)]
pub struct SiteOutcome {
    pub site: String,
    /// Records in fetch order
    pub records: Vec<Record>,
    /// Issues in the order they happened
    pub issues: Vec<SiteIssue>,
    /// Completed fetch attempts, successful or not
    pub fetches: usize,
    /// The crawl stopped early because of cancellation
    pub cancelled: bool,
}

impl SiteOutcome {
    pub fn new(site: impl Into<String>) -> Self {
        Self {
            site: site.into(),
            ..Self::default()
        }
    }

    /// Outcome for a site whose crawl task died before returning
    pub fn aborted(site: impl Into<String>, url: impl Into<String>, message: impl Into<String>) -> Self {
        let mut outcome = Self::new(site);
        outcome.issues.push(SiteIssue::site_aborted(url, message));
        outcome
    }

    pub fn error_count(&self) -> usize {
        self.issues.iter().filter(|i| !i.is_warning()).count()
    }
}

/// Aggregate of one orchestrator run
#[derive(Debug, Clone, Default)]
pub struct CrawlRun {
    /// Records in site order, then per-site fetch order
    pub records: Vec<Record>,

    /// Issues keyed by site name; sites without issues are absent
    pub per_site_errors: BTreeMap<String, Vec<SiteIssue>>,

    /// Records contributed by each crawled site, including sites with none
    pub records_per_site: BTreeMap<String, usize>,

    /// Sites whose crawl was started
    pub sites_crawled: usize,

    /// Completed fetch attempts across all sites
    pub fetches: usize,

    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,

    /// The run was interrupted; records hold what was gathered until then
    pub cancelled: bool,
}

impl CrawlRun {
    pub fn new(started_at: DateTime<Utc>) -> Self {
        Self {
            started_at: Some(started_at),
            ..Self::default()
        }
    }

    /// Appends one site's outcome; call in site order
    pub fn absorb(&mut self, outcome: SiteOutcome) {
        self.sites_crawled += 1;
        self.fetches += outcome.fetches;
        self.cancelled |= outcome.cancelled;
        *self
            .records_per_site
            .entry(outcome.site.clone())
            .or_default() += outcome.records.len();
        self.records.extend(outcome.records);
        if !outcome.issues.is_empty() {
            self.per_site_errors
                .entry(outcome.site)
                .or_default()
                .extend(outcome.issues);
        }
    }

    pub fn finish(&mut self, finished_at: DateTime<Utc>) {
        self.finished_at = Some(finished_at);
    }

    /// Issues recorded for a site (empty if none)
    pub fn issues_for(&self, site: &str) -> &[SiteIssue] {
        self.per_site_errors
            .get(site)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn error_count(&self) -> usize {
        self.all_issues().filter(|i| !i.is_warning()).count()
    }

    pub fn warning_count(&self) -> usize {
        self.all_issues().filter(|i| i.is_warning()).count()
    }

    fn all_issues(&self) -> impl Iterator<Item = &SiteIssue> {
        self.per_site_errors.values().flatten()
    }

    /// Wall-clock duration, once the run has finished
    pub fn duration(&self) -> Option<chrono::Duration> {
        match (self.started_at, self.finished_at) {
            (Some(started), Some(finished)) => Some(finished - started),
            _ => None,
        }
    }

    /// The records as a JSON array of plain field mappings
    ///
    /// Same shape as the persisted output file.
    pub fn to_document(&self) -> serde_json::Result<Value> {
        serde_json::to_value(&self.records)
    }
}
