//! Statistics generation from a crawl run
//!
//! This module derives per-run and per-site counters from a finished
//! [`CrawlRun`] and prints them to stdout.

use crate::crawler::{CrawlRun, IssueKind};
use crate::schema::ValidationReport;
use std::collections::BTreeMap;

/// Counters for one site
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SiteStatistics {
    pub records: usize,
    pub fetch_failures: usize,
    pub partial_extractions: usize,
    pub aborted: bool,
}

/// Crawl statistics summary
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunStatistics {
    pub sites_crawled: usize,
    pub fetches: usize,
    pub records: usize,
    pub errors: usize,
    pub warnings: usize,

    /// Fetch failures by reason code (`timeout`, `http-error:404`, ...)
    pub failures_by_reason: BTreeMap<String, usize>,

    /// Per-site counters, keyed by site name
    pub sites: BTreeMap<String, SiteStatistics>,

    pub duration_seconds: Option<f64>,
    pub cancelled: bool,

    /// `None` when the output was not validated
    pub schema_valid: Option<bool>,
    pub schema_violations: usize,
}

impl RunStatistics {
    /// Builds statistics from a run and, optionally, its validation report
    pub fn from_run(run: &CrawlRun, report: Option<&ValidationReport>) -> Self {
        let mut stats = Self {
            sites_crawled: run.sites_crawled,
            fetches: run.fetches,
            records: run.records.len(),
            errors: run.error_count(),
            warnings: run.warning_count(),
            duration_seconds: run
                .duration()
                .map(|d| d.num_milliseconds() as f64 / 1000.0),
            cancelled: run.cancelled,
            schema_valid: report.map(|r| r.valid),
            schema_violations: report.map(|r| r.violations.len()).unwrap_or(0),
            ..Self::default()
        };

        for (site, records) in &run.records_per_site {
            stats.sites.entry(site.clone()).or_default().records = *records;
        }

        for (site, issues) in &run.per_site_errors {
            let entry = stats.sites.entry(site.clone()).or_default();
            for issue in issues {
                match &issue.kind {
                    IssueKind::FetchFailed { reason, .. } => {
                        entry.fetch_failures += 1;
                        *stats.failures_by_reason.entry(reason.code()).or_default() += 1;
                    }
                    IssueKind::PartialExtraction { .. } => entry.partial_extractions += 1,
                    IssueKind::SiteAborted { .. } => entry.aborted = true,
                }
            }
        }

        stats
    }

    /// Fetches that produced a record, as a percentage of all fetches
    pub fn success_rate(&self) -> f64 {
        if self.fetches == 0 {
            return 0.0;
        }
        let failures: usize = self.failures_by_reason.values().sum();
        (self.fetches.saturating_sub(failures) as f64 / self.fetches as f64) * 100.0
    }
}

/// Prints statistics to stdout in a formatted manner
pub fn print_statistics(stats: &RunStatistics) {
    println!("=== Crawl Statistics ===\n");

    println!("Overview:");
    println!("  Sites crawled: {}", stats.sites_crawled);
    println!("  Pages fetched: {}", stats.fetches);
    println!("  Records extracted: {}", stats.records);
    println!("  Errors: {}", stats.errors);
    println!("  Warnings: {}", stats.warnings);
    if let Some(seconds) = stats.duration_seconds {
        println!("  Duration: {:.1}s", seconds);
    }
    if stats.cancelled {
        println!("  Run was cancelled; results are partial");
    }
    println!();

    if !stats.failures_by_reason.is_empty() {
        println!("Fetch Failures:");
        let mut reasons: Vec<_> = stats.failures_by_reason.iter().collect();
        reasons.sort_by(|a, b| b.1.cmp(a.1).then_with(|| a.0.cmp(b.0)));
        for (reason, count) in reasons {
            println!("  {}: {}", reason, count);
        }
        println!();
    }

    if !stats.sites.is_empty() {
        println!("Sites:");
        for (site, counters) in &stats.sites {
            let mut line = format!(
                "  {}: {} record(s), {} failed fetch(es), {} partial extraction(s)",
                site, counters.records, counters.fetch_failures, counters.partial_extractions
            );
            if counters.aborted {
                line.push_str(", aborted");
            }
            println!("{}", line);
        }
        println!();
    }

    match stats.schema_valid {
        Some(true) => println!("Schema: valid"),
        Some(false) => println!("Schema: INVALID ({} violation(s))", stats.schema_violations),
        None => println!("Schema: not validated"),
    }

    println!(
        "Success Rate: {:.1}% ({} / {} fetches produced a record)",
        stats.success_rate(),
        stats.records,
        stats.fetches
    );
}
