//! Markdown report generation
//!
//! This module generates a human-readable markdown report of a crawl run,
//! including statistics, per-site issues and schema violations.

use crate::crawler::{CrawlRun, IssueKind};
use crate::output::stats::RunStatistics;
use crate::output::traits::OutputResult;
use crate::schema::ValidationReport;
use std::fs;
use std::path::Path;

/// Violations listed in full before the report summarizes the rest
const MAX_LISTED_VIOLATIONS: usize = 50;

/// Writes a markdown report of the run to `output_path`
///
/// Parent directories are created as needed.
pub fn generate_markdown_report(
    run: &CrawlRun,
    report: Option<&ValidationReport>,
    output_path: &Path,
) -> OutputResult<()> {
    let markdown = format_markdown_report(run, report);

    if let Some(parent) = output_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    fs::write(output_path, markdown)?;

    Ok(())
}

/// Formats a crawl run as markdown
pub fn format_markdown_report(run: &CrawlRun, report: Option<&ValidationReport>) -> String {
    let stats = RunStatistics::from_run(run, report);
    let mut md = String::new();

    md.push_str("# Crawl Report\n\n");

    // Run metadata
    md.push_str("## Run Information\n\n");
    if let Some(started) = run.started_at {
        md.push_str(&format!("- **Started**: {}\n", started.to_rfc3339()));
    }
    if let Some(finished) = run.finished_at {
        md.push_str(&format!("- **Finished**: {}\n", finished.to_rfc3339()));
    }
    if let Some(seconds) = stats.duration_seconds {
        md.push_str(&format!("- **Duration**: {:.1} seconds\n", seconds));
    }
    let status = if run.cancelled { "Cancelled" } else { "Completed" };
    md.push_str(&format!("- **Status**: {}\n\n", status));

    // Overall statistics
    md.push_str("## Overall Statistics\n\n");
    md.push_str(&format!("- **Sites Crawled**: {}\n", stats.sites_crawled));
    md.push_str(&format!("- **Pages Fetched**: {}\n", stats.fetches));
    md.push_str(&format!("- **Records**: {}\n", stats.records));
    md.push_str(&format!("- **Errors**: {}\n", stats.errors));
    md.push_str(&format!("- **Warnings**: {}\n", stats.warnings));
    md.push_str(&format!(
        "- **Success Rate**: {:.2}%\n\n",
        stats.success_rate()
    ));

    // Site breakdown
    if !stats.sites.is_empty() {
        md.push_str("## Sites\n\n");
        md.push_str("| Site | Records | Failed Fetches | Partial Extractions | Aborted |\n");
        md.push_str("|------|---------|----------------|---------------------|---------|\n");
        for (site, counters) in &stats.sites {
            md.push_str(&format!(
                "| {} | {} | {} | {} | {} |\n",
                site,
                counters.records,
                counters.fetch_failures,
                counters.partial_extractions,
                if counters.aborted { "yes" } else { "no" }
            ));
        }
        md.push('\n');
    }

    // Failure reasons
    if !stats.failures_by_reason.is_empty() {
        md.push_str("## Fetch Failures by Reason\n\n");
        md.push_str("| Reason | Count |\n");
        md.push_str("|--------|-------|\n");
        for (reason, count) in &stats.failures_by_reason {
            md.push_str(&format!("| {} | {} |\n", reason, count));
        }
        md.push('\n');
    }

    // Issues per site
    if !run.per_site_errors.is_empty() {
        md.push_str("## Issues\n\n");
        for (site, issues) in &run.per_site_errors {
            md.push_str(&format!("### {}\n\n", site));
            for issue in issues {
                let label = match issue.kind {
                    IssueKind::PartialExtraction { .. } => "warning",
                    _ => "error",
                };
                md.push_str(&format!("- [{}] {}\n", label, issue));
            }
            md.push('\n');
        }
    }

    // Schema validation
    md.push_str("## Schema Validation\n\n");
    match report {
        None => md.push_str("Not validated.\n"),
        Some(report) if report.valid => md.push_str("All records are valid.\n"),
        Some(report) => {
            md.push_str(&format!(
                "{} violation(s) found.\n\n",
                report.violations.len()
            ));
            md.push_str("| Path | Message |\n");
            md.push_str("|------|---------|\n");
            for violation in report.violations.iter().take(MAX_LISTED_VIOLATIONS) {
                md.push_str(&format!(
                    "| `{}` | {} |\n",
                    violation.path, violation.message
                ));
            }
            if report.violations.len() > MAX_LISTED_VIOLATIONS {
                md.push_str(&format!(
                    "\n... and {} more\n",
                    report.violations.len() - MAX_LISTED_VIOLATIONS
                ));
            }
        }
    }

    md
}
