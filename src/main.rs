//! multisite-crawler main entry point
//!
//! This is the command-line interface for the configuration-driven
//! multi-site content crawler.

use anyhow::{bail, Context, Result};
use clap::Parser;
use multisite_crawler::config::{load_config_with_hash, resolve_relative_to, Config};
use multisite_crawler::crawler::run_crawl;
use multisite_crawler::output::{
    generate_markdown_report, print_statistics, read_json_document, write_json_document,
    CrawlReporter, RunStatistics, TracingReporter,
};
use multisite_crawler::schema::SchemaValidator;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

/// multisite-crawler: a configuration-driven content crawler
///
/// Crawls every enabled site of a YAML or TOML configuration, extracts
/// title, author, publish date and body text with per-site selectors, and
/// saves the schema-validated records as JSON.
#[derive(Parser, Debug)]
#[command(name = "multisite-crawler")]
#[command(version)]
#[command(about = "A configuration-driven multi-site content crawler", long_about = None)]
struct Cli {
    /// Path to YAML or TOML configuration file
    #[arg(value_name = "CONFIG", required_unless_present = "validate")]
    config: Option<PathBuf>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Write records here instead of the configured data path
    #[arg(short, long, value_name = "PATH")]
    output: Option<PathBuf>,

    /// Validate config and show what would be crawled without actually crawling
    #[arg(long, conflicts_with = "validate")]
    dry_run: bool,

    /// Validate an existing output file against the record schema and exit
    #[arg(long, value_name = "FILE", conflicts_with_all = ["dry_run", "output"])]
    validate: Option<PathBuf>,

    /// Refuse to save records that fail schema validation
    #[arg(long)]
    require_valid: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    if let Some(path) = &cli.validate {
        return handle_validate(path);
    }

    let Some(config_path) = cli.config.as_deref() else {
        bail!("A configuration file is required");
    };

    // Load and validate configuration
    tracing::info!("Loading configuration from: {}", config_path.display());
    let (config, config_hash) = load_config_with_hash(config_path)
        .with_context(|| format!("Failed to load configuration {}", config_path.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", config_hash);

    if cli.dry_run {
        handle_dry_run(&config, config_path, cli.output.as_deref());
        return Ok(());
    }

    handle_crawl(config, config_path, cli.output, cli.require_valid).await
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("multisite_crawler=info,warn"),
            1 => EnvFilter::new("multisite_crawler=debug,info"),
            2 => EnvFilter::new("multisite_crawler=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

fn data_path(config: &Config, config_path: &Path, output: Option<&Path>) -> PathBuf {
    match output {
        Some(path) => path.to_path_buf(),
        None => resolve_relative_to(config_path, &config.output.data_path),
    }
}

/// Handles the --dry-run mode: validates config and shows what would be crawled
fn handle_dry_run(config: &Config, config_path: &Path, output: Option<&Path>) {
    println!("=== multisite-crawler Dry Run ===\n");

    println!("Crawler Configuration:");
    println!("  User agent: {}", config.crawler.user_agent);
    println!("  Request timeout: {}s", config.crawler.request_timeout_secs);
    println!("  Request delay: {}ms", config.crawler.request_delay_ms);
    println!("  Max redirects: {}", config.crawler.max_redirects);
    println!(
        "  Concurrency: {} site(s), {} fetch(es) per level",
        config.crawler.max_concurrent_sites, config.crawler.max_concurrent_fetches
    );

    println!("\nOutput:");
    println!(
        "  Data: {}",
        data_path(config, config_path, output).display()
    );
    if let Some(report) = &config.output.report_path {
        println!(
            "  Report: {}",
            resolve_relative_to(config_path, report).display()
        );
    }

    let enabled: Vec<_> = config.sites.iter().filter(|s| s.enabled).collect();
    println!(
        "\nSites ({} enabled of {}):",
        enabled.len(),
        config.sites.len()
    );
    for site in &config.sites {
        let state = if site.enabled { "enabled" } else { "disabled" };
        println!(
            "  - {} [{}] depth {}, {} selector(s)",
            site.name,
            state,
            site.crawl_depth,
            site.selector_mappings.len()
        );
        for url in &site.start_urls {
            println!("    * {}", url);
        }
    }

    println!("\n✓ Configuration is valid");
    println!(
        "✓ Would start crawling with {} start URLs",
        enabled.iter().map(|s| s.start_urls.len()).sum::<usize>()
    );
}

/// Handles the --validate mode: checks an existing output file
fn handle_validate(path: &Path) -> Result<()> {
    let document = read_json_document(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let report = SchemaValidator::new().validate_document(&document);

    if report.valid {
        let count = document.as_array().map(Vec::len).unwrap_or(0);
        println!("✓ {} is valid ({} record(s))", path.display(), count);
        return Ok(());
    }

    for violation in &report.violations {
        println!("  {}: {}", violation.path, violation.message);
    }
    bail!(
        "{} failed schema validation with {} violation(s)",
        path.display(),
        report.violations.len()
    )
}

/// Handles the main crawl operation
async fn handle_crawl(
    config: Config,
    config_path: &Path,
    output: Option<PathBuf>,
    require_valid: bool,
) -> Result<()> {
    let data_path = data_path(&config, config_path, output.as_deref());
    let report_path = config
        .output
        .report_path
        .as_deref()
        .map(|path| resolve_relative_to(config_path, path));

    let enabled = config.sites.iter().filter(|s| s.enabled).count();
    tracing::info!("Sites: {} configured, {} enabled", config.sites.len(), enabled);

    let reporter: Arc<dyn CrawlReporter> = Arc::new(TracingReporter);
    let cancel = CancellationToken::new();

    // Ctrl-C stops fetching; whatever was gathered is still validated and saved
    let interrupt = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::warn!("Interrupted, stopping crawl and keeping partial results");
                cancel.cancel();
            }
        })
    };

    let run = run_crawl(&config, reporter.clone(), cancel)
        .await
        .context("Crawl failed")?;
    interrupt.abort();

    let report = SchemaValidator::new().validate_records(&run.records);
    report.emit(reporter.as_ref());

    print_statistics(&RunStatistics::from_run(&run, Some(&report)));

    if let Some(path) = &report_path {
        generate_markdown_report(&run, Some(&report), path)
            .with_context(|| format!("Failed to write report {}", path.display()))?;
        tracing::info!("Report written to {}", path.display());
    }

    if run.records.is_empty() {
        println!("No data crawled");
        return Ok(());
    }

    if !report.valid && require_valid {
        bail!(
            "Records failed schema validation ({} violation(s)); not saving {}",
            report.violations.len(),
            data_path.display()
        );
    }

    let document = run.to_document().context("Failed to serialize records")?;
    write_json_document(&document, &data_path)
        .with_context(|| format!("Failed to save records to {}", data_path.display()))?;
    println!(
        "✓ Saved {} record(s) to {}",
        run.records.len(),
        data_path.display()
    );

    Ok(())
}
