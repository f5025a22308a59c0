//! Crawler coordinator - multi-site orchestration
//!
//! This module runs every enabled site of a configuration and merges the
//! results, including:
//! - Filtering disabled sites
//! - Checking every site's preconditions before the first fetch
//! - Running sites sequentially or with bounded concurrency
//! - Isolating a panicking site crawl from the others
//! - Propagating cancellation and returning the partial run

use crate::config::{Config, CrawlerConfig, SiteConfig};
use crate::crawler::fetcher::{build_fetcher, PageFetcher};
use crate::crawler::site::{CrawlSettings, SiteCrawler};
use crate::crawler::types::{CrawlRun, SiteOutcome};
use crate::output::{CrawlEvent, CrawlReporter, TracingReporter};
use crate::ConfigError;
use chrono::Utc;
use futures::stream::{self, StreamExt};
use std::any::Any;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::task::JoinError;
use tokio_util::sync::CancellationToken;

/// Runs the sites of one crawl
pub struct CrawlOrchestrator {
    fetcher: Arc<dyn PageFetcher>,
    reporter: Arc<dyn CrawlReporter>,
    settings: CrawlSettings,
    max_concurrent_sites: usize,
    cancel: CancellationToken,
}

impl CrawlOrchestrator {
    /// Creates an orchestrator with default settings and a `tracing` reporter
    pub fn new(fetcher: Arc<dyn PageFetcher>) -> Self {
        Self {
            fetcher,
            reporter: Arc::new(TracingReporter),
            settings: CrawlSettings::default(),
            max_concurrent_sites: 1,
            cancel: CancellationToken::new(),
        }
    }

    /// Creates an orchestrator using the crawler section of a configuration
    pub fn from_config(config: &CrawlerConfig, fetcher: Arc<dyn PageFetcher>) -> Self {
        Self::new(fetcher)
            .with_settings(CrawlSettings::from(config))
            .with_max_concurrent_sites(config.max_concurrent_sites)
    }

    pub fn with_reporter(mut self, reporter: Arc<dyn CrawlReporter>) -> Self {
        self.reporter = reporter;
        self
    }

    pub fn with_settings(mut self, settings: CrawlSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn with_max_concurrent_sites(mut self, max_concurrent_sites: usize) -> Self {
        self.max_concurrent_sites = max_concurrent_sites.max(1);
        self
    }

    /// Uses `cancel` as the run's cancellation token
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Token that stops the run when cancelled
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Crawls every enabled site and aggregates the results
    ///
    /// # Behavior
    ///
    /// 1. Disabled sites are dropped and never reach a site crawler
    /// 2. Every enabled site is checked (name, start URLs, rules, selectors);
    ///    any violation returns `Err` before a single fetch
    /// 3. Sites are crawled in their own tasks, at most
    ///    `max_concurrent_sites` at once
    /// 4. Outcomes are merged in site order
    ///
    /// Fetch failures and aborted sites are recorded in the run, never
    /// returned as `Err`.
    pub async fn run(&self, sites: Vec<SiteConfig>) -> crate::Result<CrawlRun> {
        let mut run = CrawlRun::new(Utc::now());

        let total = sites.len();
        let enabled: Vec<SiteConfig> = sites.into_iter().filter(|site| site.enabled).collect();
        if enabled.len() < total {
            tracing::debug!("Skipping {} disabled site(s)", total - enabled.len());
        }

        if enabled.is_empty() {
            self.reporter.report(&CrawlEvent::NoSitesEnabled);
            run.finish(Utc::now());
            return Ok(run);
        }

        let crawlers = self.prepare(&enabled)?;
        self.reporter
            .report(&CrawlEvent::RunStarted { sites: crawlers.len() });

        let outcomes: Vec<Option<SiteOutcome>> = stream::iter(
            crawlers
                .into_iter()
                .map(|crawler| self.run_site(crawler)),
        )
        .buffered(self.max_concurrent_sites)
        .collect()
        .await;

        for outcome in outcomes.into_iter().flatten() {
            run.absorb(outcome);
        }
        run.cancelled |= self.cancel.is_cancelled();
        run.finish(Utc::now());

        self.reporter.report(&CrawlEvent::RunFinished {
            sites: run.sites_crawled,
            records: run.records.len(),
            errors: run.error_count(),
            cancelled: run.cancelled,
        });

        Ok(run)
    }

    /// Builds a crawler per site; the first failing precondition wins
    fn prepare(&self, sites: &[SiteConfig]) -> crate::Result<Vec<SiteCrawler>> {
        let mut names = HashSet::new();
        let mut crawlers = Vec::with_capacity(sites.len());

        for site in sites {
            if !names.insert(site.name.as_str()) {
                return Err(ConfigError::Validation(format!(
                    "Duplicate site name '{}'",
                    site.name
                ))
                .into());
            }

            crawlers.push(SiteCrawler::new(
                site,
                self.fetcher.clone(),
                self.reporter.clone(),
                self.settings,
                self.cancel.child_token(),
            )?);
        }

        Ok(crawlers)
    }

    /// Crawls one site in its own task; `None` if cancelled before it started
    async fn run_site(&self, crawler: SiteCrawler) -> Option<SiteOutcome> {
        if self.cancel.is_cancelled() {
            tracing::debug!(site = %crawler.name(), "Run cancelled, site not started");
            return None;
        }

        let site = crawler.name().to_string();
        let entry_url = crawler.entry_url().to_string();

        match tokio::spawn(async move { crawler.crawl().await }).await {
            Ok(outcome) => Some(outcome),
            Err(e) => {
                let message = join_error_message(e);
                self.reporter.report(&CrawlEvent::SiteAborted {
                    site: site.clone(),
                    message: message.clone(),
                });
                Some(SiteOutcome::aborted(site, entry_url, message))
            }
        }
    }
}

fn join_error_message(error: JoinError) -> String {
    if !error.is_panic() {
        return "site task was cancelled".to_string();
    }
    panic_message(error.into_panic())
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        format!("panicked: {}", message)
    } else if let Some(message) = payload.downcast_ref::<String>() {
        format!("panicked: {}", message)
    } else {
        "panicked".to_string()
    }
}

/// Runs a complete crawl for a loaded configuration
///
/// Builds the production fetcher (reqwest behind the request throttle) and
/// crawls `config.sites` with the configured concurrency.
pub async fn run_crawl(
    config: &Config,
    reporter: Arc<dyn CrawlReporter>,
    cancel: CancellationToken,
) -> crate::Result<CrawlRun> {
    let fetcher = build_fetcher(&config.crawler)?;
    CrawlOrchestrator::from_config(&config.crawler, fetcher)
        .with_reporter(reporter)
        .with_cancellation(cancel)
        .run(config.sites.clone())
        .await
}
