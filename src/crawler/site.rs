//! Crawl of a single site
//!
//! A [`SiteCrawler`] owns one site's frontier and seen-set. It drains the
//! frontier one depth level at a time: every entry of a level is fetched
//! (optionally concurrently), then the results are handled in frontier
//! order, which is where records are appended and links are claimed.

use crate::config::{validate_site, CrawlerConfig, SiteConfig};
use crate::crawler::extractor::{Extractor, DEFAULT_CLEAN_TEXT_MAX_CHARS};
use crate::crawler::fetcher::{FetchResult, FetchedPage, PageFetcher, DEFAULT_TIMEOUT};
use crate::crawler::parser::discover_links;
use crate::crawler::rules::CrawlRules;
use crate::crawler::scheduler::{Frontier, QueuedUrl};
use crate::crawler::selector::SelectorMap;
use crate::crawler::types::{SiteIssue, SiteOutcome};
use crate::output::{CrawlEvent, CrawlReporter};
use crate::url::{classify_link, site_host};
use futures::stream::{self, StreamExt};
use scraper::Html;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use url::Url;

/// Knobs shared by every site of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CrawlSettings {
    pub request_timeout: Duration,
    pub max_concurrent_fetches: usize,
    pub clean_text_max_chars: usize,
}

impl Default for CrawlSettings {
    fn default() -> Self {
        Self {
            request_timeout: DEFAULT_TIMEOUT,
            max_concurrent_fetches: 1,
            clean_text_max_chars: DEFAULT_CLEAN_TEXT_MAX_CHARS,
        }
    }
}

impl From<&CrawlerConfig> for CrawlSettings {
    fn from(config: &CrawlerConfig) -> Self {
        Self {
            request_timeout: config.request_timeout(),
            max_concurrent_fetches: config.max_concurrent_fetches.max(1),
            clean_text_max_chars: config.clean_text_max_chars,
        }
    }
}

/// Drives the crawl of one site
pub struct SiteCrawler {
    name: String,
    crawl_depth: u32,
    seeds: Vec<Url>,
    site_hosts: Vec<String>,
    selectors: SelectorMap,
    rules: CrawlRules,
    extractor: Extractor,
    fetcher: Arc<dyn PageFetcher>,
    reporter: Arc<dyn CrawlReporter>,
    settings: CrawlSettings,
    cancel: CancellationToken,
}

impl SiteCrawler {
    /// Builds a crawler for `site`, checking every precondition up front
    ///
    /// # Errors
    ///
    /// * `CrawlerError::Selector` - a selector mapping is malformed
    /// * `CrawlerError::Config` - invalid name, start URLs or rules
    pub fn new(
        site: &SiteConfig,
        fetcher: Arc<dyn PageFetcher>,
        reporter: Arc<dyn CrawlReporter>,
        settings: CrawlSettings,
        cancel: CancellationToken,
    ) -> crate::Result<Self> {
        let selectors = SelectorMap::from_mappings(&site.selector_mappings)?;
        let rules = CrawlRules::from_rules(&site.rules)?;
        validate_site(site)?;

        let seeds = site
            .start_urls
            .iter()
            .map(|start_url| Url::parse(start_url))
            .collect::<Result<Vec<_>, _>>()?;

        let mut site_hosts: Vec<String> = Vec::new();
        for host in seeds.iter().filter_map(site_host) {
            if !site_hosts.contains(&host) {
                site_hosts.push(host);
            }
        }

        Ok(Self {
            name: site.name.clone(),
            crawl_depth: site.crawl_depth,
            seeds,
            site_hosts,
            selectors,
            rules,
            extractor: Extractor::new(settings.clean_text_max_chars),
            fetcher,
            reporter,
            settings,
            cancel,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The first start URL, used to label site-level issues
    pub fn entry_url(&self) -> &str {
        self.seeds.first().map(Url::as_str).unwrap_or_default()
    }

    /// Crawls the site to completion, the page cap, or cancellation
    ///
    /// Fetch failures are recorded and never stop the crawl.
    pub async fn crawl(&self) -> SiteOutcome {
        let mut outcome = SiteOutcome::new(self.name.as_str());
        self.reporter.report(&CrawlEvent::SiteStarted {
            site: self.name.clone(),
            start_urls: self.seeds.len(),
            crawl_depth: self.crawl_depth,
        });

        let mut frontier = Frontier::new();
        for seed in &self.seeds {
            frontier.enqueue(seed.clone(), 0);
        }

        while !frontier.is_empty() {
            if self.cancel.is_cancelled() {
                outcome.cancelled = true;
                break;
            }

            let mut level = frontier.next_level();
            if let Some(max_pages) = self.rules.max_pages {
                let remaining = max_pages.saturating_sub(outcome.fetches);
                if remaining < level.len() {
                    tracing::debug!(
                        site = %self.name,
                        "Page limit of {} reached, dropping {} queued URL(s)",
                        max_pages,
                        level.len() - remaining + frontier.len()
                    );
                    level.truncate(remaining);
                }
            }
            if level.is_empty() {
                break;
            }

            let mut fetches = stream::iter(level.into_iter().map(|queued| self.fetch_one(queued)))
                .buffered(self.settings.max_concurrent_fetches.max(1));

            // Drain the whole level: entries after a cancelled one may have completed
            while let Some((queued, result)) = fetches.next().await {
                match result {
                    Some(result) => {
                        outcome.fetches += 1;
                        self.handle_result(queued, result, &mut frontier, &mut outcome);
                    }
                    None => outcome.cancelled = true,
                }
            }

            if outcome.cancelled || self.rules.page_limit_reached(outcome.fetches) {
                break;
            }
        }

        self.reporter.report(&CrawlEvent::SiteFinished {
            site: self.name.clone(),
            records: outcome.records.len(),
            errors: outcome.error_count(),
            cancelled: outcome.cancelled,
        });
        outcome
    }

    /// Fetches one entry; `None` if the run was cancelled first
    async fn fetch_one(&self, queued: QueuedUrl) -> (QueuedUrl, Option<FetchResult>) {
        let result = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => None,
            result = self.fetcher.fetch(&queued.url, self.settings.request_timeout) => Some(result),
        };
        (queued, result)
    }

    fn handle_result(
        &self,
        queued: QueuedUrl,
        result: FetchResult,
        frontier: &mut Frontier,
        outcome: &mut SiteOutcome,
    ) {
        match result {
            FetchResult::Success(page) => self.handle_page(&queued, &page, frontier, outcome),
            FetchResult::Failure {
                url,
                reason,
                is_retriable,
            } => {
                self.reporter.report(&CrawlEvent::FetchFailed {
                    site: self.name.clone(),
                    url: url.clone(),
                    reason: reason.clone(),
                    retriable: is_retriable,
                });
                outcome
                    .issues
                    .push(SiteIssue::fetch_failed(url, reason, is_retriable));
            }
        }
    }

    fn handle_page(
        &self,
        queued: &QueuedUrl,
        page: &FetchedPage,
        frontier: &mut Frontier,
        outcome: &mut SiteOutcome,
    ) {
        self.reporter.report(&CrawlEvent::PageFetched {
            site: self.name.clone(),
            url: page.url.clone(),
            depth: queued.depth,
            status_code: page.status_code,
        });

        let document = Html::parse_document(&page.content);
        let extraction = self
            .extractor
            .extract_document(&document, page, &self.selectors);

        if extraction.is_partial() {
            let missing_fields = extraction.missing_field_names();
            self.reporter.report(&CrawlEvent::PartialExtraction {
                site: self.name.clone(),
                url: page.url.clone(),
                missing_fields: missing_fields.clone(),
            });
            outcome
                .issues
                .push(SiteIssue::partial_extraction(page.url.as_str(), missing_fields));
        }
        outcome.records.push(extraction.record);

        let base = Url::parse(&page.final_url).unwrap_or_else(|_| queued.url.clone());
        if base != queued.url {
            frontier.claim(&base);
        }

        if queued.depth >= self.crawl_depth || outcome.cancelled {
            return;
        }

        let mut added = 0;
        for link in discover_links(&document, &base) {
            if !classify_link(&link, &self.site_hosts, &self.rules.allowed_domains).is_followable() {
                continue;
            }
            if !self.rules.permits(&link) {
                continue;
            }
            if frontier.enqueue(link, queued.depth + 1) {
                added += 1;
            }
        }
        tracing::trace!(site = %self.name, "Queued {} new link(s) from {}", added, page.url);
    }
}
