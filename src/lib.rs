//! seo_audit library: single-site crawl and SEO analysis.
//!
//! This library crawls a site within its own host, collects on-page signals
//! (title, meta description, canonical, headings, links), builds the internal
//! link graph, and aggregates findings such as duplicate titles, broken
//! links, redirect chains and orphan pages.
//!
//! # Example
//!
//! ```no_run
//! use seo_audit::{run_audit, Config};
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = Config {
//!     root_url: "https://example.com".to_string(),
//!     max_depth: 2,
//!     max_pages: 100,
//!     ..Default::default()
//! };
//!
//! let result = run_audit(config).await?;
//! println!(
//!     "{} pages, {} failures, {} findings",
//!     result.pages.len(),
//!     result.failures.len(),
//!     result.findings.len()
//! );
//! # Ok(())
//! # }
//! ```
//!
//! # Requirements
//!
//! This library requires a Tokio runtime. Use `#[tokio::main]` in your
//! application or call library functions from within an async context.

pub mod config;
mod error_handling;
mod fetcher;
mod frontier;
mod graph;
mod html;
pub mod initialization;
mod insights;
mod models;
mod policy;
mod robots;
mod sitemap;
mod urlnorm;

// Re-export public API
pub use config::{Config, LogFormat, LogLevel};
pub use error_handling::{FetchFailure, FetchFailureKind};
pub use graph::{LinkGraph, NodeMetrics};
pub use models::{
    AuditResult, DiscoverySource, Finding, FindingCategory, PageRecord, RunMetadata, RunStatus,
    Severity,
};
pub use run::run_audit;

// Internal run module (contains the crawl coordinator)
mod run {
    use std::collections::HashSet;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::{Duration, Instant};

    use anyhow::{anyhow, Result};
    use chrono::Utc;
    use futures::stream::FuturesUnordered;
    use futures::StreamExt;
    use log::{info, warn};
    use tokio::task::{JoinError, JoinHandle};
    use tokio_util::sync::CancellationToken;
    use url::Url;

    use crate::config::{Config, LOGGING_INTERVAL_SECS};
    use crate::error_handling::{FetchFailure, FetchStats};
    use crate::fetcher::{self, FetchedPage};
    use crate::frontier::{Frontier, NextAction, PendingUrl};
    use crate::graph::GraphBuilder;
    use crate::html;
    use crate::initialization::{init_client, init_semaphore};
    use crate::models::{AuditResult, PageRecord, RunMetadata, RunStatus};
    use crate::policy::{self, CrawlPolicy};
    use crate::urlnorm;

    type WorkerHandle = JoinHandle<(PendingUrl, Result<FetchedPage, FetchFailure>)>;

    /// Mutable crawl state, owned by the coordinator only. Workers fetch and
    /// report back; all bookkeeping happens here on one task.
    struct CrawlState {
        root: Url,
        policy: CrawlPolicy,
        frontier: Frontier,
        builder: GraphBuilder,
        pages: Vec<PageRecord>,
        failures: Vec<FetchFailure>,
    }

    impl CrawlState {
        /// Folds one finished worker into the dataset: parses the body,
        /// splits links into internal/external, records the page or failure,
        /// and offers discovered internal links back to the frontier.
        fn absorb(
            &mut self,
            joined: Result<(PendingUrl, Result<FetchedPage, FetchFailure>), JoinError>,
            processed: &AtomicUsize,
        ) {
            let (item, result) = match joined {
                Ok(pair) => pair,
                Err(e) => {
                    warn!("fetch task failed to join: {e}");
                    // Keep the in-flight count honest even for a lost task.
                    self.frontier.on_result(0, &[], &self.policy);
                    return;
                }
            };
            processed.fetch_add(1, Ordering::SeqCst);

            match result {
                Ok(page) => self.absorb_page(item, page),
                Err(failure) => {
                    warn!("fetch of {} failed: {}", failure.url, failure.detail);
                    self.failures.push(failure);
                    self.frontier.on_result(item.depth, &[], &self.policy);
                }
            }
        }

        fn absorb_page(&mut self, item: PendingUrl, page: FetchedPage) {
            let signals = html::extract_signals(&page.body);

            // A redirected page is one document under two URLs: alias the
            // destination to the requested URL's node so links to either
            // land on the same node, and never fetch the destination again.
            if let Some(final_norm) = urlnorm::normalize_absolute(&page.final_url) {
                if urlnorm::same_host(&final_norm, &self.root)
                    && final_norm.as_str() != item.url.as_str()
                {
                    self.frontier.mark_visited(&final_norm);
                    self.builder.alias(item.url.as_str(), final_norm.as_str());
                }
            }

            // Relative links resolve against the final URL, not the one
            // requested: a redirected page's links live at its destination.
            let base = Url::parse(&page.final_url).unwrap_or_else(|_| item.url.clone());

            let mut internal: Vec<Url> = Vec::new();
            let mut external: Vec<String> = Vec::new();
            let mut seen: HashSet<String> = HashSet::new();
            for raw in &signals.links {
                let Some(target) = urlnorm::normalize(&base, raw) else {
                    continue;
                };
                if !seen.insert(target.as_str().to_string()) {
                    continue;
                }
                if urlnorm::same_host(&target, &self.root) {
                    internal.push(target);
                } else {
                    external.push(target.into());
                }
            }

            let internal_strings: Vec<String> =
                internal.iter().map(|u| u.as_str().to_string()).collect();
            self.builder.add_page(item.url.as_str(), &internal_strings);

            self.pages.push(PageRecord {
                url: item.url.as_str().to_string(),
                status: page.status,
                final_url: page.final_url,
                redirect_chain: page.redirect_chain,
                title: signals.title,
                meta_description: signals.meta_description,
                canonical: signals.canonical,
                h1: signals.h1,
                outbound_links: signals.links,
                internal_links: internal_strings,
                external_links: external,
                content_length: page.content_length,
                fetch_duration_ms: page.duration.as_millis() as u64,
                depth: item.depth,
                source: item.source,
            });

            let added = self.frontier.on_result(item.depth, &internal, &self.policy);
            if added > 0 {
                log::debug!(
                    "{} discovered {} new URLs ({} pending)",
                    item.url,
                    added,
                    self.frontier.pending_len()
                );
            }
        }
    }

    fn log_progress(start: Instant, processed: &AtomicUsize) {
        let elapsed = start.elapsed().as_secs_f64();
        let done = processed.load(Ordering::SeqCst);
        let rate = if elapsed > 0.0 { done as f64 / elapsed } else { 0.0 };
        info!("Processed {done} pages in {elapsed:.2} seconds (~{rate:.2} pages/sec)");
    }

    /// Runs a full audit with the provided configuration.
    ///
    /// This is the main entry point for the library. It resolves the crawl
    /// policy (robots.txt and sitemaps), crawls the site breadth-first within
    /// its host and budgets, and returns the complete dataset with findings.
    ///
    /// # Arguments
    ///
    /// * `config` - Configuration for the audit (root URL, depth, budgets, ...)
    ///
    /// # Returns
    ///
    /// Returns an [`AuditResult`] with pages, failures, the link graph and
    /// findings. Individual fetch failures never fail the run; they are part
    /// of the result.
    ///
    /// # Errors
    ///
    /// This function will return an error if:
    /// - The root URL is not a valid absolute http(s) URL
    /// - The HTTP client cannot be initialized
    pub async fn run_audit(config: Config) -> Result<AuditResult> {
        let root = urlnorm::normalize_absolute(&config.root_url)
            .ok_or_else(|| anyhow!("invalid root URL: {:?}", config.root_url))?;

        let client = init_client(&config)?;
        let semaphore = init_semaphore(config.max_concurrency);

        let started_at = Utc::now();
        let start = Instant::now();
        let deadline = start + config.time_budget();

        info!("Starting audit of {root}");
        let (policy, seeds) = policy::resolve(&client, &root, &config).await;

        let mut state = CrawlState {
            frontier: Frontier::new(root.clone(), config.max_depth, policy.crawl_delay()),
            root,
            policy,
            builder: GraphBuilder::new(),
            pages: Vec::new(),
            failures: Vec::new(),
        };

        // Seeds are graph nodes even if their fetch later fails, so sitemap
        // entries nobody links to still show up as orphans.
        let mut seed_urls = Vec::with_capacity(seeds.len());
        for seed in seeds {
            state.builder.intern(seed.url.as_str());
            seed_urls.push(seed.url.as_str().to_string());
            state
                .frontier
                .enqueue(seed.url, 0, seed.source, &state.policy);
        }

        let processed = Arc::new(AtomicUsize::new(0));
        let fetch_stats = Arc::new(FetchStats::new());
        let shared_config = Arc::new(config.clone());

        let progress_token = CancellationToken::new();
        {
            let token = progress_token.clone();
            let processed = Arc::clone(&processed);
            tokio::spawn(async move {
                let mut interval =
                    tokio::time::interval(Duration::from_secs(LOGGING_INTERVAL_SECS));
                interval.tick().await; // first tick fires immediately
                loop {
                    tokio::select! {
                        _ = token.cancelled() => break,
                        _ = interval.tick() => log_progress(start, &processed),
                    }
                }
            });
        }

        let mut tasks: FuturesUnordered<WorkerHandle> = FuturesUnordered::new();
        let mut pages_attempted = 0usize;

        loop {
            let now = Instant::now();
            let budget_spent = now >= deadline || pages_attempted >= config.max_pages;

            if budget_spent {
                // Stop dispatching; in-flight fetches are awaited, not
                // abandoned, so their results still count.
                match tasks.next().await {
                    Some(joined) => {
                        state.absorb(joined, &processed);
                        continue;
                    }
                    None => break,
                }
            }

            match state.frontier.next_ready(now) {
                NextAction::Dispatch(item) => {
                    let permit = match Arc::clone(&semaphore).acquire_owned().await {
                        Ok(permit) => permit,
                        Err(_) => break, // semaphore closed; cannot happen in practice
                    };
                    pages_attempted += 1;

                    let client = Arc::clone(&client);
                    let worker_config = Arc::clone(&shared_config);
                    let stats = Arc::clone(&fetch_stats);
                    tasks.push(tokio::spawn(async move {
                        let _permit = permit;
                        let result = fetcher::fetch(&client, &item.url, &worker_config).await;
                        if let Err(ref failure) = result {
                            stats.record(failure.kind);
                        }
                        (item, result)
                    }));
                }
                NextAction::WaitUntil(at) => {
                    let wake = at.min(deadline);
                    tokio::select! {
                        _ = tokio::time::sleep_until(tokio::time::Instant::from_std(wake)) => {}
                        Some(joined) = tasks.next() => state.absorb(joined, &processed),
                    }
                }
                NextAction::Idle => match tasks.next().await {
                    Some(joined) => state.absorb(joined, &processed),
                    None => break, // queue empty, nothing in flight: done
                },
            }
        }

        progress_token.cancel();

        let status = if state.frontier.is_done() {
            RunStatus::Complete
        } else {
            RunStatus::Partial
        };

        let CrawlState {
            root,
            policy,
            builder,
            mut pages,
            mut failures,
            ..
        } = state;

        pages.sort_by(|a, b| a.url.cmp(&b.url));
        failures.sort_by(|a, b| a.url.cmp(&b.url));

        let graph = builder.finalize(&seed_urls);
        let findings = crate::insights::analyze(&pages, &failures, &graph, &policy, &config);

        fetch_stats.log_summary();
        info!(
            "Audit finished ({status:?}): {} pages, {} failures, {} findings in {:.2}s",
            pages.len(),
            failures.len(),
            findings.len(),
            start.elapsed().as_secs_f64()
        );

        Ok(AuditResult {
            metadata: RunMetadata {
                root_url: root.as_str().to_string(),
                started_at,
                elapsed_seconds: start.elapsed().as_secs_f64(),
                status,
                pages_attempted,
                pages_succeeded: pages.len(),
                pages_failed: failures.len(),
                policy_warnings: policy.warnings.clone(),
            },
            pages,
            failures,
            graph,
            findings,
        })
    }
}
