//! Crawler coordinator - main crawl orchestration logic
//!
//! This module wires one crawl together:
//! - Normalizing the start URL and expanding seeds from the sitemap
//! - Spawning the worker pool, the result collector and the completion monitor
//! - Shutting the queue down once the in-flight barrier reaches zero
//! - Returning the collected pages together with the crawl's drop count
//!
//! Cancellation flows through one token hierarchy: the caller's token, then an
//! internal `stop` token raised when the page budget runs out, then a
//! `shutdown` token raised on completion.

use crate::config::{Config, CrawlerConfig};
use crate::crawler::fetcher::{build_http_client, Fetcher, HttpFetcher};
use crate::crawler::frontier::Frontier;
use crate::crawler::visited::{PageBudget, VisitedSet};
use crate::crawler::worker::{self, WorkerContext};
use crate::page::{CrawlTask, PageResult};
use crate::robots::{RobotsChecker, RobotsPolicy};
use crate::sitemap::{HttpSitemap, SitemapSource};
use crate::storage::{LinkGraph, LinkGraphStore, MemoryLinkGraph};
use crate::url::{is_image_url, normalize_start_url, normalize_url};
use crate::RippleError;
use serde::Serialize;
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use url::Url;

/// Callback invoked once per stored page with the page and the running total
pub type ProgressCallback = Arc<dyn Fn(&PageResult, usize) + Send + Sync>;

/// The external services a crawl depends on
#[derive(Clone)]
pub struct Collaborators {
    pub fetcher: Arc<dyn Fetcher>,
    pub robots: Arc<dyn RobotsPolicy>,
    pub sitemap: Arc<dyn SitemapSource>,
    pub link_graph: Arc<dyn LinkGraphStore>,
}

impl Collaborators {
    /// Builds the HTTP-backed collaborators sharing one client
    ///
    /// # Arguments
    ///
    /// * `config` - The crawler configuration
    ///
    /// # Returns
    ///
    /// * `Ok(Collaborators)` - HttpFetcher, RobotsChecker, HttpSitemap and an in-memory link graph
    /// * `Err(RippleError)` - The HTTP client could not be built
    pub fn http(config: &CrawlerConfig) -> Result<Self, RippleError> {
        let client = build_http_client(config)?;

        Ok(Self {
            fetcher: Arc::new(HttpFetcher::with_client(client.clone(), config.max_retries)),
            robots: Arc::new(RobotsChecker::new(client.clone(), &config.user_agent)),
            sitemap: Arc::new(HttpSitemap::new(client)),
            link_graph: Arc::new(MemoryLinkGraph::new()),
        })
    }
}

/// What a crawl produced
#[derive(Debug, Clone, Serialize)]
pub struct CrawlOutcome {
    /// One result per stored URL, in completion order
    pub pages: Vec<PageResult>,

    /// Discovered links dropped because the work queue was full
    pub dropped_links: usize,

    /// The crawl was stopped by the caller, or the page budget left
    /// reachable pages uncrawled
    pub cancelled: bool,
}

/// Main crawler coordinator structure
pub struct Coordinator {
    config: Arc<CrawlerConfig>,
    collaborators: Collaborators,
    cancel: CancellationToken,
    progress: Option<ProgressCallback>,
}

impl Coordinator {
    /// Creates a new coordinator instance
    ///
    /// # Arguments
    ///
    /// * `config` - A validated configuration
    /// * `collaborators` - Fetcher, robots policy, sitemap source and link graph store
    /// * `cancel` - Caller-owned token; cancelling it stops the crawl
    pub fn new(config: Config, collaborators: Collaborators, cancel: CancellationToken) -> Self {
        Self {
            config: Arc::new(config.crawler),
            collaborators,
            cancel,
            progress: None,
        }
    }

    /// Registers a callback run for every stored page
    ///
    /// Invocations happen on the collector task, one at a time, in the order
    /// pages are stored.
    pub fn set_progress_callback<F>(&mut self, callback: F)
    where
        F: Fn(&PageResult, usize) + Send + Sync + 'static,
    {
        self.progress = Some(Arc::new(callback));
    }

    /// Snapshot of the link graph recorded so far
    pub fn link_graph(&self) -> LinkGraph {
        self.collaborators.link_graph.snapshot()
    }

    /// Runs the crawl to completion
    ///
    /// # Returns
    ///
    /// * `Ok(CrawlOutcome)` - The crawl completed, or was stopped after storing pages
    /// * `Err(RippleError::Cancelled)` - The crawl was cancelled before any page was stored
    /// * `Err(RippleError::UrlError)` - The start URL cannot be normalized
    pub async fn crawl(&self) -> Result<CrawlOutcome, RippleError> {
        let start_url = normalize_start_url(&self.config.start_url)?;
        let started = Instant::now();

        tracing::info!(
            "Starting crawl of {} (max depth {}, max pages {}, {} workers)",
            start_url,
            self.config.max_depth,
            self.config.max_pages,
            self.config.workers
        );

        let frontier = Arc::new(Frontier::new(self.config.queue_capacity()));
        for seed in self.seed_urls(&start_url).await {
            frontier.try_enqueue(CrawlTask::new(seed, 0));
        }

        let stop = self.cancel.child_token();
        let shutdown = stop.child_token();

        let (results_tx, results_rx) = mpsc::channel(self.config.workers.max(1) * 2);
        let collector = tokio::spawn(collect(results_rx, self.progress.clone()));
        let monitor = tokio::spawn(monitor(Arc::clone(&frontier), shutdown.clone()));
        let truncated = Arc::new(AtomicBool::new(false));

        let ctx = Arc::new(WorkerContext {
            config: Arc::clone(&self.config),
            collaborators: self.collaborators.clone(),
            frontier: Arc::clone(&frontier),
            visited: VisitedSet::new(),
            budget: PageBudget::new(self.config.max_pages),
            results: results_tx,
            domain_filter: self.config.domain_filter(),
            start_url,
            stop: stop.clone(),
            shutdown: shutdown.clone(),
            truncated: Arc::clone(&truncated),
        });

        let mut workers = JoinSet::new();
        for id in 0..self.config.workers {
            workers.spawn(worker::run(Arc::clone(&ctx), id));
        }
        // Workers hold the only remaining result senders
        drop(ctx);

        while let Some(joined) = workers.join_next().await {
            if let Err(e) = joined {
                tracing::error!("Worker task failed: {}", e);
                stop.cancel();
            }
        }

        shutdown.cancel();
        if let Err(e) = monitor.await {
            tracing::error!("Completion monitor failed: {}", e);
        }

        let pages = match collector.await {
            Ok(pages) => pages,
            Err(e) => {
                tracing::error!("Result collector failed: {}", e);
                Vec::new()
            }
        };

        // Tasks still counted in flight were queued but never dequeued
        let cancelled = self.cancel.is_cancelled()
            || truncated.load(Ordering::SeqCst)
            || frontier.in_flight() > 0;
        let dropped_links = frontier.dropped();

        tracing::info!(
            "Crawl finished: {} pages in {:.2}s, {} links dropped{}",
            pages.len(),
            started.elapsed().as_secs_f64(),
            dropped_links,
            if cancelled { " (stopped early)" } else { "" }
        );

        if cancelled && pages.is_empty() {
            return Err(RippleError::Cancelled);
        }

        Ok(CrawlOutcome {
            pages,
            dropped_links,
            cancelled,
        })
    }

    /// Determines the depth-0 URLs
    ///
    /// Sitemap problems are never fatal: the start URL alone is used instead.
    async fn seed_urls(&self, start_url: &Url) -> Vec<String> {
        let fallback = vec![start_url.to_string()];

        if !self.config.parse_sitemap {
            return fallback;
        }

        let sitemap = &self.collaborators.sitemap;
        let sitemap_url = match sitemap.discover_sitemap_url(start_url).await {
            Ok(url) => url,
            Err(e) => {
                tracing::warn!("Sitemap discovery failed, starting from {}: {}", start_url, e);
                return fallback;
            }
        };

        let entries = match sitemap.parse_sitemap(&sitemap_url).await {
            Ok(entries) => entries,
            Err(e) => {
                tracing::warn!("Sitemap {} unusable, starting from {}: {}", sitemap_url, start_url, e);
                return fallback;
            }
        };

        let mut seen = HashSet::new();
        let seeds: Vec<String> = entries
            .iter()
            .filter_map(|entry| normalize_url(entry).ok())
            .filter(|url| !is_image_url(url))
            .map(|url| url.to_string())
            .filter(|url| seen.insert(url.clone()))
            .collect();

        if seeds.is_empty() {
            tracing::warn!("Sitemap {} listed no pages, starting from {}", sitemap_url, start_url);
            return fallback;
        }

        tracing::info!("Seeding crawl with {} URLs from {}", seeds.len(), sitemap_url);
        seeds
    }
}

/// Owns the result list; the only place pages are stored
async fn collect(
    mut results: mpsc::Receiver<PageResult>,
    progress: Option<ProgressCallback>,
) -> Vec<PageResult> {
    let mut pages = Vec::new();

    while let Some(page) = results.recv().await {
        if let Some(callback) = &progress {
            callback(&page, pages.len() + 1);
        }
        pages.push(page);
    }

    pages
}

/// Raises `shutdown` once nothing is queued or in progress
async fn monitor(frontier: Arc<Frontier>, shutdown: CancellationToken) {
    tokio::select! {
        _ = frontier.wait_idle() => tracing::debug!("No tasks in flight, shutting down workers"),
        _ = shutdown.cancelled() => {}
    }
    shutdown.cancel();
}
