//! Worker loop
//!
//! Each worker repeatedly takes a task from the frontier and runs it through
//! the budget, depth, dedup, robots, fetch, extract and expand steps. Results
//! go to the collector over a channel; workers never touch the result list.

use crate::config::CrawlerConfig;
use crate::crawler::coordinator::Collaborators;
use crate::crawler::fetcher::{FetchError, FetchResponse};
use crate::crawler::frontier::Frontier;
use crate::crawler::parser::parse_page;
use crate::crawler::visited::{PageBudget, VisitedSet};
use crate::page::{CrawlTask, PageResult};
use crate::url::{is_image_url, DomainFilter};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use url::Url;

/// State shared by every worker of one crawl
pub(crate) struct WorkerContext {
    pub config: Arc<CrawlerConfig>,
    pub collaborators: Collaborators,
    pub frontier: Arc<Frontier>,
    pub visited: VisitedSet,
    pub budget: PageBudget,
    pub results: mpsc::Sender<PageResult>,
    pub start_url: Url,
    pub domain_filter: DomainFilter,

    /// Raised by the caller or on budget exhaustion; aborts fetches
    pub stop: CancellationToken,

    /// Child of `stop`, also raised when the crawl is complete
    pub shutdown: CancellationToken,

    /// Set when a crawlable page was left behind after `stop` was raised
    pub truncated: Arc<AtomicBool>,
}

impl WorkerContext {
    fn mark_truncated(&self) {
        self.truncated.store(true, Ordering::SeqCst);
    }
}

/// Runs one worker until shutdown
pub(crate) async fn run(ctx: Arc<WorkerContext>, id: usize) {
    tracing::debug!("Worker {} started", id);

    loop {
        let task = tokio::select! {
            biased;
            _ = ctx.shutdown.cancelled() => break,
            task = ctx.frontier.dequeue() => match task {
                Some(task) => task,
                None => break,
            },
        };

        if ctx.budget.is_exhausted() {
            if !ctx.visited.contains(&task.url) {
                ctx.mark_truncated();
            }
            ctx.frontier.task_done();
            ctx.stop.cancel();
            break;
        }

        process(&ctx, &task).await;
        ctx.frontier.task_done();

        if ctx.budget.is_exhausted() {
            tracing::info!("Page budget of {} reached", ctx.budget.limit());
            ctx.stop.cancel();
            break;
        }
    }

    tracing::debug!("Worker {} stopped", id);
}

/// Processes a single task
async fn process(ctx: &WorkerContext, task: &CrawlTask) {
    if task.depth > ctx.config.max_depth {
        return;
    }

    if !ctx.visited.claim(&task.url) {
        return;
    }

    let url = match Url::parse(&task.url) {
        Ok(url) => url,
        Err(e) => {
            tracing::warn!("Skipping unparsable URL {}: {}", task.url, e);
            return;
        }
    };

    if is_image_url(&url) {
        return;
    }

    if ctx.config.respect_robots {
        match ctx.collaborators.robots.is_allowed(&url).await {
            Ok(true) => {}
            Ok(false) => {
                tracing::debug!("Blocked by robots.txt: {}", url);
                return;
            }
            Err(e) => tracing::warn!("Robots check failed for {}, proceeding: {}", url, e),
        }
    }

    let delay = ctx.config.delay();
    if !delay.is_zero() {
        tokio::select! {
            biased;
            _ = ctx.stop.cancelled() => {
                ctx.mark_truncated();
                return;
            }
            _ = tokio::time::sleep(delay) => {}
        }
    }

    tracing::debug!("Fetching {} (depth {})", url, task.depth);
    let (mut result, body) = match ctx.collaborators.fetcher.fetch(&url, &ctx.stop).await {
        Ok(response) => partial_result(task, response),
        Err(FetchError::NonHtml { content_type }) => {
            tracing::debug!("Skipping non-HTML {} ({})", url, content_type);
            return;
        }
        Err(FetchError::Cancelled) => {
            ctx.mark_truncated();
            return;
        }
        Err(e) => {
            tracing::debug!("Fetch failed for {}: {}", url, e);
            (PageResult::failed(task, e.to_string()), Vec::new())
        }
    };

    if !ctx.budget.try_reserve() {
        ctx.mark_truncated();
        ctx.stop.cancel();
        return;
    }

    if !result.is_expandable() || body.is_empty() {
        deliver(ctx, result).await;
        return;
    }

    let parsed = match parse_page(&body, &result.final_url) {
        Ok(parsed) => parsed,
        Err(e) => {
            tracing::debug!("Extraction failed for {}: {}", url, e);
            deliver(ctx, result).await;
            return;
        }
    };
    result.apply(parsed);

    let children = result.internal_links.clone();
    let edges: Vec<String> = result
        .internal_links
        .iter()
        .chain(result.external_links.iter())
        .cloned()
        .collect();

    deliver(ctx, result).await;
    ctx.collaborators.link_graph.record_edges(&task.url, &edges);

    if task.depth < ctx.config.max_depth {
        enqueue_children(ctx, &children, task.depth + 1);
    }
}

/// Builds the partial result from a response, returning the body separately
fn partial_result(task: &CrawlTask, response: FetchResponse) -> (PageResult, Vec<u8>) {
    let mut result = PageResult::new(task);
    result.final_url = response.final_url.to_string();
    result.status_code = response.status;
    result.response_time_ms = response.response_time.as_millis() as u64;
    result.content_type = response.content_type;
    result.redirect_chain = response.redirect_chain;
    result.indexability.x_robots_tag = response.x_robots_tag;
    result.refresh_indexability();

    (result, response.body)
}

fn enqueue_children(ctx: &WorkerContext, links: &[String], depth: u32) {
    for link in links {
        let Ok(url) = Url::parse(link) else {
            continue;
        };

        if is_image_url(&url) || !ctx.domain_filter.allows(&ctx.start_url, &url) {
            continue;
        }

        // Advisory only; the claim at dequeue is authoritative
        if ctx.visited.contains(link) {
            continue;
        }

        // A spent budget never dequeues the child, so it is not queued either
        if ctx.budget.is_exhausted() {
            ctx.mark_truncated();
            return;
        }

        ctx.frontier.try_enqueue(CrawlTask::new(link.clone(), depth));
    }
}

async fn deliver(ctx: &WorkerContext, result: PageResult) {
    if ctx.results.send(result).await.is_err() {
        tracing::warn!("Result collector is gone, discarding page");
    }
}
