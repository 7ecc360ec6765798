//! In-memory collaborators shared by the coordinator tests

use async_trait::async_trait;
use seo_ripple::config::Config;
use seo_ripple::crawler::{Collaborators, FetchError, FetchResponse, Fetcher};
use seo_ripple::robots::{AllowAll, RobotsPolicy};
use seo_ripple::sitemap::SitemapSource;
use seo_ripple::storage::MemoryLinkGraph;
use seo_ripple::RippleError;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use url::Url;

pub const START: &str = "https://site.test/";

/// Absolute URL on the stub site
pub fn site(path: &str) -> String {
    format!("https://site.test{}", path)
}

/// HTML page with the given anchors
pub fn links_page(title: &str, hrefs: &[&str]) -> String {
    let anchors: String = hrefs
        .iter()
        .map(|href| format!(r#"<a href="{}">link</a>"#, href))
        .collect();
    format!(
        "<html><head><title>{}</title></head><body><h1>{}</h1>{}</body></html>",
        title, title, anchors
    )
}

struct StubPage {
    status: u16,
    content_type: String,
    body: String,
}

/// A fake website answering from a map of URL to page
///
/// Unknown URLs answer 404 with an empty body.
#[derive(Default)]
pub struct StubSite {
    pages: HashMap<String, StubPage>,
    failing: HashSet<String>,
    latency: Duration,
    fetches: Mutex<HashMap<String, usize>>,
}

impl StubSite {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn html(self, url: impl Into<String>, body: impl Into<String>) -> Self {
        self.page(url, 200, "text/html; charset=utf-8", body)
    }

    pub fn page(
        mut self,
        url: impl Into<String>,
        status: u16,
        content_type: &str,
        body: impl Into<String>,
    ) -> Self {
        self.pages.insert(
            url.into(),
            StubPage {
                status,
                content_type: content_type.to_string(),
                body: body.into(),
            },
        );
        self
    }

    /// URL whose fetch fails at the transport level
    pub fn failing(mut self, url: impl Into<String>) -> Self {
        self.failing.insert(url.into());
        self
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub fn fetch_count(&self, url: &str) -> usize {
        self.fetches.lock().unwrap().get(url).copied().unwrap_or(0)
    }

    pub fn max_fetches_per_url(&self) -> usize {
        self.fetches.lock().unwrap().values().copied().max().unwrap_or(0)
    }
}

#[async_trait]
impl Fetcher for StubSite {
    async fn fetch(
        &self,
        url: &Url,
        cancel: &CancellationToken,
    ) -> Result<FetchResponse, FetchError> {
        *self
            .fetches
            .lock()
            .unwrap()
            .entry(url.to_string())
            .or_insert(0) += 1;

        if self.latency.is_zero() {
            if cancel.is_cancelled() {
                return Err(FetchError::Cancelled);
            }
        } else {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(FetchError::Cancelled),
                _ = tokio::time::sleep(self.latency) => {}
            }
        }

        if self.failing.contains(url.as_str()) {
            return Err(FetchError::Transport("connection reset".to_string()));
        }

        let (status, content_type, body) = match self.pages.get(url.as_str()) {
            Some(page) => (page.status, page.content_type.clone(), page.body.clone()),
            None => (404, "text/html".to_string(), String::new()),
        };

        if (200..300).contains(&status) && !content_type.contains("html") {
            return Err(FetchError::NonHtml { content_type });
        }

        Ok(FetchResponse {
            final_url: url.clone(),
            status,
            content_type,
            x_robots_tag: None,
            body: body.into_bytes(),
            redirect_chain: Vec::new(),
            response_time: Duration::from_millis(1),
        })
    }
}

/// Sitemap source with a fixed entry list, or none at all
pub struct StubSitemap {
    entries: Option<Vec<String>>,
}

impl StubSitemap {
    pub fn missing() -> Self {
        Self { entries: None }
    }

    pub fn listing(entries: &[&str]) -> Self {
        Self {
            entries: Some(entries.iter().map(|e| e.to_string()).collect()),
        }
    }
}

#[async_trait]
impl SitemapSource for StubSitemap {
    async fn discover_sitemap_url(&self, base: &Url) -> Result<Url, RippleError> {
        Ok(base.join("/sitemap.xml")?)
    }

    async fn parse_sitemap(&self, sitemap: &Url) -> Result<Vec<String>, RippleError> {
        self.entries
            .clone()
            .ok_or_else(|| RippleError::Sitemap(format!("{} not found", sitemap)))
    }
}

/// Robots policy disallowing every URL whose path starts with a prefix
pub struct DenyPaths(pub Vec<&'static str>);

#[async_trait]
impl RobotsPolicy for DenyPaths {
    async fn is_allowed(&self, url: &Url) -> Result<bool, RippleError> {
        Ok(!self.0.iter().any(|prefix| url.path().starts_with(prefix)))
    }
}

/// Robots policy that can never be determined
pub struct BrokenRobots;

#[async_trait]
impl RobotsPolicy for BrokenRobots {
    async fn is_allowed(&self, _url: &Url) -> Result<bool, RippleError> {
        Err(RippleError::Robots("robots.txt unreachable".to_string()))
    }
}

pub fn collaborators(site: &Arc<StubSite>) -> Collaborators {
    Collaborators {
        fetcher: site.clone(),
        robots: Arc::new(AllowAll),
        sitemap: Arc::new(StubSitemap::missing()),
        link_graph: Arc::new(MemoryLinkGraph::new()),
    }
}

pub fn config(max_depth: u32, max_pages: usize, workers: usize) -> Config {
    let mut config = Config::for_start_url(START);
    config.crawler.max_depth = max_depth;
    config.crawler.max_pages = max_pages;
    config.crawler.workers = workers;
    config
}
