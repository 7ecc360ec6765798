//! HTTP fetcher implementation
//!
//! This module handles all HTTP requests for the crawler, including:
//! - Building HTTP clients with the configured user agent and timeout
//! - Manual redirect handling with the chain recorded
//! - Content-Type filtering of non-HTML responses
//! - Retry logic for transient failures
//! - Aborting requests and back-off sleeps on cancellation

use crate::config::CrawlerConfig;
use crate::page::Redirect;
use async_trait::async_trait;
use reqwest::{header, redirect::Policy, Client, Response};
use std::collections::HashSet;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use url::Url;

/// Maximum number of redirect hops followed for one request
pub const MAX_REDIRECTS: usize = 10;

/// Base delay between retry attempts, multiplied by the attempt number
const RETRY_DELAY: Duration = Duration::from_millis(500);

/// Fetch failures
#[derive(Debug, Error)]
pub enum FetchError {
    /// The response is not an HTML document; the page is skipped entirely
    #[error("Not an HTML document (Content-Type: {content_type})")]
    NonHtml { content_type: String },

    #[error("Request cancelled")]
    Cancelled,

    #[error("Too many redirects (more than {0})")]
    TooManyRedirects(usize),

    #[error("Redirect loop detected at {0}")]
    RedirectLoop(String),

    #[error("Invalid redirect: {0}")]
    InvalidRedirect(String),

    #[error("{0}")]
    Http(#[from] reqwest::Error),

    #[error("{0}")]
    Transport(String),
}

impl FetchError {
    /// Whether another attempt might succeed
    fn is_transient(&self) -> bool {
        match self {
            Self::Http(e) => e.is_timeout() || e.is_connect() || e.is_request() || e.is_body(),
            Self::Transport(_) => true,
            _ => false,
        }
    }
}

/// A fetched response, after redirects
#[derive(Debug, Clone)]
pub struct FetchResponse {
    /// URL of the final response
    pub final_url: Url,

    pub status: u16,

    /// Content-Type header value (empty when absent)
    pub content_type: String,

    pub x_robots_tag: Option<String>,

    pub body: Vec<u8>,

    /// Every hop that answered with a redirect, in order
    pub redirect_chain: Vec<Redirect>,

    /// Time from the first request to the end of the body
    pub response_time: Duration,
}

/// Retrieves pages over the network
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Fetches a URL
    ///
    /// Non-2xx responses are returned as `Ok` with their status. Implementations
    /// return `FetchError::NonHtml` for successful non-HTML responses and
    /// `FetchError::Cancelled` once `cancel` fires.
    async fn fetch(&self, url: &Url, cancel: &CancellationToken)
        -> Result<FetchResponse, FetchError>;
}

/// Builds an HTTP client with proper configuration
///
/// # Arguments
///
/// * `config` - The crawler configuration (user agent and timeout)
///
/// # Returns
///
/// * `Ok(Client)` - Successfully built HTTP client
/// * `Err(reqwest::Error)` - Failed to build client
///
/// # Example
///
/// ```
/// use seo_ripple::config::CrawlerConfig;
/// use seo_ripple::crawler::build_http_client;
///
/// let config = CrawlerConfig::new("https://example.com");
/// let client = build_http_client(&config).unwrap();
/// ```
pub fn build_http_client(config: &CrawlerConfig) -> Result<Client, reqwest::Error> {
    let timeout = config.timeout();

    Client::builder()
        .user_agent(config.user_agent.clone())
        .timeout(timeout)
        .connect_timeout(timeout.min(Duration::from_secs(10)))
        .redirect(Policy::none()) // Handle redirects manually
        .gzip(true)
        .brotli(true)
        .build()
}

/// `Fetcher` backed by reqwest
///
/// # Retry Logic
///
/// | Condition | Action |
/// |-----------|--------|
/// | HTTP 5xx | Retry up to `max-retries` times |
/// | Timeout / connection error | Retry up to `max-retries` times |
/// | HTTP 4xx | Returned as-is |
/// | Redirect loop | Immediate failure |
/// | Redirect chain > 10 | Immediate failure |
/// | Non-HTML 2xx | `FetchError::NonHtml` |
///
/// The delay between attempts grows linearly with the attempt number.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
    max_retries: u32,
    retry_delay: Duration,
}

impl HttpFetcher {
    /// Creates a fetcher from the crawler configuration
    pub fn new(config: &CrawlerConfig) -> Result<Self, reqwest::Error> {
        Ok(Self::with_client(build_http_client(config)?, config.max_retries))
    }

    /// Creates a fetcher around an existing client
    pub fn with_client(client: Client, max_retries: u32) -> Self {
        Self {
            client,
            max_retries,
            retry_delay: RETRY_DELAY,
        }
    }

    /// Overrides the base delay between retries
    pub fn with_retry_delay(mut self, retry_delay: Duration) -> Self {
        self.retry_delay = retry_delay;
        self
    }

    /// Performs one attempt: the request and every redirect hop
    async fn fetch_once(
        &self,
        url: &Url,
        cancel: &CancellationToken,
    ) -> Result<FetchResponse, FetchError> {
        let started = Instant::now();
        let mut current = url.clone();
        let mut chain = Vec::new();
        let mut seen = HashSet::new();
        seen.insert(current.to_string());

        loop {
            let response = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(FetchError::Cancelled),
                response = self.client.get(current.clone()).send() => response?,
            };

            let status = response.status();
            if status.is_redirection() {
                if let Some(next) = redirect_target(&current, &response)? {
                    chain.push(Redirect {
                        url: current.to_string(),
                        status: status.as_u16(),
                    });

                    if chain.len() > MAX_REDIRECTS {
                        return Err(FetchError::TooManyRedirects(MAX_REDIRECTS));
                    }
                    if !seen.insert(next.to_string()) {
                        return Err(FetchError::RedirectLoop(next.to_string()));
                    }

                    tracing::debug!("Redirect {} -> {} ({})", current, next, status);
                    current = next;
                    continue;
                }
            }

            let content_type = header_value(&response, header::CONTENT_TYPE).unwrap_or_default();
            let x_robots_tag = header_value(&response, "x-robots-tag");

            if status.is_success() && !is_html(&content_type) {
                return Err(FetchError::NonHtml { content_type });
            }

            let body = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(FetchError::Cancelled),
                body = response.bytes() => body?,
            };

            return Ok(FetchResponse {
                final_url: current,
                status: status.as_u16(),
                content_type,
                x_robots_tag,
                body: body.to_vec(),
                redirect_chain: chain,
                response_time: started.elapsed(),
            });
        }
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(
        &self,
        url: &Url,
        cancel: &CancellationToken,
    ) -> Result<FetchResponse, FetchError> {
        let mut attempt = 0;

        loop {
            let result = self.fetch_once(url, cancel).await;

            let retry = attempt < self.max_retries
                && match &result {
                    Ok(response) => response.status >= 500,
                    Err(e) => e.is_transient(),
                };

            if !retry {
                return result;
            }

            attempt += 1;
            match &result {
                Ok(response) => tracing::debug!(
                    "HTTP {} for {}, retry {}/{}",
                    response.status,
                    url,
                    attempt,
                    self.max_retries
                ),
                Err(e) => tracing::debug!(
                    "Fetch of {} failed ({}), retry {}/{}",
                    url,
                    e,
                    attempt,
                    self.max_retries
                ),
            }

            tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(FetchError::Cancelled),
                _ = tokio::time::sleep(self.retry_delay * attempt) => {}
            }
        }
    }
}

/// Resolves the Location header of a redirect response
///
/// Returns `Ok(None)` when there is no Location header; the response is then
/// treated as final.
fn redirect_target(current: &Url, response: &Response) -> Result<Option<Url>, FetchError> {
    let Some(location) = header_value(response, header::LOCATION) else {
        return Ok(None);
    };

    let next = current
        .join(&location)
        .map_err(|e| FetchError::InvalidRedirect(format!("'{}': {}", location, e)))?;

    if next.scheme() != "http" && next.scheme() != "https" {
        return Err(FetchError::InvalidRedirect(format!(
            "unsupported scheme in '{}'",
            next
        )));
    }

    Ok(Some(next))
}

fn header_value(response: &Response, name: impl header::AsHeaderName) -> Option<String> {
    response
        .headers()
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.trim().to_string())
}

/// Responses without a Content-Type are given the benefit of the doubt
fn is_html(content_type: &str) -> bool {
    let content_type = content_type.to_ascii_lowercase();
    content_type.is_empty()
        || content_type.contains("text/html")
        || content_type.contains("application/xhtml+xml")
}
