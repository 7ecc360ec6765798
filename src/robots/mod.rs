//! Robots.txt handling module
//!
//! This module provides functionality for fetching, parsing, and caching robots.txt files.
//! The crawler only sees the [`RobotsPolicy`] trait; [`RobotsChecker`] is the
//! HTTP-backed implementation.

mod cache;
mod parser;

pub use cache::CachedRobots;
pub use parser::{product_token, ParsedRobots};

use crate::RippleError;
use async_trait::async_trait;
use dashmap::DashMap;
use reqwest::{Client, StatusCode};
use std::sync::Arc;
use tokio::sync::Mutex;
use url::Url;

/// Decides whether a URL may be crawled
#[async_trait]
pub trait RobotsPolicy: Send + Sync {
    /// Returns whether the URL may be fetched
    ///
    /// Errors mean the policy could not be determined; callers proceed as if
    /// the URL were allowed.
    async fn is_allowed(&self, url: &Url) -> Result<bool, RippleError>;
}

/// Policy that allows everything
#[derive(Debug, Clone, Copy, Default)]
pub struct AllowAll;

#[async_trait]
impl RobotsPolicy for AllowAll {
    async fn is_allowed(&self, _url: &Url) -> Result<bool, RippleError> {
        Ok(true)
    }
}

/// Fetches robots.txt for an origin
///
/// # Arguments
///
/// * `client` - The HTTP client to use
/// * `origin` - Any URL on the origin
///
/// # Returns
///
/// * `Ok(ParsedRobots)` - The parsed file, or allow-all when the site has none (404/410)
/// * `Err(RippleError)` - Network failure or any other status
pub async fn fetch_robots(client: &Client, origin: &Url) -> Result<ParsedRobots, RippleError> {
    let robots_url = origin.join("/robots.txt")?;

    let response = client
        .get(robots_url.clone())
        .send()
        .await
        .map_err(|source| RippleError::Http {
            url: robots_url.to_string(),
            source,
        })?;

    let status = response.status();
    if status == StatusCode::NOT_FOUND || status == StatusCode::GONE {
        tracing::debug!("No robots.txt at {}", robots_url);
        return Ok(ParsedRobots::allow_all());
    }

    if !status.is_success() {
        return Err(RippleError::Status {
            url: robots_url.to_string(),
            status: status.as_u16(),
        });
    }

    let content = response.text().await.map_err(|source| RippleError::Http {
        url: robots_url.to_string(),
        source,
    })?;

    Ok(ParsedRobots::from_content(&content))
}

/// Robots policy backed by HTTP, with a per-origin cache
///
/// Concurrent lookups for one origin wait on a per-origin lock, so each
/// origin's robots.txt is requested once per TTL.
pub struct RobotsChecker {
    client: Client,
    agent: String,
    cache: DashMap<String, CachedRobots>,
    fetch_locks: DashMap<String, Arc<Mutex<()>>>,
}

impl RobotsChecker {
    /// Creates a checker matching rules for the product token of `user_agent`
    pub fn new(client: Client, user_agent: &str) -> Self {
        Self {
            client,
            agent: product_token(user_agent).to_string(),
            cache: DashMap::new(),
            fetch_locks: DashMap::new(),
        }
    }

    /// Returns the robots.txt of the URL's origin, fetching it when missing or stale
    ///
    /// A failed fetch is cached briefly; lookups in that window fail with
    /// [`RippleError::Robots`] without touching the network.
    pub async fn robots_for(&self, url: &Url) -> Result<ParsedRobots, RippleError> {
        let origin = url.origin().ascii_serialization();

        if let Some(cached) = self.fresh(&origin) {
            return cached;
        }

        let lock = self
            .fetch_locks
            .entry(origin.clone())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        let _guard = lock.lock().await;

        // Another lookup may have fetched it while we waited
        if let Some(cached) = self.fresh(&origin) {
            return cached;
        }

        match fetch_robots(&self.client, url).await {
            Ok(robots) => {
                self.cache.insert(origin, CachedRobots::new(robots.clone()));
                Ok(robots)
            }
            Err(e) => {
                tracing::debug!("robots.txt for {} unavailable: {}", origin, e);
                self.cache.insert(origin, CachedRobots::failed(e.to_string()));
                Err(e)
            }
        }
    }

    fn fresh(&self, origin: &str) -> Option<Result<ParsedRobots, RippleError>> {
        let cached = self.cache.get(origin)?;
        if cached.is_stale() {
            return None;
        }
        Some(cached.robots.clone().map_err(RippleError::Robots))
    }

    /// Number of origins with a cached robots.txt
    pub fn cached_origins(&self) -> usize {
        self.cache.len()
    }
}

#[async_trait]
impl RobotsPolicy for RobotsChecker {
    async fn is_allowed(&self, url: &Url) -> Result<bool, RippleError> {
        let robots = self.robots_for(url).await?;
        Ok(robots.is_allowed(url.as_str(), &self.agent))
    }
}
