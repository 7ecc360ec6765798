//! Seo-Ripple: a concurrent SEO crawler
//!
//! This crate crawls a website from a seed URL, extracts SEO-relevant structure
//! from every page (titles, descriptions, headings, links, images, indexability),
//! records the link graph, and streams results as pages complete.

pub mod config;
pub mod crawler;
pub mod output;
pub mod page;
pub mod robots;
pub mod sitemap;
pub mod storage;
pub mod url;

use thiserror::Error;

/// Main error type for Seo-Ripple operations
#[derive(Debug, Error)]
pub enum RippleError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("HTTP error for {url}: {source}")]
    Http { url: String, source: reqwest::Error },

    #[error("Unexpected HTTP status {status} for {url}")]
    Status { url: String, status: u16 },

    #[error("URL error: {0}")]
    UrlError(#[from] UrlError),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] ::url::ParseError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("Robots.txt error: {0}")]
    Robots(String),

    #[error("Sitemap error: {0}")]
    Sitemap(String),

    #[error("Output error: {0}")]
    Output(#[from] output::OutputError),

    #[error("Crawl cancelled before any page was collected")]
    Cancelled,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

/// URL-specific errors
#[derive(Debug, Error)]
pub enum UrlError {
    #[error("Failed to parse URL: {0}")]
    Parse(String),

    #[error("Invalid URL scheme: {0}")]
    InvalidScheme(String),

    #[error("Missing host in URL")]
    MissingHost,
}

/// Result type alias for Seo-Ripple operations
pub type Result<T> = std::result::Result<T, RippleError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for URL operations
pub type UrlResult<T> = std::result::Result<T, UrlError>;

// Re-export commonly used types
pub use config::Config;
pub use crawler::{parse_page, Coordinator, CrawlOutcome};
pub use page::{CrawlTask, PageResult};
pub use url::{normalize_url, DomainFilter};
