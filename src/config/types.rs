use crate::url::DomainFilter;
use serde::Deserialize;
use std::time::Duration;

/// Main configuration structure for Seo-Ripple
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub crawler: CrawlerConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

/// Crawler behavior configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CrawlerConfig {
    /// URL the crawl starts from
    #[serde(rename = "start-url")]
    pub start_url: String,

    /// Maximum link depth from the seed pages
    #[serde(rename = "max-depth", default = "default_max_depth")]
    pub max_depth: u32,

    /// Maximum number of pages stored in the results
    #[serde(rename = "max-pages", default = "default_max_pages")]
    pub max_pages: usize,

    /// Number of concurrent workers
    #[serde(default = "default_workers")]
    pub workers: usize,

    /// Delay each worker waits before a request (milliseconds)
    #[serde(rename = "delay-ms", default)]
    pub delay_ms: u64,

    /// Per-request timeout (seconds)
    #[serde(rename = "timeout-secs", default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Additional attempts after a failed fetch
    #[serde(rename = "max-retries", default = "default_max_retries")]
    pub max_retries: u32,

    #[serde(rename = "user-agent", default = "default_user_agent")]
    pub user_agent: String,

    /// Whether robots.txt rules are honored
    #[serde(rename = "respect-robots", default = "default_true")]
    pub respect_robots: bool,

    /// Whether the sitemap is used to seed the crawl
    #[serde(rename = "parse-sitemap", default)]
    pub parse_sitemap: bool,

    /// "same" restricts discovery to the start host, anything else allows every host
    #[serde(rename = "domain-filter", default = "default_domain_filter")]
    pub domain_filter: String,
}

/// Export configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// Export format: "json", "markdown" or "sqlite"
    #[serde(default = "default_format")]
    pub format: String,

    /// Path of the export file
    #[serde(default = "default_output_path")]
    pub path: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            format: default_format(),
            path: default_output_path(),
        }
    }
}

impl Config {
    /// Builds a configuration with every setting at its default
    pub fn for_start_url(start_url: impl Into<String>) -> Self {
        Self {
            crawler: CrawlerConfig::new(start_url),
            output: OutputConfig::default(),
        }
    }
}

impl CrawlerConfig {
    /// Creates a crawler configuration with default limits
    pub fn new(start_url: impl Into<String>) -> Self {
        Self {
            start_url: start_url.into(),
            max_depth: default_max_depth(),
            max_pages: default_max_pages(),
            workers: default_workers(),
            delay_ms: 0,
            timeout_secs: default_timeout_secs(),
            max_retries: default_max_retries(),
            user_agent: default_user_agent(),
            respect_robots: true,
            parse_sitemap: false,
            domain_filter: default_domain_filter(),
        }
    }

    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn domain_filter(&self) -> DomainFilter {
        DomainFilter::from_mode(&self.domain_filter)
    }

    /// Capacity of the work queue: twice the page budget
    pub fn queue_capacity(&self) -> usize {
        self.max_pages.saturating_mul(2).max(1)
    }
}

fn default_max_depth() -> u32 {
    3
}

fn default_max_pages() -> usize {
    500
}

fn default_workers() -> usize {
    10
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_max_retries() -> u32 {
    2
}

fn default_user_agent() -> String {
    format!(
        "seo-ripple/{} (+https://github.com/seo-ripple/seo-ripple)",
        env!("CARGO_PKG_VERSION")
    )
}

fn default_true() -> bool {
    true
}

fn default_domain_filter() -> String {
    "same".to_string()
}

fn default_format() -> String {
    "json".to_string()
}

fn default_output_path() -> String {
    "crawl-report.json".to_string()
}
