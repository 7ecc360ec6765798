//! Page data model
//!
//! This module defines the records that flow through a crawl:
//! - `CrawlTask`: a queued URL and its link depth
//! - `PageResult`: everything learned about one visited URL
//! - `Indexability`: robots directives and canonicalization signals

use crate::crawler::ParsedPage;
use crate::url::resolve_link;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use url::Url;

/// A unit of work: a URL and its distance from the seeds
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrawlTask {
    pub url: String,
    pub depth: u32,
}

impl CrawlTask {
    pub fn new(url: impl Into<String>, depth: u32) -> Self {
        Self {
            url: url.into(),
            depth,
        }
    }
}

/// Heading text grouped by level, in document order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Headings {
    pub h1: Vec<String>,
    pub h2: Vec<String>,
    pub h3: Vec<String>,
    pub h4: Vec<String>,
    pub h5: Vec<String>,
    pub h6: Vec<String>,
}

impl Headings {
    /// Returns the headings of the given level (1 to 6)
    ///
    /// Levels outside that range yield an empty slice.
    pub fn level(&self, level: u8) -> &[String] {
        match level {
            1 => &self.h1,
            2 => &self.h2,
            3 => &self.h3,
            4 => &self.h4,
            5 => &self.h5,
            6 => &self.h6,
            _ => &[],
        }
    }

    pub(crate) fn level_mut(&mut self, level: u8) -> Option<&mut Vec<String>> {
        match level {
            1 => Some(&mut self.h1),
            2 => Some(&mut self.h2),
            3 => Some(&mut self.h3),
            4 => Some(&mut self.h4),
            5 => Some(&mut self.h5),
            6 => Some(&mut self.h6),
            _ => None,
        }
    }
}

/// An image referenced by a page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageRef {
    pub url: String,
    pub alt: String,
}

/// One hop of a redirect chain: the URL that answered with a redirect and its status
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Redirect {
    pub url: String,
    pub status: u16,
}

/// Signals deciding whether a page can appear in search results
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Indexability {
    /// Content of `<meta name="robots">`
    pub meta_robots: Option<String>,

    /// Value of the `X-Robots-Tag` response header
    pub x_robots_tag: Option<String>,

    pub noindex: bool,
    pub nofollow: bool,

    /// The canonical URL points at another page
    pub canonicalized: bool,

    /// Status 200, no error, no noindex, not canonicalized
    pub indexable: bool,
}

impl Indexability {
    /// Derives the indexability flags of a page
    ///
    /// # Arguments
    ///
    /// * `page_url` - The URL the page was served from, after redirects
    /// * `status_code` - HTTP status of the final response
    /// * `has_error` - Whether the fetch failed
    /// * `meta_robots` - Content of the robots meta tag, if any
    /// * `x_robots_tag` - Value of the X-Robots-Tag header, if any
    /// * `canonical` - Raw canonical href (empty when absent)
    pub fn evaluate(
        page_url: &str,
        status_code: u16,
        has_error: bool,
        meta_robots: Option<String>,
        x_robots_tag: Option<String>,
        canonical: &str,
    ) -> Self {
        let directives: Vec<String> = meta_robots
            .iter()
            .chain(x_robots_tag.iter())
            .flat_map(|value| robots_directives(value))
            .collect();

        let noindex = directives.iter().any(|d| d == "noindex" || d == "none");
        let nofollow = directives.iter().any(|d| d == "nofollow" || d == "none");
        let canonicalized = is_canonicalized(page_url, canonical);
        let indexable = status_code == 200 && !has_error && !noindex && !canonicalized;

        Self {
            meta_robots,
            x_robots_tag,
            noindex,
            nofollow,
            canonicalized,
            indexable,
        }
    }
}

/// Splits a robots directive list into lowercase tokens
///
/// Handles both `noindex, nofollow` and user-agent scoped header values
/// such as `googlebot: noindex`.
fn robots_directives(value: &str) -> Vec<String> {
    value
        .split(|c: char| c == ',' || c == ':' || c.is_whitespace())
        .map(|token| token.trim().to_ascii_lowercase())
        .filter(|token| !token.is_empty())
        .collect()
}

fn is_canonicalized(page_url: &str, canonical: &str) -> bool {
    let canonical = canonical.trim();
    if canonical.is_empty() {
        return false;
    }

    let Ok(page) = Url::parse(page_url) else {
        return canonical != page_url;
    };

    match resolve_link(canonical, &page) {
        Some(resolved) => resolved.as_str() != page.as_str(),
        None => false,
    }
}

/// Everything learned about one visited URL
///
/// Built partially from the fetch response, completed with the extracted
/// page fragment, and never modified after it reaches the collector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageResult {
    /// URL as claimed in the visited set
    pub url: String,

    /// URL after following redirects
    pub final_url: String,

    pub depth: u32,

    /// HTTP status of the final response (0 when no response was received)
    pub status_code: u16,

    pub response_time_ms: u64,
    pub content_type: String,
    pub title: String,
    pub meta_description: String,
    pub canonical_url: String,
    pub lang: Option<String>,
    pub headings: Headings,
    pub internal_links: Vec<String>,
    pub external_links: Vec<String>,
    pub images: Vec<ImageRef>,
    pub redirect_chain: Vec<Redirect>,
    pub error: Option<String>,
    pub indexability: Indexability,
    pub crawled_at: DateTime<Utc>,
}

impl PageResult {
    /// Creates an empty result for a task
    pub fn new(task: &CrawlTask) -> Self {
        Self {
            url: task.url.clone(),
            final_url: task.url.clone(),
            depth: task.depth,
            status_code: 0,
            response_time_ms: 0,
            content_type: String::new(),
            title: String::new(),
            meta_description: String::new(),
            canonical_url: String::new(),
            lang: None,
            headings: Headings::default(),
            internal_links: Vec::new(),
            external_links: Vec::new(),
            images: Vec::new(),
            redirect_chain: Vec::new(),
            error: None,
            indexability: Indexability::default(),
            crawled_at: Utc::now(),
        }
    }

    /// Creates a result for a task that produced no response
    pub fn failed(task: &CrawlTask, error: impl Into<String>) -> Self {
        let mut result = Self::new(task);
        result.error = Some(error.into());
        result.refresh_indexability();
        result
    }

    /// Merges the extracted page fragment into this result
    pub fn apply(&mut self, parsed: ParsedPage) {
        self.title = parsed.title;
        self.meta_description = parsed.meta_description;
        self.canonical_url = parsed.canonical_url;
        self.lang = parsed.lang;
        self.headings = parsed.headings;
        self.internal_links = parsed.internal_links;
        self.external_links = parsed.external_links;
        self.images = parsed.images;
        self.indexability.meta_robots = parsed.meta_robots;
        self.refresh_indexability();
    }

    /// Recomputes the derived indexability flags from the current fields
    pub fn refresh_indexability(&mut self) {
        self.indexability = Indexability::evaluate(
            &self.final_url,
            self.status_code,
            self.error.is_some(),
            self.indexability.meta_robots.take(),
            self.indexability.x_robots_tag.take(),
            &self.canonical_url,
        );
    }

    /// Whether links on this page may be followed
    ///
    /// Only successful pages without errors expand the crawl.
    pub fn is_expandable(&self) -> bool {
        self.status_code == 200 && self.error.is_none()
    }

    pub fn is_redirected(&self) -> bool {
        !self.redirect_chain.is_empty()
    }
}
