//! Crawler module for web page fetching and processing
//!
//! This module contains the core crawling logic, including:
//! - HTTP fetching with retry and redirect handling
//! - HTML parsing and SEO field extraction
//! - The bounded work queue and its completion barrier
//! - Overall crawl coordination across a pool of workers

mod coordinator;
mod fetcher;
mod frontier;
mod parser;
mod visited;
mod worker;

pub use coordinator::{Collaborators, Coordinator, CrawlOutcome, ProgressCallback};
pub use fetcher::{build_http_client, FetchError, FetchResponse, Fetcher, HttpFetcher, MAX_REDIRECTS};
pub use frontier::Frontier;
pub use parser::{parse_page, ParseError, ParsedPage};
pub use visited::{PageBudget, VisitedSet};
