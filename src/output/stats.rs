//! Statistics and SEO issue detection for a finished crawl
//!
//! This module derives aggregate numbers from a `CrawlReport` and prints
//! them to the console.

use crate::output::CrawlReport;
use std::collections::BTreeMap;

/// Crawl statistics summary
#[derive(Debug, Clone, Default)]
pub struct CrawlStatistics {
    /// Total number of stored pages
    pub total_pages: usize,

    /// Pages answered with 200 and no error
    pub successful_pages: usize,

    /// Pages whose fetch failed
    pub error_pages: usize,

    pub status_breakdown: BTreeMap<u16, usize>,
    pub depth_breakdown: BTreeMap<u32, usize>,

    pub internal_links: usize,
    pub external_links: usize,
    pub images: usize,
    pub images_missing_alt: usize,
    pub redirected_pages: usize,
    pub indexable_pages: usize,
    pub average_response_ms: f64,

    pub dropped_links: usize,
    pub cancelled: bool,
    pub duration_secs: f64,

    pub issues: SeoIssues,
}

/// URLs of successful pages with SEO problems
#[derive(Debug, Clone, Default)]
pub struct SeoIssues {
    pub missing_title: Vec<String>,
    pub missing_description: Vec<String>,
    pub missing_h1: Vec<String>,
    pub multiple_h1: Vec<String>,

    /// Title shared by more than one page, with the pages using it
    pub duplicate_titles: BTreeMap<String, Vec<String>>,

    pub non_indexable: Vec<String>,

    /// `(url, error)` for every failed fetch
    pub errors: Vec<(String, String)>,
}

impl SeoIssues {
    pub fn total(&self) -> usize {
        self.missing_title.len()
            + self.missing_description.len()
            + self.missing_h1.len()
            + self.multiple_h1.len()
            + self.duplicate_titles.values().map(Vec::len).sum::<usize>()
            + self.non_indexable.len()
            + self.errors.len()
    }
}

impl CrawlStatistics {
    /// Computes statistics from a report
    ///
    /// Content checks (titles, descriptions, headings, indexability) only look
    /// at pages answered with 200 and no error.
    pub fn from_report(report: &CrawlReport) -> Self {
        let pages = &report.outcome.pages;
        let mut stats = CrawlStatistics {
            total_pages: pages.len(),
            dropped_links: report.outcome.dropped_links,
            cancelled: report.outcome.cancelled,
            duration_secs: report.duration_secs(),
            ..Default::default()
        };

        let mut titles: BTreeMap<String, Vec<String>> = BTreeMap::new();
        let mut total_response_ms = 0u64;

        for page in pages {
            *stats.status_breakdown.entry(page.status_code).or_insert(0) += 1;
            *stats.depth_breakdown.entry(page.depth).or_insert(0) += 1;
            total_response_ms += page.response_time_ms;

            stats.internal_links += page.internal_links.len();
            stats.external_links += page.external_links.len();
            stats.images += page.images.len();
            stats.images_missing_alt += page.images.iter().filter(|i| i.alt.is_empty()).count();

            if page.is_redirected() {
                stats.redirected_pages += 1;
            }
            if page.indexability.indexable {
                stats.indexable_pages += 1;
            }

            if let Some(error) = &page.error {
                stats.error_pages += 1;
                stats.issues.errors.push((page.url.clone(), error.clone()));
                continue;
            }
            if page.status_code != 200 {
                continue;
            }

            stats.successful_pages += 1;
            let issues = &mut stats.issues;

            if page.title.is_empty() {
                issues.missing_title.push(page.url.clone());
            } else {
                titles
                    .entry(page.title.clone())
                    .or_default()
                    .push(page.url.clone());
            }
            if page.meta_description.is_empty() {
                issues.missing_description.push(page.url.clone());
            }
            match page.headings.h1.len() {
                0 => issues.missing_h1.push(page.url.clone()),
                1 => {}
                _ => issues.multiple_h1.push(page.url.clone()),
            }
            if !page.indexability.indexable {
                issues.non_indexable.push(page.url.clone());
            }
        }

        stats.issues.duplicate_titles = titles
            .into_iter()
            .filter(|(_, urls)| urls.len() > 1)
            .collect();

        if !pages.is_empty() {
            stats.average_response_ms = total_response_ms as f64 / pages.len() as f64;
        }

        stats
    }

    /// Percentage of stored pages answered with 200 and no error
    pub fn success_rate(&self) -> f64 {
        if self.total_pages == 0 {
            0.0
        } else {
            self.successful_pages as f64 / self.total_pages as f64 * 100.0
        }
    }
}

/// Prints statistics to stdout in a formatted manner
///
/// # Arguments
///
/// * `stats` - The statistics to display
pub fn print_statistics(stats: &CrawlStatistics) {
    println!("=== Crawl Statistics ===\n");

    println!("Overview:");
    println!("  Pages crawled: {}", stats.total_pages);
    println!("  Duration: {:.1}s", stats.duration_secs);
    println!("  Average response time: {:.0} ms", stats.average_response_ms);
    println!("  Internal links: {}", stats.internal_links);
    println!("  External links: {}", stats.external_links);
    println!("  Images: {} ({} without alt text)", stats.images, stats.images_missing_alt);
    println!("  Redirected pages: {}", stats.redirected_pages);
    println!("  Indexable pages: {}", stats.indexable_pages);
    if stats.dropped_links > 0 {
        println!("  Links dropped (queue full): {}", stats.dropped_links);
    }
    if stats.cancelled {
        println!("  Crawl stopped early (page budget or interrupt)");
    }
    println!();

    println!("Pages by Status:");
    for (status, count) in &stats.status_breakdown {
        let label = if *status == 0 {
            "no response".to_string()
        } else {
            status.to_string()
        };
        println!("  {}: {}", label, count);
    }
    println!();

    println!("Pages by Depth:");
    for (depth, count) in &stats.depth_breakdown {
        println!("  {}: {}", depth, count);
    }
    println!();

    let issues = &stats.issues;
    if issues.total() > 0 {
        println!("SEO Issues:");
        println!("  Missing title: {}", issues.missing_title.len());
        println!("  Missing meta description: {}", issues.missing_description.len());
        println!("  Missing H1: {}", issues.missing_h1.len());
        println!("  Multiple H1: {}", issues.multiple_h1.len());
        println!("  Duplicate titles: {}", issues.duplicate_titles.len());
        println!("  Not indexable: {}", issues.non_indexable.len());
        println!("  Fetch errors: {}", issues.errors.len());
        println!();
    }

    println!(
        "Success Rate: {:.1}% ({} / {} pages answered 200)",
        stats.success_rate(),
        stats.successful_pages,
        stats.total_pages
    );
}
