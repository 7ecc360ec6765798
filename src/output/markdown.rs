//! Markdown report generation
//!
//! This module generates a human-readable markdown report of a crawl,
//! including statistics, SEO issues, and the pages crawled.

use crate::output::stats::CrawlStatistics;
use crate::output::{CrawlReport, OutputResult};
use std::fs::File;
use std::io::Write;
use std::path::Path;

/// Number of URLs listed per issue before the list is truncated
const MAX_LISTED: usize = 25;

/// Writes the markdown report to a file
///
/// # Arguments
///
/// * `report` - The crawl report
/// * `output_path` - Path where the markdown file should be written
///
/// # Returns
///
/// * `Ok(())` - Successfully wrote markdown report
/// * `Err(OutputError)` - Failed to write report
pub fn generate_markdown_report(report: &CrawlReport, output_path: &Path) -> OutputResult<()> {
    let markdown = format_markdown_report(report);

    let mut file = File::create(output_path)?;
    file.write_all(markdown.as_bytes())?;

    Ok(())
}

/// Formats a crawl report as markdown
pub fn format_markdown_report(report: &CrawlReport) -> String {
    let stats = CrawlStatistics::from_report(report);
    let mut md = String::new();

    md.push_str("# Seo-Ripple Crawl Report\n\n");

    md.push_str("## Run Information\n\n");
    md.push_str(&format!("- **Start URL**: {}\n", report.start_url));
    md.push_str(&format!("- **Started**: {}\n", report.started_at.to_rfc3339()));
    md.push_str(&format!("- **Finished**: {}\n", report.finished_at.to_rfc3339()));
    md.push_str(&format!("- **Duration**: {:.1} seconds\n", stats.duration_secs));
    md.push_str(&format!(
        "- **Status**: {}\n\n",
        if stats.cancelled { "stopped early" } else { "complete" }
    ));

    md.push_str("## Overall Statistics\n\n");
    md.push_str(&format!("- **Pages Crawled**: {}\n", stats.total_pages));
    md.push_str(&format!("- **Success Rate**: {:.2}%\n", stats.success_rate()));
    md.push_str(&format!("- **Indexable Pages**: {}\n", stats.indexable_pages));
    md.push_str(&format!("- **Redirected Pages**: {}\n", stats.redirected_pages));
    md.push_str(&format!("- **Internal Links**: {}\n", stats.internal_links));
    md.push_str(&format!("- **External Links**: {}\n", stats.external_links));
    md.push_str(&format!(
        "- **Images**: {} ({} without alt text)\n",
        stats.images, stats.images_missing_alt
    ));
    md.push_str(&format!(
        "- **Average Response Time**: {:.0} ms\n",
        stats.average_response_ms
    ));
    md.push_str(&format!(
        "- **Link Graph**: {} sources, {} edges\n",
        report.link_graph.source_count(),
        report.link_graph.edge_count()
    ));
    if stats.dropped_links > 0 {
        md.push_str(&format!(
            "- **Links Dropped (queue full)**: {}\n",
            stats.dropped_links
        ));
    }
    md.push('\n');

    md.push_str("## Status Breakdown\n\n");
    md.push_str("| Status | Count |\n");
    md.push_str("|--------|-------|\n");
    for (status, count) in &stats.status_breakdown {
        if *status == 0 {
            md.push_str(&format!("| no response | {} |\n", count));
        } else {
            md.push_str(&format!("| {} | {} |\n", status, count));
        }
    }
    md.push('\n');

    md.push_str("## Depth Breakdown\n\n");
    md.push_str("| Depth | Pages |\n");
    md.push_str("|-------|-------|\n");
    for (depth, count) in &stats.depth_breakdown {
        md.push_str(&format!("| {} | {} |\n", depth, count));
    }
    md.push('\n');

    let issues = &stats.issues;
    md.push_str("## SEO Issues\n\n");
    if issues.total() == 0 {
        md.push_str("No issues found.\n\n");
    } else {
        push_url_list(&mut md, "Missing Title", &issues.missing_title);
        push_url_list(&mut md, "Missing Meta Description", &issues.missing_description);
        push_url_list(&mut md, "Missing H1", &issues.missing_h1);
        push_url_list(&mut md, "Multiple H1", &issues.multiple_h1);

        if !issues.duplicate_titles.is_empty() {
            md.push_str(&format!(
                "### Duplicate Titles ({})\n\n",
                issues.duplicate_titles.len()
            ));
            for (title, urls) in issues.duplicate_titles.iter().take(MAX_LISTED) {
                md.push_str(&format!("- \"{}\" used by {} pages\n", escape(title), urls.len()));
                for url in urls.iter().take(MAX_LISTED) {
                    md.push_str(&format!("  - {}\n", url));
                }
            }
            md.push('\n');
        }

        push_url_list(&mut md, "Not Indexable", &issues.non_indexable);

        if !issues.errors.is_empty() {
            md.push_str(&format!("### Fetch Errors ({})\n\n", issues.errors.len()));
            md.push_str("| URL | Error |\n");
            md.push_str("|-----|-------|\n");
            for (url, error) in issues.errors.iter().take(MAX_LISTED) {
                md.push_str(&format!("| {} | {} |\n", url, escape(error)));
            }
            md.push('\n');
        }
    }

    md.push_str("## Pages\n\n");
    md.push_str("| URL | Status | Depth | Title | Indexable |\n");
    md.push_str("|-----|--------|-------|-------|-----------|\n");
    let mut pages: Vec<_> = report.outcome.pages.iter().collect();
    pages.sort_by(|a, b| a.depth.cmp(&b.depth).then_with(|| a.url.cmp(&b.url)));
    for page in pages {
        md.push_str(&format!(
            "| {} | {} | {} | {} | {} |\n",
            page.url,
            page.status_code,
            page.depth,
            escape(&page.title),
            if page.indexability.indexable { "yes" } else { "no" }
        ));
    }
    md.push('\n');

    md.push_str("---\n\n");
    md.push_str(&format!(
        "*Generated by Seo-Ripple v{}*\n",
        env!("CARGO_PKG_VERSION")
    ));

    md
}

fn push_url_list(md: &mut String, heading: &str, urls: &[String]) {
    if urls.is_empty() {
        return;
    }

    md.push_str(&format!("### {} ({})\n\n", heading, urls.len()));
    for url in urls.iter().take(MAX_LISTED) {
        md.push_str(&format!("- {}\n", url));
    }
    if urls.len() > MAX_LISTED {
        md.push_str(&format!("- ... and {} more\n", urls.len() - MAX_LISTED));
    }
    md.push('\n');
}

/// Keeps table cells on one line and stops `|` from splitting them
fn escape(text: &str) -> String {
    text.replace('|', "\\|").replace(['\n', '\r'], " ")
}
