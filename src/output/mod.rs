//! Output module for crawl reports
//!
//! This module handles:
//! - Bundling a finished crawl into a `CrawlReport`
//! - Exporting reports as JSON, Markdown or SQLite
//! - Computing and printing crawl statistics and SEO issues

mod json;
mod markdown;
pub mod stats;

pub use json::{format_json_report, generate_json_report};
pub use markdown::{format_markdown_report, generate_markdown_report};
pub use stats::{print_statistics, CrawlStatistics};

use crate::crawler::CrawlOutcome;
use crate::storage::{LinkGraph, SqliteReportWriter};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use thiserror::Error;

/// Errors that can occur during output operations
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Unsupported export format '{0}'")]
    UnsupportedFormat(String),
}

/// Result type for output operations
pub type OutputResult<T> = Result<T, OutputError>;

/// Supported export formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Json,
    Markdown,
    Sqlite,
}

impl ExportFormat {
    /// Accepted names, as written in configuration files
    pub const NAMES: &'static [&'static str] = &["json", "markdown", "sqlite"];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Markdown => "markdown",
            Self::Sqlite => "sqlite",
        }
    }

    /// File name used when no output path is given
    pub fn default_file_name(&self) -> &'static str {
        match self {
            Self::Json => "crawl-report.json",
            Self::Markdown => "crawl-report.md",
            Self::Sqlite => "crawl-report.db",
        }
    }
}

impl FromStr for ExportFormat {
    type Err = OutputError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "markdown" | "md" => Ok(Self::Markdown),
            "sqlite" | "db" => Ok(Self::Sqlite),
            _ => Err(OutputError::UnsupportedFormat(s.to_string())),
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A finished crawl, ready for export
#[derive(Debug, Clone, Serialize)]
pub struct CrawlReport {
    pub start_url: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub outcome: CrawlOutcome,
    pub link_graph: LinkGraph,
}

impl CrawlReport {
    /// Bundles a crawl outcome, stamping the finish time now
    pub fn new(
        start_url: impl Into<String>,
        started_at: DateTime<Utc>,
        outcome: CrawlOutcome,
        link_graph: LinkGraph,
    ) -> Self {
        Self {
            start_url: start_url.into(),
            started_at,
            finished_at: Utc::now(),
            outcome,
            link_graph,
        }
    }

    pub fn duration_secs(&self) -> f64 {
        (self.finished_at - self.started_at).num_milliseconds().max(0) as f64 / 1000.0
    }
}

/// Writes a report in the given format
///
/// # Arguments
///
/// * `report` - The crawl report
/// * `format` - Target format
/// * `path` - Destination file; SQLite databases are appended to
///
/// # Returns
///
/// * `Ok(())` - Report written
/// * `Err(OutputError)` - Failed to serialize or write the report
pub fn export(report: &CrawlReport, format: ExportFormat, path: &Path) -> OutputResult<()> {
    match format {
        ExportFormat::Json => generate_json_report(report, path)?,
        ExportFormat::Markdown => generate_markdown_report(report, path)?,
        ExportFormat::Sqlite => {
            let mut writer = SqliteReportWriter::open(path)?;
            writer.write_report(report)?;
        }
    }

    tracing::info!("Wrote {} report to {}", format, path.display());
    Ok(())
}
