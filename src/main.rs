//! Seo-Ripple main entry point
//!
//! This is the command-line interface for the Seo-Ripple crawler.

use anyhow::Context;
use chrono::Utc;
use clap::Parser;
use seo_ripple::config::{read_config, validate, Config};
use seo_ripple::crawler::{Collaborators, Coordinator};
use seo_ripple::output::{export, print_statistics, CrawlReport, CrawlStatistics, ExportFormat};
use seo_ripple::url::normalize_start_url;
use std::path::{Path, PathBuf};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

/// Seo-Ripple: a concurrent SEO crawler
///
/// Seo-Ripple crawls a website from a start URL, extracts titles, meta
/// descriptions, headings, links, images and indexability signals from every
/// page, and writes a report of what it found.
#[derive(Parser, Debug)]
#[command(name = "seo-ripple")]
#[command(version)]
#[command(about = "A concurrent SEO crawler", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: Option<PathBuf>,

    /// Start URL (overrides the config file; required without one)
    #[arg(short, long)]
    url: Option<String>,

    /// Maximum link depth from the start URL
    #[arg(long)]
    max_depth: Option<u32>,

    /// Maximum number of pages to store
    #[arg(long)]
    max_pages: Option<usize>,

    /// Number of concurrent workers
    #[arg(short, long)]
    workers: Option<usize>,

    /// Export format: json, markdown or sqlite
    #[arg(short, long)]
    format: Option<String>,

    /// Export file path
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Validate config and show what would be crawled without actually crawling
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    let config = match build_config(&cli) {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("Failed to load configuration: {:#}", e);
            return Err(e);
        }
    };

    if cli.dry_run {
        handle_dry_run(&config)?;
    } else {
        handle_crawl(config, cli.quiet).await?;
    }

    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("seo_ripple=info,warn"),
            1 => EnvFilter::new("seo_ripple=debug,info"),
            2 => EnvFilter::new("seo_ripple=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Loads the config file (if any), applies command-line overrides and validates the result
fn build_config(cli: &Cli) -> anyhow::Result<Config> {
    let mut config = match (&cli.config, &cli.url) {
        (Some(path), _) => {
            tracing::info!("Loading configuration from: {}", path.display());
            read_config(path).with_context(|| format!("reading {}", path.display()))?
        }
        (None, Some(url)) => Config::for_start_url(url.clone()),
        (None, None) => anyhow::bail!("either a CONFIG file or --url is required"),
    };

    if let Some(url) = &cli.url {
        config.crawler.start_url = url.clone();
    }
    if let Some(max_depth) = cli.max_depth {
        config.crawler.max_depth = max_depth;
    }
    if let Some(max_pages) = cli.max_pages {
        config.crawler.max_pages = max_pages;
    }
    if let Some(workers) = cli.workers {
        config.crawler.workers = workers;
    }
    if let Some(format) = &cli.format {
        config.output.format = format.clone();
        // Keep the file extension in line with the format unless a path was given
        if cli.output.is_none() {
            if let Ok(format) = format.parse::<ExportFormat>() {
                config.output.path = format.default_file_name().to_string();
            }
        }
    }
    if let Some(output) = &cli.output {
        config.output.path = output.display().to_string();
    }

    validate(&config)?;
    Ok(config)
}

/// Handles the --dry-run mode: validates config and shows what would be crawled
fn handle_dry_run(config: &Config) -> anyhow::Result<()> {
    let crawler = &config.crawler;
    let start_url = normalize_start_url(&crawler.start_url)?;

    println!("=== Seo-Ripple Dry Run ===\n");

    println!("Crawler Configuration:");
    println!("  Start URL: {}", start_url);
    println!("  Max depth: {}", crawler.max_depth);
    println!("  Max pages: {}", crawler.max_pages);
    println!("  Workers: {}", crawler.workers);
    println!("  Queue capacity: {}", crawler.queue_capacity());
    println!("  Delay: {}ms", crawler.delay_ms);
    println!("  Timeout: {}s", crawler.timeout_secs);
    println!("  Max retries: {}", crawler.max_retries);
    println!("  User agent: {}", crawler.user_agent);
    println!("  Respect robots.txt: {}", crawler.respect_robots);
    println!("  Seed from sitemap: {}", crawler.parse_sitemap);
    println!("  Domain filter: {:?}", crawler.domain_filter());

    println!("\nOutput:");
    println!("  Format: {}", config.output.format);
    println!("  Path: {}", config.output.path);

    println!("\n✓ Configuration is valid");

    Ok(())
}

/// Handles the main crawl operation
async fn handle_crawl(config: Config, quiet: bool) -> anyhow::Result<()> {
    let format: ExportFormat = config.output.format.parse()?;
    let output_path = PathBuf::from(&config.output.path);
    let start_url = normalize_start_url(&config.crawler.start_url)?;

    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::warn!("Interrupt received, stopping crawl");
                cancel.cancel();
            }
        });
    }

    let collaborators = Collaborators::http(&config.crawler)?;
    let mut coordinator = Coordinator::new(config, collaborators, cancel);
    coordinator.set_progress_callback(|page, total| {
        match &page.error {
            Some(error) => tracing::info!("[{}] {} failed: {}", total, page.url, error),
            None => tracing::info!(
                "[{}] {} {} (depth {})",
                total,
                page.status_code,
                page.url,
                page.depth
            ),
        }
    });

    let started_at = Utc::now();
    let outcome = match coordinator.crawl().await {
        Ok(outcome) => outcome,
        Err(e) => {
            tracing::error!("Crawl failed: {}", e);
            return Err(e.into());
        }
    };

    let report = CrawlReport::new(
        start_url.to_string(),
        started_at,
        outcome,
        coordinator.link_graph(),
    );

    if !quiet {
        print_statistics(&CrawlStatistics::from_report(&report));
    }

    write_report(&report, format, &output_path)
}

fn write_report(report: &CrawlReport, format: ExportFormat, path: &Path) -> anyhow::Result<()> {
    export(report, format, path)
        .with_context(|| format!("writing {} report to {}", format, path.display()))?;
    println!("\n✓ Report written to: {}", path.display());
    Ok(())
}
