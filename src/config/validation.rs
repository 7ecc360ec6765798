use crate::config::types::{Config, CrawlerConfig, OutputConfig};
use crate::output::ExportFormat;
use crate::url::normalize_start_url;
use crate::ConfigError;

/// Validates the entire configuration
///
/// Runs once before a crawl starts; the crawler never re-checks these bounds.
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_crawler_config(&config.crawler)?;
    validate_output_config(&config.output)?;
    Ok(())
}

/// Validates crawler configuration
fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    // max_depth >= 0 is always true for u32, negative values fail to deserialize

    if config.start_url.trim().is_empty() {
        return Err(ConfigError::Validation(
            "start_url cannot be empty".to_string(),
        ));
    }

    normalize_start_url(&config.start_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid start_url: {}", e)))?;

    if config.max_pages < 1 {
        return Err(ConfigError::Validation(format!(
            "max_pages must be >= 1, got {}",
            config.max_pages
        )));
    }

    if config.workers < 1 {
        return Err(ConfigError::Validation(format!(
            "workers must be >= 1, got {}",
            config.workers
        )));
    }

    if config.timeout_secs < 1 {
        return Err(ConfigError::Validation(format!(
            "timeout_secs must be >= 1, got {}",
            config.timeout_secs
        )));
    }

    if config.user_agent.trim().is_empty() {
        return Err(ConfigError::Validation(
            "user_agent cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// Validates export configuration
fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    if config.format.parse::<ExportFormat>().is_err() {
        return Err(ConfigError::Validation(format!(
            "unsupported export format '{}', expected one of: {}",
            config.format,
            ExportFormat::NAMES.join(", ")
        )));
    }

    if config.path.trim().is_empty() {
        return Err(ConfigError::Validation(
            "output path cannot be empty".to_string(),
        ));
    }

    Ok(())
}
