//! Configuration module for Seo-Ripple
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//!
//! # Example
//!
//! ```no_run
//! use seo_ripple::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("ripple.toml")).unwrap();
//! println!("Crawler will use max depth: {}", config.crawler.max_depth);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{Config, CrawlerConfig, OutputConfig};

// Re-export parser functions
pub use parser::{load_config, read_config};
pub use validation::validate;
