//! Configuration module for Wormcrawl
//!
//! This module handles loading, parsing, and validating the optional TOML
//! configuration file, and the runtime options assembled from it and the CLI.
//!
//! # Example
//!
//! ```no_run
//! use wormcrawl::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("wormcrawl.toml")).unwrap();
//! println!("Crawler will use up to {} workers", config.crawler.max_concurrency);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    Config, CrawlMode, CrawlOptions, CrawlerConfig, FetchConfig, FetchStrategy, OutputConfig,
    RateLimitConfig, SuspiciousConfig,
};

// Re-export parser functions
pub use parser::{compute_config_hash, load_config, load_config_with_hash, parse_config};
pub use validation::{validate, validate_options};
