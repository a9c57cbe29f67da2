//! Wormcrawl: a polite single-process website crawler
//!
//! This crate crawls a website from a seed URL, discovers pages through
//! sitemaps or hyperlink extraction, classifies every fetched resource
//! (HTML, PDF, image or suspicious) and emits the extracted text plus the
//! discovered links of each page.

pub mod config;
pub mod crawler;
pub mod extract;
pub mod output;
pub mod robots;
pub mod state;
pub mod url;

use thiserror::Error;

/// Main error type for Wormcrawl operations
///
/// Only fatal conditions travel through this type. A single URL that cannot
/// be fetched or parsed is recorded as a failed frontier outcome instead.
#[derive(Debug, Error)]
pub enum WormError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("URL error: {0}")]
    UrlError(#[from] UrlError),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] ::url::ParseError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("Output error: {0}")]
    Output(#[from] output::OutputError),

    #[error("No usable fetch strategy: {0}")]
    NoFetchStrategy(String),

    #[error("Seed URL could not be reached: {url}")]
    SeedUnreachable { url: String },

    #[error("Worker task failed: {0}")]
    Worker(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),

    #[error("Invalid domain pattern: {0}")]
    InvalidPattern(String),
}

/// URL-specific errors
#[derive(Debug, Error)]
pub enum UrlError {
    #[error("Failed to parse URL: {0}")]
    Parse(String),

    #[error("Invalid URL scheme: {0}")]
    InvalidScheme(String),

    #[error("Missing domain in URL")]
    MissingDomain,

    #[error("Malformed URL: {0}")]
    Malformed(String),
}

/// Result type alias for Wormcrawl operations
pub type Result<T> = std::result::Result<T, WormError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for URL operations
pub type UrlResult<T> = std::result::Result<T, UrlError>;

// Re-export commonly used types
pub use config::{Config, CrawlMode, CrawlOptions, FetchStrategy};
pub use crawler::{Coordinator, Frontier, Outcome, UrlRecord};
pub use extract::ContentKind;
pub use output::{CrawlReport, OutputFormat, PageResult};
pub use state::UrlState;
pub use url::{extract_domain, normalize_url};
