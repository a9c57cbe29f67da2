//! Output handler trait and the record it writes

use crate::extract::ContentKind;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use thiserror::Error;

/// Errors that can occur during output operations
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("Failed to write output: {0}")]
    Write(String),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for output operations
pub type OutputResult<T> = Result<T, OutputError>;

/// File format of the crawl output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    Csv,
    /// One JSON object per line
    #[default]
    Json,
}

impl OutputFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Csv => "csv",
            OutputFormat::Json => "jsonl",
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputFormat::Csv => f.write_str("csv"),
            OutputFormat::Json => f.write_str("json"),
        }
    }
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "csv" => Ok(OutputFormat::Csv),
            "json" | "jsonl" => Ok(OutputFormat::Json),
            other => Err(format!("unknown output format '{}' (expected csv or json)", other)),
        }
    }
}

/// How a page body was obtained
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FetchMethod {
    Http,
    Browser,
}

/// One successfully fetched and extracted page
#[derive(Debug, Clone, Serialize)]
pub struct PageResult {
    pub url: String,
    pub kind: ContentKind,
    pub title: Option<String>,
    pub content: String,

    /// Outbound links as extracted, before scope and seen-set filtering
    pub discovered_urls: Vec<String>,

    pub metadata: BTreeMap<String, String>,
    pub depth: u32,
    pub fetched_with: FetchMethod,
}

/// Trait for output writers
///
/// Each record is expected to be durable once `write_page` returns, so an
/// interrupted crawl still leaves every completed page on disk.
pub trait OutputHandler: Send {
    /// Appends one page record
    fn write_page(&mut self, page: &PageResult) -> OutputResult<()>;

    /// Flushes and closes the output
    fn finish(&mut self) -> OutputResult<()>;

    /// Location of the output file
    fn path(&self) -> &Path;
}
