//! Content extraction
//!
//! Turns a fetched body into readable text, metadata and outbound links.
//! The dispatcher only depends on the [`ContentExtractor`] trait; the default
//! implementation handles HTML with `scraper` and PDF with `pdf-extract`.

mod html;
mod pdf;

pub use html::extract_html;
pub use pdf::extract_pdf;

use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;
use url::Url;

/// Kind of resource decided by classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentKind {
    Html,
    Pdf,
    Image,
    Suspicious,
}

impl ContentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentKind::Html => "html",
            ContentKind::Pdf => "pdf",
            ContentKind::Image => "image",
            ContentKind::Suspicious => "suspicious",
        }
    }
}

impl fmt::Display for ContentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors raised while extracting a document
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("corrupt {kind} document: {message}")]
    Corrupt { kind: ContentKind, message: String },

    #[error("{0} content is not extractable")]
    Unsupported(ContentKind),
}

/// Text, metadata and links pulled out of one document
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExtractedContent {
    pub title: Option<String>,

    /// Visible text, one non-empty line per block
    pub text: String,

    /// `<meta name|property>` values (HTML only)
    pub metadata: BTreeMap<String, String>,

    /// Absolute outbound links, deduplicated in document order
    pub links: Vec<Url>,
}

/// Extraction collaborator used by the dispatcher
///
/// Implementations must be deterministic and must not panic on hostile
/// input where it can be avoided; failures are returned as [`ExtractError`]
/// and recorded as a failed outcome for the URL.
pub trait ContentExtractor: Send + Sync {
    fn extract(
        &self,
        body: &[u8],
        kind: ContentKind,
        base_url: &Url,
    ) -> Result<ExtractedContent, ExtractError>;
}

/// Extractor backed by `scraper` for HTML and `pdf-extract` for PDF
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultExtractor;

impl ContentExtractor for DefaultExtractor {
    fn extract(
        &self,
        body: &[u8],
        kind: ContentKind,
        base_url: &Url,
    ) -> Result<ExtractedContent, ExtractError> {
        match kind {
            ContentKind::Html => Ok(extract_html(&String::from_utf8_lossy(body), base_url)),
            ContentKind::Pdf => extract_pdf(body),
            other => Err(ExtractError::Unsupported(other)),
        }
    }
}

/// Collapses runs of whitespace inside each line and drops empty lines
pub(crate) fn collapse_lines(raw: &str) -> String {
    raw.lines()
        .map(|line| line.split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}
