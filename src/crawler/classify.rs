//! Resource classification
//!
//! Two deterministic decisions: [`screen_url`] runs before any request and
//! can skip a URL outright, [`classify_response`] runs on the fetched bytes.

use crate::config::SuspiciousConfig;
use crate::extract::ContentKind;
use crate::url::{first_match, has_media_extension};
use url::Url;

/// Leading bytes of every PDF file
const PDF_MAGIC: &[u8] = b"%PDF-";

/// Why a URL is skipped before fetching
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Skip {
    pub kind: ContentKind,
    pub reason: String,
}

impl Skip {
    fn suspicious(reason: String) -> Self {
        Self {
            kind: ContentKind::Suspicious,
            reason,
        }
    }
}

/// Screens a URL before fetching
///
/// Returns `Some(Skip)` for suspicious URLs (non-http scheme, overlong query,
/// gallery/item viewer parameters, tracker hosts) and for URLs whose
/// extension marks them as images or other media.
pub fn screen_url(url: &Url, config: &SuspiciousConfig) -> Option<Skip> {
    if url.scheme() != "http" && url.scheme() != "https" {
        return Some(Skip::suspicious(format!("unsupported scheme {}", url.scheme())));
    }

    if let Some(query) = url.query() {
        if query.len() > config.max_query_length {
            return Some(Skip::suspicious(format!(
                "query string of {} bytes",
                query.len()
            )));
        }

        if let Some((param, _)) = url.query_pairs().find(|(key, _)| {
            config
                .blocked_params
                .iter()
                .any(|blocked| blocked.eq_ignore_ascii_case(key))
        }) {
            return Some(Skip::suspicious(format!("blocked parameter {}", param)));
        }
    }

    if let Some(host) = url.host_str() {
        if let Some(pattern) = first_match(&config.tracker_patterns, host) {
            return Some(Skip::suspicious(format!("tracker host matching {}", pattern)));
        }
    }

    if has_media_extension(url) {
        return Some(Skip {
            kind: ContentKind::Image,
            reason: "media file extension".to_string(),
        });
    }

    None
}

/// Classifies a fetched resource
///
/// In order: image/media by content-type or extension, PDF by content-type
/// or magic bytes (declared types are not trusted), HTML otherwise.
pub fn classify_response(url: &Url, content_type: Option<&str>, body: &[u8]) -> ContentKind {
    let content_type = content_type
        .map(|ct| ct.split(';').next().unwrap_or("").trim().to_ascii_lowercase())
        .unwrap_or_default();

    let media_type = ["image/", "video/", "audio/"]
        .iter()
        .any(|prefix| content_type.starts_with(prefix));
    if media_type || has_media_extension(url) {
        return ContentKind::Image;
    }

    if content_type == "application/pdf" || is_pdf(body) {
        return ContentKind::Pdf;
    }

    ContentKind::Html
}

/// Sniffs the PDF signature, tolerating leading whitespace
fn is_pdf(body: &[u8]) -> bool {
    let start = body
        .iter()
        .position(|b| !b.is_ascii_whitespace())
        .unwrap_or(body.len());
    body[start..].starts_with(PDF_MAGIC)
}
