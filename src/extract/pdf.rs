use crate::extract::{collapse_lines, ContentKind, ExtractError, ExtractedContent};
use std::panic;

/// Extracts the text of every page of a PDF document
///
/// PDFs carry no links the crawler follows, so `links` is always empty.
/// `pdf-extract` panics on some malformed files; those panics are caught and
/// reported as a corrupt document.
pub fn extract_pdf(body: &[u8]) -> Result<ExtractedContent, ExtractError> {
    let raw = panic::catch_unwind(|| pdf_extract::extract_text_from_mem(body))
        .map_err(|_| corrupt("parser panicked"))?
        .map_err(|e| corrupt(&e.to_string()))?;

    Ok(ExtractedContent {
        title: None,
        text: collapse_lines(&raw),
        ..Default::default()
    })
}

fn corrupt(message: &str) -> ExtractError {
    ExtractError::Corrupt {
        kind: ContentKind::Pdf,
        message: message.to_string(),
    }
}
