//! URL handling module for Wormcrawl
//!
//! This module provides URL normalization (the frontier's dedup key), host
//! extraction, crawl-scope checks and wildcard host matching.

mod domain;
mod matcher;
mod normalize;

pub use domain::{extract_domain, is_within_scope};
pub use matcher::{first_match, matches_wildcard};
pub use normalize::normalize_url;

use url::Url;

/// File extensions of media that is never worth extracting text from
const MEDIA_EXTENSIONS: &[&str] = &[
    "jpg", "jpeg", "png", "gif", "bmp", "svg", "webp", "ico", "tif", "tiff", "avif", "mp3",
    "mp4", "wav", "avi", "mov", "webm", "ogg",
];

/// Returns the lowercase extension of the last path segment, if any
pub fn path_extension(url: &Url) -> Option<String> {
    let segment = url.path_segments()?.last()?;
    let (stem, ext) = segment.rsplit_once('.')?;
    if stem.is_empty() || ext.is_empty() {
        return None;
    }
    Some(ext.to_ascii_lowercase())
}

/// Checks whether the URL path ends in an image or other media extension
///
/// # Examples
///
/// ```
/// use url::Url;
/// use wormcrawl::url::has_media_extension;
///
/// assert!(has_media_extension(&Url::parse("https://example.com/logo.PNG").unwrap()));
/// assert!(!has_media_extension(&Url::parse("https://example.com/about").unwrap()));
/// ```
pub fn has_media_extension(url: &Url) -> bool {
    path_extension(url).map_or(false, |ext| MEDIA_EXTENSIONS.contains(&ext.as_str()))
}
