//! Sitemap discovery
//!
//! Probes well-known sitemap locations on the seed's origin, follows sitemap
//! indexes a few levels deep and returns the in-scope page URLs.

use crate::url::{has_media_extension, is_within_scope};
use quick_xml::events::Event;
use quick_xml::Reader;
use reqwest::header::CONTENT_TYPE;
use reqwest::Client;
use std::collections::{HashSet, VecDeque};
use thiserror::Error;
use url::Url;

/// Locations probed in order, relative to the site root
pub const SITEMAP_LOCATIONS: &[&str] = &[
    "sitemap_index.xml",
    "sitemap.xml",
    "sitemap1.xml",
    "sitemap-index.xml",
    "sitemapindex.xml",
    "wp-sitemap.xml",
    "post-sitemap.xml",
    "page-sitemap.xml",
];

/// Nesting depth of sitemap indexes that is followed
const MAX_SITEMAP_DEPTH: u32 = 3;

#[derive(Debug, Error)]
pub enum SitemapError {
    #[error("XML error: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("document is neither a urlset nor a sitemapindex")]
    NotASitemap,
}

/// A parsed sitemap document
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SitemapDocument {
    /// `<urlset>`: page locations
    UrlSet(Vec<String>),
    /// `<sitemapindex>`: locations of further sitemaps
    Index(Vec<String>),
}

/// Parses a sitemap, returning the `<loc>` values of its entries
///
/// Only `<loc>` elements directly inside `<url>` or `<sitemap>` count, so
/// extension tags such as `<image:loc>` are ignored.
pub fn parse_sitemap(xml: &str) -> Result<SitemapDocument, SitemapError> {
    let mut reader = Reader::from_str(xml);
    let mut is_index = None;
    let mut in_entry = false;
    let mut in_loc = false;
    let mut current = String::new();
    let mut locs = Vec::new();

    loop {
        match reader.read_event()? {
            Event::Start(e) => match e.name().as_ref() {
                b"urlset" if is_index.is_none() => is_index = Some(false),
                b"sitemapindex" if is_index.is_none() => is_index = Some(true),
                b"url" | b"sitemap" => in_entry = true,
                b"loc" if in_entry => {
                    in_loc = true;
                    current.clear();
                }
                _ => {}
            },
            Event::Text(e) if in_loc => current.push_str(&e.unescape()?),
            Event::CData(e) if in_loc => {
                current.push_str(&String::from_utf8_lossy(&e.into_inner()))
            }
            Event::End(e) => match e.name().as_ref() {
                b"loc" if in_loc => {
                    in_loc = false;
                    let loc = current.trim();
                    if !loc.is_empty() {
                        locs.push(loc.to_string());
                    }
                }
                b"url" | b"sitemap" => in_entry = false,
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
    }

    match is_index {
        Some(true) => Ok(SitemapDocument::Index(locs)),
        Some(false) => Ok(SitemapDocument::UrlSet(locs)),
        None => Err(SitemapError::NotASitemap),
    }
}

/// Fetches a sitemap body, or None if the response is not a sitemap
async fn fetch_sitemap(client: &Client, url: &Url) -> Option<String> {
    let response = match client.get(url.as_str()).send().await {
        Ok(response) => response,
        Err(e) => {
            tracing::debug!("Sitemap probe {} failed: {}", url, e);
            return None;
        }
    };

    if !response.status().is_success() {
        tracing::debug!("Sitemap probe {} returned {}", url, response.status());
        return None;
    }

    let declared_xml = response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map_or(false, |ct| ct.to_ascii_lowercase().contains("xml"));
    let body = response.text().await.ok()?;

    if declared_xml || body.contains("<urlset") || body.contains("<sitemapindex") {
        Some(body)
    } else {
        None
    }
}

/// Collects page URLs from the first usable sitemap location of `base`
///
/// Returns an empty list when no location yields in-scope URLs, which tells
/// the caller to seed the base URL instead.
pub async fn discover_sitemap_urls(client: &Client, base: &Url) -> Vec<Url> {
    for location in SITEMAP_LOCATIONS {
        let Ok(sitemap_url) = base.join(&format!("/{}", location)) else {
            continue;
        };

        let urls = collect_from(client, sitemap_url.clone(), base).await;
        if !urls.is_empty() {
            tracing::info!("Sitemap {} lists {} URLs", sitemap_url, urls.len());
            return urls;
        }
    }

    tracing::info!("No sitemap found for {}", base);
    Vec::new()
}

/// Walks a sitemap and its nested indexes breadth-first
async fn collect_from(client: &Client, root: Url, base: &Url) -> Vec<Url> {
    let mut queue = VecDeque::from([(root.clone(), 0u32)]);
    let mut visited_sitemaps = HashSet::from([root.to_string()]);
    let mut seen_pages = HashSet::new();
    let mut pages = Vec::new();

    while let Some((sitemap_url, depth)) = queue.pop_front() {
        let Some(body) = fetch_sitemap(client, &sitemap_url).await else {
            continue;
        };

        match parse_sitemap(&body) {
            Ok(SitemapDocument::Index(children)) => {
                if depth >= MAX_SITEMAP_DEPTH {
                    tracing::warn!("Sitemap index {} nested too deep, ignoring", sitemap_url);
                    continue;
                }
                for child in children {
                    match Url::parse(&child) {
                        Ok(child) if visited_sitemaps.insert(child.to_string()) => {
                            queue.push_back((child, depth + 1));
                        }
                        Ok(_) => {}
                        Err(e) => tracing::debug!("Bad sitemap location {}: {}", child, e),
                    }
                }
            }
            Ok(SitemapDocument::UrlSet(locs)) => {
                for loc in locs {
                    let Ok(page) = Url::parse(&loc) else {
                        continue;
                    };
                    if is_within_scope(&page, base)
                        && !has_media_extension(&page)
                        && seen_pages.insert(page.to_string())
                    {
                        pages.push(page);
                    }
                }
            }
            Err(e) => tracing::debug!("Unparseable sitemap {}: {}", sitemap_url, e),
        }
    }

    pages
}
