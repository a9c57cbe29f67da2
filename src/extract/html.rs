//! HTML text, metadata and link extraction

use crate::extract::{collapse_lines, ExtractedContent};
use scraper::{ElementRef, Html, Node, Selector};
use std::collections::{BTreeMap, HashSet};
use url::Url;

/// Elements whose content never counts as visible text
const SKIPPED_ELEMENTS: &[&str] = &[
    "script", "style", "noscript", "nav", "header", "footer", "aside", "template", "svg",
    "iframe", "head",
];

/// Elements that start a new line of text
const BLOCK_ELEMENTS: &[&str] = &[
    "p", "div", "br", "li", "ul", "ol", "h1", "h2", "h3", "h4", "h5", "h6", "tr", "td", "th",
    "table", "section", "article", "main", "blockquote", "pre", "dd", "dt", "form",
];

/// Extracts title, metadata, visible text and links from an HTML document
///
/// # Link Extraction Rules
///
/// **Include:**
/// - `<a href="...">` tags anywhere in the document
/// - `<link rel="canonical" href="...">`
///
/// **Exclude:**
/// - `<a href="..." download>`
/// - `javascript:`, `mailto:`, `tel:` and `data:` links
/// - Fragment-only links
///
/// Links are resolved against `base_url`, stripped of their fragment and
/// deduplicated in document order. `rel="nofollow"` links are kept.
///
/// # Example
///
/// ```
/// use wormcrawl::extract::extract_html;
/// use url::Url;
///
/// let html = r#"<html><head><title>Test</title></head><body><a href="/page">Link</a></body></html>"#;
/// let base_url = Url::parse("https://example.com/").unwrap();
/// let content = extract_html(html, &base_url);
/// assert_eq!(content.title, Some("Test".to_string()));
/// assert_eq!(content.links[0].as_str(), "https://example.com/page");
/// ```
pub fn extract_html(html: &str, base_url: &Url) -> ExtractedContent {
    let document = Html::parse_document(html);

    ExtractedContent {
        title: extract_title(&document),
        text: extract_text(&document),
        metadata: extract_metadata(&document),
        links: extract_links(&document, base_url),
    }
}

fn extract_title(document: &Html) -> Option<String> {
    let title_selector = Selector::parse("title").ok()?;

    document
        .select(&title_selector)
        .next()
        .map(|element| element.text().collect::<String>().trim().to_string())
        .filter(|s| !s.is_empty())
}

fn extract_metadata(document: &Html) -> BTreeMap<String, String> {
    let mut metadata = BTreeMap::new();
    let Ok(selector) = Selector::parse("meta[content]") else {
        return metadata;
    };

    for element in document.select(&selector) {
        let attrs = element.value();
        let key = attrs.attr("name").or_else(|| attrs.attr("property"));
        if let (Some(key), Some(content)) = (key, attrs.attr("content")) {
            let content = content.trim();
            if !key.is_empty() && !content.is_empty() {
                metadata
                    .entry(key.to_lowercase())
                    .or_insert_with(|| content.to_string());
            }
        }
    }

    metadata
}

fn extract_text(document: &Html) -> String {
    let mut raw = String::new();
    collect_text(document.root_element(), &mut raw);
    collapse_lines(&raw)
}

/// Walks the tree with an explicit stack so nesting depth cannot exhaust
/// the thread stack
fn collect_text(root: ElementRef<'_>, out: &mut String) {
    enum Frame<'a> {
        Enter(ElementRef<'a>),
        Text(&'a str),
        Newline,
    }

    let mut stack = vec![Frame::Enter(root)];
    while let Some(frame) = stack.pop() {
        let element = match frame {
            Frame::Text(text) => {
                out.push_str(text);
                continue;
            }
            Frame::Newline => {
                out.push('\n');
                continue;
            }
            Frame::Enter(element) => element,
        };

        if BLOCK_ELEMENTS.contains(&element.value().name()) {
            out.push('\n');
            stack.push(Frame::Newline);
        }

        let children: Vec<Frame<'_>> = element
            .children()
            .filter_map(|child| match child.value() {
                Node::Text(text) => Some(Frame::Text(&**text)),
                Node::Element(_) => ElementRef::wrap(child)
                    .filter(|element| !is_hidden(*element))
                    .map(Frame::Enter),
                _ => None,
            })
            .collect();
        stack.extend(children.into_iter().rev());
    }
}

/// Whether an element is excluded from visible text
fn is_hidden(element: ElementRef<'_>) -> bool {
    let value = element.value();
    if SKIPPED_ELEMENTS.contains(&value.name()) || value.attr("hidden").is_some() {
        return true;
    }

    if value.classes().any(|class| class == "hidden") {
        return true;
    }

    value.attr("style").map_or(false, |style| {
        let compact: String = style.chars().filter(|c| !c.is_whitespace()).collect();
        compact.to_ascii_lowercase().contains("display:none")
    })
}

fn extract_links(document: &Html, base_url: &Url) -> Vec<Url> {
    let mut seen = HashSet::new();
    let mut links = Vec::new();

    let mut push = |href: &str| {
        if let Some(url) = resolve_link(href, base_url) {
            if seen.insert(url.as_str().to_string()) {
                links.push(url);
            }
        }
    };

    if let Ok(a_selector) = Selector::parse("a[href]") {
        for element in document.select(&a_selector) {
            if element.value().attr("download").is_some() {
                continue;
            }
            if let Some(href) = element.value().attr("href") {
                push(href);
            }
        }
    }

    if let Ok(canonical_selector) = Selector::parse("link[rel='canonical'][href]") {
        for element in document.select(&canonical_selector) {
            if let Some(href) = element.value().attr("href") {
                push(href);
            }
        }
    }

    links
}

/// Resolves a link href to an absolute http(s) URL without fragment
///
/// Returns None for special schemes, fragment-only and unparseable links.
fn resolve_link(href: &str, base_url: &Url) -> Option<Url> {
    let href = href.trim();
    if href.is_empty() || href.starts_with('#') {
        return None;
    }

    let lowered = href.to_ascii_lowercase();
    if ["javascript:", "mailto:", "tel:", "data:"]
        .iter()
        .any(|scheme| lowered.starts_with(scheme))
    {
        return None;
    }

    let mut absolute = base_url.join(href).ok()?;
    if absolute.scheme() != "http" && absolute.scheme() != "https" {
        return None;
    }
    absolute.set_fragment(None);
    Some(absolute)
}
