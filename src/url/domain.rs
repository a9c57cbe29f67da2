use url::Url;

/// Extracts the domain from a URL
///
/// This function retrieves the host portion of a URL and converts it to lowercase.
/// A non-default port is kept, since the rate limiter treats `host:port`
/// as its own origin.
///
/// # Arguments
///
/// * `url` - The URL to extract the domain from
///
/// # Returns
///
/// * `Some(String)` - The lowercase domain/host
/// * `None` - If the URL has no host
///
/// # Examples
///
/// ```
/// use url::Url;
/// use wormcrawl::url::extract_domain;
///
/// let url = Url::parse("https://EXAMPLE.COM/path").unwrap();
/// assert_eq!(extract_domain(&url), Some("example.com".to_string()));
///
/// let url = Url::parse("http://127.0.0.1:8080/").unwrap();
/// assert_eq!(extract_domain(&url), Some("127.0.0.1:8080".to_string()));
/// ```
pub fn extract_domain(url: &Url) -> Option<String> {
    let host = url.host_str()?.to_lowercase();
    match url.port() {
        Some(port) => Some(format!("{}:{}", host, port)),
        None => Some(host),
    }
}

/// Host used for scope comparison: lowercase, without a leading `www.`
fn scope_host(url: &Url) -> Option<String> {
    let domain = extract_domain(url)?;
    Some(match domain.strip_prefix("www.") {
        Some(rest) => rest.to_string(),
        None => domain,
    })
}

/// Checks whether a URL stays inside the crawl scope rooted at `base`
///
/// A URL is in scope when it is served from the same host (ignoring case and
/// a `www.` prefix) and its path lies under the base path.
///
/// # Examples
///
/// ```
/// use url::Url;
/// use wormcrawl::url::is_within_scope;
///
/// let base = Url::parse("https://example.com/docs").unwrap();
/// assert!(is_within_scope(&Url::parse("https://www.example.com/docs/intro").unwrap(), &base));
/// assert!(!is_within_scope(&Url::parse("https://example.com/blog").unwrap(), &base));
/// ```
pub fn is_within_scope(url: &Url, base: &Url) -> bool {
    if scope_host(url).is_none() || scope_host(url) != scope_host(base) {
        return false;
    }

    let base_path = base.path().trim_end_matches('/');
    if base_path.is_empty() {
        return true;
    }

    let path = url.path();
    path == base_path
        || path
            .strip_prefix(base_path)
            .map_or(false, |rest| rest.starts_with('/'))
}
