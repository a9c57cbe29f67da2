/// Checks if a host matches a wildcard pattern
///
/// Two kinds of pattern are supported:
/// 1. Exact match: "tracker.com" matches only "tracker.com"
/// 2. Wildcard match: "*.tracker.com" matches "tracker.com" itself and any
///    subdomain such as "px.eu.tracker.com"
///
/// Comparison ignores ASCII case and any `:port` suffix on the candidate.
///
/// # Examples
///
/// ```
/// use wormcrawl::url::matches_wildcard;
///
/// assert!(matches_wildcard("*.doubleclick.net", "ad.doubleclick.net"));
/// assert!(matches_wildcard("*.doubleclick.net", "DoubleClick.net:443"));
/// assert!(!matches_wildcard("*.doubleclick.net", "notdoubleclick.net"));
/// ```
pub fn matches_wildcard(pattern: &str, candidate: &str) -> bool {
    let candidate = candidate
        .rsplit_once(':')
        .filter(|(_, port)| !port.is_empty() && port.chars().all(|c| c.is_ascii_digit()))
        .map_or(candidate, |(host, _)| host)
        .to_ascii_lowercase();
    let pattern = pattern.to_ascii_lowercase();

    match pattern.strip_prefix("*.") {
        Some(base) => candidate == base || candidate.ends_with(&format!(".{}", base)),
        None => candidate == pattern,
    }
}

/// Returns the first pattern in `patterns` that matches `candidate`
pub fn first_match<'a>(patterns: &'a [String], candidate: &str) -> Option<&'a str> {
    patterns
        .iter()
        .find(|pattern| matches_wildcard(pattern, candidate))
        .map(String::as_str)
}
