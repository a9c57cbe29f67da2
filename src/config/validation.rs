use crate::config::types::{
    Config, CrawlMode, CrawlOptions, CrawlerConfig, FetchConfig, RateLimitConfig,
    SuspiciousConfig,
};
use crate::ConfigError;

/// Upper bound on the worker pool ceiling
const MAX_CONCURRENCY_LIMIT: usize = 256;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_crawler_config(&config.crawler)?;
    validate_rate_limit_config(&config.rate_limit)?;
    validate_fetch_config(&config.fetch)?;
    validate_suspicious_config(&config.suspicious)?;

    if config.output.directory.is_empty() {
        return Err(ConfigError::Validation(
            "output directory cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// Validates the runtime options of a crawl, including the embedded config
///
/// A failure here is fatal: the crawl aborts before any worker starts.
pub fn validate_options(options: &CrawlOptions) -> Result<(), ConfigError> {
    validate(&options.config)?;

    let seed = &options.seed;
    if seed.scheme() != "http" && seed.scheme() != "https" {
        return Err(ConfigError::InvalidUrl(format!(
            "Seed URL '{}' must use http or https",
            seed
        )));
    }

    if seed.host_str().map_or(true, str::is_empty) {
        return Err(ConfigError::InvalidUrl(format!(
            "Seed URL '{}' has no host",
            seed
        )));
    }

    if options.mode == CrawlMode::Bounded && options.max_pages == Some(0) {
        return Err(ConfigError::Validation(
            "max_pages must be >= 1".to_string(),
        ));
    }

    if let Some(name) = &options.name {
        if name.is_empty() || name.contains(['/', '\\']) || name == ".." {
            return Err(ConfigError::Validation(format!(
                "output name '{}' must be a single directory name",
                name
            )));
        }
    }

    Ok(())
}

/// Validates crawler configuration
fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    if config.max_concurrency < 1 || config.max_concurrency > MAX_CONCURRENCY_LIMIT {
        return Err(ConfigError::Validation(format!(
            "max_concurrency must be between 1 and {}, got {}",
            MAX_CONCURRENCY_LIMIT, config.max_concurrency
        )));
    }

    if config.urls_per_worker < 1 {
        return Err(ConfigError::Validation(format!(
            "urls_per_worker must be >= 1, got {}",
            config.urls_per_worker
        )));
    }

    if config.progress_interval < 1 {
        return Err(ConfigError::Validation(
            "progress_interval must be >= 1".to_string(),
        ));
    }

    Ok(())
}

/// Validates the randomized delay range
fn validate_rate_limit_config(config: &RateLimitConfig) -> Result<(), ConfigError> {
    if config.min_delay_ms > config.max_delay_ms {
        return Err(ConfigError::Validation(format!(
            "min_delay_ms ({}) must not exceed max_delay_ms ({})",
            config.min_delay_ms, config.max_delay_ms
        )));
    }

    Ok(())
}

fn validate_fetch_config(config: &FetchConfig) -> Result<(), ConfigError> {
    if config.user_agent.trim().is_empty() {
        return Err(ConfigError::Validation(
            "user_agent cannot be empty".to_string(),
        ));
    }

    let token = config.robots_agent.as_str();
    let plain = token
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if token.is_empty() || !plain {
        return Err(ConfigError::Validation(format!(
            "robots_agent must be a plain product token, got {:?}",
            token
        )));
    }

    if config.timeout_secs == 0 || config.connect_timeout_secs == 0 {
        return Err(ConfigError::Validation(
            "timeouts must be at least one second".to_string(),
        ));
    }

    if config.max_retries < 1 {
        return Err(ConfigError::Validation(format!(
            "max_retries must be >= 1, got {}",
            config.max_retries
        )));
    }

    Ok(())
}

fn validate_suspicious_config(config: &SuspiciousConfig) -> Result<(), ConfigError> {
    for pattern in &config.tracker_patterns {
        validate_domain_pattern(pattern)?;
    }
    Ok(())
}

/// Validates a domain pattern (supports wildcards)
fn validate_domain_pattern(pattern: &str) -> Result<(), ConfigError> {
    if pattern.is_empty() {
        return Err(ConfigError::InvalidPattern(
            "Domain pattern cannot be empty".to_string(),
        ));
    }

    let domain = pattern.strip_prefix("*.").unwrap_or(pattern);
    validate_domain_string(domain)
}

/// Validates a domain string (without wildcard prefix)
fn validate_domain_string(domain: &str) -> Result<(), ConfigError> {
    if domain.is_empty() {
        return Err(ConfigError::InvalidPattern(
            "Domain cannot be empty".to_string(),
        ));
    }

    if !domain
        .chars()
        .all(|c| c.is_alphanumeric() || c == '.' || c == '-')
    {
        return Err(ConfigError::InvalidPattern(format!(
            "Domain '{}' contains invalid characters",
            domain
        )));
    }

    if domain.starts_with('.')
        || domain.ends_with('.')
        || domain.starts_with('-')
        || domain.ends_with('-')
    {
        return Err(ConfigError::InvalidPattern(format!(
            "Domain '{}' cannot start or end with '.' or '-'",
            domain
        )));
    }

    if domain.contains("..") {
        return Err(ConfigError::InvalidPattern(format!(
            "Domain '{}' cannot contain consecutive dots",
            domain
        )));
    }

    if !domain.contains('.') {
        return Err(ConfigError::InvalidPattern(format!(
            "Domain '{}' must contain at least one dot (e.g., 'example.com')",
            domain
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use url::Url;

    fn options(seed: &str) -> CrawlOptions {
        CrawlOptions::new(Url::parse(seed).unwrap())
    }

    #[test]
    fn test_validate_domain_pattern() {
        assert!(validate_domain_pattern("example.com").is_ok());
        assert!(validate_domain_pattern("*.example.com").is_ok());
        assert!(validate_domain_pattern("sub.example.com").is_ok());

        assert!(validate_domain_pattern("").is_err());
        assert!(validate_domain_pattern("*.").is_err());
        assert!(validate_domain_pattern("example").is_err());
        assert!(validate_domain_pattern(".example.com").is_err());
        assert!(validate_domain_pattern("example.com.").is_err());
    }

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate(&Config::default()).is_ok());
    }

    #[test]
    fn test_zero_concurrency_rejected() {
        let mut config = Config::default();
        config.crawler.max_concurrency = 0;
        assert!(matches!(validate(&config), Err(ConfigError::Validation(_))));
    }

    #[test]
    fn test_robots_agent_must_be_token() {
        let mut config = Config::default();
        config.fetch.robots_agent = "Mozilla/5.0 (X11)".to_string();
        assert!(matches!(validate(&config), Err(ConfigError::Validation(_))));

        config.fetch.robots_agent = "my-crawler".to_string();
        assert!(validate(&config).is_ok());
    }

    #[test]
    fn test_zero_delay_range_allowed() {
        let mut config = Config::default();
        config.rate_limit.min_delay_ms = 0;
        config.rate_limit.max_delay_ms = 0;
        assert!(validate(&config).is_ok());
    }

    #[test]
    fn test_non_http_seed_rejected() {
        let result = validate_options(&options("ftp://example.com/"));
        assert!(matches!(result, Err(ConfigError::InvalidUrl(_))));
    }

    #[test]
    fn test_seed_without_host_rejected() {
        let result = validate_options(&options("file:///tmp/index.html"));
        assert!(result.is_err());
    }

    #[test]
    fn test_zero_page_bound_rejected() {
        let mut opts = options("https://example.com/");
        opts.max_pages = Some(0);
        assert!(validate_options(&opts).is_err());
    }

    #[test]
    fn test_output_name_must_be_plain() {
        let mut opts = options("https://example.com/");
        opts.name = Some("../escape".to_string());
        assert!(validate_options(&opts).is_err());

        opts.name = Some("example-run".to_string());
        assert!(validate_options(&opts).is_ok());
    }
}
