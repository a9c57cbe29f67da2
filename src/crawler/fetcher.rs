//! HTTP fetcher implementation
//!
//! This module handles all plain HTTP requests for the crawler, including:
//! - Building the HTTP client with browser-like headers
//! - GET requests with redirect following
//! - Retry with exponential backoff for transient failures, every attempt
//!   paced by the per-host rate limiter
//! - Error classification

use crate::config::FetchConfig;
use crate::crawler::rate_limiter::RateLimiter;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, CONTENT_TYPE};
use reqwest::{redirect::Policy, Client};
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// Redirect hops followed before giving up
const MAX_REDIRECTS: usize = 10;

/// A successfully fetched resource
#[derive(Debug, Clone)]
pub struct FetchedResource {
    /// Final URL after redirects
    pub final_url: Url,
    pub status: u16,
    pub content_type: Option<String>,
    pub body: Vec<u8>,
}

/// Why a fetch failed
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("HTTP {status}")]
    Status { status: u16 },

    #[error("request timed out")]
    Timeout,

    #[error("connection failed: {0}")]
    Connect(String),

    #[error("request failed: {0}")]
    Request(String),
}

impl FetchError {
    pub fn status(&self) -> Option<u16> {
        match self {
            FetchError::Status { status } => Some(*status),
            _ => None,
        }
    }

    /// Responses typical of bot protection, worth retrying with a browser
    pub fn is_anti_bot(&self) -> bool {
        matches!(self.status(), Some(403 | 429 | 503))
    }

    /// Whether another attempt may succeed
    ///
    /// | Condition | Retried |
    /// |-----------|---------|
    /// | Timeout, connection error | yes |
    /// | HTTP 5xx | yes |
    /// | HTTP 403, 429 | yes |
    /// | Other 4xx | no |
    pub fn is_retryable(&self) -> bool {
        match self {
            FetchError::Timeout | FetchError::Connect(_) | FetchError::Request(_) => true,
            FetchError::Status { status } => *status >= 500 || matches!(status, 403 | 429),
        }
    }
}

impl From<reqwest::Error> for FetchError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            FetchError::Timeout
        } else if e.is_connect() {
            FetchError::Connect(e.to_string())
        } else if let Some(status) = e.status() {
            FetchError::Status {
                status: status.as_u16(),
            }
        } else {
            FetchError::Request(e.to_string())
        }
    }
}

/// Builds the HTTP client used for pages, robots.txt and sitemaps
///
/// # Example
///
/// ```
/// use wormcrawl::config::FetchConfig;
/// use wormcrawl::crawler::build_http_client;
///
/// let client = build_http_client(&FetchConfig::default()).unwrap();
/// ```
pub fn build_http_client(config: &FetchConfig) -> Result<Client, reqwest::Error> {
    let mut headers = HeaderMap::new();
    headers.insert(
        ACCEPT,
        HeaderValue::from_static(
            "text/html,application/xhtml+xml,application/xml;q=0.9,application/pdf,*/*;q=0.8",
        ),
    );
    headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.9"));

    Client::builder()
        .user_agent(config.user_agent.as_str())
        .default_headers(headers)
        .timeout(Duration::from_secs(config.timeout_secs))
        .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
        .redirect(Policy::limited(MAX_REDIRECTS))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Fetches a URL, retrying transient failures
///
/// Makes up to `config.max_retries` attempts. Each attempt first waits for
/// `limiter` to grant a request to `host`; on top of that the wait before the
/// second attempt is `initial_retry_delay_ms` and doubles on every further
/// one. A 429 marks the host throttled before the next attempt is paced.
pub async fn fetch_url(
    client: &Client,
    url: &Url,
    config: &FetchConfig,
    limiter: &RateLimiter,
    host: &str,
) -> Result<FetchedResource, FetchError> {
    let attempts = config.max_retries.max(1);
    let mut delay = Duration::from_millis(config.initial_retry_delay_ms);
    let mut attempt = 1;

    loop {
        limiter.acquire(host).await;
        let err = match fetch_once(client, url).await {
            Ok(resource) => return Ok(resource),
            Err(e) => e,
        };

        if err.status() == Some(429) {
            limiter.mark_throttled(host).await;
        }
        if !err.is_retryable() || attempt >= attempts {
            return Err(err);
        }

        tracing::debug!(
            "Attempt {}/{} for {} failed ({}), retrying in {:?}",
            attempt,
            attempts,
            url,
            err,
            delay
        );
        tokio::time::sleep(delay).await;
        delay *= 2;
        attempt += 1;
    }
}

async fn fetch_once(client: &Client, url: &Url) -> Result<FetchedResource, FetchError> {
    let response = client.get(url.as_str()).send().await?;
    let status = response.status();

    if !status.is_success() {
        return Err(FetchError::Status {
            status: status.as_u16(),
        });
    }

    let final_url = response.url().clone();
    let content_type = response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    let body = response.bytes().await?.to_vec();

    Ok(FetchedResource {
        final_url,
        status: status.as_u16(),
        content_type,
        body,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn fast_config() -> FetchConfig {
        FetchConfig {
            max_retries: 3,
            initial_retry_delay_ms: 5,
            ..Default::default()
        }
    }

    fn unpaced() -> RateLimiter {
        RateLimiter::with_delays(Duration::ZERO, Duration::ZERO)
    }

    async fn get(url: &Url, limiter: &RateLimiter) -> Result<FetchedResource, FetchError> {
        let client = build_http_client(&fast_config()).unwrap();
        let host = url.host_str().unwrap_or_default().to_string();
        fetch_url(&client, url, &fast_config(), limiter, &host).await
    }

    #[test]
    fn test_build_http_client() {
        assert!(build_http_client(&FetchConfig::default()).is_ok());
    }

    #[test]
    fn test_retry_classification() {
        assert!(FetchError::Timeout.is_retryable());
        assert!(FetchError::Status { status: 502 }.is_retryable());
        assert!(FetchError::Status { status: 429 }.is_retryable());
        assert!(!FetchError::Status { status: 404 }.is_retryable());
        assert!(!FetchError::Status { status: 410 }.is_retryable());

        assert!(FetchError::Status { status: 403 }.is_anti_bot());
        assert!(FetchError::Status { status: 503 }.is_anti_bot());
        assert!(!FetchError::Status { status: 500 }.is_anti_bot());
    }

    #[tokio::test]
    async fn test_fetch_success_reports_content_type() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/page"))
            .respond_with(
                ResponseTemplate::new(200).set_body_raw("<html>hi</html>", "text/html"),
            )
            .mount(&server)
            .await;

        let url = Url::parse(&format!("{}/page", server.uri())).unwrap();
        let resource = get(&url, &unpaced()).await.unwrap();

        assert_eq!(resource.status, 200);
        assert_eq!(resource.body, b"<html>hi</html>");
        assert!(resource
            .content_type
            .as_deref()
            .map_or(false, |ct| ct.starts_with("text/html")));
    }

    #[tokio::test]
    async fn test_server_errors_are_retried() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/flaky"))
            .respond_with(ResponseTemplate::new(500))
            .expect(3)
            .mount(&server)
            .await;

        let url = Url::parse(&format!("{}/flaky", server.uri())).unwrap();
        let err = get(&url, &unpaced()).await.unwrap_err();

        assert_eq!(err.status(), Some(500));
    }

    #[tokio::test]
    async fn test_not_found_fails_immediately() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/gone"))
            .respond_with(ResponseTemplate::new(404))
            .expect(1)
            .mount(&server)
            .await;

        let url = Url::parse(&format!("{}/gone", server.uri())).unwrap();
        let err = get(&url, &unpaced()).await.unwrap_err();

        assert_eq!(err.status(), Some(404));
    }

    #[tokio::test]
    async fn test_redirects_are_followed() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/old"))
            .respond_with(
                ResponseTemplate::new(301).insert_header("location", "/new"),
            )
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/new"))
            .respond_with(ResponseTemplate::new(200).set_body_string("moved"))
            .mount(&server)
            .await;

        let url = Url::parse(&format!("{}/old", server.uri())).unwrap();
        let resource = get(&url, &unpaced()).await.unwrap();

        assert_eq!(resource.final_url.path(), "/new");
    }

    #[tokio::test]
    async fn test_retries_wait_for_rate_limiter() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/busy"))
            .respond_with(ResponseTemplate::new(503))
            .expect(3)
            .mount(&server)
            .await;

        let min = Duration::from_millis(150);
        let limiter = RateLimiter::with_delays(min, min);
        let url = Url::parse(&format!("{}/busy", server.uri())).unwrap();
        let host = url.host_str().unwrap().to_string();

        let started = Instant::now();
        let err = get(&url, &limiter).await.unwrap_err();

        assert_eq!(err.status(), Some(503));
        assert_eq!(limiter.request_count(&host).await, 3);
        // Three attempts on one host need two full politeness gaps
        assert!(started.elapsed() >= min * 2);
    }

    #[tokio::test]
    async fn test_too_many_requests_throttles_before_retry() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/slow-down"))
            .respond_with(ResponseTemplate::new(429))
            .expect(3)
            .mount(&server)
            .await;

        let min = Duration::from_millis(100);
        let limiter = RateLimiter::with_delays(min, min);
        let url = Url::parse(&format!("{}/slow-down", server.uri())).unwrap();

        let started = Instant::now();
        let err = get(&url, &limiter).await.unwrap_err();

        assert_eq!(err.status(), Some(429));
        // Both retries already run at the doubled delay
        assert!(started.elapsed() >= min * 4);
    }
}
