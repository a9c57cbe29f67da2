//! Fetch and classify dispatcher
//!
//! Takes one in-flight record to a terminal [`Outcome`]:
//!
//! 1. Screen the URL (suspicious or media: skipped without a request)
//! 2. Check robots.txt (disallowed: failed)
//! 3. Wait for the rate limiter, then fetch over HTTP or the renderer
//! 4. Classify the bytes (image: skipped, PDF or HTML: extracted)
//! 5. Hand the page to the output writer and return its links

use crate::config::{Config, FetchConfig, FetchStrategy, SuspiciousConfig};
use crate::crawler::classify::{classify_response, screen_url};
use crate::crawler::fetcher::{fetch_url, FetchError};
use crate::crawler::frontier::{Outcome, UrlRecord};
use crate::crawler::rate_limiter::RateLimiter;
use crate::crawler::renderer::Renderer;
use crate::crawler::scheduler::UrlHandler;
use crate::extract::{ContentExtractor, ContentKind, ExtractedContent};
use crate::output::{FetchMethod, PageResult};
use crate::robots::RobotsGuard;
use crate::state::SessionStats;
use async_trait::async_trait;
use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use url::Url;

/// Body obtained by one fetch path
struct Fetched {
    final_url: Url,
    content_type: Option<String>,
    body: Vec<u8>,
    method: FetchMethod,
}

pub struct Dispatcher {
    client: Client,
    fetch: FetchConfig,
    suspicious: SuspiciousConfig,
    strategy: FetchStrategy,
    renderer: Option<Arc<dyn Renderer>>,
    extractor: Arc<dyn ContentExtractor>,
    robots: RobotsGuard,
    limiter: Arc<RateLimiter>,
    stats: Arc<SessionStats>,
    output: mpsc::Sender<PageResult>,
}

impl Dispatcher {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        client: Client,
        config: &Config,
        strategy: FetchStrategy,
        renderer: Option<Arc<dyn Renderer>>,
        extractor: Arc<dyn ContentExtractor>,
        limiter: Arc<RateLimiter>,
        stats: Arc<SessionStats>,
        output: mpsc::Sender<PageResult>,
    ) -> Self {
        let robots = RobotsGuard::new(
            client.clone(),
            &config.fetch.robots_agent,
            config.crawler.respect_robots,
        );

        Self {
            client,
            fetch: config.fetch.clone(),
            suspicious: config.suspicious.clone(),
            strategy,
            renderer,
            extractor,
            robots,
            limiter,
            stats,
            output,
        }
    }

    fn render_timeout(&self) -> Duration {
        Duration::from_millis(self.fetch.render_timeout_ms)
    }

    fn fail(&self, url: &Url, reason: String) -> Outcome {
        tracing::warn!("Failed {}: {}", url, reason);
        Outcome::Failed { reason }
    }

    async fn dispatch(&self, record: &UrlRecord) -> Outcome {
        if let Some(skip) = screen_url(&record.url, &self.suspicious) {
            return Outcome::Skipped {
                kind: skip.kind,
                reason: skip.reason,
            };
        }

        let (allowed, crawl_delay) = self.robots.check(&record.host, &record.url).await;
        if !allowed {
            return self.fail(&record.url, "disallowed by robots.txt".to_string());
        }
        self.limiter.set_crawl_delay(&record.host, crawl_delay).await;

        let fetched = match self.fetch_resource(record).await {
            Ok(fetched) => fetched,
            Err(reason) => return self.fail(&record.url, reason),
        };

        let kind = classify_response(
            &fetched.final_url,
            fetched.content_type.as_deref(),
            &fetched.body,
        );
        if kind == ContentKind::Image {
            return Outcome::Skipped {
                kind,
                reason: "image content".to_string(),
            };
        }

        let (fetched, content) = match self.extract(record, fetched, kind).await {
            Ok(extracted) => extracted,
            Err(reason) => return self.fail(&record.url, reason),
        };

        self.stats.record_fetch(fetched.body.len());
        if fetched.method == FetchMethod::Browser {
            self.stats.record_render();
        }
        tracing::debug!(
            "Fetched {} ({}, {} bytes, {} links)",
            record.url,
            kind,
            fetched.body.len(),
            content.links.len()
        );

        let links = content.links.clone();
        let page = PageResult {
            url: record.url.to_string(),
            kind,
            title: content.title,
            content: content.text,
            discovered_urls: content.links.iter().map(Url::to_string).collect(),
            metadata: content.metadata,
            depth: record.depth,
            fetched_with: fetched.method,
        };
        if self.output.send(page).await.is_err() {
            tracing::warn!("Output writer closed, {} not written", record.url);
        }

        Outcome::Visited { kind, links }
    }

    /// Fetches the body following the configured strategy
    async fn fetch_resource(&self, record: &UrlRecord) -> Result<Fetched, String> {
        if self.strategy == FetchStrategy::Browser {
            return self.render(record).await;
        }

        let fetched = fetch_url(
            &self.client,
            &record.url,
            &self.fetch,
            &self.limiter,
            &record.host,
        )
        .await;
        match fetched {
            Ok(resource) => Ok(Fetched {
                final_url: resource.final_url,
                content_type: resource.content_type,
                body: resource.body,
                method: FetchMethod::Http,
            }),
            Err(e) => {
                if self.may_fall_back(&e) {
                    tracing::info!("{} answered {}, retrying in browser", record.url, e);
                    return self.render(record).await;
                }
                Err(e.to_string())
            }
        }
    }

    fn may_fall_back(&self, error: &FetchError) -> bool {
        self.strategy == FetchStrategy::Auto && self.renderer.is_some() && error.is_anti_bot()
    }

    async fn render(&self, record: &UrlRecord) -> Result<Fetched, String> {
        let Some(renderer) = &self.renderer else {
            return Err("no renderer available".to_string());
        };

        self.limiter.acquire(&record.host).await;
        let page = renderer
            .render(&record.url, self.render_timeout())
            .await
            .map_err(|e| e.to_string())?;

        Ok(Fetched {
            final_url: page.final_url,
            content_type: Some("text/html".to_string()),
            body: page.html.into_bytes(),
            method: FetchMethod::Browser,
        })
    }

    /// Extracts content, re-rendering HTML that looks script-generated
    async fn extract(
        &self,
        record: &UrlRecord,
        fetched: Fetched,
        kind: ContentKind,
    ) -> Result<(Fetched, ExtractedContent), String> {
        let (fetched, content) = self.run_extractor(fetched, kind).await?;

        let looks_dynamic = kind == ContentKind::Html
            && fetched.method == FetchMethod::Http
            && self.strategy == FetchStrategy::Auto
            && self.renderer.is_some()
            && content.text.chars().count() < self.fetch.dynamic_text_threshold;
        if !looks_dynamic {
            return Ok((fetched, content));
        }

        tracing::debug!(
            "{} has little visible text, rendering in browser",
            record.url
        );
        match self.render(record).await {
            Ok(rendered) => self.run_extractor(rendered, ContentKind::Html).await,
            Err(reason) => {
                tracing::debug!("Render of {} failed, keeping HTTP body: {}", record.url, reason);
                Ok((fetched, content))
            }
        }
    }

    /// Runs the extractor off the async threads
    async fn run_extractor(
        &self,
        fetched: Fetched,
        kind: ContentKind,
    ) -> Result<(Fetched, ExtractedContent), String> {
        let extractor = Arc::clone(&self.extractor);
        tokio::task::spawn_blocking(move || {
            let content = extractor.extract(&fetched.body, kind, &fetched.final_url);
            (fetched, content)
        })
        .await
        .map_err(|e| format!("extraction task failed: {}", e))
        .and_then(|(fetched, content)| {
            content
                .map(|content| (fetched, content))
                .map_err(|e| e.to_string())
        })
    }
}

#[async_trait]
impl UrlHandler for Dispatcher {
    async fn handle(&self, record: &UrlRecord) -> Outcome {
        self.dispatch(record).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crawler::fetcher::build_http_client;
    use crate::crawler::renderer::{RenderError, RenderedPage};
    use crate::extract::{DefaultExtractor, ExtractError};
    use crate::state::UrlState;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    /// Renderer that serves canned HTML and counts its calls
    struct StubRenderer {
        html: Option<String>,
        calls: AtomicUsize,
    }

    impl StubRenderer {
        fn serving(body: &str) -> Arc<Self> {
            Arc::new(Self {
                html: Some(page(body)),
                calls: AtomicUsize::new(0),
            })
        }

        fn broken() -> Arc<Self> {
            Arc::new(Self {
                html: None,
                calls: AtomicUsize::new(0),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl Renderer for StubRenderer {
        async fn render(&self, url: &Url, _timeout: Duration) -> Result<RenderedPage, RenderError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match &self.html {
                Some(html) => Ok(RenderedPage {
                    final_url: url.clone(),
                    html: html.clone(),
                }),
                None => Err(RenderError::Navigation("net::ERR_FAILED".to_string())),
            }
        }
    }

    struct CorruptExtractor;

    impl ContentExtractor for CorruptExtractor {
        fn extract(
            &self,
            _body: &[u8],
            kind: ContentKind,
            _base_url: &Url,
        ) -> Result<ExtractedContent, ExtractError> {
            Err(ExtractError::Corrupt {
                kind,
                message: "truncated".to_string(),
            })
        }
    }

    struct Harness {
        dispatcher: Dispatcher,
        pages: mpsc::Receiver<PageResult>,
        stats: Arc<SessionStats>,
    }

    fn page(body: &str) -> String {
        format!("<html><head><title>T</title></head><body>{}</body></html>", body)
    }

    fn long_text() -> String {
        format!("<p>{}</p>", "plenty of server rendered words ".repeat(30))
    }

    fn harness(
        strategy: FetchStrategy,
        renderer: Option<Arc<dyn Renderer>>,
        extractor: Arc<dyn ContentExtractor>,
    ) -> Harness {
        let mut config = Config::default();
        config.crawler.respect_robots = false;
        config.rate_limit.min_delay_ms = 0;
        config.rate_limit.max_delay_ms = 0;
        config.fetch.max_retries = 1;

        let (tx, pages) = mpsc::channel(8);
        let stats = Arc::new(SessionStats::new());
        let dispatcher = Dispatcher::new(
            build_http_client(&config.fetch).unwrap(),
            &config,
            strategy,
            renderer,
            extractor,
            Arc::new(RateLimiter::new(&config.rate_limit)),
            Arc::clone(&stats),
            tx,
        );

        Harness {
            dispatcher,
            pages,
            stats,
        }
    }

    fn record(server: &MockServer, route: &str) -> UrlRecord {
        let url = Url::parse(&format!("{}{}", server.uri(), route)).unwrap();
        UrlRecord {
            host: url.host_str().unwrap().to_string(),
            url,
            depth: 0,
            state: UrlState::InFlight,
        }
    }

    async fn serve(server: &MockServer, route: &str, response: ResponseTemplate, hits: u64) {
        Mock::given(method("GET"))
            .and(path(route))
            .respond_with(response)
            .expect(hits)
            .mount(server)
            .await;
    }

    fn html_response(body: &str) -> ResponseTemplate {
        ResponseTemplate::new(200).set_body_raw(page(body), "text/html")
    }

    #[tokio::test]
    async fn test_text_rich_page_stays_on_http() {
        let server = MockServer::start().await;
        serve(&server, "/", html_response(&long_text()), 1).await;
        let renderer = StubRenderer::serving("<p>rendered</p>");
        let mut h = harness(
            FetchStrategy::Auto,
            Some(renderer.clone()),
            Arc::new(DefaultExtractor),
        );

        let outcome = h.dispatcher.dispatch(&record(&server, "/")).await;

        assert!(matches!(outcome, Outcome::Visited { kind: ContentKind::Html, .. }));
        assert_eq!(renderer.calls(), 0);
        let written = h.pages.try_recv().unwrap();
        assert_eq!(written.fetched_with, FetchMethod::Http);
        assert_eq!(h.stats.snapshot().rendered, 0);
    }

    #[tokio::test]
    async fn test_blocked_response_falls_back_to_renderer() {
        let server = MockServer::start().await;
        serve(&server, "/guarded", ResponseTemplate::new(403), 1).await;
        let renderer = StubRenderer::serving(r#"<p>Behind the wall</p><a href="/next">n</a>"#);
        let mut h = harness(
            FetchStrategy::Auto,
            Some(renderer.clone()),
            Arc::new(DefaultExtractor),
        );

        let outcome = h.dispatcher.dispatch(&record(&server, "/guarded")).await;

        match outcome {
            Outcome::Visited { kind, links } => {
                assert_eq!(kind, ContentKind::Html);
                assert_eq!(links.len(), 1);
            }
            other => panic!("expected a visit, got {:?}", other),
        }
        assert_eq!(renderer.calls(), 1);
        let written = h.pages.try_recv().unwrap();
        assert_eq!(written.fetched_with, FetchMethod::Browser);
        assert!(written.content.contains("Behind the wall"));
        assert_eq!(h.stats.snapshot().rendered, 1);
    }

    #[tokio::test]
    async fn test_sparse_page_is_rendered_again() {
        let server = MockServer::start().await;
        serve(&server, "/app", html_response("<div id=\"root\">Loading</div>"), 1).await;
        let renderer = StubRenderer::serving("<p>Hydrated dashboard</p>");
        let mut h = harness(
            FetchStrategy::Auto,
            Some(renderer.clone()),
            Arc::new(DefaultExtractor),
        );

        let outcome = h.dispatcher.dispatch(&record(&server, "/app")).await;

        assert!(matches!(outcome, Outcome::Visited { .. }));
        assert_eq!(renderer.calls(), 1);
        let written = h.pages.try_recv().unwrap();
        assert_eq!(written.fetched_with, FetchMethod::Browser);
        assert_eq!(written.content, "Hydrated dashboard");
    }

    #[tokio::test]
    async fn test_failed_render_keeps_http_body() {
        let server = MockServer::start().await;
        serve(&server, "/app", html_response("<div>Loading</div>"), 1).await;
        let renderer = StubRenderer::broken();
        let mut h = harness(
            FetchStrategy::Auto,
            Some(renderer.clone()),
            Arc::new(DefaultExtractor),
        );

        let outcome = h.dispatcher.dispatch(&record(&server, "/app")).await;

        assert!(matches!(outcome, Outcome::Visited { .. }));
        assert_eq!(renderer.calls(), 1);
        let written = h.pages.try_recv().unwrap();
        assert_eq!(written.fetched_with, FetchMethod::Http);
        assert_eq!(written.content, "Loading");
        assert_eq!(h.stats.snapshot().rendered, 0);
    }

    #[tokio::test]
    async fn test_browser_strategy_skips_http() {
        let server = MockServer::start().await;
        serve(&server, "/", html_response(&long_text()), 0).await;
        let renderer = StubRenderer::serving("<p>From the browser</p>");
        let mut h = harness(
            FetchStrategy::Browser,
            Some(renderer.clone()),
            Arc::new(DefaultExtractor),
        );

        let outcome = h.dispatcher.dispatch(&record(&server, "/")).await;

        assert!(matches!(outcome, Outcome::Visited { .. }));
        assert_eq!(renderer.calls(), 1);
        assert_eq!(h.pages.try_recv().unwrap().fetched_with, FetchMethod::Browser);
    }

    #[tokio::test]
    async fn test_http_only_never_renders() {
        let server = MockServer::start().await;
        serve(&server, "/guarded", ResponseTemplate::new(403), 1).await;
        serve(&server, "/app", html_response("<div>Loading</div>"), 1).await;
        let renderer = StubRenderer::serving("<p>rendered</p>");
        let mut h = harness(
            FetchStrategy::HttpOnly,
            Some(renderer.clone()),
            Arc::new(DefaultExtractor),
        );

        let blocked = h.dispatcher.dispatch(&record(&server, "/guarded")).await;
        assert_eq!(blocked, Outcome::failed("HTTP 403"));

        let sparse = h.dispatcher.dispatch(&record(&server, "/app")).await;
        assert!(matches!(sparse, Outcome::Visited { .. }));
        assert_eq!(h.pages.try_recv().unwrap().fetched_with, FetchMethod::Http);
        assert_eq!(renderer.calls(), 0);
    }

    #[tokio::test]
    async fn test_blocked_response_without_renderer_fails() {
        let server = MockServer::start().await;
        serve(&server, "/guarded", ResponseTemplate::new(503), 1).await;
        let mut h = harness(FetchStrategy::Auto, None, Arc::new(DefaultExtractor));

        let outcome = h.dispatcher.dispatch(&record(&server, "/guarded")).await;

        assert_eq!(outcome, Outcome::failed("HTTP 503"));
        assert!(h.pages.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_extraction_error_fails_url() {
        let server = MockServer::start().await;
        serve(&server, "/", html_response(&long_text()), 1).await;
        let mut h = harness(FetchStrategy::HttpOnly, None, Arc::new(CorruptExtractor));

        let outcome = h.dispatcher.dispatch(&record(&server, "/")).await;

        assert_eq!(outcome, Outcome::failed("corrupt html document: truncated"));
        assert!(h.pages.try_recv().is_err());
        assert_eq!(h.stats.snapshot().pages_fetched, 0);
    }
}
