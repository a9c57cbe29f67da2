//! Integration tests for the crawler
//!
//! These tests use wiremock to create mock HTTP servers and test
//! the full crawl cycle end-to-end, writing output into temp directories.

use async_trait::async_trait;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use url::Url;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};
use wormcrawl::config::{CrawlMode, CrawlOptions, FetchStrategy};
use wormcrawl::crawler::renderer::{RenderError, RenderedPage, Renderer};
use wormcrawl::extract::{ContentExtractor, ContentKind, ExtractError, ExtractedContent};
use wormcrawl::output::OutputFormat;
use wormcrawl::{Coordinator, WormError};

/// Options for a fast crawl of the mock server: no politeness delays and
/// near-instant retries
fn test_options(base: &str, out: &TempDir) -> CrawlOptions {
    let mut options = CrawlOptions::new(Url::parse(base).unwrap());
    options.output_dir = Some(out.path().to_path_buf());
    options.name = Some("site".to_string());
    options.config.rate_limit.min_delay_ms = 0;
    options.config.rate_limit.max_delay_ms = 0;
    options.config.fetch.initial_retry_delay_ms = 10;
    options.config.crawler.idle_backoff_ms = 20;
    options
}

fn html(body: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_raw(
        format!(
            "<html><head><title>Test</title></head><body>{}</body></html>",
            body
        ),
        "text/html",
    )
}

async fn mount_page(server: &MockServer, route: &str, body: &str, expected_hits: u64) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(html(body))
        .expect(expected_hits)
        .mount(server)
        .await;
}

fn read_json_lines(path: &Path) -> Vec<serde_json::Value> {
    std::fs::read_to_string(path)
        .unwrap()
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect()
}

#[tokio::test]
async fn test_bounded_crawl_depth_one() {
    let server = MockServer::start().await;
    let out = TempDir::new().unwrap();

    mount_page(
        &server,
        "/",
        r#"<p>Welcome to the home page.</p>
        <a href="/a">A</a> <a href="/b">B</a> <a href="/c">C</a>
        <img src="/logo.png"><a href="/logo.png">Logo</a>"#,
        1,
    )
    .await;
    mount_page(&server, "/a", r#"<p>Page A</p><a href="/deeper">Deeper</a>"#, 1).await;
    mount_page(&server, "/b", "<p>Page B</p>", 1).await;
    mount_page(&server, "/c", "<p>Page C</p>", 1).await;
    mount_page(&server, "/deeper", "<p>Too deep</p>", 0).await;
    Mock::given(method("GET"))
        .and(path("/logo.png"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let mut options = test_options(&server.uri(), &out);
    options.mode = CrawlMode::Bounded;
    options.max_depth = Some(1);

    let report = Coordinator::new(options)
        .unwrap()
        .without_renderer()
        .run()
        .await
        .unwrap();

    assert_eq!(report.fetched, 4);
    assert_eq!(report.skipped, 1);
    assert_eq!(report.failed, 0);
    assert_eq!(report.pages_written, 4);
    assert_eq!(report.sitemap_urls, 0);
    assert_eq!(report.kinds.get("html"), Some(&4));
    assert_eq!(report.kinds.get("image"), Some(&1));

    let output = report.output_path.unwrap();
    assert!(output.starts_with(out.path().join("site")));
    assert_eq!(output.extension().unwrap(), "jsonl");

    let records = read_json_lines(&output);
    assert_eq!(records.len(), 4);
    let home = records
        .iter()
        .find(|r| r["depth"] == 0)
        .expect("seed record written");
    assert_eq!(home["kind"], "html");
    assert_eq!(home["title"], "Test");
    assert!(home["content"]
        .as_str()
        .unwrap()
        .contains("Welcome to the home page."));
    assert_eq!(home["discovered_urls"].as_array().unwrap().len(), 4);
}

#[tokio::test]
async fn test_discovery_seeds_from_sitemap() {
    let server = MockServer::start().await;
    let out = TempDir::new().unwrap();
    let base = server.uri();

    let locs: String = (1..=10)
        .map(|i| format!("<url><loc>{}/doc/{}</loc></url>", base, i))
        .collect();
    Mock::given(method("GET"))
        .and(path("/sitemap.xml"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(
            format!(
                r#"<?xml version="1.0" encoding="UTF-8"?>
                <urlset xmlns="http://www.sitemaps.org/schemas/sitemap/0.9">{}</urlset>"#,
                locs
            ),
            "application/xml",
        ))
        .mount(&server)
        .await;

    for i in 1..=9 {
        mount_page(
            &server,
            &format!("/doc/{}", i),
            &format!("<p>Document {}</p>", i),
            1,
        )
        .await;
    }
    Mock::given(method("GET"))
        .and(path("/doc/10"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;
    // Sitemap URLs replace the base URL as seeds
    mount_page(&server, "/", "<p>Home</p>", 0).await;

    let mut options = test_options(&base, &out);
    options.mode = CrawlMode::Discovery;
    options.max_depth = None;

    let report = Coordinator::new(options)
        .unwrap()
        .without_renderer()
        .run()
        .await
        .unwrap();

    assert_eq!(report.sitemap_urls, 10);
    assert_eq!(report.fetched, 9);
    assert_eq!(report.failed, 1);
    assert_eq!(report.total(), 10);
    assert!(!report.cancelled);

    let records = read_json_lines(&report.output_path.unwrap());
    assert_eq!(records.len(), 9);
    assert!(records.iter().all(|r| r["depth"] == 0));
}

#[tokio::test]
async fn test_each_url_fetched_once_despite_cycles() {
    let server = MockServer::start().await;
    let out = TempDir::new().unwrap();

    mount_page(&server, "/", r#"<a href="/x">x</a><a href="/y">y</a>"#, 1).await;
    mount_page(
        &server,
        "/x",
        r#"<a href="/">home</a><a href="/y#top">y</a><a href="/x/">self</a>"#,
        1,
    )
    .await;
    mount_page(
        &server,
        "/y",
        r#"<a href="/x?utm_source=loop">x</a><a href="/">home</a>"#,
        1,
    )
    .await;

    let mut options = test_options(&server.uri(), &out);
    options.max_depth = Some(10);

    let report = Coordinator::new(options)
        .unwrap()
        .without_renderer()
        .run()
        .await
        .unwrap();

    assert_eq!(report.fetched, 3);
    assert_eq!(report.failed, 0);
    assert_eq!(report.skipped, 0);
}

#[tokio::test]
async fn test_robots_disallow_is_recorded_as_failed() {
    let server = MockServer::start().await;
    let out = TempDir::new().unwrap();

    Mock::given(method("GET"))
        .and(path("/robots.txt"))
        .respond_with(
            ResponseTemplate::new(200).set_body_string("User-agent: *\nDisallow: /private\n"),
        )
        .mount(&server)
        .await;
    mount_page(
        &server,
        "/",
        r#"<a href="/public">ok</a><a href="/private/area">no</a>"#,
        1,
    )
    .await;
    mount_page(&server, "/public", "<p>Public</p>", 1).await;
    mount_page(&server, "/private/area", "<p>Secret</p>", 0).await;

    let mut options = test_options(&server.uri(), &out);
    options.max_depth = Some(1);

    let report = Coordinator::new(options)
        .unwrap()
        .without_renderer()
        .run()
        .await
        .unwrap();

    assert_eq!(report.fetched, 2);
    assert_eq!(report.failed, 1);
}

#[tokio::test]
async fn test_page_budget_limits_bounded_crawl() {
    let server = MockServer::start().await;
    let out = TempDir::new().unwrap();

    mount_page(
        &server,
        "/",
        r#"<a href="/1">1</a><a href="/2">2</a><a href="/3">3</a>"#,
        1,
    )
    .await;
    mount_page(&server, "/1", "<p>One</p>", 1).await;
    mount_page(&server, "/2", "<p>Two</p>", 0).await;
    mount_page(&server, "/3", "<p>Three</p>", 0).await;

    let mut options = test_options(&server.uri(), &out);
    options.max_depth = None;
    options.max_pages = Some(2);

    let report = Coordinator::new(options)
        .unwrap()
        .without_renderer()
        .run()
        .await
        .unwrap();

    assert_eq!(report.fetched, 2);
}

#[tokio::test]
async fn test_csv_output() {
    let server = MockServer::start().await;
    let out = TempDir::new().unwrap();

    mount_page(
        &server,
        "/",
        r#"<h1>Hello, "world"</h1><a href="/next">next</a><a href="https://elsewhere.org/">ext</a>"#,
        1,
    )
    .await;

    let mut options = test_options(&server.uri(), &out);
    options.format = OutputFormat::Csv;
    options.strategy = FetchStrategy::HttpOnly;

    let report = Coordinator::new(options).unwrap().run().await.unwrap();
    let output = report.output_path.unwrap();
    assert_eq!(output.extension().unwrap(), "csv");

    let mut reader = csv::Reader::from_path(&output).unwrap();
    let headers: Vec<String> = reader
        .headers()
        .unwrap()
        .iter()
        .map(str::to_string)
        .collect();
    assert_eq!(
        headers,
        vec!["url", "kind", "title", "content", "discovered_urls"]
    );

    let rows: Vec<csv::StringRecord> = reader.records().map(Result::unwrap).collect();
    assert_eq!(rows.len(), 1);
    assert_eq!(&rows[0][1], "html");
    assert!(rows[0][3].contains("Hello, \"world\""));
    assert_eq!(
        &rows[0][4],
        format!("{}/next, https://elsewhere.org/", server.uri())
    );
}

#[tokio::test]
async fn test_unreachable_seed_is_fatal() {
    let server = MockServer::start().await;
    let out = TempDir::new().unwrap();

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let options = test_options(&server.uri(), &out);
    let result = Coordinator::new(options)
        .unwrap()
        .without_renderer()
        .run()
        .await;

    assert!(matches!(result, Err(WormError::SeedUnreachable { .. })));
}

#[tokio::test]
async fn test_shutdown_before_run_completes_cleanly() {
    let server = MockServer::start().await;
    let out = TempDir::new().unwrap();
    mount_page(&server, "/", "<p>Home</p>", 0).await;

    let coordinator = Coordinator::new(test_options(&server.uri(), &out))
        .unwrap()
        .without_renderer();
    coordinator.shutdown_handle().trigger();

    let report = coordinator.run().await.unwrap();
    assert!(report.cancelled);
    assert_eq!(report.fetched, 0);
    assert_eq!(report.pages_written, 0);
}

/// Renderer that answers every URL with the same document
struct CannedRenderer {
    body: String,
    calls: AtomicUsize,
}

#[async_trait]
impl Renderer for CannedRenderer {
    async fn render(&self, url: &Url, _timeout: Duration) -> Result<RenderedPage, RenderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(RenderedPage {
            final_url: url.clone(),
            html: format!("<html><body>{}</body></html>", self.body),
        })
    }
}

#[tokio::test]
async fn test_blocked_pages_are_rendered() {
    let server = MockServer::start().await;
    let out = TempDir::new().unwrap();

    mount_page(
        &server,
        "/",
        &format!(
            r#"<p>{}</p><a href="/members">members</a>"#,
            "a long public introduction ".repeat(30)
        ),
        1,
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/members"))
        .respond_with(ResponseTemplate::new(403))
        .expect(1)
        .mount(&server)
        .await;

    let renderer = Arc::new(CannedRenderer {
        body: "<p>Members area rendered</p>".to_string(),
        calls: AtomicUsize::new(0),
    });
    let mut options = test_options(&server.uri(), &out);
    options.max_depth = Some(1);
    options.config.fetch.max_retries = 1;

    let report = Coordinator::new(options)
        .unwrap()
        .with_renderer(renderer.clone())
        .run()
        .await
        .unwrap();

    assert_eq!(report.fetched, 2);
    assert_eq!(report.rendered, 1);
    assert_eq!(renderer.calls.load(Ordering::SeqCst), 1);

    let records = read_json_lines(&report.output_path.unwrap());
    let members = records
        .iter()
        .find(|r| r["depth"] == 1)
        .expect("rendered record written");
    assert_eq!(members["fetched_with"], "browser");
    assert_eq!(members["content"], "Members area rendered");
}

struct RejectingExtractor;

impl ContentExtractor for RejectingExtractor {
    fn extract(
        &self,
        _body: &[u8],
        kind: ContentKind,
        _base_url: &Url,
    ) -> Result<ExtractedContent, ExtractError> {
        Err(ExtractError::Unsupported(kind))
    }
}

#[tokio::test]
async fn test_extraction_failures_are_counted() {
    let server = MockServer::start().await;
    let out = TempDir::new().unwrap();
    mount_page(&server, "/", "<p>Unreadable</p>", 1).await;

    let report = Coordinator::new(test_options(&server.uri(), &out))
        .unwrap()
        .without_renderer()
        .with_extractor(Arc::new(RejectingExtractor))
        .run()
        .await;

    // The only page failed extraction, so nothing was fetched successfully
    assert!(matches!(report, Err(WormError::SeedUnreachable { .. })));
}
