//! Crawl coordinator - end-to-end orchestration of one crawl
//!
//! The coordinator wires every other component together:
//! - Builds the HTTP client and, unless HTTP-only fetching was forced, the
//!   headless renderer
//! - Seeds the frontier from sitemaps (discovery mode) or the seed URL
//! - Opens the output file and its background writer
//! - Runs the worker pool until the frontier is exhausted or shutdown
//! - Assembles the final [`CrawlReport`]

use crate::config::{validate_options, CrawlMode, CrawlOptions, FetchStrategy};
use crate::crawler::dispatcher::Dispatcher;
use crate::crawler::fetcher::build_http_client;
use crate::crawler::frontier::Frontier;
use crate::crawler::rate_limiter::RateLimiter;
use crate::crawler::renderer::{launch_default, Renderer};
use crate::crawler::scheduler::{Scheduler, SchedulerConfig, ShutdownHandle};
use crate::crawler::sitemap::discover_sitemap_urls;
use crate::extract::{ContentExtractor, DefaultExtractor};
use crate::output::{create_output, output_path, site_folder, CrawlReport, OutputWriter};
use crate::state::SessionStats;
use crate::url::normalize_url;
use crate::WormError;
use chrono::Local;
use reqwest::Client;
use std::sync::Arc;
use std::time::Instant;
use url::Url;

/// Main crawl coordinator
pub struct Coordinator {
    options: CrawlOptions,
    /// `None` launches the default renderer; `Some` overrides it
    renderer: Option<Option<Arc<dyn Renderer>>>,
    extractor: Arc<dyn ContentExtractor>,
    shutdown: ShutdownHandle,
}

impl Coordinator {
    /// Creates a coordinator after validating `options`
    ///
    /// # Returns
    ///
    /// * `Ok(Coordinator)` - Options are usable
    /// * `Err(WormError)` - Invalid seed URL or configuration
    pub fn new(options: CrawlOptions) -> Result<Self, WormError> {
        validate_options(&options)?;

        Ok(Self {
            options,
            renderer: None,
            extractor: Arc::new(DefaultExtractor),
            shutdown: ShutdownHandle::new(),
        })
    }

    /// Uses `renderer` instead of launching the default headless browser
    pub fn with_renderer(mut self, renderer: Arc<dyn Renderer>) -> Self {
        self.renderer = Some(Some(renderer));
        self
    }

    /// Disables rendering entirely, whatever the build supports
    pub fn without_renderer(mut self) -> Self {
        self.renderer = Some(None);
        self
    }

    pub fn with_extractor(mut self, extractor: Arc<dyn ContentExtractor>) -> Self {
        self.extractor = extractor;
        self
    }

    /// Handle that cancels the crawl once triggered
    pub fn shutdown_handle(&self) -> ShutdownHandle {
        self.shutdown.clone()
    }

    /// Runs the crawl to completion
    ///
    /// Per-URL failures are counted in the report. Only fatal conditions are
    /// returned as errors: no usable fetch strategy, an output file that
    /// cannot be created, or a seed that could not be fetched at all.
    pub async fn run(self) -> Result<CrawlReport, WormError> {
        let started = Instant::now();
        let started_at = Local::now();
        let options = self.options;
        let config = &options.config;

        if let Some(hash) = &options.config_hash {
            tracing::info!("Using configuration {}", hash);
        }

        let client = build_http_client(&config.fetch)?;
        let renderer = match self.renderer {
            Some(renderer) => renderer,
            None if options.strategy == FetchStrategy::HttpOnly => None,
            None => launch_default().await,
        };
        if options.strategy == FetchStrategy::Browser && renderer.is_none() {
            return Err(WormError::NoFetchStrategy(
                "browser fetching was forced but no headless browser is available".to_string(),
            ));
        }

        let seed = normalize_url(options.seed.as_str())?;
        let frontier = Arc::new(Frontier::new(
            seed.clone(),
            options.effective_max_depth(),
            options.effective_max_pages(),
        ));
        let sitemap_urls = seed_frontier(&options, &client, &frontier, &seed).await;

        let path = output_path(
            &options.output_root(),
            &site_folder(&seed, options.name.as_deref()),
            started_at,
            options.format,
        );
        let writer = OutputWriter::spawn(create_output(options.format, &path)?);
        tracing::info!("Writing {} output to {}", options.format, path.display());

        let stats = Arc::new(SessionStats::new());
        let dispatcher = Dispatcher::new(
            client,
            config,
            options.strategy,
            renderer,
            self.extractor,
            Arc::new(RateLimiter::new(&config.rate_limit)),
            Arc::clone(&stats),
            writer.sender(),
        );
        let scheduler = Scheduler::new(
            Arc::clone(&frontier),
            Arc::new(dispatcher),
            SchedulerConfig::from(&config.crawler),
            self.shutdown,
        );

        tracing::info!(
            "Crawling {} ({:?} mode, depth {}, {} workers max)",
            seed,
            options.mode,
            options
                .effective_max_depth()
                .map_or_else(|| "unbounded".to_string(), |d| d.to_string()),
            config.crawler.max_concurrency
        );
        let summary = scheduler.run().await;

        let abandoned = frontier.abandon_in_flight("cancelled");
        if !abandoned.is_empty() {
            tracing::warn!("{} in-flight URLs abandoned", abandoned.len());
        }

        // Releases the dispatcher's output sender
        drop(scheduler);
        let pages_written = writer.finish().await?;

        let counts = frontier.stats();
        let session = stats.snapshot();
        let mut report = CrawlReport {
            seed: seed.to_string(),
            fetched: counts.visited as u64,
            failed: counts.failed as u64,
            skipped: counts.skipped as u64,
            rendered: session.rendered,
            bytes_processed: session.bytes_processed,
            pages_written,
            sitemap_urls,
            elapsed: started.elapsed(),
            output_path: Some(path),
            config_hash: options.config_hash.clone(),
            cancelled: summary.cancelled,
            ..CrawlReport::default()
        };
        for (kind, count) in frontier.kind_counts() {
            report.record_kind(kind, count as u64);
        }

        tracing::info!(
            "Crawl finished: {} fetched, {} failed, {} skipped in {:.1}s",
            report.fetched,
            report.failed,
            report.skipped,
            report.elapsed.as_secs_f64()
        );

        if report.fetched == 0 && report.failed > 0 && !report.cancelled {
            return Err(WormError::SeedUnreachable {
                url: report.seed,
            });
        }

        Ok(report)
    }
}

/// Seeds the frontier and returns how many URLs came from sitemaps
///
/// Discovery mode tries the sitemap first and seeds its URLs at depth 0.
/// When no sitemap yields anything, and always in bounded mode, the seed
/// URL itself is the only starting point.
async fn seed_frontier(
    options: &CrawlOptions,
    client: &Client,
    frontier: &Frontier,
    seed: &Url,
) -> usize {
    if options.mode == CrawlMode::Discovery && options.config.crawler.use_sitemap {
        let urls = discover_sitemap_urls(client, seed).await;
        let seeded = urls
            .iter()
            .filter(|url| frontier.enqueue(url.as_str(), 0))
            .count();
        if seeded > 0 {
            tracing::info!("Seeded {} URLs from sitemap", seeded);
            return seeded;
        }
        tracing::info!("No usable sitemap, starting from {}", seed);
    }

    frontier.enqueue(seed.as_str(), 0);
    0
}

/// Runs a crawl with the given options
///
/// # Example
///
/// ```no_run
/// use wormcrawl::config::CrawlOptions;
/// use wormcrawl::crawler::run_crawl;
/// use url::Url;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let options = CrawlOptions::new(Url::parse("https://example.com/")?);
/// let report = run_crawl(options).await?;
/// println!("{} pages fetched", report.fetched);
/// # Ok(())
/// # }
/// ```
pub async fn run_crawl(options: CrawlOptions) -> Result<CrawlReport, WormError> {
    Coordinator::new(options)?.run().await
}
