use crate::output::OutputFormat;
use serde::Deserialize;
use std::path::PathBuf;
use url::Url;

/// Main configuration structure for Wormcrawl
///
/// Every section is optional in the TOML file; missing keys fall back to the
/// defaults below.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub crawler: CrawlerConfig,
    #[serde(rename = "rate-limit")]
    pub rate_limit: RateLimitConfig,
    pub fetch: FetchConfig,
    pub suspicious: SuspiciousConfig,
    pub output: OutputConfig,
}

/// Worker pool and discovery behavior
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct CrawlerConfig {
    /// Ceiling on concurrently running fetch workers
    pub max_concurrency: usize,

    /// Pending URLs that justify one additional worker
    pub urls_per_worker: usize,

    /// How long an idle worker waits for new work before re-checking (milliseconds)
    pub idle_backoff_ms: u64,

    /// Whether robots.txt rules and crawl delays are honored
    pub respect_robots: bool,

    /// Whether well-known sitemap locations are probed before crawling
    pub use_sitemap: bool,

    /// Log a progress line every N completed URLs
    pub progress_interval: u64,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            max_concurrency: 6,
            urls_per_worker: 10,
            idle_backoff_ms: 200,
            respect_robots: true,
            use_sitemap: true,
            progress_interval: 10,
        }
    }
}

/// Per-host politeness delays
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct RateLimitConfig {
    /// Lower bound of the randomized delay between requests to one host (milliseconds)
    pub min_delay_ms: u64,

    /// Upper bound of the randomized delay between requests to one host (milliseconds)
    pub max_delay_ms: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            min_delay_ms: 1000,
            max_delay_ms: 5000,
        }
    }
}

/// HTTP and renderer fetch settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct FetchConfig {
    /// User-Agent header sent with every request
    pub user_agent: String,

    /// Product token matched against robots.txt `User-agent` groups
    pub robots_agent: String,

    /// Whole-request timeout (seconds)
    pub timeout_secs: u64,

    /// Connection establishment timeout (seconds)
    pub connect_timeout_secs: u64,

    /// Attempts per URL for transient failures (timeouts, 5xx)
    pub max_retries: u32,

    /// First retry delay; doubles on every further attempt (milliseconds)
    pub initial_retry_delay_ms: u64,

    /// HTML with less visible text than this is treated as JavaScript-rendered
    pub dynamic_text_threshold: usize,

    /// Navigation timeout for the headless renderer (milliseconds)
    pub render_timeout_ms: u64,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                         (KHTML, like Gecko) Chrome/126.0.0.0 Safari/537.36"
                .to_string(),
            robots_agent: "wormcrawl".to_string(),
            timeout_secs: 10,
            connect_timeout_secs: 10,
            max_retries: 2,
            initial_retry_delay_ms: 1000,
            dynamic_text_threshold: 500,
            render_timeout_ms: 30_000,
        }
    }
}

/// Heuristics for URLs that are skipped before any fetch
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct SuspiciousConfig {
    /// Query strings longer than this are considered junk
    pub max_query_length: usize,

    /// Query parameters that mark gallery/item viewers
    pub blocked_params: Vec<String>,

    /// Host patterns of known trackers (e.g., "*.doubleclick.net")
    pub tracker_patterns: Vec<String>,
}

impl Default for SuspiciousConfig {
    fn default() -> Self {
        Self {
            max_query_length: 256,
            blocked_params: vec![
                "itemId".to_string(),
                "imageId".to_string(),
                "galleryId".to_string(),
            ],
            tracker_patterns: vec![
                "*.doubleclick.net".to_string(),
                "*.google-analytics.com".to_string(),
                "*.googletagmanager.com".to_string(),
                "*.facebook.net".to_string(),
                "*.hotjar.com".to_string(),
            ],
        }
    }
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct OutputConfig {
    /// Root directory under which per-site output folders are created
    pub directory: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            directory: "scrapes".to_string(),
        }
    }
}

/// How far a crawl is allowed to spread
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CrawlMode {
    /// Crawl the entire reachable site; no page count bound
    Discovery,
    /// Stop after a number of admitted pages and/or a maximum depth
    Bounded,
}

/// Which fetch path the dispatcher may use
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FetchStrategy {
    /// Plain HTTP first, renderer fallback for anti-bot or dynamic pages
    #[default]
    Auto,
    /// Plain HTTP only, never fall back
    HttpOnly,
    /// Every page goes through the headless renderer
    Browser,
}

/// Runtime options for one crawl, assembled from the CLI and the config file
#[derive(Debug, Clone)]
pub struct CrawlOptions {
    /// Seed URL the crawl starts from
    pub seed: Url,

    pub mode: CrawlMode,

    /// Maximum link depth from the seed; `None` means unbounded
    pub max_depth: Option<u32>,

    /// Maximum number of URL records admitted; ignored in discovery mode
    pub max_pages: Option<usize>,

    pub strategy: FetchStrategy,

    pub format: OutputFormat,

    /// Folder name under the output directory; defaults to the seed host
    pub name: Option<String>,

    /// Overrides `config.output.directory` when set
    pub output_dir: Option<PathBuf>,

    /// SHA-256 of the config file, when one was loaded
    pub config_hash: Option<String>,

    pub config: Config,
}

impl CrawlOptions {
    /// Creates options for a seed with every other setting at its default
    ///
    /// Bounded mode with no explicit bound crawls the seed page only, so the
    /// default depth is 0.
    pub fn new(seed: Url) -> Self {
        Self {
            seed,
            mode: CrawlMode::Bounded,
            max_depth: Some(0),
            max_pages: None,
            strategy: FetchStrategy::Auto,
            format: OutputFormat::Json,
            name: None,
            output_dir: None,
            config_hash: None,
            config: Config::default(),
        }
    }

    /// Depth bound actually enforced by the frontier
    ///
    /// An explicit depth is authoritative in both modes. Discovery mode
    /// without one is unbounded.
    pub fn effective_max_depth(&self) -> Option<u32> {
        self.max_depth
    }

    /// Page count bound actually enforced by the frontier
    pub fn effective_max_pages(&self) -> Option<usize> {
        match self.mode {
            CrawlMode::Discovery => None,
            CrawlMode::Bounded => self.max_pages,
        }
    }

    /// Directory the output file is written to
    pub fn output_root(&self) -> PathBuf {
        self.output_dir
            .clone()
            .unwrap_or_else(|| PathBuf::from(&self.config.output.directory))
    }
}
