//! Wormcrawl main entry point
//!
//! This is the command-line interface for the Wormcrawl website crawler.

use anyhow::Context;
use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;
use wormcrawl::config::{load_config_with_hash, Config, CrawlMode, CrawlOptions, FetchStrategy};
use wormcrawl::crawler::Coordinator;
use wormcrawl::output::{print_report, OutputFormat};
use wormcrawl::url::normalize_url;

/// Wormcrawl: a polite website crawler
///
/// Wormcrawl crawls a single website from a seed URL, discovering pages via
/// its sitemap or by following links, and writes the visible text and links
/// of every HTML page and PDF it finds to a CSV or JSON lines file.
#[derive(Parser, Debug)]
#[command(name = "wormcrawl")]
#[command(version)]
#[command(about = "A polite website crawler", long_about = None)]
struct Cli {
    /// Seed URL to start crawling from
    #[arg(value_name = "URL")]
    url: String,

    /// Discover the whole site (sitemap first, then links) instead of a bounded crawl
    #[arg(long)]
    discover: bool,

    /// Maximum link depth from the seed (0 crawls only the seed)
    #[arg(long, value_name = "N")]
    max_depth: Option<u32>,

    /// Maximum number of URLs to admit (bounded mode only)
    #[arg(long, value_name = "N")]
    max_pages: Option<usize>,

    /// Output format
    #[arg(long, value_enum, default_value_t = FormatArg::Json)]
    format: FormatArg,

    /// Force a fetch strategy instead of automatic fallback
    #[arg(long, value_enum)]
    force: Option<ForceArg>,

    /// Path to TOML configuration file
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Output root directory (overrides the configuration file)
    #[arg(short, long, value_name = "DIR")]
    output: Option<PathBuf>,

    /// Folder name for this crawl's output (defaults to the seed host)
    #[arg(long)]
    name: Option<String>,

    /// Do not look for a sitemap in discovery mode
    #[arg(long)]
    no_sitemap: bool,

    /// Do not fetch or obey robots.txt
    #[arg(long)]
    ignore_robots: bool,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum FormatArg {
    Csv,
    Json,
}

impl From<FormatArg> for OutputFormat {
    fn from(arg: FormatArg) -> Self {
        match arg {
            FormatArg::Csv => OutputFormat::Csv,
            FormatArg::Json => OutputFormat::Json,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ForceArg {
    /// Plain HTTP requests only
    Req,
    /// Headless browser for every page
    Sel,
}

impl From<ForceArg> for FetchStrategy {
    fn from(arg: ForceArg) -> Self {
        match arg {
            ForceArg::Req => FetchStrategy::HttpOnly,
            ForceArg::Sel => FetchStrategy::Browser,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    let options = build_options(&cli)?;
    let coordinator = Coordinator::new(options).context("Invalid crawl options")?;

    let shutdown = coordinator.shutdown_handle();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupted, finishing in-flight work and writing partial output");
            shutdown.trigger();
        }
    });

    match coordinator.run().await {
        Ok(report) => {
            if !cli.quiet {
                print_report(&report);
            }
            Ok(())
        }
        Err(e) => {
            tracing::error!("Crawl failed: {}", e);
            Err(e).context("Crawl failed")
        }
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("wormcrawl=info,warn"),
            1 => EnvFilter::new("wormcrawl=debug,info"),
            2 => EnvFilter::new("wormcrawl=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Assembles crawl options from the command line and the optional config file
fn build_options(cli: &Cli) -> anyhow::Result<CrawlOptions> {
    let (mut config, config_hash) = match &cli.config {
        Some(path) => {
            tracing::info!("Loading configuration from: {}", path.display());
            let (config, hash) = load_config_with_hash(path)
                .with_context(|| format!("Failed to load configuration {}", path.display()))?;
            tracing::info!("Configuration loaded successfully (hash: {})", hash);
            (config, Some(hash))
        }
        None => (Config::default(), None),
    };

    if cli.no_sitemap {
        config.crawler.use_sitemap = false;
    }
    if cli.ignore_robots {
        config.crawler.respect_robots = false;
    }

    let seed = normalize_url(&cli.url).with_context(|| format!("Invalid seed URL {}", cli.url))?;

    let mut options = CrawlOptions::new(seed);
    options.mode = if cli.discover {
        CrawlMode::Discovery
    } else {
        CrawlMode::Bounded
    };
    options.max_depth = match (options.mode, cli.max_depth, cli.max_pages) {
        (_, Some(depth), _) => Some(depth),
        // A page budget alone bounds the crawl
        (CrawlMode::Bounded, None, Some(_)) => None,
        (CrawlMode::Bounded, None, None) => Some(0),
        (CrawlMode::Discovery, None, _) => None,
    };
    options.max_pages = cli.max_pages;
    options.strategy = cli.force.map(FetchStrategy::from).unwrap_or_default();
    options.format = cli.format.into();
    options.name = cli.name.clone();
    options.output_dir = cli.output.clone();
    options.config_hash = config_hash;
    options.config = config;

    if cli.discover && cli.max_pages.is_some() {
        tracing::warn!("--max-pages is ignored in discovery mode");
    }

    Ok(options)
}
