//! Crawler module: frontier, worker pool and fetch pipeline
//!
//! This module contains the core crawling logic, including:
//! - The URL frontier (dedup, depth and page bounds, record lifecycle)
//! - The dynamic worker pool and its cooperative shutdown
//! - Per-host rate limiting
//! - HTTP fetching with retries, optional headless rendering
//! - Content classification and sitemap discovery
//! - Overall crawl coordination

mod classify;
mod coordinator;
mod dispatcher;
mod fetcher;
mod frontier;
mod rate_limiter;
pub mod renderer;
mod scheduler;
pub mod sitemap;

pub use classify::{classify_response, screen_url, Skip};
pub use coordinator::{run_crawl, Coordinator};
pub use dispatcher::Dispatcher;
pub use fetcher::{build_http_client, fetch_url, FetchError, FetchedResource};
pub use frontier::{Frontier, FrontierStats, Outcome, UrlRecord};
pub use rate_limiter::RateLimiter;
pub use renderer::{RenderError, RenderedPage, Renderer};
pub use scheduler::{
    desired_workers, Scheduler, SchedulerConfig, SchedulerSummary, ShutdownHandle, UrlHandler,
};
pub use sitemap::discover_sitemap_urls;
