use std::time::Duration;
use tokio::time::Instant;

/// Tracks the politeness state of one host during crawling
///
/// The rate limiter keeps one of these per host behind its own lock, so the
/// fields here are only ever touched by one worker at a time.
#[derive(Debug, Clone, Default)]
pub struct HostState {
    /// Number of requests granted to this host in the current crawl
    pub request_count: u32,

    /// When the last request to this host was granted
    pub last_request_time: Option<Instant>,

    /// Whether this host has answered HTTP 429
    pub throttled: bool,

    /// Crawl-delay advertised by the host's robots.txt
    pub crawl_delay: Option<Duration>,
}

impl HostState {
    /// Creates a new HostState with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Raises a drawn delay to the host-specific floor
    ///
    /// The floor is the robots.txt crawl-delay, and a throttled host gets
    /// twice whatever delay would otherwise apply.
    pub fn effective_delay(&self, drawn: Duration) -> Duration {
        let base = match self.crawl_delay {
            Some(crawl_delay) => drawn.max(crawl_delay),
            None => drawn,
        };

        if self.throttled {
            base * 2
        } else {
            base
        }
    }

    /// Time left before the next request may be granted, or None if it may go now
    pub fn time_until_next_request(&self, delay: Duration, now: Instant) -> Option<Duration> {
        let last = self.last_request_time?;
        let elapsed = now.saturating_duration_since(last);
        if elapsed < delay {
            Some(delay - elapsed)
        } else {
            None
        }
    }

    /// Records that a request was granted to this host
    pub fn record_request(&mut self, now: Instant) {
        self.request_count += 1;
        self.last_request_time = Some(now);
    }

    /// Marks this host as throttled (HTTP 429)
    pub fn mark_throttled(&mut self) {
        self.throttled = true;
    }
}
