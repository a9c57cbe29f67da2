//! Per-host politeness delays
//!
//! Every host has its own [`HostState`] behind an async mutex. The lock is
//! held while the caller sleeps, so concurrent requests to one host queue up
//! behind each other while other hosts proceed independently.

use crate::config::RateLimitConfig;
use crate::state::HostState;
use rand::Rng;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::Mutex as AsyncMutex;
use tokio::time::Instant;

pub struct RateLimiter {
    min_delay: Duration,
    max_delay: Duration,
    hosts: Mutex<HashMap<String, Arc<AsyncMutex<HostState>>>>,
}

impl RateLimiter {
    pub fn new(config: &RateLimitConfig) -> Self {
        Self::with_delays(
            Duration::from_millis(config.min_delay_ms),
            Duration::from_millis(config.max_delay_ms),
        )
    }

    pub fn with_delays(min_delay: Duration, max_delay: Duration) -> Self {
        Self {
            min_delay,
            max_delay: max_delay.max(min_delay),
            hosts: Mutex::new(HashMap::new()),
        }
    }

    fn host(&self, host: &str) -> Arc<AsyncMutex<HostState>> {
        let mut hosts = self.hosts.lock().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(hosts.entry(host.to_string()).or_default())
    }

    /// Draws a delay uniformly from `[min_delay, max_delay]`
    fn draw_delay(&self) -> Duration {
        if self.max_delay <= self.min_delay {
            return self.min_delay;
        }
        let min = self.min_delay.as_millis() as u64;
        let max = self.max_delay.as_millis() as u64;
        Duration::from_millis(rand::thread_rng().gen_range(min..=max))
    }

    /// Waits until a request to `host` is allowed, then records it
    ///
    /// Returns how long the caller was suspended. The first request to a host
    /// is never delayed.
    pub async fn acquire(&self, host: &str) -> Duration {
        let state = self.host(host);
        let mut state = state.lock().await;

        let delay = state.effective_delay(self.draw_delay());
        let wait = state.time_until_next_request(delay, Instant::now());
        if let Some(wait) = wait {
            tracing::trace!("Waiting {:?} before next request to {}", wait, host);
            tokio::time::sleep(wait).await;
        }

        state.record_request(Instant::now());
        wait.unwrap_or(Duration::ZERO)
    }

    /// Applies a robots.txt Crawl-delay as the host's delay floor
    pub async fn set_crawl_delay(&self, host: &str, crawl_delay: Option<Duration>) {
        let state = self.host(host);
        let mut state = state.lock().await;
        if state.crawl_delay != crawl_delay {
            if let Some(delay) = crawl_delay {
                tracing::debug!("Honoring crawl-delay of {:?} for {}", delay, host);
            }
            state.crawl_delay = crawl_delay;
        }
    }

    /// Doubles the delay for a host that answered HTTP 429
    pub async fn mark_throttled(&self, host: &str) {
        let state = self.host(host);
        let mut state = state.lock().await;
        if !state.throttled {
            tracing::warn!("{} is rate limiting us, slowing down", host);
            state.mark_throttled();
        }
    }

    /// Requests granted so far to `host`
    pub async fn request_count(&self, host: &str) -> u32 {
        self.host(host).lock().await.request_count
    }
}
