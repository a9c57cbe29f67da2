//! Robots.txt handling module
//!
//! Rules are fetched once per host, cached for a day and consulted before
//! every page fetch. A missing or unreachable robots.txt allows everything.

mod cache;
mod parser;

pub use cache::{CachedRobots, RobotsCache};
pub use parser::RobotsRules;

use reqwest::Client;
use std::time::Duration;
use tokio::sync::Mutex;
use url::Url;

/// Fetches and parses robots.txt for the origin of `url`
///
/// Any failure (network error, non-2xx status, unreadable body) yields
/// [`RobotsRules::allow_all`].
pub async fn fetch_robots(client: &Client, url: &Url) -> RobotsRules {
    let mut robots_url = url.clone();
    robots_url.set_path("/robots.txt");
    robots_url.set_query(None);
    robots_url.set_fragment(None);

    let response = match client.get(robots_url.as_str()).send().await {
        Ok(response) => response,
        Err(e) => {
            tracing::debug!("robots.txt unreachable at {}: {}", robots_url, e);
            return RobotsRules::allow_all();
        }
    };

    if !response.status().is_success() {
        tracing::debug!(
            "robots.txt at {} returned {}, allowing all",
            robots_url,
            response.status()
        );
        return RobotsRules::allow_all();
    }

    match response.text().await {
        Ok(body) => RobotsRules::from_content(&body),
        Err(e) => {
            tracing::debug!("Failed to read robots.txt at {}: {}", robots_url, e);
            RobotsRules::allow_all()
        }
    }
}

/// Robots gatekeeper shared by all workers
///
/// The cache lock is held while a missing entry is fetched, so each host's
/// robots.txt is requested at most once per day.
pub struct RobotsGuard {
    client: Client,
    /// Product token, not the full User-Agent header
    agent: String,
    enabled: bool,
    cache: Mutex<RobotsCache>,
}

impl RobotsGuard {
    pub fn new(client: Client, agent: &str, enabled: bool) -> Self {
        Self {
            client,
            agent: agent.to_string(),
            enabled,
            cache: Mutex::new(RobotsCache::new()),
        }
    }

    /// Returns the rules for the host of `url`, fetching them if needed
    pub async fn rules_for(&self, host: &str, url: &Url) -> RobotsRules {
        if !self.enabled {
            return RobotsRules::allow_all();
        }

        let mut cache = self.cache.lock().await;
        if let Some(rules) = cache.get(host) {
            return rules.clone();
        }

        let rules = fetch_robots(&self.client, url).await;
        cache.insert(host, rules.clone());
        rules
    }

    /// Checks `url` against its host's rules
    ///
    /// Returns whether the fetch is allowed plus any crawl-delay to honor.
    pub async fn check(&self, host: &str, url: &Url) -> (bool, Option<Duration>) {
        let rules = self.rules_for(host, url).await;
        (
            rules.is_allowed(url.as_str(), &self.agent),
            rules.crawl_delay(&self.agent),
        )
    }
}
