//! Per-host robots.txt cache with a 24 hour lifetime

use crate::robots::RobotsRules;
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;

/// How long a fetched robots.txt stays valid
const ROBOTS_TTL_HOURS: i64 = 24;

/// Robots rules for a host together with the time they were fetched
#[derive(Debug, Clone)]
pub struct CachedRobots {
    pub rules: RobotsRules,
    pub fetched_at: DateTime<Utc>,
}

impl CachedRobots {
    pub fn new(rules: RobotsRules) -> Self {
        Self {
            rules,
            fetched_at: Utc::now(),
        }
    }

    /// Checks if the cached entry is older than 24 hours
    pub fn is_stale(&self) -> bool {
        Utc::now() - self.fetched_at > Duration::hours(ROBOTS_TTL_HOURS)
    }
}

/// Map of host to cached robots rules
#[derive(Debug, Default)]
pub struct RobotsCache {
    entries: HashMap<String, CachedRobots>,
}

impl RobotsCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns fresh rules for `host`, or None if absent or stale
    pub fn get(&self, host: &str) -> Option<&RobotsRules> {
        self.entries
            .get(host)
            .filter(|entry| !entry.is_stale())
            .map(|entry| &entry.rules)
    }

    pub fn insert(&mut self, host: &str, rules: RobotsRules) {
        self.entries
            .insert(host.to_string(), CachedRobots::new(rules));
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
