//! Robots.txt rule evaluation
//!
//! Allow/Disallow matching is delegated to the robotstxt crate; the
//! Crawl-delay directive is not part of that crate and is parsed here.

use robotstxt::DefaultMatcher;
use std::time::Duration;

/// Rules parsed from one host's robots.txt
#[derive(Debug, Clone)]
pub struct RobotsRules {
    /// Raw robots.txt body; empty means everything is allowed
    content: String,
}

impl RobotsRules {
    /// Wraps a robots.txt body
    pub fn from_content(content: &str) -> Self {
        Self {
            content: content.to_string(),
        }
    }

    /// Rules that allow every URL
    ///
    /// Used when robots.txt is missing, unreachable or robots handling is off.
    pub fn allow_all() -> Self {
        Self {
            content: String::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.content.trim().is_empty()
    }

    /// Checks whether `url` (absolute) may be fetched by `user_agent`
    pub fn is_allowed(&self, url: &str, user_agent: &str) -> bool {
        if self.is_empty() {
            return true;
        }

        let mut matcher = DefaultMatcher::default();
        matcher.one_agent_allowed_by_robots(&self.content, user_agent, url)
    }

    /// Crawl-delay that applies to `user_agent`
    ///
    /// A group naming the agent wins over the `*` group. Group agents are
    /// matched case-insensitively as substrings of `user_agent`, so both a
    /// product token and a full header work.
    pub fn crawl_delay(&self, user_agent: &str) -> Option<Duration> {
        if self.is_empty() {
            return None;
        }

        let agent = user_agent.to_lowercase();
        let mut group: Vec<String> = Vec::new();
        let mut group_closed = false;
        let mut specific = None;
        let mut wildcard = None;

        for line in self.content.lines() {
            let line = line.split('#').next().unwrap_or("").trim();
            let Some((key, value)) = line.split_once(':') else {
                continue;
            };
            let value = value.trim();

            match key.trim().to_lowercase().as_str() {
                "user-agent" => {
                    // An agent line after any rule starts a new group
                    if group_closed {
                        group.clear();
                        group_closed = false;
                    }
                    group.push(value.to_lowercase());
                }
                "crawl-delay" => {
                    group_closed = true;
                    let Some(delay) = parse_delay(value) else {
                        continue;
                    };
                    for member in &group {
                        if member == "*" {
                            wildcard.get_or_insert(delay);
                        } else if !member.is_empty() && agent.contains(member.as_str()) {
                            specific.get_or_insert(delay);
                        }
                    }
                }
                _ => group_closed = true,
            }
        }

        specific.or(wildcard)
    }
}

/// Longest Crawl-delay honored; larger values are clamped to it
const MAX_CRAWL_DELAY_SECS: f64 = 60.0;

fn parse_delay(value: &str) -> Option<Duration> {
    let seconds: f64 = value.parse().ok()?;
    if seconds.is_nan() || seconds < 0.0 {
        return None;
    }
    Duration::try_from_secs_f64(seconds.min(MAX_CRAWL_DELAY_SECS)).ok()
}
