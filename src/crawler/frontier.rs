//! URL frontier: deduplication, depth/count bounds and record lifecycle
//!
//! All state lives behind one mutex. Workers block on it only for the
//! bookkeeping itself, never across a fetch.

use crate::extract::ContentKind;
use crate::state::UrlState;
use crate::url::{extract_domain, is_within_scope, normalize_url};
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Mutex, MutexGuard, PoisonError};
use tokio::sync::Notify;
use url::Url;

/// One URL tracked by the frontier
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UrlRecord {
    /// Normalized URL; its string form is the dedup key
    pub url: Url,
    pub host: String,
    /// Link distance from the seed set
    pub depth: u32,
    pub state: UrlState,
}

/// How a dispatched URL ended
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// Fetched and extracted; `links` are fed back into the frontier
    Visited { kind: ContentKind, links: Vec<Url> },
    Failed { reason: String },
    /// Deliberately not processed (image or suspicious)
    Skipped { kind: ContentKind, reason: String },
}

impl Outcome {
    pub fn failed(reason: impl Into<String>) -> Self {
        Outcome::Failed {
            reason: reason.into(),
        }
    }

    fn state(&self) -> UrlState {
        match self {
            Outcome::Visited { .. } => UrlState::Visited,
            Outcome::Failed { .. } => UrlState::Failed,
            Outcome::Skipped { .. } => UrlState::Skipped,
        }
    }
}

/// Counters describing the frontier at one instant
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrontierStats {
    pub seen: usize,
    pub pending: usize,
    pub in_flight: usize,
    pub visited: usize,
    pub failed: usize,
    pub skipped: usize,
}

#[derive(Debug, Default)]
struct Inner {
    /// Every URL ever admitted; never shrinks
    seen: HashSet<String>,
    pending: VecDeque<UrlRecord>,
    in_flight: HashMap<String, UrlRecord>,
    visited: usize,
    failed: usize,
    skipped: usize,
    kinds: HashMap<ContentKind, usize>,
}

/// The crawl frontier
///
/// Records move `pending -> in_flight -> visited | failed | skipped` exactly
/// once. A URL is admitted at most once per session, so no page is fetched
/// twice even when several pages link to it.
#[derive(Debug)]
pub struct Frontier {
    inner: Mutex<Inner>,
    scope: Url,
    max_depth: Option<u32>,
    max_pages: Option<usize>,
    changed: Notify,
}

impl Frontier {
    /// Creates an empty frontier
    ///
    /// # Arguments
    ///
    /// * `scope` - Base URL; only URLs on its host and under its path are admitted
    /// * `max_depth` - Deepest admitted depth, `None` for unbounded
    /// * `max_pages` - Ceiling on admitted records, `None` for unbounded
    pub fn new(scope: Url, max_depth: Option<u32>, max_pages: Option<usize>) -> Self {
        Self {
            inner: Mutex::new(Inner::default()),
            scope,
            max_depth,
            max_pages,
            changed: Notify::new(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Admits `url` as a pending record at `depth`
    ///
    /// Returns false without side effects when the URL is malformed, out of
    /// scope, already seen, deeper than the depth bound or past the page bound.
    pub fn enqueue(&self, url: &str, depth: u32) -> bool {
        let admitted = {
            let mut inner = self.lock();
            self.admit(&mut inner, url, depth)
        };
        if admitted {
            self.changed.notify_waiters();
        }
        admitted
    }

    fn admit(&self, inner: &mut Inner, raw: &str, depth: u32) -> bool {
        if self.max_depth.map_or(false, |max| depth > max) {
            return false;
        }

        let url = match normalize_url(raw) {
            Ok(url) => url,
            Err(e) => {
                tracing::debug!("Rejecting {}: {}", raw, e);
                return false;
            }
        };

        if !is_within_scope(&url, &self.scope) || inner.seen.contains(url.as_str()) {
            return false;
        }

        if self.max_pages.map_or(false, |max| inner.seen.len() >= max) {
            return false;
        }

        let Some(host) = extract_domain(&url) else {
            return false;
        };

        inner.seen.insert(url.as_str().to_string());
        inner.pending.push_back(UrlRecord {
            url,
            host,
            depth,
            state: UrlState::Pending,
        });
        true
    }

    /// Takes the oldest pending record and marks it in-flight
    pub fn next(&self) -> Option<UrlRecord> {
        let mut inner = self.lock();
        let mut record = inner.pending.pop_front()?;
        record.state = UrlState::InFlight;
        inner
            .in_flight
            .insert(record.url.as_str().to_string(), record.clone());
        Some(record)
    }

    /// Resolves an in-flight record
    ///
    /// For a visited record every discovered link is offered to the frontier
    /// at `depth + 1`. Returns how many links were admitted.
    pub fn complete(&self, url: &Url, outcome: Outcome) -> usize {
        let admitted = {
            let mut inner = self.lock();
            let Some(mut record) = inner.in_flight.remove(url.as_str()) else {
                tracing::warn!("Completion for {} which is not in flight", url);
                return 0;
            };

            let next_state = outcome.state();
            debug_assert!(record.state.can_transition_to(next_state));
            record.state = next_state;

            match outcome {
                Outcome::Visited { kind, links } => {
                    inner.visited += 1;
                    *inner.kinds.entry(kind).or_insert(0) += 1;
                    links
                        .iter()
                        .filter(|link| self.admit(&mut inner, link.as_str(), record.depth + 1))
                        .count()
                }
                Outcome::Failed { reason } => {
                    tracing::debug!("{} failed: {}", record.url, reason);
                    inner.failed += 1;
                    0
                }
                Outcome::Skipped { kind, reason } => {
                    tracing::debug!("{} skipped: {}", record.url, reason);
                    inner.skipped += 1;
                    *inner.kinds.entry(kind).or_insert(0) += 1;
                    0
                }
            }
        };

        self.changed.notify_waiters();
        admitted
    }

    /// True once nothing is pending and nothing is in flight
    pub fn is_exhausted(&self) -> bool {
        let inner = self.lock();
        inner.pending.is_empty() && inner.in_flight.is_empty()
    }

    /// Fails every record still in flight and returns their URLs
    ///
    /// Used after the worker pool has stopped so that no record stays in
    /// limbo after a cancelled crawl.
    pub fn abandon_in_flight(&self, reason: &str) -> Vec<Url> {
        let abandoned: Vec<Url> = {
            let mut inner = self.lock();
            let drained: Vec<UrlRecord> = inner.in_flight.drain().map(|(_, r)| r).collect();
            inner.failed += drained.len();
            drained.into_iter().map(|record| record.url).collect()
        };

        for url in &abandoned {
            tracing::debug!("{} abandoned: {}", url, reason);
        }
        if !abandoned.is_empty() {
            self.changed.notify_waiters();
        }
        abandoned
    }

    pub fn pending_len(&self) -> usize {
        self.lock().pending.len()
    }

    pub fn stats(&self) -> FrontierStats {
        let inner = self.lock();
        FrontierStats {
            seen: inner.seen.len(),
            pending: inner.pending.len(),
            in_flight: inner.in_flight.len(),
            visited: inner.visited,
            failed: inner.failed,
            skipped: inner.skipped,
        }
    }

    /// Visited and skipped records per content kind
    pub fn kind_counts(&self) -> Vec<(ContentKind, usize)> {
        self.lock()
            .kinds
            .iter()
            .map(|(kind, count)| (*kind, *count))
            .collect()
    }

    /// Resolves the next time records are admitted or completed
    pub async fn changed(&self) {
        self.changed.notified().await
    }
}
