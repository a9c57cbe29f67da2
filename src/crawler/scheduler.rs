//! Dynamic worker pool that drains the frontier
//!
//! Workers pull records from the [`Frontier`] (pull model). After every unit
//! of work a worker reports back over a channel and the scheduler re-sizes
//! the pool from the pending queue length:
//!
//! ```text
//! desired = clamp(ceil(pending / urls_per_worker), 1, max_concurrency)
//! ```
//!
//! Growth spawns new workers, bounded by a semaphore holding
//! `max_concurrency` permits. Shrinking is cooperative: a worker that finds
//! the pool larger than desired retires before pulling its next record, but
//! the last worker never retires.

use crate::config::CrawlerConfig;
use crate::crawler::frontier::{Frontier, Outcome, UrlRecord};
use async_trait::async_trait;
use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{mpsc, watch, OwnedSemaphorePermit, Semaphore};
use tokio::task::JoinSet;

/// Processes one URL record to a terminal outcome
///
/// Implementations must not panic; a panic is still caught and recorded as a
/// failed outcome so the record never stays in flight.
#[async_trait]
pub trait UrlHandler: Send + Sync {
    async fn handle(&self, record: &UrlRecord) -> Outcome;
}

/// Cloneable trigger for cooperative cancellation
#[derive(Debug, Clone)]
pub struct ShutdownHandle {
    tx: Arc<watch::Sender<bool>>,
}

impl ShutdownHandle {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { tx: Arc::new(tx) }
    }

    /// Asks every worker to stop; in-flight records are completed as failed
    pub fn trigger(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_triggered(&self) -> bool {
        *self.tx.borrow()
    }

    fn subscribe(&self) -> watch::Receiver<bool> {
        self.tx.subscribe()
    }
}

impl Default for ShutdownHandle {
    fn default() -> Self {
        Self::new()
    }
}

/// Resolves once shutdown has been triggered
async fn wait_for_shutdown(rx: &mut watch::Receiver<bool>) {
    if rx.wait_for(|triggered| *triggered).await.is_err() {
        // Sender gone: shutdown can no longer be requested
        std::future::pending::<()>().await;
    }
}

/// Pool sizing parameters
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    pub max_concurrency: usize,
    pub urls_per_worker: usize,
    /// Wait when the frontier is transiently empty
    pub idle_backoff: Duration,
    /// Log progress every N completed records
    pub progress_interval: u64,
}

impl From<&CrawlerConfig> for SchedulerConfig {
    fn from(config: &CrawlerConfig) -> Self {
        Self {
            max_concurrency: config.max_concurrency,
            urls_per_worker: config.urls_per_worker,
            idle_backoff: Duration::from_millis(config.idle_backoff_ms),
            progress_interval: config.progress_interval,
        }
    }
}

/// Number of workers the pool should have for `pending` queued records
///
/// # Examples
///
/// ```
/// use wormcrawl::crawler::desired_workers;
///
/// assert_eq!(desired_workers(0, 10, 6), 1);
/// assert_eq!(desired_workers(25, 10, 6), 3);
/// assert_eq!(desired_workers(1000, 10, 6), 6);
/// ```
pub fn desired_workers(pending: usize, urls_per_worker: usize, max_concurrency: usize) -> usize {
    let per_worker = urls_per_worker.max(1);
    pending
        .div_ceil(per_worker)
        .clamp(1, max_concurrency.max(1))
}

/// What the pool did during one run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SchedulerSummary {
    /// Records that reached a terminal outcome through a worker
    pub processed: u64,
    pub peak_workers: usize,
    pub cancelled: bool,
}

enum WorkerEvent {
    UnitDone,
}

/// State shared between the scheduler loop and its workers
struct Pool {
    frontier: Arc<Frontier>,
    handler: Arc<dyn UrlHandler>,
    config: SchedulerConfig,
    active: AtomicUsize,
    desired: AtomicUsize,
    events: mpsc::UnboundedSender<WorkerEvent>,
}

impl Pool {
    /// Leaves the pool if it is larger than desired, keeping at least one worker
    fn try_retire(&self) -> bool {
        let mut current = self.active.load(Ordering::Acquire);
        loop {
            if current <= 1 || current <= self.desired.load(Ordering::Acquire) {
                return false;
            }
            match self.active.compare_exchange(
                current,
                current - 1,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => return true,
                Err(actual) => current = actual,
            }
        }
    }

    async fn run_worker(
        self: Arc<Self>,
        id: usize,
        _permit: OwnedSemaphorePermit,
        mut shutdown: watch::Receiver<bool>,
    ) {
        tracing::debug!("Worker {} started", id);
        let mut retired = false;

        loop {
            if *shutdown.borrow() {
                break;
            }
            if self.try_retire() {
                retired = true;
                tracing::debug!("Worker {} retired, pool shrinking", id);
                break;
            }

            let Some(record) = self.frontier.next() else {
                if self.frontier.is_exhausted() {
                    break;
                }
                // Another worker may still enqueue links
                tokio::select! {
                    _ = tokio::time::timeout(self.config.idle_backoff, self.frontier.changed()) => {}
                    _ = wait_for_shutdown(&mut shutdown) => {}
                }
                continue;
            };

            let work = AssertUnwindSafe(self.handler.handle(&record)).catch_unwind();
            let outcome = tokio::select! {
                result = work => result.unwrap_or_else(|_| {
                    tracing::error!("Handler panicked on {}", record.url);
                    Outcome::failed("handler panicked")
                }),
                _ = wait_for_shutdown(&mut shutdown) => Outcome::failed("cancelled"),
            };

            self.frontier.complete(&record.url, outcome);
            // Receiver gone means the scheduler is tearing down
            let _ = self.events.send(WorkerEvent::UnitDone);
        }

        if !retired {
            self.active.fetch_sub(1, Ordering::AcqRel);
        }
        tracing::debug!("Worker {} stopped", id);
    }
}

/// Drives a pool of workers until the frontier is exhausted or shutdown
pub struct Scheduler {
    frontier: Arc<Frontier>,
    handler: Arc<dyn UrlHandler>,
    config: SchedulerConfig,
    shutdown: ShutdownHandle,
}

impl Scheduler {
    pub fn new(
        frontier: Arc<Frontier>,
        handler: Arc<dyn UrlHandler>,
        config: SchedulerConfig,
        shutdown: ShutdownHandle,
    ) -> Self {
        Self {
            frontier,
            handler,
            config,
            shutdown,
        }
    }

    pub fn shutdown_handle(&self) -> ShutdownHandle {
        self.shutdown.clone()
    }

    /// Runs the pool to completion
    ///
    /// Returns once every worker has exited, which happens when the frontier
    /// is exhausted or shutdown was triggered. Per-URL failures never abort
    /// the run; they are recorded in the frontier.
    pub async fn run(&self) -> SchedulerSummary {
        let (events_tx, mut events_rx) = mpsc::unbounded_channel();
        let pool = Arc::new(Pool {
            frontier: Arc::clone(&self.frontier),
            handler: Arc::clone(&self.handler),
            config: self.config.clone(),
            active: AtomicUsize::new(0),
            desired: AtomicUsize::new(1),
            events: events_tx,
        });
        let permits = Arc::new(Semaphore::new(self.config.max_concurrency.max(1)));
        let mut workers = JoinSet::new();
        let mut summary = SchedulerSummary::default();
        let mut next_id = 0usize;
        let started = Instant::now();

        self.rebalance(&pool, &permits, &mut workers, &mut next_id, &mut summary);

        loop {
            tokio::select! {
                Some(WorkerEvent::UnitDone) = events_rx.recv() => {
                    summary.processed += 1;
                    if summary.processed % self.config.progress_interval.max(1) == 0 {
                        self.log_progress(&pool, summary.processed, started);
                    }
                    if !self.shutdown.is_triggered() {
                        self.rebalance(&pool, &permits, &mut workers, &mut next_id, &mut summary);
                    }
                }
                joined = workers.join_next() => match joined {
                    Some(Ok(())) => {}
                    Some(Err(e)) => tracing::error!("Worker task failed: {}", e),
                    None => {
                        if self.shutdown.is_triggered() || self.frontier.is_exhausted() {
                            break;
                        }
                        // Pending work but every worker is gone
                        self.rebalance(&pool, &permits, &mut workers, &mut next_id, &mut summary);
                    }
                },
            }
        }

        // Drain completions reported after the last select
        while let Ok(WorkerEvent::UnitDone) = events_rx.try_recv() {
            summary.processed += 1;
        }

        summary.cancelled = self.shutdown.is_triggered();
        summary
    }

    fn rebalance(
        &self,
        pool: &Arc<Pool>,
        permits: &Arc<Semaphore>,
        workers: &mut JoinSet<()>,
        next_id: &mut usize,
        summary: &mut SchedulerSummary,
    ) {
        let desired = desired_workers(
            self.frontier.pending_len(),
            self.config.urls_per_worker,
            self.config.max_concurrency,
        );
        pool.desired.store(desired, Ordering::Release);

        while pool.active.load(Ordering::Acquire) < desired {
            let Ok(permit) = Arc::clone(permits).try_acquire_owned() else {
                break;
            };
            pool.active.fetch_add(1, Ordering::AcqRel);
            *next_id += 1;
            workers.spawn(Arc::clone(pool).run_worker(*next_id, permit, self.shutdown.subscribe()));
        }

        let active = pool.active.load(Ordering::Acquire);
        if active > summary.peak_workers {
            tracing::debug!("Worker pool grew to {}", active);
            summary.peak_workers = active;
        }
    }

    fn log_progress(&self, pool: &Pool, processed: u64, started: Instant) {
        let stats = self.frontier.stats();
        let elapsed = started.elapsed().as_secs_f64();
        let rate = if elapsed > 0.0 {
            processed as f64 / elapsed
        } else {
            0.0
        };
        tracing::info!(
            "Progress: {} done ({} visited, {} failed, {} skipped), {} pending, {} in flight, {} workers, {:.1} URLs/s",
            processed,
            stats.visited,
            stats.failed,
            stats.skipped,
            stats.pending,
            stats.in_flight,
            pool.active.load(Ordering::Relaxed),
            rate
        );
    }
}
