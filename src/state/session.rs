use std::sync::atomic::{AtomicU64, Ordering};

/// Aggregate counters for one crawl session
///
/// Workers bump these without taking any lock; the report reads a snapshot.
#[derive(Debug, Default)]
pub struct SessionStats {
    pages_fetched: AtomicU64,
    bytes_processed: AtomicU64,
    rendered: AtomicU64,
}

/// Point-in-time copy of [`SessionStats`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionSnapshot {
    pub pages_fetched: u64,
    pub bytes_processed: u64,
    pub rendered: u64,
}

impl SessionStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a successfully fetched resource of `bytes` length
    pub fn record_fetch(&self, bytes: usize) {
        self.pages_fetched.fetch_add(1, Ordering::Relaxed);
        self.bytes_processed
            .fetch_add(bytes as u64, Ordering::Relaxed);
    }

    /// Records a resource that went through the headless renderer
    pub fn record_render(&self) {
        self.rendered.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            pages_fetched: self.pages_fetched.load(Ordering::Relaxed),
            bytes_processed: self.bytes_processed.load(Ordering::Relaxed),
            rendered: self.rendered.load(Ordering::Relaxed),
        }
    }
}
