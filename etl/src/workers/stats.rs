use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug, Default)]
struct Counters {
    records_extracted: AtomicU64,
    records_transformed: AtomicU64,
    records_loaded: AtomicU64,
    pages_fetched: AtomicU64,
    batches_flushed: AtomicU64,
    batches_failed: AtomicU64,
}

/// Live counters shared by every worker of a run.
///
/// Each record is counted once per stage, when it has been handed to the next stage.
#[derive(Debug, Clone, Default)]
pub struct RunStats {
    counters: Arc<Counters>,
}

impl RunStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record_extracted(&self) {
        self.counters
            .records_extracted
            .fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_transformed(&self) {
        self.counters
            .records_transformed
            .fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn page_fetched(&self) {
        self.counters.pages_fetched.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn batch_flushed(&self, size: usize) {
        self.counters.batches_flushed.fetch_add(1, Ordering::Relaxed);
        self.counters
            .records_loaded
            .fetch_add(size as u64, Ordering::Relaxed);
    }

    pub(crate) fn batch_failed(&self) {
        self.counters.batches_failed.fetch_add(1, Ordering::Relaxed);
    }

    /// Returns a point-in-time copy of the counters.
    pub fn snapshot(&self) -> RunCounts {
        let c = &self.counters;
        RunCounts {
            records_extracted: c.records_extracted.load(Ordering::Relaxed),
            records_transformed: c.records_transformed.load(Ordering::Relaxed),
            records_loaded: c.records_loaded.load(Ordering::Relaxed),
            pages_fetched: c.pages_fetched.load(Ordering::Relaxed),
            batches_flushed: c.batches_flushed.load(Ordering::Relaxed),
            batches_failed: c.batches_failed.load(Ordering::Relaxed),
        }
    }
}

/// Counter values at one point in time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunCounts {
    /// Records pushed onto the extract queue.
    pub records_extracted: u64,
    /// Records pushed onto the load queue.
    pub records_transformed: u64,
    /// Records in committed batches.
    pub records_loaded: u64,
    pub pages_fetched: u64,
    pub batches_flushed: u64,
    pub batches_failed: u64,
}

impl RunCounts {
    /// Records read from the source that never reached a committed batch.
    pub fn records_dropped(&self) -> u64 {
        self.records_extracted.saturating_sub(self.records_loaded)
    }
}
