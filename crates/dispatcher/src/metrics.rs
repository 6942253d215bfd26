//! Pipeline metrics for observability

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

/// Metrics for a single application pipeline
#[derive(Debug, Default)]
pub struct PipelineMetrics {
    /// Current ingestion queue length
    queue_len: AtomicUsize,
    /// Entries accepted into the ingestion queue
    received_count: AtomicU64,
    /// Entries published to the live topic
    published_count: AtomicU64,
    /// Publish attempts that failed
    publish_failure_count: AtomicU64,
    /// Entries durably written
    persisted_count: AtomicU64,
    /// Bulk inserts performed
    batch_count: AtomicU64,
    /// Entries discarded after the pipeline failed
    dropped_count: AtomicU64,
}

impl PipelineMetrics {
    /// Create new metrics instance
    pub fn new() -> Self {
        Self::default()
    }

    pub fn queue_len(&self) -> usize {
        self.queue_len.load(Ordering::Relaxed)
    }

    pub fn set_queue_len(&self, len: usize) {
        self.queue_len.store(len, Ordering::Relaxed);
    }

    pub fn received_count(&self) -> u64 {
        self.received_count.load(Ordering::Relaxed)
    }

    pub fn inc_received_count(&self) {
        self.received_count.fetch_add(1, Ordering::Relaxed);
    }

    pub fn published_count(&self) -> u64 {
        self.published_count.load(Ordering::Relaxed)
    }

    pub fn inc_published_count(&self) {
        self.published_count.fetch_add(1, Ordering::Relaxed);
    }

    pub fn publish_failure_count(&self) -> u64 {
        self.publish_failure_count.load(Ordering::Relaxed)
    }

    pub fn inc_publish_failure_count(&self) {
        self.publish_failure_count.fetch_add(1, Ordering::Relaxed);
    }

    pub fn persisted_count(&self) -> u64 {
        self.persisted_count.load(Ordering::Relaxed)
    }

    /// Record one successful bulk insert of `size` entries
    pub fn record_batch(&self, size: usize) {
        self.batch_count.fetch_add(1, Ordering::Relaxed);
        self.persisted_count.fetch_add(size as u64, Ordering::Relaxed);
    }

    pub fn batch_count(&self) -> u64 {
        self.batch_count.load(Ordering::Relaxed)
    }

    pub fn dropped_count(&self) -> u64 {
        self.dropped_count.load(Ordering::Relaxed)
    }

    pub fn add_dropped_count(&self, count: usize) {
        self.dropped_count.fetch_add(count as u64, Ordering::Relaxed);
    }

    /// Get snapshot of all metrics
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            queue_len: self.queue_len(),
            received_count: self.received_count(),
            published_count: self.published_count(),
            publish_failure_count: self.publish_failure_count(),
            persisted_count: self.persisted_count(),
            batch_count: self.batch_count(),
            dropped_count: self.dropped_count(),
        }
    }
}

/// Snapshot of pipeline metrics (for reporting)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub queue_len: usize,
    pub received_count: u64,
    pub published_count: u64,
    pub publish_failure_count: u64,
    pub persisted_count: u64,
    pub batch_count: u64,
    pub dropped_count: u64,
}
