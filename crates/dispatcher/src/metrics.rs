//! Process-lifetime dispatch counters

use std::sync::atomic::{AtomicU64, Ordering};

use contracts::BatchStats;

/// Cumulative counters across every batch handled by one pipeline
#[derive(Debug, Default)]
pub struct DispatchMetrics {
    /// Completed batches
    batches: AtomicU64,
    /// Batches aborted by a fatal store error
    aborted_batches: AtomicU64,
    /// Messages in completed batches
    messages: AtomicU64,
    forwarded: AtomicU64,
    duplicates: AtomicU64,
    /// Validation + selection + forward failures
    failed: AtomicU64,
    acknowledged: AtomicU64,
    ack_failed: AtomicU64,
}

impl DispatchMetrics {
    /// Create new metrics instance
    pub fn new() -> Self {
        Self::default()
    }

    /// Accumulate one completed batch
    pub fn record_batch(&self, stats: &BatchStats) {
        self.batches.fetch_add(1, Ordering::Relaxed);
        self.messages.fetch_add(stats.total, Ordering::Relaxed);
        self.forwarded.fetch_add(stats.forwarded, Ordering::Relaxed);
        self.duplicates.fetch_add(stats.duplicate, Ordering::Relaxed);
        self.failed.fetch_add(stats.failed(), Ordering::Relaxed);
        self.acknowledged
            .fetch_add(stats.acknowledged, Ordering::Relaxed);
        self.ack_failed.fetch_add(stats.ack_failed, Ordering::Relaxed);
    }

    /// Increment aborted batch count
    pub fn record_aborted(&self) {
        self.aborted_batches.fetch_add(1, Ordering::Relaxed);
    }

    pub fn batches(&self) -> u64 {
        self.batches.load(Ordering::Relaxed)
    }

    pub fn aborted_batches(&self) -> u64 {
        self.aborted_batches.load(Ordering::Relaxed)
    }

    /// Get snapshot of all counters
    pub fn snapshot(&self) -> DispatchMetricsSnapshot {
        DispatchMetricsSnapshot {
            batches: self.batches(),
            aborted_batches: self.aborted_batches(),
            messages: self.messages.load(Ordering::Relaxed),
            forwarded: self.forwarded.load(Ordering::Relaxed),
            duplicates: self.duplicates.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            acknowledged: self.acknowledged.load(Ordering::Relaxed),
            ack_failed: self.ack_failed.load(Ordering::Relaxed),
        }
    }
}

/// Snapshot of dispatch counters (for reporting)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchMetricsSnapshot {
    pub batches: u64,
    pub aborted_batches: u64,
    pub messages: u64,
    pub forwarded: u64,
    pub duplicates: u64,
    pub failed: u64,
    pub acknowledged: u64,
    pub ack_failed: u64,
}
