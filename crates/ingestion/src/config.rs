//! Broker configuration and counters

use std::sync::atomic::{AtomicU64, Ordering};

use contracts::DEFAULT_MAX_BATCH_SIZE;

/// In-memory broker configuration
#[derive(Debug, Clone)]
pub struct BrokerConfig {
    /// Name of the ingestion queue (also the ack target)
    pub source_name: String,

    /// Max entries per `send_batch`
    pub max_send_batch: usize,

    /// Max entries per `delete_batch`
    pub max_delete_batch: usize,
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            source_name: "ingestion".to_string(),
            max_send_batch: DEFAULT_MAX_BATCH_SIZE,
            max_delete_batch: DEFAULT_MAX_BATCH_SIZE,
        }
    }
}

/// Broker call counters
#[derive(Debug, Default)]
pub struct BrokerMetrics {
    /// Messages handed out by `receive_batch`
    pub received: AtomicU64,

    /// Messages put back after visibility expiry
    pub redelivered: AtomicU64,

    /// `send_batch` calls
    pub send_calls: AtomicU64,

    /// Entries stored in destination queues
    pub sent: AtomicU64,

    /// `delete_batch` calls
    pub delete_calls: AtomicU64,

    /// Entries deleted from the ingestion queue
    pub deleted: AtomicU64,

    /// `queue_depth` calls
    pub depth_queries: AtomicU64,
}

impl BrokerMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn add(counter: &AtomicU64, n: u64) {
        counter.fetch_add(n, Ordering::Relaxed);
    }

    /// Get snapshot
    pub fn snapshot(&self) -> BrokerMetricsSnapshot {
        BrokerMetricsSnapshot {
            received: self.received.load(Ordering::Relaxed),
            redelivered: self.redelivered.load(Ordering::Relaxed),
            send_calls: self.send_calls.load(Ordering::Relaxed),
            sent: self.sent.load(Ordering::Relaxed),
            delete_calls: self.delete_calls.load(Ordering::Relaxed),
            deleted: self.deleted.load(Ordering::Relaxed),
            depth_queries: self.depth_queries.load(Ordering::Relaxed),
        }
    }
}

/// Counters snapshot
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BrokerMetricsSnapshot {
    pub received: u64,
    pub redelivered: u64,
    pub send_calls: u64,
    pub sent: u64,
    pub delete_calls: u64,
    pub deleted: u64,
    pub depth_queries: u64,
}
