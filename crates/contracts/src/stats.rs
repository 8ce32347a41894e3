//! BatchStats - per-batch dispatch counters returned to the caller

use serde::{Deserialize, Serialize};

/// Counters for one processed batch
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchStats {
    /// Messages in the batch
    pub total: u64,
    /// First-time messages that got a destination
    pub processed: u64,
    /// Messages already claimed earlier
    pub duplicate: u64,
    /// Messages the sink accepted
    pub forwarded: u64,
    /// Messages the sink rejected (left unacknowledged)
    pub forward_failed: u64,
    /// Messages with a missing or malformed envelope
    pub validation_failed: u64,
    /// First-time messages with no admissible destination
    pub selection_failed: u64,
    /// Messages deleted from their source
    pub acknowledged: u64,
    /// Deletes that failed (message will be redelivered)
    pub ack_failed: u64,
}

impl BatchStats {
    /// Messages left unacknowledged on purpose
    pub fn failed(&self) -> u64 {
        self.validation_failed + self.selection_failed + self.forward_failed
    }

    /// Add another batch's counters into this one
    pub fn merge(&mut self, other: &BatchStats) {
        self.total += other.total;
        self.processed += other.processed;
        self.duplicate += other.duplicate;
        self.forwarded += other.forwarded;
        self.forward_failed += other.forward_failed;
        self.validation_failed += other.validation_failed;
        self.selection_failed += other.selection_failed;
        self.acknowledged += other.acknowledged;
        self.ack_failed += other.ack_failed;
    }
}
