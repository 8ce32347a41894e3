//! Idempotency record - the only durable state of the distributor

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Claim record, keyed by `request_id`
///
/// Created once by an atomic insert-if-absent and never mutated afterward.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdempotencyRecord {
    /// Logical message id (primary key)
    pub request_id: String,

    /// SHA-256 of the message body, lowercase hex (audit only)
    pub body_hash: String,

    /// When the claim was made
    pub processed_at: DateTime<Utc>,

    /// Expiry as unix seconds; the store drops the record after this
    pub expires_at: i64,
}

impl IdempotencyRecord {
    /// Whether the record has expired at `now` (unix seconds)
    pub fn is_expired_at(&self, now: i64) -> bool {
        self.expires_at <= now
    }
}

/// Outcome of a conditional insert
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    /// No live record existed; ours was written
    Inserted,
    /// A live record already exists for the key
    AlreadyExists,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expiry_boundary() {
        let record = IdempotencyRecord {
            request_id: "req-1".to_string(),
            body_hash: "00".to_string(),
            processed_at: Utc::now(),
            expires_at: 1_000,
        };
        assert!(!record.is_expired_at(999));
        assert!(record.is_expired_at(1_000));
        assert!(record.is_expired_at(1_001));
    }
}
