//! Batched send/delete entries and their per-item results.

use serde::{Deserialize, Serialize};

/// Failure code used when a whole batched call fails
pub const SEND_BATCH_ERROR: &str = "SendBatchError";

/// Failure code used when the sink reported nothing for an entry
pub const MISSING_RESULT: &str = "MissingResult";

/// One message to send to a destination
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutboundEntry {
    /// Entry id, unique within one call
    pub id: String,
    /// Message body
    pub body: String,
}

/// One message to delete from its source
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AckEntry {
    /// Entry id, unique within one call
    pub id: String,
    /// Receipt handle from the message's ack token
    pub receipt: String,
}

/// Per-entry failure reported by a sink
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryFailure {
    pub id: String,
    /// Machine-readable failure code
    pub code: String,
    pub message: String,
}

impl EntryFailure {
    pub fn new(id: impl Into<String>, code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            code: code.into(),
            message: message.into(),
        }
    }
}

/// Result of one batched send or delete call
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchEntryResult {
    /// Ids of entries that succeeded
    pub successful: Vec<String>,
    /// Entries that failed, with reason
    pub failed: Vec<EntryFailure>,
}

impl BatchEntryResult {
    /// Every entry succeeded
    pub fn all_successful<'a>(ids: impl IntoIterator<Item = &'a str>) -> Self {
        Self {
            successful: ids.into_iter().map(str::to_string).collect(),
            failed: Vec::new(),
        }
    }

    pub fn is_success(&self, id: &str) -> bool {
        self.successful.iter().any(|s| s == id)
    }

    pub fn failure(&self, id: &str) -> Option<&EntryFailure> {
        self.failed.iter().find(|f| f.id == id)
    }
}
