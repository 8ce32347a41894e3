//! Dispatch error types

use contracts::ContractError;
use thiserror::Error;

/// Dispatch errors
///
/// Per-message failures never surface here; they are recorded in the
/// batch report. Only batch-level conditions do.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// Idempotency store failed during claim; nothing in the batch was forwarded or acknowledged
    #[error("batch aborted: {0}")]
    Aborted(#[source] ContractError),

    /// Polling the ingestion source failed
    #[error("failed to receive from '{source_name}': {source}")]
    Receive {
        source_name: String,
        #[source]
        source: ContractError,
    },
}

impl DispatchError {
    /// Create a receive error
    pub fn receive(source_name: impl Into<String>, source: ContractError) -> Self {
        Self::Receive {
            source_name: source_name.into(),
            source,
        }
    }

    /// Batch was aborted by a fatal store error
    pub fn is_aborted(&self) -> bool {
        matches!(self, Self::Aborted(_))
    }
}
