//! ForwardSink / AckSink traits - batched send and delete
//!
//! Both report per-entry outcomes; an `Err` means the whole call failed.

use std::sync::Arc;

use crate::{AckEntry, BatchEntryResult, ContractError, Destination, OutboundEntry};

/// Reference maximum entries per batched call
pub const DEFAULT_MAX_BATCH_SIZE: usize = 10;

/// Batched send to destination queues
#[trait_variant::make(ForwardSink: Send)]
pub trait LocalForwardSink {
    /// Maximum entries accepted by one `send_batch` call
    fn max_send_batch(&self) -> usize;

    /// Send `entries` to `destination`
    ///
    /// # Errors
    /// Returns [`ContractError::SinkSend`] when the call as a whole fails.
    async fn send_batch(
        &self,
        destination: &Destination,
        entries: &[OutboundEntry],
    ) -> Result<BatchEntryResult, ContractError>;
}

/// Batched delete from an ingestion source
#[trait_variant::make(AckSink: Send)]
pub trait LocalAckSink {
    /// Maximum entries accepted by one `delete_batch` call
    fn max_delete_batch(&self) -> usize;

    /// Delete `entries` from `source`
    ///
    /// # Errors
    /// Returns [`ContractError::SinkDelete`] when the call as a whole fails.
    async fn delete_batch(
        &self,
        source: &str,
        entries: &[AckEntry],
    ) -> Result<BatchEntryResult, ContractError>;
}

impl<T: ForwardSink + Sync> ForwardSink for Arc<T> {
    fn max_send_batch(&self) -> usize {
        ForwardSink::max_send_batch(&**self)
    }

    async fn send_batch(
        &self,
        destination: &Destination,
        entries: &[OutboundEntry],
    ) -> Result<BatchEntryResult, ContractError> {
        ForwardSink::send_batch(&**self, destination, entries).await
    }
}

impl<T: AckSink + Sync> AckSink for Arc<T> {
    fn max_delete_batch(&self) -> usize {
        AckSink::max_delete_batch(&**self)
    }

    async fn delete_batch(
        &self,
        source: &str,
        entries: &[AckEntry],
    ) -> Result<BatchEntryResult, ContractError> {
        AckSink::delete_batch(&**self, source, entries).await
    }
}
