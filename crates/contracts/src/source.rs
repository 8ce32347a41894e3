//! IngestionSource trait - bounded batch polling

use std::sync::Arc;

use crate::{ContractError, InboundMessage};

/// Source of inbound batches
///
/// Received messages stay invisible until acknowledged through an
/// [`AckSink`](crate::AckSink) or until the source redelivers them.
#[trait_variant::make(IngestionSource: Send)]
pub trait LocalIngestionSource {
    /// Source name (used for logging)
    fn name(&self) -> &str;

    /// Receive up to `max` messages; an empty vec means nothing is ready
    async fn receive_batch(&self, max: usize) -> Result<Vec<InboundMessage>, ContractError>;
}

impl<T: IngestionSource + Sync> IngestionSource for Arc<T> {
    fn name(&self) -> &str {
        IngestionSource::name(&**self)
    }

    async fn receive_batch(&self, max: usize) -> Result<Vec<InboundMessage>, ContractError> {
        IngestionSource::receive_batch(&**self, max).await
    }
}
