//! DepthOracle trait - per-destination backlog query

use std::sync::Arc;

use crate::{ContractError, Destination};

/// Backlog depth source
///
/// Depths are approximate and may be stale; callers treat them as a load
/// signal, never as an exact count.
#[trait_variant::make(DepthOracle: Send)]
pub trait LocalDepthOracle {
    /// Approximate number of messages waiting in `destination`
    ///
    /// # Errors
    /// Returns [`ContractError::DestinationQuery`] if the queue cannot be queried.
    async fn queue_depth(&self, destination: &Destination) -> Result<u64, ContractError>;
}

impl<T: DepthOracle + Sync> DepthOracle for Arc<T> {
    async fn queue_depth(&self, destination: &Destination) -> Result<u64, ContractError> {
        DepthOracle::queue_depth(&**self, destination).await
    }
}
