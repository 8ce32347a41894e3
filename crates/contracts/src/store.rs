//! IdempotencyStore trait - conditional insert + point lookup

use std::sync::Arc;

use crate::{IdempotencyRecord, InsertOutcome, StoreError};

/// Durable key-value store for claim records
///
/// Implementations must make `put_if_absent` atomic across every process that
/// shares the store: it is the only cross-worker correctness primitive.
/// Records whose `expires_at` has passed count as absent.
#[trait_variant::make(IdempotencyStore: Send)]
pub trait LocalIdempotencyStore {
    /// Write `record` only if no live record exists for its `request_id`
    async fn put_if_absent(&self, record: IdempotencyRecord) -> Result<InsertOutcome, StoreError>;

    /// Fetch the live record for `request_id`
    async fn get(&self, request_id: &str) -> Result<Option<IdempotencyRecord>, StoreError>;
}

impl<T: IdempotencyStore + Sync> IdempotencyStore for Arc<T> {
    async fn put_if_absent(&self, record: IdempotencyRecord) -> Result<InsertOutcome, StoreError> {
        IdempotencyStore::put_if_absent(&**self, record).await
    }

    async fn get(&self, request_id: &str) -> Result<Option<IdempotencyRecord>, StoreError> {
        IdempotencyStore::get(&**self, request_id).await
    }
}
