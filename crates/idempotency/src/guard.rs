//! Claim-or-reject guard over an [`IdempotencyStore`].

use std::time::Duration;

use chrono::Utc;
use contracts::{ContractError, IdempotencyRecord, IdempotencyStore, InsertOutcome};
use observability::record_claim;
use tracing::{debug, error, instrument};

use crate::hash::body_hash;

/// Default duplicate-detection window
pub const DEFAULT_RETENTION: Duration = Duration::from_secs(7 * 24 * 60 * 60);

/// `now + retention` in unix seconds, saturating at `i64::MAX`
fn expiry(now: i64, retention: Duration) -> i64 {
    now.saturating_add(i64::try_from(retention.as_secs()).unwrap_or(i64::MAX))
}

/// Atomic first-time check per logical message id
///
/// The store's conditional insert is the only source of truth; the guard
/// keeps no local state, so any number of workers may share one store.
pub struct IdempotencyGuard<S> {
    store: S,
    retention: Duration,
}

impl<S: IdempotencyStore + Sync> IdempotencyGuard<S> {
    pub fn new(store: S, retention: Duration) -> Self {
        Self { store, retention }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn retention(&self) -> Duration {
        self.retention
    }

    /// Claim `request_id`
    ///
    /// Returns `Ok(true)` for the first claim inside the retention window and
    /// `Ok(false)` for a duplicate.
    ///
    /// # Errors
    /// Any store failure other than "already exists" is returned as
    /// [`ContractError::StoreUnavailable`]; callers must not treat it as
    /// either outcome.
    #[instrument(name = "idempotency_claim", skip(self, body), fields(request_id = %request_id))]
    pub async fn claim(&self, request_id: &str, body: &str) -> Result<bool, ContractError> {
        let now = Utc::now();
        let record = IdempotencyRecord {
            request_id: request_id.to_string(),
            body_hash: body_hash(body),
            processed_at: now,
            expires_at: expiry(now.timestamp(), self.retention),
        };

        match self.store.put_if_absent(record).await {
            Ok(InsertOutcome::Inserted) => {
                record_claim(true);
                debug!("First-time message claimed");
                Ok(true)
            }
            Ok(InsertOutcome::AlreadyExists) => {
                record_claim(false);
                debug!("Duplicate message");
                Ok(false)
            }
            Err(e) => {
                error!(error = %e, "Idempotency store failure");
                Err(ContractError::store_unavailable(request_id, e))
            }
        }
    }

    /// Fetch the live claim record for `request_id`
    pub async fn lookup(
        &self,
        request_id: &str,
    ) -> Result<Option<IdempotencyRecord>, ContractError> {
        self.store
            .get(request_id)
            .await
            .map_err(|e| ContractError::store_unavailable(request_id, e))
    }
}
