//! 内存幂等存储
//!
//! 单进程内的 [`IdempotencyStore`] 实现：互斥锁保证 insert-if-absent 原子性，
//! 过期记录视为不存在。每 [`SWEEP_INTERVAL`] 次写入顺带清理一次过期记录，
//! 长期运行时内存占用受保留窗口约束。

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use chrono::Utc;
use contracts::{IdempotencyRecord, IdempotencyStore, InsertOutcome, StoreError};
use tracing::debug;

/// Inserts between opportunistic sweeps of expired records
pub const SWEEP_INTERVAL: usize = 256;

/// 内存幂等存储
#[derive(Debug, Default)]
pub struct MemoryIdempotencyStore {
    records: Mutex<HashMap<String, IdempotencyRecord>>,
    inserts: AtomicUsize,
}

impl MemoryIdempotencyStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 当前保存的记录数（含已过期、尚未清理的记录）
    pub fn len(&self) -> usize {
        self.records.lock().map(|r| r.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// 清理所有已过期记录，返回清理数量
    pub fn purge_expired(&self) -> Result<usize, StoreError> {
        self.purge_expired_at(Utc::now().timestamp())
    }

    /// 以 `now`（unix 秒）为基准清理过期记录
    pub fn purge_expired_at(&self, now: i64) -> Result<usize, StoreError> {
        let mut records = self.lock()?;
        Ok(sweep(&mut records, now))
    }

    fn lock(
        &self,
    ) -> Result<std::sync::MutexGuard<'_, HashMap<String, IdempotencyRecord>>, StoreError> {
        self.records
            .lock()
            .map_err(|_| StoreError::Corrupted("idempotency store lock poisoned".to_string()))
    }
}

fn sweep(records: &mut HashMap<String, IdempotencyRecord>, now: i64) -> usize {
    let before = records.len();
    records.retain(|_, record| !record.is_expired_at(now));
    let purged = before - records.len();
    if purged > 0 {
        debug!(purged, remaining = records.len(), "Expired claims purged");
    }
    purged
}

impl IdempotencyStore for MemoryIdempotencyStore {
    async fn put_if_absent(&self, record: IdempotencyRecord) -> Result<InsertOutcome, StoreError> {
        let now = Utc::now().timestamp();
        let mut records = self.lock()?;

        if let Some(existing) = records.get(&record.request_id) {
            if !existing.is_expired_at(now) {
                return Ok(InsertOutcome::AlreadyExists);
            }
        }

        records.insert(record.request_id.clone(), record);

        let inserts = self.inserts.fetch_add(1, Ordering::Relaxed) + 1;
        if inserts % SWEEP_INTERVAL == 0 {
            sweep(&mut records, now);
        }
        Ok(InsertOutcome::Inserted)
    }

    async fn get(&self, request_id: &str) -> Result<Option<IdempotencyRecord>, StoreError> {
        let now = Utc::now().timestamp();
        let records = self.lock()?;
        Ok(records
            .get(request_id)
            .filter(|record| !record.is_expired_at(now))
            .cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn record(id: &str, expires_at: i64) -> IdempotencyRecord {
        IdempotencyRecord {
            request_id: id.to_string(),
            body_hash: "00".to_string(),
            processed_at: Utc.timestamp_opt(0, 0).unwrap(),
            expires_at,
        }
    }

    #[tokio::test]
    async fn test_put_if_absent() {
        let store = MemoryIdempotencyStore::new();
        let far = Utc::now().timestamp() + 3600;

        assert_eq!(
            store.put_if_absent(record("a", far)).await.unwrap(),
            InsertOutcome::Inserted
        );
        assert_eq!(
            store.put_if_absent(record("a", far)).await.unwrap(),
            InsertOutcome::AlreadyExists
        );
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_expired_record_is_absent() {
        let store = MemoryIdempotencyStore::new();
        store.put_if_absent(record("old", 10)).await.unwrap();

        assert!(store.get("old").await.unwrap().is_none());
        assert_eq!(
            store.put_if_absent(record("old", i64::MAX)).await.unwrap(),
            InsertOutcome::Inserted
        );
        assert!(store.get("old").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_purge_expired() {
        let store = MemoryIdempotencyStore::new();
        store.put_if_absent(record("a", 100)).await.unwrap();
        store.put_if_absent(record("b", 200)).await.unwrap();
        store.put_if_absent(record("c", i64::MAX)).await.unwrap();

        assert_eq!(store.purge_expired_at(150).unwrap(), 1);
        assert_eq!(store.purge_expired().unwrap(), 1);
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_expired_claims_are_swept_on_insert() {
        let store = MemoryIdempotencyStore::new();
        for i in 0..1000 {
            store
                .put_if_absent(record(&format!("req-{i}"), 1))
                .await
                .unwrap();
        }
        // 最近一次清理发生在第 768 次写入
        assert_eq!(store.len(), 1000 - 3 * SWEEP_INTERVAL);
        assert!(store.len() < SWEEP_INTERVAL);
    }

    #[tokio::test]
    async fn test_sweep_keeps_live_claims() {
        let store = MemoryIdempotencyStore::new();
        let far = Utc::now().timestamp() + 3600;
        store.put_if_absent(record("live", far)).await.unwrap();
        for i in 1..SWEEP_INTERVAL {
            store
                .put_if_absent(record(&format!("old-{i}"), 1))
                .await
                .unwrap();
        }

        assert_eq!(store.len(), 1);
        assert!(store.get("live").await.unwrap().is_some());
    }
}
