//! 内存消息代理
//!
//! 一个进程内的队列服务替身：一个入口队列（带 in-flight 可见性语义）加若干目标队列。
//! 同时实现 [`IngestionSource`]、[`DepthOracle`]、[`ForwardSink`]、[`AckSink`]，
//! 用于 CLI 模拟与端到端测试。支持故障注入。

use std::collections::{BTreeMap, HashSet, VecDeque};
use std::sync::{Mutex, MutexGuard, PoisonError};

use contracts::{
    AckEntry, AckSink, AckToken, BatchEntryResult, ContractError, DepthOracle, Destination,
    DestinationId, EntryFailure, ForwardSink, InboundMessage, IngestionSource, OutboundEntry,
};
use tracing::{debug, trace, warn};

use crate::config::{BrokerConfig, BrokerMetrics, BrokerMetricsSnapshot};

/// Per-entry failure code for injected send rejections
pub const SEND_REJECTED: &str = "InternalError";

/// Per-entry failure code for unknown or already-deleted receipts
pub const RECEIPT_INVALID: &str = "ReceiptHandleIsInvalid";

#[derive(Debug, Default)]
struct DestinationQueue {
    messages: Vec<String>,
    /// 额外的积压（模拟其他生产者）
    seeded_depth: u64,
}

impl DestinationQueue {
    fn depth(&self) -> u64 {
        self.seeded_depth + self.messages.len() as u64
    }
}

#[derive(Debug, Default)]
struct Faults {
    reject_sends: HashSet<DestinationId>,
    fail_send_calls: HashSet<DestinationId>,
    fail_depth: HashSet<DestinationId>,
    reject_patterns: Vec<String>,
    fail_delete_calls: bool,
}

#[derive(Debug, Default)]
struct BrokerState {
    pending: VecDeque<String>,
    /// (receipt, body)，按发放顺序
    in_flight: Vec<(String, String)>,
    destinations: BTreeMap<DestinationId, DestinationQueue>,
    next_receipt: u64,
    faults: Faults,
}

/// 内存消息代理
#[derive(Debug)]
pub struct MemoryBroker {
    config: BrokerConfig,
    state: Mutex<BrokerState>,
    metrics: BrokerMetrics,
}

impl Default for MemoryBroker {
    fn default() -> Self {
        Self::new(BrokerConfig::default())
    }
}

impl MemoryBroker {
    pub fn new(config: BrokerConfig) -> Self {
        Self {
            config,
            state: Mutex::new(BrokerState::default()),
            metrics: BrokerMetrics::new(),
        }
    }

    /// 注册一组目标队列
    pub fn with_destinations<'a>(self, destinations: impl IntoIterator<Item = &'a Destination>) -> Self {
        for destination in destinations {
            self.add_destination(destination.id.clone());
        }
        self
    }

    /// 注册目标队列（已存在则忽略）
    pub fn add_destination(&self, id: impl Into<DestinationId>) {
        self.state().destinations.entry(id.into()).or_default();
    }

    pub fn config(&self) -> &BrokerConfig {
        &self.config
    }

    pub fn source_name(&self) -> &str {
        &self.config.source_name
    }

    pub fn metrics(&self) -> BrokerMetricsSnapshot {
        self.metrics.snapshot()
    }

    /// 向入口队列投递一条消息
    pub fn enqueue(&self, body: impl Into<String>) {
        self.state().pending.push_back(body.into());
    }

    pub fn enqueue_all<I, B>(&self, bodies: I)
    where
        I: IntoIterator<Item = B>,
        B: Into<String>,
    {
        let mut state = self.state();
        state.pending.extend(bodies.into_iter().map(Into::into));
    }

    /// 可接收的消息数
    pub fn pending_len(&self) -> usize {
        self.state().pending.len()
    }

    /// 已接收、未确认的消息数
    pub fn in_flight_len(&self) -> usize {
        self.state().in_flight.len()
    }

    /// 模拟可见性超时：所有未确认消息重新入队（排在队首，保持原顺序）
    pub fn requeue_unacked(&self) -> usize {
        let mut state = self.state();
        let expired: Vec<(String, String)> = state.in_flight.drain(..).collect();
        let count = expired.len();
        for (_, body) in expired.into_iter().rev() {
            state.pending.push_front(body);
        }
        BrokerMetrics::add(&self.metrics.redelivered, count as u64);
        if count > 0 {
            debug!(count, "Unacknowledged messages redelivered");
        }
        count
    }

    /// 设置目标队列的额外积压
    pub fn seed_depth(&self, destination: &str, depth: u64) {
        self.state()
            .destinations
            .entry(DestinationId::from(destination))
            .or_default()
            .seeded_depth = depth;
    }

    /// 目标队列中已转发的消息体
    pub fn destination_messages(&self, destination: &str) -> Vec<String> {
        self.state()
            .destinations
            .get(destination)
            .map(|queue| queue.messages.clone())
            .unwrap_or_default()
    }

    /// 目标队列当前深度
    pub fn destination_depth(&self, destination: &str) -> Option<u64> {
        self.state().destinations.get(destination).map(DestinationQueue::depth)
    }

    /// 各目标队列已转发数量
    pub fn forwarded_counts(&self) -> BTreeMap<String, usize> {
        self.state()
            .destinations
            .iter()
            .map(|(id, queue)| (id.to_string(), queue.messages.len()))
            .collect()
    }

    // ===== 故障注入 =====

    /// 发往 `destination` 的每个条目都报告失败
    pub fn reject_sends_to(&self, destination: &str) {
        self.state().faults.reject_sends.insert(destination.into());
    }

    /// 发往 `destination` 的整个调用失败
    pub fn fail_send_calls_to(&self, destination: &str) {
        self.state().faults.fail_send_calls.insert(destination.into());
    }

    /// 消息体包含 `pattern` 的条目发送失败
    pub fn reject_bodies_containing(&self, pattern: impl Into<String>) {
        self.state().faults.reject_patterns.push(pattern.into());
    }

    /// `destination` 的深度查询失败
    pub fn fail_depth_queries_for(&self, destination: &str) {
        self.state().faults.fail_depth.insert(destination.into());
    }

    /// 删除调用整体失败
    pub fn fail_delete_calls(&self, fail: bool) {
        self.state().faults.fail_delete_calls = fail;
    }

    pub fn clear_faults(&self) {
        self.state().faults = Faults::default();
    }

    fn state(&self) -> MutexGuard<'_, BrokerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn ensure_distinct_ids<'a>(ids: impl Iterator<Item = &'a str>) -> Result<(), String> {
    let mut seen = HashSet::new();
    for id in ids {
        if !seen.insert(id) {
            return Err(format!("batch entry ids not distinct: {id}"));
        }
    }
    Ok(())
}

impl IngestionSource for MemoryBroker {
    fn name(&self) -> &str {
        &self.config.source_name
    }

    async fn receive_batch(&self, max: usize) -> Result<Vec<InboundMessage>, ContractError> {
        let mut state = self.state();
        let take = max.min(state.pending.len());
        let mut batch = Vec::with_capacity(take);

        for _ in 0..take {
            let Some(body) = state.pending.pop_front() else {
                break;
            };
            state.next_receipt += 1;
            let receipt = format!("{}-rcpt-{}", self.config.source_name, state.next_receipt);
            state.in_flight.push((receipt.clone(), body.clone()));
            batch.push(InboundMessage::new(
                body,
                AckToken::new(self.config.source_name.clone(), receipt),
            ));
        }

        BrokerMetrics::add(&self.metrics.received, batch.len() as u64);
        trace!(count = batch.len(), "Batch received");
        Ok(batch)
    }
}

impl DepthOracle for MemoryBroker {
    async fn queue_depth(&self, destination: &Destination) -> Result<u64, ContractError> {
        BrokerMetrics::add(&self.metrics.depth_queries, 1);
        let state = self.state();

        if state.faults.fail_depth.contains(&destination.id) {
            return Err(ContractError::destination_query(
                destination.id.as_str(),
                "injected depth query failure",
            ));
        }

        state
            .destinations
            .get(&destination.id)
            .map(DestinationQueue::depth)
            .ok_or_else(|| {
                ContractError::destination_query(destination.id.as_str(), "queue does not exist")
            })
    }
}

impl ForwardSink for MemoryBroker {
    fn max_send_batch(&self) -> usize {
        self.config.max_send_batch
    }

    async fn send_batch(
        &self,
        destination: &Destination,
        entries: &[OutboundEntry],
    ) -> Result<BatchEntryResult, ContractError> {
        BrokerMetrics::add(&self.metrics.send_calls, 1);
        let name = destination.id.as_str();

        if entries.len() > self.config.max_send_batch {
            return Err(ContractError::sink_send(
                name,
                format!(
                    "batch of {} exceeds limit {}",
                    entries.len(),
                    self.config.max_send_batch
                ),
            ));
        }
        ensure_distinct_ids(entries.iter().map(|e| e.id.as_str()))
            .map_err(|message| ContractError::sink_send(name, message))?;

        let mut state = self.state();
        if state.faults.fail_send_calls.contains(&destination.id) {
            return Err(ContractError::sink_send(name, "injected send failure"));
        }

        let reject_all = state.faults.reject_sends.contains(&destination.id);
        let rejected: Vec<bool> = entries
            .iter()
            .map(|entry| {
                reject_all
                    || state
                        .faults
                        .reject_patterns
                        .iter()
                        .any(|p| entry.body.contains(p.as_str()))
            })
            .collect();

        let Some(queue) = state.destinations.get_mut(&destination.id) else {
            return Err(ContractError::sink_send(name, "queue does not exist"));
        };

        let mut result = BatchEntryResult::default();
        for (entry, rejected) in entries.iter().zip(rejected) {
            if rejected {
                result.failed.push(EntryFailure::new(
                    entry.id.clone(),
                    SEND_REJECTED,
                    "injected entry failure",
                ));
            } else {
                queue.messages.push(entry.body.clone());
                result.successful.push(entry.id.clone());
            }
        }

        BrokerMetrics::add(&self.metrics.sent, result.successful.len() as u64);
        if !result.failed.is_empty() {
            warn!(
                destination = name,
                failed = result.failed.len(),
                "Send batch partially failed"
            );
        }
        Ok(result)
    }
}

impl AckSink for MemoryBroker {
    fn max_delete_batch(&self) -> usize {
        self.config.max_delete_batch
    }

    async fn delete_batch(
        &self,
        source: &str,
        entries: &[AckEntry],
    ) -> Result<BatchEntryResult, ContractError> {
        BrokerMetrics::add(&self.metrics.delete_calls, 1);

        if entries.len() > self.config.max_delete_batch {
            return Err(ContractError::sink_delete(
                source,
                format!(
                    "batch of {} exceeds limit {}",
                    entries.len(),
                    self.config.max_delete_batch
                ),
            ));
        }
        if source != self.config.source_name {
            return Err(ContractError::sink_delete(source, "queue does not exist"));
        }
        ensure_distinct_ids(entries.iter().map(|e| e.id.as_str()))
            .map_err(|message| ContractError::sink_delete(source, message))?;

        let mut state = self.state();
        if state.faults.fail_delete_calls {
            return Err(ContractError::sink_delete(source, "injected delete failure"));
        }

        let mut result = BatchEntryResult::default();
        for entry in entries {
            match state.in_flight.iter().position(|(r, _)| *r == entry.receipt) {
                Some(index) => {
                    state.in_flight.remove(index);
                    result.successful.push(entry.id.clone());
                }
                None => result.failed.push(EntryFailure::new(
                    entry.id.clone(),
                    RECEIPT_INVALID,
                    format!("receipt {} is not in flight", entry.receipt),
                )),
            }
        }

        BrokerMetrics::add(&self.metrics.deleted, result.successful.len() as u64);
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn broker() -> MemoryBroker {
        let destinations = [
            Destination::new("us-east-1", "mem://us-east-1"),
            Destination::new("eu-west-1", "mem://eu-west-1"),
        ];
        MemoryBroker::default().with_destinations(&destinations)
    }

    fn outbound(ids: &[&str]) -> Vec<OutboundEntry> {
        ids.iter()
            .map(|id| OutboundEntry {
                id: id.to_string(),
                body: format!("body-{id}"),
            })
            .collect()
    }

    fn acks(messages: &[InboundMessage]) -> Vec<AckEntry> {
        messages
            .iter()
            .enumerate()
            .map(|(i, m)| AckEntry {
                id: i.to_string(),
                receipt: m.ack.receipt.clone(),
            })
            .collect()
    }

    #[tokio::test]
    async fn test_receive_and_ack() {
        let broker = broker();
        broker.enqueue_all(["a", "b", "c"]);

        let batch = broker.receive_batch(2).await.unwrap();
        assert_eq!(batch.len(), 2);
        assert_eq!(batch[0].body, "a");
        assert_eq!(batch[0].ack.source, "ingestion");
        assert_eq!(broker.pending_len(), 1);
        assert_eq!(broker.in_flight_len(), 2);

        let result = broker.delete_batch("ingestion", &acks(&batch)).await.unwrap();
        assert_eq!(result.successful.len(), 2);
        assert_eq!(broker.in_flight_len(), 0);

        // Second delete of the same receipts
        let again = broker.delete_batch("ingestion", &acks(&batch)).await.unwrap();
        assert_eq!(again.failed.len(), 2);
        assert_eq!(again.failed[0].code, RECEIPT_INVALID);
    }

    #[tokio::test]
    async fn test_requeue_unacked_preserves_order() {
        let broker = broker();
        broker.enqueue_all(["a", "b", "c"]);
        broker.receive_batch(2).await.unwrap();

        assert_eq!(broker.requeue_unacked(), 2);
        let batch = broker.receive_batch(10).await.unwrap();
        let bodies: Vec<_> = batch.iter().map(|m| m.body.as_str()).collect();
        assert_eq!(bodies, ["a", "b", "c"]);
        assert_eq!(broker.metrics().redelivered, 2);
    }

    #[tokio::test]
    async fn test_send_and_depth() {
        let broker = broker();
        broker.seed_depth("us-east-1", 40);
        let east = Destination::new("us-east-1", "mem://us-east-1");

        let result = broker.send_batch(&east, &outbound(&["0", "1"])).await.unwrap();
        assert_eq!(result.successful, ["0", "1"]);
        assert_eq!(broker.queue_depth(&east).await.unwrap(), 42);
        assert_eq!(broker.destination_messages("us-east-1"), ["body-0", "body-1"]);
    }

    #[tokio::test]
    async fn test_send_limits() {
        let broker = broker();
        let east = Destination::new("us-east-1", "mem://us-east-1");
        let ids: Vec<String> = (0..11).map(|i| i.to_string()).collect();
        let refs: Vec<&str> = ids.iter().map(String::as_str).collect();

        assert!(broker.send_batch(&east, &outbound(&refs)).await.is_err());
        assert!(broker.send_batch(&east, &outbound(&["x", "x"])).await.is_err());

        let unknown = Destination::new("ap-south-1", "mem://ap-south-1");
        assert!(broker.send_batch(&unknown, &outbound(&["0"])).await.is_err());
        assert!(broker.queue_depth(&unknown).await.is_err());
    }

    #[tokio::test]
    async fn test_injected_faults() {
        let broker = broker();
        let east = Destination::new("us-east-1", "mem://us-east-1");
        let eu = Destination::new("eu-west-1", "mem://eu-west-1");

        broker.reject_bodies_containing("body-1");
        let result = broker.send_batch(&east, &outbound(&["0", "1"])).await.unwrap();
        assert_eq!(result.successful, ["0"]);
        assert_eq!(result.failure("1").unwrap().code, SEND_REJECTED);

        broker.fail_send_calls_to("eu-west-1");
        assert!(broker.send_batch(&eu, &outbound(&["0"])).await.is_err());

        broker.fail_depth_queries_for("eu-west-1");
        assert!(broker.queue_depth(&eu).await.is_err());

        broker.clear_faults();
        assert!(broker.send_batch(&eu, &outbound(&["0"])).await.is_ok());
        assert_eq!(broker.forwarded_counts()["eu-west-1"], 1);
    }

    #[tokio::test]
    async fn test_delete_failures() {
        let broker = broker();
        broker.enqueue("a");
        let batch = broker.receive_batch(1).await.unwrap();

        assert!(broker.delete_batch("other-queue", &acks(&batch)).await.is_err());

        broker.fail_delete_calls(true);
        assert!(broker.delete_batch("ingestion", &acks(&batch)).await.is_err());
        assert_eq!(broker.in_flight_len(), 1);
    }
}
