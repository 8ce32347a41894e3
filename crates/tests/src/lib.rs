//! # Integration Tests
//!
//! 集成测试与端到端测试。
//!
//! 负责：
//! - 合约快照测试
//! - 基于内存代理的 e2e 测试（去重、重投递、负载分配、停机）

#[cfg(test)]
mod contract_tests {
    use contracts::{DistributorConfig, Envelope, DEFAULT_MAX_BATCH_SIZE};

    #[test]
    fn test_envelope_contract() {
        assert_eq!(Envelope::REQUEST_ID_FIELD, "request_id");

        let envelope = Envelope::parse(r#"{"request_id":"req-1","payload":{"x":1}}"#).unwrap();
        assert_eq!(envelope.request_id, "req-1");

        assert!(Envelope::parse(r#"{"payload":{}}"#).is_err());
        assert!(Envelope::parse("not json").is_err());
    }

    #[test]
    fn test_default_config_contract() {
        let config = DistributorConfig::default();
        assert_eq!(config.cache_ttl_secs, 60);
        assert_eq!(config.max_queue_depth_threshold, 5000);
        assert_eq!(config.idempotency_ttl_days, 7);
        assert_eq!(config.max_batch_size, DEFAULT_MAX_BATCH_SIZE);
        assert!(config.destinations.is_empty());
    }
}

#[cfg(test)]
mod e2e_tests {
    use std::sync::Arc;
    use std::time::Duration;

    use config_loader::{ConfigFormat, ConfigLoader};
    use contracts::{
        DistributorConfig, IdempotencyRecord, IdempotencyStore, InsertOutcome, StoreError,
    };
    use dispatcher::{DispatchContext, DispatchPipeline, DispatchWorker};
    use idempotency::{IdempotencyGuard, MemoryIdempotencyStore};
    use ingestion::{BrokerConfig, MemoryBroker};
    use load_balancer::{DestinationRouter, LoadSampler, WeightCalculator};
    use tokio::sync::watch;

    type Broker = Arc<MemoryBroker>;
    type Worker<S> = DispatchWorker<Broker, Broker, S, Broker, Broker>;

    /// 拒绝指定 request_id 的存储，模拟存储不可用
    struct FailingStore {
        inner: MemoryIdempotencyStore,
        fail_on: String,
    }

    impl IdempotencyStore for FailingStore {
        async fn put_if_absent(
            &self,
            record: IdempotencyRecord,
        ) -> Result<InsertOutcome, StoreError> {
            if record.request_id == self.fail_on {
                return Err(StoreError::Unavailable("connection reset".into()));
            }
            self.inner.put_if_absent(record).await
        }

        async fn get(&self, request_id: &str) -> Result<Option<IdempotencyRecord>, StoreError> {
            self.inner.get(request_id).await
        }
    }

    fn config(destinations: &[&str]) -> DistributorConfig {
        let mut config = DistributorConfig::default();
        for name in destinations {
            config
                .destinations
                .insert(name.to_string(), format!("mem://{name}"));
        }
        config
    }

    fn body(request_id: &str) -> String {
        serde_json::json!({ "request_id": request_id, "payload": { "prompt": "hello" } })
            .to_string()
    }

    fn bodies(prefix: &str, count: usize) -> Vec<String> {
        (0..count).map(|i| body(&format!("{prefix}-{i:04}"))).collect()
    }

    fn broker_for(config: &DistributorConfig) -> Broker {
        Arc::new(
            MemoryBroker::new(BrokerConfig {
                max_send_batch: config.max_batch_size,
                max_delete_batch: config.max_batch_size,
                ..Default::default()
            })
            .with_destinations(&config.destination_list()),
        )
    }

    fn worker_with<S>(broker: &Broker, context: DispatchContext<Broker, S>, batch: usize) -> Worker<S>
    where
        S: IdempotencyStore + Sync,
    {
        let pipeline = Arc::new(DispatchPipeline::new(
            context,
            Arc::clone(broker),
            Arc::clone(broker),
        ));
        DispatchWorker::new(Arc::clone(broker), pipeline, batch)
    }

    fn setup<S>(config: &DistributorConfig, store: S) -> (Broker, Worker<S>)
    where
        S: IdempotencyStore + Sync,
    {
        let broker = broker_for(config);
        let context = DispatchContext::from_config(config, Arc::clone(&broker), store);
        let worker = worker_with(&broker, context, config.max_batch_size);
        (broker, worker)
    }

    fn forwarded_to(broker: &MemoryBroker, destination: &str) -> usize {
        broker
            .forwarded_counts()
            .get(destination)
            .copied()
            .unwrap_or(0)
    }

    fn drained(broker: &MemoryBroker) -> bool {
        broker.pending_len() == 0 && broker.in_flight_len() == 0
    }

    fn forwarded_total(broker: &MemoryBroker) -> usize {
        broker.forwarded_counts().values().sum()
    }

    /// 完整链路：MemoryBroker -> DispatchPipeline -> 目标队列
    ///
    /// 验证：
    /// 1. 所有消息被分批接收（每批最多 10 条）
    /// 2. 每条消息恰好转发一次
    /// 3. 转发成功的消息全部确认，源队列清空
    #[tokio::test]
    async fn test_e2e_drain_acknowledges_everything() {
        let config = config(&["us-east-1", "us-west-2", "eu-west-1"]);
        let store = Arc::new(MemoryIdempotencyStore::new());
        let (broker, worker) = setup(&config, Arc::clone(&store));
        broker.enqueue_all(bodies("req", 45));

        let summary = worker.run_until_idle().await.unwrap();

        assert_eq!(summary.batches, 5);
        assert_eq!(summary.aborted_batches, 0);
        assert_eq!(summary.totals.total, 45);
        assert_eq!(summary.totals.forwarded, 45);
        assert_eq!(summary.totals.acknowledged, 45);
        assert_eq!(summary.totals.failed(), 0);

        assert_eq!(broker.pending_len(), 0);
        assert_eq!(broker.in_flight_len(), 0);
        assert_eq!(forwarded_total(&broker), 45);
        assert_eq!(store.len(), 45);

        let by_destination: u64 = summary.forwarded_by_destination.values().sum();
        assert_eq!(by_destination, 45);
    }

    /// 重投递的消息只被转发一次
    #[tokio::test]
    async fn test_e2e_redelivery_is_deduplicated() {
        let config = config(&["us-east-1", "us-west-2"]);
        let (broker, worker) = setup(&config, MemoryIdempotencyStore::new());
        broker.enqueue_all(bodies("req", 20));

        // 首轮删除失败：消息全部转发但留在源队列
        broker.fail_delete_calls(true);
        let first = worker.run_until_idle().await.unwrap();
        assert_eq!(first.totals.forwarded, 20);
        assert_eq!(first.totals.acknowledged, 0);
        assert_eq!(first.totals.ack_failed, 20);
        assert_eq!(broker.in_flight_len(), 20);

        broker.clear_faults();
        assert_eq!(broker.requeue_unacked(), 20);

        let second = worker.run_until_idle().await.unwrap();
        assert_eq!(second.totals.duplicate, 20);
        assert_eq!(second.totals.forwarded, 0);
        assert_eq!(second.totals.acknowledged, 20);

        assert_eq!(forwarded_total(&broker), 20);
        assert_eq!(broker.in_flight_len(), 0);
        assert_eq!(broker.metrics().redelivered, 20);
    }

    /// 同一 request_id 再次发送时被确认但不转发
    #[tokio::test]
    async fn test_e2e_resent_ids_are_suppressed() {
        let config = config(&["solo"]);
        let (broker, worker) = setup(&config, MemoryIdempotencyStore::new());
        broker.enqueue_all(bodies("req", 10));
        broker.enqueue_all(bodies("req", 5));

        let summary = worker.run_until_idle().await.unwrap();

        assert_eq!(summary.totals.forwarded, 10);
        assert_eq!(summary.totals.duplicate, 5);
        assert_eq!(summary.totals.acknowledged, 15);
        assert_eq!(broker.destination_messages("solo").len(), 10);
        assert_eq!(broker.in_flight_len(), 0);
    }

    /// 存储故障中止整个批次：不转发、不确认
    #[tokio::test]
    async fn test_e2e_store_failure_aborts_batch() {
        let config = config(&["us-east-1", "us-west-2"]);
        let store = FailingStore {
            inner: MemoryIdempotencyStore::new(),
            fail_on: "req-0003".to_string(),
        };
        let (broker, worker) = setup(&config, store);
        broker.enqueue_all(bodies("req", 5));

        let summary = worker.run_until_idle().await.unwrap();

        assert_eq!(summary.aborted_batches, 1);
        assert_eq!(summary.totals.acknowledged, 0);
        assert_eq!(summary.totals.forwarded, 0);
        assert_eq!(forwarded_total(&broker), 0);
        assert_eq!(broker.in_flight_len(), 5);
        assert_eq!(broker.metrics().deleted, 0);
        assert_eq!(broker.metrics().sent, 0);
    }

    /// 超过阈值的目标不接收流量，低负载目标承担绝大部分
    #[tokio::test]
    async fn test_e2e_overloaded_destination_gets_no_traffic() {
        let config = config(&["hot", "warm", "cold"]);
        let (broker, worker) = setup(&config, MemoryIdempotencyStore::new());
        broker.seed_depth("hot", 10_000);
        broker.seed_depth("warm", 4_000);
        broker.enqueue_all(bodies("req", 200));

        let summary = worker.run_until_idle().await.unwrap();

        assert_eq!(summary.totals.forwarded, 200);
        assert_eq!(forwarded_to(&broker, "hot"), 0);
        // warm 的权重约为 1/4002
        assert!(forwarded_to(&broker, "cold") >= 190);
        assert_eq!(broker.destination_depth("hot"), Some(10_000));
    }

    /// 所有目标过载：消息留在源队列，等待重投递
    #[tokio::test]
    async fn test_e2e_all_overloaded_leaves_messages() {
        let mut config = config(&["a", "b"]);
        config.max_queue_depth_threshold = 100;
        let (broker, worker) = setup(&config, MemoryIdempotencyStore::new());
        broker.seed_depth("a", 100);
        broker.seed_depth("b", 250);
        broker.enqueue_all(bodies("req", 10));

        let summary = worker.run_until_idle().await.unwrap();

        assert_eq!(summary.totals.selection_failed, 10);
        assert_eq!(summary.totals.acknowledged, 0);
        assert_eq!(forwarded_total(&broker), 0);
        assert_eq!(broker.in_flight_len(), 10);
    }

    /// 深度查询失败时降级为 0，仍然参与选择
    #[tokio::test]
    async fn test_e2e_degraded_oracle_still_routes() {
        let config = config(&["a", "b"]);
        let (broker, worker) = setup(&config, MemoryIdempotencyStore::new());
        broker.seed_depth("a", 100);
        broker.fail_depth_queries_for("b");
        broker.enqueue_all(bodies("req", 50));

        let summary = worker.run_until_idle().await.unwrap();

        assert_eq!(summary.totals.forwarded, 50);
        assert_eq!(summary.totals.acknowledged, 50);
        assert!(forwarded_to(&broker, "b") >= 40);
    }

    /// 单条转发失败不影响同批其它消息
    #[tokio::test]
    async fn test_e2e_rejected_forward_stays_unacknowledged() {
        let config = config(&["solo"]);
        let (broker, worker) = setup(&config, MemoryIdempotencyStore::new());
        broker.reject_bodies_containing("poison");
        broker.enqueue_all(bodies("req", 8));
        broker.enqueue_all(bodies("poison", 2));

        let summary = worker.run_until_idle().await.unwrap();

        assert_eq!(summary.totals.forwarded, 8);
        assert_eq!(summary.totals.forward_failed, 2);
        assert_eq!(summary.totals.acknowledged, 8);
        assert_eq!(broker.destination_messages("solo").len(), 8);
        assert_eq!(broker.in_flight_len(), 2);
    }

    /// 去重窗口过期后同一 request_id 重新处理
    #[tokio::test]
    async fn test_e2e_expired_claims_allow_reprocessing() {
        let config = config(&["solo"]);
        let broker = broker_for(&config);
        let sampler = LoadSampler::new(
            Arc::clone(&broker),
            config.destination_list(),
            config.cache_ttl(),
        );
        let context = DispatchContext::new(
            DestinationRouter::new(sampler, WeightCalculator::new(config.max_queue_depth_threshold)),
            IdempotencyGuard::new(MemoryIdempotencyStore::new(), Duration::ZERO),
        );
        let worker = worker_with(&broker, context, config.max_batch_size);

        broker.enqueue_all(bodies("req", 5));
        broker.fail_delete_calls(true);
        worker.run_until_idle().await.unwrap();

        broker.clear_faults();
        broker.requeue_unacked();
        let second = worker.run_until_idle().await.unwrap();

        assert_eq!(second.totals.duplicate, 0);
        assert_eq!(second.totals.forwarded, 5);
        assert_eq!(broker.destination_messages("solo").len(), 10);
    }

    /// 常驻 worker：空闲时继续轮询，收到停机信号后退出
    #[tokio::test]
    async fn test_e2e_worker_stops_on_shutdown() {
        let config = config(&["us-east-1", "us-west-2"]);
        let (broker, worker) = setup(&config, MemoryIdempotencyStore::new());
        let worker = worker.with_idle_backoff(Duration::from_millis(5));
        broker.enqueue_all(bodies("early", 15));

        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let driver = async {
            while !drained(&broker) {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
            broker.enqueue_all(bodies("late", 7));
            // 等待 worker 接收到后续消息
            while !drained(&broker) {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
            shutdown_tx.send(true).unwrap();
        };

        let (summary, ()) = tokio::time::timeout(
            Duration::from_secs(10),
            async { tokio::join!(worker.run(shutdown_rx), driver) },
        )
        .await
        .expect("worker did not stop");

        let summary = summary.unwrap();
        assert_eq!(summary.totals.forwarded, 22);
        assert_eq!(summary.totals.acknowledged, 22);
        assert_eq!(forwarded_total(&broker), 22);
    }

    /// 配置文件驱动整条链路
    #[tokio::test]
    async fn test_e2e_config_file_drives_pipeline() {
        let content = r#"
cache_ttl_secs = 30
max_queue_depth_threshold = 100
max_batch_size = 4

[destinations]
eu-west-1 = "mem://eu-west-1"
us-east-1 = "mem://us-east-1"
"#;
        let config = ConfigLoader::load_from_str(content, ConfigFormat::Toml).unwrap();
        let (broker, worker) = setup(&config, MemoryIdempotencyStore::new());
        broker.seed_depth("us-east-1", 150);
        broker.enqueue_all(bodies("req", 12));

        let summary = worker.run_until_idle().await.unwrap();

        assert_eq!(summary.batches, 3);
        assert_eq!(summary.totals.forwarded, 12);
        assert_eq!(forwarded_to(&broker, "eu-west-1"), 12);
        assert_eq!(forwarded_to(&broker, "us-east-1"), 0);
        // 每次发送最多 4 条
        assert!(broker.metrics().send_calls >= 3);
    }
}
