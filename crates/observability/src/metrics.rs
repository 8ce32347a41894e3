//! 分发指标收集模块
//!
//! `metrics` facade 上的计数器/仪表，以及进程内的批次统计聚合器。

use std::collections::BTreeMap;

use contracts::BatchStats;
use metrics::{counter, gauge, histogram};

/// 记录一次批次处理结果
///
/// 每个批次结束后调用一次。
pub fn record_batch(stats: &BatchStats) {
    counter!("distributor_batches_total").increment(1);
    histogram!("distributor_batch_size").record(stats.total as f64);

    let outcomes = [
        ("duplicate", stats.duplicate),
        ("forwarded", stats.forwarded),
        ("forward_failed", stats.forward_failed),
        ("validation_failed", stats.validation_failed),
        ("selection_failed", stats.selection_failed),
    ];
    for (outcome, count) in outcomes {
        if count > 0 {
            counter!("distributor_messages_total", "outcome" => outcome).increment(count);
        }
    }
}

/// 记录幂等性 claim 结果
pub fn record_claim(first_time: bool) {
    let result = if first_time { "first_time" } else { "duplicate" };
    counter!("distributor_claims_total", "result" => result).increment(1);
}

/// 记录目标队列深度
pub fn record_destination_depth(destination: &str, depth: u64) {
    gauge!(
        "distributor_destination_depth",
        "destination" => destination.to_string()
    )
    .set(depth as f64);
}

/// 记录队列深度查询失败（降级到缓存值/0）
pub fn record_depth_query_failure(destination: &str) {
    counter!(
        "distributor_depth_query_failures_total",
        "destination" => destination.to_string()
    )
    .increment(1);
}

/// 记录负载缓存刷新
pub fn record_load_refresh(elapsed_ms: f64) {
    counter!("distributor_load_refreshes_total").increment(1);
    histogram!("distributor_load_refresh_ms").record(elapsed_ms);
}

/// 记录无可用目标队列
pub fn record_no_destination() {
    counter!("distributor_no_destination_total").increment(1);
}

/// 记录消息转发
pub fn record_forward(destination: &str, success: bool, count: u64) {
    let status = if success { "success" } else { "failure" };
    counter!(
        "distributor_forwarded_total",
        "destination" => destination.to_string(),
        "status" => status
    )
    .increment(count);
}

/// 记录源队列删除 (ack)
pub fn record_ack(success: bool, count: u64) {
    let status = if success { "success" } else { "failure" };
    counter!("distributor_acks_total", "status" => status).increment(count);
}

/// 批次统计聚合器
///
/// 在内存中聚合多个批次的统计，便于输出摘要。
#[derive(Debug, Clone, Default)]
pub struct BatchMetricsAggregator {
    /// 批次数
    pub batches: u64,

    /// 中止的批次数（存储不可用）
    pub aborted_batches: u64,

    /// 累计计数
    pub totals: BatchStats,

    /// 批次大小统计
    pub batch_size_stats: RunningStats,

    /// 各目标队列转发成功数
    pub forwarded_by_destination: BTreeMap<String, u64>,
}

impl BatchMetricsAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// 累加一个已完成批次
    pub fn update(&mut self, stats: &BatchStats) {
        self.batches += 1;
        self.totals.merge(stats);
        self.batch_size_stats.push(stats.total as f64);
    }

    /// 累加一个批次中转发到某个目标队列的数量
    pub fn record_destination(&mut self, destination: &str, forwarded: u64) {
        *self
            .forwarded_by_destination
            .entry(destination.to_string())
            .or_insert(0) += forwarded;
    }

    /// 记录一次中止的批次
    pub fn record_aborted(&mut self) {
        self.aborted_batches += 1;
    }

    /// 生成摘要报告
    pub fn summary(&self) -> MetricsSummary {
        let totals = self.totals;
        MetricsSummary {
            batches: self.batches,
            aborted_batches: self.aborted_batches,
            totals,
            duplicate_rate: percentage(totals.duplicate, totals.total),
            failure_rate: percentage(totals.failed(), totals.total),
            batch_size: StatsSummary::from(&self.batch_size_stats),
            forwarded_by_destination: self.forwarded_by_destination.clone(),
        }
    }

    /// 重置统计
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

fn percentage(part: u64, whole: u64) -> f64 {
    if whole > 0 {
        part as f64 / whole as f64 * 100.0
    } else {
        0.0
    }
}

/// 指标摘要
#[derive(Debug, Clone, Default)]
pub struct MetricsSummary {
    pub batches: u64,
    pub aborted_batches: u64,
    pub totals: BatchStats,
    pub duplicate_rate: f64,
    pub failure_rate: f64,
    pub batch_size: StatsSummary,
    pub forwarded_by_destination: BTreeMap<String, u64>,
}

impl std::fmt::Display for MetricsSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "=== Dispatch Metrics Summary ===")?;
        writeln!(
            f,
            "Batches: {} ({} aborted)",
            self.batches, self.aborted_batches
        )?;
        writeln!(f, "Messages: {}", self.totals.total)?;
        writeln!(f, "Forwarded: {}", self.totals.forwarded)?;
        writeln!(
            f,
            "Duplicates: {} ({:.2}%)",
            self.totals.duplicate, self.duplicate_rate
        )?;
        writeln!(
            f,
            "Failed: {} ({:.2}%)",
            self.totals.failed(),
            self.failure_rate
        )?;
        writeln!(f, "Batch size: {}", self.batch_size)?;

        if !self.forwarded_by_destination.is_empty() {
            writeln!(f, "Forwarded by destination:")?;
            for (destination, count) in &self.forwarded_by_destination {
                writeln!(f, "  {}: {}", destination, count)?;
            }
        }

        Ok(())
    }
}

/// 统计摘要
#[derive(Debug, Clone, Default)]
pub struct StatsSummary {
    pub count: u64,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub std_dev: f64,
}

impl From<&RunningStats> for StatsSummary {
    fn from(stats: &RunningStats) -> Self {
        Self {
            count: stats.count,
            min: stats.min,
            max: stats.max,
            mean: stats.mean(),
            std_dev: stats.std_dev(),
        }
    }
}

impl std::fmt::Display for StatsSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.count == 0 {
            write!(f, "N/A")
        } else {
            write!(
                f,
                "min={:.1}, max={:.1}, mean={:.2}, std={:.2} (n={})",
                self.min, self.max, self.mean, self.std_dev, self.count
            )
        }
    }
}

/// 在线统计计算器 (Welford's algorithm)
#[derive(Debug, Clone, Default)]
pub struct RunningStats {
    count: u64,
    mean: f64,
    m2: f64,
    min: f64,
    max: f64,
}

impl RunningStats {
    /// 添加新值
    pub fn push(&mut self, value: f64) {
        self.count += 1;

        if self.count == 1 {
            self.min = value;
            self.max = value;
            self.mean = value;
            self.m2 = 0.0;
        } else {
            self.min = self.min.min(value);
            self.max = self.max.max(value);

            let delta = value - self.mean;
            self.mean += delta / self.count as f64;
            self.m2 += delta * (value - self.mean);
        }
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.mean
        }
    }

    /// 样本方差
    pub fn variance(&self) -> f64 {
        if self.count < 2 {
            0.0
        } else {
            self.m2 / (self.count - 1) as f64
        }
    }

    pub fn std_dev(&self) -> f64 {
        self.variance().sqrt()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_running_stats() {
        let mut stats = RunningStats::default();
        for v in [10.0, 10.0, 5.0, 7.0] {
            stats.push(v);
        }

        assert_eq!(stats.count(), 4);
        assert!((stats.mean() - 8.0).abs() < 1e-10);
        assert!((stats.variance() - 6.0).abs() < 1e-10);
    }

    #[test]
    fn test_aggregator_update() {
        let mut aggregator = BatchMetricsAggregator::new();

        aggregator.update(&BatchStats {
            total: 10,
            processed: 9,
            duplicate: 1,
            forwarded: 8,
            forward_failed: 1,
            acknowledged: 9,
            ..Default::default()
        });
        aggregator.record_destination("us-east-1", 5);
        aggregator.record_destination("us-west-2", 3);
        aggregator.record_destination("us-east-1", 1);
        aggregator.record_aborted();

        let summary = aggregator.summary();
        assert_eq!(summary.batches, 1);
        assert_eq!(summary.aborted_batches, 1);
        assert!((summary.duplicate_rate - 10.0).abs() < 1e-10);
        assert_eq!(summary.forwarded_by_destination["us-east-1"], 6);
    }

    #[test]
    fn test_summary_display() {
        let mut aggregator = BatchMetricsAggregator::new();
        aggregator.update(&BatchStats {
            total: 4,
            duplicate: 1,
            forwarded: 3,
            ..Default::default()
        });

        let output = format!("{}", aggregator.summary());
        assert!(output.contains("Messages: 4"));
        assert!(output.contains("25.00%"));
    }

    #[test]
    fn test_recording_without_recorder_is_noop() {
        // No global recorder installed in unit tests
        record_batch(&BatchStats::default());
        record_claim(true);
        record_forward("us-east-1", false, 3);
    }
}
