//! `simulate` command implementation.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use contracts::BatchStats;
use dispatcher::{DispatchContext, DispatchPipeline, DispatchWorker};
use idempotency::MemoryIdempotencyStore;
use ingestion::{BrokerConfig, MemoryBroker};
use observability::MetricsSummary;
use serde::Serialize;
use serde_json::json;
use tracing::info;

use super::load_config;
use crate::cli::SimulateArgs;
use crate::error::CliError;

/// Simulation report for JSON output
#[derive(Debug, Serialize)]
struct SimulationReport {
    enqueued: usize,
    batches: u64,
    aborted_batches: u64,
    redelivered: u64,
    duration_ms: u128,
    stats: BatchStats,
    /// Messages forwarded per destination during this run
    distribution: BTreeMap<String, u64>,
    /// Final destination depth (seeded backlog + forwarded)
    final_depths: BTreeMap<String, u64>,
    /// Still in flight (not acknowledged) at the end
    unacknowledged: usize,
}

impl SimulationReport {
    fn throughput(&self) -> f64 {
        if self.duration_ms > 0 {
            self.stats.total as f64 / (self.duration_ms as f64 / 1000.0)
        } else {
            0.0
        }
    }
}

/// Generated message bodies: distinct ids, re-sent ids, then envelopes without id
fn generate_bodies(messages: usize, duplicates: usize, invalid: usize) -> Vec<String> {
    let request_id = |i: usize| format!("sim-{i:06}");
    let mut bodies: Vec<String> = (0..messages)
        .map(|i| json!({ "request_id": request_id(i), "payload": { "seq": i } }).to_string())
        .collect();

    if messages > 0 {
        bodies.extend((0..duplicates).map(|i| {
            let original = i % messages;
            json!({ "request_id": request_id(original), "payload": { "seq": original, "resent": true } })
                .to_string()
        }));
    }
    bodies.extend((0..invalid).map(|i| json!({ "payload": { "orphan": i } }).to_string()));
    bodies
}

/// Execute the `simulate` command
pub async fn run_simulate(args: &SimulateArgs) -> Result<()> {
    let config = load_config(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config.origin()))?;

    if args.metrics_port != 0 {
        observability::init_metrics_only(args.metrics_port)?;
    }

    let destinations = config.destination_list();
    let broker = Arc::new(
        MemoryBroker::new(BrokerConfig {
            max_send_batch: config.max_batch_size,
            max_delete_batch: config.max_batch_size,
            ..Default::default()
        })
        .with_destinations(&destinations),
    );

    for (name, depth) in &args.seed_depth {
        if !config.destinations.contains_key(name) {
            return Err(CliError::UnknownDestination { name: name.clone() }.into());
        }
        broker.seed_depth(name, *depth);
    }

    let bodies = generate_bodies(args.messages, args.duplicates, args.invalid);
    let enqueued = bodies.len();
    broker.enqueue_all(bodies);

    info!(
        enqueued,
        destinations = destinations.len(),
        max_batch_size = config.max_batch_size,
        "Starting simulation"
    );

    let context = DispatchContext::from_config(&config, Arc::clone(&broker), MemoryIdempotencyStore::new());
    let pipeline = Arc::new(DispatchPipeline::new(
        context,
        Arc::clone(&broker),
        Arc::clone(&broker),
    ));
    let worker = DispatchWorker::new(Arc::clone(&broker), pipeline, config.max_batch_size);

    let started = Instant::now();
    let mut summary = worker.run_until_idle().await?;
    if args.redeliver && broker.requeue_unacked() > 0 {
        let second = worker.run_until_idle().await?;
        summary = merge_summaries(summary, second);
    }
    let elapsed = started.elapsed();

    let report = build_report(&broker, enqueued, summary, elapsed);

    if args.json {
        let json =
            serde_json::to_string_pretty(&report).context("Failed to serialize simulation report")?;
        println!("{}", json);
    } else {
        print_report(&report);
    }

    info!(
        forwarded = report.stats.forwarded,
        duplicates = report.stats.duplicate,
        failed = report.stats.failed(),
        "Simulation finished"
    );
    Ok(())
}

fn merge_summaries(mut first: MetricsSummary, second: MetricsSummary) -> MetricsSummary {
    first.batches += second.batches;
    first.aborted_batches += second.aborted_batches;
    first.totals.merge(&second.totals);
    for (destination, count) in second.forwarded_by_destination {
        *first.forwarded_by_destination.entry(destination).or_insert(0) += count;
    }
    first
}

fn build_report(
    broker: &MemoryBroker,
    enqueued: usize,
    summary: MetricsSummary,
    elapsed: Duration,
) -> SimulationReport {
    let final_depths = broker
        .forwarded_counts()
        .keys()
        .filter_map(|name| broker.destination_depth(name).map(|d| (name.clone(), d)))
        .collect();

    SimulationReport {
        enqueued,
        batches: summary.batches,
        aborted_batches: summary.aborted_batches,
        redelivered: broker.metrics().redelivered,
        duration_ms: elapsed.as_millis(),
        stats: summary.totals,
        distribution: summary.forwarded_by_destination,
        final_depths,
        unacknowledged: broker.in_flight_len(),
    }
}

fn print_report(report: &SimulationReport) {
    println!("\n╔══════════════════════════════════════════════════════════════╗");
    println!("║                    Simulation Statistics                     ║");
    println!("╚══════════════════════════════════════════════════════════════╝\n");

    let stats = &report.stats;
    println!("📊 Overview");
    println!("   ├─ Duration: {}ms", report.duration_ms);
    println!("   ├─ Enqueued: {}", report.enqueued);
    println!(
        "   ├─ Batches: {} ({} aborted)",
        report.batches, report.aborted_batches
    );
    println!("   ├─ Redelivered: {}", report.redelivered);
    println!("   └─ Throughput: {:.1} msg/s", report.throughput());

    println!("\n📈 Outcomes");
    println!("   ├─ Forwarded: {}", stats.forwarded);
    println!("   ├─ Duplicates: {}", stats.duplicate);
    println!("   ├─ Invalid envelope: {}", stats.validation_failed);
    println!("   ├─ No destination: {}", stats.selection_failed);
    println!("   ├─ Forward failed: {}", stats.forward_failed);
    println!(
        "   ├─ Acknowledged: {} ({} failed)",
        stats.acknowledged, stats.ack_failed
    );
    println!("   └─ Left unacknowledged: {}", report.unacknowledged);

    if !report.final_depths.is_empty() {
        println!("\n📤 Distribution");
        let count = report.final_depths.len();
        for (i, (name, depth)) in report.final_depths.iter().enumerate() {
            let prefix = if i + 1 == count { "└─" } else { "├─" };
            let forwarded = report.distribution.get(name).copied().unwrap_or(0);
            let share = if stats.forwarded > 0 {
                forwarded as f64 / stats.forwarded as f64 * 100.0
            } else {
                0.0
            };
            println!(
                "   {} {}: {} forwarded ({:.1}%), depth {}",
                prefix, name, forwarded, share, depth
            );
        }
    }

    println!();
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::Envelope;

    #[test]
    fn test_generate_bodies() {
        let bodies = generate_bodies(5, 7, 2);
        assert_eq!(bodies.len(), 14);

        let ids: Vec<Option<String>> = bodies
            .iter()
            .map(|b| Envelope::parse(b).ok().map(|e| e.request_id))
            .collect();
        assert_eq!(ids[0].as_deref(), Some("sim-000000"));
        // Re-sent ids wrap around the distinct set
        assert_eq!(ids[5].as_deref(), Some("sim-000000"));
        assert_eq!(ids[10].as_deref(), Some("sim-000000"));
        assert!(ids[12].is_none());
        assert!(ids[13].is_none());
    }

    #[test]
    fn test_no_duplicates_without_messages() {
        assert_eq!(generate_bodies(0, 3, 1).len(), 1);
    }

    #[test]
    fn test_merge_summaries() {
        let mut first = MetricsSummary::default();
        first.batches = 2;
        first.totals.forwarded = 5;
        first.forwarded_by_destination.insert("a".into(), 5);
        let mut second = MetricsSummary::default();
        second.batches = 1;
        second.totals.duplicate = 3;
        second.forwarded_by_destination.insert("a".into(), 1);

        let merged = merge_summaries(first, second);
        assert_eq!(merged.batches, 3);
        assert_eq!(merged.totals.forwarded, 5);
        assert_eq!(merged.totals.duplicate, 3);
        assert_eq!(merged.forwarded_by_destination["a"], 6);
    }
}
