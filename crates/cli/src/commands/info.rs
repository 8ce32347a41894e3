//! `info` command implementation.

use anyhow::{Context, Result};
use config_loader::DistributorConfig;
use serde::Serialize;
use tracing::info;

use super::load_config;
use crate::cli::InfoArgs;

/// Configuration info for JSON output
#[derive(Serialize)]
struct ConfigInfo {
    destinations: Vec<DestinationInfo>,
    load_balancing: LoadBalancingInfo,
    idempotency: IdempotencyInfo,
    max_batch_size: usize,
    log_level: String,
}

#[derive(Serialize)]
struct DestinationInfo {
    name: String,
    endpoint: String,
}

#[derive(Serialize)]
struct LoadBalancingInfo {
    cache_ttl_secs: u64,
    max_queue_depth_threshold: u64,
}

#[derive(Serialize)]
struct IdempotencyInfo {
    table: String,
    ttl_days: u32,
}

/// Execute the `info` command
pub fn run_info(args: &InfoArgs) -> Result<()> {
    info!(config = %args.config.origin(), "Loading configuration info");

    let config = load_config(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config.origin()))?;

    if args.json {
        let json = serde_json::to_string_pretty(&build_config_info(&config))
            .context("Failed to serialize config info")?;
        println!("{}", json);
    } else {
        print_config_info(&config);
    }

    Ok(())
}

fn build_config_info(config: &DistributorConfig) -> ConfigInfo {
    ConfigInfo {
        destinations: config
            .destinations
            .iter()
            .map(|(name, endpoint)| DestinationInfo {
                name: name.clone(),
                endpoint: endpoint.clone(),
            })
            .collect(),
        load_balancing: LoadBalancingInfo {
            cache_ttl_secs: config.cache_ttl_secs,
            max_queue_depth_threshold: config.max_queue_depth_threshold,
        },
        idempotency: IdempotencyInfo {
            table: config.idempotency_table.clone(),
            ttl_days: config.idempotency_ttl_days,
        },
        max_batch_size: config.max_batch_size,
        log_level: config.log_level.clone(),
    }
}

fn print_config_info(config: &DistributorConfig) {
    println!("╔══════════════════════════════════════════════════════════════╗");
    println!("║               Distributor Configuration                      ║");
    println!("╚══════════════════════════════════════════════════════════════╝\n");

    println!("📤 Destinations ({})", config.destinations.len());
    let count = config.destinations.len();
    for (i, (name, endpoint)) in config.destinations.iter().enumerate() {
        let prefix = if i + 1 == count { "└─" } else { "├─" };
        println!("   {} {} → {}", prefix, name, endpoint);
    }

    println!("\n⚖️  Load Balancing");
    println!("   ├─ Cache TTL: {}s", config.cache_ttl_secs);
    println!(
        "   └─ Overload threshold: {} messages",
        config.max_queue_depth_threshold
    );

    println!("\n🔒 Idempotency");
    println!("   ├─ Table: {}", config.idempotency_table);
    println!("   └─ Retention: {} days", config.idempotency_ttl_days);

    println!("\n⚙️  Batching");
    println!("   ├─ Max batch size: {}", config.max_batch_size);
    println!("   └─ Log level: {}", config.log_level);

    println!();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_config_info() {
        let mut config = DistributorConfig::default();
        config
            .destinations
            .insert("us-east-1".into(), "mem://us-east-1".into());

        let info = build_config_info(&config);
        let json = serde_json::to_value(&info).unwrap();
        assert_eq!(json["destinations"][0]["name"], "us-east-1");
        assert_eq!(json["load_balancing"]["max_queue_depth_threshold"], 5000);
        assert_eq!(json["idempotency"]["table"], "inference-idempotency");
    }
}
