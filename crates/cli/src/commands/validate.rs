//! `validate` command implementation.

use anyhow::{Context, Result};
use config_loader::DistributorConfig;
use contracts::DEFAULT_MAX_BATCH_SIZE;
use serde::Serialize;
use tracing::info;

use super::load_config;
use crate::cli::ValidateArgs;

/// Cache TTL above which load data is considered too stale to balance on
const STALE_CACHE_TTL_SECS: u64 = 300;

/// Validation result for JSON output
#[derive(Serialize)]
struct ValidationResult {
    valid: bool,
    config_origin: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    warnings: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    summary: Option<ConfigSummary>,
}

#[derive(Serialize)]
struct ConfigSummary {
    destination_count: usize,
    max_queue_depth_threshold: u64,
    cache_ttl_secs: u64,
    idempotency_table: String,
    idempotency_ttl_days: u32,
    max_batch_size: usize,
}

/// Execute the `validate` command
pub fn run_validate(args: &ValidateArgs) -> Result<()> {
    info!(config = %args.config.origin(), "Validating configuration");

    let result = validate_config(args);

    if args.json {
        let json = serde_json::to_string_pretty(&result)
            .context("Failed to serialize validation result")?;
        println!("{}", json);
    } else {
        print_validation_result(&result);
    }

    if result.valid {
        Ok(())
    } else {
        anyhow::bail!("Configuration validation failed")
    }
}

fn validate_config(args: &ValidateArgs) -> ValidationResult {
    let config_origin = args.config.origin();

    match load_config(&args.config) {
        Ok(config) => {
            let warnings = collect_warnings(&config);
            ValidationResult {
                valid: true,
                config_origin,
                error: None,
                warnings: if warnings.is_empty() {
                    None
                } else {
                    Some(warnings)
                },
                summary: Some(ConfigSummary {
                    destination_count: config.destinations.len(),
                    max_queue_depth_threshold: config.max_queue_depth_threshold,
                    cache_ttl_secs: config.cache_ttl_secs,
                    idempotency_table: config.idempotency_table.clone(),
                    idempotency_ttl_days: config.idempotency_ttl_days,
                    max_batch_size: config.max_batch_size,
                }),
            }
        }
        Err(e) => ValidationResult {
            valid: false,
            config_origin,
            error: Some(e.to_string()),
            warnings: None,
            summary: None,
        },
    }
}

/// Collect configuration warnings (non-fatal issues)
fn collect_warnings(config: &DistributorConfig) -> Vec<String> {
    let mut warnings = Vec::new();

    if config.destinations.len() == 1 {
        warnings.push("Only one destination configured - no load balancing possible".to_string());
    }

    if config.cache_ttl_secs > STALE_CACHE_TTL_SECS {
        warnings.push(format!(
            "cache_ttl_secs = {} - selection may act on stale queue depths",
            config.cache_ttl_secs
        ));
    }

    if config.max_batch_size > DEFAULT_MAX_BATCH_SIZE {
        warnings.push(format!(
            "max_batch_size = {} exceeds the usual queue service limit of {}",
            config.max_batch_size, DEFAULT_MAX_BATCH_SIZE
        ));
    }

    warnings
}

fn print_validation_result(result: &ValidationResult) {
    if result.valid {
        println!("✓ Configuration is valid: {}", result.config_origin);

        if let Some(ref summary) = result.summary {
            println!("\n  Destinations: {}", summary.destination_count);
            println!("  Overload threshold: {}", summary.max_queue_depth_threshold);
            println!("  Cache TTL: {}s", summary.cache_ttl_secs);
            println!(
                "  Idempotency: {} ({} days)",
                summary.idempotency_table, summary.idempotency_ttl_days
            );
            println!("  Max batch size: {}", summary.max_batch_size);
        }

        if let Some(ref warnings) = result.warnings {
            println!("\n⚠ Warnings:");
            for warning in warnings {
                println!("  - {}", warning);
            }
        }
    } else {
        println!("✗ Configuration is invalid: {}", result.config_origin);
        if let Some(ref error) = result.error {
            println!("\n  Error: {}", error);
        }
    }
}
