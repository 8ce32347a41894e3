//! DistributorConfig - validated configuration value object
//!
//! Built once at startup by `config_loader`; every other crate receives it
//! (or values derived from it) already validated.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;
use validator::Validate;

use crate::{Destination, DEFAULT_MAX_BATCH_SIZE};

const SECONDS_PER_DAY: u64 = 24 * 3600;

/// Distributor configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct DistributorConfig {
    /// Load cache TTL in seconds
    #[serde(default = "default_cache_ttl_secs")]
    #[validate(range(min = 1))]
    pub cache_ttl_secs: u64,

    /// Depth at or above which a destination is excluded from selection
    #[serde(default = "default_max_queue_depth_threshold")]
    #[validate(range(min = 1))]
    pub max_queue_depth_threshold: u64,

    /// Idempotency store identifier (table name)
    #[serde(default = "default_idempotency_table")]
    #[validate(length(min = 1))]
    pub idempotency_table: String,

    /// Dedup retention window in days
    #[serde(default = "default_idempotency_ttl_days")]
    #[validate(range(min = 1))]
    pub idempotency_ttl_days: u32,

    /// Maximum entries per batched receive / send / delete
    #[serde(default = "default_max_batch_size")]
    #[validate(range(min = 1))]
    pub max_batch_size: usize,

    /// Default log level when neither RUST_LOG nor a verbosity flag is given
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Destination registry: name -> endpoint
    #[serde(default)]
    pub destinations: BTreeMap<String, String>,
}

fn default_cache_ttl_secs() -> u64 {
    60
}

fn default_max_queue_depth_threshold() -> u64 {
    5000
}

fn default_idempotency_table() -> String {
    "inference-idempotency".to_string()
}

fn default_idempotency_ttl_days() -> u32 {
    7
}

fn default_max_batch_size() -> usize {
    DEFAULT_MAX_BATCH_SIZE
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for DistributorConfig {
    /// Defaults for every setting; the registry starts empty and must be filled
    fn default() -> Self {
        Self {
            cache_ttl_secs: default_cache_ttl_secs(),
            max_queue_depth_threshold: default_max_queue_depth_threshold(),
            idempotency_table: default_idempotency_table(),
            idempotency_ttl_days: default_idempotency_ttl_days(),
            max_batch_size: default_max_batch_size(),
            log_level: default_log_level(),
            destinations: BTreeMap::new(),
        }
    }
}

impl DistributorConfig {
    /// Load cache TTL
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    /// Dedup retention window
    pub fn retention(&self) -> Duration {
        Duration::from_secs(u64::from(self.idempotency_ttl_days) * SECONDS_PER_DAY)
    }

    /// Registry as destination values, ordered by name
    pub fn destination_list(&self) -> Vec<Destination> {
        self.destinations
            .iter()
            .map(|(name, endpoint)| Destination::new(name.as_str(), endpoint.as_str()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_values() {
        let config = DistributorConfig::default();
        assert_eq!(config.cache_ttl(), Duration::from_secs(60));
        assert_eq!(config.max_queue_depth_threshold, 5000);
        assert_eq!(config.retention(), Duration::from_secs(7 * 86_400));
        assert_eq!(config.max_batch_size, 10);
        assert!(config.destinations.is_empty());
    }

    #[test]
    fn test_derived_range_checks() {
        let mut config = DistributorConfig::default();
        assert!(config.validate().is_ok());

        config.cache_ttl_secs = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_destination_list_is_ordered() {
        let mut config = DistributorConfig::default();
        config
            .destinations
            .insert("us-west-2".to_string(), "mem://us-west-2".to_string());
        config
            .destinations
            .insert("us-east-1".to_string(), "mem://us-east-1".to_string());

        let list = config.destination_list();
        assert_eq!(list[0].id, "us-east-1");
        assert_eq!(list[1].endpoint, "mem://us-west-2");
    }
}
