//! 环境变量加载
//!
//! 变量名与部署环境保持一致：
//! `CACHE_TTL`, `MAX_QUEUE_DEPTH_THRESHOLD`, `IDEMPOTENCY_TABLE_NAME`,
//! `IDEMPOTENCY_TTL_DAYS`, `MAX_BATCH_SIZE`, `LOG_LEVEL`,
//! `REGION_QUEUES` (JSON object: region -> queue endpoint)。

use std::collections::BTreeMap;
use std::str::FromStr;

use contracts::{ContractError, DistributorConfig};

pub const CACHE_TTL: &str = "CACHE_TTL";
pub const MAX_QUEUE_DEPTH_THRESHOLD: &str = "MAX_QUEUE_DEPTH_THRESHOLD";
pub const IDEMPOTENCY_TABLE_NAME: &str = "IDEMPOTENCY_TABLE_NAME";
pub const IDEMPOTENCY_TTL_DAYS: &str = "IDEMPOTENCY_TTL_DAYS";
pub const MAX_BATCH_SIZE: &str = "MAX_BATCH_SIZE";
pub const LOG_LEVEL: &str = "LOG_LEVEL";
pub const REGION_QUEUES: &str = "REGION_QUEUES";

/// 从任意 key-value 查找函数构建配置（未设置的变量使用默认值）
pub fn from_lookup<F>(lookup: F) -> Result<DistributorConfig, ContractError>
where
    F: Fn(&str) -> Option<String>,
{
    let mut config = DistributorConfig::default();

    if let Some(v) = parse_var(&lookup, CACHE_TTL)? {
        config.cache_ttl_secs = v;
    }
    if let Some(v) = parse_var(&lookup, MAX_QUEUE_DEPTH_THRESHOLD)? {
        config.max_queue_depth_threshold = v;
    }
    if let Some(v) = lookup(IDEMPOTENCY_TABLE_NAME) {
        config.idempotency_table = v;
    }
    if let Some(v) = parse_var(&lookup, IDEMPOTENCY_TTL_DAYS)? {
        config.idempotency_ttl_days = v;
    }
    if let Some(v) = parse_var(&lookup, MAX_BATCH_SIZE)? {
        config.max_batch_size = v;
    }
    if let Some(v) = lookup(LOG_LEVEL) {
        config.log_level = v.to_lowercase();
    }
    if let Some(raw) = lookup(REGION_QUEUES) {
        config.destinations = parse_region_queues(&raw)?;
    }

    Ok(config)
}

fn parse_var<F, T>(lookup: &F, key: &str) -> Result<Option<T>, ContractError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        None => Ok(None),
        Some(raw) => raw.trim().parse::<T>().map(Some).map_err(|e| {
            ContractError::config_parse(format!("{key}={raw:?} is not a valid number: {e}"))
        }),
    }
}

fn parse_region_queues(raw: &str) -> Result<BTreeMap<String, String>, ContractError> {
    serde_json::from_str(raw).map_err(|e| ContractError::ConfigParse {
        message: format!("{REGION_QUEUES} must be a JSON object of region -> endpoint: {e}"),
        source: Some(Box::new(e)),
    })
}
