//! 配置校验模块
//!
//! 校验规则：
//! - 数值配置 > 0 (cache_ttl_secs / max_queue_depth_threshold / idempotency_ttl_days / max_batch_size)
//! - idempotency_table 非空
//! - destinations 非空，名称与 endpoint 非空白

use contracts::{ContractError, DistributorConfig};
use ::validator::Validate;

/// 校验 DistributorConfig
///
/// 返回第一个遇到的错误，或 Ok(())。
pub fn validate(config: &DistributorConfig) -> Result<(), ContractError> {
    validate_ranges(config)?;
    validate_table_name(config)?;
    validate_destinations(config)?;
    Ok(())
}

/// 数值范围与必填字段 (derive 规则)
fn validate_ranges(config: &DistributorConfig) -> Result<(), ContractError> {
    let Err(errors) = config.validate() else {
        return Ok(());
    };

    // 按字段名排序，保证错误信息稳定
    let mut fields: Vec<(String, String)> = errors
        .field_errors()
        .into_iter()
        .map(|(field, errs)| {
            let code = errs
                .first()
                .map(|e| e.code.to_string())
                .unwrap_or_else(|| "invalid".to_string());
            (field.to_string(), code)
        })
        .collect();
    fields.sort();

    match fields.into_iter().next() {
        Some((field, code)) => Err(ContractError::config_validation(
            field.clone(),
            format!("{field} failed '{code}' check: must be > 0 / non-empty"),
        )),
        None => Err(ContractError::config_validation("config", errors.to_string())),
    }
}

/// 表名不能只有空白
fn validate_table_name(config: &DistributorConfig) -> Result<(), ContractError> {
    if config.idempotency_table.trim().is_empty() {
        return Err(ContractError::config_validation(
            "idempotency_table",
            "idempotency_table must not be blank",
        ));
    }
    Ok(())
}

/// 目标队列注册表
fn validate_destinations(config: &DistributorConfig) -> Result<(), ContractError> {
    if config.destinations.is_empty() {
        return Err(ContractError::config_validation(
            "destinations",
            "destination registry is empty",
        ));
    }

    for (name, endpoint) in &config.destinations {
        if name.trim().is_empty() {
            return Err(ContractError::config_validation(
                "destinations",
                "destination name must not be blank",
            ));
        }
        if endpoint.trim().is_empty() {
            return Err(ContractError::config_validation(
                format!("destinations[{name}]"),
                "endpoint must not be blank",
            ));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_config() -> DistributorConfig {
        let mut config = DistributorConfig::default();
        config
            .destinations
            .insert("us-east-1".to_string(), "mem://us-east-1".to_string());
        config
    }

    #[test]
    fn test_valid_config_passes() {
        assert!(validate(&valid_config()).is_ok());
    }

    #[test]
    fn test_empty_registry_rejected() {
        let config = DistributorConfig::default();
        let err = validate(&config).unwrap_err();
        assert!(err.to_string().contains("destination registry is empty"));
    }

    #[test]
    fn test_zero_numeric_settings_rejected() {
        let mut config = valid_config();
        config.max_queue_depth_threshold = 0;
        let err = validate(&config).unwrap_err();
        assert!(err.to_string().contains("max_queue_depth_threshold"));

        let mut config = valid_config();
        config.idempotency_ttl_days = 0;
        let err = validate(&config).unwrap_err();
        assert!(err.to_string().contains("idempotency_ttl_days"));

        let mut config = valid_config();
        config.max_batch_size = 0;
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_blank_values_rejected() {
        let mut config = valid_config();
        config.idempotency_table = "  ".to_string();
        assert!(validate(&config).is_err());

        let mut config = valid_config();
        config
            .destinations
            .insert("us-west-2".to_string(), " ".to_string());
        let err = validate(&config).unwrap_err();
        assert!(err.to_string().contains("destinations[us-west-2]"));
    }
}
