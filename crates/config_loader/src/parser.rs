//! 配置解析模块
//!
//! 支持 TOML (主要) 和 JSON 格式。

use contracts::{ContractError, DistributorConfig};

/// 配置文件格式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    /// TOML 格式 (推荐)
    Toml,
    /// JSON 格式
    Json,
}

impl ConfigFormat {
    /// 从文件扩展名推断格式
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "toml" => Some(Self::Toml),
            "json" => Some(Self::Json),
            _ => None,
        }
    }
}

/// 解析 TOML 格式配置
pub fn parse_toml(content: &str) -> Result<DistributorConfig, ContractError> {
    toml::from_str(content).map_err(|e| ContractError::ConfigParse {
        message: format!("TOML parse error: {e}"),
        source: Some(Box::new(e)),
    })
}

/// 解析 JSON 格式配置
pub fn parse_json(content: &str) -> Result<DistributorConfig, ContractError> {
    serde_json::from_str(content).map_err(|e| ContractError::ConfigParse {
        message: format!("JSON parse error: {e}"),
        source: Some(Box::new(e)),
    })
}

/// 根据格式解析配置
pub fn parse(content: &str, format: ConfigFormat) -> Result<DistributorConfig, ContractError> {
    match format {
        ConfigFormat::Toml => parse_toml(content),
        ConfigFormat::Json => parse_json(content),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_toml_fills_defaults() {
        let content = r#"
[destinations]
us-east-1 = "https://sqs.us-east-1.amazonaws.com/123/inference-us-east-1"
"#;
        let config = parse_toml(content).unwrap();
        assert_eq!(config.cache_ttl_secs, 60);
        assert_eq!(config.max_queue_depth_threshold, 5000);
        assert_eq!(config.destinations.len(), 1);
    }

    #[test]
    fn test_parse_json_full() {
        let content = r#"{
            "cache_ttl_secs": 30,
            "max_queue_depth_threshold": 1000,
            "idempotency_table": "dedup",
            "idempotency_ttl_days": 3,
            "destinations": {
                "us-east-1": "mem://us-east-1",
                "us-west-2": "mem://us-west-2"
            }
        }"#;
        let config = parse_json(content).unwrap();
        assert_eq!(config.cache_ttl_secs, 30);
        assert_eq!(config.idempotency_table, "dedup");
        assert_eq!(config.destinations.len(), 2);
    }

    #[test]
    fn test_negative_numbers_are_parse_errors() {
        let content = r#"
cache_ttl_secs = -5
[destinations]
a = "mem://a"
"#;
        let err = parse_toml(content).unwrap_err();
        assert!(matches!(err, ContractError::ConfigParse { .. }));
    }

    #[test]
    fn test_format_from_extension() {
        assert_eq!(
            ConfigFormat::from_extension("TOML"),
            Some(ConfigFormat::Toml)
        );
        assert_eq!(
            ConfigFormat::from_extension("json"),
            Some(ConfigFormat::Json)
        );
        assert_eq!(ConfigFormat::from_extension("yaml"), None);
    }
}
