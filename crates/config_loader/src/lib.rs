//! # Config Loader
//!
//! Configuration loading and parsing module.
//!
//! Responsibilities:
//! - Parse TOML/JSON configuration files or environment variables
//! - Validate configuration legality (fail fast at startup)
//! - Produce a `DistributorConfig`
//!
//! # Example
//!
//! ```no_run
//! use config_loader::ConfigLoader;
//! use std::path::Path;
//!
//! let config = ConfigLoader::load_from_path(Path::new("distributor.toml")).unwrap();
//! println!("destinations: {}", config.destinations.len());
//! ```

pub mod env;
mod parser;
mod validator;

pub use contracts::DistributorConfig;
pub use parser::ConfigFormat;

use contracts::ContractError;
use std::path::Path;
use tracing::debug;

/// Configuration loader
///
/// Provides static methods to load configuration from files, strings or the
/// process environment. Every entry point validates before returning.
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration from file path
    ///
    /// Automatically detects format from file extension (.toml / .json).
    ///
    /// # Errors
    /// - File read failure
    /// - Unsupported format
    /// - Parse failure
    /// - Validation failure
    pub fn load_from_path(path: &Path) -> Result<DistributorConfig, ContractError> {
        let format = Self::detect_format(path)?;
        let content = Self::read_file(path)?;
        debug!(path = %path.display(), ?format, "Loading configuration file");
        Self::load_from_str(&content, format)
    }

    /// Load configuration from string
    ///
    /// # Errors
    /// - Parse failure
    /// - Validation failure
    pub fn load_from_str(
        content: &str,
        format: ConfigFormat,
    ) -> Result<DistributorConfig, ContractError> {
        let config = parser::parse(content, format)?;
        Self::validated(config)
    }

    /// Load configuration from process environment variables
    pub fn load_from_env() -> Result<DistributorConfig, ContractError> {
        Self::load_from_env_with(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary variable lookup
    pub fn load_from_env_with<F>(lookup: F) -> Result<DistributorConfig, ContractError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let config = env::from_lookup(lookup)?;
        Self::validated(config)
    }

    /// Validate an already-built configuration
    pub fn validated(config: DistributorConfig) -> Result<DistributorConfig, ContractError> {
        validator::validate(&config)?;
        Ok(config)
    }

    /// Serialize DistributorConfig to TOML string
    pub fn to_toml(config: &DistributorConfig) -> Result<String, ContractError> {
        toml::to_string_pretty(config)
            .map_err(|e| ContractError::config_parse(format!("TOML serialize error: {e}")))
    }

    /// Serialize DistributorConfig to JSON string
    pub fn to_json(config: &DistributorConfig) -> Result<String, ContractError> {
        serde_json::to_string_pretty(config)
            .map_err(|e| ContractError::config_parse(format!("JSON serialize error: {e}")))
    }
}

impl ConfigLoader {
    /// Infer configuration format from file extension
    fn detect_format(path: &Path) -> Result<ConfigFormat, ContractError> {
        let ext = path.extension().and_then(|e| e.to_str()).ok_or_else(|| {
            ContractError::config_parse("cannot determine file format from extension")
        })?;

        ConfigFormat::from_extension(ext).ok_or_else(|| {
            ContractError::config_parse(format!("unsupported config format: .{ext}"))
        })
    }

    /// Read configuration file content
    fn read_file(path: &Path) -> Result<String, ContractError> {
        Ok(std::fs::read_to_string(path)?)
    }
}
