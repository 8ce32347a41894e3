//! Error types for CLI operations.

use thiserror::Error;

/// CLI-specific error types
#[derive(Error, Debug)]
pub enum CliError {
    /// Configuration file not found
    #[error("Configuration file not found: {path}")]
    ConfigNotFound { path: String },

    /// Configuration load or validation error
    #[error("Invalid configuration from {origin}: {source}")]
    Config {
        origin: String,
        #[source]
        source: contracts::ContractError,
    },

    /// Seeded destination is not in the registry
    #[error("Unknown destination '{name}' in --seed-depth")]
    UnknownDestination { name: String },
}

impl CliError {
    pub fn config_not_found(path: impl Into<String>) -> Self {
        Self::ConfigNotFound { path: path.into() }
    }

    pub fn config(origin: impl Into<String>, source: contracts::ContractError) -> Self {
        Self::Config {
            origin: origin.into(),
            source,
        }
    }
}
