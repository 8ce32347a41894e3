//! Command implementations.

mod info;
mod simulate;
mod validate;

pub use info::run_info;
pub use simulate::run_simulate;
pub use validate::run_validate;

use config_loader::{ConfigLoader, DistributorConfig};

use crate::cli::ConfigArgs;
use crate::error::CliError;

/// Load and validate configuration from a file or the environment
pub fn load_config(args: &ConfigArgs) -> Result<DistributorConfig, CliError> {
    if args.from_env {
        return ConfigLoader::load_from_env().map_err(|e| CliError::config(args.origin(), e));
    }

    let path = args.path();
    if !path.exists() {
        return Err(CliError::config_not_found(path.display().to_string()));
    }
    ConfigLoader::load_from_path(&path).map_err(|e| CliError::config(args.origin(), e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn args(path: &std::path::Path) -> ConfigArgs {
        ConfigArgs {
            config: Some(path.to_path_buf()),
            from_env: false,
        }
    }

    #[test]
    fn test_load_config_from_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            "max_queue_depth_threshold = 100\n\n[destinations]\nus-east-1 = \"mem://us-east-1\""
        )
        .unwrap();

        let config = load_config(&args(file.path())).unwrap();
        assert_eq!(config.max_queue_depth_threshold, 100);
        assert_eq!(config.destinations.len(), 1);
    }

    #[test]
    fn test_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_config(&args(&dir.path().join("absent.toml"))).unwrap_err();
        assert!(matches!(err, CliError::ConfigNotFound { .. }));
    }

    #[test]
    fn test_invalid_file_reports_origin() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "cache_ttl_secs = 30").unwrap();

        let err = load_config(&args(file.path())).unwrap_err();
        assert!(matches!(err, CliError::Config { .. }));
        assert!(err.to_string().contains("Invalid configuration"));
    }
}
