//! # Distributor CLI
//!
//! 命令行接口入口点。
//!
//! 提供：
//! - 配置加载与验证（文件或环境变量）
//! - 配置信息展示
//! - 基于内存代理的端到端模拟

mod cli;
mod commands;
mod error;

use anyhow::Result;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use cli::{Cli, Commands};
use commands::{run_info, run_simulate, run_validate};

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    // Initialize logging based on CLI options
    init_logging(&cli)?;

    info!(version = env!("CARGO_PKG_VERSION"), "Distributor CLI starting");

    let result = match &cli.command {
        Commands::Validate(args) => run_validate(args),
        Commands::Info(args) => run_info(args),
        Commands::Simulate(args) => run_simulate(args).await,
    };

    if let Err(ref e) = result {
        tracing::error!(error = %e, "Command failed");
    }

    result
}

/// Initialize logging based on CLI options
///
/// `RUST_LOG` overrides the verbosity flags unless `--quiet` is set.
fn init_logging(cli: &Cli) -> Result<()> {
    let format: observability::LogFormat = cli.log_format.into();

    if cli.quiet {
        return observability::init_tracing_with_filter(format, EnvFilter::new("warn"));
    }

    observability::init_tracing(format, &default_level(cli))
}

/// Default filter level: `-v` flags first, then the config's `log_level`
///
/// A config that fails to load falls back to `info`; the command itself
/// reports the error once logging is up.
fn default_level(cli: &Cli) -> String {
    match cli.verbose {
        0 => commands::load_config(cli.command.config_args())
            .map(|config| config.log_level)
            .unwrap_or_else(|_| "info".to_string()),
        1 => "debug".to_string(),
        _ => "trace".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn config_file(log_level: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        write!(
            file,
            "log_level = \"{log_level}\"\n\n[destinations]\nus-east-1 = \"mem://us-east-1\"\n"
        )
        .unwrap();
        file
    }

    #[test]
    fn test_config_log_level_is_default_filter() {
        let file = config_file("debug");
        let path = file.path().to_str().unwrap();

        let cli = Cli::try_parse_from(["distributor", "info", "--config", path]).unwrap();
        assert_eq!(default_level(&cli), "debug");

        // 命令行参数优先于配置
        let cli = Cli::try_parse_from(["distributor", "-vv", "info", "--config", path]).unwrap();
        assert_eq!(default_level(&cli), "trace");
    }

    #[test]
    fn test_unreadable_config_falls_back_to_info() {
        let cli = Cli::try_parse_from([
            "distributor",
            "validate",
            "--config",
            "/nonexistent/distributor.toml",
        ])
        .unwrap();
        assert_eq!(default_level(&cli), "info");
    }
}
