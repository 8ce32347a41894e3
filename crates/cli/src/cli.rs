//! CLI argument definitions using clap.

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Default configuration file when neither `--config` nor `--from-env` is given
pub const DEFAULT_CONFIG_PATH: &str = "distributor.toml";

/// Distributor - load-aware regional message distributor
#[derive(Parser, Debug)]
#[command(
    name = "distributor",
    author,
    version,
    about = "Load-aware regional message distributor",
    long_about = "Routes inbound messages to the least-loaded regional queue.\n\n\
                  Deduplicates by request id through an atomic claim, picks a \n\
                  destination per message by inverse-load weighted sampling, and \n\
                  acknowledges only duplicates and successfully forwarded messages."
)]
pub struct Cli {
    /// Increase logging verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true, env = "DISTRIBUTOR_VERBOSE")]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Log output format
    #[arg(
        long,
        value_enum,
        default_value = "pretty",
        global = true,
        env = "DISTRIBUTOR_LOG_FORMAT"
    )]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Validate configuration without running
    Validate(ValidateArgs),

    /// Display configuration information
    Info(InfoArgs),

    /// Run the pipeline against the in-memory broker
    Simulate(SimulateArgs),
}

impl Commands {
    /// Configuration source of the selected command
    pub fn config_args(&self) -> &ConfigArgs {
        match self {
            Self::Validate(args) => &args.config,
            Self::Info(args) => &args.config,
            Self::Simulate(args) => &args.config,
        }
    }
}

/// Where to read configuration from
#[derive(Args, Debug, Clone)]
pub struct ConfigArgs {
    /// Path to configuration file (TOML or JSON)
    #[arg(short, long, env = "DISTRIBUTOR_CONFIG", conflicts_with = "from_env")]
    pub config: Option<PathBuf>,

    /// Read configuration from environment variables (REGION_QUEUES, CACHE_TTL, ...)
    #[arg(long)]
    pub from_env: bool,
}

impl ConfigArgs {
    /// Config file path, falling back to the default
    pub fn path(&self) -> PathBuf {
        self.config
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
    }

    /// Human-readable origin of the configuration
    pub fn origin(&self) -> String {
        if self.from_env {
            "environment".to_string()
        } else {
            self.path().display().to_string()
        }
    }
}

/// Arguments for the `validate` command
#[derive(Parser, Debug)]
pub struct ValidateArgs {
    #[command(flatten)]
    pub config: ConfigArgs,

    /// Output validation result as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `info` command
#[derive(Parser, Debug)]
pub struct InfoArgs {
    #[command(flatten)]
    pub config: ConfigArgs,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `simulate` command
#[derive(Parser, Debug, Clone)]
pub struct SimulateArgs {
    #[command(flatten)]
    pub config: ConfigArgs,

    /// Number of distinct messages to enqueue
    #[arg(short = 'n', long, default_value = "100", env = "DISTRIBUTOR_SIM_MESSAGES")]
    pub messages: usize,

    /// Number of messages re-sent with an already used request id
    #[arg(short, long, default_value = "0")]
    pub duplicates: usize,

    /// Number of messages without a request id
    #[arg(long, default_value = "0")]
    pub invalid: usize,

    /// Pre-existing backlog of a destination (repeatable), e.g. `us-east-1=4000`
    #[arg(long = "seed-depth", value_name = "NAME=DEPTH", value_parser = parse_seed_depth)]
    pub seed_depth: Vec<(String, u64)>,

    /// Requeue unacknowledged messages once after the first drain
    #[arg(long)]
    pub redeliver: bool,

    /// Metrics server port (0 = disabled)
    #[arg(long, default_value = "0", env = "DISTRIBUTOR_METRICS_PORT")]
    pub metrics_port: u16,

    /// Output report as JSON
    #[arg(long)]
    pub json: bool,
}

/// Parse `name=depth`
pub fn parse_seed_depth(value: &str) -> Result<(String, u64), String> {
    let (name, depth) = value
        .split_once('=')
        .ok_or_else(|| format!("expected NAME=DEPTH, got '{value}'"))?;
    let name = name.trim();
    if name.is_empty() {
        return Err(format!("empty destination name in '{value}'"));
    }
    let depth = depth
        .trim()
        .parse::<u64>()
        .map_err(|e| format!("invalid depth in '{value}': {e}"))?;
    Ok((name.to_string(), depth))
}

/// Log output format
#[derive(ValueEnum, Clone, Copy, Debug, Default)]
pub enum LogFormat {
    /// JSON structured logging
    Json,
    /// Human-readable pretty format
    #[default]
    Pretty,
    /// Compact single-line format
    Compact,
}

impl From<LogFormat> for observability::LogFormat {
    fn from(format: LogFormat) -> Self {
        match format {
            LogFormat::Json => Self::Json,
            LogFormat::Pretty => Self::Pretty,
            LogFormat::Compact => Self::Compact,
        }
    }
}
