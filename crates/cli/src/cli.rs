//! CLI argument definitions using clap.

use clap::{Parser, Subcommand, ValueEnum};
use contracts::StorageKind;
use std::path::PathBuf;

/// logpipe - per-application log dispatch and batching server
#[derive(Parser, Debug)]
#[command(
    name = "logpipe",
    author,
    version,
    about = "Per-application log ingestion, batching and live tailing",
    long_about = "Accepts newline-delimited JSON log entries from an authenticated client,\n\
                  routes them to one pipeline per application, publishes each entry for\n\
                  live tailing and persists them in size-or-idle triggered batches."
)]
pub struct Cli {
    /// Increase logging verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true, env = "LOGPIPE_VERBOSE")]
    pub verbose: u8,

    /// Suppress all output except warnings and errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Log output format
    #[arg(
        long,
        value_enum,
        default_value = "pretty",
        global = true,
        env = "LOGPIPE_LOG_FORMAT"
    )]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Log level used when `RUST_LOG` is not set
    pub fn default_log_level(&self) -> &'static str {
        if self.quiet {
            return "warn";
        }
        match self.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    }
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the ingestion and tail listeners
    Serve(ServeArgs),

    /// Validate configuration file without running
    Validate(ValidateArgs),
}

/// Arguments for the `serve` command
#[derive(Parser, Debug, Clone)]
pub struct ServeArgs {
    /// Path to configuration file (TOML or JSON)
    #[arg(short, long, default_value = "logpipe.toml", env = "LOGPIPE_CONFIG")]
    pub config: PathBuf,

    /// Override the ingestion listen address
    #[arg(long, env = "LOGPIPE_INGEST_ADDR")]
    pub ingest_addr: Option<String>,

    /// Override the tail listen address
    #[arg(long, env = "LOGPIPE_TAIL_ADDR")]
    pub tail_addr: Option<String>,

    /// Override the storage backend
    #[arg(long, value_enum, env = "LOGPIPE_STORAGE")]
    pub storage: Option<StorageArg>,

    /// Override the file storage directory
    #[arg(long, env = "LOGPIPE_STORAGE_PATH")]
    pub storage_path: Option<PathBuf>,

    /// Seconds to wait for open connections on shutdown
    #[arg(long, default_value = "5", env = "LOGPIPE_SHUTDOWN_TIMEOUT")]
    pub shutdown_timeout: u64,

    /// Metrics server port (0 = disabled)
    #[arg(long, default_value = "9000", env = "LOGPIPE_METRICS_PORT")]
    pub metrics_port: u16,

    /// Validate configuration and exit without listening
    #[arg(long)]
    pub dry_run: bool,
}

/// Arguments for the `validate` command
#[derive(Parser, Debug)]
pub struct ValidateArgs {
    /// Path to configuration file to validate
    #[arg(short, long, default_value = "logpipe.toml")]
    pub config: PathBuf,

    /// Output validation result as JSON
    #[arg(long)]
    pub json: bool,
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

/// Storage backend selectable from the command line
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum StorageArg {
    File,
    Memory,
}

impl From<StorageArg> for StorageKind {
    fn from(arg: StorageArg) -> Self {
        match arg {
            StorageArg::File => StorageKind::File,
            StorageArg::Memory => StorageKind::Memory,
        }
    }
}
