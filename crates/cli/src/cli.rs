//! CLI argument definitions using clap.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// RM Streamer - pose-correlated sensor frame streaming over TCP
#[derive(Parser, Debug)]
#[command(
    name = "rm-streamer",
    author,
    version,
    about = "Pose-correlated sensor frame streamer",
    long_about = "Streams device sensor frames to a single TCP client.\n\n\
                  Each frame is tagged with the rig pose at its capture time, \n\
                  an absolute timestamp and a diagnostic line, then written as \n\
                  one length-prefixed binary message."
)]
pub struct Cli {
    /// Increase logging verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true, env = "RM_STREAMER_VERBOSE")]
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
        env = "RM_STREAMER_LOG_FORMAT"
    )]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Serve frames from the simulated device (SIGUSR1 toggles streaming)
    Run(RunArgs),

    /// Connect to a streamer and print the messages it sends
    Watch(WatchArgs),

    /// Validate configuration file without running
    Validate(ValidateArgs),

    /// Display configuration information
    Info(InfoArgs),
}

/// Arguments for the `run` command
#[derive(Parser, Debug, Clone)]
pub struct RunArgs {
    /// Path to configuration file (TOML or JSON)
    #[arg(
        short,
        long,
        default_value = "streamer.toml",
        env = "RM_STREAMER_CONFIG"
    )]
    pub config: PathBuf,

    /// Override the listening service ("5000" or "127.0.0.1:5000")
    #[arg(long, env = "RM_STREAMER_SERVICE")]
    pub service: Option<String>,

    /// Stop after the device captured this many frames (0 = unlimited)
    #[arg(long, default_value = "0", env = "RM_STREAMER_MAX_FRAMES")]
    pub max_frames: u64,

    /// Stop after this many seconds (0 = no timeout)
    #[arg(long, default_value = "0", env = "RM_STREAMER_TIMEOUT")]
    pub timeout: u64,

    /// Metrics server port (0 = disabled)
    #[arg(long, default_value = "0", env = "RM_STREAMER_METRICS_PORT")]
    pub metrics_port: u16,
}

/// Arguments for the `watch` command
#[derive(Parser, Debug, Clone)]
pub struct WatchArgs {
    /// Streamer address
    #[arg(short, long, default_value = "127.0.0.1:5000", env = "RM_STREAMER_ADDR")]
    pub addr: String,

    /// Exit after this many messages (0 = until the streamer disconnects)
    #[arg(short = 'n', long, default_value = "0")]
    pub count: u64,

    /// Print one JSON object per message
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `validate` command
#[derive(Parser, Debug)]
pub struct ValidateArgs {
    /// Path to configuration file to validate
    #[arg(short, long, default_value = "streamer.toml")]
    pub config: PathBuf,

    /// Output validation result as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `info` command
#[derive(Parser, Debug)]
pub struct InfoArgs {
    /// Path to configuration file
    #[arg(short, long, default_value = "streamer.toml")]
    pub config: PathBuf,

    /// Output as JSON
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
