//! CLI argument definitions using clap.

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Accel Sync - device/host clock calibration and accelerometer event streaming
#[derive(Parser, Debug)]
#[command(
    name = "accel-sync",
    author,
    version,
    about = "Clock calibration and timestamped accelerometer streaming",
    long_about = "Calibrates the local clock against a remote host with a probe exchange,\n\
                  then streams accelerometer batches whose timestamps are translated \n\
                  to the host clock. Also runs the host side of the protocol."
)]
pub struct Cli {
    /// Increase logging verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true, env = "ACCEL_SYNC_VERBOSE")]
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
        env = "ACCEL_SYNC_LOG_FORMAT"
    )]
    pub log_format: LogFormat,

    /// Prometheus metrics port (0 = disabled)
    #[arg(long, default_value = "0", global = true, env = "ACCEL_SYNC_METRICS_PORT")]
    pub metrics_port: u16,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run one or more calibration sessions and print the offset
    Calibrate(CalibrateArgs),

    /// Calibrate, then stream mock accelerometer samples until stopped
    Stream(StreamArgs),

    /// Run the host endpoint (calibration responder, event and play receivers)
    Serve(ServeArgs),

    /// Validate configuration file without running
    Validate(ValidateArgs),
}

/// Where the session configuration comes from
#[derive(Args, Debug, Clone, Default)]
pub struct SessionArgs {
    /// Path to configuration file (TOML or JSON)
    #[arg(short, long, env = "ACCEL_SYNC_CONFIG")]
    pub config: Option<PathBuf>,

    /// Override host address from configuration
    #[arg(long, env = "ACCEL_SYNC_HOST")]
    pub host: Option<String>,

    /// Override calibration port
    #[arg(long, env = "ACCEL_SYNC_CALIBRATION_PORT")]
    pub calibration_port: Option<u16>,

    /// Override event port
    #[arg(long, env = "ACCEL_SYNC_EVENT_PORT")]
    pub event_port: Option<u16>,

    /// Override (or enable) the play port
    #[arg(long, env = "ACCEL_SYNC_PLAY_PORT")]
    pub play_port: Option<u16>,
}

/// Arguments for the `calibrate` command
#[derive(Parser, Debug, Clone)]
pub struct CalibrateArgs {
    #[command(flatten)]
    pub session: SessionArgs,

    /// Number of calibration sessions to run
    #[arg(long, default_value = "1")]
    pub repeat: u32,

    /// Calibrate against a simulated host instead of the network
    #[arg(long)]
    pub simulate: bool,

    /// Simulated host clock offset (ms)
    #[arg(long, default_value = "250", requires = "simulate", allow_negative_numbers = true)]
    pub sim_offset_ms: i64,

    /// Simulated symmetric round trip (ms)
    #[arg(long, default_value = "40", requires = "simulate")]
    pub sim_rtt_ms: i64,
}

/// Arguments for the `stream` command
#[derive(Parser, Debug, Clone)]
pub struct StreamArgs {
    #[command(flatten)]
    pub session: SessionArgs,

    /// Streaming duration in seconds (0 = until Ctrl+C)
    #[arg(long, default_value = "0", env = "ACCEL_SYNC_DURATION")]
    pub duration: u64,

    /// Mock accelerometer sampling rate (Hz)
    #[arg(long, default_value = "50")]
    pub rate_hz: f64,

    /// Send a play command `streaming.play_delay_ms` after connecting
    #[arg(long)]
    pub play: bool,
}

/// Arguments for the `serve` command
#[derive(Parser, Debug, Clone)]
pub struct ServeArgs {
    #[command(flatten)]
    pub session: SessionArgs,

    /// Address to bind the listeners on
    #[arg(long, default_value = "0.0.0.0", env = "ACCEL_SYNC_BIND")]
    pub bind: String,

    /// Run the host clock this many ms ahead of the local clock
    #[arg(long, default_value = "0", allow_negative_numbers = true)]
    pub skew_ms: i64,

    /// Override samples per event packet
    #[arg(long)]
    pub batch_size: Option<usize>,
}

/// Arguments for the `validate` command
#[derive(Parser, Debug)]
pub struct ValidateArgs {
    /// Path to configuration file to validate
    #[arg(short, long, default_value = "accel-sync.toml")]
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
            LogFormat::Json => observability::LogFormat::Json,
            LogFormat::Pretty => observability::LogFormat::Pretty,
            LogFormat::Compact => observability::LogFormat::Compact,
        }
    }
}
