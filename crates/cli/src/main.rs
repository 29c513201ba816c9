//! # Accel Sync CLI
//!
//! 命令行接口入口点。
//!
//! 提供：
//! - 配置加载与验证
//! - 时钟校准与事件流会话编排
//! - 主机端点 (serve)
//! - 优雅关闭处理

mod cli;
mod commands;
mod config;
mod error;
mod session;

use anyhow::Result;
use clap::Parser;
use observability::ObservabilityConfig;
use tracing::info;

use cli::{Cli, Commands};
use commands::{run_calibrate, run_serve, run_stream, run_validate};

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    // Initialize logging based on CLI options
    init_observability(&cli)?;

    info!(
        version = env!("CARGO_PKG_VERSION"),
        "Accel Sync CLI starting"
    );

    // Execute command
    let result = match &cli.command {
        Commands::Calibrate(args) => run_calibrate(args).await,
        Commands::Stream(args) => run_stream(args).await,
        Commands::Serve(args) => run_serve(args).await,
        Commands::Validate(args) => run_validate(args),
    };

    if let Err(ref e) = result {
        tracing::error!(error = %e, "Command failed");
    }

    result
}

/// Initialize logging (and optionally metrics) based on CLI options
fn init_observability(cli: &Cli) -> Result<()> {
    observability::init_with_config(
        ObservabilityConfig::from_verbosity(cli.quiet, cli.verbose)
            .with_format(cli.log_format.into())
            .with_metrics_port(cli.metrics_port),
    )
}
