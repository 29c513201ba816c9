//! # Observability
//!
//! 日志与指标：tracing-subscriber 输出 + Prometheus exporter。
//!
//! 业务 crate 只调用 [`metrics`] 中的 `record_*` 函数；未安装 recorder
//! 时这些调用为空操作，因此单元测试无需任何初始化。
//!
//! ```ignore
//! use observability::{LogFormat, ObservabilityConfig};
//!
//! observability::init_with_config(
//!     ObservabilityConfig::from_verbosity(false, 1)
//!         .with_format(LogFormat::Compact)
//!         .with_metrics_port(9000),
//! )?;
//! ```

pub mod metrics;

use std::net::{Ipv4Addr, SocketAddr};

use anyhow::{Context, Result};
use metrics_exporter_prometheus::PrometheusBuilder;
use tracing::Subscriber;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

// Re-exports
pub use crate::metrics::{
    describe_metrics, record_batch_sent, record_calibration, record_play_command,
    record_samples_dropped, record_stop_sentinel, record_transport_failure,
    CalibrationAggregator, CalibrationSummary, RunningStats, StatsSummary,
};

/// Log output format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// JSON 结构化日志
    #[default]
    Json,
    Pretty,
    Compact,
}

/// Logging and metrics settings for one process
#[derive(Debug, Clone)]
pub struct ObservabilityConfig {
    pub log_format: LogFormat,
    /// Filter used when `RUST_LOG` is not set
    pub default_log_level: String,
    /// Prometheus scrape port (`None` = exporter disabled)
    pub metrics_port: Option<u16>,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_format: LogFormat::Json,
            default_log_level: "info".to_string(),
            metrics_port: None,
        }
    }
}

impl ObservabilityConfig {
    /// `-q` wins over any number of `-v`
    pub fn from_verbosity(quiet: bool, verbose: u8) -> Self {
        let level = match (quiet, verbose) {
            (true, _) => "warn",
            (false, 0) => "info",
            (false, 1) => "debug",
            (false, _) => "trace",
        };
        Self {
            default_log_level: level.to_string(),
            ..Self::default()
        }
    }

    pub fn with_format(mut self, log_format: LogFormat) -> Self {
        self.log_format = log_format;
        self
    }

    /// Port 0 leaves the exporter disabled
    pub fn with_metrics_port(mut self, port: u16) -> Self {
        self.metrics_port = (port != 0).then_some(port);
        self
    }
}

/// Install the global subscriber and, if configured, the Prometheus exporter
///
/// Fails when a global subscriber or recorder is already installed.
pub fn init_with_config(config: ObservabilityConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.default_log_level));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer(config.log_format))
        .try_init()
        .context("Failed to initialize tracing subscriber")?;

    if let Some(port) = config.metrics_port {
        init_metrics_only(port)?;
    }

    tracing::info!(
        log_format = ?config.log_format,
        metrics_port = ?config.metrics_port,
        "Observability initialized"
    );
    Ok(())
}

/// Install only the Prometheus exporter on `0.0.0.0:port`
pub fn init_metrics_only(port: u16) -> Result<()> {
    let addr = SocketAddr::from((Ipv4Addr::UNSPECIFIED, port));
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .with_context(|| format!("Failed to install Prometheus recorder on {addr}"))?;
    describe_metrics();

    tracing::info!(%addr, "Prometheus metrics endpoint initialized");
    Ok(())
}

fn fmt_layer<S>(format: LogFormat) -> Box<dyn Layer<S> + Send + Sync>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    match format {
        LogFormat::Json => fmt::layer()
            .json()
            .with_target(true)
            .with_thread_names(true)
            .with_file(true)
            .with_line_number(true)
            .boxed(),
        LogFormat::Pretty => fmt::layer().pretty().boxed(),
        LogFormat::Compact => fmt::layer().compact().boxed(),
    }
}
