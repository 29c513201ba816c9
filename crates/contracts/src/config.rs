//! SessionConfig - Config Loader output
//!
//! Host endpoints, calibration tuning, streaming and network limits.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Fixed size of the calibration probe / reply layout
pub const PROBE_PACKET_SIZE: usize = 16;

/// Configuration version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ConfigVersion {
    #[default]
    V1,
}

/// Complete session configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Configuration version
    #[serde(default)]
    pub version: ConfigVersion,

    /// Host endpoint
    pub host: HostConfig,

    /// Calibration tuning
    #[serde(default)]
    pub calibration: CalibrationConfig,

    /// Event buffering and play scheduling
    #[serde(default)]
    pub streaming: StreamingConfig,

    /// Connect / IO limits
    #[serde(default)]
    pub network: NetworkConfig,
}

impl SessionConfig {
    /// Config with defaults everywhere except the host address
    pub fn for_host(address: impl Into<String>) -> Self {
        Self {
            version: ConfigVersion::V1,
            host: HostConfig {
                address: address.into(),
                calibration_port: default_calibration_port(),
                event_port: default_event_port(),
                play_port: None,
            },
            calibration: CalibrationConfig::default(),
            streaming: StreamingConfig::default(),
            network: NetworkConfig::default(),
        }
    }
}

/// Host address and ports
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HostConfig {
    /// Host name or IP address
    pub address: String,

    /// Port of the calibration responder
    #[serde(default = "default_calibration_port")]
    pub calibration_port: u16,

    /// Port of the event receiver
    #[serde(default = "default_event_port")]
    pub event_port: u16,

    /// Port of the play receiver (None = no play channel)
    #[serde(default)]
    pub play_port: Option<u16>,
}

fn default_calibration_port() -> u16 {
    10000
}

fn default_event_port() -> u16 {
    10001
}

impl HostConfig {
    pub fn calibration_addr(&self) -> String {
        self.addr_for(self.calibration_port)
    }

    pub fn event_addr(&self) -> String {
        self.addr_for(self.event_port)
    }

    pub fn play_addr(&self) -> Option<String> {
        self.play_port.map(|port| self.addr_for(port))
    }

    fn addr_for(&self, port: u16) -> String {
        // Bare IPv6 literals need brackets before the port
        if self.address.contains(':') && !self.address.starts_with('[') {
            format!("[{}]:{}", self.address, port)
        } else {
            format!("{}:{}", self.address, port)
        }
    }
}

/// Calibration tuning parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CalibrationConfig {
    /// Number of fitted probe steps (one extra round trip is always added)
    pub steps: usize,
    /// Probe packet size; must match the fixed layout
    pub probe_packet_size: usize,
    /// Outlier threshold in standard deviations above the mean
    pub outlier_coefficient: f64,
    /// Initial gradient gain
    pub alpha_initial: f64,
    /// Gain floor approached as steps progress
    pub alpha_floor: f64,
    /// Exponential gain decay rate per step
    pub alpha_decay: f64,
    /// Leading retained errors excluded from the mse
    pub warmup_discard: usize,
}

impl Default for CalibrationConfig {
    fn default() -> Self {
        Self {
            steps: 100,
            probe_packet_size: PROBE_PACKET_SIZE,
            outlier_coefficient: 1.0,
            alpha_initial: 1.0,
            alpha_floor: 0.01,
            alpha_decay: 0.1,
            warmup_discard: 10,
        }
    }
}

/// Event streaming parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamingConfig {
    /// Samples per event batch
    pub batch_size: usize,
    /// Delay added to "now" when scheduling a play command (ms)
    pub play_delay_ms: i64,
}

impl Default for StreamingConfig {
    fn default() -> Self {
        Self {
            batch_size: 10,
            play_delay_ms: 1000,
        }
    }
}

/// Connect and per-operation IO limits (0 = wait forever)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    pub connect_timeout_ms: u64,
    pub io_timeout_ms: u64,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            connect_timeout_ms: 5000,
            io_timeout_ms: 2000,
        }
    }
}

impl NetworkConfig {
    pub fn connect_timeout(&self) -> Option<Duration> {
        non_zero_millis(self.connect_timeout_ms)
    }

    pub fn io_timeout(&self) -> Option<Duration> {
        non_zero_millis(self.io_timeout_ms)
    }
}

fn non_zero_millis(ms: u64) -> Option<Duration> {
    (ms > 0).then(|| Duration::from_millis(ms))
}
