//! Layered error definitions
//!
//! Categorized by source: config / connect / transport / calibration state / protocol

use thiserror::Error;

use crate::Channel;

/// Unified error type
#[derive(Debug, Error)]
pub enum ContractError {
    // ===== Configuration Errors =====
    /// Configuration parse error
    #[error("config parse error: {message}")]
    ConfigParse {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Configuration validation error
    #[error("config validation error at '{field}': {message}")]
    ConfigValidation { field: String, message: String },

    // ===== Network Errors =====
    /// Host unreachable or refused while opening a connection
    #[error("{channel} connection to {addr} failed: {message}")]
    ConnectFailure {
        channel: Channel,
        addr: String,
        message: String,
    },

    /// Read or write error on an already-open connection
    #[error("{channel} transport failure: {message}")]
    TransportFailure { channel: Channel, message: String },

    /// A connect/read/write did not complete within the configured limit
    #[error("{channel} {op} timed out after {after_ms}ms")]
    Timeout {
        channel: Channel,
        op: &'static str,
        after_ms: u64,
    },

    // ===== Calibration Errors =====
    /// Offset not published yet
    #[error("clock offset not calibrated")]
    NotCalibrated,

    /// Not enough usable probe round trips to fit an offset
    #[error("not enough calibration samples: need at least {needed}, got {got}")]
    InsufficientSamples { needed: usize, got: usize },

    // ===== Protocol Errors =====
    /// Packet does not have the fixed size of its layout
    #[error("malformed {kind} packet: expected {expected} bytes, got {actual}")]
    MalformedPacket {
        kind: &'static str,
        expected: usize,
        actual: usize,
    },

    /// Internal protocol invariant broken
    #[error("protocol invariant violated: {0}")]
    ProtocolInvariant(String),

    // ===== General Errors =====
    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Other error
    #[error("{0}")]
    Other(String),
}

impl ContractError {
    /// Create configuration parse error
    pub fn config_parse(message: impl Into<String>) -> Self {
        Self::ConfigParse {
            message: message.into(),
            source: None,
        }
    }

    /// Create configuration validation error
    pub fn config_validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ConfigValidation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create connect failure
    pub fn connect_failure(
        channel: Channel,
        addr: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::ConnectFailure {
            channel,
            addr: addr.into(),
            message: message.into(),
        }
    }

    /// Create transport failure
    pub fn transport(channel: Channel, message: impl Into<String>) -> Self {
        Self::TransportFailure {
            channel,
            message: message.into(),
        }
    }

    /// Whether this error happened while establishing a connection
    pub fn is_connect_failure(&self) -> bool {
        matches!(
            self,
            Self::ConnectFailure { .. } | Self::Timeout { op: "connect", .. }
        )
    }
}
