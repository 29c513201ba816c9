//! Calibration error types

use thiserror::Error;

/// Calibration-specific errors
#[derive(Debug, Error)]
pub enum CalibrationError {
    /// Connect, transport, timeout or sample-count failure
    #[error(transparent)]
    Contract(#[from] contracts::ContractError),

    /// A calibration task is already running on this calibrator
    #[error("calibration already in progress")]
    AlreadyRunning,

    /// The background task panicked or was aborted
    #[error("calibration task ended unexpectedly: {0}")]
    TaskAborted(String),
}

pub type Result<T> = std::result::Result<T, CalibrationError>;
