//! Streamer error types

use thiserror::Error;

use crate::ConnectionState;

/// Streamer-specific errors
#[derive(Debug, Error)]
pub enum StreamerError {
    /// Data connection is not established or has been torn down
    #[error("event stream not connected (state: {0})")]
    NotConnected(ConnectionState),

    /// No play port configured
    #[error("play channel not configured")]
    PlayChannelDisabled,

    /// Contract-level failure (not calibrated, transport, timeout)
    #[error(transparent)]
    Contract(#[from] contracts::ContractError),
}

pub type Result<T> = std::result::Result<T, StreamerError>;
