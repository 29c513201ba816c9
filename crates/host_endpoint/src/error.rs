//! Host endpoint errors

use contracts::{Channel, ContractError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum HostError {
    #[error("failed to bind {channel} listener on {addr}: {source}")]
    Bind {
        channel: Channel,
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Contract(#[from] ContractError),
}

pub type Result<T> = std::result::Result<T, HostError>;
