//! Data connection state

use std::fmt;

/// Lifecycle of the event (and play) connections
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ConnectionState {
    #[default]
    Disconnected,
    /// Connect task running; sends queue behind it
    Connecting,
    Connected,
    /// Connect or write failed; no automatic reconnect
    Failed(String),
}

impl ConnectionState {
    /// Whether sends are accepted (queued or written)
    pub fn accepts_sends(&self) -> bool {
        matches!(self, Self::Connecting | Self::Connected)
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Disconnected => f.write_str("disconnected"),
            Self::Connecting => f.write_str("connecting"),
            Self::Connected => f.write_str("connected"),
            Self::Failed(reason) => write!(f, "failed: {}", reason),
        }
    }
}
