//! Connection abstraction
//!
//! An ordered, reliable byte stream to the host. Three independent channels
//! exist per session: calibration probes, event batches and (optionally) play control.

use std::fmt;
use std::future::Future;

use serde::{Deserialize, Serialize};

use crate::ContractError;

/// Logical host channel a connection belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Channel {
    /// Probe/reply exchange used by the calibrator
    Calibration,
    /// Event batch stream
    Events,
    /// Scheduled play commands
    Play,
}

impl Channel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Channel::Calibration => "calibration",
            Channel::Events => "events",
            Channel::Play => "play",
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Open byte-stream connection
///
/// Each `write_all` call carries exactly one wire packet.
#[trait_variant::make(Connection: Send)]
pub trait LocalConnection {
    /// Write the whole buffer
    async fn write_all(&mut self, buf: &[u8]) -> Result<(), ContractError>;

    /// Fill the whole buffer, blocking until enough bytes arrived
    async fn read_exact(&mut self, buf: &mut [u8]) -> Result<(), ContractError>;

    /// Close the connection
    async fn shutdown(&mut self) -> Result<(), ContractError>;
}

/// Opens connections to the host
///
/// Abstracts TCP so calibration and streaming can be driven by simulated links in tests.
pub trait Connector: Send + Sync {
    /// Connection type produced by this connector
    type Conn: Connection + 'static;

    /// Open a connection for `channel` to `addr` (`host:port`)
    ///
    /// # Errors
    /// Returns [`ContractError::ConnectFailure`] (or a connect `Timeout`) when the
    /// host is unreachable or refuses the connection.
    fn connect(
        &self,
        channel: Channel,
        addr: &str,
    ) -> impl Future<Output = Result<Self::Conn, ContractError>> + Send;
}
