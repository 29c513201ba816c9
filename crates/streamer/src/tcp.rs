//! TCP transport with connect and per-operation timeouts

use std::future::Future;
use std::io;
use std::time::Duration;

use contracts::{Channel, Connection, Connector, ContractError, NetworkConfig};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tracing::{debug, instrument};

/// Opens TCP connections to the host
#[derive(Debug, Clone, Copy, Default)]
pub struct TcpConnector {
    connect_timeout: Option<Duration>,
    io_timeout: Option<Duration>,
}

impl TcpConnector {
    pub fn new(network: &NetworkConfig) -> Self {
        Self {
            connect_timeout: network.connect_timeout(),
            io_timeout: network.io_timeout(),
        }
    }

    /// Connector that waits forever on every operation
    pub fn unbounded() -> Self {
        Self::default()
    }
}

impl Connector for TcpConnector {
    type Conn = TcpConnection;

    #[instrument(name = "tcp_connect", skip(self), fields(channel = %channel))]
    async fn connect(&self, channel: Channel, addr: &str) -> Result<TcpConnection, ContractError> {
        let stream = limited(self.connect_timeout, channel, "connect", TcpStream::connect(addr))
            .await?
            .map_err(|e| ContractError::connect_failure(channel, addr, e.to_string()))?;
        stream.set_nodelay(true)?;

        debug!(addr, "Connected");
        Ok(TcpConnection {
            stream,
            channel,
            io_timeout: self.io_timeout,
        })
    }
}

/// One open TCP connection
#[derive(Debug)]
pub struct TcpConnection {
    stream: TcpStream,
    channel: Channel,
    io_timeout: Option<Duration>,
}

impl Connection for TcpConnection {
    async fn write_all(&mut self, buf: &[u8]) -> Result<(), ContractError> {
        let channel = self.channel;
        limited(self.io_timeout, channel, "write", self.stream.write_all(buf))
            .await?
            .map_err(|e| ContractError::transport(channel, e.to_string()))
    }

    async fn read_exact(&mut self, buf: &mut [u8]) -> Result<(), ContractError> {
        let channel = self.channel;
        limited(self.io_timeout, channel, "read", self.stream.read_exact(buf))
            .await?
            .map(|_| ())
            .map_err(|e| ContractError::transport(channel, e.to_string()))
    }

    async fn shutdown(&mut self) -> Result<(), ContractError> {
        match self.stream.shutdown().await {
            Ok(()) => Ok(()),
            // Peer already gone
            Err(e) if e.kind() == io::ErrorKind::NotConnected => Ok(()),
            Err(e) => Err(ContractError::transport(self.channel, e.to_string())),
        }
    }
}

/// Run `fut` under an optional time limit
async fn limited<T>(
    limit: Option<Duration>,
    channel: Channel,
    op: &'static str,
    fut: impl Future<Output = T>,
) -> Result<T, ContractError> {
    match limit {
        Some(limit) => tokio::time::timeout(limit, fut)
            .await
            .map_err(|_| ContractError::Timeout {
                channel,
                op,
                after_ms: limit.as_millis() as u64,
            }),
        None => Ok(fut.await),
    }
}
