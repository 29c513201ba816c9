//! Host endpoint - TCP listeners for the three device channels

use std::net::SocketAddr;
use std::sync::Arc;

use contracts::{Channel, Clock, ContractError, SessionConfig};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tracing::{debug, info, instrument, warn};
use wire_codec::{
    decode_event_packet, decode_play_packet, event_packet_size, EventPacket, PlayPacket,
    ProbePacket, ProbeReply, PLAY_SIZE, PROBE_SIZE,
};

use crate::error::{HostError, Result};
use crate::HostEvent;

/// Listener addresses and the expected batch size
#[derive(Debug, Clone)]
pub struct HostEndpointConfig {
    pub bind_address: String,
    pub calibration_port: u16,
    pub event_port: u16,
    /// None = no play listener
    pub play_port: Option<u16>,
    /// Samples per event packet; the receiver reads `batch_size × 20` bytes at a time
    pub batch_size: usize,
}

impl HostEndpointConfig {
    /// Listen on the ports a device using `config` connects to
    pub fn from_session(config: &SessionConfig, bind_address: impl Into<String>) -> Self {
        Self {
            bind_address: bind_address.into(),
            calibration_port: config.host.calibration_port,
            event_port: config.host.event_port,
            play_port: config.host.play_port,
            batch_size: config.streaming.batch_size,
        }
    }

    /// Loopback listeners on OS-assigned ports
    pub fn ephemeral(batch_size: usize, with_play: bool) -> Self {
        Self {
            bind_address: "127.0.0.1".to_string(),
            calibration_port: 0,
            event_port: 0,
            play_port: with_play.then_some(0),
            batch_size,
        }
    }
}

/// Bound, not yet serving host endpoint
pub struct HostEndpoint {
    calibration: (TcpListener, SocketAddr),
    events: (TcpListener, SocketAddr),
    play: Option<(TcpListener, SocketAddr)>,
    clock: Arc<dyn Clock>,
    batch_size: usize,
}

impl HostEndpoint {
    /// Bind every listener
    #[instrument(
        name = "host_endpoint_bind",
        skip(config, clock),
        fields(bind = %config.bind_address)
    )]
    pub async fn bind(config: &HostEndpointConfig, clock: Arc<dyn Clock>) -> Result<Self> {
        if config.batch_size == 0 {
            return Err(
                ContractError::config_validation("batch_size", "must be at least 1").into(),
            );
        }

        let calibration = listen(
            Channel::Calibration,
            &config.bind_address,
            config.calibration_port,
        )
        .await?;
        let events = listen(Channel::Events, &config.bind_address, config.event_port).await?;
        let play = match config.play_port {
            Some(port) => Some(listen(Channel::Play, &config.bind_address, port).await?),
            None => None,
        };

        info!(
            calibration = %calibration.1,
            events = %events.1,
            play = ?play.as_ref().map(|(_, addr)| *addr),
            batch_size = config.batch_size,
            "Host endpoint listening"
        );

        Ok(Self {
            calibration,
            events,
            play,
            clock,
            batch_size: config.batch_size,
        })
    }

    pub fn calibration_addr(&self) -> SocketAddr {
        self.calibration.1
    }

    pub fn event_addr(&self) -> SocketAddr {
        self.events.1
    }

    pub fn play_addr(&self) -> Option<SocketAddr> {
        self.play.as_ref().map(|(_, addr)| *addr)
    }

    /// Session config pointing a device at these listeners
    pub fn session_config(&self) -> SessionConfig {
        let mut config = SessionConfig::for_host(self.calibration.1.ip().to_string());
        config.host.calibration_port = self.calibration.1.port();
        config.host.event_port = self.events.1.port();
        config.host.play_port = self.play_addr().map(|addr| addr.port());
        config.streaming.batch_size = self.batch_size;
        config
    }

    /// Start serving; observed traffic is reported on the returned channel
    pub fn spawn(self) -> (HostHandle, mpsc::UnboundedReceiver<HostEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut tasks = JoinSet::new();

        tasks.spawn(serve_calibration(
            self.calibration.0,
            Arc::clone(&self.clock),
            tx.clone(),
        ));
        tasks.spawn(serve_events(self.events.0, self.batch_size, tx.clone()));
        if let Some((listener, _)) = self.play {
            tasks.spawn(serve_play(listener, Arc::clone(&self.clock), tx));
        }

        (HostHandle { tasks }, rx)
    }
}

/// Running host endpoint
pub struct HostHandle {
    tasks: JoinSet<()>,
}

impl HostHandle {
    /// Stop accepting and drop open connections
    pub async fn shutdown(mut self) {
        self.tasks.shutdown().await;
        debug!("Host endpoint stopped");
    }
}

async fn listen(channel: Channel, address: &str, port: u16) -> Result<(TcpListener, SocketAddr)> {
    let addr = format!("{}:{}", address, port);
    let listener = TcpListener::bind(&addr)
        .await
        .map_err(|source| HostError::Bind {
            channel,
            addr: addr.clone(),
            source,
        })?;
    let local = listener.local_addr()?;
    Ok((listener, local))
}

fn emit(tx: &mpsc::UnboundedSender<HostEvent>, event: HostEvent) {
    // Nobody listening is fine
    let _ = tx.send(event);
}

/// Fill `buf`; `Ok(false)` once the peer closed the connection
async fn read_packet(stream: &mut TcpStream, buf: &mut [u8]) -> std::io::Result<bool> {
    match stream.read_exact(buf).await {
        Ok(_) => Ok(true),
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => Ok(false),
        Err(e) => Err(e),
    }
}

/// Accept loop shared by the three listeners; one device at a time
async fn accept_loop<F, Fut>(
    listener: TcpListener,
    channel: Channel,
    tx: mpsc::UnboundedSender<HostEvent>,
    mut serve: F,
) where
    F: FnMut(TcpStream, SocketAddr) -> Fut,
    Fut: std::future::Future<Output = Result<u64>>,
{
    loop {
        let (stream, peer) = match listener.accept().await {
            Ok(accepted) => accepted,
            Err(e) => {
                warn!(channel = %channel, error = %e, "Accept failed");
                continue;
            }
        };
        info!(channel = %channel, peer = %peer, "Connected");
        emit(&tx, HostEvent::ClientConnected { channel, peer });

        let packets = match serve(stream, peer).await {
            Ok(packets) => packets,
            Err(e) => {
                warn!(channel = %channel, peer = %peer, error = %e, "Connection aborted");
                0
            }
        };
        info!(channel = %channel, peer = %peer, packets, "Client is done");
        emit(
            &tx,
            HostEvent::ClientDisconnected {
                channel,
                peer,
                packets,
            },
        );
    }
}

#[instrument(name = "calibration_responder", skip_all)]
async fn serve_calibration(
    listener: TcpListener,
    clock: Arc<dyn Clock>,
    tx: mpsc::UnboundedSender<HostEvent>,
) {
    let events = tx.clone();
    accept_loop(listener, Channel::Calibration, tx, |stream, peer| {
        answer_probes(stream, peer, Arc::clone(&clock), events.clone())
    })
    .await;
}

/// Answer probes until the device closes the connection
async fn answer_probes(
    mut stream: TcpStream,
    peer: SocketAddr,
    clock: Arc<dyn Clock>,
    tx: mpsc::UnboundedSender<HostEvent>,
) -> Result<u64> {
    stream.set_nodelay(true)?;
    let mut buf = [0u8; PROBE_SIZE];
    let mut answered = 0;

    while read_packet(&mut stream, &mut buf).await? {
        let host_receive_time = clock.now_ms();
        let probe = ProbePacket::decode(&buf)?;
        let reply = ProbeReply {
            host_receive_time,
            host_send_time: clock.now_ms(),
        };
        stream.write_all(&reply.encode()).await?;
        answered += 1;

        debug!(
            prev_device_send = probe.prev_device_send_time,
            prev_device_recv = probe.prev_device_receive_time,
            host_receive_time,
            "Probe answered"
        );
        emit(&tx, HostEvent::ProbeAnswered { peer, probe, reply });
    }
    Ok(answered)
}

#[instrument(name = "event_receiver", skip_all, fields(batch_size = batch_size))]
async fn serve_events(
    listener: TcpListener,
    batch_size: usize,
    tx: mpsc::UnboundedSender<HostEvent>,
) {
    let events = tx.clone();
    accept_loop(listener, Channel::Events, tx, |stream, peer| {
        receive_batches(stream, peer, batch_size, events.clone())
    })
    .await;
}

async fn receive_batches(
    mut stream: TcpStream,
    peer: SocketAddr,
    batch_size: usize,
    tx: mpsc::UnboundedSender<HostEvent>,
) -> Result<u64> {
    let mut buf = vec![0u8; event_packet_size(batch_size)];
    let mut received = 0;

    while read_packet(&mut stream, &mut buf).await? {
        received += 1;
        match decode_event_packet(&buf) {
            Ok(EventPacket::Batch(records)) => {
                debug!(
                    batch_len = records.len(),
                    first_ts = records.first().map(|r| r.host_timestamp),
                    "Batch received"
                );
                emit(&tx, HostEvent::BatchReceived { peer, records });
            }
            Ok(EventPacket::Stop) => {
                info!(peer = %peer, "Stop sentinel received");
                emit(
                    &tx,
                    HostEvent::StopReceived {
                        channel: Channel::Events,
                        peer,
                    },
                );
            }
            Err(e) => {
                warn!(error = %e, "Invalid event packet");
                emit(
                    &tx,
                    HostEvent::InvalidPacket {
                        channel: Channel::Events,
                        peer,
                        reason: e.to_string(),
                    },
                );
            }
        }
    }
    Ok(received)
}

#[instrument(name = "play_receiver", skip_all)]
async fn serve_play(
    listener: TcpListener,
    clock: Arc<dyn Clock>,
    tx: mpsc::UnboundedSender<HostEvent>,
) {
    let events = tx.clone();
    accept_loop(listener, Channel::Play, tx, |stream, peer| {
        receive_play(stream, peer, Arc::clone(&clock), events.clone())
    })
    .await;
}

async fn receive_play(
    mut stream: TcpStream,
    peer: SocketAddr,
    clock: Arc<dyn Clock>,
    tx: mpsc::UnboundedSender<HostEvent>,
) -> Result<u64> {
    let mut buf = [0u8; PLAY_SIZE];
    let mut received = 0;

    while read_packet(&mut stream, &mut buf).await? {
        let receive_time = clock.now_ms();
        received += 1;
        match decode_play_packet(&buf)? {
            PlayPacket::Play(command) => {
                let lateness_ms = receive_time - command.host_scheduled_time;
                info!(
                    host_scheduled_time = command.host_scheduled_time,
                    lateness_ms, "Play command received"
                );
                emit(
                    &tx,
                    HostEvent::PlayReceived {
                        peer,
                        host_scheduled_time: command.host_scheduled_time,
                        lateness_ms,
                    },
                );
            }
            PlayPacket::Stop => {
                info!(peer = %peer, "Play stop sentinel received");
                emit(
                    &tx,
                    HostEvent::StopReceived {
                        channel: Channel::Play,
                        peer,
                    },
                );
            }
        }
    }
    Ok(received)
}
