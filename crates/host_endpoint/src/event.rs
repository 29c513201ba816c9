//! Events observed by the host endpoint

use std::net::SocketAddr;

use contracts::Channel;
use wire_codec::{EventRecord, ProbePacket, ProbeReply};

/// What the host saw on one of its listeners
#[derive(Debug, Clone, PartialEq)]
pub enum HostEvent {
    /// A device connected
    ClientConnected { channel: Channel, peer: SocketAddr },
    /// One probe answered
    ProbeAnswered {
        peer: SocketAddr,
        probe: ProbePacket,
        reply: ProbeReply,
    },
    /// Event batch decoded
    BatchReceived {
        peer: SocketAddr,
        records: Vec<EventRecord>,
    },
    /// Stop sentinel on the event or play channel
    StopReceived { channel: Channel, peer: SocketAddr },
    /// Play command received; `lateness_ms = receive time - scheduled time`
    PlayReceived {
        peer: SocketAddr,
        host_scheduled_time: i64,
        lateness_ms: i64,
    },
    /// Packet with an unexpected shape, skipped
    InvalidPacket {
        channel: Channel,
        peer: SocketAddr,
        reason: String,
    },
    /// The device closed the connection
    ClientDisconnected {
        channel: Channel,
        peer: SocketAddr,
        packets: u64,
    },
}

impl HostEvent {
    pub fn channel(&self) -> Channel {
        match self {
            Self::ClientConnected { channel, .. }
            | Self::StopReceived { channel, .. }
            | Self::InvalidPacket { channel, .. }
            | Self::ClientDisconnected { channel, .. } => *channel,
            Self::ProbeAnswered { .. } => Channel::Calibration,
            Self::BatchReceived { .. } => Channel::Events,
            Self::PlayReceived { .. } => Channel::Play,
        }
    }
}
