//! Play command packets.

use bytes::{Buf, BufMut};
use contracts::ContractError;

use crate::{is_stop_sentinel, PLAY_SIZE};

/// Scheduled play time on the host clock
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlayCommand {
    pub host_scheduled_time: i64,
}

impl PlayCommand {
    pub fn encode(&self) -> [u8; PLAY_SIZE] {
        let mut out = [0u8; PLAY_SIZE];
        let mut buf = &mut out[..];
        buf.put_i64(self.host_scheduled_time);
        out
    }
}

/// Decoded play-channel packet
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayPacket {
    Play(PlayCommand),
    Stop,
}

pub fn decode_play_packet(packet: &[u8]) -> Result<PlayPacket, ContractError> {
    if packet.len() != PLAY_SIZE {
        return Err(ContractError::MalformedPacket {
            kind: "play",
            expected: PLAY_SIZE,
            actual: packet.len(),
        });
    }
    // -1 encodes to all 0xFF and therefore always reads as stop
    if is_stop_sentinel(packet) {
        return Ok(PlayPacket::Stop);
    }
    let mut buf = packet;
    Ok(PlayPacket::Play(PlayCommand {
        host_scheduled_time: buf.get_i64(),
    }))
}
