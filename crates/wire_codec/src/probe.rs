//! Calibration probe and reply packets.

use bytes::{Buf, BufMut};
use contracts::ContractError;

use crate::{NO_PREVIOUS_REPLY, PROBE_SIZE, REPLY_SIZE};

/// Device -> host probe
///
/// Carries the device timestamps of the *previous* round trip so the host can
/// log its view of the exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProbePacket {
    pub prev_device_send_time: i64,
    pub prev_device_receive_time: i64,
}

impl ProbePacket {
    /// Probe for the first round trip of a session
    pub const FIRST: ProbePacket = ProbePacket {
        prev_device_send_time: NO_PREVIOUS_REPLY,
        prev_device_receive_time: NO_PREVIOUS_REPLY,
    };

    pub fn encode(&self) -> [u8; PROBE_SIZE] {
        let mut out = [0u8; PROBE_SIZE];
        let mut buf = &mut out[..];
        buf.put_i64(self.prev_device_send_time);
        buf.put_i64(self.prev_device_receive_time);
        out
    }

    pub fn decode(packet: &[u8]) -> Result<Self, ContractError> {
        let mut buf = check_len(packet, PROBE_SIZE, "probe")?;
        Ok(Self {
            prev_device_send_time: buf.get_i64(),
            prev_device_receive_time: buf.get_i64(),
        })
    }

    /// Whether this is the first probe of a session
    pub fn is_first(&self) -> bool {
        *self == Self::FIRST
    }
}

/// Host -> device reply
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProbeReply {
    pub host_receive_time: i64,
    pub host_send_time: i64,
}

impl ProbeReply {
    pub fn encode(&self) -> [u8; REPLY_SIZE] {
        let mut out = [0u8; REPLY_SIZE];
        let mut buf = &mut out[..];
        buf.put_i64(self.host_receive_time);
        buf.put_i64(self.host_send_time);
        out
    }

    pub fn decode(packet: &[u8]) -> Result<Self, ContractError> {
        let mut buf = check_len(packet, REPLY_SIZE, "reply")?;
        Ok(Self {
            host_receive_time: buf.get_i64(),
            host_send_time: buf.get_i64(),
        })
    }
}

fn check_len<'a>(
    packet: &'a [u8],
    expected: usize,
    kind: &'static str,
) -> Result<&'a [u8], ContractError> {
    if packet.len() != expected {
        return Err(ContractError::MalformedPacket {
            kind,
            expected,
            actual: packet.len(),
        });
    }
    Ok(packet)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_probe_bytes() {
        let bytes = ProbePacket::FIRST.encode();
        assert_eq!(bytes, [0xFF; 16]);
        assert!(ProbePacket::decode(&bytes).unwrap().is_first());
    }

    #[test]
    fn test_reply_is_big_endian() {
        let reply = ProbeReply {
            host_receive_time: 1,
            host_send_time: 0x0102_0304_0506_0708,
        };
        let bytes = reply.encode();
        assert_eq!(&bytes[..8], &[0, 0, 0, 0, 0, 0, 0, 1]);
        assert_eq!(&bytes[8..], &[1, 2, 3, 4, 5, 6, 7, 8]);
        assert_eq!(ProbeReply::decode(&bytes).unwrap(), reply);
    }

    #[test]
    fn test_decode_rejects_wrong_size() {
        let err = ProbeReply::decode(&[0u8; 15]).unwrap_err();
        assert!(matches!(
            err,
            ContractError::MalformedPacket {
                kind: "reply",
                expected: 16,
                actual: 15
            }
        ));
    }
}
