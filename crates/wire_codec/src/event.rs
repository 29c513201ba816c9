//! Event batch packets.

use bytes::{Buf, BufMut, Bytes, BytesMut};
use contracts::ContractError;

use crate::{is_stop_sentinel, RECORD_SIZE};

/// One encoded sample: acceleration plus host-clock timestamp
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EventRecord {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub host_timestamp: i64,
}

/// Decoded event-channel packet
#[derive(Debug, Clone, PartialEq)]
pub enum EventPacket {
    Batch(Vec<EventRecord>),
    Stop,
}

/// Encode records back to back, no count field
pub fn encode_event_records(records: &[EventRecord]) -> Bytes {
    let mut buf = BytesMut::with_capacity(records.len() * RECORD_SIZE);
    for record in records {
        buf.put_f32(record.x);
        buf.put_f32(record.y);
        buf.put_f32(record.z);
        buf.put_i64(record.host_timestamp);
    }
    assert_eq!(
        buf.len(),
        records.len() * RECORD_SIZE,
        "event packet length must equal record count times record size"
    );
    buf.freeze()
}

/// Decode one event-channel packet
///
/// An all-`0xFF` packet is reported as [`EventPacket::Stop`] before any
/// attempt to parse records.
pub fn decode_event_packet(packet: &[u8]) -> Result<EventPacket, ContractError> {
    if is_stop_sentinel(packet) {
        return Ok(EventPacket::Stop);
    }
    if packet.is_empty() || packet.len() % RECORD_SIZE != 0 {
        return Err(ContractError::MalformedPacket {
            kind: "event",
            expected: (packet.len() / RECORD_SIZE).max(1) * RECORD_SIZE,
            actual: packet.len(),
        });
    }

    let mut buf = packet;
    let mut records = Vec::with_capacity(packet.len() / RECORD_SIZE);
    while buf.has_remaining() {
        records.push(EventRecord {
            x: buf.get_f32(),
            y: buf.get_f32(),
            z: buf.get_f32(),
            host_timestamp: buf.get_i64(),
        });
    }
    Ok(EventPacket::Batch(records))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stop_sentinel;

    #[test]
    fn test_round_trip_preserves_values() {
        let records = vec![
            EventRecord {
                x: 0.1,
                y: -9.81,
                z: f32::MIN_POSITIVE,
                host_timestamp: 1_700_000_000_123,
            },
            EventRecord {
                x: f32::MAX,
                y: 0.0,
                z: -0.0,
                host_timestamp: i64::MIN,
            },
        ];
        let bytes = encode_event_records(&records);
        assert_eq!(bytes.len(), 40);

        match decode_event_packet(&bytes).unwrap() {
            EventPacket::Batch(decoded) => {
                assert_eq!(decoded.len(), 2);
                for (a, b) in decoded.iter().zip(&records) {
                    assert_eq!(a.x.to_bits(), b.x.to_bits());
                    assert_eq!(a.y.to_bits(), b.y.to_bits());
                    assert_eq!(a.z.to_bits(), b.z.to_bits());
                    assert_eq!(a.host_timestamp, b.host_timestamp);
                }
            }
            EventPacket::Stop => panic!("decoded a stop sentinel"),
        }
    }

    #[test]
    fn test_record_layout_is_big_endian() {
        let bytes = encode_event_records(&[EventRecord {
            x: 1.0,
            y: 0.0,
            z: 0.0,
            host_timestamp: 2,
        }]);
        assert_eq!(&bytes[..4], &[0x3F, 0x80, 0x00, 0x00]);
        assert_eq!(&bytes[12..], &[0, 0, 0, 0, 0, 0, 0, 2]);
    }

    #[test]
    fn test_stop_sentinel_decodes_as_stop() {
        let sentinel = stop_sentinel(60);
        assert_eq!(decode_event_packet(&sentinel).unwrap(), EventPacket::Stop);
    }

    /// Known protocol limitation: a batch whose encoded bytes happen to be all
    /// `0xFF` (NaN payloads with timestamp -1) is read as a stop signal.
    #[test]
    fn test_all_ff_batch_is_indistinguishable_from_stop() {
        let nan = f32::from_bits(u32::MAX);
        let records = vec![
            EventRecord {
                x: nan,
                y: nan,
                z: nan,
                host_timestamp: -1,
            };
            3
        ];
        let bytes = encode_event_records(&records);
        assert!(bytes.iter().all(|b| *b == 0xFF));
        assert_eq!(bytes, stop_sentinel(bytes.len()));

        // The receiver cannot tell this legitimate batch from a stop request.
        assert_eq!(decode_event_packet(&bytes).unwrap(), EventPacket::Stop);
    }

    #[test]
    fn test_truncated_packet_rejected() {
        let err = decode_event_packet(&[0u8; 30]).unwrap_err();
        assert!(matches!(
            err,
            ContractError::MalformedPacket { kind: "event", actual: 30, .. }
        ));
    }
}
