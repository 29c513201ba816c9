//! # Wire Codec
//!
//! Fixed-size, big-endian packet layouts exchanged with the host.
//!
//! | packet            | size          | layout                                      |
//! |-------------------|---------------|---------------------------------------------|
//! | calibration probe | 16            | `i64 prev_device_send, i64 prev_device_recv` |
//! | calibration reply | 16            | `i64 host_receive, i64 host_send`           |
//! | event batch       | `count × 20`  | `count × (f32 x, f32 y, f32 z, i64 ts)`     |
//! | play command      | 8             | `i64 host_scheduled_time`                   |
//! | stop sentinel     | any           | every byte `0xFF`                           |
//!
//! There is no length prefix or opcode: sizes follow from the layouts, and the
//! receiver recognizes the stop sentinel by content alone. A legitimate payload
//! whose bytes are all `0xFF` is therefore indistinguishable from a stop signal.

mod event;
mod play;
mod probe;

pub use event::{decode_event_packet, encode_event_records, EventPacket, EventRecord};
pub use play::{decode_play_packet, PlayCommand, PlayPacket};
pub use probe::{ProbePacket, ProbeReply};

use bytes::{BufMut, Bytes, BytesMut};

/// Calibration probe size
pub const PROBE_SIZE: usize = 16;
/// Calibration reply size
pub const REPLY_SIZE: usize = 16;
/// One event record: three f32 and one i64
pub const RECORD_SIZE: usize = 3 * 4 + 8;
/// Play command size
pub const PLAY_SIZE: usize = 8;
/// Feedback value carried by the first probe of a session
pub const NO_PREVIOUS_REPLY: i64 = -1;

/// Sentinel byte filling a stop packet
pub const SENTINEL_BYTE: u8 = 0xFF;

/// Stop sentinel of `len` bytes
pub fn stop_sentinel(len: usize) -> Bytes {
    let mut buf = BytesMut::with_capacity(len);
    buf.put_bytes(SENTINEL_BYTE, len);
    buf.freeze()
}

/// Whether `packet` is a stop sentinel (non-empty, every byte `0xFF`)
pub fn is_stop_sentinel(packet: &[u8]) -> bool {
    !packet.is_empty() && packet.iter().all(|b| *b == SENTINEL_BYTE)
}

/// Size of an event batch packet holding `count` records
#[inline]
pub const fn event_packet_size(count: usize) -> usize {
    count * RECORD_SIZE
}
