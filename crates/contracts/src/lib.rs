//! # Contracts
//!
//! Frozen interface contracts shared by every crate of the accel-sync workspace.
//! Business crates only depend on this crate; reverse dependencies are prohibited.
//!
//! ## Time Model
//! - All timestamps are integer milliseconds (`i64`)
//! - Device timestamps come from the local [`Clock`]; host timestamps arrive in probe replies
//! - `delta_t` is added to a device timestamp to express it on the host clock

mod clock;
mod config;
mod error;
mod event;
mod offset;
mod sample;
mod sink;
mod timing;
mod transport;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::*;
pub use error::*;
pub use event::{event_channel, noop_callback, SessionCallback, SessionEvent};
pub use offset::{offset_cell, OffsetPublisher, OffsetReader};
pub use sample::{EventBatch, SensorSample};
pub use sink::BatchSink;
pub use timing::{ClockOffset, RttStatistics, TimingSample};
pub use transport::{Channel, Connection, Connector, LocalConnection};
