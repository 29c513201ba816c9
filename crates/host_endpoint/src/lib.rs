//! # Host Endpoint
//!
//! Reference host for the accel-sync protocol:
//!
//! - calibration responder: stamps `host_receive_time` on read and
//!   `host_send_time` before replying, until the device closes
//! - event receiver: reads `batch_size × 20` byte packets and recognizes the
//!   all-`0xFF` stop sentinel
//! - play receiver: reads 8-byte play commands and reports how late they arrived
//!
//! Everything the host observes is surfaced as a [`HostEvent`].

mod clock;
mod endpoint;
mod error;
mod event;

pub use clock::SkewedClock;
pub use endpoint::{HostEndpoint, HostEndpointConfig, HostHandle};
pub use error::{HostError, Result};
pub use event::HostEvent;
