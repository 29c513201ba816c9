//! # Event Streamer
//!
//! Sends timestamp-translated event batches to the host.
//!
//! - [`EventStreamer`]: connection state, ordered outbound worker, stop sentinel, play channel
//! - [`TcpConnector`]: TCP [`Connector`](contracts::Connector) with connect / IO timeouts
//!
//! ## Usage Example
//!
//! ```ignore
//! use streamer::{EventStreamer, TcpConnector};
//!
//! let streamer = EventStreamer::new(
//!     TcpConnector::new(&config.network),
//!     &config,
//!     calibrator.offset_reader(),
//!     callback,
//! );
//! streamer.connect();
//! streamer.send_batch(batch)?;
//!
//! // The next batch becomes the stop sentinel
//! streamer.request_stop();
//! ```

mod error;
mod metrics;
mod state;
mod streamer;
mod tcp;

pub use error::{Result, StreamerError};
pub use metrics::{MetricsSnapshot, StreamerMetrics};
pub use state::ConnectionState;
pub use streamer::EventStreamer;
pub use tcp::{TcpConnection, TcpConnector};
