//! Session events - core to controlling layer notifications
//!
//! The core never calls back into a UI. It emits [`SessionEvent`]s through a
//! [`SessionCallback`]; the controlling layer decides what to render or restart.

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::mpsc;

use crate::Channel;

/// Outcome notifications emitted by the calibrator and the streamer
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum SessionEvent {
    /// A calibration run finished (`delta_t = mse = 0` on failure)
    CalibrationComplete {
        success: bool,
        delta_t: f64,
        mse: f64,
    },
    /// A connection could not be opened
    ConnectFailed { channel: Channel },
    /// An open connection broke; it is not reopened automatically
    TransportFailed { channel: Channel, message: String },
    /// The stop sentinel was sent and the streaming session torn down
    SessionStopped,
}

/// Session event callback type
///
/// Uses `Arc` so the callback can be shared by the calibrator, the streamer
/// and their background tasks.
pub type SessionCallback = Arc<dyn Fn(SessionEvent) + Send + Sync>;

/// Callback that ignores every event
pub fn noop_callback() -> SessionCallback {
    Arc::new(|_| {})
}

/// Callback backed by an unbounded channel
///
/// Lets a controller `await` events instead of handling them inline.
pub fn event_channel() -> (SessionCallback, mpsc::UnboundedReceiver<SessionEvent>) {
    let (tx, rx) = mpsc::unbounded_channel();
    let callback: SessionCallback = Arc::new(move |event| {
        // Receiver gone means nobody is listening anymore
        let _ = tx.send(event);
    });
    (callback, rx)
}
