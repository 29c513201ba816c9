//! Published clock offset
//!
//! Single writer (the calibrator), many readers (ingestor, streamer). The whole
//! [`ClockOffset`] value is replaced at once, never field by field.

use tokio::sync::watch;

use crate::ClockOffset;

/// Create a publisher/reader pair starting at [`ClockOffset::NOT_READY`]
pub fn offset_cell() -> (OffsetPublisher, OffsetReader) {
    let (tx, rx) = watch::channel(ClockOffset::NOT_READY);
    (OffsetPublisher { tx }, OffsetReader { rx })
}

/// Write side, owned by the calibrator
#[derive(Debug)]
pub struct OffsetPublisher {
    tx: watch::Sender<ClockOffset>,
}

impl OffsetPublisher {
    /// Replace the published offset
    pub fn publish(&self, offset: ClockOffset) {
        self.tx.send_replace(offset);
    }

    /// Reset to the not-ready value
    pub fn reset(&self) {
        self.publish(ClockOffset::NOT_READY);
    }

    /// Current value
    pub fn current(&self) -> ClockOffset {
        *self.tx.borrow()
    }

    /// New reader attached to this publisher
    pub fn subscribe(&self) -> OffsetReader {
        OffsetReader {
            rx: self.tx.subscribe(),
        }
    }
}

/// Read side, cheap to clone
#[derive(Debug, Clone)]
pub struct OffsetReader {
    rx: watch::Receiver<ClockOffset>,
}

impl OffsetReader {
    /// Snapshot of the latest published offset
    #[inline]
    pub fn current(&self) -> ClockOffset {
        *self.rx.borrow()
    }

    #[inline]
    pub fn is_calibrated(&self) -> bool {
        self.current().is_ready()
    }

    /// Wait until an offset with `calibrated == true` is published
    ///
    /// Returns `None` if the publisher was dropped first.
    pub async fn wait_calibrated(&mut self) -> Option<ClockOffset> {
        self.rx
            .wait_for(|offset| offset.is_ready())
            .await
            .ok()
            .map(|offset| *offset)
    }
}
