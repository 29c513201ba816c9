//! Streamer metrics for observability

use std::sync::atomic::{AtomicU64, Ordering};

/// Per-streamer counters
#[derive(Debug, Default)]
pub struct StreamerMetrics {
    batches_sent: AtomicU64,
    bytes_sent: AtomicU64,
    play_commands_sent: AtomicU64,
    /// Batches refused because the offset was not calibrated
    rejected_uncalibrated: AtomicU64,
    /// Batches refused because no connection was up
    rejected_disconnected: AtomicU64,
    write_failures: AtomicU64,
}

impl StreamerMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn inc_batches_sent(&self, bytes: usize) {
        self.batches_sent.fetch_add(1, Ordering::Relaxed);
        self.bytes_sent.fetch_add(bytes as u64, Ordering::Relaxed);
    }

    pub fn inc_play_commands_sent(&self) {
        self.play_commands_sent.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_rejected_uncalibrated(&self) {
        self.rejected_uncalibrated.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_rejected_disconnected(&self) {
        self.rejected_disconnected.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_write_failures(&self) {
        self.write_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Get snapshot of all metrics
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            batches_sent: self.batches_sent.load(Ordering::Relaxed),
            bytes_sent: self.bytes_sent.load(Ordering::Relaxed),
            play_commands_sent: self.play_commands_sent.load(Ordering::Relaxed),
            rejected_uncalibrated: self.rejected_uncalibrated.load(Ordering::Relaxed),
            rejected_disconnected: self.rejected_disconnected.load(Ordering::Relaxed),
            write_failures: self.write_failures.load(Ordering::Relaxed),
        }
    }
}

/// Snapshot of streamer metrics (for reporting)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub batches_sent: u64,
    pub bytes_sent: u64,
    pub play_commands_sent: u64,
    pub rejected_uncalibrated: u64,
    pub rejected_disconnected: u64,
    pub write_failures: u64,
}
