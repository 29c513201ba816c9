//! Calibration timing records and the published clock offset.

use serde::{Deserialize, Serialize};

/// Four millisecond timestamps captured during one probe round trip
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimingSample {
    /// Device clock when the probe was written
    pub device_send_time: i64,
    /// Host clock when the probe arrived
    pub host_receive_time: i64,
    /// Host clock when the reply was written
    pub host_send_time: i64,
    /// Device clock when the reply was read
    pub device_receive_time: i64,
}

impl TimingSample {
    /// Round trip as observed by the device, `None` on overflow
    #[inline]
    pub fn device_rtt(&self) -> Option<i64> {
        self.device_receive_time.checked_sub(self.device_send_time)
    }

    /// Host-side round trip between this reply and the next probe's arrival
    ///
    /// Host stamps come off the wire, so the difference is checked.
    #[inline]
    pub fn host_rtt(&self, next: &TimingSample) -> Option<i64> {
        next.host_receive_time.checked_sub(self.host_send_time)
    }
}

/// Mean and standard deviation of a round-trip-time series
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RttStatistics {
    pub mean: f64,
    pub sigma: f64,
}

/// Result of a calibration run
///
/// `calibrated == false` with `delta_t == 0` is the "not ready" value every
/// consumer checks before translating timestamps.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClockOffset {
    /// Host clock minus device clock (ms)
    pub delta_t: f64,
    /// RMS of the post-warm-up fit residuals (ms)
    pub mse: f64,
    pub calibrated: bool,
}

impl ClockOffset {
    /// Not-ready sentinel
    pub const NOT_READY: ClockOffset = ClockOffset {
        delta_t: 0.0,
        mse: 0.0,
        calibrated: false,
    };

    /// Successful calibration result
    pub fn calibrated(delta_t: f64, mse: f64) -> Self {
        Self {
            delta_t,
            mse,
            calibrated: true,
        }
    }

    #[inline]
    pub fn is_ready(&self) -> bool {
        self.calibrated
    }

    /// Translate a device timestamp to host time (delta_t truncated toward zero)
    #[inline]
    pub fn to_host_time(&self, device_ms: i64) -> i64 {
        device_ms.saturating_add(self.delta_t as i64)
    }
}

impl Default for ClockOffset {
    fn default() -> Self {
        Self::NOT_READY
    }
}
