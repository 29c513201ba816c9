//! # Clock Sync
//!
//! Device-to-host clock calibration.
//!
//! - [`is_outlier`]: one-sided round-trip outlier test
//! - [`estimate`]: decaying-gain offset fit over one session's round trips
//! - [`Calibrator`]: probe session state machine publishing the [`ClockOffset`]
//!
//! ## 使用示例
//!
//! ```ignore
//! use clock_sync::Calibrator;
//!
//! let calibrator = Calibrator::new(connector, SystemClock, &config, callback);
//! let offsets = calibrator.offset_reader();
//!
//! let handle = calibrator.calibrate();
//! let estimate = handle.await??;
//! ```
//!
//! [`ClockOffset`]: contracts::ClockOffset

mod calibrator;
mod error;
mod estimator;
pub mod mock;
mod outlier;
mod stats;

pub use calibrator::{CalibrationState, Calibrator};
pub use error::{CalibrationError, Result};
pub use estimator::{estimate, gain, Estimate, MIN_ROUND_TRIPS};
pub use outlier::is_outlier;
pub use stats::{filtered_statistics, raw_statistics, RttSeries};
