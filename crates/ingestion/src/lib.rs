//! # Ingestion
//!
//! Accelerometer sample intake.
//!
//! Responsibilities:
//! - Accumulate samples into fixed-size [`EventBatch`]es ([`EventBuffer`])
//! - Drop samples while the clock offset is not calibrated ([`SampleIngestor`])
//! - Hand full batches to a [`BatchSink`] in arrival order
//! - Mock accelerometer source for dry runs and tests
//!
//! ## Usage Example
//!
//! ```ignore
//! use ingestion::{MockAccelerometer, SampleIngestor};
//!
//! let mut ingestor = SampleIngestor::new(10, calibrator.offset_reader(), streamer.clone())?;
//!
//! let source = MockAccelerometer::with_rate(50.0);
//! let rx = source.start(SystemClock, 256);
//! ingestor.drain(rx).await;
//! ```
//!
//! [`EventBatch`]: contracts::EventBatch
//! [`BatchSink`]: contracts::BatchSink

mod buffer;
mod error;
mod ingestor;
mod metrics;
mod mock;

// Re-exports
pub use buffer::EventBuffer;
pub use contracts::{EventBatch, SensorSample};
pub use error::{IngestionError, Result};
pub use ingestor::{SampleIngestor, SubmitOutcome};
pub use metrics::{IngestionMetrics, MetricsSnapshot};
pub use mock::{MockAccelerometer, MockAccelerometerConfig};
