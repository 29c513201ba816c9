//! Guarded sample intake.

use std::sync::Arc;
use std::time::Instant;

use contracts::{BatchSink, OffsetReader, SensorSample};
use tracing::{debug, info, trace, warn};

use crate::buffer::EventBuffer;
use crate::error::Result;
use crate::metrics::IngestionMetrics;

/// What happened to a submitted sample
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// Offset not calibrated; sample discarded
    Dropped,
    /// Sample waiting for the batch to fill
    Buffered,
    /// Sample completed a batch that was handed to the sink
    BatchHandedOff,
}

/// Sample producer entry point
///
/// Single writer: the sensor acquisition context owns the ingestor and calls
/// [`SampleIngestor::submit_sample`] for every reading.
pub struct SampleIngestor<S> {
    buffer: EventBuffer,
    offsets: OffsetReader,
    sink: S,
    metrics: Arc<IngestionMetrics>,
    last_batch_at: Option<Instant>,
    dropping: bool,
}

impl<S: BatchSink> SampleIngestor<S> {
    pub fn new(batch_size: usize, offsets: OffsetReader, sink: S) -> Result<Self> {
        Ok(Self {
            buffer: EventBuffer::new(batch_size)?,
            offsets,
            sink,
            metrics: Arc::new(IngestionMetrics::new()),
            last_batch_at: None,
            dropping: false,
        })
    }

    /// Push one accelerometer reading
    pub fn submit_sample(&mut self, x: f32, y: f32, z: f32, timestamp: i64) -> SubmitOutcome {
        self.submit(SensorSample::new(x, y, z, timestamp))
    }

    pub fn submit(&mut self, sample: SensorSample) -> SubmitOutcome {
        self.metrics.record_received();

        if !self.offsets.is_calibrated() {
            if !self.dropping {
                warn!("Clock offset not calibrated, dropping samples");
                self.dropping = true;
            }
            self.metrics.record_dropped();
            observability::record_samples_dropped(1);
            return SubmitOutcome::Dropped;
        }
        if self.dropping {
            info!("Clock offset calibrated, buffering samples");
            self.dropping = false;
        }

        let Some(batch) = self.buffer.push(sample) else {
            trace!(pending = self.buffer.len(), "Sample buffered");
            return SubmitOutcome::Buffered;
        };

        let now = Instant::now();
        match self.last_batch_at.replace(now) {
            Some(prev) => debug!(
                batch_len = batch.len(),
                since_last_ms = now.duration_since(prev).as_millis() as u64,
                "Handing off event batch"
            ),
            None => debug!(batch_len = batch.len(), "Handing off first event batch"),
        }

        self.metrics.record_batch();
        self.sink.send_batch(batch);
        SubmitOutcome::BatchHandedOff
    }

    /// Submit every sample from `rx` until the producer closes it
    pub async fn drain(&mut self, rx: async_channel::Receiver<SensorSample>) {
        while let Ok(sample) = rx.recv().await {
            self.submit(sample);
        }
        debug!(pending = self.buffer.len(), "Sample source closed");
    }

    pub fn metrics(&self) -> Arc<IngestionMetrics> {
        self.metrics.clone()
    }

    pub fn pending(&self) -> usize {
        self.buffer.len()
    }
}
