//! SensorSample / EventBatch - Ingestion output
//!
//! Raw accelerometer readings and the fixed-size batches handed to the streamer.

use serde::{Deserialize, Serialize};

/// One accelerometer reading
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SensorSample {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    /// Device clock at capture (ms)
    pub device_timestamp: i64,
}

impl SensorSample {
    pub fn new(x: f32, y: f32, z: f32, device_timestamp: i64) -> Self {
        Self {
            x,
            y,
            z,
            device_timestamp,
        }
    }
}

/// Ordered group of samples transmitted as one wire packet
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EventBatch {
    samples: Vec<SensorSample>,
}

impl EventBatch {
    pub fn new(samples: Vec<SensorSample>) -> Self {
        Self { samples }
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn samples(&self) -> &[SensorSample] {
        &self.samples
    }

    pub fn iter(&self) -> impl Iterator<Item = &SensorSample> {
        self.samples.iter()
    }

    pub fn into_samples(self) -> Vec<SensorSample> {
        self.samples
    }
}

impl From<Vec<SensorSample>> for EventBatch {
    fn from(samples: Vec<SensorSample>) -> Self {
        Self::new(samples)
    }
}
