//! Event buffer
//!
//! Accumulates samples until the batch threshold, then swaps the full batch
//! out for a fresh accumulator.

use contracts::{EventBatch, SensorSample};

use crate::error::{IngestionError, Result};

/// Fixed-threshold sample accumulator
#[derive(Debug)]
pub struct EventBuffer {
    batch_size: usize,
    pending: Vec<SensorSample>,
}

impl EventBuffer {
    pub fn new(batch_size: usize) -> Result<Self> {
        if batch_size == 0 {
            return Err(IngestionError::InvalidBatchSize);
        }
        Ok(Self {
            batch_size,
            pending: Vec::with_capacity(batch_size),
        })
    }

    /// Append a sample; returns the full batch when the threshold is reached
    pub fn push(&mut self, sample: SensorSample) -> Option<EventBatch> {
        self.pending.push(sample);
        if self.pending.len() < self.batch_size {
            return None;
        }
        let full = std::mem::replace(&mut self.pending, Vec::with_capacity(self.batch_size));
        Some(EventBatch::new(full))
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Samples waiting for the next batch
    pub fn pending(&self) -> &[SensorSample] {
        &self.pending
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(i: i64) -> SensorSample {
        SensorSample::new(i as f32, 0.0, 9.81, 1_000 + i)
    }

    #[test]
    fn test_exact_batch_size_emits_once() {
        let mut buffer = EventBuffer::new(4).unwrap();
        let batches: Vec<_> = (0..4).filter_map(|i| buffer.push(sample(i))).collect();

        assert_eq!(batches.len(), 1);
        let stamps: Vec<_> = batches[0].iter().map(|s| s.device_timestamp).collect();
        assert_eq!(stamps, vec![1_000, 1_001, 1_002, 1_003]);
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_one_short_emits_nothing() {
        let mut buffer = EventBuffer::new(4).unwrap();
        assert!((0..3).all(|i| buffer.push(sample(i)).is_none()));
        assert_eq!(buffer.len(), 3);
    }

    #[test]
    fn test_two_batches_and_a_remainder() {
        let mut buffer = EventBuffer::new(3).unwrap();
        let batches: Vec<_> = (0..7).filter_map(|i| buffer.push(sample(i))).collect();

        assert_eq!(batches.len(), 2);
        assert!(batches.iter().all(|b| b.len() == 3));
        assert_eq!(batches[1].samples()[0].device_timestamp, 1_003);
        assert_eq!(buffer.pending(), &[sample(6)]);
    }

    #[test]
    fn test_batch_size_one() {
        let mut buffer = EventBuffer::new(1).unwrap();
        assert_eq!(buffer.push(sample(0)).map(|b| b.len()), Some(1));
    }

    #[test]
    fn test_zero_batch_size_rejected() {
        assert!(matches!(
            EventBuffer::new(0),
            Err(IngestionError::InvalidBatchSize)
        ));
    }
}
