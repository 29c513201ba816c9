//! BatchSink trait - Event buffer output interface

use crate::EventBatch;

/// Consumer of full event batches
///
/// Called from the sample producer's context, so implementations must not block:
/// the streamer enqueues the batch for its outbound task and returns.
pub trait BatchSink: Send + Sync {
    /// Take ownership of a full batch
    fn send_batch(&self, batch: EventBatch);
}

impl<T: BatchSink + ?Sized> BatchSink for std::sync::Arc<T> {
    fn send_batch(&self, batch: EventBatch) {
        (**self).send_batch(batch)
    }
}
