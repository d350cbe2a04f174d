//! Accumulator module for the bulk indexer pipeline.
//!
//! Buffers submitted operations into the open batch and swaps it out when
//! a size threshold is reached.

use std::sync::Arc;
use tokio::sync::Mutex;

use crate::batch::{Batch, FlushTrigger, OpenBatch};
use crate::errors::PipelineError;
use crate::tracker::CompletionTracker;
use bulk_indexer_shared::WriteOperation;

#[derive(Debug, Default)]
struct AccumulatorState {
    open: OpenBatch,
    next_batch_id: u64,
    closed: bool,
}

impl AccumulatorState {
    fn swap(&mut self, trigger: FlushTrigger) -> Batch {
        let id = self.next_batch_id;
        self.next_batch_id += 1;
        std::mem::take(&mut self.open).freeze(id, trigger)
    }
}

/// Collects operations into batches.
///
/// A single lock guards append-or-swap, so concurrent producers see a
/// consistent batch and a full batch leaves the accumulator exactly once.
/// The lock is never held across dispatch.
#[derive(Debug)]
pub struct Accumulator {
    state: Mutex<AccumulatorState>,
    max_operations: usize,
    max_bytes: usize,
    tracker: Arc<CompletionTracker>,
}

impl Accumulator {
    pub fn new(max_operations: usize, max_bytes: usize, tracker: Arc<CompletionTracker>) -> Self {
        Self {
            state: Mutex::new(AccumulatorState::default()),
            max_operations,
            max_bytes,
            tracker,
        }
    }

    /// Append an operation to the open batch.
    ///
    /// Returns the frozen batch when this operation filled it. The operation
    /// is counted as submitted before it becomes visible to any flush.
    pub async fn append(&self, op: WriteOperation) -> Result<Option<Batch>, PipelineError> {
        let mut state = self.state.lock().await;
        if state.closed {
            return Err(PipelineError::Closed);
        }

        self.tracker.record_submitted(1);
        state.open.push(op);

        let trigger = if state.open.len() >= self.max_operations {
            Some(FlushTrigger::OperationCount)
        } else if state.open.estimated_bytes() >= self.max_bytes {
            Some(FlushTrigger::ByteSize)
        } else {
            None
        };

        Ok(trigger.map(|trigger| state.swap(trigger)))
    }

    /// Swap out the open batch if it holds anything.
    pub async fn take(&self, trigger: FlushTrigger) -> Option<Batch> {
        let mut state = self.state.lock().await;
        if state.open.is_empty() {
            return None;
        }
        Some(state.swap(trigger))
    }

    /// Stop accepting operations and return whatever is still buffered.
    pub async fn close(&self) -> Option<Batch> {
        let mut state = self.state.lock().await;
        state.closed = true;
        if state.open.is_empty() {
            return None;
        }
        Some(state.swap(FlushTrigger::Shutdown))
    }

    /// Number of operations waiting in the open batch.
    pub async fn pending(&self) -> usize {
        self.state.lock().await.open.len()
    }
}
