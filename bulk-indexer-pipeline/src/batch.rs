//! Batches of write operations.
//!
//! A batch starts life as an [`OpenBatch`] owned by the accumulator and is
//! frozen into a [`Batch`] when a flush trigger fires. Freezing moves the
//! operations out, so a batch in flight can never be touched by producers.

use std::fmt;
use tokio::time::Instant;

use bulk_indexer_shared::WriteOperation;

/// What caused a batch to be flushed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FlushTrigger {
    /// The batch reached the configured operation count.
    OperationCount,
    /// The batch reached the configured byte size.
    ByteSize,
    /// The flush interval elapsed.
    Interval,
    /// The pipeline is shutting down.
    Shutdown,
}

impl fmt::Display for FlushTrigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::OperationCount => "operation_count",
            Self::ByteSize => "byte_size",
            Self::Interval => "interval",
            Self::Shutdown => "shutdown",
        };
        f.write_str(name)
    }
}

/// The batch currently accepting operations.
#[derive(Debug, Default)]
pub struct OpenBatch {
    operations: Vec<WriteOperation>,
    estimated_bytes: usize,
    opened_at: Option<Instant>,
}

impl OpenBatch {
    /// Append an operation, keeping submission order.
    pub fn push(&mut self, op: WriteOperation) {
        if self.opened_at.is_none() {
            self.opened_at = Some(Instant::now());
        }
        self.estimated_bytes += op.estimated_size();
        self.operations.push(op);
    }

    pub fn len(&self) -> usize {
        self.operations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    pub fn estimated_bytes(&self) -> usize {
        self.estimated_bytes
    }

    /// Freeze the batch for dispatch.
    pub fn freeze(self, id: u64, trigger: FlushTrigger) -> Batch {
        Batch {
            id,
            trigger,
            operations: self.operations,
            estimated_bytes: self.estimated_bytes,
            opened_at: self.opened_at.unwrap_or_else(Instant::now),
        }
    }
}

/// A frozen batch handed to the dispatcher.
#[derive(Debug)]
pub struct Batch {
    id: u64,
    trigger: FlushTrigger,
    operations: Vec<WriteOperation>,
    estimated_bytes: usize,
    opened_at: Instant,
}

impl Batch {
    /// Sequence number, unique for the lifetime of a pipeline.
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn trigger(&self) -> FlushTrigger {
        self.trigger
    }

    pub fn operations(&self) -> &[WriteOperation] {
        &self.operations
    }

    pub fn len(&self) -> usize {
        self.operations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    pub fn estimated_bytes(&self) -> usize {
        self.estimated_bytes
    }

    /// Time since the first operation entered the batch.
    pub fn age(&self) -> std::time::Duration {
        self.opened_at.elapsed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn op(n: usize) -> WriteOperation {
        WriteOperation::new("idx", "doc", format!(r#"{{"n":{}}}"#, n))
    }

    #[test]
    fn test_push_tracks_size_and_order() {
        let mut open = OpenBatch::default();
        assert!(open.is_empty());

        open.push(op(1));
        open.push(op(2));

        let expected = op(1).estimated_size() + op(2).estimated_size();
        assert_eq!(open.len(), 2);
        assert_eq!(open.estimated_bytes(), expected);

        let batch = open.freeze(7, FlushTrigger::OperationCount);
        assert_eq!(batch.id(), 7);
        assert_eq!(batch.trigger(), FlushTrigger::OperationCount);
        assert_eq!(batch.estimated_bytes(), expected);
        assert_eq!(batch.operations()[0], op(1));
        assert_eq!(batch.operations()[1], op(2));
    }

    #[test]
    fn test_trigger_display() {
        assert_eq!(FlushTrigger::ByteSize.to_string(), "byte_size");
        assert_eq!(FlushTrigger::Interval.to_string(), "interval");
    }
}
