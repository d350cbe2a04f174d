//! Batch observers.
//!
//! Observers are notified when a batch starts dispatching and when it
//! completes. Any number can be attached to a pipeline; logging and
//! metrics are separate observers rather than layers of one.

use std::fmt;
use tracing::{error, info, warn};

use crate::batch::{Batch, FlushTrigger};
use bulk_indexer_shared::BatchResult;

/// Terminal state of a dispatched batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchStatus {
    /// Every operation was applied.
    Success,
    /// The store accepted the request but rejected some operations.
    PartialFailure,
    /// The request failed as a whole; every operation is failed.
    Failed,
}

impl fmt::Display for BatchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Success => "success",
            Self::PartialFailure => "partial_failure",
            Self::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// One failed operation within a batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationFailure {
    /// Index of the operation within its batch.
    pub position: usize,
    /// The document id, when the operation carried one.
    pub document_id: Option<String>,
    pub reason: String,
}

/// What happened to a dispatched batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchOutcome {
    pub batch_id: u64,
    pub operation_count: usize,
    pub trigger: FlushTrigger,
    pub status: BatchStatus,
    pub failures: Vec<OperationFailure>,
    /// Number of times the request was sent, retries included.
    pub attempts: u32,
}

impl BatchOutcome {
    /// Build the outcome of a request the store answered.
    ///
    /// Outcomes are matched to operations by position. Operations the store
    /// returned no outcome for are failed.
    pub fn from_result(batch: &Batch, result: &BatchResult, attempts: u32) -> Self {
        let failures: Vec<OperationFailure> = batch
            .operations()
            .iter()
            .enumerate()
            .filter_map(|(position, op)| {
                let reason = match result.outcomes.get(position) {
                    Some(outcome) if outcome.success => return None,
                    Some(outcome) => outcome
                        .reason
                        .clone()
                        .unwrap_or_else(|| "rejected by store".to_string()),
                    None => "no outcome returned by store".to_string(),
                };
                Some(OperationFailure {
                    position,
                    document_id: op.id().map(str::to_string),
                    reason,
                })
            })
            .collect();

        let status = if failures.is_empty() {
            BatchStatus::Success
        } else if failures.len() == batch.len() {
            BatchStatus::Failed
        } else {
            BatchStatus::PartialFailure
        };

        Self {
            batch_id: batch.id(),
            operation_count: batch.len(),
            trigger: batch.trigger(),
            status,
            failures,
            attempts,
        }
    }

    /// Build the outcome of a request that failed as a whole.
    pub fn from_error(batch: &Batch, reason: &str, attempts: u32) -> Self {
        let failures = batch
            .operations()
            .iter()
            .enumerate()
            .map(|(position, op)| OperationFailure {
                position,
                document_id: op.id().map(str::to_string),
                reason: reason.to_string(),
            })
            .collect();

        Self {
            batch_id: batch.id(),
            operation_count: batch.len(),
            trigger: batch.trigger(),
            status: BatchStatus::Failed,
            failures,
            attempts,
        }
    }

    pub fn failure_count(&self) -> usize {
        self.failures.len()
    }

    pub fn failure_reasons(&self) -> Vec<&str> {
        self.failures.iter().map(|f| f.reason.as_str()).collect()
    }
}

/// Receives batch lifecycle events from the dispatcher.
///
/// Callbacks run on the dispatch task and should return quickly.
pub trait BatchObserver: Send + Sync {
    /// Called right before the bulk request is sent.
    fn on_batch_started(&self, _batch_id: u64, _operation_count: usize) {}

    /// Called once per batch, after the last attempt.
    fn on_batch_completed(&self, outcome: &BatchOutcome);
}

impl<F> BatchObserver for F
where
    F: Fn(&BatchOutcome) + Send + Sync,
{
    fn on_batch_completed(&self, outcome: &BatchOutcome) {
        self(outcome)
    }
}

/// Logs every batch through `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingObserver;

impl BatchObserver for LoggingObserver {
    fn on_batch_started(&self, batch_id: u64, operation_count: usize) {
        info!(batch_id, operations = operation_count, "Processing batch");
    }

    fn on_batch_completed(&self, outcome: &BatchOutcome) {
        match outcome.status {
            BatchStatus::Success => info!(
                batch_id = outcome.batch_id,
                operations = outcome.operation_count,
                trigger = %outcome.trigger,
                "Processed batch"
            ),
            BatchStatus::PartialFailure => warn!(
                batch_id = outcome.batch_id,
                operations = outcome.operation_count,
                failures = outcome.failure_count(),
                reasons = ?outcome.failure_reasons(),
                "Processed batch with failures"
            ),
            BatchStatus::Failed => error!(
                batch_id = outcome.batch_id,
                operations = outcome.operation_count,
                attempts = outcome.attempts,
                reason = outcome.failures.first().map(|f| f.reason.as_str()).unwrap_or(""),
                "Failed to process batch"
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::batch::OpenBatch;
    use bulk_indexer_shared::{OperationOutcome, WriteOperation};
    use std::sync::Mutex;

    fn batch_of(count: usize) -> Batch {
        let mut open = OpenBatch::default();
        for i in 0..count {
            open.push(WriteOperation::new("idx", "doc", "{}").with_id(i.to_string()));
        }
        open.freeze(3, FlushTrigger::OperationCount)
    }

    #[test]
    fn test_partial_failure_positions() {
        let batch = batch_of(5);
        let result = BatchResult::new(vec![
            OperationOutcome::succeeded(),
            OperationOutcome::failed("version_conflict"),
            OperationOutcome::succeeded(),
            OperationOutcome::failed("mapper_parsing_exception"),
            OperationOutcome::succeeded(),
        ]);

        let outcome = BatchOutcome::from_result(&batch, &result, 1);

        assert_eq!(outcome.status, BatchStatus::PartialFailure);
        assert_eq!(outcome.operation_count, 5);
        assert_eq!(outcome.failure_count(), 2);
        assert_eq!(outcome.failures[0].position, 1);
        assert_eq!(outcome.failures[0].document_id.as_deref(), Some("1"));
        assert_eq!(outcome.failures[1].position, 3);
        assert_eq!(
            outcome.failure_reasons(),
            vec!["version_conflict", "mapper_parsing_exception"]
        );
    }

    #[test]
    fn test_missing_outcomes_are_failures() {
        let batch = batch_of(3);
        let result = BatchResult::all_succeeded(2);

        let outcome = BatchOutcome::from_result(&batch, &result, 1);

        assert_eq!(outcome.status, BatchStatus::PartialFailure);
        assert_eq!(outcome.failures.len(), 1);
        assert_eq!(outcome.failures[0].position, 2);
    }

    #[test]
    fn test_success_and_error() {
        let batch = batch_of(2);

        let ok = BatchOutcome::from_result(&batch, &BatchResult::all_succeeded(2), 1);
        assert_eq!(ok.status, BatchStatus::Success);
        assert!(ok.failures.is_empty());

        let failed = BatchOutcome::from_error(&batch, "connection refused", 3);
        assert_eq!(failed.status, BatchStatus::Failed);
        assert_eq!(failed.attempts, 3);
        assert_eq!(failed.failure_reasons(), vec!["connection refused"; 2]);
    }

    #[test]
    fn test_closure_observer() {
        let seen = Mutex::new(Vec::new());
        let observer = |outcome: &BatchOutcome| seen.lock().unwrap().push(outcome.batch_id);

        let batch = batch_of(1);
        let outcome = BatchOutcome::from_result(&batch, &BatchResult::all_succeeded(1), 1);
        observer.on_batch_started(batch.id(), batch.len());
        observer.on_batch_completed(&outcome);

        assert_eq!(*seen.lock().unwrap(), vec![3]);
    }
}
