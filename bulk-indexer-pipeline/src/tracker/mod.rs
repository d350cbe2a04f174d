//! Completion tracking for the bulk indexer pipeline.
//!
//! Counts submitted and acknowledged operations so callers can tell when
//! everything they handed over has been processed.

use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::Notify;

/// Snapshot of the pipeline counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progress {
    pub submitted: u64,
    pub acknowledged: u64,
    pub failed: u64,
    pub completed_batches: u64,
}

impl Progress {
    pub fn pending(&self) -> u64 {
        self.submitted.saturating_sub(self.acknowledged)
    }
}

/// Lock-free submitted/acknowledged counters with an async completion wait.
///
/// Every operation is counted as acknowledged exactly once, whether it was
/// indexed, rejected by the store, or lost with a failed request. Both
/// counters only grow, and `acknowledged` never passes `submitted`.
#[derive(Debug, Default)]
pub struct CompletionTracker {
    submitted: AtomicU64,
    acknowledged: AtomicU64,
    failed: AtomicU64,
    completed_batches: AtomicU64,
    notify: Notify,
}

impl CompletionTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count operations entering the pipeline.
    pub fn record_submitted(&self, count: u64) {
        self.submitted.fetch_add(count, Ordering::SeqCst);
    }

    /// Record a finished batch, whatever its outcome.
    pub fn on_batch_completed(&self, operation_count: usize, failure_count: usize) {
        self.failed.fetch_add(failure_count as u64, Ordering::SeqCst);
        self.completed_batches.fetch_add(1, Ordering::SeqCst);
        self.acknowledged
            .fetch_add(operation_count as u64, Ordering::SeqCst);
        self.notify.notify_waiters();
    }

    pub fn submitted_count(&self) -> u64 {
        self.submitted.load(Ordering::SeqCst)
    }

    pub fn acknowledged_count(&self) -> u64 {
        self.acknowledged.load(Ordering::SeqCst)
    }

    pub fn failed_count(&self) -> u64 {
        self.failed.load(Ordering::SeqCst)
    }

    pub fn completed_batches(&self) -> u64 {
        self.completed_batches.load(Ordering::SeqCst)
    }

    /// Consistent snapshot of all counters.
    pub fn progress(&self) -> Progress {
        // Acknowledged first: submitted can only have grown by the time it is read.
        let acknowledged = self.acknowledged_count();
        let failed = self.failed_count();
        let completed_batches = self.completed_batches();
        let submitted = self.submitted_count();
        Progress {
            submitted,
            acknowledged,
            failed,
            completed_batches,
        }
    }

    /// Whether every submitted operation has been acknowledged.
    pub fn is_complete(&self) -> bool {
        let progress = self.progress();
        progress.acknowledged >= progress.submitted
    }

    /// Wait until every operation submitted so far has been acknowledged.
    pub async fn wait_for_completion(&self) {
        loop {
            let notified = self.notify.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if self.is_complete() {
                return;
            }

            notified.await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    #[test]
    fn test_counters() {
        let tracker = CompletionTracker::new();
        tracker.record_submitted(5);
        assert!(!tracker.is_complete());

        tracker.on_batch_completed(5, 2);

        let progress = tracker.progress();
        assert_eq!(progress.submitted, 5);
        assert_eq!(progress.acknowledged, 5);
        assert_eq!(progress.failed, 2);
        assert_eq!(progress.completed_batches, 1);
        assert_eq!(progress.pending(), 0);
        assert!(tracker.is_complete());
    }

    #[tokio::test]
    async fn test_wait_for_completion_returns_immediately_when_idle() {
        let tracker = CompletionTracker::new();
        tokio::time::timeout(Duration::from_secs(1), tracker.wait_for_completion())
            .await
            .expect("nothing submitted, should not wait");
    }

    #[tokio::test]
    async fn test_wait_for_completion_wakes_on_last_batch() {
        let tracker = Arc::new(CompletionTracker::new());
        tracker.record_submitted(4);

        let waiter = tokio::spawn({
            let tracker = tracker.clone();
            async move { tracker.wait_for_completion().await }
        });

        tracker.on_batch_completed(2, 0);
        tokio::task::yield_now().await;
        assert!(!waiter.is_finished());

        tracker.on_batch_completed(2, 1);
        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .expect("waiter should finish")
            .unwrap();

        assert_eq!(tracker.failed_count(), 1);
    }
}
