//! Dispatcher module for the bulk indexer pipeline.
//!
//! Sends frozen batches to the document store, never running more than the
//! configured number of bulk requests at once.

use futures::FutureExt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::{debug, error, info, instrument, warn};

use crate::batch::Batch;
use crate::config::RetryPolicy;
use crate::observer::{BatchObserver, BatchOutcome};
use crate::tracker::CompletionTracker;
use bulk_indexer_repository::{DocumentStore, StoreError};
use bulk_indexer_shared::BatchResult;

/// Dispatches batches to the store on background tasks.
///
/// Each in-flight batch holds one permit of a semaphore sized to
/// `max_concurrent_requests`. When all permits are taken, [`dispatch`]
/// waits, which pushes back on whoever is handing over batches.
///
/// The dispatcher is cheap to clone; clones share the same permits.
///
/// [`dispatch`]: Dispatcher::dispatch
#[derive(Clone)]
pub struct Dispatcher {
    store: Arc<dyn DocumentStore>,
    permits: Arc<Semaphore>,
    max_concurrent_requests: usize,
    tracker: Arc<CompletionTracker>,
    observers: Arc<[Arc<dyn BatchObserver>]>,
    retry_policy: RetryPolicy,
}

impl Dispatcher {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        max_concurrent_requests: usize,
        tracker: Arc<CompletionTracker>,
        observers: Vec<Arc<dyn BatchObserver>>,
        retry_policy: RetryPolicy,
    ) -> Self {
        Self {
            store,
            permits: Arc::new(Semaphore::new(max_concurrent_requests)),
            max_concurrent_requests,
            tracker,
            observers: observers.into(),
            retry_policy,
        }
    }

    /// Number of bulk requests currently running.
    pub fn in_flight(&self) -> usize {
        self.max_concurrent_requests
            .saturating_sub(self.permits.available_permits())
    }

    /// Hand a batch to a background task once a concurrency slot is free.
    ///
    /// Returns as soon as the task is spawned; the outcome is reported to
    /// the tracker and observers.
    pub async fn dispatch(&self, batch: Batch) {
        let permit = match self.permits.clone().acquire_owned().await {
            Ok(permit) => permit,
            Err(_) => {
                // Permits are never closed while batches can still arrive.
                error!(batch_id = batch.id(), "Dispatcher closed, failing batch");
                let outcome = BatchOutcome::from_error(&batch, "dispatcher closed", 0);
                self.complete(&outcome);
                return;
            }
        };

        let dispatcher = self.clone();
        tokio::spawn(async move {
            dispatcher.run(batch).await;
            drop(permit);
        });
    }

    /// Send one batch and report its outcome.
    #[instrument(skip(self, batch), fields(batch_id = batch.id(), operations = batch.len(), trigger = %batch.trigger()))]
    async fn run(&self, batch: Batch) {
        self.notify_observers("on_batch_started", |observer| {
            observer.on_batch_started(batch.id(), batch.len())
        });

        debug!(
            bytes = batch.estimated_bytes(),
            held = ?batch.age(),
            "Sending batch"
        );

        let attempt = AssertUnwindSafe(self.execute_with_retry(&batch))
            .catch_unwind()
            .await;

        let outcome = match attempt {
            Ok((Ok(result), attempts)) => BatchOutcome::from_result(&batch, &result, attempts),
            Ok((Err(e), attempts)) => BatchOutcome::from_error(&batch, &e.to_string(), attempts),
            Err(_) => {
                error!("Document store panicked while executing batch");
                BatchOutcome::from_error(&batch, "document store panicked", 1)
            }
        };

        self.complete(&outcome);
    }

    /// Notify observers, then acknowledge the batch.
    ///
    /// The batch is acknowledged even if an observer panics.
    fn complete(&self, outcome: &BatchOutcome) {
        self.notify_observers("on_batch_completed", |observer| {
            observer.on_batch_completed(outcome)
        });
        self.tracker
            .on_batch_completed(outcome.operation_count, outcome.failure_count());
    }

    /// Call every observer, logging and swallowing panics.
    fn notify_observers<F>(&self, hook: &'static str, notify: F)
    where
        F: Fn(&dyn BatchObserver),
    {
        for observer in self.observers.iter() {
            let call = panic::catch_unwind(AssertUnwindSafe(|| notify(observer.as_ref())));
            if call.is_err() {
                error!(hook, "Batch observer panicked");
            }
        }
    }

    /// Execute a batch with exponential backoff on transient errors.
    ///
    /// Returns the last result together with the number of attempts made.
    async fn execute_with_retry(&self, batch: &Batch) -> (Result<BatchResult, StoreError>, u32) {
        let mut attempts = 0;

        loop {
            attempts += 1;
            match self.store.execute(batch.operations()).await {
                Ok(result) => {
                    if attempts > 1 {
                        info!(attempts, "Batch succeeded after retry");
                    }
                    return (Ok(result), attempts);
                }
                Err(e) => {
                    let retry = attempts - 1;
                    if !e.is_transient() || retry >= self.retry_policy.max_retries {
                        return (Err(e), attempts);
                    }

                    let delay = self.retry_policy.delay_for(retry + 1);
                    warn!(
                        attempt = attempts,
                        max_retries = self.retry_policy.max_retries,
                        delay = ?delay,
                        error = %e,
                        "Bulk request failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }
}
