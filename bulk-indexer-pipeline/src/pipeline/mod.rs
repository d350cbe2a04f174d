//! Pipeline module for the bulk indexer.
//!
//! Wires the accumulator, flush scheduler, dispatcher and completion
//! tracker together behind a single handle.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{info, instrument, warn};

use crate::accumulator::Accumulator;
use crate::config::PipelineConfig;
use crate::dispatcher::Dispatcher;
use crate::errors::PipelineError;
use crate::observer::BatchObserver;
use crate::scheduler::FlushScheduler;
use crate::tracker::{CompletionTracker, Progress};
use bulk_indexer_repository::DocumentStore;
use bulk_indexer_shared::WriteOperation;

/// Asynchronous bulk ingestion pipeline.
///
/// Producers call [`submit`](Self::submit) from any number of tasks.
/// Operations are grouped into batches that are flushed when they reach
/// the configured operation count or byte size, or when the flush interval
/// elapses, and sent to the store with bounded concurrency.
///
/// Store failures never surface from `submit`; they are reported through
/// the counters and the attached [`BatchObserver`]s. Call
/// [`shutdown`](Self::shutdown) before dropping the pipeline, or buffered
/// operations are lost.
///
/// # Example
///
/// ```ignore
/// let config = PipelineConfig::new(10_000, 2, 10, 32 * 1024 * 1024)?;
/// let pipeline = BulkPipeline::with_observers(config, store, vec![Arc::new(LoggingObserver)]);
///
/// pipeline.submit(WriteOperation::from_value("testindex", "testdocument", &doc)).await?;
/// pipeline.shutdown().await;
/// assert_eq!(pipeline.submitted_count(), pipeline.acknowledged_count());
/// ```
pub struct BulkPipeline {
    config: PipelineConfig,
    accumulator: Arc<Accumulator>,
    dispatcher: Dispatcher,
    tracker: Arc<CompletionTracker>,
    scheduler: Mutex<Option<FlushScheduler>>,
}

impl BulkPipeline {
    /// Start a pipeline without observers. Must be called from within a Tokio runtime.
    pub fn new(config: PipelineConfig, store: Arc<dyn DocumentStore>) -> Self {
        Self::with_observers(config, store, Vec::new())
    }

    /// Start a pipeline reporting every batch to `observers`.
    pub fn with_observers(
        config: PipelineConfig,
        store: Arc<dyn DocumentStore>,
        observers: Vec<Arc<dyn BatchObserver>>,
    ) -> Self {
        let tracker = Arc::new(CompletionTracker::new());
        let accumulator = Arc::new(Accumulator::new(
            config.max_operations_per_batch(),
            config.max_batch_bytes(),
            tracker.clone(),
        ));
        let dispatcher = Dispatcher::new(
            store,
            config.max_concurrent_requests(),
            tracker.clone(),
            observers,
            config.retry_policy(),
        );
        let scheduler =
            FlushScheduler::spawn(config.flush_interval(), accumulator.clone(), dispatcher.clone());

        info!(
            max_operations_per_batch = config.max_operations_per_batch(),
            max_concurrent_requests = config.max_concurrent_requests(),
            flush_interval_secs = config.flush_interval_secs(),
            max_batch_bytes = config.max_batch_bytes(),
            "Started bulk pipeline"
        );

        Self {
            config,
            accumulator,
            dispatcher,
            tracker,
            scheduler: Mutex::new(Some(scheduler)),
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Add an operation to the current batch.
    ///
    /// Waits only when this operation fills a batch and every concurrency
    /// slot is taken.
    ///
    /// # Returns
    ///
    /// * `Err(PipelineError::Closed)` - If the pipeline has been shut down
    pub async fn submit(&self, op: WriteOperation) -> Result<(), PipelineError> {
        if let Some(batch) = self.accumulator.append(op).await? {
            self.dispatcher.dispatch(batch).await;
        }
        Ok(())
    }

    /// Submit operations one by one, stopping at the first rejection.
    pub async fn submit_all<I>(&self, ops: I) -> Result<(), PipelineError>
    where
        I: IntoIterator<Item = WriteOperation>,
    {
        for op in ops {
            self.submit(op).await?;
        }
        Ok(())
    }

    /// Operations accepted so far.
    pub fn submitted_count(&self) -> u64 {
        self.tracker.submitted_count()
    }

    /// Operations whose batch has completed, successfully or not.
    pub fn acknowledged_count(&self) -> u64 {
        self.tracker.acknowledged_count()
    }

    /// Acknowledged operations that failed.
    pub fn failed_count(&self) -> u64 {
        self.tracker.failed_count()
    }

    pub fn completed_batches(&self) -> u64 {
        self.tracker.completed_batches()
    }

    pub fn progress(&self) -> Progress {
        self.tracker.progress()
    }

    /// Bulk requests currently running.
    pub fn in_flight(&self) -> usize {
        self.dispatcher.in_flight()
    }

    /// Operations sitting in the open batch.
    pub async fn pending(&self) -> usize {
        self.accumulator.pending().await
    }

    /// Wait until every operation submitted so far is acknowledged.
    ///
    /// Operations still buffered are only flushed by a size threshold or the
    /// flush interval, so this can take up to one interval.
    pub async fn wait_for_completion(&self) {
        self.tracker.wait_for_completion().await
    }

    /// Like [`wait_for_completion`](Self::wait_for_completion), giving up after `timeout`.
    pub async fn wait_for_completion_timeout(&self, timeout: Duration) -> Result<(), PipelineError> {
        tokio::time::timeout(timeout, self.tracker.wait_for_completion())
            .await
            .map_err(|_| PipelineError::timeout(timeout, self.tracker.progress().pending()))
    }

    /// Stop accepting operations, flush the open batch and wait for every
    /// in-flight batch to complete.
    ///
    /// Safe to call more than once; later calls return once the first
    /// shutdown has drained.
    #[instrument(skip(self))]
    pub async fn shutdown(&self) {
        if let Some(batch) = self.accumulator.close().await {
            self.dispatcher.dispatch(batch).await;
        }

        if let Some(scheduler) = self.scheduler.lock().await.take() {
            scheduler.stop().await;
        }

        self.tracker.wait_for_completion().await;

        let progress = self.tracker.progress();
        info!(
            submitted = progress.submitted,
            acknowledged = progress.acknowledged,
            failed = progress.failed,
            batches = progress.completed_batches,
            "Bulk pipeline shut down"
        );
    }
}

impl Drop for BulkPipeline {
    fn drop(&mut self) {
        if !self.tracker.is_complete() {
            warn!(
                pending = self.tracker.progress().pending(),
                "Bulk pipeline dropped with unacknowledged operations"
            );
        }
    }
}
