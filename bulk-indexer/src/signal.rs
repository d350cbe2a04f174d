//! Graceful interruption of a running demo.

use std::future::Future;
use tracing::info;

use crate::IndexerError;
use bulk_indexer_pipeline::BulkPipeline;

/// Drive `work` until it finishes or `signal` fires.
///
/// When the signal wins, the pipeline is shut down before returning, so the
/// open batch is flushed and every in-flight batch is acknowledged.
///
/// # Returns
///
/// * `Err(IndexerError::Interrupted)` - If `signal` fired first
pub async fn run_until_signal<T, W, S>(
    pipeline: &BulkPipeline,
    work: W,
    signal: S,
) -> Result<T, IndexerError>
where
    W: Future<Output = Result<T, IndexerError>>,
    S: Future,
{
    tokio::select! {
        result = work => result,
        _ = signal => {
            info!("Received shutdown signal");
            pipeline.shutdown().await;
            Err(IndexerError::Interrupted)
        }
    }
}
