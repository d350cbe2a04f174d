//! Dependency initialization and wiring for the bulk indexer.

use std::sync::Arc;
use tracing::info;

use crate::config::IndexerConfig;
use crate::IndexerError;
use bulk_indexer_pipeline::{BatchObserver, BulkPipeline, LoggingObserver};
use bulk_indexer_repository::{DocumentStore, OpenSearchStore};

/// Container for all initialized dependencies.
pub struct Dependencies {
    pub config: IndexerConfig,
    /// The store, kept concrete for index administration and queries.
    pub store: Arc<OpenSearchStore>,
    /// The running pipeline writing to `store`.
    pub pipeline: BulkPipeline,
}

impl Dependencies {
    /// Connect to OpenSearch and start the pipeline.
    ///
    /// # Returns
    ///
    /// * `Ok(Dependencies)` - Initialized dependencies
    /// * `Err(IndexerError)` - If the configuration is invalid or OpenSearch is unreachable
    pub async fn new(config: IndexerConfig) -> Result<Self, IndexerError> {
        info!(
            opensearch_url = %config.opensearch_url,
            index = %config.index,
            batch_size = config.batch_size,
            concurrent_requests = config.concurrent_requests,
            "Initializing dependencies"
        );

        let pipeline_config = config.pipeline_config()?;

        let store = OpenSearchStore::new(&config.opensearch_url)
            .await
            .map_err(|e| IndexerError::config(format!("Failed to create OpenSearch client: {}", e)))?;

        let healthy = store
            .health_check()
            .await
            .map_err(|e| IndexerError::config(format!("OpenSearch health check failed: {}", e)))?;

        if !healthy {
            return Err(IndexerError::config("OpenSearch cluster is unhealthy"));
        }

        info!("OpenSearch connection verified");

        let store = Arc::new(store);
        let observers: Vec<Arc<dyn BatchObserver>> = vec![Arc::new(LoggingObserver)];
        let pipeline = BulkPipeline::with_observers(
            pipeline_config,
            store.clone() as Arc<dyn DocumentStore>,
            observers,
        );

        Ok(Self {
            config,
            store,
            pipeline,
        })
    }
}
