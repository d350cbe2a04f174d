//! # Bulk Indexer
//!
//! Entry point and configuration for running the bulk ingestion pipeline
//! against OpenSearch, plus the demos exercising it end to end.

pub mod config;
pub mod demos;
pub mod signal;

pub use config::{Dependencies, IndexerConfig};
pub use signal::run_until_signal;

use thiserror::Error;

/// Errors that can occur during indexer initialization or execution.
#[derive(Error, Debug)]
pub enum IndexerError {
    /// Configuration error.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Pipeline error.
    #[error("Pipeline error: {0}")]
    Pipeline(#[from] bulk_indexer_pipeline::PipelineError),

    /// Document store error.
    #[error("Store error: {0}")]
    Store(#[from] bulk_indexer_repository::StoreError),

    /// A demo finished but the store does not hold what was indexed.
    #[error("Verification failed: {0}")]
    Verification(String),

    /// The run was stopped by a shutdown signal after draining the pipeline.
    #[error("Interrupted by shutdown signal")]
    Interrupted,
}

impl IndexerError {
    /// Create a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }

    /// Create a verification error.
    pub fn verification(msg: impl Into<String>) -> Self {
        Self::Verification(msg.into())
    }
}
