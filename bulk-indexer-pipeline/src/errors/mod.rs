//! Error types for the bulk indexer pipeline.
//!
//! Store failures never show up here: they are reported per batch through
//! the completion tracker and the batch observers.

use std::time::Duration;
use thiserror::Error;

/// Errors that can occur in the bulk indexer pipeline.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PipelineError {
    /// A configuration value was rejected at initialization.
    #[error("Invalid configuration for {field}: {reason}")]
    InvalidConfig { field: &'static str, reason: String },

    /// The pipeline has been shut down and no longer accepts operations.
    #[error("Pipeline is shut down")]
    Closed,

    /// A caller-imposed deadline elapsed before every operation was acknowledged.
    #[error("Timed out after {waited:?} with {pending} operations unacknowledged")]
    Timeout { waited: Duration, pending: u64 },
}

impl PipelineError {
    /// Create an invalid configuration error.
    pub fn invalid_config(field: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidConfig {
            field,
            reason: reason.into(),
        }
    }

    /// Create a timeout error.
    pub fn timeout(waited: Duration, pending: u64) -> Self {
        Self::Timeout { waited, pending }
    }
}
