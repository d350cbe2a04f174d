//! Document store error types.
//!
//! This module defines the errors a document store can report back to the
//! ingestion pipeline and to query code.

use thiserror::Error;

/// Errors that can occur during document store operations.
#[derive(Error, Debug, Clone)]
pub enum StoreError {
    /// Failed to reach the store, or the request timed out.
    #[error("Connection error: {0}")]
    ConnectionError(String),

    /// The store answered with a non-success HTTP status.
    #[error("Unexpected status {status}: {message}")]
    UnexpectedStatus { status: u16, message: String },

    /// The bulk request as a whole was rejected.
    #[error("Bulk error: {0}")]
    BulkError(String),

    /// Count or search execution failed.
    #[error("Query error: {0}")]
    QueryError(String),

    /// Failed to create or refresh an index.
    #[error("Index creation error: {0}")]
    IndexCreationError(String),

    /// Failed to parse a response from the store.
    #[error("Parse error: {0}")]
    ParseError(String),

    /// Failed to serialize a request body.
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// The request could not be built from the given arguments.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

impl StoreError {
    /// Create a connection error.
    pub fn connection(msg: impl Into<String>) -> Self {
        Self::ConnectionError(msg.into())
    }

    /// Create an unexpected status error.
    pub fn unexpected_status(status: u16, msg: impl Into<String>) -> Self {
        Self::UnexpectedStatus {
            status,
            message: msg.into(),
        }
    }

    /// Create a bulk error.
    pub fn bulk(msg: impl Into<String>) -> Self {
        Self::BulkError(msg.into())
    }

    /// Create a query error.
    pub fn query(msg: impl Into<String>) -> Self {
        Self::QueryError(msg.into())
    }

    /// Create a parse error.
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::ParseError(msg.into())
    }

    /// Create an invalid request error.
    pub fn invalid_request(msg: impl Into<String>) -> Self {
        Self::InvalidRequest(msg.into())
    }

    /// Whether retrying the same request later could succeed.
    ///
    /// Connection failures, timeouts, throttling (429) and gateway or
    /// availability errors (502, 503, 504) are transient. Everything else
    /// would fail the same way again.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::ConnectionError(_) => true,
            Self::UnexpectedStatus { status, .. } => matches!(status, 429 | 502 | 503 | 504),
            Self::BulkError(_)
            | Self::QueryError(_)
            | Self::IndexCreationError(_)
            | Self::ParseError(_)
            | Self::SerializationError(_)
            | Self::InvalidRequest(_) => false,
        }
    }
}

impl From<opensearch::Error> for StoreError {
    fn from(err: opensearch::Error) -> Self {
        match err.status_code() {
            Some(status) => Self::unexpected_status(status.as_u16(), err.to_string()),
            None => Self::ConnectionError(err.to_string()),
        }
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        Self::SerializationError(err.to_string())
    }
}
