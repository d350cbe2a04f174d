//! Document store trait definition.
//!
//! This module defines the abstract interface the bulk pipeline writes
//! through, allowing different backends (OpenSearch, in-process fakes).

use async_trait::async_trait;
use serde_json::Value;

use crate::errors::StoreError;
use bulk_indexer_shared::{BatchResult, SearchHits, WriteOperation};

/// Abstract interface for document store operations.
///
/// # Thread Safety
///
/// Implementations must be `Send + Sync`. The pipeline calls `execute`
/// from several dispatch tasks at once, up to its configured concurrency.
///
/// # Error Handling
///
/// A returned `Err` means the request as a whole failed and none of its
/// operations can be assumed applied. Per-operation rejections inside an
/// accepted request are reported through [`BatchResult`] instead.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Execute a bulk write request.
    ///
    /// # Arguments
    ///
    /// * `operations` - The operations to apply, in submission order
    ///
    /// # Returns
    ///
    /// * `Ok(BatchResult)` - One outcome per operation, in the same order
    /// * `Err(StoreError)` - If the request could not be executed at all
    async fn execute(&self, operations: &[WriteOperation]) -> Result<BatchResult, StoreError>;

    /// Count documents in a collection.
    ///
    /// `filter` is a query clause; `None` counts every document.
    async fn count(&self, collection: &str, filter: Option<&Value>) -> Result<u64, StoreError>;

    /// Search a collection with a query clause.
    ///
    /// # Example
    ///
    /// ```ignore
    /// let query = queries::has_parent("passport", queries::query_string("nationality:french"));
    /// let hits = store.search("data", &query).await?;
    /// println!("Found {} results", hits.total);
    /// ```
    async fn search(&self, collection: &str, query: &Value) -> Result<SearchHits, StoreError>;
}
