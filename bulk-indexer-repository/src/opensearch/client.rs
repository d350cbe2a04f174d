//! OpenSearch client implementation.
//!
//! This module provides the concrete implementation of `DocumentStore`
//! using the OpenSearch Rust client.

use async_trait::async_trait;
use opensearch::{
    cluster::ClusterHealthParts,
    http::request::JsonBody,
    http::transport::{SingleNodeConnectionPool, TransportBuilder},
    indices::{IndicesCreateParts, IndicesDeleteParts, IndicesExistsParts, IndicesRefreshParts},
    BulkParts, CountParts, OpenSearch, SearchParts,
};
use serde_json::{json, Value};
use tracing::{debug, error, info, instrument, warn};
use url::Url;

use crate::errors::StoreError;
use crate::interfaces::DocumentStore;
use crate::opensearch::queries;
use bulk_indexer_shared::{BatchResult, OperationOutcome, SearchHit, SearchHits, WriteOperation};

/// OpenSearch document store.
///
/// # Example
///
/// ```ignore
/// let store = OpenSearchStore::new("http://localhost:9200").await?;
///
/// let op = WriteOperation::from_value("testindex", "testdocument", &json!({"title": "a"}));
/// let result = store.execute(&[op]).await?;
/// assert!(!result.has_failures());
/// ```
pub struct OpenSearchStore {
    client: OpenSearch,
}

impl OpenSearchStore {
    /// Create a new store connected to the specified URL.
    ///
    /// # Arguments
    ///
    /// * `url` - The OpenSearch server URL (e.g., "http://localhost:9200")
    ///
    /// # Returns
    ///
    /// * `Ok(OpenSearchStore)` - A new client instance
    /// * `Err(StoreError)` - If connection setup fails
    pub async fn new(url: &str) -> Result<Self, StoreError> {
        let parsed_url = Url::parse(url).map_err(|e| StoreError::connection(e.to_string()))?;

        let conn_pool = SingleNodeConnectionPool::new(parsed_url);
        let transport = TransportBuilder::new(conn_pool)
            .disable_proxy()
            .build()
            .map_err(|e| StoreError::connection(e.to_string()))?;

        let client = OpenSearch::new(transport);

        info!(url = %url, "Created OpenSearch store");

        Ok(Self { client })
    }

    /// Check if the cluster is reachable and not red.
    pub async fn health_check(&self) -> Result<bool, StoreError> {
        let response = self
            .client
            .cluster()
            .health(ClusterHealthParts::None)
            .send()
            .await?;

        if !response.status_code().is_success() {
            return Ok(false);
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| StoreError::parse(e.to_string()))?;

        Ok(body["status"].as_str().is_some_and(|s| s != "red"))
    }

    /// Create the collection with the given settings and mappings if it does not exist.
    #[instrument(skip(self, settings))]
    pub async fn ensure_index(&self, collection: &str, settings: &Value) -> Result<(), StoreError> {
        Self::require_collection(collection)?;

        let exists = self
            .client
            .indices()
            .exists(IndicesExistsParts::Index(&[collection]))
            .send()
            .await?;

        if exists.status_code().is_success() {
            debug!(collection = %collection, "Index already exists");
            return Ok(());
        }

        let response = self
            .client
            .indices()
            .create(IndicesCreateParts::Index(collection))
            .body(settings.clone())
            .send()
            .await?;

        let status = response.status_code();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            error!(status = %status, body = %error_body, "Index creation failed");
            return Err(StoreError::IndexCreationError(format!(
                "Create index {} failed with status {}: {}",
                collection, status, error_body
            )));
        }

        info!(collection = %collection, "Created index");
        Ok(())
    }

    /// Delete a collection. A missing collection is not an error.
    #[instrument(skip(self))]
    pub async fn delete_index(&self, collection: &str) -> Result<(), StoreError> {
        Self::require_collection(collection)?;

        let response = self
            .client
            .indices()
            .delete(IndicesDeleteParts::Index(&[collection]))
            .send()
            .await?;

        let status = response.status_code();
        if status.as_u16() == 404 {
            return Ok(());
        }
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            return Err(StoreError::unexpected_status(status.as_u16(), error_body));
        }

        info!(collection = %collection, "Deleted index");
        Ok(())
    }

    /// Make every indexed document of a collection visible to count and search.
    pub async fn refresh(&self, collection: &str) -> Result<(), StoreError> {
        Self::require_collection(collection)?;

        let response = self
            .client
            .indices()
            .refresh(IndicesRefreshParts::Index(&[collection]))
            .send()
            .await?;

        let status = response.status_code();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            return Err(StoreError::unexpected_status(status.as_u16(), error_body));
        }

        Ok(())
    }

    /// Reject collection names that would address every index or none.
    fn require_collection(collection: &str) -> Result<(), StoreError> {
        let name = collection.trim();
        if name.is_empty() || name == "_all" || name.contains('*') || name.contains(',') {
            return Err(StoreError::invalid_request(format!(
                "collection must name a single index, got '{}'",
                collection
            )));
        }
        Ok(())
    }

    /// Build the bulk action line for an operation.
    fn action_line(op: &WriteOperation) -> Value {
        let mut meta = serde_json::Map::new();
        meta.insert("_index".to_string(), json!(op.collection()));
        if let Some(id) = op.id() {
            meta.insert("_id".to_string(), json!(id));
        }
        // Children must live on their parent's shard.
        if let Some(parent) = op.parent() {
            meta.insert("routing".to_string(), json!(parent));
        }
        json!({ "index": meta })
    }

    /// Per-operation items of a `_bulk` response.
    fn bulk_items(body: &Value) -> Result<&Vec<Value>, StoreError> {
        body["items"].as_array().ok_or_else(|| {
            let reason = body["error"]["reason"].as_str().unwrap_or("bulk response has no items");
            StoreError::bulk(reason)
        })
    }

    /// Map a bulk response item to an operation outcome.
    fn parse_bulk_item(item: &Value) -> OperationOutcome {
        let Some(result) = item.as_object().and_then(|obj| obj.values().next()) else {
            return OperationOutcome::failed("malformed bulk response item");
        };

        match result.get("error") {
            None | Some(Value::Null) => OperationOutcome::succeeded(),
            Some(Value::Object(error)) => {
                let kind = error.get("type").and_then(Value::as_str).unwrap_or("error");
                let reason = error.get("reason").and_then(Value::as_str).unwrap_or("unknown");
                OperationOutcome::failed(format!("{}: {}", kind, reason))
            }
            Some(other) => OperationOutcome::failed(other.to_string()),
        }
    }

    /// Parse a search hit from an OpenSearch response.
    fn parse_hit(hit: &Value) -> Option<SearchHit> {
        let id = hit.get("_id")?.as_str()?.to_string();
        Some(SearchHit {
            id,
            score: hit.get("_score").and_then(Value::as_f64),
            source: hit.get("_source").cloned().unwrap_or(Value::Null),
        })
    }
}

#[async_trait]
impl DocumentStore for OpenSearchStore {
    /// Send every operation in one `_bulk` request.
    ///
    /// Operations whose source is not valid JSON are failed locally and
    /// never sent; the returned outcomes still line up with `operations`.
    #[instrument(skip(self, operations), fields(operations = operations.len()))]
    async fn execute(&self, operations: &[WriteOperation]) -> Result<BatchResult, StoreError> {
        let mut outcomes: Vec<Option<OperationOutcome>> = vec![None; operations.len()];
        let mut sent = Vec::with_capacity(operations.len());
        let mut body: Vec<JsonBody<Value>> = Vec::with_capacity(operations.len() * 2);

        for (position, op) in operations.iter().enumerate() {
            match serde_json::from_str::<Value>(op.source()) {
                Ok(source) => {
                    body.push(Self::action_line(op).into());
                    body.push(source.into());
                    sent.push(position);
                }
                Err(e) => {
                    outcomes[position] =
                        Some(OperationOutcome::failed(format!("invalid document source: {}", e)));
                }
            }
        }

        if !sent.is_empty() {
            let response = self.client.bulk(BulkParts::None).body(body).send().await?;

            let status = response.status_code();
            if !status.is_success() {
                let error_body = response.text().await.unwrap_or_default();
                error!(status = %status, body = %error_body, "Bulk request failed");
                return Err(StoreError::unexpected_status(status.as_u16(), error_body));
            }

            let response_body: Value = response
                .json()
                .await
                .map_err(|e| StoreError::parse(e.to_string()))?;

            let items = Self::bulk_items(&response_body)?;

            if items.len() != sent.len() {
                warn!(
                    expected = sent.len(),
                    received = items.len(),
                    "Bulk response item count mismatch"
                );
            }

            for (position, item) in sent.iter().zip(items.iter()) {
                outcomes[*position] = Some(Self::parse_bulk_item(item));
            }
        }

        let outcomes = outcomes
            .into_iter()
            .map(|o| o.unwrap_or_else(|| OperationOutcome::failed("no result in bulk response")))
            .collect();

        Ok(BatchResult::new(outcomes))
    }

    async fn count(&self, collection: &str, filter: Option<&Value>) -> Result<u64, StoreError> {
        let query = filter.cloned().unwrap_or_else(queries::match_all);

        let response = self
            .client
            .count(CountParts::Index(&[collection]))
            .body(json!({ "query": query }))
            .send()
            .await?;

        let status = response.status_code();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            return Err(StoreError::query(format!(
                "Count failed with status {}: {}",
                status, error_body
            )));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| StoreError::parse(e.to_string()))?;

        body["count"]
            .as_u64()
            .ok_or_else(|| StoreError::parse("count response has no count"))
    }

    #[instrument(skip(self, query))]
    async fn search(&self, collection: &str, query: &Value) -> Result<SearchHits, StoreError> {
        let response = self
            .client
            .search(SearchParts::Index(&[collection]))
            .body(json!({ "query": query }))
            .send()
            .await?;

        let status = response.status_code();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            return Err(StoreError::query(format!(
                "Search failed with status {}: {}",
                status, error_body
            )));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| StoreError::parse(e.to_string()))?;

        let total = body["hits"]["total"]["value"]
            .as_u64()
            .or_else(|| body["hits"]["total"].as_u64())
            .unwrap_or(0);

        let hits = body["hits"]["hits"]
            .as_array()
            .map(|hits| hits.iter().filter_map(Self::parse_hit).collect())
            .unwrap_or_default();

        Ok(SearchHits { total, hits })
    }
}
