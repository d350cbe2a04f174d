//! Search results returned by the document store.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A single matching document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    pub id: String,
    pub score: Option<f64>,
    pub source: Value,
}

/// Matching documents and the total match count.
///
/// `total` may exceed `hits.len()` when the store pages results.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchHits {
    pub total: u64,
    pub hits: Vec<SearchHit>,
}

impl SearchHits {
    pub fn empty() -> Self {
        Self::default()
    }
}
