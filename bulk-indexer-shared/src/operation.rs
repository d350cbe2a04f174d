//! Write operations submitted to the bulk pipeline.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Fixed per-operation cost added to the byte-size estimate, covering the
/// action metadata line the store expects in front of every document.
pub const REQUEST_OVERHEAD_BYTES: usize = 50;

/// A single document write addressed to a collection.
///
/// The payload is kept as an already-serialized JSON string so that the
/// pipeline never needs to know the document's shape. Operations are
/// immutable once built; the `with_*` methods consume and return `self`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WriteOperation {
    collection: String,
    doc_type: String,
    id: Option<String>,
    parent: Option<String>,
    source: String,
}

impl WriteOperation {
    /// Create an operation from a raw JSON document string.
    pub fn new(
        collection: impl Into<String>,
        doc_type: impl Into<String>,
        source: impl Into<String>,
    ) -> Self {
        Self {
            collection: collection.into(),
            doc_type: doc_type.into(),
            id: None,
            parent: None,
            source: source.into(),
        }
    }

    /// Create an operation from a JSON value.
    pub fn from_value(
        collection: impl Into<String>,
        doc_type: impl Into<String>,
        document: &Value,
    ) -> Self {
        Self::new(collection, doc_type, document.to_string())
    }

    /// Create an operation from any serializable document.
    pub fn from_document<T: Serialize>(
        collection: impl Into<String>,
        doc_type: impl Into<String>,
        document: &T,
    ) -> Result<Self, serde_json::Error> {
        let source = serde_json::to_string(document)?;
        Ok(Self::new(collection, doc_type, source))
    }

    /// Address the document by an explicit id. Without one the store assigns an id.
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Attach the document to a parent document (join child).
    pub fn with_parent(mut self, parent: impl Into<String>) -> Self {
        self.parent = Some(parent.into());
        self
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    pub fn doc_type(&self) -> &str {
        &self.doc_type
    }

    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    pub fn parent(&self) -> Option<&str> {
        self.parent.as_deref()
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// Deterministic size estimate used for the batch byte threshold.
    ///
    /// Sum of the payload, every addressing field, and
    /// [`REQUEST_OVERHEAD_BYTES`].
    pub fn estimated_size(&self) -> usize {
        self.source.len()
            + self.collection.len()
            + self.doc_type.len()
            + self.id.as_ref().map_or(0, String::len)
            + self.parent.as_ref().map_or(0, String::len)
            + REQUEST_OVERHEAD_BYTES
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_estimated_size_counts_all_fields() {
        let op = WriteOperation::new("idx", "doc", "{}");
        assert_eq!(op.estimated_size(), 2 + 3 + 3 + REQUEST_OVERHEAD_BYTES);

        let op = op.with_id("42").with_parent("7");
        assert_eq!(op.estimated_size(), 2 + 3 + 3 + 2 + 1 + REQUEST_OVERHEAD_BYTES);
    }

    #[test]
    fn test_from_value() {
        let op = WriteOperation::from_value("data", "passport", &json!({"name": "Kate"}));

        assert_eq!(op.collection(), "data");
        assert_eq!(op.doc_type(), "passport");
        assert_eq!(op.source(), r#"{"name":"Kate"}"#);
        assert!(op.id().is_none());
        assert!(op.parent().is_none());
    }

    #[test]
    fn test_from_document() {
        #[derive(Serialize)]
        struct Passport {
            name: &'static str,
            number: u32,
        }

        let op = WriteOperation::from_document(
            "data",
            "passport",
            &Passport {
                name: "Lucy",
                number: 1,
            },
        )
        .unwrap()
        .with_id("1");

        assert_eq!(op.id(), Some("1"));
        assert_eq!(op.source(), r#"{"name":"Lucy","number":1}"#);
    }
}
