//! OpenSearch query clause builders.
//!
//! Every builder returns a bare query clause, ready to be passed to
//! `DocumentStore::search` or `DocumentStore::count`, which wrap it in the
//! request body.

use serde_json::{json, Value};

/// Match every document.
pub fn match_all() -> Value {
    json!({ "match_all": {} })
}

/// Lucene-syntax query string, e.g. `nationality:french`.
pub fn query_string(query: &str) -> Value {
    json!({
        "query_string": {
            "query": query
        }
    })
}

/// Exact match on a keyword field.
pub fn term(field: &str, value: impl Into<Value>) -> Value {
    json!({
        "term": {
            field: value.into()
        }
    })
}

/// Match child documents whose parent matches `query`.
///
/// The join is evaluated in memory by the store, so it only suits small
/// parent sets such as reference data.
pub fn has_parent(parent_type: &str, query: Value) -> Value {
    json!({
        "has_parent": {
            "parent_type": parent_type,
            "query": query
        }
    })
}

/// Match parent documents that have at least one child matching `query`.
pub fn has_child(child_type: &str, query: Value) -> Value {
    json!({
        "has_child": {
            "type": child_type,
            "query": query
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_has_parent_query() {
        let query = has_parent("passport", query_string("nationality:french"));

        assert_eq!(query["has_parent"]["parent_type"], "passport");
        assert_eq!(
            query["has_parent"]["query"]["query_string"]["query"],
            "nationality:french"
        );
    }

    #[test]
    fn test_has_child_query() {
        let query = has_child("immigration", term("airport", "LHR"));

        assert_eq!(query["has_child"]["type"], "immigration");
        assert_eq!(query["has_child"]["query"]["term"]["airport"], "LHR");
    }

    #[test]
    fn test_match_all() {
        assert!(match_all()["match_all"].is_object());
    }
}
