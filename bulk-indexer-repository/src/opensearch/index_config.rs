//! OpenSearch index settings for parent/child joins.

use serde_json::{json, Value};

/// Field holding the join relation when none is specified.
pub const DEFAULT_RELATION_FIELD: &str = "relation";

/// Settings and mappings for an index holding one parent/child relation.
///
/// Documents declare their side of the relation in `relation_field`:
/// parents as `{"name": parent}`, children as
/// `{"name": child, "parent": "<parent id>"}`. Children must be routed to
/// their parent's shard, which `WriteOperation::with_parent` takes care of.
pub fn join_index_settings(relation_field: &str, parent: &str, child: &str) -> Value {
    json!({
        "settings": {
            "number_of_shards": 1,
            "number_of_replicas": 0
        },
        "mappings": {
            "properties": {
                relation_field: {
                    "type": "join",
                    "relations": {
                        parent: child
                    }
                }
            }
        }
    })
}
