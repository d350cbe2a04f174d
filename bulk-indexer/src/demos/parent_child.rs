//! Parent/child join demo.
//!
//! Passport records are parents, immigration records are children routed
//! to their passport. Immigration records are then counted by the
//! nationality on their parent passport. The index is recreated on every run.

use chrono::Utc;
use serde_json::json;
use tracing::{info, instrument};

use crate::config::Dependencies;
use crate::IndexerError;
use bulk_indexer_repository::opensearch::{join_index_settings, DEFAULT_RELATION_FIELD};
use bulk_indexer_repository::{queries, DocumentStore};
use bulk_indexer_shared::WriteOperation;

/// Index holding both sides of the relation.
pub const JOIN_INDEX: &str = "data";

pub const PARENT_TYPE: &str = "passport";
pub const CHILD_TYPE: &str = "immigration";

const PEOPLE: [&str; 5] = ["Kate", "Lucy", "Bob", "Jim", "James"];

/// Kate is the only french passport holder and everyone travelled once.
const EXPECTED: ParentChildReport = ParentChildReport {
    french: 1,
    english: 4,
    passports_through_lhr: 5,
};

/// Immigration record counts per parent nationality.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParentChildReport {
    pub french: u64,
    pub english: u64,
    /// Passports with at least one immigration record at LHR.
    pub passports_through_lhr: u64,
}

fn nationality(person: &str) -> &'static str {
    if person == "Kate" {
        "french"
    } else {
        "english"
    }
}

/// Passport parents, addressed by passport number.
pub fn passport_records() -> Vec<WriteOperation> {
    PEOPLE
        .iter()
        .enumerate()
        .map(|(number, person)| {
            WriteOperation::from_value(
                JOIN_INDEX,
                PARENT_TYPE,
                &json!({
                    "name": person,
                    "passportnumber": number,
                    "nationality": nationality(person),
                    DEFAULT_RELATION_FIELD: { "name": PARENT_TYPE },
                }),
            )
            .with_id(number.to_string())
        })
        .collect()
}

/// One immigration child per passport, joined by passport number.
pub fn immigration_records() -> Vec<WriteOperation> {
    let timestamp = Utc::now().to_rfc3339();
    (0..PEOPLE.len())
        .map(|id| {
            WriteOperation::from_value(
                JOIN_INDEX,
                CHILD_TYPE,
                &json!({
                    "id": id,
                    "timestamp": timestamp,
                    "airport": "LHR",
                    DEFAULT_RELATION_FIELD: { "name": CHILD_TYPE, "parent": id.to_string() },
                }),
            )
            .with_parent(id.to_string())
        })
        .collect()
}

/// Index the passport and immigration records and run the join queries.
#[instrument(skip(deps))]
pub async fn run_parent_child(deps: &Dependencies) -> Result<ParentChildReport, IndexerError> {
    let Dependencies {
        store, pipeline, ..
    } = deps;

    store.delete_index(JOIN_INDEX).await?;
    store
        .ensure_index(
            JOIN_INDEX,
            &join_index_settings(DEFAULT_RELATION_FIELD, PARENT_TYPE, CHILD_TYPE),
        )
        .await?;

    pipeline.submit_all(passport_records()).await?;
    pipeline.submit_all(immigration_records()).await?;
    pipeline.shutdown().await;

    if pipeline.failed_count() > 0 {
        return Err(IndexerError::verification(format!(
            "{} of {} records failed to index",
            pipeline.failed_count(),
            pipeline.submitted_count()
        )));
    }

    store.refresh(JOIN_INDEX).await?;

    let french = store
        .search(
            JOIN_INDEX,
            &queries::has_parent(PARENT_TYPE, queries::query_string("nationality:french")),
        )
        .await?
        .total;
    info!(french, "Immigration records with a french passport");

    let english = store
        .count(
            JOIN_INDEX,
            Some(&queries::has_parent(
                PARENT_TYPE,
                queries::query_string("nationality:english"),
            )),
        )
        .await?;
    info!(english, "Immigration records with an english passport");

    let passports_through_lhr = store
        .count(
            JOIN_INDEX,
            Some(&queries::has_child(CHILD_TYPE, queries::query_string("airport:LHR"))),
        )
        .await?;

    let report = ParentChildReport {
        french,
        english,
        passports_through_lhr,
    };

    if report != EXPECTED {
        return Err(IndexerError::verification(format!(
            "expected {:?}, found {:?}",
            EXPECTED, report
        )));
    }

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    fn source(op: &WriteOperation) -> Value {
        serde_json::from_str(op.source()).unwrap()
    }

    #[test]
    fn test_passport_records() {
        let passports = passport_records();
        assert_eq!(passports.len(), 5);

        let ids: Vec<_> = passports.iter().map(|op| op.id().unwrap()).collect();
        assert_eq!(ids, vec!["0", "1", "2", "3", "4"]);

        let french: Vec<_> = passports
            .iter()
            .map(source)
            .filter(|doc| doc["nationality"] == "french")
            .collect();
        assert_eq!(french.len(), 1);
        assert_eq!(french[0]["name"], "Kate");
        assert_eq!(french[0]["relation"]["name"], "passport");
    }

    #[test]
    fn test_immigration_records_are_routed_to_parent() {
        for (id, op) in immigration_records().iter().enumerate() {
            assert_eq!(op.parent(), Some(id.to_string().as_str()));
            assert!(op.id().is_none());

            let doc = source(op);
            assert_eq!(doc["airport"], "LHR");
            assert_eq!(doc["relation"]["name"], "immigration");
            assert_eq!(doc["relation"]["parent"], id.to_string());
        }
    }
}
