//! Bulk-load demo: push generated documents through the pipeline and
//! check that the index ends up holding all of them.

use chrono::{DateTime, Utc};
use serde_json::json;
use std::time::{Duration, Instant};
use tracing::{info, instrument, warn};

use crate::config::Dependencies;
use crate::IndexerError;
use bulk_indexer_repository::DocumentStore;
use bulk_indexer_shared::WriteOperation;

/// Summary of a bulk-load run.
#[derive(Debug, Clone, PartialEq)]
pub struct BulkLoadReport {
    pub submitted: u64,
    pub acknowledged: u64,
    pub failed: u64,
    /// Documents the index gained during the run.
    pub indexed: u64,
    pub elapsed: Duration,
}

impl BulkLoadReport {
    pub fn documents_per_second(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs == 0.0 {
            return self.acknowledged as f64;
        }
        self.acknowledged as f64 / secs
    }
}

/// Build the `n`th generated document.
pub fn generated_document(
    collection: &str,
    doc_type: &str,
    n: usize,
    timestamp: DateTime<Utc>,
) -> WriteOperation {
    WriteOperation::from_value(
        collection,
        doc_type,
        &json!({
            "title": format!("This is my title {}", n),
            "timestamp": timestamp.to_rfc3339(),
            "content": format!("This is my content {}", n),
        }),
    )
}

/// Index `document_count` generated documents and verify the index count.
///
/// Shuts the pipeline down once every document is acknowledged.
#[instrument(skip(deps), fields(index = %deps.config.index, documents = deps.config.document_count))]
pub async fn run_bulk_load(deps: &Dependencies) -> Result<BulkLoadReport, IndexerError> {
    let Dependencies {
        config,
        store,
        pipeline,
    } = deps;

    store.ensure_index(&config.index, &json!({})).await?;
    store.refresh(&config.index).await?;
    let baseline = store.count(&config.index, None).await?;

    let started = Instant::now();
    for n in 0..config.document_count {
        let op = generated_document(&config.index, &config.doc_type, n, Utc::now());
        pipeline.submit(op).await?;
    }
    info!(submitted = pipeline.submitted_count(), "All documents submitted");

    pipeline.wait_for_completion_timeout(config.wait_timeout()).await?;
    let elapsed = started.elapsed();

    pipeline.shutdown().await;

    store.refresh(&config.index).await?;
    let indexed = store.count(&config.index, None).await?.saturating_sub(baseline);

    let progress = pipeline.progress();
    let report = BulkLoadReport {
        submitted: progress.submitted,
        acknowledged: progress.acknowledged,
        failed: progress.failed,
        indexed,
        elapsed,
    };

    info!(
        acknowledged = report.acknowledged,
        failed = report.failed,
        indexed = report.indexed,
        elapsed = ?report.elapsed,
        documents_per_second = report.documents_per_second(),
        "Bulk load finished"
    );

    let expected = report.acknowledged.saturating_sub(report.failed);
    if report.indexed != expected {
        warn!(expected, indexed = report.indexed, "Index count does not match");
        return Err(IndexerError::verification(format!(
            "expected {} documents in {}, found {}",
            expected, config.index, report.indexed
        )));
    }

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::Value;

    #[test]
    fn test_generated_document() {
        let timestamp = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        let op = generated_document("testindex", "testdocument", 7, timestamp);

        assert_eq!(op.collection(), "testindex");
        assert_eq!(op.doc_type(), "testdocument");
        assert!(op.id().is_none());

        let source: Value = serde_json::from_str(op.source()).unwrap();
        assert_eq!(source["title"], "This is my title 7");
        assert_eq!(source["content"], "This is my content 7");
        assert_eq!(source["timestamp"], "2024-05-01T12:00:00+00:00");
    }

    #[test]
    fn test_documents_per_second() {
        let report = BulkLoadReport {
            submitted: 500,
            acknowledged: 500,
            failed: 0,
            indexed: 500,
            elapsed: Duration::from_secs(2),
        };
        assert_eq!(report.documents_per_second(), 250.0);
    }
}
