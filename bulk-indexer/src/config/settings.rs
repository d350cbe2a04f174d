//! Environment-driven indexer settings.

use std::env;
use std::fmt::Display;
use std::str::FromStr;
use std::time::Duration;

use crate::IndexerError;
use bulk_indexer_pipeline::{PipelineConfig, RetryPolicy};

/// Default OpenSearch URL.
const DEFAULT_OPENSEARCH_URL: &str = "http://localhost:9200";

/// Default target index.
const DEFAULT_INDEX: &str = "testindex";

/// Default document type label.
const DEFAULT_DOC_TYPE: &str = "testdocument";

const DEFAULT_BATCH_SIZE: usize = 10_000;
const DEFAULT_CONCURRENT_REQUESTS: usize = 2;
const DEFAULT_FLUSH_INTERVAL_SECS: u64 = 10;
const DEFAULT_BUFFER_MB: usize = 32;
const DEFAULT_DOCUMENT_COUNT: usize = 50_000;
const DEFAULT_MAX_RETRIES: u32 = 0;
const DEFAULT_WAIT_TIMEOUT_SECS: u64 = 600;

/// Backoff bounds used when `BULK_MAX_RETRIES` enables retries.
const RETRY_INITIAL_DELAY_MS: u64 = 100;
const RETRY_MAX_DELAY_MS: u64 = 10_000;

const BYTES_PER_MB: usize = 1024 * 1024;

/// Settings for a bulk indexer run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexerConfig {
    pub opensearch_url: String,
    pub index: String,
    pub doc_type: String,
    pub batch_size: usize,
    pub concurrent_requests: usize,
    pub flush_interval_secs: u64,
    pub buffer_mb: usize,
    /// Documents generated by the bulk-load demo.
    pub document_count: usize,
    pub max_retries: u32,
    pub wait_timeout_secs: u64,
}

impl IndexerConfig {
    /// Read the configuration from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `OPENSEARCH_URL`: OpenSearch server URL (default: http://localhost:9200)
    /// - `BULK_INDEX`: Target index (default: testindex)
    /// - `BULK_DOC_TYPE`: Document type label (default: testdocument)
    /// - `BULK_BATCH_SIZE`: Operations per batch (default: 10000)
    /// - `BULK_CONCURRENT_REQUESTS`: Bulk requests in flight (default: 2)
    /// - `BULK_FLUSH_INTERVAL_SECS`: Time-based flush period (default: 10)
    /// - `BULK_BUFFER_MB`: Batch size in megabytes that triggers a flush (default: 32)
    /// - `BULK_DOCUMENT_COUNT`: Documents generated by the bulk-load demo (default: 50000)
    /// - `BULK_MAX_RETRIES`: Retries for transient bulk failures (default: 0)
    /// - `BULK_WAIT_TIMEOUT_SECS`: Upper bound on waiting for acknowledgment (default: 600)
    ///
    /// # Returns
    ///
    /// * `Err(IndexerError::ConfigError)` - If a numeric variable does not parse
    pub fn from_env() -> Result<Self, IndexerError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build the configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, IndexerError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let string_var = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        Ok(Self {
            opensearch_url: string_var("OPENSEARCH_URL", DEFAULT_OPENSEARCH_URL),
            index: string_var("BULK_INDEX", DEFAULT_INDEX),
            doc_type: string_var("BULK_DOC_TYPE", DEFAULT_DOC_TYPE),
            batch_size: parse_var(&lookup, "BULK_BATCH_SIZE", DEFAULT_BATCH_SIZE)?,
            concurrent_requests: parse_var(
                &lookup,
                "BULK_CONCURRENT_REQUESTS",
                DEFAULT_CONCURRENT_REQUESTS,
            )?,
            flush_interval_secs: parse_var(
                &lookup,
                "BULK_FLUSH_INTERVAL_SECS",
                DEFAULT_FLUSH_INTERVAL_SECS,
            )?,
            buffer_mb: parse_var(&lookup, "BULK_BUFFER_MB", DEFAULT_BUFFER_MB)?,
            document_count: parse_var(&lookup, "BULK_DOCUMENT_COUNT", DEFAULT_DOCUMENT_COUNT)?,
            max_retries: parse_var(&lookup, "BULK_MAX_RETRIES", DEFAULT_MAX_RETRIES)?,
            wait_timeout_secs: parse_var(
                &lookup,
                "BULK_WAIT_TIMEOUT_SECS",
                DEFAULT_WAIT_TIMEOUT_SECS,
            )?,
        })
    }

    /// The pipeline configuration these settings describe.
    pub fn pipeline_config(&self) -> Result<PipelineConfig, IndexerError> {
        let max_batch_bytes = self
            .buffer_mb
            .checked_mul(BYTES_PER_MB)
            .ok_or_else(|| IndexerError::config("BULK_BUFFER_MB is too large"))?;

        let config = PipelineConfig::new(
            self.batch_size,
            self.concurrent_requests,
            self.flush_interval_secs,
            max_batch_bytes,
        )?;

        Ok(config.with_retry_policy(self.retry_policy()))
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        if self.max_retries == 0 {
            RetryPolicy::none()
        } else {
            RetryPolicy::exponential(self.max_retries, RETRY_INITIAL_DELAY_MS, RETRY_MAX_DELAY_MS)
        }
    }

    pub fn wait_timeout(&self) -> Duration {
        Duration::from_secs(self.wait_timeout_secs)
    }
}

fn parse_var<F, T>(lookup: &F, key: &str, default: T) -> Result<T, IndexerError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: Display,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e| IndexerError::config(format!("Invalid {} '{}': {}", key, raw, e))),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bulk_indexer_pipeline::PipelineError;
    use std::collections::HashMap;

    fn config_from(vars: &[(&str, &str)]) -> Result<IndexerConfig, IndexerError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        IndexerConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config_from(&[]).unwrap();

        assert_eq!(config.opensearch_url, "http://localhost:9200");
        assert_eq!(config.index, "testindex");
        assert_eq!(config.doc_type, "testdocument");
        assert_eq!(config.batch_size, 10_000);
        assert_eq!(config.concurrent_requests, 2);
        assert_eq!(config.flush_interval_secs, 10);
        assert_eq!(config.buffer_mb, 32);
        assert_eq!(config.document_count, 50_000);
        assert_eq!(config.retry_policy(), RetryPolicy::none());
        assert_eq!(config.wait_timeout(), Duration::from_secs(600));

        let pipeline = config.pipeline_config().unwrap();
        assert_eq!(pipeline.max_batch_bytes(), 32 * 1024 * 1024);
    }

    #[test]
    fn test_overrides() {
        let config = config_from(&[
            ("OPENSEARCH_URL", "http://search:9200"),
            ("BULK_BATCH_SIZE", "500"),
            ("BULK_CONCURRENT_REQUESTS", " 4 "),
            ("BULK_MAX_RETRIES", "3"),
        ])
        .unwrap();

        assert_eq!(config.opensearch_url, "http://search:9200");
        assert_eq!(config.batch_size, 500);
        assert_eq!(config.concurrent_requests, 4);
        assert_eq!(config.retry_policy().max_retries, 3);
    }

    #[test]
    fn test_invalid_number() {
        let err = config_from(&[("BULK_BATCH_SIZE", "lots")]).unwrap_err();
        assert!(matches!(err, IndexerError::ConfigError(_)));
        assert!(err.to_string().contains("BULK_BATCH_SIZE"));
    }

    #[test]
    fn test_zero_batch_size_rejected_by_pipeline() {
        let config = config_from(&[("BULK_BATCH_SIZE", "0")]).unwrap();
        let err = config.pipeline_config().unwrap_err();
        assert!(matches!(
            err,
            IndexerError::Pipeline(PipelineError::InvalidConfig {
                field: "max_operations_per_batch",
                ..
            })
        ));
    }
}
