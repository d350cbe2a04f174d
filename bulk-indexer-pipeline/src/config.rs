//! Pipeline configuration.

use std::time::Duration;
use tokio::sync::Semaphore;

use crate::errors::PipelineError;

/// Retry behaviour for batches whose bulk request fails as a whole.
///
/// Only transient store errors are retried. Operations rejected inside an
/// accepted bulk response are never retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Maximum number of retry attempts after the first one.
    pub max_retries: u32,
    /// Delay before the first retry in milliseconds.
    pub initial_delay_ms: u64,
    /// Upper bound for the exponential backoff in milliseconds.
    pub max_delay_ms: u64,
}

impl RetryPolicy {
    /// Never retry: a failed request fails the whole batch.
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            initial_delay_ms: 0,
            max_delay_ms: 0,
        }
    }

    /// Retry up to `max_retries` times, doubling the delay each time.
    pub fn exponential(max_retries: u32, initial_delay_ms: u64, max_delay_ms: u64) -> Self {
        Self {
            max_retries,
            initial_delay_ms,
            max_delay_ms: max_delay_ms.max(initial_delay_ms),
        }
    }

    /// Delay before retry number `retry` (starting at 1).
    pub fn delay_for(&self, retry: u32) -> Duration {
        let factor = 1u64.checked_shl(retry.saturating_sub(1)).unwrap_or(u64::MAX);
        let delay_ms = self
            .initial_delay_ms
            .saturating_mul(factor)
            .min(self.max_delay_ms);
        Duration::from_millis(delay_ms)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::none()
    }
}

/// Configuration fixed when the pipeline starts.
///
/// Every threshold is required and must be positive; [`PipelineConfig::new`]
/// is the only way to build one, so a pipeline can never hold an invalid
/// configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineConfig {
    max_operations_per_batch: usize,
    max_concurrent_requests: usize,
    flush_interval_secs: u64,
    max_batch_bytes: usize,
    retry_policy: RetryPolicy,
}

impl PipelineConfig {
    /// Validate and build a configuration.
    ///
    /// # Arguments
    ///
    /// * `max_operations_per_batch` - Operations that trigger a flush
    /// * `max_concurrent_requests` - Bulk requests allowed in flight at once
    /// * `flush_interval_secs` - Period of the time-based flush
    /// * `max_batch_bytes` - Estimated batch size that triggers a flush
    ///
    /// # Returns
    ///
    /// * `Err(PipelineError::InvalidConfig)` - If any value is zero or out of range
    pub fn new(
        max_operations_per_batch: usize,
        max_concurrent_requests: usize,
        flush_interval_secs: u64,
        max_batch_bytes: usize,
    ) -> Result<Self, PipelineError> {
        if max_operations_per_batch == 0 {
            return Err(PipelineError::invalid_config(
                "max_operations_per_batch",
                "must be greater than zero",
            ));
        }
        if max_concurrent_requests == 0 {
            return Err(PipelineError::invalid_config(
                "max_concurrent_requests",
                "must be greater than zero",
            ));
        }
        if max_concurrent_requests > Semaphore::MAX_PERMITS {
            return Err(PipelineError::invalid_config(
                "max_concurrent_requests",
                format!("must not exceed {}", Semaphore::MAX_PERMITS),
            ));
        }
        if flush_interval_secs == 0 {
            return Err(PipelineError::invalid_config(
                "flush_interval_secs",
                "must be greater than zero",
            ));
        }
        if max_batch_bytes == 0 {
            return Err(PipelineError::invalid_config(
                "max_batch_bytes",
                "must be greater than zero",
            ));
        }

        Ok(Self {
            max_operations_per_batch,
            max_concurrent_requests,
            flush_interval_secs,
            max_batch_bytes,
            retry_policy: RetryPolicy::none(),
        })
    }

    /// Set the retry policy for failed bulk requests.
    pub fn with_retry_policy(mut self, retry_policy: RetryPolicy) -> Self {
        self.retry_policy = retry_policy;
        self
    }

    pub fn max_operations_per_batch(&self) -> usize {
        self.max_operations_per_batch
    }

    pub fn max_concurrent_requests(&self) -> usize {
        self.max_concurrent_requests
    }

    pub fn flush_interval_secs(&self) -> u64 {
        self.flush_interval_secs
    }

    pub fn flush_interval(&self) -> Duration {
        Duration::from_secs(self.flush_interval_secs)
    }

    pub fn max_batch_bytes(&self) -> usize {
        self.max_batch_bytes
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        self.retry_policy
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_config() {
        let config = PipelineConfig::new(10_000, 2, 10, 32 * 1024 * 1024).unwrap();

        assert_eq!(config.max_operations_per_batch(), 10_000);
        assert_eq!(config.max_concurrent_requests(), 2);
        assert_eq!(config.flush_interval(), Duration::from_secs(10));
        assert_eq!(config.max_batch_bytes(), 32 * 1024 * 1024);
        assert_eq!(config.retry_policy(), RetryPolicy::none());
    }

    #[test]
    fn test_zero_values_rejected() {
        let cases = [
            (PipelineConfig::new(0, 2, 10, 1024), "max_operations_per_batch"),
            (PipelineConfig::new(10, 0, 10, 1024), "max_concurrent_requests"),
            (PipelineConfig::new(10, 2, 0, 1024), "flush_interval_secs"),
            (PipelineConfig::new(10, 2, 10, 0), "max_batch_bytes"),
        ];

        for (result, expected_field) in cases {
            match result {
                Err(PipelineError::InvalidConfig { field, .. }) => {
                    assert_eq!(field, expected_field)
                }
                other => panic!("expected invalid config, got {:?}", other),
            }
        }
    }

    #[test]
    fn test_concurrency_above_semaphore_limit_rejected() {
        let result = PipelineConfig::new(10, Semaphore::MAX_PERMITS + 1, 10, 1024);
        assert!(matches!(
            result,
            Err(PipelineError::InvalidConfig {
                field: "max_concurrent_requests",
                ..
            })
        ));
    }

    #[test]
    fn test_retry_delay_backoff() {
        let policy = RetryPolicy::exponential(5, 100, 500);

        assert_eq!(policy.delay_for(1), Duration::from_millis(100));
        assert_eq!(policy.delay_for(2), Duration::from_millis(200));
        assert_eq!(policy.delay_for(3), Duration::from_millis(400));
        assert_eq!(policy.delay_for(4), Duration::from_millis(500));
        assert_eq!(policy.delay_for(64), Duration::from_millis(500));
    }
}
