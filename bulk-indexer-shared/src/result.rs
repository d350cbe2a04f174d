//! Per-operation outcomes reported by the document store.

use serde::{Deserialize, Serialize};

/// Outcome of a single operation inside a bulk request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationOutcome {
    pub success: bool,
    pub reason: Option<String>,
}

impl OperationOutcome {
    pub fn succeeded() -> Self {
        Self {
            success: true,
            reason: None,
        }
    }

    pub fn failed(reason: impl Into<String>) -> Self {
        Self {
            success: false,
            reason: Some(reason.into()),
        }
    }
}

/// Result of executing a bulk request.
///
/// `outcomes` is ordered like the operations that were sent, so position `i`
/// describes operation `i`. A store can accept a request and still reject
/// individual operations inside it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchResult {
    pub outcomes: Vec<OperationOutcome>,
}

impl BatchResult {
    pub fn new(outcomes: Vec<OperationOutcome>) -> Self {
        Self { outcomes }
    }

    /// A result where all `count` operations succeeded.
    pub fn all_succeeded(count: usize) -> Self {
        Self {
            outcomes: vec![OperationOutcome::succeeded(); count],
        }
    }

    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }

    pub fn has_failures(&self) -> bool {
        self.outcomes.iter().any(|o| !o.success)
    }

    pub fn failure_count(&self) -> usize {
        self.outcomes.iter().filter(|o| !o.success).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failure_count() {
        let result = BatchResult::new(vec![
            OperationOutcome::succeeded(),
            OperationOutcome::failed("mapper_parsing_exception"),
            OperationOutcome::succeeded(),
        ]);

        assert_eq!(result.len(), 3);
        assert!(result.has_failures());
        assert_eq!(result.failure_count(), 1);
    }

    #[test]
    fn test_all_succeeded() {
        let result = BatchResult::all_succeeded(4);
        assert_eq!(result.len(), 4);
        assert!(!result.has_failures());
    }
}
