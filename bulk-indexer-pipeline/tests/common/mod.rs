#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use bulk_indexer_pipeline::{BatchObserver, BatchOutcome};
use bulk_indexer_repository::{DocumentStore, StoreError};
use bulk_indexer_shared::{BatchResult, OperationOutcome, SearchHits, WriteOperation};
use serde_json::{json, Value};
use tokio::sync::Semaphore;

/// How the fake store answers each bulk request.
#[derive(Debug, Clone)]
pub enum Behavior {
    Succeed,
    /// Reject the operations at these positions of every batch.
    RejectPositions(Vec<usize>),
    /// Fail the whole request.
    Fail(StoreError),
    Panic,
}

/// In-process store recording every bulk request it receives.
pub struct RecordingStore {
    behavior: Behavior,
    gate: Option<Semaphore>,
    batches: Mutex<Vec<Vec<WriteOperation>>>,
    started: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl RecordingStore {
    pub fn new(behavior: Behavior) -> Self {
        Self {
            behavior,
            gate: None,
            batches: Mutex::new(Vec::new()),
            started: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        }
    }

    pub fn succeeding() -> Self {
        Self::new(Behavior::Succeed)
    }

    /// A store where every request blocks until [`release`](Self::release) is called.
    pub fn gated() -> Self {
        Self {
            gate: Some(Semaphore::new(0)),
            ..Self::succeeding()
        }
    }

    /// Let `count` blocked requests complete.
    pub fn release(&self, count: usize) {
        if let Some(gate) = &self.gate {
            gate.add_permits(count);
        }
    }

    pub fn batches(&self) -> Vec<Vec<WriteOperation>> {
        self.batches.lock().unwrap().clone()
    }

    pub fn batch_count(&self) -> usize {
        self.batches.lock().unwrap().len()
    }

    pub fn operation_count(&self) -> usize {
        self.batches.lock().unwrap().iter().map(Vec::len).sum()
    }

    pub fn started(&self) -> usize {
        self.started.load(Ordering::SeqCst)
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DocumentStore for RecordingStore {
    async fn execute(&self, operations: &[WriteOperation]) -> Result<BatchResult, StoreError> {
        self.started.fetch_add(1, Ordering::SeqCst);
        self.batches.lock().unwrap().push(operations.to_vec());

        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(current, Ordering::SeqCst);

        if let Some(gate) = &self.gate {
            if let Ok(permit) = gate.acquire().await {
                permit.forget();
            }
        }

        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        match &self.behavior {
            Behavior::Succeed => Ok(BatchResult::all_succeeded(operations.len())),
            Behavior::RejectPositions(positions) => Ok(BatchResult::new(
                (0..operations.len())
                    .map(|i| {
                        if positions.contains(&i) {
                            OperationOutcome::failed(format!("rejected operation {}", i))
                        } else {
                            OperationOutcome::succeeded()
                        }
                    })
                    .collect(),
            )),
            Behavior::Fail(error) => Err(error.clone()),
            Behavior::Panic => panic!("store exploded"),
        }
    }

    async fn count(&self, _collection: &str, _filter: Option<&Value>) -> Result<u64, StoreError> {
        Ok(self.operation_count() as u64)
    }

    async fn search(&self, _collection: &str, _query: &Value) -> Result<SearchHits, StoreError> {
        Ok(SearchHits::empty())
    }
}

/// Observer keeping every event it sees.
#[derive(Default)]
pub struct RecordingObserver {
    started: Mutex<Vec<(u64, usize)>>,
    outcomes: Mutex<Vec<BatchOutcome>>,
}

impl RecordingObserver {
    pub fn started(&self) -> Vec<(u64, usize)> {
        self.started.lock().unwrap().clone()
    }

    pub fn outcomes(&self) -> Vec<BatchOutcome> {
        self.outcomes.lock().unwrap().clone()
    }
}

impl BatchObserver for RecordingObserver {
    fn on_batch_started(&self, batch_id: u64, operation_count: usize) {
        self.started.lock().unwrap().push((batch_id, operation_count));
    }

    fn on_batch_completed(&self, outcome: &BatchOutcome) {
        self.outcomes.lock().unwrap().push(outcome.clone());
    }
}

pub fn document(n: usize) -> WriteOperation {
    WriteOperation::from_value(
        "testindex",
        "testdocument",
        &json!({
            "title": format!("This is my title {}", n),
            "content": format!("This is my content {}", n),
        }),
    )
    .with_id(n.to_string())
}

/// Poll `condition` until it holds, failing the test after a few seconds.
pub async fn eventually(condition: impl Fn() -> bool) {
    for _ in 0..500 {
        if condition() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("condition not met in time");
}

pub fn as_store(store: &Arc<RecordingStore>) -> Arc<dyn DocumentStore> {
    store.clone()
}
