//! # Bulk Indexer Pipeline
//!
//! This crate provides an asynchronous bulk ingestion pipeline that groups
//! individual document writes into bulk requests for a document store.
//!
//! ## Architecture
//!
//! 1. **Accumulator**: Buffers submitted operations into the open batch
//! 2. **Flush Scheduler**: Flushes the open batch every interval
//! 3. **Dispatcher**: Sends batches with bounded concurrency
//! 4. **Completion Tracker**: Counts submitted and acknowledged operations
//!
//! Producers only see [`BulkPipeline`]; outcomes are reported through
//! [`BatchObserver`]s.

pub mod accumulator;
pub mod batch;
pub mod config;
pub mod dispatcher;
pub mod errors;
pub mod observer;
pub mod pipeline;
pub mod scheduler;
pub mod tracker;

pub use batch::{Batch, FlushTrigger};
pub use config::{PipelineConfig, RetryPolicy};
pub use errors::PipelineError;
pub use observer::{BatchObserver, BatchOutcome, BatchStatus, LoggingObserver, OperationFailure};
pub use pipeline::BulkPipeline;
pub use tracker::{CompletionTracker, Progress};
