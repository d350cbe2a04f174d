//! # Bulk Indexer Shared
//!
//! Plain data types shared by the repository, pipeline and binary crates.

mod operation;
mod result;
mod search;

pub use operation::{WriteOperation, REQUEST_OVERHEAD_BYTES};
pub use result::{BatchResult, OperationOutcome};
pub use search::{SearchHit, SearchHits};
