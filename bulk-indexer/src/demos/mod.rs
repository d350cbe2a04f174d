//! Runnable end-to-end demos against a live OpenSearch cluster.

pub mod bulk_load;
pub mod parent_child;

pub use bulk_load::{run_bulk_load, BulkLoadReport};
pub use parent_child::{run_parent_child, ParentChildReport};
