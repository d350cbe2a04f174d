//! # Bulk Indexer Repository
//!
//! This crate provides the document store abstraction the bulk pipeline
//! writes through. It includes definitions for errors, the `DocumentStore`
//! interface, and a concrete implementation for OpenSearch.

pub mod errors;
pub mod interfaces;
pub mod opensearch;

pub use errors::StoreError;
pub use interfaces::DocumentStore;
pub use opensearch::{queries, OpenSearchStore};
