//! OpenSearch implementation of the document store.
//!
//! This module provides a concrete implementation of `DocumentStore`
//! using OpenSearch as the backend.

mod client;
mod index_config;
pub mod queries;

pub use client::OpenSearchStore;
pub use index_config::{join_index_settings, DEFAULT_RELATION_FIELD};
