//! Storage abstraction for xlink.
//!
//! Provides a [`KvStore`](traits::KvStore) trait with memory and SQLite
//! backends, scoped cursors, and the [`ChainLinkStore`](link_store::ChainLinkStore)
//! that maintains chain links together with their indexes.

pub mod error;
pub mod link_store;
pub mod memory;
pub mod sqlite;
pub mod traits;
