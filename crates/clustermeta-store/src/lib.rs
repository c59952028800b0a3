//! clustermeta Store - key/value store contract
//!
//! The replicated store that owns authoritative metadata is an external
//! collaborator. This crate defines what the metadata layer needs from it:
//! - Point reads and writes over raw byte keys
//! - An atomic per-key compute (read, apply, write)
//! - Keyspace scans narrowed by a predicate over raw keys
//!
//! [`MemoryStore`] implements the contract in memory. It backs the tests
//! and single-node deployments.

pub mod filter;
pub mod key;
pub mod memory;
pub mod store;

// Re-exports
pub use filter::{KeyFilter, PrefixFilter};
pub use key::RawKey;
pub use memory::{MemoryStore, StoreStats, StoreStatsSnapshot};
pub use store::{ComputeFn, KeyValueStore};
