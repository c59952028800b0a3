//! Store contract consumed by the metadata layer

use crate::filter::KeyFilter;
use crate::key::RawKey;
use clustermeta_common::Result;

/// Function handed to [`KeyValueStore::compute`].
///
/// Receives the current value (if any) and returns the value to store. It
/// may be invoked more than once when concurrent writers race, so it must
/// depend on nothing but its argument and what it captured by value.
pub type ComputeFn<'a> = dyn Fn(Option<&[u8]>) -> Result<Vec<u8>> + 'a;

/// Replicated key/value store with atomic single-key read-modify-write.
///
/// Replication, partitioning and failure detection are the store's
/// business. The metadata layer relies on one guarantee only: per key,
/// `compute` is atomic with respect to every other writer.
pub trait KeyValueStore: Send + Sync {
    /// Read the value stored under `key`
    fn get(&self, key: &RawKey) -> Result<Option<Vec<u8>>>;

    /// Write `value` under `key`, replacing any previous value
    fn put(&self, key: RawKey, value: Vec<u8>) -> Result<()>;

    /// Write `value` only if `key` is vacant.
    ///
    /// Returns the existing value when the key was already taken.
    fn put_if_absent(&self, key: RawKey, value: Vec<u8>) -> Result<Option<Vec<u8>>>;

    /// Remove `key`, returning the previous value
    fn remove(&self, key: &RawKey) -> Result<Option<Vec<u8>>>;

    /// Atomically replace the value under `key` with `f(current)`.
    ///
    /// An error from `f` aborts the operation without writing and is
    /// returned to the caller. Returns the stored value on success.
    fn compute(&self, key: &RawKey, f: &ComputeFn<'_>) -> Result<Vec<u8>>;

    /// All entries whose key matches `filter`, in key order
    fn scan(&self, filter: &dyn KeyFilter) -> Result<Vec<(RawKey, Vec<u8>)>>;
}
