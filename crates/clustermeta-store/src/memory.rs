//! In-memory key/value store
//!
//! Uses a `BTreeMap` under a read/write lock, with:
//! - Key-ordered scans (range-narrowed when the filter has a prefix)
//! - Optimistic per-key compute: the function runs without any lock held,
//!   and the result is installed only if the key's version is unchanged
//! - Operation counters for observing how callers use the store

use crate::filter::KeyFilter;
use crate::key::RawKey;
use crate::store::{ComputeFn, KeyValueStore};
use clustermeta_common::config::StoreConfig;
use clustermeta_common::{Error, Result};
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::ops::Bound;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, warn};

/// Value stored in the map
#[derive(Clone, Debug)]
struct StoredValue {
    /// Actual value bytes
    data: Vec<u8>,
    /// Version assigned when this value was written
    version: u64,
}

/// Operation counters
#[derive(Debug, Default)]
pub struct StoreStats {
    pub gets: AtomicU64,
    pub puts: AtomicU64,
    pub removes: AtomicU64,
    pub computes: AtomicU64,
    pub compute_retries: AtomicU64,
    pub scans: AtomicU64,
}

impl StoreStats {
    /// Point-in-time copy of the counters
    pub fn snapshot(&self) -> StoreStatsSnapshot {
        StoreStatsSnapshot {
            gets: self.gets.load(Ordering::Relaxed),
            puts: self.puts.load(Ordering::Relaxed),
            removes: self.removes.load(Ordering::Relaxed),
            computes: self.computes.load(Ordering::Relaxed),
            compute_retries: self.compute_retries.load(Ordering::Relaxed),
            scans: self.scans.load(Ordering::Relaxed),
        }
    }

    /// Reset all counters
    pub fn reset(&self) {
        self.gets.store(0, Ordering::Relaxed);
        self.puts.store(0, Ordering::Relaxed);
        self.removes.store(0, Ordering::Relaxed);
        self.computes.store(0, Ordering::Relaxed);
        self.compute_retries.store(0, Ordering::Relaxed);
        self.scans.store(0, Ordering::Relaxed);
    }
}

/// Store statistics at a point in time
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct StoreStatsSnapshot {
    /// Point reads
    pub gets: u64,
    /// Unconditional and conditional writes
    pub puts: u64,
    /// Removals
    pub removes: u64,
    /// Compute calls (not attempts)
    pub computes: u64,
    /// Extra compute attempts caused by concurrent writers
    pub compute_retries: u64,
    /// Keyspace scans
    pub scans: u64,
}

/// In-memory store
pub struct MemoryStore {
    /// The actual map
    tree: RwLock<BTreeMap<RawKey, StoredValue>>,
    /// Last assigned version
    version: AtomicU64,
    /// Configuration
    config: StoreConfig,
    /// Operation counters
    stats: StoreStats,
}

impl MemoryStore {
    /// Create an empty store
    pub fn new(config: StoreConfig) -> Self {
        Self {
            tree: RwLock::new(BTreeMap::new()),
            version: AtomicU64::new(0),
            config,
            stats: StoreStats::default(),
        }
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.tree.read().len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Remove every entry
    pub fn clear(&self) {
        self.tree.write().clear();
    }

    /// Get operation counters
    pub const fn stats(&self) -> &StoreStats {
        &self.stats
    }

    fn next_version(&self) -> u64 {
        self.version.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// Read the current value and its version
    fn read_versioned(&self, key: &RawKey) -> Option<StoredValue> {
        self.tree.read().get(key).cloned()
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new(StoreConfig::default())
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &RawKey) -> Result<Option<Vec<u8>>> {
        self.stats.gets.fetch_add(1, Ordering::Relaxed);
        Ok(self.read_versioned(key).map(|v| v.data))
    }

    fn put(&self, key: RawKey, value: Vec<u8>) -> Result<()> {
        self.stats.puts.fetch_add(1, Ordering::Relaxed);
        let version = self.next_version();
        self.tree.write().insert(
            key,
            StoredValue {
                data: value,
                version,
            },
        );
        Ok(())
    }

    fn put_if_absent(&self, key: RawKey, value: Vec<u8>) -> Result<Option<Vec<u8>>> {
        self.stats.puts.fetch_add(1, Ordering::Relaxed);
        let mut tree = self.tree.write();
        if let Some(existing) = tree.get(&key) {
            return Ok(Some(existing.data.clone()));
        }
        let version = self.next_version();
        tree.insert(
            key,
            StoredValue {
                data: value,
                version,
            },
        );
        Ok(None)
    }

    fn remove(&self, key: &RawKey) -> Result<Option<Vec<u8>>> {
        self.stats.removes.fetch_add(1, Ordering::Relaxed);
        Ok(self.tree.write().remove(key).map(|v| v.data))
    }

    fn compute(&self, key: &RawKey, f: &ComputeFn<'_>) -> Result<Vec<u8>> {
        self.stats.computes.fetch_add(1, Ordering::Relaxed);
        let attempts = self.config.max_compute_attempts.max(1);

        for attempt in 1..=attempts {
            // 1. Snapshot the current value
            let current = self.read_versioned(key);
            let expected = current.as_ref().map(|v| v.version);

            // 2. Run the function without holding the lock
            let data = f(current.as_ref().map(|v| v.data.as_slice()))?;

            // 3. Install only if nobody wrote in between
            let mut tree = self.tree.write();
            if tree.get(key).map(|v| v.version) == expected {
                let version = self.next_version();
                tree.insert(
                    key.clone(),
                    StoredValue {
                        data: data.clone(),
                        version,
                    },
                );
                debug!("compute: {:?} installed version {} (attempt {})", key, version, attempt);
                return Ok(data);
            }
            drop(tree);

            self.stats.compute_retries.fetch_add(1, Ordering::Relaxed);
            debug!("compute: {:?} changed concurrently, retrying", key);
        }

        warn!("compute: {:?} gave up after {} attempts", key, attempts);
        Err(Error::Contention {
            key: format!("{key:?}"),
            attempts,
        })
    }

    fn scan(&self, filter: &dyn KeyFilter) -> Result<Vec<(RawKey, Vec<u8>)>> {
        self.stats.scans.fetch_add(1, Ordering::Relaxed);
        let tree = self.tree.read();

        let Some(prefix) = filter.prefix() else {
            return Ok(tree
                .iter()
                .filter(|(k, _)| filter.matches(k))
                .map(|(k, v)| (k.clone(), v.data.clone()))
                .collect());
        };

        let start = Bound::Included(RawKey::from_bytes(prefix.to_vec()));
        let mut end_bytes = prefix.to_vec();

        // Increment last byte to get exclusive end bound
        let end = match end_bytes.last_mut() {
            Some(last) if *last < u8::MAX => {
                *last += 1;
                Bound::Excluded(RawKey::from_bytes(end_bytes))
            }
            _ => Bound::Unbounded,
        };

        Ok(tree
            .range((start, end))
            .filter(|(k, _)| k.starts_with(prefix) && filter.matches(k))
            .map(|(k, v)| (k.clone(), v.data.clone()))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::PrefixFilter;
    use rand::Rng;
    use std::sync::Arc;
    use std::thread;

    fn key(tag: u8, n: u8) -> RawKey {
        RawKey::from_bytes(vec![tag, n])
    }

    fn read_u64(bytes: Option<&[u8]>) -> u64 {
        bytes.map_or(0, |b| u64::from_be_bytes(b.try_into().unwrap()))
    }

    #[test]
    fn test_store_put_get_remove() {
        let store = MemoryStore::default();

        store.put(key(b'c', 1), b"value".to_vec()).unwrap();
        assert_eq!(store.get(&key(b'c', 1)).unwrap(), Some(b"value".to_vec()));
        assert_eq!(store.len(), 1);

        assert_eq!(store.remove(&key(b'c', 1)).unwrap(), Some(b"value".to_vec()));
        assert!(store.get(&key(b'c', 1)).unwrap().is_none());
        assert!(store.is_empty());
    }

    #[test]
    fn test_store_put_if_absent() {
        let store = MemoryStore::default();

        assert_eq!(store.put_if_absent(key(b'i', 1), b"first".to_vec()).unwrap(), None);
        assert_eq!(
            store.put_if_absent(key(b'i', 1), b"second".to_vec()).unwrap(),
            Some(b"first".to_vec())
        );
        assert_eq!(store.get(&key(b'i', 1)).unwrap(), Some(b"first".to_vec()));
    }

    #[test]
    fn test_store_compute() {
        let store = MemoryStore::default();

        let add_one = |current: Option<&[u8]>| -> Result<Vec<u8>> {
            Ok((read_u64(current) + 1).to_be_bytes().to_vec())
        };
        store.compute(&key(b'a', 1), &add_one).unwrap();
        let stored = store.compute(&key(b'a', 1), &add_one).unwrap();

        assert_eq!(read_u64(Some(&stored)), 2);
        assert_eq!(store.stats().snapshot().computes, 2);
    }

    #[test]
    fn test_store_compute_error_does_not_write() {
        let store = MemoryStore::default();

        let result = store.compute(&key(b'a', 1), &|current| match current {
            Some(bytes) => Ok(bytes.to_vec()),
            None => Err(Error::missing_entry("a1")),
        });

        assert_eq!(result, Err(Error::missing_entry("a1")));
        assert!(store.is_empty());
    }

    #[test]
    fn test_store_concurrent_compute() {
        let store = Arc::new(MemoryStore::new(StoreConfig {
            max_compute_attempts: 10_000,
        }));
        store.put(key(b'a', 1), 0u64.to_be_bytes().to_vec()).unwrap();

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let store = Arc::clone(&store);
                thread::spawn(move || {
                    let mut rng = rand::thread_rng();
                    let mut added = 0;
                    for _ in 0..50 {
                        let amount: u64 = rng.gen_range(1..10);
                        store
                            .compute(&key(b'a', 1), &|current| {
                                Ok((read_u64(current) + amount).to_be_bytes().to_vec())
                            })
                            .unwrap();
                        added += amount;
                    }
                    added
                })
            })
            .collect();

        let expected: u64 = handles.into_iter().map(|h| h.join().unwrap()).sum();
        let stored = store.get(&key(b'a', 1)).unwrap();
        assert_eq!(read_u64(stored.as_deref()), expected);
    }

    #[test]
    fn test_store_scan_prefix() {
        let store = MemoryStore::default();
        for n in 0..5 {
            store.put(key(b'c', n), vec![n]).unwrap();
            store.put(key(b'a', n), vec![n]).unwrap();
        }
        store.put(RawKey::from_bytes(vec![b'd']), vec![]).unwrap();

        let creation = store.scan(&PrefixFilter::new(vec![b'c'])).unwrap();
        assert_eq!(creation.len(), 5);
        assert!(creation.iter().all(|(k, _)| k.kind_tag() == Some(b'c')));

        // Results come back in key order
        let values: Vec<u8> = creation.iter().map(|(_, v)| v[0]).collect();
        assert_eq!(values, vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn test_store_scan_predicate() {
        let store = MemoryStore::default();
        for n in 0..4 {
            store.put(key(b'c', n), vec![n]).unwrap();
        }

        let even = store.scan(&|k: &RawKey| k.as_bytes()[1] % 2 == 0).unwrap();
        assert_eq!(even.len(), 2);
        assert_eq!(store.stats().snapshot().scans, 1);
    }

    #[test]
    fn test_store_scan_prefix_at_max_byte() {
        let store = MemoryStore::default();
        store.put(RawKey::from_bytes(vec![u8::MAX, 1]), vec![1]).unwrap();
        store.put(RawKey::from_bytes(vec![1]), vec![2]).unwrap();

        let found = store.scan(&PrefixFilter::new(vec![u8::MAX])).unwrap();
        assert_eq!(found.len(), 1);
    }

    #[test]
    fn test_stats_reset() {
        let store = MemoryStore::default();
        let _ = store.get(&key(b'c', 1)).unwrap();
        assert_eq!(store.stats().snapshot().gets, 1);

        store.stats().reset();
        assert_eq!(store.stats().snapshot(), StoreStatsSnapshot::default());
    }
}
