//! Predicates over raw keys for keyspace scans

use crate::key::RawKey;

/// Selects keys during a scan without looking at values.
///
/// A filter that only ever matches keys sharing a common prefix can report
/// it through [`KeyFilter::prefix`]; stores then narrow the scan to that
/// key range instead of visiting every key.
pub trait KeyFilter: Send + Sync {
    /// Whether `key` belongs to the selection
    fn matches(&self, key: &RawKey) -> bool;

    /// Prefix shared by every matching key, if any
    fn prefix(&self) -> Option<&[u8]> {
        None
    }
}

impl<F> KeyFilter for F
where
    F: Fn(&RawKey) -> bool + Send + Sync,
{
    fn matches(&self, key: &RawKey) -> bool {
        self(key)
    }
}

/// Matches every key starting with a fixed byte prefix
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PrefixFilter(pub Vec<u8>);

impl PrefixFilter {
    /// Create a filter for `prefix`
    #[must_use]
    pub fn new(prefix: impl Into<Vec<u8>>) -> Self {
        Self(prefix.into())
    }
}

impl KeyFilter for PrefixFilter {
    fn matches(&self, key: &RawKey) -> bool {
        key.starts_with(&self.0)
    }

    fn prefix(&self) -> Option<&[u8]> {
        Some(&self.0)
    }
}
