//! Entry update functions
//!
//! An entry function carries the offsets of one committed view and applies
//! them to whatever entry the store holds when the atomic compute runs.
//! The store may invoke it several times under contention, so it captures
//! its offsets by value and reads nothing else.

use crate::entry::{Context, CreationEntry};
use crate::key::MetaKey;
use crate::offset::OffsetValue;
use clustermeta_common::{Error, Result};
use std::time::Duration;

/// Applies a set of offsets to the currently stored entry
pub trait EntryFunction<E> {
    /// New entry computed from `current`.
    ///
    /// Fails with [`Error::MissingEntry`] when nothing is stored under
    /// `key`: entries are created explicitly, never by a mutation.
    fn apply<K: MetaKey>(&self, key: &K, current: Option<&E>) -> Result<E>;

    /// True when applying would return the current entry unchanged
    fn is_noop(&self) -> bool;
}

pub(crate) fn require<'a, K: MetaKey, E>(key: &K, current: Option<&'a E>) -> Result<&'a E> {
    current.ok_or_else(|| Error::missing_entry(key))
}

/// Offsets of a [`MutableCreation`](crate::MutableCreation)
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CreationEntryFunction<C> {
    timeout: OffsetValue<Duration>,
    /// Context created during the request, stored only if the entry has none
    context: Option<C>,
}

impl<C> CreationEntryFunction<C> {
    pub(crate) const fn new(timeout: OffsetValue<Duration>, context: Option<C>) -> Self {
        Self { timeout, context }
    }
}

impl<C: Clone> CreationEntryFunction<C> {
    /// Same as [`EntryFunction::apply`] without requiring a key
    pub(crate) fn merge(&self, current: &CreationEntry<C>) -> CreationEntry<C> {
        // Conflicting timeouts resolve to the last committer
        let timeout = self.timeout.overwrite(current.timeout);
        let context = match (current.context_if_present(), &self.context) {
            (Some(stored), _) => Context::with_value(stored.clone()),
            (None, Some(created)) => Context::with_value(created.clone()),
            (None, None) => Context::empty(),
        };
        CreationEntry {
            creation_time: current.creation_time,
            timeout,
            context,
        }
    }
}

impl<C: Clone> EntryFunction<CreationEntry<C>> for CreationEntryFunction<C> {
    fn apply<K: MetaKey>(
        &self,
        key: &K,
        current: Option<&CreationEntry<C>>,
    ) -> Result<CreationEntry<C>> {
        require(key, current).map(|current| self.merge(current))
    }

    fn is_noop(&self) -> bool {
        self.timeout.is_zero() && self.context.is_none()
    }
}
