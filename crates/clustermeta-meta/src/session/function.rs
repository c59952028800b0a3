//! Commit-time merge of session access offsets

use super::entry::SessionAccessEntry;
use crate::function::{EntryFunction, require};
use crate::key::MetaKey;
use crate::offset::OffsetValue;
use clustermeta_common::Result;
use std::time::Duration;

/// Offsets of a [`MutableSessionAccess`](super::MutableSessionAccess).
///
/// Both durations merge relatively, so requests on different nodes that
/// extend the same session compose instead of overwriting each other.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SessionAccessEntryFunction {
    since_creation: OffsetValue<Duration>,
    last_access: OffsetValue<Duration>,
}

impl SessionAccessEntryFunction {
    pub(crate) const fn new(
        since_creation: OffsetValue<Duration>,
        last_access: OffsetValue<Duration>,
    ) -> Self {
        Self {
            since_creation,
            last_access,
        }
    }
}

impl EntryFunction<SessionAccessEntry> for SessionAccessEntryFunction {
    fn apply<K: MetaKey>(
        &self,
        key: &K,
        current: Option<&SessionAccessEntry>,
    ) -> Result<SessionAccessEntry> {
        let current = require(key, current)?;
        Ok(SessionAccessEntry {
            since_creation: self.since_creation.apply(current.since_creation),
            last_access: self.last_access.apply(current.last_access),
        })
    }

    fn is_noop(&self) -> bool {
        self.since_creation.is_zero() && self.last_access.is_zero()
    }
}
