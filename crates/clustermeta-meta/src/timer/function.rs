//! Commit-time merge of timer offsets

use super::entry::{TimerAccessEntry, TimerCreationEntry};
use crate::function::{CreationEntryFunction, EntryFunction, require};
use crate::key::MetaKey;
use crate::offset::OffsetValue;
use clustermeta_common::Result;
use std::time::Duration;

/// Offsets of a [`MutableTimerCreation`](super::MutableTimerCreation).
/// The schedule is immutable and always copied from the stored entry.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TimerCreationEntryFunction<C>(CreationEntryFunction<C>);

impl<C> TimerCreationEntryFunction<C> {
    pub(crate) const fn new(creation: CreationEntryFunction<C>) -> Self {
        Self(creation)
    }
}

impl<C: Clone> EntryFunction<TimerCreationEntry<C>> for TimerCreationEntryFunction<C> {
    fn apply<K: MetaKey>(
        &self,
        key: &K,
        current: Option<&TimerCreationEntry<C>>,
    ) -> Result<TimerCreationEntry<C>> {
        let current = require(key, current)?;
        Ok(TimerCreationEntry {
            creation: self.0.merge(&current.creation),
            schedule: current.schedule.clone(),
        })
    }

    fn is_noop(&self) -> bool {
        self.0.is_noop()
    }
}

/// Offsets of a [`MutableTimerAccess`](super::MutableTimerAccess)
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TimerAccessEntryFunction {
    last_timeout: OffsetValue<Option<Duration>>,
}

impl TimerAccessEntryFunction {
    pub(crate) const fn new(last_timeout: OffsetValue<Option<Duration>>) -> Self {
        Self { last_timeout }
    }
}

impl EntryFunction<TimerAccessEntry> for TimerAccessEntryFunction {
    fn apply<K: MetaKey>(
        &self,
        key: &K,
        current: Option<&TimerAccessEntry>,
    ) -> Result<TimerAccessEntry> {
        let current = require(key, current)?;
        Ok(TimerAccessEntry {
            last_timeout: self.last_timeout.apply(current.last_timeout),
        })
    }

    fn is_noop(&self) -> bool {
        self.last_timeout.is_zero()
    }
}
