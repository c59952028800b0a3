//! Mutable views over timer metadata

use super::entry::{TimerAccessEntry, TimerCreationEntry, last_timeout_time};
use super::function::{TimerAccessEntryFunction, TimerCreationEntryFunction};
use super::schedule::TimerSchedule;
use crate::entry::CreationMetaData;
use crate::mutator::MutableView;
use crate::offset::OffsetValue;
use crate::view::MutableCreation;
use clustermeta_common::Timestamp;
use std::time::Duration;

/// Request-scoped view of a [`TimerCreationEntry`]; only the timeout and
/// the info payload can change
#[derive(Debug)]
pub struct MutableTimerCreation<C> {
    creation: MutableCreation<C>,
    schedule: TimerSchedule,
}

impl<C> MutableTimerCreation<C> {
    pub fn new(entry: TimerCreationEntry<C>) -> Self {
        let TimerCreationEntry { creation, schedule } = entry;
        Self {
            creation: MutableCreation::new(creation),
            schedule,
        }
    }

    pub const fn schedule(&self) -> &TimerSchedule {
        &self.schedule
    }

    /// Move the first expiration to `timeout` after creation
    pub fn set_timeout(&mut self, timeout: Duration) {
        self.creation.set_timeout(timeout);
    }

    /// The timer's info payload, created by `supplier` on first request
    pub fn info(&self, supplier: impl FnOnce() -> C) -> &C {
        self.creation.context(supplier)
    }
}

impl<C> CreationMetaData for MutableTimerCreation<C> {
    fn creation_time(&self) -> Timestamp {
        self.creation.creation_time()
    }

    fn timeout(&self) -> Duration {
        self.creation.timeout()
    }
}

impl<C: Clone> MutableView for MutableTimerCreation<C> {
    type Entry = TimerCreationEntry<C>;
    type Function = TimerCreationEntryFunction<C>;

    fn entry_function(&self) -> Self::Function {
        TimerCreationEntryFunction::new(self.creation.offsets())
    }

    fn settle(&mut self) {
        self.creation.settle();
    }
}

/// Request-scoped view of a [`TimerAccessEntry`]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MutableTimerAccess {
    creation_time: Timestamp,
    last_timeout: OffsetValue<Option<Duration>>,
}

impl MutableTimerAccess {
    /// Wrap a loaded entry of a timer created at `creation_time`
    #[must_use]
    pub const fn new(creation_time: Timestamp, entry: TimerAccessEntry) -> Self {
        Self {
            creation_time,
            last_timeout: OffsetValue::new(entry.last_timeout),
        }
    }

    /// Pending offset of the last expiration from creation
    pub const fn last_timeout(&self) -> Option<Duration> {
        self.last_timeout.get()
    }

    /// Pending instant of the last expiration
    pub fn last_timeout_time(&self) -> Option<Timestamp> {
        last_timeout_time(self.creation_time, self.last_timeout.get())
    }

    /// Record an expiration at `instant` (before creation counts as creation)
    pub fn set_last_timeout(&mut self, instant: Timestamp) {
        self.last_timeout.set(Some(instant.duration_since(self.creation_time)));
    }
}

impl MutableView for MutableTimerAccess {
    type Entry = TimerAccessEntry;
    type Function = TimerAccessEntryFunction;

    fn entry_function(&self) -> Self::Function {
        TimerAccessEntryFunction::new(self.last_timeout)
    }

    fn settle(&mut self) {
        self.last_timeout.settle();
    }
}
