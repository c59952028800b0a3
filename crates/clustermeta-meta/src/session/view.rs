//! Mutable view over session access metadata

use super::entry::SessionAccessEntry;
use super::function::SessionAccessEntryFunction;
use crate::mutator::MutableView;
use crate::offset::OffsetValue;
use clustermeta_common::truncate_millis;
use std::time::Duration;

/// Request-scoped read/write view of a [`SessionAccessEntry`]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MutableSessionAccess {
    since_creation: OffsetValue<Duration>,
    last_access: OffsetValue<Duration>,
}

impl MutableSessionAccess {
    /// Wrap a loaded entry
    #[must_use]
    pub const fn new(entry: SessionAccessEntry) -> Self {
        Self {
            since_creation: OffsetValue::new(entry.since_creation),
            last_access: OffsetValue::new(entry.last_access),
        }
    }

    /// Pending time from creation to the start of the last request
    pub const fn since_creation(&self) -> Duration {
        self.since_creation.get()
    }

    /// Pending length of the last request
    pub const fn last_access(&self) -> Duration {
        self.last_access.get()
    }

    /// Record the request that just finished
    pub fn set_last_access_duration(&mut self, since_creation: Duration, last_access: Duration) {
        self.since_creation.set(truncate_millis(since_creation));
        self.last_access.set(truncate_millis(last_access));
    }

    /// Whether the session had no completed request, as seen by this view
    pub fn is_new(&self) -> bool {
        self.since_creation().is_zero() && self.last_access().is_zero()
    }

    /// Offsets recorded so far, as an entry function
    pub const fn offsets(&self) -> SessionAccessEntryFunction {
        SessionAccessEntryFunction::new(self.since_creation, self.last_access)
    }
}

impl MutableView for MutableSessionAccess {
    type Entry = SessionAccessEntry;
    type Function = SessionAccessEntryFunction;

    fn entry_function(&self) -> Self::Function {
        self.offsets()
    }

    fn settle(&mut self) {
        self.since_creation.settle();
        self.last_access.settle();
    }
}
