//! Session access entry

use clustermeta_common::truncate_millis;
use std::time::Duration;

/// Stored access metadata of a session.
///
/// Both values are durations relative to the creation time, so nodes never
/// need to agree on wall-clock time:
/// - last access start = creation time + `since_creation`
/// - last access end = start + `last_access`
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct SessionAccessEntry {
    pub(crate) since_creation: Duration,
    pub(crate) last_access: Duration,
}

impl SessionAccessEntry {
    /// Entry with the given durations (millisecond precision)
    #[must_use]
    pub fn new(since_creation: Duration, last_access: Duration) -> Self {
        Self {
            since_creation: truncate_millis(since_creation),
            last_access: truncate_millis(last_access),
        }
    }

    /// Time from creation to the start of the last request
    #[must_use]
    pub const fn since_creation(&self) -> Duration {
        self.since_creation
    }

    /// Length of the last request
    #[must_use]
    pub const fn last_access(&self) -> Duration {
        self.last_access
    }

    /// A session is new until its first request completes
    #[must_use]
    pub fn is_new(&self) -> bool {
        self.since_creation.is_zero() && self.last_access.is_zero()
    }
}
