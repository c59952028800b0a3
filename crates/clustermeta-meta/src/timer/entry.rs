//! Timer creation and access entries

use super::schedule::TimerSchedule;
use crate::entry::{CreationEntry, CreationMetaData};
use clustermeta_common::{Timestamp, truncate_millis};
use std::time::Duration;

/// Stored creation metadata of a timer.
///
/// The creation facet's timeout is the delay from creation to the first
/// expiration; the context carries the timer's info payload.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TimerCreationEntry<C> {
    pub(crate) creation: CreationEntry<C>,
    pub(crate) schedule: TimerSchedule,
}

impl<C> TimerCreationEntry<C> {
    #[must_use]
    pub const fn new(creation: CreationEntry<C>, schedule: TimerSchedule) -> Self {
        Self { creation, schedule }
    }

    pub const fn creation(&self) -> &CreationEntry<C> {
        &self.creation
    }

    pub const fn schedule(&self) -> &TimerSchedule {
        &self.schedule
    }

    /// First scheduled expiration
    pub fn initial_expiration(&self) -> Timestamp {
        self.creation.creation_time().saturating_add(self.creation.timeout())
    }

    /// The timer's info payload, created by `supplier` on first request
    pub fn info(&self, supplier: impl FnOnce() -> C) -> &C {
        self.creation.context(supplier)
    }

    pub fn info_if_present(&self) -> Option<&C> {
        self.creation.context_if_present()
    }
}

impl<C> CreationMetaData for TimerCreationEntry<C> {
    fn creation_time(&self) -> Timestamp {
        self.creation.creation_time()
    }

    fn timeout(&self) -> Duration {
        self.creation.timeout()
    }
}

/// Stored access metadata of a timer
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct TimerAccessEntry {
    /// Offset of the last expiration from the creation time
    pub(crate) last_timeout: Option<Duration>,
}

impl TimerAccessEntry {
    /// Entry for a timer that last expired `last_timeout` after creation
    #[must_use]
    pub fn new(last_timeout: Option<Duration>) -> Self {
        Self {
            last_timeout: last_timeout.map(truncate_millis),
        }
    }

    pub const fn last_timeout(&self) -> Option<Duration> {
        self.last_timeout
    }
}

/// Instant of the last expiration, if the timer ever fired
pub(crate) fn last_timeout_time(
    creation_time: Timestamp,
    last_timeout: Option<Duration>,
) -> Option<Timestamp> {
    last_timeout.map(|offset| creation_time.saturating_add(offset))
}

/// Both facets of a stored timer
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TimerMetaData<C> {
    pub(crate) creation: TimerCreationEntry<C>,
    pub(crate) access: TimerAccessEntry,
}

impl<C> TimerMetaData<C> {
    pub const fn creation(&self) -> &TimerCreationEntry<C> {
        &self.creation
    }

    pub const fn access(&self) -> &TimerAccessEntry {
        &self.access
    }

    /// When the timer last fired
    pub fn last_timeout_time(&self) -> Option<Timestamp> {
        last_timeout_time(self.creation.creation_time(), self.access.last_timeout)
    }

    /// Next expiration of an interval timer.
    ///
    /// `None` for a single-action timer that already fired, and for calendar
    /// timers, whose next expiration depends on evaluating the expression.
    pub fn next_timeout(&self) -> Option<Timestamp> {
        let TimerSchedule::Interval { interval } = self.creation.schedule else {
            return None;
        };
        match (self.last_timeout_time(), interval) {
            (None, _) => Some(self.creation.initial_expiration()),
            (Some(last), Some(interval)) => Some(last.saturating_add(interval)),
            (Some(_), None) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::timer::ScheduleExpression;

    fn secs(n: u64) -> Duration {
        Duration::from_secs(n)
    }

    fn timer(schedule: TimerSchedule, last_timeout: Option<Duration>) -> TimerMetaData<()> {
        TimerMetaData {
            creation: TimerCreationEntry::new(
                CreationEntry::new(Timestamp::from_millis(10_000)).with_timeout(secs(5)),
                schedule,
            ),
            access: TimerAccessEntry::new(last_timeout),
        }
    }

    #[test]
    fn test_initial_expiration() {
        let timer = timer(TimerSchedule::single_action(), None);
        assert_eq!(timer.creation().initial_expiration(), Timestamp::from_millis(15_000));
        assert_eq!(timer.next_timeout(), Some(Timestamp::from_millis(15_000)));
        assert_eq!(timer.last_timeout_time(), None);
    }

    #[test]
    fn test_single_action_fired() {
        let timer = timer(TimerSchedule::single_action(), Some(secs(5)));
        assert_eq!(timer.last_timeout_time(), Some(Timestamp::from_millis(15_000)));
        assert_eq!(timer.next_timeout(), None);
    }

    #[test]
    fn test_interval_next_timeout() {
        let timer = timer(TimerSchedule::interval(secs(60)).unwrap(), Some(secs(65)));
        assert_eq!(timer.next_timeout(), Some(Timestamp::from_millis(135_000)));
    }

    #[test]
    fn test_calendar_has_no_computed_next_timeout() {
        let schedule = TimerSchedule::calendar(ScheduleExpression::default(), None);
        assert_eq!(timer(schedule, None).next_timeout(), None);
    }
}
