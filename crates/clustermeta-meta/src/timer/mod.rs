//! Timer metadata
//!
//! Like sessions, a timer is stored as a creation entry (creation time,
//! delay to the first expiration, info payload, schedule) and an access
//! entry (offset of the last expiration). Declarative timers are also
//! addressed through a [`TimerIndexKey`] so every node resolves the same
//! schedule to the same timer.

mod entry;
mod factory;
mod function;
mod index;
mod key;
mod marshal;
mod schedule;
mod view;

pub use entry::{TimerAccessEntry, TimerCreationEntry, TimerMetaData};
pub use factory::{TimerCreation, TimerMetaDataFactory};
pub use function::{TimerAccessEntryFunction, TimerCreationEntryFunction};
pub use index::{MethodIdentifier, TimerIndex};
pub use key::{TimerAccessKey, TimerCreationKey, TimerIndexKey};
pub use marshal::{TimerAccessEntryMarshaller, TimerCreationEntryMarshaller};
pub use schedule::{ScheduleExpression, ScheduleExpressionBuilder, TimeoutMatcher, TimerSchedule};
pub use view::{MutableTimerAccess, MutableTimerCreation};
