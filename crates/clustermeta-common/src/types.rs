//! Core type definitions for clustermeta
//!
//! Identifiers for the entities whose metadata is replicated, and the
//! millisecond-precision time types shared by every entry.

use crate::error::Error;
use derive_more::{Display, From, Into};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use uuid::Uuid;

macro_rules! uuid_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, From, Into,
        )]
        pub struct $name(Uuid);

        impl $name {
            /// Generate a new random identifier
            #[must_use]
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            /// Create from existing UUID
            #[must_use]
            pub const fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            /// Create from the 16 raw UUID bytes
            #[must_use]
            pub const fn from_bytes(bytes: [u8; 16]) -> Self {
                Self(Uuid::from_bytes(bytes))
            }

            /// Get the underlying UUID
            #[must_use]
            pub const fn as_uuid(&self) -> Uuid {
                self.0
            }

            /// Get as bytes
            #[must_use]
            pub fn as_bytes(&self) -> &[u8; 16] {
                self.0.as_bytes()
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!(stringify!($name), "({})"), self.0)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Uuid::parse_str(s).map(Self).map_err(|e| {
                    Error::invalid_argument(format!(
                        concat!("invalid ", stringify!($name), " '{}': {}"),
                        s, e
                    ))
                })
            }
        }
    };
}

uuid_id!(
    /// Identifier of a distributable web session
    SessionId
);

uuid_id!(
    /// Identifier of a single timer
    TimerId
);

uuid_id!(
    /// Identifier of a timer service (one per deployed bean)
    TimerServiceId
);

/// Point in time, in milliseconds since the Unix epoch.
///
/// Millisecond precision matches the storage schema, so a timestamp always
/// survives an encode/decode cycle unchanged.
#[derive(
    Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Display, From, Into,
)]
#[display("{_0}ms")]
pub struct Timestamp(i64);

impl Timestamp {
    /// The Unix epoch
    pub const EPOCH: Self = Self(0);

    /// Current wall-clock time
    #[must_use]
    pub fn now() -> Self {
        match SystemTime::now().duration_since(UNIX_EPOCH) {
            Ok(elapsed) => Self(duration_to_millis(elapsed)),
            Err(e) => Self(-duration_to_millis(e.duration())),
        }
    }

    /// Create from milliseconds since the epoch
    #[must_use]
    pub const fn from_millis(millis: i64) -> Self {
        Self(millis)
    }

    /// Milliseconds since the epoch
    #[must_use]
    pub const fn as_millis(&self) -> i64 {
        self.0
    }

    /// Shift forward by `duration`, saturating at the representable range
    #[must_use]
    pub fn saturating_add(self, duration: Duration) -> Self {
        Self(self.0.saturating_add(duration_to_millis(duration)))
    }

    /// Shift backward by `duration`, saturating at the representable range
    #[must_use]
    pub fn saturating_sub(self, duration: Duration) -> Self {
        Self(self.0.saturating_sub(duration_to_millis(duration)))
    }

    /// Time elapsed since `earlier`, or zero if `earlier` is not before `self`
    #[must_use]
    pub fn duration_since(self, earlier: Self) -> Duration {
        u64::try_from(self.0.saturating_sub(earlier.0))
            .map(Duration::from_millis)
            .unwrap_or(Duration::ZERO)
    }
}

impl fmt::Debug for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Timestamp({}ms)", self.0)
    }
}

/// Whole milliseconds in `duration`, saturating at `i64::MAX`
#[must_use]
pub fn duration_to_millis(duration: Duration) -> i64 {
    i64::try_from(duration.as_millis()).unwrap_or(i64::MAX)
}

/// Duration of `millis` milliseconds; `None` for negative input
#[must_use]
pub fn duration_from_millis(millis: i64) -> Option<Duration> {
    u64::try_from(millis).ok().map(Duration::from_millis)
}

/// Drop sub-millisecond precision so the value matches its stored form
#[must_use]
pub fn truncate_millis(duration: Duration) -> Duration {
    duration_from_millis(duration_to_millis(duration)).unwrap_or(Duration::ZERO)
}
