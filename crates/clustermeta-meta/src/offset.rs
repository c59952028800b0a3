//! Relative offsets captured during one request
//!
//! An [`OffsetValue`] remembers the value a field had when the view was
//! loaded (the basis) and the value the request last assigned (current).
//! Commit applies the difference to whatever is stored at that time rather
//! than overwriting it, so a concurrent writer's change survives.

use clustermeta_common::Timestamp;
use std::time::Duration;

/// Values that can be shifted by the difference between two others
pub trait Offsettable: Copy + PartialEq {
    /// `self + (current - basis)`
    #[must_use]
    fn rebase(self, basis: Self, current: Self) -> Self;
}

impl Offsettable for Duration {
    /// A backward shift larger than `self` ends at zero.
    fn rebase(self, basis: Self, current: Self) -> Self {
        if current >= basis {
            self.saturating_add(current - basis)
        } else {
            self.saturating_sub(basis - current)
        }
    }
}

impl Offsettable for Option<Duration> {
    /// Relative when all three values are present; otherwise the request's
    /// value replaces the stored one.
    fn rebase(self, basis: Self, current: Self) -> Self {
        match (self, basis, current) {
            (Some(stored), Some(basis), Some(current)) => Some(stored.rebase(basis, current)),
            _ => current,
        }
    }
}

impl Offsettable for Timestamp {
    fn rebase(self, basis: Self, current: Self) -> Self {
        let delta = current.as_millis().saturating_sub(basis.as_millis());
        Self::from_millis(self.as_millis().saturating_add(delta))
    }
}

/// A `(basis, current)` pair for one field of a view
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct OffsetValue<T> {
    basis: T,
    current: T,
}

impl<T: Copy + PartialEq> OffsetValue<T> {
    /// Start tracking `value`; the offset is zero until [`set`](Self::set)
    pub const fn new(value: T) -> Self {
        Self {
            basis: value,
            current: value,
        }
    }

    /// Value seen when the view was loaded
    pub const fn basis(&self) -> T {
        self.basis
    }

    /// Value as the request currently sees it
    pub const fn get(&self) -> T {
        self.current
    }

    /// Assign a new value; only the last assignment counts
    pub fn set(&mut self, value: T) {
        self.current = value;
    }

    /// Take the current value as the new basis, zeroing the offset
    pub fn settle(&mut self) {
        self.basis = self.current;
    }

    /// True when the request left the value unchanged
    pub fn is_zero(&self) -> bool {
        self.basis == self.current
    }

    /// Last-writer-wins merge: the request's value if it changed anything,
    /// otherwise `stored`
    pub fn overwrite(&self, stored: T) -> T {
        if self.is_zero() { stored } else { self.current }
    }
}

impl<T: Offsettable> OffsetValue<T> {
    /// Relative merge: `stored + (current - basis)`.
    ///
    /// Pure, but not idempotent in the usual sense: feeding the result back
    /// in shifts it again. Commit applies it exactly once.
    pub fn apply(&self, stored: T) -> T {
        if self.is_zero() {
            stored
        } else {
            stored.rebase(self.basis, self.current)
        }
    }
}

impl<T: Copy + PartialEq> From<T> for OffsetValue<T> {
    fn from(value: T) -> Self {
        Self::new(value)
    }
}
