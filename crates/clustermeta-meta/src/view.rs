//! Mutable view over creation metadata

use crate::entry::{CreationEntry, CreationMetaData};
use crate::function::CreationEntryFunction;
use crate::mutator::MutableView;
use crate::offset::OffsetValue;
use clustermeta_common::{Timestamp, truncate_millis};
use std::time::Duration;

/// Request-scoped read/write view of a [`CreationEntry`].
///
/// The loaded entry is never modified. `set_timeout` only records an
/// offset, and reads return the pending value.
#[derive(Debug)]
pub struct MutableCreation<C> {
    entry: CreationEntry<C>,
    timeout: OffsetValue<Duration>,
    loaded_with_context: bool,
}

impl<C> MutableCreation<C> {
    /// Wrap a loaded entry
    pub fn new(entry: CreationEntry<C>) -> Self {
        let timeout = OffsetValue::new(entry.timeout);
        let loaded_with_context = entry.context_if_present().is_some();
        Self {
            entry,
            timeout,
            loaded_with_context,
        }
    }

    /// Change the timeout for this request; zero means never expires
    pub fn set_timeout(&mut self, timeout: Duration) {
        self.timeout.set(truncate_millis(timeout));
    }

    /// The context payload, created by `supplier` on first request.
    ///
    /// A payload created here is stored on commit unless another request
    /// stored one first.
    pub fn context(&self, supplier: impl FnOnce() -> C) -> &C {
        self.entry.context(supplier)
    }

    /// The context payload if already created
    pub fn context_if_present(&self) -> Option<&C> {
        self.entry.context_if_present()
    }

    /// The entry this view was loaded from
    pub const fn baseline(&self) -> &CreationEntry<C> {
        &self.entry
    }
}

impl<C: Clone> MutableCreation<C> {
    /// Offsets recorded so far, as an entry function
    pub fn offsets(&self) -> CreationEntryFunction<C> {
        let created = if self.loaded_with_context {
            None
        } else {
            self.entry.context_if_present().cloned()
        };
        CreationEntryFunction::new(self.timeout, created)
    }
}

impl<C> CreationMetaData for MutableCreation<C> {
    fn creation_time(&self) -> Timestamp {
        self.entry.creation_time
    }

    fn timeout(&self) -> Duration {
        self.timeout.get()
    }
}

impl<C: Clone> MutableView for MutableCreation<C> {
    type Entry = CreationEntry<C>;
    type Function = CreationEntryFunction<C>;

    fn entry_function(&self) -> Self::Function {
        self.offsets()
    }

    fn settle(&mut self) {
        self.timeout.settle();
        self.loaded_with_context = self.entry.context_if_present().is_some();
    }
}
