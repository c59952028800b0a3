//! Creation facet shared by sessions and timers

use clustermeta_common::{Timestamp, truncate_millis};
use std::fmt;
use std::sync::OnceLock;
use std::time::Duration;

/// Write-once application payload.
///
/// Empty until first requested; the supplier given to the first
/// [`get_or_init`](Self::get_or_init) call creates it and every later call
/// returns that same value.
pub struct Context<C>(OnceLock<C>);

impl<C> Context<C> {
    /// An empty context
    #[must_use]
    pub const fn empty() -> Self {
        Self(OnceLock::new())
    }

    /// A context that already holds `value` (e.g. decoded from the store)
    #[must_use]
    pub fn with_value(value: C) -> Self {
        let cell = OnceLock::new();
        let _ = cell.set(value);
        Self(cell)
    }

    /// The payload, created by `supplier` if this is the first request
    pub fn get_or_init(&self, supplier: impl FnOnce() -> C) -> &C {
        self.0.get_or_init(supplier)
    }

    /// The payload if it was already created
    pub fn get(&self) -> Option<&C> {
        self.0.get()
    }

    /// Whether the payload was created
    pub fn is_present(&self) -> bool {
        self.0.get().is_some()
    }

    /// Take the payload out
    pub fn into_inner(self) -> Option<C> {
        self.0.into_inner()
    }
}

impl<C> Default for Context<C> {
    fn default() -> Self {
        Self::empty()
    }
}

impl<C: Clone> Clone for Context<C> {
    fn clone(&self) -> Self {
        match self.get() {
            Some(value) => Self::with_value(value.clone()),
            None => Self::empty(),
        }
    }
}

impl<C: PartialEq> PartialEq for Context<C> {
    fn eq(&self, other: &Self) -> bool {
        self.get() == other.get()
    }
}

impl<C: Eq> Eq for Context<C> {}

impl<C: fmt::Debug> fmt::Debug for Context<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.get() {
            Some(value) => f.debug_tuple("Context").field(value).finish(),
            None => f.write_str("Context(<empty>)"),
        }
    }
}

/// Read access to creation metadata, implemented by entries and views
pub trait CreationMetaData {
    /// When the entity was created
    fn creation_time(&self) -> Timestamp;

    /// Inactivity timeout; zero means never expires
    fn timeout(&self) -> Duration;
}

/// Stored creation metadata of a session or timer
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CreationEntry<C> {
    pub(crate) creation_time: Timestamp,
    pub(crate) timeout: Duration,
    pub(crate) context: Context<C>,
}

impl<C> CreationEntry<C> {
    /// Entry created at `creation_time` with no timeout and an empty context
    #[must_use]
    pub const fn new(creation_time: Timestamp) -> Self {
        Self {
            creation_time,
            timeout: Duration::ZERO,
            context: Context::empty(),
        }
    }

    /// Entry created now
    #[must_use]
    pub fn now() -> Self {
        Self::new(Timestamp::now())
    }

    /// Set the timeout (millisecond precision)
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = truncate_millis(timeout);
        self
    }

    /// Pre-populate the context
    #[must_use]
    pub fn with_context(mut self, context: C) -> Self {
        self.context = Context::with_value(context);
        self
    }

    /// The context payload, created by `supplier` on first request
    pub fn context(&self, supplier: impl FnOnce() -> C) -> &C {
        self.context.get_or_init(supplier)
    }

    /// The context payload if already created
    pub fn context_if_present(&self) -> Option<&C> {
        self.context.get()
    }
}

impl<C> CreationMetaData for CreationEntry<C> {
    fn creation_time(&self) -> Timestamp {
        self.creation_time
    }

    fn timeout(&self) -> Duration {
        self.timeout
    }
}
