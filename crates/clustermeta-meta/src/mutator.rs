//! Commit handle for a mutable view
//!
//! A [`Mutation`] owns one view for the length of a request. Reads and
//! writes go through `Deref`/`DerefMut`; [`Mutation::commit`] submits the
//! view's entry function to the store's atomic compute.
//!
//! Committing is explicit. A mutation dropped with offsets not yet
//! committed writes nothing: the request is treated as aborted and its
//! offsets are discarded. Writes made after a commit form a fresh offset
//! that the next `commit` applies.

use crate::function::EntryFunction;
use crate::key::MetaKey;
use crate::marshal::Marshaller;
use clustermeta_common::Result;
use clustermeta_store::KeyValueStore;
use std::fmt;
use std::ops::{Deref, DerefMut};
use tracing::{debug, warn};

/// A view whose recorded offsets can be turned into an entry function
pub trait MutableView {
    /// Entry type the view was loaded from
    type Entry;
    /// Function applying this view's offsets
    type Function: EntryFunction<Self::Entry>;

    /// Snapshot of the offsets recorded so far
    fn entry_function(&self) -> Self::Function;

    /// Mark the recorded offsets as applied; later writes start a new offset
    fn settle(&mut self);

    /// Whether committing would change anything
    fn is_dirty(&self) -> bool {
        !self.entry_function().is_noop()
    }
}

/// Scoped commit handle binding a view to its store key
pub struct Mutation<'s, K, V, M>
where
    K: MetaKey,
    V: MutableView,
    M: Marshaller<V::Entry>,
{
    store: &'s dyn KeyValueStore,
    marshaller: &'s M,
    key: K,
    view: V,
    skip_noop: bool,
    committed: bool,
}

impl<'s, K, V, M> Mutation<'s, K, V, M>
where
    K: MetaKey,
    V: MutableView,
    M: Marshaller<V::Entry>,
{
    pub(crate) fn new(
        store: &'s dyn KeyValueStore,
        marshaller: &'s M,
        key: K,
        view: V,
        skip_noop: bool,
    ) -> Self {
        Self {
            store,
            marshaller,
            key,
            view,
            skip_noop,
            committed: false,
        }
    }

    /// Key the view is committed to
    pub const fn key(&self) -> &K {
        &self.key
    }

    /// Whether a commit succeeded and nothing was written since
    pub fn is_committed(&self) -> bool {
        self.committed && !self.view.is_dirty()
    }

    /// Apply the view's pending offsets to the stored entry.
    ///
    /// Offsets are applied at most once: a call with nothing written since
    /// the last successful commit returns `Ok(())` without touching the
    /// store. A failed commit keeps the offsets intact, so calling `commit`
    /// again retries it.
    pub fn commit(&mut self) -> Result<()> {
        if self.is_committed() {
            return Ok(());
        }

        let function = self.view.entry_function();
        if self.skip_noop && function.is_noop() {
            debug!("commit: {} unchanged, skipping store", self.key);
            self.committed = true;
            return Ok(());
        }

        let key = &self.key;
        let marshaller = self.marshaller;
        self.store.compute(&key.to_raw(), &|current| {
            let current = current.map(|bytes| marshaller.decode(bytes)).transpose()?;
            let updated = function.apply(key, current.as_ref())?;
            marshaller.encode(&updated)
        })?;

        self.view.settle();
        self.committed = true;
        debug!("commit: {} applied", self.key);
        Ok(())
    }

    /// Drop the view and its pending offsets without writing anything
    pub fn discard(mut self) {
        debug!("discard: {} dropped without commit", self.key);
        self.view.settle();
    }
}

impl<K, V, M> Deref for Mutation<'_, K, V, M>
where
    K: MetaKey,
    V: MutableView,
    M: Marshaller<V::Entry>,
{
    type Target = V;

    fn deref(&self) -> &V {
        &self.view
    }
}

impl<K, V, M> DerefMut for Mutation<'_, K, V, M>
where
    K: MetaKey,
    V: MutableView,
    M: Marshaller<V::Entry>,
{
    fn deref_mut(&mut self) -> &mut V {
        &mut self.view
    }
}

impl<K, V, M> fmt::Debug for Mutation<'_, K, V, M>
where
    K: MetaKey + fmt::Debug,
    V: MutableView + fmt::Debug,
    M: Marshaller<V::Entry>,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Mutation")
            .field("key", &self.key)
            .field("view", &self.view)
            .field("committed", &self.committed)
            .finish_non_exhaustive()
    }
}

impl<K, V, M> Drop for Mutation<'_, K, V, M>
where
    K: MetaKey,
    V: MutableView,
    M: Marshaller<V::Entry>,
{
    fn drop(&mut self) {
        if self.view.is_dirty() {
            warn!("mutation of {} dropped without commit, offsets discarded", self.key);
        }
    }
}
