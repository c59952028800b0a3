//! Timer metadata factory
//!
//! Declarative timers claim a [`TimerIndex`] when created. The claim is a
//! conditional write on the index key, so when several nodes deploy the
//! same bean concurrently exactly one timer per schedule survives.

use super::entry::{TimerAccessEntry, TimerCreationEntry, TimerMetaData};
use super::index::TimerIndex;
use super::key::{TimerAccessKey, TimerCreationKey, TimerIndexKey};
use super::marshal::{TimerAccessEntryMarshaller, TimerCreationEntryMarshaller};
use super::view::{MutableTimerAccess, MutableTimerCreation};
use crate::entry::CreationMetaData;
use crate::filter::MetaKeyFilter;
use crate::key::{KeyKind, MetaKey};
use crate::marshal::{BincodeMarshaller, Marshaller};
use crate::mutator::Mutation;
use clustermeta_common::config::MetadataConfig;
use clustermeta_common::{Error, Result, TimerId, TimerServiceId};
use clustermeta_store::KeyValueStore;
use std::marker::PhantomData;
use std::sync::Arc;
use tracing::{debug, error, warn};

/// Outcome of [`TimerMetaDataFactory::create`]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TimerCreation {
    /// The timer was stored
    Created,
    /// The index is held by another timer; nothing was written
    Existing(TimerId),
}

fn decode_timer_id(bytes: &[u8]) -> Result<TimerId> {
    <[u8; 16]>::try_from(bytes)
        .map(TimerId::from_bytes)
        .map_err(|_| {
            Error::decode(format!(
                "timer index value has {} bytes, expected 16",
                bytes.len()
            ))
        })
}

/// Creates, finds and removes timer metadata in a store
pub struct TimerMetaDataFactory<C, M = BincodeMarshaller<C>> {
    store: Arc<dyn KeyValueStore>,
    creation: TimerCreationEntryMarshaller<M>,
    access: TimerAccessEntryMarshaller,
    config: MetadataConfig,
    _context: PhantomData<fn() -> C>,
}

impl<C, M> TimerMetaDataFactory<C, M>
where
    C: Clone,
    M: Marshaller<C>,
{
    /// Factory over `store`, encoding timer info with `context`
    pub fn new(store: Arc<dyn KeyValueStore>, context: M, config: MetadataConfig) -> Self {
        Self {
            store,
            creation: TimerCreationEntryMarshaller::new(context),
            access: TimerAccessEntryMarshaller,
            config,
            _context: PhantomData,
        }
    }

    /// Store a new timer, claiming `index` within `service` first if given.
    ///
    /// Returns [`TimerCreation::Existing`] with the holder's id when another
    /// timer already claimed the index. Fails with [`Error::AlreadyExists`]
    /// if `id` is already stored. A failed create releases the index it
    /// claimed.
    pub fn create(
        &self,
        service: TimerServiceId,
        id: TimerId,
        entry: &TimerCreationEntry<C>,
        index: Option<TimerIndex>,
    ) -> Result<TimerCreation> {
        let creation = self.creation.encode(entry)?;
        let access = self.access.encode(&TimerAccessEntry::default())?;

        let mut claimed = None;
        if let Some(index) = index {
            let key = TimerIndexKey::new(service, index);
            match self.store.put_if_absent(key.to_raw(), id.as_bytes().to_vec())? {
                None => claimed = Some(key),
                Some(holder) => {
                    let holder = decode_timer_id(&holder)?;
                    if holder != id {
                        debug!("{} already held by timer {}", key, holder);
                        return Ok(TimerCreation::Existing(holder));
                    }
                }
            }
        }

        if let Err(e) = self.store_entries(id, creation, access) {
            if let Some(key) = claimed {
                self.release_claim(&key, id);
            }
            return Err(e);
        }

        debug!("created timer {} for service {}", id, service);
        Ok(TimerCreation::Created)
    }

    /// Write both facets of a new timer, or neither
    fn store_entries(&self, id: TimerId, creation: Vec<u8>, access: Vec<u8>) -> Result<()> {
        let key = TimerCreationKey(id);
        if self.store.put_if_absent(key.to_raw(), creation)?.is_some() {
            return Err(Error::already_exists(key));
        }
        if let Err(e) = self.store.put(TimerAccessKey(id).to_raw(), access) {
            if let Err(undo) = self.store.remove(&key.to_raw()) {
                error!("failed to roll back creation entry of timer {}: {}", id, undo);
            }
            return Err(e);
        }
        Ok(())
    }

    /// Release an index claimed by `id`, unless another timer took it over
    fn release_claim(&self, key: &TimerIndexKey, id: TimerId) {
        let raw = key.to_raw();
        let released = match self.store.get(&raw) {
            Ok(Some(holder)) if decode_timer_id(&holder) == Ok(id) => {
                self.store.remove(&raw).map(drop)
            }
            Ok(_) => Ok(()),
            Err(e) => Err(e),
        };
        if let Err(e) = released {
            error!("failed to release {} claimed by timer {}: {}", key, id, e);
        }
    }

    /// Load both facets of a timer; an incomplete timer is reported absent
    pub fn find(&self, id: TimerId) -> Result<Option<TimerMetaData<C>>> {
        let creation = self.store.get(&TimerCreationKey(id).to_raw())?;
        let access = self.store.get(&TimerAccessKey(id).to_raw())?;

        match (creation, access) {
            (Some(creation), Some(access)) => Ok(Some(TimerMetaData {
                creation: self.creation.decode(&creation)?,
                access: self.access.decode(&access)?,
            })),
            (None, None) => Ok(None),
            _ => {
                warn!("timer {} has only one of its two entries", id);
                Ok(None)
            }
        }
    }

    /// Id of the timer holding `index` within `service`
    pub fn find_by_index(
        &self,
        service: TimerServiceId,
        index: TimerIndex,
    ) -> Result<Option<TimerId>> {
        self.store
            .get(&TimerIndexKey::new(service, index).to_raw())?
            .map(|bytes| decode_timer_id(&bytes))
            .transpose()
    }

    /// Mutation of the creation facet loaded as `entry`
    pub fn mutate_creation(
        &self,
        id: TimerId,
        entry: TimerCreationEntry<C>,
    ) -> Mutation<'_, TimerCreationKey, MutableTimerCreation<C>, TimerCreationEntryMarshaller<M>> {
        Mutation::new(
            self.store.as_ref(),
            &self.creation,
            TimerCreationKey(id),
            MutableTimerCreation::new(entry),
            self.config.skip_noop_commits,
        )
    }

    /// Mutation of the access facet of a loaded timer
    pub fn mutate_access(
        &self,
        id: TimerId,
        metadata: &TimerMetaData<C>,
    ) -> Mutation<'_, TimerAccessKey, MutableTimerAccess, TimerAccessEntryMarshaller> {
        Mutation::new(
            self.store.as_ref(),
            &self.access,
            TimerAccessKey(id),
            MutableTimerAccess::new(metadata.creation.creation_time(), metadata.access),
            self.config.skip_noop_commits,
        )
    }

    /// Remove both facets; returns whether the timer was stored
    pub fn remove(&self, id: TimerId) -> Result<bool> {
        let creation = self.store.remove(&TimerCreationKey(id).to_raw())?;
        let access = self.store.remove(&TimerAccessKey(id).to_raw())?;
        debug!("removed timer {}", id);
        Ok(creation.is_some() || access.is_some())
    }

    /// Release `index` within `service`; returns the timer that held it
    pub fn remove_index(
        &self,
        service: TimerServiceId,
        index: TimerIndex,
    ) -> Result<Option<TimerId>> {
        self.store
            .remove(&TimerIndexKey::new(service, index).to_raw())?
            .map(|bytes| decode_timer_id(&bytes))
            .transpose()
    }

    /// Ids of all stored timers
    pub fn timers(&self) -> Result<Vec<TimerId>> {
        let entries = self.store.scan(&MetaKeyFilter::Kind(KeyKind::TimerCreation))?;

        Ok(entries
            .into_iter()
            .filter_map(|(raw, _)| match TimerCreationKey::from_raw(&raw) {
                Ok(key) => Some(key.id()),
                Err(e) => {
                    warn!("skipping malformed timer key {:?}: {}", raw, e);
                    None
                }
            })
            .collect())
    }

    /// Claimed indexes of `service`, in key order
    pub fn indexes(&self, service: TimerServiceId) -> Result<Vec<(TimerIndex, TimerId)>> {
        let entries = self.store.scan(&MetaKeyFilter::timer_index_for(service))?;

        Ok(entries
            .into_iter()
            .filter_map(|(raw, value)| {
                let parsed = TimerIndexKey::from_raw(&raw)
                    .and_then(|key| decode_timer_id(&value).map(|id| (key.into_index(), id)));
                match parsed {
                    Ok(entry) => Some(entry),
                    Err(e) => {
                        warn!("skipping corrupt timer index {:?}: {}", raw, e);
                        None
                    }
                }
            })
            .collect())
    }
}
