//! Session metadata factory
//!
//! Creates, loads and removes both facets of a session and hands out
//! mutations bound to the store.

use super::entry::SessionAccessEntry;
use super::key::{SessionAccessKey, SessionCreationKey};
use super::marshal::SessionAccessEntryMarshaller;
use super::view::MutableSessionAccess;
use crate::entry::{CreationEntry, CreationMetaData};
use crate::filter::MetaKeyFilter;
use crate::key::{KeyKind, MetaKey};
use crate::marshal::{BincodeMarshaller, CreationEntryMarshaller, Marshaller};
use crate::mutator::Mutation;
use crate::view::MutableCreation;
use clustermeta_common::config::MetadataConfig;
use clustermeta_common::{Error, Result, SessionId, Timestamp};
use clustermeta_store::KeyValueStore;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, warn};

/// Expired once `timeout` has elapsed since the end of the last request.
/// A zero timeout never expires.
fn expired(timeout: Duration, last_access_end: Timestamp, now: Timestamp) -> bool {
    !timeout.is_zero() && now.duration_since(last_access_end) >= timeout
}

/// Both facets of a stored session
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SessionMetaData<C> {
    id: SessionId,
    creation: CreationEntry<C>,
    access: SessionAccessEntry,
}

impl<C> SessionMetaData<C> {
    #[must_use]
    pub const fn new(
        id: SessionId,
        creation: CreationEntry<C>,
        access: SessionAccessEntry,
    ) -> Self {
        Self {
            id,
            creation,
            access,
        }
    }

    pub const fn id(&self) -> SessionId {
        self.id
    }

    pub const fn creation(&self) -> &CreationEntry<C> {
        &self.creation
    }

    pub const fn access(&self) -> &SessionAccessEntry {
        &self.access
    }

    /// No request has completed yet
    pub fn is_new(&self) -> bool {
        self.access.is_new()
    }

    pub fn last_access_start_time(&self) -> Timestamp {
        self.creation.creation_time().saturating_add(self.access.since_creation())
    }

    pub fn last_access_end_time(&self) -> Timestamp {
        self.last_access_start_time().saturating_add(self.access.last_access())
    }

    /// Whether the session timed out as of `now`
    pub fn is_expired(&self, now: Timestamp) -> bool {
        expired(self.creation.timeout(), self.last_access_end_time(), now)
    }

    /// The context payload, created by `supplier` on first request
    pub fn context(&self, supplier: impl FnOnce() -> C) -> &C {
        self.creation.context(supplier)
    }
}

impl<C> CreationMetaData for SessionMetaData<C> {
    fn creation_time(&self) -> Timestamp {
        self.creation.creation_time()
    }

    fn timeout(&self) -> Duration {
        self.creation.timeout()
    }
}

/// Mutable view over both facets of a session, committed together
pub struct MutableSessionMetaData<'s, C, M>
where
    C: Clone,
    M: Marshaller<C>,
{
    id: SessionId,
    creation: Mutation<'s, SessionCreationKey, MutableCreation<C>, CreationEntryMarshaller<M>>,
    access: Mutation<'s, SessionAccessKey, MutableSessionAccess, SessionAccessEntryMarshaller>,
}

impl<C, M> MutableSessionMetaData<'_, C, M>
where
    C: Clone,
    M: Marshaller<C>,
{
    pub const fn id(&self) -> SessionId {
        self.id
    }

    pub fn is_new(&self) -> bool {
        self.access.is_new()
    }

    pub fn set_timeout(&mut self, timeout: Duration) {
        self.creation.set_timeout(timeout);
    }

    pub fn last_access_start_time(&self) -> Timestamp {
        self.creation.creation_time().saturating_add(self.access.since_creation())
    }

    pub fn last_access_end_time(&self) -> Timestamp {
        self.last_access_start_time().saturating_add(self.access.last_access())
    }

    /// Record a request that ran from `start` to `end`.
    ///
    /// Stored as durations from creation time; instants before the
    /// creation time (or an `end` before `start`) count as zero.
    pub fn set_last_access(&mut self, start: Timestamp, end: Timestamp) {
        let since_creation = start.duration_since(self.creation.creation_time());
        let last_access = end.duration_since(start);
        self.access.set_last_access_duration(since_creation, last_access);
    }

    pub fn is_expired(&self, now: Timestamp) -> bool {
        expired(self.creation.timeout(), self.last_access_end_time(), now)
    }

    /// The context payload, created by `supplier` on first request
    pub fn context(&self, supplier: impl FnOnce() -> C) -> &C {
        self.creation.context(supplier)
    }

    /// Commit the creation facet, then the access facet.
    ///
    /// Each facet only writes offsets it has not committed yet, so after a
    /// failure calling `commit` again retries just what is pending.
    pub fn commit(&mut self) -> Result<()> {
        self.creation.commit()?;
        self.access.commit()
    }

    /// Drop both views without writing anything
    pub fn discard(self) {
        self.creation.discard();
        self.access.discard();
    }
}

impl<C, M> CreationMetaData for MutableSessionMetaData<'_, C, M>
where
    C: Clone,
    M: Marshaller<C>,
{
    fn creation_time(&self) -> Timestamp {
        self.creation.creation_time()
    }

    fn timeout(&self) -> Duration {
        self.creation.timeout()
    }
}

/// Creates, finds and removes session metadata in a store
pub struct SessionMetaDataFactory<C, M = BincodeMarshaller<C>> {
    store: Arc<dyn KeyValueStore>,
    creation: CreationEntryMarshaller<M>,
    access: SessionAccessEntryMarshaller,
    config: MetadataConfig,
    _context: std::marker::PhantomData<fn() -> C>,
}

impl<C, M> SessionMetaDataFactory<C, M>
where
    C: Clone,
    M: Marshaller<C>,
{
    /// Factory over `store`, encoding contexts with `context`
    pub fn new(store: Arc<dyn KeyValueStore>, context: M, config: MetadataConfig) -> Self {
        Self {
            store,
            creation: CreationEntryMarshaller::new(context),
            access: SessionAccessEntryMarshaller,
            config,
            _context: std::marker::PhantomData,
        }
    }

    /// Store a new session created now.
    ///
    /// Fails with [`Error::AlreadyExists`] if the session is already stored.
    pub fn create(&self, id: SessionId, timeout: Duration) -> Result<SessionMetaData<C>> {
        let creation = CreationEntry::now().with_timeout(timeout);
        let access = SessionAccessEntry::default();

        let key = SessionCreationKey(id);
        let creation_bytes = self.creation.encode(&creation)?;
        let access_bytes = self.access.encode(&access)?;
        if self.store.put_if_absent(key.to_raw(), creation_bytes)?.is_some() {
            return Err(Error::already_exists(key));
        }
        if let Err(e) = self.store.put(SessionAccessKey(id).to_raw(), access_bytes) {
            // A lone creation entry would block every later create of this id
            if let Err(undo) = self.store.remove(&key.to_raw()) {
                error!("failed to roll back creation entry of session {}: {}", id, undo);
            }
            return Err(e);
        }

        debug!("created session {} (timeout {:?})", id, timeout);
        Ok(SessionMetaData::new(id, creation, access))
    }

    /// Store a new session with the configured default timeout
    pub fn create_default(&self, id: SessionId) -> Result<SessionMetaData<C>> {
        self.create(id, self.config.default_session_timeout())
    }

    /// Load both facets of a session.
    ///
    /// A session with only one facet stored is incomplete (being created or
    /// removed concurrently) and is reported as absent.
    pub fn find(&self, id: SessionId) -> Result<Option<SessionMetaData<C>>> {
        let creation = self.store.get(&SessionCreationKey(id).to_raw())?;
        let access = self.store.get(&SessionAccessKey(id).to_raw())?;

        match (creation, access) {
            (Some(creation), Some(access)) => Ok(Some(SessionMetaData::new(
                id,
                self.creation.decode(&creation)?,
                self.access.decode(&access)?,
            ))),
            (None, None) => Ok(None),
            (creation, _) => {
                warn!(
                    "session {} is incomplete (creation {}, access {})",
                    id,
                    if creation.is_some() { "present" } else { "missing" },
                    if creation.is_some() { "missing" } else { "present" },
                );
                Ok(None)
            }
        }
    }

    /// Mutation of the creation facet loaded as `entry`
    pub fn mutate_creation(
        &self,
        id: SessionId,
        entry: CreationEntry<C>,
    ) -> Mutation<'_, SessionCreationKey, MutableCreation<C>, CreationEntryMarshaller<M>> {
        Mutation::new(
            self.store.as_ref(),
            &self.creation,
            SessionCreationKey(id),
            MutableCreation::new(entry),
            self.config.skip_noop_commits,
        )
    }

    /// Mutation of the access facet loaded as `entry`
    pub fn mutate_access(
        &self,
        id: SessionId,
        entry: SessionAccessEntry,
    ) -> Mutation<'_, SessionAccessKey, MutableSessionAccess, SessionAccessEntryMarshaller> {
        Mutation::new(
            self.store.as_ref(),
            &self.access,
            SessionAccessKey(id),
            MutableSessionAccess::new(entry),
            self.config.skip_noop_commits,
        )
    }

    /// Mutation of both facets of a loaded session
    pub fn mutate(&self, metadata: SessionMetaData<C>) -> MutableSessionMetaData<'_, C, M> {
        let SessionMetaData {
            id,
            creation,
            access,
        } = metadata;
        MutableSessionMetaData {
            id,
            creation: self.mutate_creation(id, creation),
            access: self.mutate_access(id, access),
        }
    }

    /// Remove both facets; returns whether the session was stored
    pub fn remove(&self, id: SessionId) -> Result<bool> {
        let creation = self.store.remove(&SessionCreationKey(id).to_raw())?;
        let access = self.store.remove(&SessionAccessKey(id).to_raw())?;
        debug!("removed session {}", id);
        Ok(creation.is_some() || access.is_some())
    }

    /// Ids of all stored sessions
    pub fn ids(&self) -> Result<Vec<SessionId>> {
        let entries = self
            .store
            .scan(&MetaKeyFilter::Kind(KeyKind::SessionCreation))?;

        Ok(entries
            .into_iter()
            .filter_map(|(raw, _)| match SessionCreationKey::from_raw(&raw) {
                Ok(key) => Some(key.id()),
                Err(e) => {
                    warn!("skipping malformed session key {:?}: {}", raw, e);
                    None
                }
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clustermeta_common::config::StoreConfig;
    use clustermeta_store::{ComputeFn, KeyFilter, MemoryStore, RawKey};
    use rand::Rng;
    use std::thread;

    fn factory() -> (Arc<MemoryStore>, SessionMetaDataFactory<String>) {
        let store = Arc::new(MemoryStore::default());
        let factory = SessionMetaDataFactory::new(
            Arc::clone(&store) as Arc<dyn KeyValueStore>,
            BincodeMarshaller::new(),
            MetadataConfig::default(),
        );
        (store, factory)
    }

    fn secs(n: u64) -> Duration {
        Duration::from_secs(n)
    }

    /// Store whose plain `put` is unavailable
    struct RejectingPut(MemoryStore);

    impl KeyValueStore for RejectingPut {
        fn get(&self, key: &RawKey) -> Result<Option<Vec<u8>>> {
            self.0.get(key)
        }

        fn put(&self, _key: RawKey, _value: Vec<u8>) -> Result<()> {
            Err(Error::unavailable("put rejected"))
        }

        fn put_if_absent(&self, key: RawKey, value: Vec<u8>) -> Result<Option<Vec<u8>>> {
            self.0.put_if_absent(key, value)
        }

        fn remove(&self, key: &RawKey) -> Result<Option<Vec<u8>>> {
            self.0.remove(key)
        }

        fn compute(&self, key: &RawKey, f: &ComputeFn<'_>) -> Result<Vec<u8>> {
            self.0.compute(key, f)
        }

        fn scan(&self, filter: &dyn KeyFilter) -> Result<Vec<(RawKey, Vec<u8>)>> {
            self.0.scan(filter)
        }
    }

    #[test]
    fn test_create_and_find() {
        let (_, factory) = factory();
        let id = SessionId::new();

        let created = factory.create(id, secs(600)).unwrap();
        assert!(created.is_new());
        assert_eq!(created.timeout(), secs(600));

        let found = factory.find(id).unwrap().unwrap();
        assert_eq!(found, created);
        assert!(factory.find(SessionId::new()).unwrap().is_none());
    }

    #[test]
    fn test_create_twice_fails() {
        let (_, factory) = factory();
        let id = SessionId::new();

        factory.create_default(id).unwrap();
        let result = factory.create_default(id);
        assert_eq!(result.unwrap_err(), Error::already_exists(SessionCreationKey(id)));
    }

    #[test]
    fn test_create_default_uses_configured_timeout() {
        let (_, factory) = factory();
        let created = factory.create_default(SessionId::new()).unwrap();
        assert_eq!(created.timeout(), secs(1800));
    }

    #[test]
    fn test_half_present_session_is_absent() {
        let (store, factory) = factory();
        let id = SessionId::new();
        factory.create_default(id).unwrap();

        store.remove(&SessionAccessKey(id).to_raw()).unwrap();
        assert!(factory.find(id).unwrap().is_none());
    }

    #[test]
    fn test_mutate_session() {
        let (store, factory) = factory();
        let id = SessionId::new();
        let created = factory.create(id, secs(60)).unwrap();
        let creation_time = created.creation_time();

        let start = creation_time.saturating_add(secs(30));
        let end = start.saturating_add(secs(2));

        let mut session = factory.mutate(created);
        session.set_timeout(secs(120));
        session.set_last_access(start, end);
        session.context(|| "cart".to_string());

        // Reads see the pending values
        assert_eq!(session.timeout(), secs(120));
        assert_eq!(session.last_access_end_time(), end);
        assert!(!session.is_new());

        session.commit().unwrap();
        session.commit().unwrap();
        drop(session);
        assert_eq!(store.stats().snapshot().computes, 2);

        let found = factory.find(id).unwrap().unwrap();
        assert_eq!(found.timeout(), secs(120));
        assert_eq!(found.last_access_start_time(), start);
        assert_eq!(found.last_access_end_time(), end);
        assert_eq!(found.creation().context_if_present().map(String::as_str), Some("cart"));
    }

    #[test]
    fn test_write_after_commit_reaches_store() {
        let (_, factory) = factory();
        let id = SessionId::new();
        let mut session = factory.mutate(factory.create(id, secs(60)).unwrap());

        session.set_timeout(secs(120));
        session.commit().unwrap();
        session.set_timeout(secs(300));
        session.commit().unwrap();

        assert_eq!(factory.find(id).unwrap().unwrap().timeout(), secs(300));
    }

    #[test]
    fn test_failed_create_leaves_nothing_behind() {
        let store = Arc::new(RejectingPut(MemoryStore::default()));
        let factory = SessionMetaDataFactory::<String>::new(
            Arc::clone(&store) as Arc<dyn KeyValueStore>,
            BincodeMarshaller::new(),
            MetadataConfig::default(),
        );
        let id = SessionId::new();

        let err = factory.create_default(id).unwrap_err();
        assert!(err.is_retryable());
        assert!(store.0.is_empty());
        assert!(factory.find(id).unwrap().is_none());
    }

    #[test]
    fn test_expiration() {
        let (_, factory) = factory();
        let created = factory.create(SessionId::new(), secs(60)).unwrap();
        let end = created.last_access_end_time();

        assert!(!created.is_expired(end.saturating_add(secs(59))));
        assert!(created.is_expired(end.saturating_add(secs(60))));

        let immortal = factory.create(SessionId::new(), Duration::ZERO).unwrap();
        assert!(!immortal.is_expired(Timestamp::from_millis(i64::MAX)));
    }

    #[test]
    fn test_mutating_removed_session_fails() {
        let (_, factory) = factory();
        let id = SessionId::new();
        let created = factory.create_default(id).unwrap();
        assert!(factory.remove(id).unwrap());
        assert!(!factory.remove(id).unwrap());

        let mut access = factory.mutate_access(id, *created.access());
        access.set_last_access_duration(secs(1), secs(1));
        assert!(access.commit().unwrap_err().is_not_found());
        access.discard();
    }

    #[test]
    fn test_ids() {
        let (_, factory) = factory();
        let mut expected: Vec<SessionId> = (0..4).map(|_| SessionId::new()).collect();
        for id in &expected {
            factory.create_default(*id).unwrap();
        }

        let mut ids = factory.ids().unwrap();
        ids.sort();
        expected.sort();
        assert_eq!(ids, expected);
    }

    #[test]
    fn test_concurrent_requests_compose() {
        let store = Arc::new(MemoryStore::new(StoreConfig {
            max_compute_attempts: 10_000,
        }));
        let factory = SessionMetaDataFactory::<String>::new(
            Arc::clone(&store) as Arc<dyn KeyValueStore>,
            BincodeMarshaller::new(),
            MetadataConfig::default(),
        );
        let id = SessionId::new();
        let created = factory.create_default(id).unwrap();
        let factory = Arc::new(factory);

        // Each request extends since_creation by a random amount
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let factory = Arc::clone(&factory);
                let access = *created.access();
                thread::spawn(move || {
                    let mut rng = rand::thread_rng();
                    let mut total = Duration::ZERO;
                    for _ in 0..20 {
                        let step = Duration::from_millis(rng.gen_range(1..50));
                        let mut mutation = factory.mutate_access(id, access);
                        mutation.set_last_access_duration(step, Duration::ZERO);
                        mutation.commit().unwrap();
                        total += step;
                    }
                    total
                })
            })
            .collect();

        let expected: Duration = handles.into_iter().map(|h| h.join().unwrap()).sum();
        let found = factory.find(id).unwrap().unwrap();
        assert_eq!(found.access().since_creation(), expected);
        assert_eq!(store.stats().snapshot().computes, 80);
    }
}
