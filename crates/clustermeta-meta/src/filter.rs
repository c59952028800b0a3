//! Key filters for keyspace scans
//!
//! Filters look at the raw key bytes only: the kind tag, and for
//! service-scoped index scans the service id that follows it. No value is
//! ever decoded to decide a match.

use crate::key::KeyKind;
use clustermeta_common::TimerServiceId;
use clustermeta_store::{KeyFilter, RawKey};

/// Selects metadata keys by kind
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MetaKeyFilter {
    /// Keys of exactly one kind
    Kind(KeyKind),
    /// Session and timer creation keys
    Creation,
    /// Session and timer access keys
    Access,
    /// Every timer index key
    TimerIndex,
    /// Timer index keys of one timer service (tag byte + service uuid)
    TimerIndexFor([u8; 17]),
}

impl MetaKeyFilter {
    /// Index keys belonging to `service`
    #[must_use]
    pub fn timer_index_for(service: TimerServiceId) -> Self {
        let mut prefix = [0u8; 17];
        prefix[0] = KeyKind::TimerIndex.tag();
        prefix[1..].copy_from_slice(service.as_bytes());
        Self::TimerIndexFor(prefix)
    }
}

impl KeyFilter for MetaKeyFilter {
    fn matches(&self, key: &RawKey) -> bool {
        match self {
            Self::Kind(kind) => key.kind_tag() == Some(kind.tag()),
            Self::Creation => KeyKind::of(key).is_some_and(KeyKind::is_creation),
            Self::Access => KeyKind::of(key).is_some_and(KeyKind::is_access),
            Self::TimerIndex => key.kind_tag() == Some(KeyKind::TimerIndex.tag()),
            Self::TimerIndexFor(prefix) => key.starts_with(prefix),
        }
    }

    fn prefix(&self) -> Option<&[u8]> {
        match self {
            Self::Kind(kind) => Some(kind.tag_bytes()),
            Self::TimerIndex => Some(KeyKind::TimerIndex.tag_bytes()),
            Self::TimerIndexFor(prefix) => Some(prefix.as_slice()),
            // Two kinds, no common prefix
            Self::Creation | Self::Access => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::key::MetaKey;
    use crate::session::{SessionAccessKey, SessionCreationKey};
    use crate::timer::{
        MethodIdentifier, TimerAccessKey, TimerCreationKey, TimerIndex, TimerIndexKey,
    };
    use clustermeta_common::{SessionId, TimerId};
    use clustermeta_store::{KeyValueStore, MemoryStore};

    fn index_key(service: TimerServiceId, occurrence: u32) -> TimerIndexKey {
        let method = MethodIdentifier::new("void", "onTimeout", Vec::<String>::new()).unwrap();
        TimerIndexKey::new(service, TimerIndex::new(method, occurrence))
    }

    fn populated() -> (MemoryStore, TimerServiceId) {
        let store = MemoryStore::default();
        let service = TimerServiceId::new();
        for _ in 0..3 {
            let session = SessionId::new();
            store.put(SessionCreationKey(session).to_raw(), vec![]).unwrap();
            store.put(SessionAccessKey(session).to_raw(), vec![]).unwrap();
        }
        for occurrence in 0..2 {
            let timer = TimerId::new();
            store.put(TimerCreationKey(timer).to_raw(), vec![]).unwrap();
            store.put(TimerAccessKey(timer).to_raw(), vec![]).unwrap();
            store.put(index_key(service, occurrence).to_raw(), vec![]).unwrap();
        }
        store.put(index_key(TimerServiceId::new(), 0).to_raw(), vec![]).unwrap();
        (store, service)
    }

    fn kinds(store: &MemoryStore, filter: MetaKeyFilter) -> Vec<KeyKind> {
        store
            .scan(&filter)
            .unwrap()
            .iter()
            .map(|(key, _)| KeyKind::of(key).unwrap())
            .collect()
    }

    #[test]
    fn test_creation_filter_selects_only_creation_keys() {
        let (store, _) = populated();
        let found = kinds(&store, MetaKeyFilter::Creation);

        assert_eq!(found.len(), 5);
        assert!(found.iter().all(|kind| kind.is_creation()));
    }

    #[test]
    fn test_access_filter() {
        let (store, _) = populated();
        let found = kinds(&store, MetaKeyFilter::Access);

        assert_eq!(found.len(), 5);
        assert!(found.iter().all(|kind| kind.is_access()));
    }

    #[test]
    fn test_kind_filter() {
        let (store, _) = populated();
        assert_eq!(kinds(&store, MetaKeyFilter::Kind(KeyKind::SessionCreation)).len(), 3);
        assert_eq!(kinds(&store, MetaKeyFilter::Kind(KeyKind::TimerAccess)).len(), 2);
        assert_eq!(kinds(&store, MetaKeyFilter::TimerIndex).len(), 3);
    }

    #[test]
    fn test_index_filter_scoped_to_service() {
        let (store, service) = populated();
        let found = store.scan(&MetaKeyFilter::timer_index_for(service)).unwrap();

        assert_eq!(found.len(), 2);
        for (raw, _) in found {
            assert_eq!(TimerIndexKey::from_raw(&raw).unwrap().service(), service);
        }
    }

    #[test]
    fn test_prefix_hints() {
        assert_eq!(MetaKeyFilter::Kind(KeyKind::SessionAccess).prefix(), Some(&b"a"[..]));
        assert_eq!(MetaKeyFilter::Creation.prefix(), None);
        let scoped = MetaKeyFilter::timer_index_for(TimerServiceId::new());
        assert_eq!(scoped.prefix().map(<[u8]>::len), Some(17));
    }

    #[test]
    fn test_malformed_keys_never_match() {
        let empty = RawKey::from_bytes(Vec::new());
        assert!(!MetaKeyFilter::Creation.matches(&empty));
        assert!(!MetaKeyFilter::Kind(KeyKind::TimerIndex).matches(&empty));
        assert!(!MetaKeyFilter::Access.matches(&RawKey::from_bytes(vec![b'z'])));
    }
}
