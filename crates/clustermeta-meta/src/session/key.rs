//! Store keys of the two session facets

use crate::key::{KeyKind, uuid_key};
use clustermeta_common::SessionId;

uuid_key!(
    /// Key of a session's creation entry (`sc:<uuid>`)
    SessionCreationKey(SessionId),
    KeyKind::SessionCreation
);

uuid_key!(
    /// Key of a session's access entry (`sa:<uuid>`)
    SessionAccessKey(SessionId),
    KeyKind::SessionAccess
);
