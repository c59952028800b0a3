//! Session access entry codec

use super::entry::SessionAccessEntry;
use crate::marshal::{Marshaller, decode_message, duration, encode_message, millis};
use clustermeta_common::Result;
use prost::Message;

#[derive(Clone, PartialEq, Message)]
struct SessionAccessEntryProto {
    #[prost(int64, tag = "1")]
    since_creation: i64,
    #[prost(int64, tag = "2")]
    last_access: i64,
}

/// Codec for [`SessionAccessEntry`]
#[derive(Clone, Copy, Debug, Default)]
pub struct SessionAccessEntryMarshaller;

impl Marshaller<SessionAccessEntry> for SessionAccessEntryMarshaller {
    fn encode(&self, entry: &SessionAccessEntry) -> Result<Vec<u8>> {
        Ok(encode_message(&SessionAccessEntryProto {
            since_creation: millis(entry.since_creation),
            last_access: millis(entry.last_access),
        }))
    }

    fn decode(&self, bytes: &[u8]) -> Result<SessionAccessEntry> {
        let proto: SessionAccessEntryProto = decode_message(bytes)?;
        Ok(SessionAccessEntry {
            since_creation: duration("since_creation", proto.since_creation)?,
            last_access: duration("last_access", proto.last_access)?,
        })
    }
}
