//! Entry codecs
//!
//! Entries are stored as protobuf messages behind a one-byte schema
//! version. Optional fields carry presence, unknown fields are skipped and
//! missing fields decode to their defaults, so entries written by an older
//! or newer minor schema still decode. Context payloads go through a
//! pluggable [`Marshaller`]; [`BincodeMarshaller`] handles any serde type.

use crate::entry::{Context, CreationEntry};
use clustermeta_common::{Error, Result, Timestamp, duration_from_millis, duration_to_millis};
use prost::Message;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::fmt;
use std::marker::PhantomData;
use std::time::Duration;

/// Schema version written in front of every encoded entry
pub const SCHEMA_VERSION: u8 = 1;

/// Converts values to and from their stored bytes
pub trait Marshaller<T>: Send + Sync {
    /// Encode `value`
    fn encode(&self, value: &T) -> Result<Vec<u8>>;

    /// Decode bytes produced by [`encode`](Self::encode)
    fn decode(&self, bytes: &[u8]) -> Result<T>;
}

/// Bincode codec for serde types
pub struct BincodeMarshaller<T>(PhantomData<fn() -> T>);

impl<T> BincodeMarshaller<T> {
    #[must_use]
    pub const fn new() -> Self {
        Self(PhantomData)
    }
}

impl<T> Default for BincodeMarshaller<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Clone for BincodeMarshaller<T> {
    fn clone(&self) -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for BincodeMarshaller<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("BincodeMarshaller")
    }
}

impl<T: Serialize + DeserializeOwned> Marshaller<T> for BincodeMarshaller<T> {
    fn encode(&self, value: &T) -> Result<Vec<u8>> {
        bincode::serialize(value).map_err(|e| Error::encode(e.to_string()))
    }

    fn decode(&self, bytes: &[u8]) -> Result<T> {
        bincode::deserialize(bytes).map_err(|e| Error::decode(e.to_string()))
    }
}

/// Prefix `message` with the schema version
pub(crate) fn encode_message<P: Message>(message: &P) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(1 + message.encoded_len());
    bytes.push(SCHEMA_VERSION);
    // Encoding into a Vec only fails on insufficient capacity, which a Vec grows
    let _ = message.encode(&mut bytes);
    bytes
}

/// Check the schema version and decode the message after it
pub(crate) fn decode_message<P: Message + Default>(bytes: &[u8]) -> Result<P> {
    let Some((&version, body)) = bytes.split_first() else {
        return Err(Error::decode("empty entry"));
    };
    if version == 0 || version > SCHEMA_VERSION {
        return Err(Error::decode(format!(
            "unsupported schema version {version} (supported up to {SCHEMA_VERSION})"
        )));
    }
    P::decode(body).map_err(|e| Error::decode(e.to_string()))
}

pub(crate) fn millis(duration: Duration) -> i64 {
    duration_to_millis(duration)
}

/// Stored millis back to a duration; negative values mean corruption
pub(crate) fn duration(field: &str, millis: i64) -> Result<Duration> {
    duration_from_millis(millis)
        .ok_or_else(|| Error::decode(format!("negative {field}: {millis}ms")))
}

#[derive(Clone, PartialEq, Message)]
pub(crate) struct CreationEntryProto {
    #[prost(int64, tag = "1")]
    pub creation_time: i64,
    #[prost(int64, tag = "2")]
    pub timeout: i64,
    #[prost(bytes = "vec", optional, tag = "3")]
    pub context: Option<Vec<u8>>,
}

pub(crate) fn creation_to_proto<C, M: Marshaller<C>>(
    entry: &CreationEntry<C>,
    context: &M,
) -> Result<CreationEntryProto> {
    Ok(CreationEntryProto {
        creation_time: entry.creation_time.as_millis(),
        timeout: millis(entry.timeout),
        context: entry.context_if_present().map(|c| context.encode(c)).transpose()?,
    })
}

pub(crate) fn creation_from_proto<C, M: Marshaller<C>>(
    proto: CreationEntryProto,
    context: &M,
) -> Result<CreationEntry<C>> {
    let context = match proto.context {
        Some(bytes) => Context::with_value(context.decode(&bytes)?),
        None => Context::empty(),
    };
    Ok(CreationEntry {
        creation_time: Timestamp::from_millis(proto.creation_time),
        timeout: duration("timeout", proto.timeout)?,
        context,
    })
}

/// Codec for [`CreationEntry`], with `M` encoding the context payload
#[derive(Clone, Debug, Default)]
pub struct CreationEntryMarshaller<M> {
    context: M,
}

impl<M> CreationEntryMarshaller<M> {
    /// Use `context` for context payloads
    pub const fn new(context: M) -> Self {
        Self { context }
    }
}

impl<C, M: Marshaller<C>> Marshaller<CreationEntry<C>> for CreationEntryMarshaller<M> {
    fn encode(&self, entry: &CreationEntry<C>) -> Result<Vec<u8>> {
        creation_to_proto(entry, &self.context).map(|proto| encode_message(&proto))
    }

    fn decode(&self, bytes: &[u8]) -> Result<CreationEntry<C>> {
        creation_from_proto(decode_message(bytes)?, &self.context)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entry::CreationMetaData;
    use serde::Deserialize;

    #[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
    struct Attributes {
        user: String,
        roles: Vec<String>,
    }

    type Creation = CreationEntryMarshaller<BincodeMarshaller<Attributes>>;

    fn attributes() -> Attributes {
        Attributes {
            user: "alice".into(),
            roles: vec!["admin".into(), "ops".into()],
        }
    }

    #[test]
    fn test_creation_roundtrip_without_context() {
        let marshaller = Creation::default();
        let entry = CreationEntry::new(Timestamp::from_millis(1_700_000_000_123))
            .with_timeout(Duration::from_secs(1800));

        let decoded = marshaller.decode(&marshaller.encode(&entry).unwrap()).unwrap();
        assert_eq!(decoded, entry);
        assert!(decoded.context_if_present().is_none());
    }

    #[test]
    fn test_creation_roundtrip_with_context() {
        let marshaller = Creation::default();
        let entry = CreationEntry::new(Timestamp::from_millis(-5))
            .with_timeout(Duration::ZERO)
            .with_context(attributes());

        let decoded = marshaller.decode(&marshaller.encode(&entry).unwrap()).unwrap();
        assert_eq!(decoded, entry);
        assert_eq!(decoded.context_if_present(), Some(&attributes()));
    }

    #[test]
    fn test_version_prefix() {
        let marshaller = Creation::default();
        let bytes = marshaller.encode(&CreationEntry::new(Timestamp::EPOCH)).unwrap();
        assert_eq!(bytes[0], SCHEMA_VERSION);

        let mut future = bytes.clone();
        future[0] = SCHEMA_VERSION + 1;
        assert!(matches!(marshaller.decode(&future), Err(Error::Decode(_))));
        assert!(matches!(marshaller.decode(&[]), Err(Error::Decode(_))));
    }

    #[test]
    fn test_unknown_fields_are_skipped() {
        #[derive(Clone, PartialEq, Message)]
        struct NewerCreationEntryProto {
            #[prost(int64, tag = "1")]
            creation_time: i64,
            #[prost(int64, tag = "2")]
            timeout: i64,
            #[prost(bytes = "vec", optional, tag = "3")]
            context: Option<Vec<u8>>,
            #[prost(string, optional, tag = "9")]
            owner: Option<String>,
        }

        let newer = NewerCreationEntryProto {
            creation_time: 42,
            timeout: 60_000,
            context: None,
            owner: Some("node-3".into()),
        };

        let decoded = Creation::default().decode(&encode_message(&newer)).unwrap();
        assert_eq!(decoded.creation_time(), Timestamp::from_millis(42));
        assert_eq!(decoded.timeout(), Duration::from_secs(60));
    }

    #[test]
    fn test_missing_fields_decode_to_defaults() {
        let decoded = Creation::default().decode(&[SCHEMA_VERSION]).unwrap();
        assert_eq!(decoded, CreationEntry::new(Timestamp::EPOCH));
    }

    #[test]
    fn test_negative_timeout_is_corrupt() {
        let proto = CreationEntryProto {
            creation_time: 0,
            timeout: -1,
            context: None,
        };
        let result = Creation::default().decode(&encode_message(&proto));
        assert!(matches!(result, Err(Error::Decode(_))));
    }

    #[test]
    fn test_corrupt_context_fails_whole_entry() {
        let proto = CreationEntryProto {
            creation_time: 0,
            timeout: 0,
            context: Some(vec![0xff]),
        };
        let result = Creation::default().decode(&encode_message(&proto));
        assert!(matches!(result, Err(Error::Decode(_))));
    }
}
