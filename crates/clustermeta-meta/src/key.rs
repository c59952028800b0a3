//! Metadata key kinds and their canonical encodings
//!
//! Every key has two lossless forms:
//! - bytes (`[kind tag][payload]`), handed to the store and scanned by
//!   [`MetaKeyFilter`](crate::MetaKeyFilter)
//! - a string (`<code>:<payload>`), for external key routing and logs

use clustermeta_common::{Error, Result};
use clustermeta_store::RawKey;
use std::fmt;
use std::str::FromStr;

/// The kind of entry a key addresses
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum KeyKind {
    SessionCreation,
    SessionAccess,
    TimerCreation,
    TimerAccess,
    TimerIndex,
}

impl KeyKind {
    /// All kinds
    pub const ALL: [Self; 5] = [
        Self::SessionCreation,
        Self::SessionAccess,
        Self::TimerCreation,
        Self::TimerAccess,
        Self::TimerIndex,
    ];

    /// First byte of every raw key of this kind
    #[must_use]
    pub const fn tag(self) -> u8 {
        self.tag_bytes()[0]
    }

    /// The tag as a one-byte slice (usable as a scan prefix)
    #[must_use]
    pub const fn tag_bytes(self) -> &'static [u8] {
        match self {
            Self::SessionCreation => b"c",
            Self::SessionAccess => b"a",
            Self::TimerCreation => b"t",
            Self::TimerAccess => b"l",
            Self::TimerIndex => b"i",
        }
    }

    /// Prefix of the string form
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::SessionCreation => "sc",
            Self::SessionAccess => "sa",
            Self::TimerCreation => "tc",
            Self::TimerAccess => "ta",
            Self::TimerIndex => "ti",
        }
    }

    /// Look up a kind by its tag byte
    #[must_use]
    pub fn from_tag(tag: u8) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.tag() == tag)
    }

    /// Look up a kind by its string code
    #[must_use]
    pub fn from_code(code: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.code() == code)
    }

    /// Kind of a raw key, read from its first byte
    #[must_use]
    pub fn of(key: &RawKey) -> Option<Self> {
        key.kind_tag().and_then(Self::from_tag)
    }

    /// Creation facet of a session or timer
    #[must_use]
    pub const fn is_creation(self) -> bool {
        matches!(self, Self::SessionCreation | Self::TimerCreation)
    }

    /// Access facet of a session or timer
    #[must_use]
    pub const fn is_access(self) -> bool {
        matches!(self, Self::SessionAccess | Self::TimerAccess)
    }
}

impl fmt::Display for KeyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// A typed metadata key
pub trait MetaKey: Sized + Clone + fmt::Display + FromStr<Err = Error> {
    /// Kind of entry this key addresses
    const KIND: KeyKind;

    /// Canonical byte form
    fn to_raw(&self) -> RawKey;

    /// Parse the canonical byte form
    fn from_raw(raw: &RawKey) -> Result<Self>;
}

/// `[tag][16 uuid bytes]`
pub(crate) fn encode_uuid_key(kind: KeyKind, id: &[u8; 16]) -> RawKey {
    let mut key = Vec::with_capacity(17);
    key.push(kind.tag());
    key.extend_from_slice(id);
    RawKey::from_bytes(key)
}

pub(crate) fn decode_uuid_key(kind: KeyKind, raw: &RawKey) -> Result<[u8; 16]> {
    let mut reader = KeyReader::new(kind, raw)?;
    let id = reader.read_uuid()?;
    reader.finish()?;
    Ok(id)
}

/// Strip `<code>:` from the string form of a key
pub(crate) fn strip_code(kind: KeyKind, s: &str) -> Result<&str> {
    s.strip_prefix(kind.code())
        .and_then(|rest| rest.strip_prefix(':'))
        .ok_or_else(|| Error::invalid_argument(format!("'{s}' is not a {kind} key")))
}

/// Appends the length-prefixed parts of a composite key
pub(crate) struct KeyWriter(Vec<u8>);

impl KeyWriter {
    pub(crate) fn new(kind: KeyKind) -> Self {
        Self(vec![kind.tag()])
    }

    pub(crate) fn uuid(mut self, id: &[u8; 16]) -> Self {
        self.0.extend_from_slice(id);
        self
    }

    pub(crate) fn u16(mut self, value: u16) -> Self {
        self.0.extend_from_slice(&value.to_be_bytes());
        self
    }

    pub(crate) fn u32(mut self, value: u32) -> Self {
        // Big-endian keeps raw key order consistent with numeric order
        self.0.extend_from_slice(&value.to_be_bytes());
        self
    }

    /// Strings longer than `u16::MAX` bytes are rejected when the owning
    /// type is constructed, so the length always fits.
    pub(crate) fn str(self, value: &str) -> Self {
        let len = u16::try_from(value.len()).unwrap_or(u16::MAX);
        let mut this = self.u16(len);
        this.0.extend_from_slice(&value.as_bytes()[..usize::from(len)]);
        this
    }

    pub(crate) fn finish(self) -> RawKey {
        RawKey::from_bytes(self.0)
    }
}

/// Reads the parts of a raw key back, failing on truncation or trailing bytes
pub(crate) struct KeyReader<'a> {
    kind: KeyKind,
    rest: &'a [u8],
}

impl<'a> KeyReader<'a> {
    pub(crate) fn new(kind: KeyKind, raw: &'a RawKey) -> Result<Self> {
        match raw.as_bytes().split_first() {
            Some((&tag, rest)) if tag == kind.tag() => Ok(Self { kind, rest }),
            _ => Err(Error::decode(format!("{raw:?} is not a {kind} key"))),
        }
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8]> {
        if self.rest.len() < n {
            return Err(Error::decode(format!("truncated {} key", self.kind)));
        }
        let (head, tail) = self.rest.split_at(n);
        self.rest = tail;
        Ok(head)
    }

    pub(crate) fn read_uuid(&mut self) -> Result<[u8; 16]> {
        let bytes = self.take(16)?;
        let mut id = [0u8; 16];
        id.copy_from_slice(bytes);
        Ok(id)
    }

    pub(crate) fn read_u16(&mut self) -> Result<u16> {
        let bytes = self.take(2)?;
        Ok(u16::from_be_bytes([bytes[0], bytes[1]]))
    }

    pub(crate) fn read_u32(&mut self) -> Result<u32> {
        let bytes = self.take(4)?;
        Ok(u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    pub(crate) fn read_str(&mut self) -> Result<String> {
        let len = self.read_u16()?;
        let bytes = self.take(usize::from(len))?;
        String::from_utf8(bytes.to_vec())
            .map_err(|e| Error::decode(format!("invalid {} key: {e}", self.kind)))
    }

    pub(crate) fn finish(self) -> Result<()> {
        if self.rest.is_empty() {
            Ok(())
        } else {
            Err(Error::decode(format!(
                "{} trailing bytes in {} key",
                self.rest.len(),
                self.kind
            )))
        }
    }
}

/// Declares a key that addresses one entry per entity id
macro_rules! uuid_key {
    ($(#[$meta:meta])* $name:ident($id:ty), $kind:expr) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(pub $id);

        impl $name {
            /// Id of the entity this key belongs to
            #[must_use]
            pub const fn id(&self) -> $id {
                self.0
            }
        }

        impl $crate::key::MetaKey for $name {
            const KIND: $crate::key::KeyKind = $kind;

            fn to_raw(&self) -> ::clustermeta_store::RawKey {
                $crate::key::encode_uuid_key(Self::KIND, self.0.as_bytes())
            }

            fn from_raw(raw: &::clustermeta_store::RawKey) -> ::clustermeta_common::Result<Self> {
                $crate::key::decode_uuid_key(Self::KIND, raw)
                    .map(|bytes| Self(<$id>::from_bytes(bytes)))
            }
        }

        impl ::std::fmt::Display for $name {
            fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                write!(f, "{}:{}", <Self as $crate::key::MetaKey>::KIND.code(), self.0)
            }
        }

        impl ::std::str::FromStr for $name {
            type Err = ::clustermeta_common::Error;

            fn from_str(s: &str) -> ::std::result::Result<Self, Self::Err> {
                let id = $crate::key::strip_code(<Self as $crate::key::MetaKey>::KIND, s)?;
                id.parse().map(Self)
            }
        }
    };
}

pub(crate) use uuid_key;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_tags_are_distinct() {
        for kind in KeyKind::ALL {
            assert_eq!(KeyKind::from_tag(kind.tag()), Some(kind));
            assert_eq!(KeyKind::from_code(kind.code()), Some(kind));
            assert_eq!(kind.tag_bytes(), &[kind.tag()]);
        }
        assert_eq!(KeyKind::from_tag(b'z'), None);
        assert_eq!(KeyKind::from_code("zz"), None);
    }

    #[test]
    fn test_kind_of_raw_key() {
        let raw = encode_uuid_key(KeyKind::TimerAccess, &[1u8; 16]);
        assert_eq!(KeyKind::of(&raw), Some(KeyKind::TimerAccess));
        assert_eq!(KeyKind::of(&RawKey::from_bytes(Vec::new())), None);
    }

    #[test]
    fn test_uuid_key_decode_checks() {
        let raw = encode_uuid_key(KeyKind::SessionCreation, &[9u8; 16]);
        assert_eq!(decode_uuid_key(KeyKind::SessionCreation, &raw).unwrap(), [9u8; 16]);

        // Wrong kind
        assert!(decode_uuid_key(KeyKind::SessionAccess, &raw).is_err());

        // Truncated and trailing bytes
        let mut short = raw.clone().into_bytes();
        short.pop();
        assert!(decode_uuid_key(KeyKind::SessionCreation, &RawKey::from_bytes(short)).is_err());
        let mut long = raw.into_bytes();
        long.push(0);
        assert!(decode_uuid_key(KeyKind::SessionCreation, &RawKey::from_bytes(long)).is_err());
    }

    #[test]
    fn test_writer_reader_roundtrip() {
        let raw = KeyWriter::new(KeyKind::TimerIndex)
            .uuid(&[3u8; 16])
            .str("void")
            .u32(7)
            .finish();

        let mut reader = KeyReader::new(KeyKind::TimerIndex, &raw).unwrap();
        assert_eq!(reader.read_uuid().unwrap(), [3u8; 16]);
        assert_eq!(reader.read_str().unwrap(), "void");
        assert_eq!(reader.read_u32().unwrap(), 7);
        assert!(reader.finish().is_ok());
    }

    #[test]
    fn test_strip_code() {
        assert_eq!(strip_code(KeyKind::SessionAccess, "sa:abc").unwrap(), "abc");
        assert!(strip_code(KeyKind::SessionAccess, "sc:abc").is_err());
        assert!(strip_code(KeyKind::SessionAccess, "saabc").is_err());
    }
}
