//! Raw store keys

use std::cmp::Ordering;
use std::fmt;

/// Key as the store sees it: opaque bytes.
///
/// Keys produced by the metadata layer start with a one-byte kind tag so
/// that scans can select a kind of key without decoding anything:
/// - Session creation: `c{session_id}`
/// - Session access: `a{session_id}`
/// - Timer creation: `t{timer_id}`
/// - Timer access: `l{timer_id}`
/// - Timer index: `i{service_id}{method}{occurrence}`
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct RawKey(pub Vec<u8>);

impl RawKey {
    /// Create from raw bytes
    #[must_use]
    pub const fn from_bytes(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    /// Get the raw bytes
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Consume into the raw bytes
    #[must_use]
    pub fn into_bytes(self) -> Vec<u8> {
        self.0
    }

    /// Get the key kind tag (first byte)
    #[must_use]
    pub fn kind_tag(&self) -> Option<u8> {
        self.0.first().copied()
    }

    /// Check whether the key starts with `prefix`
    #[must_use]
    pub fn starts_with(&self, prefix: &[u8]) -> bool {
        self.0.starts_with(prefix)
    }

    /// Key length in bytes
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Check if the key is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Ord for RawKey {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.cmp(&other.0)
    }
}

impl PartialOrd for RawKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl AsRef<[u8]> for RawKey {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl From<Vec<u8>> for RawKey {
    fn from(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }
}

impl fmt::Debug for RawKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RawKey(")?;
        for b in &self.0 {
            write!(f, "{b:02x}")?;
        }
        write!(f, ")")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raw_key_ordering() {
        let k1 = RawKey::from_bytes(vec![b'a', 1]);
        let k2 = RawKey::from_bytes(vec![b'a', 2]);
        let k3 = RawKey::from_bytes(vec![b'c', 0]);

        assert!(k1 < k2);
        assert!(k2 < k3);
    }

    #[test]
    fn test_raw_key_accessors() {
        let key = RawKey::from(vec![b't', 9, 9]);
        assert_eq!(key.kind_tag(), Some(b't'));
        assert!(key.starts_with(b"t"));
        assert_eq!(key.len(), 3);
        assert_eq!(format!("{key:?}"), "RawKey(740909)");
        assert_eq!(RawKey::from_bytes(Vec::new()).kind_tag(), None);
    }
}
