//! Timer facet keys and the service-scoped index key

use super::index::{MethodIdentifier, TimerIndex};
use crate::key::{KeyKind, KeyReader, KeyWriter, MetaKey, strip_code, uuid_key};
use clustermeta_common::{Error, Result, TimerId, TimerServiceId};
use clustermeta_store::RawKey;
use std::fmt;
use std::str::FromStr;

uuid_key!(
    /// Key of a timer's creation entry (`tc:<uuid>`)
    TimerCreationKey(TimerId),
    KeyKind::TimerCreation
);

uuid_key!(
    /// Key of a timer's access entry (`ta:<uuid>`)
    TimerAccessKey(TimerId),
    KeyKind::TimerAccess
);

/// Key claiming a [`TimerIndex`] within one timer service.
///
/// The stored value is the id of the timer holding the index.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerIndexKey {
    service: TimerServiceId,
    index: TimerIndex,
}

impl TimerIndexKey {
    #[must_use]
    pub const fn new(service: TimerServiceId, index: TimerIndex) -> Self {
        Self { service, index }
    }

    pub const fn service(&self) -> TimerServiceId {
        self.service
    }

    pub const fn index(&self) -> &TimerIndex {
        &self.index
    }

    pub fn into_index(self) -> TimerIndex {
        self.index
    }
}

impl MetaKey for TimerIndexKey {
    const KIND: KeyKind = KeyKind::TimerIndex;

    fn to_raw(&self) -> RawKey {
        let method = self.index.method();
        let parameters = method.parameter_types();
        // Lengths are bounded by MethodIdentifier validation
        let mut writer = KeyWriter::new(Self::KIND)
            .uuid(self.service.as_bytes())
            .str(method.return_type())
            .str(method.name())
            .u16(u16::try_from(parameters.len()).unwrap_or(u16::MAX));
        for parameter in parameters {
            writer = writer.str(parameter);
        }
        writer.u32(self.index.occurrence()).finish()
    }

    fn from_raw(raw: &RawKey) -> Result<Self> {
        let mut reader = KeyReader::new(Self::KIND, raw)?;
        let service = TimerServiceId::from_bytes(reader.read_uuid()?);
        let return_type = reader.read_str()?;
        let name = reader.read_str()?;
        let count = reader.read_u16()?;
        let parameters = (0..count).map(|_| reader.read_str()).collect::<Result<Vec<_>>>()?;
        let occurrence = reader.read_u32()?;
        reader.finish()?;

        let method = MethodIdentifier::new(return_type, name, parameters)
            .map_err(|e| Error::decode(format!("invalid timer index key: {e}")))?;
        Ok(Self::new(service, TimerIndex::new(method, occurrence)))
    }
}

impl fmt::Display for TimerIndexKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", Self::KIND.code(), self.service, self.index)
    }
}

impl FromStr for TimerIndexKey {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let rest = strip_code(Self::KIND, s)?;
        let (service, index) = rest
            .split_once(':')
            .ok_or_else(|| Error::invalid_argument(format!("'{s}' has no timer index")))?;
        Ok(Self::new(service.parse()?, index.parse()?))
    }
}
