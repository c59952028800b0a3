//! Session metadata
//!
//! A session is stored as two entries: the creation facet (creation time,
//! timeout, context) under [`SessionCreationKey`], and the access facet
//! (durations describing the last request) under [`SessionAccessKey`].
//! The access facet changes on every request; keeping it apart keeps those
//! writes off the creation key.

mod entry;
mod factory;
mod function;
mod key;
mod marshal;
mod view;

pub use entry::SessionAccessEntry;
pub use factory::{MutableSessionMetaData, SessionMetaData, SessionMetaDataFactory};
pub use function::SessionAccessEntryFunction;
pub use key::{SessionAccessKey, SessionCreationKey};
pub use marshal::SessionAccessEntryMarshaller;
pub use view::MutableSessionAccess;
