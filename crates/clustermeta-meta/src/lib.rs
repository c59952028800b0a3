//! clustermeta Metadata - replicated session and timer metadata
//!
//! Lifecycle metadata (creation time, timeout, last access, last timer
//! expiration) lives in a replicated store that only offers atomic
//! single-key read-modify-write. A request works against a mutable view:
//!
//! 1. Load the stored entry and wrap it in a view
//! 2. Read and write through the view; writes only record offsets
//! 3. Commit once: the view's offsets become an entry function that the
//!    store applies atomically to whatever value is current at that time
//!
//! Offsets are relative, so concurrent requests extending the same
//! session compose without distributed locks.
//!
//! # Keys
//! Creation and access facets live under separate keys so the rarely
//! written creation facet never contends with per-request access updates.
//! Every key starts with a kind tag, which lets [`MetaKeyFilter`] select a
//! kind of key during scans without decoding anything.

pub mod entry;
pub mod filter;
pub mod function;
pub mod key;
pub mod marshal;
pub mod mutator;
pub mod offset;
pub mod session;
pub mod timer;
pub mod view;

// Re-exports
pub use entry::{Context, CreationEntry, CreationMetaData};
pub use filter::MetaKeyFilter;
pub use function::{CreationEntryFunction, EntryFunction};
pub use key::{KeyKind, MetaKey};
pub use marshal::{BincodeMarshaller, CreationEntryMarshaller, Marshaller, SCHEMA_VERSION};
pub use mutator::{Mutation, MutableView};
pub use offset::{OffsetValue, Offsettable};
pub use view::MutableCreation;
pub use session::{MutableSessionMetaData, SessionMetaData, SessionMetaDataFactory};
pub use timer::{TimerCreation, TimerMetaData, TimerMetaDataFactory};
