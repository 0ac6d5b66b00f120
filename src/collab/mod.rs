//! The world outside a single hop: who this host is, where routes are recorded, how they
//! travel on and where each visit is journaled.
//!
//! Every collaborator sits behind an async trait so the relay can run against real
//! infrastructure in production and in-process doubles in tests.

pub(crate) mod forward;
pub(crate) mod identity;
pub(crate) mod journal;
pub(crate) mod store;

pub use forward::{Forwarder, HttpForwarder};
pub use identity::{IdentityKind, IdentityProvider, MetadataIdentity, StaticIdentity};
pub use journal::Journal;
pub use store::{FileStore, MemoryStore, RouteStore, merge_route};
