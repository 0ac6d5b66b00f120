#![forbid(unsafe_code)]
//! Pass a postcard around a ring of hosts.
//!
//! A [`Route`] travels from host to host over HTTP. Each host stamps its arrival and
//! departure times, drops its own stamp image onto the postcard the route carries and
//! hands the route to the next host, until the last host closes the circuit with a
//! summary of the total transit time.

pub mod collab;
pub mod config;
mod foundation;
pub mod postcard;
pub mod relay;
pub mod route;

pub use collab::{
    FileStore, Forwarder, HttpForwarder, IdentityKind, IdentityProvider, Journal, MemoryStore,
    MetadataIdentity, RouteStore, StaticIdentity,
};
pub use config::{Config, ConfigError};
pub use foundation::error::{RelayError, RelayResult};
pub use postcard::{Bitmap, Compositor, OverlaySet};
pub use relay::{HopReport, HopState, Origination, Relay, RelaySettings, advance, router};
pub use route::{CANONICAL_ORDER, Direction, Hop, Host, Node, Route};
