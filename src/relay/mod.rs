//! One host's part in a circuit: the hop state machine, the shared relay context and
//! its HTTP surface.

pub(crate) mod http;
pub(crate) mod service;
pub(crate) mod state;

pub use http::router;
pub use service::{Origination, Relay, RelaySettings, normalize_payload};
pub use state::{HopReport, HopState, advance};
