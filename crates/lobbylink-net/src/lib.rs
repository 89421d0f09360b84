//! Network-session integration for Lobbylink.
//!
//! [`NetTransport`] is the boundary to whatever carries game traffic;
//! [`NetworkSessionAdapter`] binds it to session semantics: connection
//! authorization on the host side, the shutdown control message on both
//! sides, and the in-game admission gate.

mod adapter;
mod error;
#[cfg(any(test, feature = "testutil"))]
pub mod testsupport;
mod transport;

pub use adapter::{AdapterSignal, NetworkSessionAdapter};
pub use error::NetError;
pub use transport::{NetTransport, TransportEvent};
