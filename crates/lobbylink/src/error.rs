//! The crate-level error type.

use lobbylink_net::NetError;
use lobbylink_presence::{GatewayError, PresenceError};
use lobbylink_protocol::ProtocolError;

use crate::prefs::PrefsError;

/// Any genuine Rust error the session layer can produce.
///
/// User-facing failures are not here — those travel as `ErrorKind` tags
/// inside session events.
#[derive(Debug, thiserror::Error)]
pub enum LobbylinkError {
    #[error(transparent)]
    Prefs(#[from] PrefsError),

    #[error(transparent)]
    Gateway(#[from] GatewayError),

    #[error(transparent)]
    Presence(#[from] PresenceError),

    #[error(transparent)]
    Net(#[from] NetError),

    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// The driver task is gone; no further commands can be delivered.
    #[error("session driver is no longer running")]
    DriverClosed,
}
