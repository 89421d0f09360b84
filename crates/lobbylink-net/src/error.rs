//! Error types for the network layer.

use lobbylink_protocol::ProtocolError;

/// Failures from the transport boundary or the control-message codec.
#[derive(Debug, thiserror::Error)]
pub enum NetError {
    /// The transport could not start or address the peer.
    #[error("transport error: {0}")]
    Transport(String),

    /// A control message could not be encoded.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
}
