//! The network transport boundary.
//!
//! The session core never speaks to sockets. [`NetTransport`] is the seam
//! to whatever carries game traffic; the core only starts/stops sessions,
//! pushes one control frame, and reacts to [`TransportEvent`]s.

use lobbylink_protocol::PeerId;

use crate::NetError;

/// Notifications from the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// A peer asked to connect to the local host session. The adapter
    /// decides whether to admit or disconnect it.
    ConnectionRequested { peer: PeerId },
    /// The local client session lost its connection to the host.
    ClientDisconnected,
    /// A control frame arrived on the client session.
    ControlReceived { frame: Vec<u8> },
}

/// Operations the session core performs against the transport.
///
/// Peers are addressed by their presence-service [`PeerId`]; the transport
/// owns the mapping to real endpoints.
pub trait NetTransport {
    /// Starts a host session accepting incoming connections.
    ///
    /// # Errors
    /// Returns an error if the host session cannot start.
    fn start_host(&mut self) -> Result<(), NetError>;

    /// Stops the host session. No-op if not hosting.
    fn stop_host(&mut self);

    /// Starts a client session toward `host`.
    ///
    /// # Errors
    /// Returns an error if the connection attempt cannot start.
    fn start_client(&mut self, host: PeerId) -> Result<(), NetError>;

    /// Stops the client session. No-op if not connected.
    fn stop_client(&mut self);

    /// Whether a host session is running.
    fn host_active(&self) -> bool;

    /// Whether a client session is running.
    fn client_active(&self) -> bool;

    /// Caps the number of simultaneous connections the host accepts.
    fn set_max_connections(&mut self, max: u32);

    /// Sends a control frame to every connected client.
    fn broadcast(&mut self, frame: &[u8]);

    /// Forcibly drops `peer` from the host session.
    fn disconnect(&mut self, peer: PeerId);
}
