//! Error types for the presence layer.

/// Failures reported by a [`PresenceService`](crate::PresenceService)
/// implementation when a request cannot even be issued.
///
/// Completions that fail *after* a request was accepted arrive as events
/// (`Created { lobby: None }`, a non-success `Entered` response) — this
/// type only covers the synchronous half.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PresenceError {
    /// The service is not initialized or has lost its backend session.
    #[error("presence service is not ready")]
    NotReady,

    /// The backend rejected the request outright.
    #[error("presence backend error: {0}")]
    Backend(String),
}

/// Guard rejections from [`PresenceGateway`](crate::PresenceGateway)
/// entry points.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GatewayError {
    /// A create or join request is already in flight.
    #[error("another lobby operation is already in flight")]
    Busy,

    /// A lobby is already held; leave it first.
    #[error("already in a lobby")]
    AlreadyInLobby,

    /// The underlying service refused the request.
    #[error(transparent)]
    Service(#[from] PresenceError),
}
