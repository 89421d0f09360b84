//! The user-facing failure taxonomy and the protocol-level error type.
//!
//! [`ErrorKind`] is deliberately *not* a `std::error::Error`: failures in
//! the coordination core travel inside terminal events, never as unwound
//! errors, and `ErrorKind` is the tag those events carry. [`ProtocolError`]
//! is a real error type for the one place this crate can genuinely fail —
//! encoding/decoding control messages.

use serde::{Deserialize, Serialize};

/// Flat taxonomy of every user-facing failure the session core can report.
///
/// Produced by mapping functions (enter-response mapping, disconnect-reason
/// mapping, guard rejections) and consumed by error-display collaborators.
/// The set is closed on purpose: UI code matches on it exhaustively.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorKind {
    ConnectionFailed,
    LobbyFull,
    AlreadyInLobby,
    Timeout,
    HostExit,
    Kicked,
    LobbyCreationFailed,
    ConnectionLost,
    LobbyNotFound,
    AccessDenied,
    Banned,
    CommunityBanned,
    MemberBlocked,
    YouBlockedMember,
    RateLimitExceeded,
    LimitedAccount,
    ClanDisabled,
    GenericJoinError,
    Unknown,
}

impl ErrorKind {
    /// A short English message suitable for an error popup.
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::ConnectionFailed => "Could not connect to the service.",
            Self::LobbyFull => "The lobby is full.",
            Self::AlreadyInLobby => "Leave your current lobby first.",
            Self::Timeout => "The operation timed out.",
            Self::HostExit => "The host left the lobby.",
            Self::Kicked => "You were kicked from the lobby.",
            Self::LobbyCreationFailed => "Could not create the lobby.",
            Self::ConnectionLost => "Connection to the session was lost.",
            Self::LobbyNotFound => "Lobby not found.",
            Self::AccessDenied => "Access to this lobby is denied.",
            Self::Banned => "You are banned from this lobby.",
            Self::CommunityBanned => "Your account is community banned.",
            Self::MemberBlocked => "A lobby member has blocked you.",
            Self::YouBlockedMember => "You have blocked a lobby member.",
            Self::RateLimitExceeded => {
                "Too many requests — try again shortly."
            }
            Self::LimitedAccount => "Your account is limited and cannot join.",
            Self::ClanDisabled => "Community chat rooms are disabled.",
            Self::GenericJoinError => "Could not enter the lobby.",
            Self::Unknown => "An unknown error occurred.",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.user_message())
    }
}

/// Errors the protocol layer itself can produce.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Serializing a control message failed.
    #[cfg(feature = "json")]
    #[error("encode failed: {0}")]
    Encode(serde_json::Error),

    /// A received control frame could not be parsed. Common causes:
    /// truncated frames, or a peer speaking a different protocol version.
    #[cfg(feature = "json")]
    #[error("decode failed: {0}")]
    Decode(serde_json::Error),

    /// The frame parsed but violates a protocol rule.
    #[error("invalid message: {0}")]
    InvalidMessage(String),
}
