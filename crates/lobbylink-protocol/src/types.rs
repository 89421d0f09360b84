//! Core types shared by every Lobbylink layer.
//!
//! These are the structures that cross component boundaries: identifiers
//! for lobbies and peers, the enter-response codes the presence service
//! reports, disconnect reasons, and the one control message that travels
//! over the network transport ([`ShutdownMessage`]).

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Identity types
// ---------------------------------------------------------------------------

/// A unique identifier for a lobby on the presence service.
///
/// Newtype over `u64` so a lobby id can't be confused with a peer id even
/// though both are plain integers underneath. There is no "nil" value —
/// code that may or may not hold a lobby uses `Option<LobbyId>`.
///
/// `#[serde(transparent)]` serializes this as the bare number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LobbyId(pub u64);

impl fmt::Display for LobbyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "L-{}", self.0)
    }
}

/// A unique identifier for a participant on the presence service.
///
/// Identifies the local user, lobby hosts, lobby members, and incoming
/// transport connections (the transport addresses peers by this id).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PeerId(pub u64);

impl fmt::Display for PeerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "U-{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Lobby classification
// ---------------------------------------------------------------------------

/// The advertised visibility of a lobby.
///
/// This is *metadata*, not a property the presence service enforces: every
/// lobby is created as publicly enumerable and the kind is published as a
/// data key. Enforcement happens in the join path (private lobbies require
/// an invite permit or the join code) and in connection authorization
/// (friends lobbies require the host to be a contact, or a code join).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LobbyKind {
    #[default]
    Public,
    Friends,
    Private,
}

impl LobbyKind {
    /// The string form stored under [`keys::KIND`] in lobby metadata.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Public => "public",
            Self::Friends => "friends",
            Self::Private => "private",
        }
    }

    /// Parses the metadata string form. Unknown or missing values are
    /// treated as public (the least restrictive reading).
    pub fn parse(s: &str) -> Self {
        match s {
            "friends" => Self::Friends,
            "private" => Self::Private,
            _ => Self::Public,
        }
    }
}

impl fmt::Display for LobbyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where a session currently is in its life, advertised as lobby metadata
/// so list browsers can filter out lobbies that are mid-game or closing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionPhase {
    /// Gathered in the lobby, joinable.
    Lobby,
    /// A game is running; new connections are rejected.
    Game,
    /// The host is tearing down; the advertisement is stale.
    Closed,
}

impl SessionPhase {
    /// The string form stored under [`keys::PHASE`] in lobby metadata.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Lobby => "lobby",
            Self::Game => "game",
            Self::Closed => "closed",
        }
    }
}

impl fmt::Display for SessionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Enter responses
// ---------------------------------------------------------------------------

/// The presence service's verdict on a lobby join attempt.
///
/// Delivered asynchronously in the enter event. Everything except
/// `Success` is a failure; the join flow maps each failure to an
/// [`ErrorKind`](crate::ErrorKind) and a hard/soft classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EnterResponse {
    /// The local peer is now a member of the lobby.
    Success,
    /// The lobby has no free member slots.
    Full,
    /// The lobby id does not (or no longer does) refer to a lobby.
    DoesntExist,
    /// Membership was refused (also produced locally when a private-lobby
    /// join is reversed for lack of an invite permit).
    NotAllowed,
    /// The local peer is banned from this lobby.
    Banned,
    /// The local peer's account is community-banned.
    CommunityBanned,
    /// A member of the lobby has blocked the local peer.
    MemberBlockedYou,
    /// The local peer has blocked a member of the lobby.
    YouBlockedMember,
    /// Too many join attempts in a short window.
    RateLimited,
    /// The local peer's account is limited and may not join.
    Limited,
    /// Community chat rooms are disabled for this lobby.
    ClanDisabled,
    /// Any other non-success response.
    Error,
}

impl EnterResponse {
    /// Convenience probe used by stale-event filters.
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success)
    }
}

// ---------------------------------------------------------------------------
// Disconnect reasons & the shutdown control message
// ---------------------------------------------------------------------------

/// Why a session is ending. Produced at exit initiation and consumed once
/// by the exit flow, which maps it to an optional user-facing error.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default,
)]
pub enum DisconnectReason {
    /// No recorded reason (placeholder, never shown to the user).
    #[default]
    None,
    /// The host shut the session down in an orderly way.
    ServerShutdown,
    /// The local user chose to leave.
    ManualLeft,
    /// The network connection dropped.
    Disconnected,
    /// The local peer was kicked from the lobby.
    Kicked,
    /// The local peer was banned from the lobby.
    Banned,
}

impl fmt::Display for DisconnectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::None => "none",
            Self::ServerShutdown => "server shutdown",
            Self::ManualLeft => "left manually",
            Self::Disconnected => "connection lost",
            Self::Kicked => "kicked",
            Self::Banned => "banned",
        };
        f.write_str(s)
    }
}

/// Control message broadcast host → clients immediately before a voluntary
/// host teardown, so clients can show "host exited" instead of a generic
/// connection error.
///
/// This is the only message the coordination core itself puts on the wire;
/// it is encoded/decoded through the [`Codec`](crate::Codec) trait.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShutdownMessage {
    pub reason: DisconnectReason,
}

// ---------------------------------------------------------------------------
// Membership changes
// ---------------------------------------------------------------------------

/// A membership-change notification for one member of one lobby.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemberChange {
    /// The member entered the lobby.
    Entered,
    /// The member left voluntarily.
    Left,
    /// The member's connection to the presence service dropped.
    Disconnected,
    /// The member was kicked.
    Kicked,
    /// The member was banned.
    Banned,
}

// ---------------------------------------------------------------------------
// Lobby metadata keys
// ---------------------------------------------------------------------------

/// Key names for the small key/value store the presence service keeps per
/// lobby (and per member). Kept as string constants because the service
/// API is stringly-typed; every writer and reader goes through these.
pub mod keys {
    /// Peer id of the host, also used as the transport connect address.
    pub const HOST_PEER: &str = "HostAddress";
    /// Display name of the lobby.
    pub const NAME: &str = "name";
    /// Display name of the host.
    pub const HOST_NAME: &str = "hostName";
    /// Advertised [`LobbyKind`](super::LobbyKind).
    pub const KIND: &str = "lobbyType";
    /// The 6-digit join code.
    pub const CODE: &str = "LobbyCode";
    /// Per-member marker: how this member got in (see [`JOIN_METHOD_CODE`]).
    pub const JOIN_METHOD: &str = "JoinMethod";
    /// Advertised [`SessionPhase`](super::SessionPhase).
    pub const PHASE: &str = "SessionState";

    /// Value of [`JOIN_METHOD`] recorded when a member joined via code.
    pub const JOIN_METHOD_CODE: &str = "code";
}

// ---------------------------------------------------------------------------
// Limits and timing constants
// ---------------------------------------------------------------------------

/// Length of a join code, in digits.
pub const CODE_LEN: usize = 6;
/// Smallest allowed lobby member cap.
pub const MIN_MEMBERS: u32 = 1;
/// Largest allowed lobby member cap.
pub const MAX_MEMBERS: u32 = 8;
/// Result cap applied to public lobby list requests.
pub const MAX_LIST_RESULTS: usize = 150;
/// Character cap for lobby display names.
pub const MAX_LOBBY_NAME_LEN: usize = 20;
/// Character cap for player display names.
pub const MAX_PLAYER_NAME_LEN: usize = 24;

/// How long a join attempt may stay in flight before failing with Timeout.
pub const JOIN_TIMEOUT: Duration = Duration::from_secs(5);
/// How long a lobby list request (and the code search built on it) waits.
pub const SEARCH_TIMEOUT: Duration = Duration::from_secs(7);
/// How long lobby creation may stay in flight before failing with Timeout.
pub const CREATE_TIMEOUT: Duration = Duration::from_secs(7);
/// How long an invite keeps a private lobby joinable.
pub const INVITE_TTL: Duration = Duration::from_secs(300);
/// Grace given to the transport to flush a shutdown broadcast.
pub const SHUTDOWN_FLUSH: Duration = Duration::from_millis(50);

// ---------------------------------------------------------------------------
// Join codes
// ---------------------------------------------------------------------------

/// Generates a fresh [`CODE_LEN`]-digit join code.
///
/// Codes are not secrets — they are short-lived, human-relayable handles —
/// so a uniform draw from `rand` is all that's needed.
pub fn generate_join_code() -> String {
    use rand::Rng;
    let mut rng = rand::rng();
    (0..CODE_LEN)
        .map(|_| char::from(b'0' + rng.random_range(0..10u8)))
        .collect()
}

/// Returns `true` if `code` has the exact shape of a join code
/// ([`CODE_LEN`] ASCII digits). Input that fails this check is ignored
/// before any search is issued.
pub fn is_valid_join_code(code: &str) -> bool {
    code.len() == CODE_LEN && code.bytes().all(|b| b.is_ascii_digit())
}

// =========================================================================
// Tests
// =========================================================================
