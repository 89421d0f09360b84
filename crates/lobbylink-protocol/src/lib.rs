//! Shared vocabulary for Lobbylink.
//!
//! This crate defines the types that cross every layer boundary:
//!
//! - **Identifiers** ([`LobbyId`], [`PeerId`]) and lobby classification
//!   ([`LobbyKind`], [`SessionPhase`]).
//! - **Verdicts and reasons** ([`EnterResponse`], [`DisconnectReason`]).
//! - **The error taxonomy** ([`ErrorKind`]) — carried in events, never
//!   thrown.
//! - **The one wire message** ([`ShutdownMessage`]) and the [`Codec`] that
//!   frames it.
//! - **Metadata keys, limits, and timing constants** shared by the
//!   gateway, flows, and coordinator.
//!
//! It sits below everything else and depends on nothing but serde.

mod codec;
mod error;
mod types;

pub use codec::Codec;
#[cfg(feature = "json")]
pub use codec::JsonCodec;
pub use error::{ErrorKind, ProtocolError};
pub use types::{
    CODE_LEN, CREATE_TIMEOUT, DisconnectReason, EnterResponse, INVITE_TTL,
    JOIN_TIMEOUT, LobbyId, LobbyKind, MAX_LIST_RESULTS, MAX_LOBBY_NAME_LEN,
    MAX_MEMBERS, MAX_PLAYER_NAME_LEN, MIN_MEMBERS, MemberChange, PeerId,
    SEARCH_TIMEOUT, SHUTDOWN_FLUSH, SessionPhase, ShutdownMessage,
    generate_join_code, is_valid_join_code, keys,
};
