//! Presence-service integration for Lobbylink.
//!
//! This crate owns every conversation with the external presence and
//! matchmaking backend:
//!
//! - [`PresenceService`] is the backend boundary; completions arrive as
//!   [`PresenceEvent`] values.
//! - [`PresenceGateway`] tracks the current lobby, serializes create/join
//!   requests, suppresses stale completions, publishes lobby metadata, and
//!   reverses uninvited joins into private lobbies.
//! - [`InviteWhitelist`] holds time-bounded invite permits.
//! - [`LobbyBrowser`] turns raw list responses into joinable summaries and
//!   answers join-code lookups.
//!
//! Nothing here touches the network transport. Gateway events say what the
//! owner should do next (start hosting, connect to a host); the wiring
//! lives a layer up.

mod browse;
mod error;
mod gateway;
mod service;
#[cfg(any(test, feature = "testutil"))]
pub mod testsupport;
mod whitelist;

pub use browse::{CodeLookup, LobbyBrowser, LobbySummary, find_by_code};
pub use error::{GatewayError, PresenceError};
pub use gateway::{CreateParams, GatewayConfig, GatewayEvent, PresenceGateway};
pub use service::{ListFilter, PresenceEvent, PresenceService};
pub use whitelist::InviteWhitelist;
