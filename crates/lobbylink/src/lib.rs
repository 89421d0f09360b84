//! Lobbylink: session-lifecycle coordination over an external presence
//! service and a network transport.
//!
//! The hard problem here is not networking, it's ordering: completions
//! from two independent external systems arrive asynchronously, possibly
//! duplicated, possibly stale, and the session must never wedge in a busy
//! state or act on an event that belongs to an abandoned attempt. The
//! workspace answers that with single-flight guards, explicit request
//! versions, slot-per-flow timeouts, and ground-truth state
//! reconciliation.
//!
//! This crate is the top of the stack:
//!
//! - [`LobbySessionCoordinator`] — the `{Idle, Creating, Joining, InLobby,
//!   Exiting}` state machine owning the gateway, network adapter, and join
//!   and exit flows.
//! - [`driver`] — a tokio task serializing commands, external events, and
//!   timer expiries through the coordinator.
//! - [`Preferences`] — the small persisted-settings file.
//! - [`testkit`] — in-memory collaborators for driving the whole stack in
//!   tests.
//!
//! The layers below are re-exported where embedders need them: collaborator
//! traits ([`PresenceService`], [`NetTransport`], [`ErrorSink`],
//! [`SceneLoader`]) and the shared protocol vocabulary.

mod coordinator;
pub mod driver;
mod error;
mod prefs;
pub mod testkit;

pub use coordinator::{
    CoordinatorConfig, LobbySessionCoordinator, SessionEvent, SessionState,
};
pub use error::LobbylinkError;
pub use prefs::{Preferences, PrefsError};

pub use lobbylink_flow::{
    ErrorSink, FlowConfig, SceneLoader, SessionTimer, TracingErrorSink,
};
pub use lobbylink_net::{NetTransport, NetworkSessionAdapter, TransportEvent};
pub use lobbylink_presence::{
    CreateParams, GatewayConfig, ListFilter, LobbySummary, PresenceEvent,
    PresenceService,
};
pub use lobbylink_protocol::{
    DisconnectReason, EnterResponse, ErrorKind, LobbyId, LobbyKind,
    MemberChange, PeerId, SessionPhase,
};
pub use lobbylink_timer::{Clock, ManualClock, SystemClock, TimeoutScheduler};
