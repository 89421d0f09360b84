//! In-memory collaborators for exercising the session core without a real
//! presence backend, transport, or UI.
//!
//! These are the same doubles the workspace's own tests use, re-exported
//! so embedders can drive the coordinator in their tests.

pub use lobbylink_flow::testsupport::{CollectingErrorSink, FakeSceneLoader};
pub use lobbylink_net::testsupport::FakeTransport;
pub use lobbylink_presence::testsupport::{Call, FakePresence};
