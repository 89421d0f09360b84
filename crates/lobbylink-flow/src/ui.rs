//! UI collaborator boundaries.
//!
//! The flows never render anything; they hand failures to an [`ErrorSink`]
//! and scene changes to a [`SceneLoader`]. Both must be callable with no
//! prior state.

use lobbylink_protocol::ErrorKind;
use tracing::warn;

/// Receives user-facing failures. Fire-and-forget.
pub trait ErrorSink {
    fn show(&self, kind: ErrorKind);
}

/// An [`ErrorSink`] that logs instead of rendering. Useful for headless
/// hosts and as a default before a real UI is wired up.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingErrorSink;

impl ErrorSink for TracingErrorSink {
    fn show(&self, kind: ErrorKind) {
        warn!(error = ?kind, message = kind.user_message(), "user-facing error");
    }
}

/// Drives scene transitions. The exit flow awaits completion before it
/// finishes teardown.
pub trait SceneLoader {
    /// Name of the scene currently presented.
    fn current_scene(&self) -> &str;

    /// Loads `name`, resolving once the transition is complete.
    fn load_scene(
        &mut self,
        name: &str,
    ) -> impl std::future::Future<Output = ()> + Send;
}
