//! Join and exit orchestration for Lobbylink.
//!
//! [`JoinFlowController`] owns the three join paths (direct id, code
//! search, invite) with their single-flight guard, timeouts, and error
//! mapping. [`ExitFlowController`] owns teardown, graceful and forced.
//! Both talk to the user only through the [`ErrorSink`] and
//! [`SceneLoader`] collaborator traits.

#![allow(async_fn_in_trait)]

mod exit;
mod join;
#[cfg(any(test, feature = "testutil"))]
pub mod testsupport;
mod ui;

use std::time::Duration;

use lobbylink_protocol::{JOIN_TIMEOUT, SEARCH_TIMEOUT, SHUTDOWN_FLUSH};

pub use exit::{ExitFlowController, map_exit_error};
pub use join::{
    JoinFlowController, JoinOrigin, JoinOutcome, JoinStart, PendingJoin,
    is_hard, map_enter_error,
};
pub use ui::{ErrorSink, SceneLoader, TracingErrorSink};

/// Timer slots used by the session flows. One deadline per variant; the
/// scheduler's slot replacement gives each flow its cancel-before-restart
/// behavior for free.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionTimer {
    /// A direct join awaiting its enter result.
    Join,
    /// A code search awaiting its list response.
    CodeSearch,
    /// A lobby creation awaiting its result.
    Create,
    /// A browser list request awaiting its response.
    List,
}

/// Tunables for the join and exit flows.
#[derive(Debug, Clone)]
pub struct FlowConfig {
    /// How long a direct join may wait for its enter result.
    pub join_timeout: Duration,
    /// How long a code search may wait for its list response.
    pub search_timeout: Duration,
    /// Yield after the shutdown broadcast, before host teardown.
    pub shutdown_flush: Duration,
    /// Scene the exit flow returns to.
    pub menu_scene: String,
}

impl Default for FlowConfig {
    fn default() -> Self {
        Self {
            join_timeout: JOIN_TIMEOUT,
            search_timeout: SEARCH_TIMEOUT,
            shutdown_flush: SHUTDOWN_FLUSH,
            menu_scene: "MainMenu".to_owned(),
        }
    }
}

impl FlowConfig {
    /// Returns the config with out-of-range values clamped to sane ones.
    pub fn validated(mut self) -> Self {
        if self.join_timeout.is_zero() {
            self.join_timeout = JOIN_TIMEOUT;
        }
        if self.search_timeout.is_zero() {
            self.search_timeout = SEARCH_TIMEOUT;
        }
        if self.menu_scene.is_empty() {
            self.menu_scene = "MainMenu".to_owned();
        }
        self
    }
}
