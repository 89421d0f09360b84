//! The exit flow: graceful and forced session teardown.
//!
//! One entry point, [`ExitFlowController::run`], handles every way a
//! session ends: manual leave, host shutdown, kick, ban, connection loss.
//! The sequence is fixed:
//!
//! ```text
//!   map reason ─▶ mark manual intent ─▶ notify peers (host, voluntary)
//!     ─▶ stop host/client ─▶ leave lobby ─▶ reset intent
//!     ─▶ return to menu scene ─▶ show error ─▶ completed
//! ```
//!
//! The shutdown broadcast happens only on voluntary or host-initiated
//! exits; a kicked or banned host has no business announcing anything.
//! After the broadcast the flow yields briefly so the frame reaches peers
//! before the host socket dies. Completion is unconditional: whatever an
//! individual step does, the in-progress flag clears and the caller gets
//! the reason back.

use std::time::Duration;

use lobbylink_net::{NetTransport, NetworkSessionAdapter};
use lobbylink_presence::{PresenceGateway, PresenceService};
use lobbylink_protocol::{Codec, DisconnectReason, ErrorKind};
use lobbylink_timer::Clock;
use tracing::{debug, info, warn};

use crate::{ErrorSink, FlowConfig, SceneLoader};

/// Maps an exit reason to the popup it produces, if any.
pub fn map_exit_error(reason: DisconnectReason) -> Option<ErrorKind> {
    match reason {
        DisconnectReason::ServerShutdown => Some(ErrorKind::HostExit),
        DisconnectReason::Kicked => Some(ErrorKind::Kicked),
        DisconnectReason::Banned => Some(ErrorKind::Banned),
        DisconnectReason::Disconnected => Some(ErrorKind::ConnectionLost),
        DisconnectReason::ManualLeft | DisconnectReason::None => None,
    }
}

/// Whether peers should be told before the host goes down.
fn should_broadcast(reason: DisconnectReason) -> bool {
    matches!(
        reason,
        DisconnectReason::ManualLeft | DisconnectReason::ServerShutdown
    )
}

/// Orchestrates session teardown.
#[derive(Debug)]
pub struct ExitFlowController {
    flush_delay: Duration,
    menu_scene: String,
    exiting: bool,
}

impl ExitFlowController {
    pub fn new(config: &FlowConfig) -> Self {
        Self {
            flush_delay: config.shutdown_flush,
            menu_scene: config.menu_scene.clone(),
            exiting: false,
        }
    }

    /// Whether a teardown is currently running.
    pub fn is_exiting(&self) -> bool {
        self.exiting
    }

    /// Tears the session down for `reason`. Idempotent: a call while a
    /// teardown is already running is a no-op and returns `false`.
    ///
    /// On completion (`true`) the transport is stopped, the presence lobby
    /// released, the menu scene loaded if needed, and the reason's error
    /// (if any) shown — exactly once.
    pub async fn run<P, C, T, D, S, E>(
        &mut self,
        reason: DisconnectReason,
        gateway: &mut PresenceGateway<P, C>,
        net: &mut NetworkSessionAdapter<T, D>,
        scenes: &mut S,
        errors: &E,
    ) -> bool
    where
        P: PresenceService,
        C: Clock,
        T: NetTransport,
        D: Codec,
        S: SceneLoader,
        E: ErrorSink,
    {
        if self.exiting {
            debug!(%reason, "exit requested while already exiting");
            return false;
        }
        self.exiting = true;
        info!(%reason, "exit started");

        let error = map_exit_error(reason);
        gateway.set_manual_disconnect(true);

        if net.host_active() {
            if should_broadcast(reason) {
                if let Err(err) = net.broadcast_shutdown() {
                    warn!(%err, "shutdown broadcast failed");
                }
                // Let the frame flush to peers before the host dies.
                tokio::time::sleep(self.flush_delay).await;
            }
            gateway.close_hosted();
            net.stop_host();
        } else if net.client_active() {
            net.stop_client();
        }

        gateway.leave_current();
        gateway.set_manual_disconnect(false);
        net.set_game_in_progress(false);

        if scenes.current_scene() != self.menu_scene {
            let scene = self.menu_scene.clone();
            scenes.load_scene(&scene).await;
        }

        if let Some(kind) = error {
            errors.show(kind);
        }

        // Completion is unconditional: none of the steps above may leave
        // the flow stuck in-progress.
        self.exiting = false;
        info!(%reason, "exit completed");
        true
    }
}
