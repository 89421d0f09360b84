//! The top-level session state machine.
//!
//! ```text
//!   create/join/exit/list ──▶ ┌─────────────────────────┐
//!   PresenceEvent ──────────▶ │ LobbySessionCoordinator │ ──▶ SessionEvent
//!   TransportEvent ─────────▶ │  {Idle,Creating,Joining,│      channel
//!   timer expiries ─────────▶ │   InLobby,Exiting}      │
//!                             └─────────────────────────┘
//! ```
//!
//! The coordinator owns every sub-component and is the only place session
//! state is decided. It never trusts its own last transition: after
//! delegating an operation, and after any terminal event, it *reconciles*
//! state from ground truth — exit in progress beats join in progress beats
//! pending creation beats held lobby beats idle. A sub-controller silently
//! refusing an operation therefore can never leave the coordinator stuck
//! in a busy state.

use std::path::PathBuf;
use std::time::{Duration, Instant};

use lobbylink_flow::{
    ErrorSink, ExitFlowController, FlowConfig, JoinFlowController,
    JoinOutcome, JoinStart, SceneLoader, SessionTimer,
};
use lobbylink_net::{
    AdapterSignal, NetTransport, NetworkSessionAdapter, TransportEvent,
};
use lobbylink_presence::{
    CreateParams, GatewayConfig, GatewayError, GatewayEvent, ListFilter,
    LobbyBrowser, LobbySummary, PresenceEvent, PresenceGateway,
    PresenceService,
};
use lobbylink_protocol::{
    CREATE_TIMEOUT, DisconnectReason, ErrorKind, LobbyId, MAX_MEMBERS,
    MIN_MEMBERS, PeerId, SEARCH_TIMEOUT, SessionPhase,
};
use lobbylink_timer::{Clock, SystemClock, TimeoutScheduler};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::prefs::Preferences;

/// Top-level session mode. Cyclic, no terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Creating,
    Joining,
    InLobby,
    Exiting,
}

/// Notifications published to UI collaborators on the event channel.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    StateChanged {
        state: SessionState,
    },
    LobbyCreated {
        lobby: LobbyId,
        code: String,
    },
    CreateFailed {
        error: ErrorKind,
    },
    JoinSucceeded {
        lobby: LobbyId,
    },
    JoinFailed {
        target: Option<LobbyId>,
        error: ErrorKind,
        /// Permanently remove `target` from any displayed list.
        hard: bool,
    },
    LobbyList {
        filter: ListFilter,
        lobbies: Vec<LobbySummary>,
    },
    InviteReceived {
        lobby: LobbyId,
        from: PeerId,
    },
    ExitCompleted {
        reason: DisconnectReason,
    },
}

/// Tunables for the coordinator and its sub-components.
#[derive(Debug, Clone, Default)]
pub struct CoordinatorConfig {
    pub gateway: GatewayConfig,
    pub flow: FlowConfig,
    /// How long a creation may wait for its result.
    pub create_timeout: Duration,
    /// How long a browser list request may wait for its response.
    pub list_timeout: Duration,
    /// Where preferences persist. `None` keeps them in memory only.
    pub prefs_path: Option<PathBuf>,
}

impl CoordinatorConfig {
    /// Returns the config with out-of-range values clamped to sane ones.
    pub fn validated(mut self) -> Self {
        if self.create_timeout.is_zero() {
            self.create_timeout = CREATE_TIMEOUT;
        }
        if self.list_timeout.is_zero() {
            self.list_timeout = SEARCH_TIMEOUT;
        }
        self
    }
}

/// Owns the gateway, adapter, flows, timers, and the one session state.
#[derive(Debug)]
pub struct LobbySessionCoordinator<P, T, S, E, C = SystemClock> {
    state: SessionState,
    gateway: PresenceGateway<P, C>,
    net: NetworkSessionAdapter<T>,
    join: JoinFlowController,
    exit: ExitFlowController,
    browser: LobbyBrowser,
    timers: TimeoutScheduler<SessionTimer, C>,
    scenes: S,
    errors: E,
    prefs: Preferences,
    prefs_path: Option<PathBuf>,
    last_max_members: u32,
    create_timeout: Duration,
    list_timeout: Duration,
    events: mpsc::UnboundedSender<SessionEvent>,
}

impl<P, T, S, E> LobbySessionCoordinator<P, T, S, E, SystemClock>
where
    P: PresenceService,
    T: NetTransport,
    S: SceneLoader,
    E: ErrorSink,
{
    /// Builds a coordinator on the real clock. Returns the receiving end
    /// of the session event channel alongside it.
    pub fn new(
        service: P,
        transport: T,
        scenes: S,
        errors: E,
        config: CoordinatorConfig,
    ) -> (Self, mpsc::UnboundedReceiver<SessionEvent>) {
        Self::with_clock(service, transport, scenes, errors, config, SystemClock)
    }
}

impl<P, T, S, E, C> LobbySessionCoordinator<P, T, S, E, C>
where
    P: PresenceService,
    T: NetTransport,
    S: SceneLoader,
    E: ErrorSink,
    C: Clock,
{
    pub fn with_clock(
        service: P,
        transport: T,
        scenes: S,
        errors: E,
        config: CoordinatorConfig,
        clock: C,
    ) -> (Self, mpsc::UnboundedReceiver<SessionEvent>) {
        let config = config.validated();
        let prefs = match &config.prefs_path {
            Some(path) => Preferences::load(path).unwrap_or_else(|err| {
                warn!(%err, "preferences unreadable, using defaults");
                Preferences::default()
            }),
            None => Preferences::default(),
        };
        let (events, receiver) = mpsc::unbounded_channel();
        let browser = LobbyBrowser::new(prefs.filter());
        let last_max_members = prefs.max_members;
        let coordinator = Self {
            state: SessionState::Idle,
            gateway: PresenceGateway::with_clock(
                service,
                config.gateway,
                clock.clone(),
            ),
            net: NetworkSessionAdapter::new(transport),
            join: JoinFlowController::new(config.flow.clone()),
            exit: ExitFlowController::new(&config.flow),
            browser,
            timers: TimeoutScheduler::with_clock(clock),
            scenes,
            errors,
            prefs,
            prefs_path: config.prefs_path,
            last_max_members,
            create_timeout: config.create_timeout,
            list_timeout: config.list_timeout,
            events,
        };
        (coordinator, receiver)
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Whether a top-level operation is outstanding. All public operations
    /// are no-ops while busy.
    pub fn is_busy(&self) -> bool {
        matches!(
            self.state,
            SessionState::Creating | SessionState::Joining | SessionState::Exiting
        )
    }

    pub fn gateway(&self) -> &PresenceGateway<P, C> {
        &self.gateway
    }

    pub fn net(&self) -> &NetworkSessionAdapter<T> {
        &self.net
    }

    pub fn preferences(&self) -> &Preferences {
        &self.prefs
    }

    pub fn errors(&self) -> &E {
        &self.errors
    }

    /// Earliest pending timer deadline, for the driver's sleep.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.timers.next_deadline()
    }

    /// Recomputes session state from ground truth. Idempotent.
    pub fn reconcile(&mut self) {
        let next = if self.exit.is_exiting() {
            SessionState::Exiting
        } else if self.join.is_joining() {
            SessionState::Joining
        } else if self.gateway.create_pending() {
            SessionState::Creating
        } else if self.gateway.current_lobby().is_some() {
            SessionState::InLobby
        } else {
            SessionState::Idle
        };
        self.set_state(next);
    }

    /// Creates a lobby with `params`, persisting them as the new
    /// preferences. Returns whether the operation started.
    pub fn create_lobby(&mut self, params: CreateParams) -> bool {
        if self.is_busy() {
            debug!(state = ?self.state, "create ignored while busy");
            return false;
        }
        let max = params.max_members.clamp(MIN_MEMBERS, MAX_MEMBERS);
        self.prefs.max_members = max;
        self.prefs.lobby_name = params.name.trim().to_owned();
        self.prefs.lobby_kind = params.kind;
        self.save_prefs();
        self.last_max_members = max;

        match self.gateway.create(params) {
            Ok(()) => {
                self.timers
                    .schedule(SessionTimer::Create, self.create_timeout);
                self.reconcile();
                true
            }
            Err(GatewayError::Busy) => {
                debug!("create ignored: gateway busy");
                false
            }
            Err(err) => {
                warn!(%err, "create request failed");
                self.errors.show(ErrorKind::LobbyCreationFailed);
                self.emit(SessionEvent::CreateFailed {
                    error: ErrorKind::LobbyCreationFailed,
                });
                self.reconcile();
                false
            }
        }
    }

    /// Joins `lobby` directly. Returns whether the attempt started.
    pub fn join_by_id(&mut self, lobby: LobbyId) -> bool {
        let start = self.join.join_by_id(
            lobby,
            self.exit.is_exiting(),
            self.net.session_active(),
            &mut self.gateway,
            &mut self.timers,
            &self.errors,
        );
        // A silently rejected join must not leave us stuck in Joining.
        self.reconcile();
        start == JoinStart::Started
    }

    /// Starts a code search join. Returns whether the search started.
    pub fn join_by_code(&mut self, code: &str) -> bool {
        let start = self.join.join_by_code(
            code,
            self.exit.is_exiting(),
            self.net.session_active(),
            &mut self.gateway,
            &mut self.timers,
            &self.errors,
        );
        self.reconcile();
        start == JoinStart::Started
    }

    /// Joins the lobby an invite points at.
    pub fn join_by_invite(&mut self, lobby: LobbyId) -> bool {
        let start = self.join.join_by_invite(
            lobby,
            self.exit.is_exiting(),
            self.net.session_active(),
            &mut self.gateway,
            &mut self.timers,
            &self.errors,
        );
        self.reconcile();
        start == JoinStart::Started
    }

    /// Tears the session down for `reason`. Every exit trigger — user
    /// action, kick, ban, host shutdown, connection loss — funnels through
    /// here exactly once; a call while already exiting is a no-op.
    pub async fn exit(&mut self, reason: DisconnectReason) {
        if self.exit.is_exiting() {
            debug!(%reason, "exit ignored: already exiting");
            return;
        }
        // A pending join or creation dies silently; its completions are
        // stale from here on.
        self.join.cancel(&mut self.gateway, &mut self.timers);
        self.gateway.cancel_create();
        self.timers.cancel(SessionTimer::Create);
        self.set_state(SessionState::Exiting);

        self.exit
            .run(
                reason,
                &mut self.gateway,
                &mut self.net,
                &mut self.scenes,
                &self.errors,
            )
            .await;
        self.emit(SessionEvent::ExitCompleted { reason });
        self.reconcile();
    }

    /// Issues a filtered list request for the browser. A changed filter is
    /// persisted.
    pub fn request_list(&mut self, filter: ListFilter) -> bool {
        if self.prefs.filter() != filter {
            self.prefs.set_filter(filter);
            self.save_prefs();
        }
        self.browser.set_filter(filter);
        match self.gateway.request_list(filter) {
            Ok(version) => {
                self.browser.begin(version);
                self.timers.schedule(SessionTimer::List, self.list_timeout);
                true
            }
            Err(err) => {
                warn!(%err, "list request failed");
                self.errors.show(ErrorKind::ConnectionFailed);
                false
            }
        }
    }

    /// Publishes the session phase and gates connection admission on it.
    pub fn set_session_phase(&mut self, phase: SessionPhase) {
        self.gateway.set_phase(phase);
        self.net
            .set_game_in_progress(phase == SessionPhase::Game);
    }

    /// Feeds one presence-backend event through the session core.
    pub async fn handle_presence(&mut self, event: PresenceEvent) {
        let host_active = self.net.host_active();
        let Some(gw_event) = self.gateway.handle_event(event, host_active)
        else {
            return;
        };
        match gw_event {
            GatewayEvent::Created { lobby, code } => {
                self.timers.cancel(SessionTimer::Create);
                match self.net.start_host(self.last_max_members) {
                    Ok(()) => {
                        self.emit(SessionEvent::LobbyCreated { lobby, code });
                    }
                    Err(err) => {
                        warn!(%err, %lobby, "host start failed after creation");
                        self.gateway.leave_current();
                        self.errors.show(ErrorKind::LobbyCreationFailed);
                        self.emit(SessionEvent::CreateFailed {
                            error: ErrorKind::LobbyCreationFailed,
                        });
                    }
                }
                self.reconcile();
            }
            GatewayEvent::CreateFailed => {
                self.timers.cancel(SessionTimer::Create);
                self.errors.show(ErrorKind::LobbyCreationFailed);
                self.emit(SessionEvent::CreateFailed {
                    error: ErrorKind::LobbyCreationFailed,
                });
                self.reconcile();
            }
            GatewayEvent::ForcedExit { reason } => {
                self.exit(reason).await;
            }
            GatewayEvent::InviteReceived { lobby, from } => {
                self.emit(SessionEvent::InviteReceived { lobby, from });
            }
            GatewayEvent::JoinRequested { lobby } => {
                info!(%lobby, "join requested via platform overlay");
                self.join_by_invite(lobby);
            }
            other => {
                let outcome = self.join.handle_gateway_event(
                    &other,
                    &mut self.gateway,
                    &mut self.timers,
                    &self.errors,
                );
                self.apply_join_outcome(outcome);
                if let GatewayEvent::ListReady { version, lobbies } = &other {
                    let collected = self.browser.take_response(
                        self.gateway.service(),
                        *version,
                        lobbies,
                    );
                    if let Some(result) = collected {
                        self.timers.cancel(SessionTimer::List);
                        self.emit(SessionEvent::LobbyList {
                            filter: self.browser.filter(),
                            lobbies: result,
                        });
                    }
                }
            }
        }
    }

    /// Feeds one transport event through the session core.
    pub async fn handle_transport(&mut self, event: TransportEvent) {
        let Some(signal) = self.net.handle_event(event, &self.gateway) else {
            return;
        };
        match signal {
            AdapterSignal::RemoteShutdown { reason } => {
                self.exit(reason).await;
            }
            AdapterSignal::LinkLost { manual } => {
                if self.exit.is_exiting() || self.state == SessionState::Idle {
                    debug!("stray link-loss ignored");
                    return;
                }
                let reason = if manual {
                    DisconnectReason::ManualLeft
                } else {
                    DisconnectReason::Disconnected
                };
                self.exit(reason).await;
            }
        }
    }

    /// Delivers every expired timer to its flow.
    pub fn fire_due_timers(&mut self) {
        for timer in self.timers.fire_due() {
            match timer {
                SessionTimer::Join | SessionTimer::CodeSearch => {
                    let outcome = self.join.handle_timeout(
                        timer,
                        &mut self.gateway,
                        &self.errors,
                    );
                    self.apply_join_outcome(outcome);
                }
                SessionTimer::Create => {
                    if self.gateway.create_pending() {
                        warn!("lobby creation timed out");
                        self.gateway.cancel_create();
                        self.errors.show(ErrorKind::Timeout);
                        self.emit(SessionEvent::CreateFailed {
                            error: ErrorKind::Timeout,
                        });
                        self.reconcile();
                    }
                }
                SessionTimer::List => {
                    if let Some(result) = self.browser.expire_pending() {
                        self.emit(SessionEvent::LobbyList {
                            filter: self.browser.filter(),
                            lobbies: result,
                        });
                    }
                }
            }
        }
    }

    fn apply_join_outcome(&mut self, outcome: JoinOutcome) {
        match outcome {
            JoinOutcome::Pending => {}
            JoinOutcome::Succeeded { lobby, host } => {
                match self.net.start_client(host) {
                    Ok(()) => {
                        self.emit(SessionEvent::JoinSucceeded { lobby });
                    }
                    Err(err) => {
                        warn!(%err, %lobby, "client start failed after enter");
                        self.gateway.leave_current();
                        self.errors.show(ErrorKind::ConnectionFailed);
                        self.emit(SessionEvent::JoinFailed {
                            target: Some(lobby),
                            error: ErrorKind::ConnectionFailed,
                            hard: false,
                        });
                    }
                }
                self.reconcile();
            }
            JoinOutcome::Failed {
                target,
                error,
                hard,
            } => {
                self.emit(SessionEvent::JoinFailed {
                    target,
                    error,
                    hard,
                });
                self.reconcile();
            }
        }
    }

    fn set_state(&mut self, next: SessionState) {
        if self.state != next {
            info!(from = ?self.state, to = ?next, "session state changed");
            self.state = next;
            self.emit(SessionEvent::StateChanged { state: next });
        }
    }

    fn save_prefs(&self) {
        if let Some(path) = &self.prefs_path {
            if let Err(err) = self.prefs.save(path) {
                warn!(%err, "preferences not saved");
            }
        }
    }

    fn emit(&self, event: SessionEvent) {
        if self.events.send(event).is_err() {
            debug!("session event dropped: no subscriber");
        }
    }
}
