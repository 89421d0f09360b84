//! The join flow: direct id, code search, and invite joins.
//!
//! ```text
//!   join_by_id ────┐
//!   join_by_code ──┼──▶ guard ──▶ gateway.join ──▶ join timer
//!   join_by_invite ┘                   │
//!                                      ▼
//!            Entered / EnterFailed / timeout ──▶ one terminal JoinOutcome
//! ```
//!
//! All three entry points funnel through one guard. A rejection is either
//! silent (same-kind re-entrancy, exit in progress) or surfaced as a
//! popup (`AlreadyInLobby`, `ConnectionFailed`) — a rejected join starts
//! no request and no timer. Every attempt produces exactly one terminal
//! outcome: success, failure, or nothing at all if it was cancelled.

use lobbylink_presence::{
    CodeLookup, GatewayError, GatewayEvent, ListFilter, PresenceGateway,
    PresenceService, find_by_code,
};
use lobbylink_protocol::{
    EnterResponse, ErrorKind, LobbyId, PeerId, is_valid_join_code,
};
use lobbylink_timer::{Clock, TimeoutScheduler};
use tracing::{debug, info, warn};

use crate::{ErrorSink, FlowConfig, SessionTimer};

/// How a join attempt was initiated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinOrigin {
    /// Directly by lobby id (list selection).
    Direct,
    /// Through a 6-digit join code search.
    Code,
    /// From a received invite.
    Invite,
}

/// An in-flight join attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingJoin {
    pub target: LobbyId,
    pub origin: JoinOrigin,
    /// Monotonic attempt counter, for tracing and stale-filtering.
    pub attempt: u64,
}

#[derive(Debug)]
struct CodeSearch {
    code: String,
    list_version: u64,
}

/// Synchronous verdict of a join entry point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinStart {
    /// The attempt started; a terminal outcome will follow.
    Started,
    /// Silently rejected (busy or exiting); nothing shown, nothing started.
    Ignored,
    /// Rejected and surfaced to the user; nothing started.
    Rejected(ErrorKind),
}

/// Terminal (or not-yet-terminal) result of feeding an event or timeout
/// through the flow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JoinOutcome {
    /// The attempt is still in flight, or the event was not ours.
    Pending,
    /// The lobby was entered; the owner should connect to `host`.
    Succeeded { lobby: LobbyId, host: PeerId },
    /// The attempt failed. `hard` signals list-presenting collaborators to
    /// remove the candidate permanently rather than retry it.
    Failed {
        target: Option<LobbyId>,
        error: ErrorKind,
        hard: bool,
    },
}

/// Maps a presence enter-response to the user-facing taxonomy.
/// `Success` is not a failure; if it reaches this table it maps to the
/// generic tag.
pub fn map_enter_error(response: EnterResponse) -> ErrorKind {
    match response {
        EnterResponse::Full => ErrorKind::LobbyFull,
        EnterResponse::DoesntExist => ErrorKind::LobbyNotFound,
        EnterResponse::NotAllowed => ErrorKind::AccessDenied,
        EnterResponse::Banned => ErrorKind::Banned,
        EnterResponse::CommunityBanned => ErrorKind::CommunityBanned,
        EnterResponse::MemberBlockedYou => ErrorKind::MemberBlocked,
        EnterResponse::YouBlockedMember => ErrorKind::YouBlockedMember,
        EnterResponse::RateLimited => ErrorKind::RateLimitExceeded,
        EnterResponse::Limited => ErrorKind::LimitedAccount,
        EnterResponse::ClanDisabled => ErrorKind::ClanDisabled,
        EnterResponse::Success | EnterResponse::Error => {
            ErrorKind::GenericJoinError
        }
    }
}

/// Whether a join failure means the candidate is permanently unreachable.
pub fn is_hard(error: ErrorKind) -> bool {
    matches!(
        error,
        ErrorKind::LobbyNotFound
            | ErrorKind::AccessDenied
            | ErrorKind::Banned
            | ErrorKind::CommunityBanned
    )
}

/// Orchestrates the three join paths.
#[derive(Debug)]
pub struct JoinFlowController {
    config: FlowConfig,
    pending: Option<PendingJoin>,
    search: Option<CodeSearch>,
    attempts: u64,
}

impl JoinFlowController {
    pub fn new(config: FlowConfig) -> Self {
        Self {
            config: config.validated(),
            pending: None,
            search: None,
            attempts: 0,
        }
    }

    /// Whether a join attempt (direct or code search) is in flight.
    pub fn is_joining(&self) -> bool {
        self.pending.is_some() || self.search.is_some()
    }

    pub fn pending(&self) -> Option<&PendingJoin> {
        self.pending.as_ref()
    }

    /// Joins `lobby` directly.
    pub fn join_by_id<P, C>(
        &mut self,
        lobby: LobbyId,
        exiting: bool,
        session_active: bool,
        gateway: &mut PresenceGateway<P, C>,
        timers: &mut TimeoutScheduler<SessionTimer, C>,
        errors: &impl ErrorSink,
    ) -> JoinStart
    where
        P: PresenceService,
        C: Clock,
    {
        self.start_checked(
            lobby,
            JoinOrigin::Direct,
            exiting,
            session_active,
            gateway,
            timers,
            errors,
        )
    }

    /// Joins the lobby a received invite points at. The invite's whitelist
    /// entry doubles as the private-lobby permit; the one-shot permit is
    /// seeded here as well so consumption stays single-use per attempt.
    pub fn join_by_invite<P, C>(
        &mut self,
        lobby: LobbyId,
        exiting: bool,
        session_active: bool,
        gateway: &mut PresenceGateway<P, C>,
        timers: &mut TimeoutScheduler<SessionTimer, C>,
        errors: &impl ErrorSink,
    ) -> JoinStart
    where
        P: PresenceService,
        C: Clock,
    {
        if gateway.invite_permits(lobby) {
            gateway.allow_private_once(lobby);
        }
        self.start_checked(
            lobby,
            JoinOrigin::Invite,
            exiting,
            session_active,
            gateway,
            timers,
            errors,
        )
    }

    /// Starts a code search: a list request whose response is scanned for
    /// a lobby advertising `code`. A malformed code is silently ignored.
    pub fn join_by_code<P, C>(
        &mut self,
        code: &str,
        exiting: bool,
        session_active: bool,
        gateway: &mut PresenceGateway<P, C>,
        timers: &mut TimeoutScheduler<SessionTimer, C>,
        errors: &impl ErrorSink,
    ) -> JoinStart
    where
        P: PresenceService,
        C: Clock,
    {
        if !is_valid_join_code(code) {
            debug!(code, "malformed join code ignored");
            return JoinStart::Ignored;
        }
        match self.guard(exiting, session_active, gateway) {
            Ok(()) => {}
            Err(start) => return self.reject(start, errors),
        }

        let version = match gateway.request_list(ListFilter::Public) {
            Ok(version) => version,
            Err(err) => {
                warn!(%err, "code search list request failed");
                errors.show(ErrorKind::ConnectionFailed);
                return JoinStart::Rejected(ErrorKind::ConnectionFailed);
            }
        };
        self.search = Some(CodeSearch {
            code: code.to_owned(),
            list_version: version,
        });
        timers.schedule(SessionTimer::CodeSearch, self.config.search_timeout);
        info!(code, version, "code search started");
        JoinStart::Started
    }

    /// Abandons any in-flight attempt without a terminal outcome. Used by
    /// the exit flow; later completions are stale-dropped.
    pub fn cancel<P, C>(
        &mut self,
        gateway: &mut PresenceGateway<P, C>,
        timers: &mut TimeoutScheduler<SessionTimer, C>,
    ) where
        P: PresenceService,
        C: Clock,
    {
        if self.pending.take().is_some() || self.search.take().is_some() {
            debug!("join attempt cancelled");
        }
        gateway.cancel_join();
        timers.cancel(SessionTimer::Join);
        timers.cancel(SessionTimer::CodeSearch);
    }

    /// Feeds a gateway event through the flow.
    pub fn handle_gateway_event<P, C>(
        &mut self,
        event: &GatewayEvent,
        gateway: &mut PresenceGateway<P, C>,
        timers: &mut TimeoutScheduler<SessionTimer, C>,
        errors: &impl ErrorSink,
    ) -> JoinOutcome
    where
        P: PresenceService,
        C: Clock,
    {
        match event {
            GatewayEvent::Entered { lobby, host } => {
                let Some(pending) = self.take_matching(*lobby) else {
                    return JoinOutcome::Pending;
                };
                timers.cancel(SessionTimer::Join);
                info!(
                    lobby = %lobby,
                    attempt = pending.attempt,
                    origin = ?pending.origin,
                    "join succeeded"
                );
                JoinOutcome::Succeeded {
                    lobby: *lobby,
                    host: *host,
                }
            }
            GatewayEvent::EnterFailed { lobby, response } => {
                let Some(pending) = self.take_matching(*lobby) else {
                    return JoinOutcome::Pending;
                };
                timers.cancel(SessionTimer::Join);
                let error = map_enter_error(*response);
                let hard = is_hard(error);
                warn!(
                    lobby = %lobby,
                    attempt = pending.attempt,
                    ?error,
                    hard,
                    "join failed"
                );
                errors.show(error);
                JoinOutcome::Failed {
                    target: Some(*lobby),
                    error,
                    hard,
                }
            }
            GatewayEvent::ListReady { version, lobbies } => {
                self.handle_list(*version, lobbies, gateway, timers, errors)
            }
            _ => JoinOutcome::Pending,
        }
    }

    /// Handles an expired flow timer.
    pub fn handle_timeout<P, C>(
        &mut self,
        timer: SessionTimer,
        gateway: &mut PresenceGateway<P, C>,
        errors: &impl ErrorSink,
    ) -> JoinOutcome
    where
        P: PresenceService,
        C: Clock,
    {
        match timer {
            SessionTimer::Join => {
                let Some(pending) = self.pending.take() else {
                    return JoinOutcome::Pending;
                };
                gateway.cancel_join();
                warn!(
                    lobby = %pending.target,
                    attempt = pending.attempt,
                    "join timed out"
                );
                errors.show(ErrorKind::Timeout);
                JoinOutcome::Failed {
                    target: Some(pending.target),
                    error: ErrorKind::Timeout,
                    hard: false,
                }
            }
            SessionTimer::CodeSearch => {
                let Some(search) = self.search.take() else {
                    return JoinOutcome::Pending;
                };
                warn!(code = search.code, "code search timed out");
                errors.show(ErrorKind::LobbyNotFound);
                JoinOutcome::Failed {
                    target: None,
                    error: ErrorKind::LobbyNotFound,
                    hard: true,
                }
            }
            _ => JoinOutcome::Pending,
        }
    }

    fn handle_list<P, C>(
        &mut self,
        version: u64,
        lobbies: &[LobbyId],
        gateway: &mut PresenceGateway<P, C>,
        timers: &mut TimeoutScheduler<SessionTimer, C>,
        errors: &impl ErrorSink,
    ) -> JoinOutcome
    where
        P: PresenceService,
        C: Clock,
    {
        let search = match self.search.take() {
            Some(search) if search.list_version == version => search,
            other => {
                self.search = other;
                return JoinOutcome::Pending;
            }
        };
        timers.cancel(SessionTimer::CodeSearch);

        match find_by_code(gateway.service(), lobbies, &search.code) {
            CodeLookup::Found(lobby) => {
                gateway.allow_private_once(lobby);
                gateway.flag_code_origin();
                match self.start_join(lobby, JoinOrigin::Code, gateway, timers)
                {
                    Ok(()) => JoinOutcome::Pending,
                    Err(err) => {
                        warn!(%err, %lobby, "code join could not start");
                        errors.show(ErrorKind::ConnectionFailed);
                        JoinOutcome::Failed {
                            target: Some(lobby),
                            error: ErrorKind::ConnectionFailed,
                            hard: false,
                        }
                    }
                }
            }
            CodeLookup::FoundFull => {
                errors.show(ErrorKind::LobbyFull);
                JoinOutcome::Failed {
                    target: None,
                    error: ErrorKind::LobbyFull,
                    hard: false,
                }
            }
            CodeLookup::NotFound => {
                errors.show(ErrorKind::LobbyNotFound);
                JoinOutcome::Failed {
                    target: None,
                    error: ErrorKind::LobbyNotFound,
                    hard: true,
                }
            }
        }
    }

    /// Common guard. `Err(Ignored)` is silent; `Err(Rejected)` is surfaced.
    fn guard<P, C>(
        &self,
        exiting: bool,
        session_active: bool,
        gateway: &PresenceGateway<P, C>,
    ) -> Result<(), JoinStart>
    where
        P: PresenceService,
        C: Clock,
    {
        if self.is_joining() || gateway.has_pending() {
            debug!("join rejected: already busy");
            return Err(JoinStart::Ignored);
        }
        if exiting {
            debug!("join rejected: exit in progress");
            return Err(JoinStart::Ignored);
        }
        if session_active || gateway.current_lobby().is_some() {
            return Err(JoinStart::Rejected(ErrorKind::AlreadyInLobby));
        }
        if !gateway.service().is_ready() {
            return Err(JoinStart::Rejected(ErrorKind::ConnectionFailed));
        }
        Ok(())
    }

    fn reject(&self, start: JoinStart, errors: &impl ErrorSink) -> JoinStart {
        if let JoinStart::Rejected(error) = start {
            errors.show(error);
        }
        start
    }

    fn start_checked<P, C>(
        &mut self,
        lobby: LobbyId,
        origin: JoinOrigin,
        exiting: bool,
        session_active: bool,
        gateway: &mut PresenceGateway<P, C>,
        timers: &mut TimeoutScheduler<SessionTimer, C>,
        errors: &impl ErrorSink,
    ) -> JoinStart
    where
        P: PresenceService,
        C: Clock,
    {
        match self.guard(exiting, session_active, gateway) {
            Ok(()) => {}
            Err(start) => return self.reject(start, errors),
        }
        match self.start_join(lobby, origin, gateway, timers) {
            Ok(()) => JoinStart::Started,
            Err(err) => {
                warn!(%err, %lobby, "join could not start");
                errors.show(ErrorKind::ConnectionFailed);
                JoinStart::Rejected(ErrorKind::ConnectionFailed)
            }
        }
    }

    fn start_join<P, C>(
        &mut self,
        lobby: LobbyId,
        origin: JoinOrigin,
        gateway: &mut PresenceGateway<P, C>,
        timers: &mut TimeoutScheduler<SessionTimer, C>,
    ) -> Result<(), GatewayError>
    where
        P: PresenceService,
        C: Clock,
    {
        gateway.join(lobby)?;
        self.attempts += 1;
        self.pending = Some(PendingJoin {
            target: lobby,
            origin,
            attempt: self.attempts,
        });
        timers.schedule(SessionTimer::Join, self.config.join_timeout);
        info!(%lobby, ?origin, attempt = self.attempts, "join started");
        Ok(())
    }

    fn take_matching(&mut self, lobby: LobbyId) -> Option<PendingJoin> {
        match &self.pending {
            Some(pending) if pending.target == lobby => self.pending.take(),
            _ => {
                debug!(%lobby, "terminal event for untracked join dropped");
                None
            }
        }
    }
}
