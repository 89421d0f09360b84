//! The presence gateway: owns all talk with the presence backend.
//!
//! ```text
//!   create/join/leave ──▶ ┌──────────────────┐ ──▶ PresenceService calls
//!                         │  PresenceGateway │
//!   PresenceEvent ──────▶ └──────────────────┘ ──▶ GatewayEvent
//! ```
//!
//! The gateway tracks exactly one current lobby and at most one in-flight
//! request (create or join). Completions that do not match the in-flight
//! request are stale — a callback from an attempt that was since replaced
//! or cancelled — and are logged and dropped, never acted on.
//!
//! The gateway never touches the network transport. Its events tell the
//! owner what to do next: `Created` means "start hosting", `Entered`
//! carries the host peer to connect to.

use std::time::Duration;

use lobbylink_protocol::{
    DisconnectReason, EnterResponse, INVITE_TTL, LobbyId, LobbyKind,
    MAX_LOBBY_NAME_LEN, MAX_MEMBERS, MIN_MEMBERS, MemberChange, PeerId,
    SessionPhase, generate_join_code, keys,
};
use lobbylink_timer::{Clock, SystemClock};
use tracing::{debug, info, warn};

use crate::{
    GatewayError, InviteWhitelist, ListFilter, PresenceEvent, PresenceService,
};

/// Tunables for the gateway.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// How long an invite permits joining a private lobby.
    pub invite_ttl: Duration,
    /// Longest lobby display name published to metadata.
    pub max_name_len: usize,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            invite_ttl: INVITE_TTL,
            max_name_len: MAX_LOBBY_NAME_LEN,
        }
    }
}

impl GatewayConfig {
    /// Returns the config with out-of-range values clamped to sane ones.
    pub fn validated(mut self) -> Self {
        if self.invite_ttl.is_zero() {
            self.invite_ttl = INVITE_TTL;
        }
        if self.max_name_len == 0 {
            self.max_name_len = MAX_LOBBY_NAME_LEN;
        }
        self
    }
}

/// Parameters for a lobby creation request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateParams {
    pub name: String,
    pub kind: LobbyKind,
    pub max_members: u32,
}

/// Outcomes the gateway reports to its owner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GatewayEvent {
    /// A lobby was created and its metadata published. The owner should
    /// start the transport host.
    Created { lobby: LobbyId, code: String },
    /// The creation request failed.
    CreateFailed,
    /// The local peer entered `lobby`. The owner should start the
    /// transport client toward `host`.
    Entered { lobby: LobbyId, host: PeerId },
    /// An enter attempt was refused with this verdict.
    EnterFailed {
        lobby: LobbyId,
        response: EnterResponse,
    },
    /// The presence backend removed the local peer from the current lobby.
    ForcedExit { reason: DisconnectReason },
    /// A list request completed. Stamped with the request version so a
    /// consumer holding an older version can discard it.
    ListReady {
        version: u64,
        lobbies: Vec<LobbyId>,
    },
    /// Another user invited the local peer; the invite is already
    /// whitelisted.
    InviteReceived { lobby: LobbyId, from: PeerId },
    /// The local user asked to join `lobby` through the platform overlay.
    JoinRequested { lobby: LobbyId },
}

/// Session-side facade over a [`PresenceService`].
#[derive(Debug)]
pub struct PresenceGateway<P, C = SystemClock> {
    service: P,
    clock: C,
    config: GatewayConfig,
    current: Option<LobbyId>,
    is_host: bool,
    pending_create: Option<CreateParams>,
    pending_join: Option<LobbyId>,
    code_origin: bool,
    private_permit: Option<LobbyId>,
    whitelist: InviteWhitelist,
    list_version: u64,
    manual_disconnect: bool,
}

impl<P: PresenceService> PresenceGateway<P, SystemClock> {
    pub fn new(service: P, config: GatewayConfig) -> Self {
        Self::with_clock(service, config, SystemClock)
    }
}

impl<P, C> PresenceGateway<P, C>
where
    P: PresenceService,
    C: Clock,
{
    pub fn with_clock(service: P, config: GatewayConfig, clock: C) -> Self {
        let config = config.validated();
        let whitelist = InviteWhitelist::new(config.invite_ttl);
        Self {
            service,
            clock,
            config,
            current: None,
            is_host: false,
            pending_create: None,
            pending_join: None,
            code_origin: false,
            private_permit: None,
            whitelist,
            list_version: 0,
            manual_disconnect: false,
        }
    }

    pub fn service(&self) -> &P {
        &self.service
    }

    pub fn service_mut(&mut self) -> &mut P {
        &mut self.service
    }

    /// The lobby currently held, if any.
    pub fn current_lobby(&self) -> Option<LobbyId> {
        self.current
    }

    /// Whether the current lobby is hosted by the local peer.
    pub fn is_host(&self) -> bool {
        self.is_host
    }

    /// Whether a create or join request is awaiting its completion.
    pub fn has_pending(&self) -> bool {
        self.pending_create.is_some() || self.pending_join.is_some()
    }

    /// Whether a creation request is awaiting its completion.
    pub fn create_pending(&self) -> bool {
        self.pending_create.is_some()
    }

    /// Abandons the in-flight creation, if any, without emitting anything.
    /// A completion arriving later is stale-dropped.
    pub fn cancel_create(&mut self) {
        if self.pending_create.take().is_some() {
            debug!("pending creation cancelled");
        }
    }

    /// Whether the last local membership change was a deliberate leave
    /// (as opposed to a connection drop).
    pub fn manual_disconnect(&self) -> bool {
        self.manual_disconnect
    }

    /// Records disconnect intent ahead of transport teardown, so the
    /// transport's own disconnect callback (which fires later) reads the
    /// right cause.
    pub fn set_manual_disconnect(&mut self, manual: bool) {
        self.manual_disconnect = manual;
    }

    /// Requests creation of a new lobby. Any currently held lobby is
    /// released first.
    ///
    /// # Errors
    /// [`GatewayError::Busy`] while a create or join is in flight, or a
    /// service error if the request cannot be issued.
    pub fn create(&mut self, params: CreateParams) -> Result<(), GatewayError> {
        if self.has_pending() {
            return Err(GatewayError::Busy);
        }
        self.release_current();

        let max = params.max_members.clamp(MIN_MEMBERS, MAX_MEMBERS);
        self.service.request_create(params.kind, max)?;
        info!(kind = params.kind.as_str(), max, "lobby creation requested");
        self.pending_create = Some(CreateParams {
            max_members: max,
            ..params
        });
        Ok(())
    }

    /// Requests entry into `lobby`.
    ///
    /// # Errors
    /// [`GatewayError::Busy`] while another request is in flight,
    /// [`GatewayError::AlreadyInLobby`] while a lobby is held, or a
    /// service error.
    pub fn join(&mut self, lobby: LobbyId) -> Result<(), GatewayError> {
        if self.has_pending() {
            return Err(GatewayError::Busy);
        }
        if self.current.is_some() {
            return Err(GatewayError::AlreadyInLobby);
        }
        self.service.request_join(lobby)?;
        info!(%lobby, "lobby join requested");
        self.pending_join = Some(lobby);
        self.manual_disconnect = false;
        Ok(())
    }

    /// Abandons the in-flight join, if any, without emitting anything.
    /// A completion arriving later is stale-dropped.
    pub fn cancel_join(&mut self) {
        if let Some(lobby) = self.pending_join.take() {
            debug!(%lobby, "pending join cancelled");
        }
        self.code_origin = false;
        self.private_permit = None;
    }

    /// Permits the next enter into `lobby` even if it is private.
    /// Consumed by the first enter completion.
    pub fn allow_private_once(&mut self, lobby: LobbyId) {
        self.private_permit = Some(lobby);
    }

    /// Marks the in-flight (or next) join as made via join code; on a
    /// successful enter the member's join-method metadata is published.
    pub fn flag_code_origin(&mut self) {
        self.code_origin = true;
    }

    /// Whether a live invite exists for `lobby`.
    pub fn invite_permits(&mut self, lobby: LobbyId) -> bool {
        self.whitelist.contains(lobby, self.clock.now())
    }

    /// Leaves the current lobby, if any. Idempotent.
    pub fn leave_current(&mut self) {
        self.release_current();
    }

    /// Withdraws the hosted lobby's advertisement ahead of host teardown:
    /// non-joinable, phase `closed`. No-op unless hosting.
    pub fn close_hosted(&mut self) {
        if !self.is_host {
            return;
        }
        if let Some(lobby) = self.current {
            self.service.set_joinable(lobby, false);
            self.service.set_lobby_data(
                lobby,
                keys::PHASE,
                SessionPhase::Closed.as_str(),
            );
            info!(%lobby, "hosted lobby closed");
        }
    }

    /// Republishes the session phase on the hosted lobby's metadata.
    /// No-op unless hosting.
    pub fn set_phase(&mut self, phase: SessionPhase) {
        if !self.is_host {
            return;
        }
        if let Some(lobby) = self.current {
            self.service.set_lobby_data(lobby, keys::PHASE, phase.as_str());
            debug!(%lobby, phase = phase.as_str(), "session phase published");
        }
    }

    /// Issues a filtered list request and returns its version stamp. The
    /// matching [`GatewayEvent::ListReady`] carries the same stamp.
    ///
    /// # Errors
    /// Propagates the service error if the request cannot be issued.
    pub fn request_list(
        &mut self,
        filter: ListFilter,
    ) -> Result<u64, GatewayError> {
        self.list_version += 1;
        self.service.request_list(filter)?;
        debug!(
            version = self.list_version,
            filter = filter.as_str(),
            "lobby list requested"
        );
        Ok(self.list_version)
    }

    /// Feeds one backend event through the gateway.
    ///
    /// `host_active` is the transport's host-session probe: while a host
    /// session runs, enter completions are ignored wholesale (the host's
    /// own enter callback must not start a client toward itself).
    pub fn handle_event(
        &mut self,
        event: PresenceEvent,
        host_active: bool,
    ) -> Option<GatewayEvent> {
        match event {
            PresenceEvent::Created { lobby } => self.on_created(lobby),
            PresenceEvent::Entered { lobby, response } => {
                self.on_entered(lobby, response, host_active)
            }
            PresenceEvent::ListReceived { lobbies } => {
                Some(GatewayEvent::ListReady {
                    version: self.list_version,
                    lobbies,
                })
            }
            PresenceEvent::MembershipChanged {
                lobby,
                member,
                change,
            } => self.on_membership_changed(lobby, member, change),
            PresenceEvent::InviteReceived { lobby, from } => {
                self.whitelist.insert(lobby, self.clock.now());
                Some(GatewayEvent::InviteReceived { lobby, from })
            }
            PresenceEvent::JoinRequested { lobby } => {
                // Overlay joins carry the platform's own consent; treat
                // them like invites so the private reversal lets them in.
                self.whitelist.insert(lobby, self.clock.now());
                Some(GatewayEvent::JoinRequested { lobby })
            }
        }
    }

    fn on_created(&mut self, lobby: Option<LobbyId>) -> Option<GatewayEvent> {
        let Some(params) = self.pending_create.take() else {
            debug!(?lobby, "stale creation result discarded");
            return None;
        };
        let Some(lobby) = lobby else {
            warn!("lobby creation failed");
            return Some(GatewayEvent::CreateFailed);
        };

        self.current = Some(lobby);
        self.is_host = true;

        let mut name = params.name.trim().to_owned();
        name.truncate(self.config.max_name_len);
        let local = self.service.local_peer();
        let host_name = self.service.display_name(local);
        let code = generate_join_code();

        self.service.set_joinable(lobby, true);
        self.service
            .set_lobby_data(lobby, keys::HOST_PEER, &local.0.to_string());
        self.service.set_lobby_data(lobby, keys::NAME, &name);
        self.service.set_lobby_data(lobby, keys::HOST_NAME, &host_name);
        self.service
            .set_lobby_data(lobby, keys::KIND, params.kind.as_str());
        self.service.set_lobby_data(lobby, keys::CODE, &code);
        self.service.set_lobby_data(
            lobby,
            keys::PHASE,
            SessionPhase::Lobby.as_str(),
        );

        info!(%lobby, kind = params.kind.as_str(), "lobby created");
        Some(GatewayEvent::Created { lobby, code })
    }

    fn on_entered(
        &mut self,
        lobby: LobbyId,
        response: EnterResponse,
        host_active: bool,
    ) -> Option<GatewayEvent> {
        if host_active {
            debug!(%lobby, "enter result ignored while hosting");
            return None;
        }
        match self.pending_join {
            Some(target) if target == lobby => {}
            _ => {
                debug!(%lobby, ?response, "stale enter result discarded");
                return None;
            }
        }
        self.pending_join = None;
        let code_origin = std::mem::take(&mut self.code_origin);
        let permit = self.private_permit.take();

        if !response.is_success() {
            warn!(%lobby, ?response, "lobby enter refused");
            return Some(GatewayEvent::EnterFailed { lobby, response });
        }

        let kind =
            LobbyKind::parse(&self.service.lobby_data(lobby, keys::KIND));
        let invited = self.whitelist.contains(lobby, self.clock.now());
        if kind == LobbyKind::Private && permit != Some(lobby) && !invited {
            // Entered a private lobby without an invite or code match:
            // back out as if the service had refused us.
            warn!(%lobby, "uninvited enter into private lobby reversed");
            self.service.leave(lobby);
            return Some(GatewayEvent::EnterFailed {
                lobby,
                response: EnterResponse::NotAllowed,
            });
        }

        self.current = Some(lobby);
        self.is_host = false;

        if code_origin {
            self.service.set_member_data(
                lobby,
                keys::JOIN_METHOD,
                keys::JOIN_METHOD_CODE,
            );
        }

        let host_raw = self.service.lobby_data(lobby, keys::HOST_PEER);
        match host_raw.parse::<u64>() {
            Ok(raw) => {
                let host = PeerId(raw);
                info!(%lobby, %host, "lobby entered");
                Some(GatewayEvent::Entered { lobby, host })
            }
            Err(_) => {
                // No host address published: nothing to connect to. Leave
                // quietly; the join timeout surfaces the failure.
                warn!(%lobby, "entered lobby has no host address");
                self.service.leave(lobby);
                self.current = None;
                None
            }
        }
    }

    fn on_membership_changed(
        &mut self,
        lobby: LobbyId,
        member: PeerId,
        change: MemberChange,
    ) -> Option<GatewayEvent> {
        if self.current != Some(lobby) || member != self.service.local_peer() {
            return None;
        }
        match change {
            MemberChange::Entered => None,
            MemberChange::Left => {
                self.manual_disconnect = true;
                None
            }
            MemberChange::Disconnected => {
                self.manual_disconnect = false;
                None
            }
            MemberChange::Kicked => {
                self.manual_disconnect = false;
                info!(%lobby, "removed from lobby: kicked");
                Some(GatewayEvent::ForcedExit {
                    reason: DisconnectReason::Kicked,
                })
            }
            MemberChange::Banned => {
                self.manual_disconnect = false;
                info!(%lobby, "removed from lobby: banned");
                Some(GatewayEvent::ForcedExit {
                    reason: DisconnectReason::Banned,
                })
            }
        }
    }

    /// Releases the held lobby and every piece of per-attempt state.
    fn release_current(&mut self) {
        if let Some(lobby) = self.current.take() {
            if self.is_host {
                self.service.set_joinable(lobby, false);
                self.service.set_lobby_data(lobby, keys::HOST_PEER, "");
            }
            self.service.leave(lobby);
            info!(%lobby, was_host = self.is_host, "lobby released");
        }
        self.is_host = false;
        self.pending_join = None;
        self.code_origin = false;
        self.private_permit = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testsupport::{Call, FakePresence};
    use lobbylink_timer::ManualClock;

    fn gateway(
        service: FakePresence,
    ) -> (PresenceGateway<FakePresence, ManualClock>, ManualClock) {
        let clock = ManualClock::new();
        (
            PresenceGateway::with_clock(
                service,
                GatewayConfig::default(),
                clock.clone(),
            ),
            clock,
        )
    }

    fn created(lobby: u64) -> PresenceEvent {
        PresenceEvent::Created {
            lobby: Some(LobbyId(lobby)),
        }
    }

    fn entered(lobby: u64, response: EnterResponse) -> PresenceEvent {
        PresenceEvent::Entered {
            lobby: LobbyId(lobby),
            response,
        }
    }

    #[test]
    fn test_create_publishes_metadata_and_reports_created() {
        let service = FakePresence::new(PeerId(10)).with_name(PeerId(10), "Ada");
        let (mut gw, _clock) = gateway(service);

        gw.create(CreateParams {
            name: "  my lobby  ".into(),
            kind: LobbyKind::Friends,
            max_members: 4,
        })
        .unwrap();
        assert!(gw.has_pending());

        let event = gw.handle_event(created(5), false).unwrap();
        let GatewayEvent::Created { lobby, code } = event else {
            panic!("expected Created, got {event:?}");
        };
        assert_eq!(lobby, LobbyId(5));
        assert_eq!(code.len(), 6);

        assert_eq!(gw.current_lobby(), Some(LobbyId(5)));
        assert!(gw.is_host());
        let data = |key| gw.service().lobby_data(LobbyId(5), key);
        assert_eq!(data(keys::NAME), "my lobby");
        assert_eq!(data(keys::HOST_PEER), "10");
        assert_eq!(data(keys::HOST_NAME), "Ada");
        assert_eq!(data(keys::KIND), "friends");
        assert_eq!(data(keys::PHASE), "lobby");
        assert_eq!(data(keys::CODE), code);
        assert!(gw.service().calls.contains(&Call::SetJoinable {
            lobby: LobbyId(5),
            joinable: true
        }));
    }

    #[test]
    fn test_create_clamps_member_count() {
        let (mut gw, _clock) = gateway(FakePresence::new(PeerId(10)));
        gw.create(CreateParams {
            name: "x".into(),
            kind: LobbyKind::Public,
            max_members: 99,
        })
        .unwrap();

        assert!(gw.service().calls.contains(&Call::Create {
            kind: LobbyKind::Public,
            max_members: MAX_MEMBERS
        }));
    }

    #[test]
    fn test_create_while_pending_returns_busy() {
        let (mut gw, _clock) = gateway(FakePresence::new(PeerId(10)));
        let params = CreateParams {
            name: "x".into(),
            kind: LobbyKind::Public,
            max_members: 4,
        };
        gw.create(params.clone()).unwrap();

        assert_eq!(gw.create(params), Err(GatewayError::Busy));
    }

    #[test]
    fn test_create_releases_previously_held_lobby() {
        let service = FakePresence::new(PeerId(10)).in_lobby(LobbyId(3));
        let (mut gw, _clock) = gateway(service);
        gw.join(LobbyId(3)).unwrap();
        gw.handle_event(entered(3, EnterResponse::Success), false);
        assert_eq!(gw.current_lobby(), Some(LobbyId(3)));

        gw.create(CreateParams {
            name: "x".into(),
            kind: LobbyKind::Public,
            max_members: 4,
        })
        .unwrap();

        assert!(gw.service().calls.contains(&Call::Leave(LobbyId(3))));
        assert_eq!(gw.current_lobby(), None);
    }

    #[test]
    fn test_stale_creation_result_is_discarded() {
        let (mut gw, _clock) = gateway(FakePresence::new(PeerId(10)));
        assert_eq!(gw.handle_event(created(5), false), None);
        assert_eq!(gw.current_lobby(), None);
    }

    #[test]
    fn test_creation_failure_reports_create_failed() {
        let (mut gw, _clock) = gateway(FakePresence::new(PeerId(10)));
        gw.create(CreateParams {
            name: "x".into(),
            kind: LobbyKind::Public,
            max_members: 4,
        })
        .unwrap();

        let event = gw.handle_event(PresenceEvent::Created { lobby: None }, false);
        assert_eq!(event, Some(GatewayEvent::CreateFailed));
        assert!(!gw.has_pending());
    }

    #[test]
    fn test_join_success_reports_host_to_connect() {
        let service = FakePresence::new(PeerId(10))
            .in_lobby(LobbyId(3))
            .with_lobby_data(LobbyId(3), keys::HOST_PEER, "42");
        let (mut gw, _clock) = gateway(service);
        gw.join(LobbyId(3)).unwrap();

        let event = gw.handle_event(entered(3, EnterResponse::Success), false);
        assert_eq!(
            event,
            Some(GatewayEvent::Entered {
                lobby: LobbyId(3),
                host: PeerId(42)
            })
        );
        assert_eq!(gw.current_lobby(), Some(LobbyId(3)));
        assert!(!gw.is_host());
    }

    #[test]
    fn test_join_while_in_lobby_returns_already_in_lobby() {
        let service = FakePresence::new(PeerId(10))
            .in_lobby(LobbyId(3))
            .with_lobby_data(LobbyId(3), keys::HOST_PEER, "42");
        let (mut gw, _clock) = gateway(service);
        gw.join(LobbyId(3)).unwrap();
        gw.handle_event(entered(3, EnterResponse::Success), false);

        assert_eq!(gw.join(LobbyId(4)), Err(GatewayError::AlreadyInLobby));
    }

    #[test]
    fn test_enter_result_for_other_lobby_is_discarded() {
        let (mut gw, _clock) = gateway(FakePresence::new(PeerId(10)));
        gw.join(LobbyId(3)).unwrap();

        assert_eq!(gw.handle_event(entered(9, EnterResponse::Success), false), None);
        // The real target's completion still lands.
        assert!(gw.has_pending());
    }

    #[test]
    fn test_enter_result_after_cancel_is_discarded() {
        let (mut gw, _clock) = gateway(FakePresence::new(PeerId(10)));
        gw.join(LobbyId(3)).unwrap();
        gw.cancel_join();

        assert_eq!(gw.handle_event(entered(3, EnterResponse::Success), false), None);
        assert_eq!(gw.current_lobby(), None);
    }

    #[test]
    fn test_enter_result_ignored_while_hosting() {
        let (mut gw, _clock) = gateway(FakePresence::new(PeerId(10)));
        gw.join(LobbyId(3)).unwrap();

        let event = gw.handle_event(entered(3, EnterResponse::Success), true);
        assert_eq!(event, None);
    }

    #[test]
    fn test_enter_refusal_reports_enter_failed() {
        let (mut gw, _clock) = gateway(FakePresence::new(PeerId(10)));
        gw.join(LobbyId(3)).unwrap();

        let event = gw.handle_event(entered(3, EnterResponse::Full), false);
        assert_eq!(
            event,
            Some(GatewayEvent::EnterFailed {
                lobby: LobbyId(3),
                response: EnterResponse::Full
            })
        );
        assert_eq!(gw.current_lobby(), None);
    }

    #[test]
    fn test_uninvited_private_enter_is_reversed() {
        let service = FakePresence::new(PeerId(10))
            .in_lobby(LobbyId(3))
            .with_lobby_data(LobbyId(3), keys::KIND, "private")
            .with_lobby_data(LobbyId(3), keys::HOST_PEER, "42");
        let (mut gw, _clock) = gateway(service);
        gw.join(LobbyId(3)).unwrap();

        let event = gw.handle_event(entered(3, EnterResponse::Success), false);
        assert_eq!(
            event,
            Some(GatewayEvent::EnterFailed {
                lobby: LobbyId(3),
                response: EnterResponse::NotAllowed
            })
        );
        assert!(gw.service().calls.contains(&Call::Leave(LobbyId(3))));
        assert_eq!(gw.current_lobby(), None);
    }

    #[test]
    fn test_private_enter_with_permit_succeeds() {
        let service = FakePresence::new(PeerId(10))
            .in_lobby(LobbyId(3))
            .with_lobby_data(LobbyId(3), keys::KIND, "private")
            .with_lobby_data(LobbyId(3), keys::HOST_PEER, "42");
        let (mut gw, _clock) = gateway(service);
        gw.allow_private_once(LobbyId(3));
        gw.join(LobbyId(3)).unwrap();

        let event = gw.handle_event(entered(3, EnterResponse::Success), false);
        assert!(matches!(event, Some(GatewayEvent::Entered { .. })));
    }

    #[test]
    fn test_private_enter_with_live_invite_succeeds() {
        let service = FakePresence::new(PeerId(10))
            .in_lobby(LobbyId(3))
            .with_lobby_data(LobbyId(3), keys::KIND, "private")
            .with_lobby_data(LobbyId(3), keys::HOST_PEER, "42");
        let (mut gw, _clock) = gateway(service);
        gw.handle_event(
            PresenceEvent::InviteReceived {
                lobby: LobbyId(3),
                from: PeerId(42),
            },
            false,
        );
        gw.join(LobbyId(3)).unwrap();

        let event = gw.handle_event(entered(3, EnterResponse::Success), false);
        assert!(matches!(event, Some(GatewayEvent::Entered { .. })));
    }

    #[test]
    fn test_private_enter_with_expired_invite_is_reversed() {
        let service = FakePresence::new(PeerId(10))
            .in_lobby(LobbyId(3))
            .with_lobby_data(LobbyId(3), keys::KIND, "private")
            .with_lobby_data(LobbyId(3), keys::HOST_PEER, "42");
        let (mut gw, clock) = gateway(service);
        gw.handle_event(
            PresenceEvent::InviteReceived {
                lobby: LobbyId(3),
                from: PeerId(42),
            },
            false,
        );
        clock.advance(INVITE_TTL);
        gw.join(LobbyId(3)).unwrap();

        let event = gw.handle_event(entered(3, EnterResponse::Success), false);
        assert!(matches!(event, Some(GatewayEvent::EnterFailed { .. })));
    }

    #[test]
    fn test_code_origin_join_publishes_member_data() {
        let service = FakePresence::new(PeerId(10))
            .in_lobby(LobbyId(3))
            .with_lobby_data(LobbyId(3), keys::HOST_PEER, "42");
        let (mut gw, _clock) = gateway(service);
        gw.flag_code_origin();
        gw.join(LobbyId(3)).unwrap();
        gw.handle_event(entered(3, EnterResponse::Success), false);

        assert_eq!(
            gw.service().member_data(LobbyId(3), PeerId(10), keys::JOIN_METHOD),
            keys::JOIN_METHOD_CODE
        );
    }

    #[test]
    fn test_missing_host_address_aborts_silently() {
        let service = FakePresence::new(PeerId(10)).in_lobby(LobbyId(3));
        let (mut gw, _clock) = gateway(service);
        gw.join(LobbyId(3)).unwrap();

        let event = gw.handle_event(entered(3, EnterResponse::Success), false);
        assert_eq!(event, None);
        assert_eq!(gw.current_lobby(), None);
        assert!(gw.service().calls.contains(&Call::Leave(LobbyId(3))));
    }

    #[test]
    fn test_kicked_membership_change_reports_forced_exit() {
        let service = FakePresence::new(PeerId(10))
            .in_lobby(LobbyId(3))
            .with_lobby_data(LobbyId(3), keys::HOST_PEER, "42");
        let (mut gw, _clock) = gateway(service);
        gw.join(LobbyId(3)).unwrap();
        gw.handle_event(entered(3, EnterResponse::Success), false);

        let event = gw.handle_event(
            PresenceEvent::MembershipChanged {
                lobby: LobbyId(3),
                member: PeerId(10),
                change: MemberChange::Kicked,
            },
            false,
        );
        assert_eq!(
            event,
            Some(GatewayEvent::ForcedExit {
                reason: DisconnectReason::Kicked
            })
        );
    }

    #[test]
    fn test_membership_change_of_other_member_is_ignored() {
        let service = FakePresence::new(PeerId(10))
            .in_lobby(LobbyId(3))
            .with_lobby_data(LobbyId(3), keys::HOST_PEER, "42");
        let (mut gw, _clock) = gateway(service);
        gw.join(LobbyId(3)).unwrap();
        gw.handle_event(entered(3, EnterResponse::Success), false);

        let event = gw.handle_event(
            PresenceEvent::MembershipChanged {
                lobby: LobbyId(3),
                member: PeerId(99),
                change: MemberChange::Kicked,
            },
            false,
        );
        assert_eq!(event, None);
    }

    #[test]
    fn test_local_leave_sets_manual_disconnect() {
        let service = FakePresence::new(PeerId(10))
            .in_lobby(LobbyId(3))
            .with_lobby_data(LobbyId(3), keys::HOST_PEER, "42");
        let (mut gw, _clock) = gateway(service);
        gw.join(LobbyId(3)).unwrap();
        gw.handle_event(entered(3, EnterResponse::Success), false);

        gw.handle_event(
            PresenceEvent::MembershipChanged {
                lobby: LobbyId(3),
                member: PeerId(10),
                change: MemberChange::Left,
            },
            false,
        );
        assert!(gw.manual_disconnect());

        gw.handle_event(
            PresenceEvent::MembershipChanged {
                lobby: LobbyId(3),
                member: PeerId(10),
                change: MemberChange::Disconnected,
            },
            false,
        );
        assert!(!gw.manual_disconnect());
    }

    #[test]
    fn test_list_ready_carries_current_version() {
        let (mut gw, _clock) = gateway(FakePresence::new(PeerId(10)));
        let v1 = gw.request_list(ListFilter::Public).unwrap();
        let v2 = gw.request_list(ListFilter::Public).unwrap();
        assert!(v2 > v1);

        let event = gw.handle_event(
            PresenceEvent::ListReceived {
                lobbies: vec![LobbyId(1)],
            },
            false,
        );
        assert_eq!(
            event,
            Some(GatewayEvent::ListReady {
                version: v2,
                lobbies: vec![LobbyId(1)]
            })
        );
    }

    #[test]
    fn test_leave_current_releases_host_advertisement() {
        let (mut gw, _clock) = gateway(FakePresence::new(PeerId(10)));
        gw.create(CreateParams {
            name: "x".into(),
            kind: LobbyKind::Public,
            max_members: 4,
        })
        .unwrap();
        gw.handle_event(created(5), false);

        gw.leave_current();
        assert_eq!(gw.current_lobby(), None);
        assert!(gw.service().calls.contains(&Call::SetJoinable {
            lobby: LobbyId(5),
            joinable: false
        }));
        assert_eq!(gw.service().lobby_data(LobbyId(5), keys::HOST_PEER), "");

        // Idempotent.
        gw.leave_current();
    }

    #[test]
    fn test_close_hosted_marks_closed_and_unjoinable() {
        let (mut gw, _clock) = gateway(FakePresence::new(PeerId(10)));
        gw.create(CreateParams {
            name: "x".into(),
            kind: LobbyKind::Public,
            max_members: 4,
        })
        .unwrap();
        gw.handle_event(created(5), false);

        gw.close_hosted();
        assert_eq!(gw.service().lobby_data(LobbyId(5), keys::PHASE), "closed");
        assert!(gw.service().calls.contains(&Call::SetJoinable {
            lobby: LobbyId(5),
            joinable: false
        }));
    }

    #[test]
    fn test_set_phase_is_noop_for_non_host() {
        let service = FakePresence::new(PeerId(10))
            .in_lobby(LobbyId(3))
            .with_lobby_data(LobbyId(3), keys::HOST_PEER, "42");
        let (mut gw, _clock) = gateway(service);
        gw.join(LobbyId(3)).unwrap();
        gw.handle_event(entered(3, EnterResponse::Success), false);

        gw.set_phase(SessionPhase::Game);
        assert_eq!(gw.service().lobby_data(LobbyId(3), keys::PHASE), "");
    }
}
