//! The session-side adapter over the raw transport.
//!
//! ```text
//!   start host/client ──▶ ┌────────────────────────┐
//!   broadcast shutdown ─▶ │ NetworkSessionAdapter  │ ──▶ NetTransport calls
//!   TransportEvent ─────▶ └────────────────────────┘ ──▶ AdapterSignal
//! ```
//!
//! The adapter enforces connection authorization on the host side (an
//! unauthorized peer is disconnected before it ever reaches game code) and
//! frames the shutdown control message on both sides. Everything session-
//! level that the transport must not know about — lobby membership, contact
//! lists, the in-game flag — lives here.

use lobbylink_presence::{PresenceGateway, PresenceService};
use lobbylink_protocol::{
    Codec, DisconnectReason, JsonCodec, LobbyKind, PeerId, ShutdownMessage,
    keys,
};
use lobbylink_timer::Clock;
use tracing::{debug, info, warn};

use crate::{NetError, NetTransport, TransportEvent};

/// Session-relevant outcomes of a transport event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdapterSignal {
    /// The host announced shutdown; the local session must exit.
    RemoteShutdown { reason: DisconnectReason },
    /// The client link dropped. `manual` distinguishes a deliberate local
    /// leave from a genuine connection loss.
    LinkLost { manual: bool },
}

/// Binds a [`NetTransport`] to session semantics.
#[derive(Debug)]
pub struct NetworkSessionAdapter<T, D = JsonCodec> {
    transport: T,
    codec: D,
    game_in_progress: bool,
}

impl<T: NetTransport> NetworkSessionAdapter<T, JsonCodec> {
    pub fn new(transport: T) -> Self {
        Self::with_codec(transport, JsonCodec)
    }
}

impl<T, D> NetworkSessionAdapter<T, D>
where
    T: NetTransport,
    D: Codec,
{
    pub fn with_codec(transport: T, codec: D) -> Self {
        Self {
            transport,
            codec,
            game_in_progress: false,
        }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    pub fn host_active(&self) -> bool {
        self.transport.host_active()
    }

    pub fn client_active(&self) -> bool {
        self.transport.client_active()
    }

    /// Whether a network session (host or client) is running.
    pub fn session_active(&self) -> bool {
        self.host_active() || self.client_active()
    }

    /// Starts hosting with the given connection cap.
    ///
    /// # Errors
    /// Propagates the transport's startup failure.
    pub fn start_host(&mut self, max_connections: u32) -> Result<(), NetError> {
        self.transport.set_max_connections(max_connections);
        self.transport.start_host()?;
        info!(max_connections, "host session started");
        Ok(())
    }

    pub fn stop_host(&mut self) {
        self.transport.stop_host();
    }

    /// Connects to `host`.
    ///
    /// # Errors
    /// Propagates the transport's connection failure.
    pub fn start_client(&mut self, host: PeerId) -> Result<(), NetError> {
        self.transport.start_client(host)?;
        info!(%host, "client session started");
        Ok(())
    }

    pub fn stop_client(&mut self) {
        self.transport.stop_client();
    }

    /// Marks whether gameplay has started; while set, no new connection is
    /// admitted.
    pub fn set_game_in_progress(&mut self, in_progress: bool) {
        self.game_in_progress = in_progress;
    }

    pub fn game_in_progress(&self) -> bool {
        self.game_in_progress
    }

    /// Announces shutdown to every connected client. The wire reason is
    /// always `ServerShutdown`: from a client's perspective the host went
    /// away, whatever the host's own motive was.
    ///
    /// # Errors
    /// Returns an encode failure; the broadcast is skipped in that case.
    pub fn broadcast_shutdown(&mut self) -> Result<(), NetError> {
        let message = ShutdownMessage {
            reason: DisconnectReason::ServerShutdown,
        };
        let frame = self.codec.encode(&message)?;
        self.transport.broadcast(&frame);
        info!("shutdown broadcast sent");
        Ok(())
    }

    /// Feeds one transport event through the adapter.
    ///
    /// Connection requests are resolved here (admit or disconnect);
    /// everything the session core must react to comes back as a signal.
    pub fn handle_event<P, C>(
        &mut self,
        event: TransportEvent,
        gateway: &PresenceGateway<P, C>,
    ) -> Option<AdapterSignal>
    where
        P: PresenceService,
        C: Clock,
    {
        match event {
            TransportEvent::ConnectionRequested { peer } => {
                if let Err(reason) = self.authorize(peer, gateway) {
                    warn!(%peer, reason, "connection rejected");
                    self.transport.disconnect(peer);
                } else {
                    debug!(%peer, "connection admitted");
                }
                None
            }
            TransportEvent::ControlReceived { frame } => {
                match self.codec.decode::<ShutdownMessage>(&frame) {
                    Ok(message) => {
                        info!(reason = %message.reason, "shutdown received");
                        Some(AdapterSignal::RemoteShutdown {
                            reason: message.reason,
                        })
                    }
                    Err(err) => {
                        warn!(%err, "undecodable control frame dropped");
                        None
                    }
                }
            }
            TransportEvent::ClientDisconnected => {
                Some(AdapterSignal::LinkLost {
                    manual: gateway.manual_disconnect(),
                })
            }
        }
    }

    fn authorize<P, C>(
        &self,
        peer: PeerId,
        gateway: &PresenceGateway<P, C>,
    ) -> Result<(), &'static str>
    where
        P: PresenceService,
        C: Clock,
    {
        if self.game_in_progress {
            return Err("game in progress");
        }
        let Some(lobby) = gateway.current_lobby() else {
            return Err("no lobby held");
        };
        let service = gateway.service();
        if !service.members(lobby).contains(&peer) {
            return Err("not a lobby member");
        }
        let kind = LobbyKind::parse(&service.lobby_data(lobby, keys::KIND));
        if kind == LobbyKind::Friends {
            let contact = service.is_contact(peer);
            let via_code = service.member_data(lobby, peer, keys::JOIN_METHOD)
                == keys::JOIN_METHOD_CODE;
            if !contact && !via_code {
                return Err("neither contact nor code-joined");
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testsupport::FakeTransport;
    use lobbylink_presence::testsupport::FakePresence;
    use lobbylink_presence::{
        CreateParams, GatewayConfig, PresenceEvent,
    };
    use lobbylink_protocol::{EnterResponse, LobbyId};

    type Gateway = PresenceGateway<FakePresence>;

    /// A gateway hosting lobby 5 of the given kind, with `members` seeded.
    fn hosting_gateway(kind: LobbyKind, members: &[PeerId]) -> Gateway {
        let service = FakePresence::new(PeerId(1)).with_members(
            LobbyId(5),
            members,
            8,
        );
        let mut gateway = Gateway::new(service, GatewayConfig::default());
        gateway
            .create(CreateParams {
                name: "test".into(),
                kind,
                max_members: 8,
            })
            .unwrap();
        gateway.handle_event(
            PresenceEvent::Created {
                lobby: Some(LobbyId(5)),
            },
            false,
        );
        gateway
    }

    fn adapter() -> NetworkSessionAdapter<FakeTransport> {
        NetworkSessionAdapter::new(FakeTransport::new())
    }

    fn request(peer: u64) -> TransportEvent {
        TransportEvent::ConnectionRequested { peer: PeerId(peer) }
    }

    #[test]
    fn test_lobby_member_is_admitted() {
        let gateway = hosting_gateway(LobbyKind::Public, &[PeerId(9)]);
        let mut adapter = adapter();

        assert_eq!(adapter.handle_event(request(9), &gateway), None);
        assert!(adapter.transport().disconnected.is_empty());
    }

    #[test]
    fn test_connection_rejected_while_game_in_progress() {
        let gateway = hosting_gateway(LobbyKind::Public, &[PeerId(9)]);
        let mut adapter = adapter();
        adapter.set_game_in_progress(true);

        adapter.handle_event(request(9), &gateway);
        assert_eq!(adapter.transport().disconnected, vec![PeerId(9)]);
    }

    #[test]
    fn test_connection_rejected_without_lobby() {
        let gateway =
            Gateway::new(FakePresence::new(PeerId(1)), GatewayConfig::default());
        let mut adapter = adapter();

        adapter.handle_event(request(9), &gateway);
        assert_eq!(adapter.transport().disconnected, vec![PeerId(9)]);
    }

    #[test]
    fn test_non_member_is_rejected() {
        let gateway = hosting_gateway(LobbyKind::Public, &[PeerId(9)]);
        let mut adapter = adapter();

        adapter.handle_event(request(13), &gateway);
        assert_eq!(adapter.transport().disconnected, vec![PeerId(13)]);
    }

    #[test]
    fn test_friends_lobby_rejects_stranger_without_code() {
        let gateway = hosting_gateway(LobbyKind::Friends, &[PeerId(9)]);
        let mut adapter = adapter();

        adapter.handle_event(request(9), &gateway);
        assert_eq!(adapter.transport().disconnected, vec![PeerId(9)]);
    }

    #[test]
    fn test_friends_lobby_admits_contact() {
        let service = FakePresence::new(PeerId(1))
            .with_members(LobbyId(5), &[PeerId(9)], 8)
            .with_contact(PeerId(9));
        let mut gateway = Gateway::new(service, GatewayConfig::default());
        gateway
            .create(CreateParams {
                name: "test".into(),
                kind: LobbyKind::Friends,
                max_members: 8,
            })
            .unwrap();
        gateway.handle_event(
            PresenceEvent::Created {
                lobby: Some(LobbyId(5)),
            },
            false,
        );
        let mut adapter = adapter();

        adapter.handle_event(request(9), &gateway);
        assert!(adapter.transport().disconnected.is_empty());
    }

    #[test]
    fn test_friends_lobby_admits_code_joined_stranger() {
        let mut gateway = hosting_gateway(LobbyKind::Friends, &[PeerId(9)]);
        gateway.service_mut().member_data.insert(
            (LobbyId(5), PeerId(9), keys::JOIN_METHOD.to_owned()),
            keys::JOIN_METHOD_CODE.to_owned(),
        );
        let mut adapter = adapter();

        adapter.handle_event(request(9), &gateway);
        assert!(adapter.transport().disconnected.is_empty());
    }

    #[test]
    fn test_broadcast_shutdown_always_sends_server_shutdown() {
        let mut adapter = adapter();
        adapter.broadcast_shutdown().unwrap();

        let frames = &adapter.transport().broadcasts;
        assert_eq!(frames.len(), 1);
        let decoded: ShutdownMessage =
            JsonCodec.decode(&frames[0]).unwrap();
        assert_eq!(decoded.reason, DisconnectReason::ServerShutdown);
    }

    #[test]
    fn test_shutdown_frame_produces_remote_shutdown_signal() {
        let gateway =
            Gateway::new(FakePresence::new(PeerId(1)), GatewayConfig::default());
        let mut adapter = adapter();
        let frame = JsonCodec
            .encode(&ShutdownMessage {
                reason: DisconnectReason::ServerShutdown,
            })
            .unwrap();

        let signal = adapter
            .handle_event(TransportEvent::ControlReceived { frame }, &gateway);
        assert_eq!(
            signal,
            Some(AdapterSignal::RemoteShutdown {
                reason: DisconnectReason::ServerShutdown
            })
        );
    }

    #[test]
    fn test_undecodable_control_frame_is_dropped() {
        let gateway =
            Gateway::new(FakePresence::new(PeerId(1)), GatewayConfig::default());
        let mut adapter = adapter();

        let signal = adapter.handle_event(
            TransportEvent::ControlReceived {
                frame: b"garbage".to_vec(),
            },
            &gateway,
        );
        assert_eq!(signal, None);
    }

    #[test]
    fn test_client_disconnect_reports_manual_flag() {
        let service = FakePresence::new(PeerId(1))
            .in_lobby(LobbyId(3))
            .with_lobby_data(LobbyId(3), keys::HOST_PEER, "42");
        let mut gateway = Gateway::new(service, GatewayConfig::default());
        gateway.join(LobbyId(3)).unwrap();
        gateway.handle_event(
            PresenceEvent::Entered {
                lobby: LobbyId(3),
                response: EnterResponse::Success,
            },
            false,
        );
        gateway.handle_event(
            PresenceEvent::MembershipChanged {
                lobby: LobbyId(3),
                member: PeerId(1),
                change: lobbylink_protocol::MemberChange::Left,
            },
            false,
        );
        let mut adapter = adapter();

        let signal =
            adapter.handle_event(TransportEvent::ClientDisconnected, &gateway);
        assert_eq!(signal, Some(AdapterSignal::LinkLost { manual: true }));
    }

    #[test]
    fn test_start_host_applies_connection_cap() {
        let mut adapter = adapter();
        adapter.start_host(7).unwrap();

        assert!(adapter.host_active());
        assert_eq!(adapter.transport().max_connections, Some(7));
    }
}
