//! The session driver task.
//!
//! Everything in the session core is single-logical-thread: one task owns
//! the coordinator and serializes commands, presence events, transport
//! events, and timer expiries through it with a single `select!` loop.
//! Embedders talk to the task through a cheap clonable [`SessionHandle`].

use lobbylink_flow::{ErrorSink, SceneLoader};
use lobbylink_net::{NetTransport, TransportEvent};
use lobbylink_presence::{CreateParams, ListFilter, PresenceEvent, PresenceService};
use lobbylink_protocol::{DisconnectReason, LobbyId, SessionPhase};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::{LobbySessionCoordinator, LobbylinkError};

/// Operations embedders can ask the session task to perform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionCommand {
    Create(CreateParams),
    JoinById(LobbyId),
    JoinByCode(String),
    JoinByInvite(LobbyId),
    Exit(DisconnectReason),
    RequestList(ListFilter),
    SetPhase(SessionPhase),
}

/// Sending half of a running session task.
#[derive(Debug, Clone)]
pub struct SessionHandle {
    commands: mpsc::UnboundedSender<SessionCommand>,
    presence: mpsc::UnboundedSender<PresenceEvent>,
    transport: mpsc::UnboundedSender<TransportEvent>,
}

impl SessionHandle {
    /// Queues a command for the session task.
    ///
    /// # Errors
    /// [`LobbylinkError::DriverClosed`] if the task has stopped.
    pub fn command(&self, command: SessionCommand) -> Result<(), LobbylinkError> {
        self.commands
            .send(command)
            .map_err(|_| LobbylinkError::DriverClosed)
    }

    /// Forwards a presence-backend event to the session task.
    ///
    /// # Errors
    /// [`LobbylinkError::DriverClosed`] if the task has stopped.
    pub fn presence_event(
        &self,
        event: PresenceEvent,
    ) -> Result<(), LobbylinkError> {
        self.presence
            .send(event)
            .map_err(|_| LobbylinkError::DriverClosed)
    }

    /// Forwards a transport event to the session task.
    ///
    /// # Errors
    /// [`LobbylinkError::DriverClosed`] if the task has stopped.
    pub fn transport_event(
        &self,
        event: TransportEvent,
    ) -> Result<(), LobbylinkError> {
        self.transport
            .send(event)
            .map_err(|_| LobbylinkError::DriverClosed)
    }
}

/// Spawns the session task owning `coordinator`.
///
/// The task runs until every [`SessionHandle`] clone is dropped. Session
/// events keep flowing on the receiver returned by the coordinator's
/// constructor.
pub fn spawn<P, T, S, E>(
    mut coordinator: LobbySessionCoordinator<P, T, S, E>,
) -> (SessionHandle, JoinHandle<()>)
where
    P: PresenceService + Send + 'static,
    T: NetTransport + Send + 'static,
    S: SceneLoader + Send + 'static,
    E: ErrorSink + Send + Sync + 'static,
{
    let (command_tx, mut command_rx) = mpsc::unbounded_channel();
    let (presence_tx, mut presence_rx) = mpsc::unbounded_channel();
    let (transport_tx, mut transport_rx) = mpsc::unbounded_channel();

    let task = tokio::spawn(async move {
        loop {
            let deadline = coordinator.next_deadline();
            tokio::select! {
                command = command_rx.recv() => match command {
                    Some(command) => dispatch(&mut coordinator, command).await,
                    None => break,
                },
                event = presence_rx.recv() => {
                    if let Some(event) = event {
                        coordinator.handle_presence(event).await;
                    }
                }
                event = transport_rx.recv() => {
                    if let Some(event) = event {
                        coordinator.handle_transport(event).await;
                    }
                }
                () = sleep_until(deadline) => {
                    coordinator.fire_due_timers();
                }
            }
        }
        debug!("session driver stopped");
    });

    (
        SessionHandle {
            commands: command_tx,
            presence: presence_tx,
            transport: transport_tx,
        },
        task,
    )
}

async fn dispatch<P, T, S, E>(
    coordinator: &mut LobbySessionCoordinator<P, T, S, E>,
    command: SessionCommand,
) where
    P: PresenceService,
    T: NetTransport,
    S: SceneLoader,
    E: ErrorSink,
{
    match command {
        SessionCommand::Create(params) => {
            coordinator.create_lobby(params);
        }
        SessionCommand::JoinById(lobby) => {
            coordinator.join_by_id(lobby);
        }
        SessionCommand::JoinByCode(code) => {
            coordinator.join_by_code(&code);
        }
        SessionCommand::JoinByInvite(lobby) => {
            coordinator.join_by_invite(lobby);
        }
        SessionCommand::Exit(reason) => coordinator.exit(reason).await,
        SessionCommand::RequestList(filter) => {
            coordinator.request_list(filter);
        }
        SessionCommand::SetPhase(phase) => {
            coordinator.set_session_phase(phase);
        }
    }
}

/// Sleeps until `deadline`, or forever when there is none pending.
async fn sleep_until(deadline: Option<std::time::Instant>) {
    match deadline {
        Some(deadline) => {
            tokio::time::sleep_until(tokio::time::Instant::from_std(deadline))
                .await;
        }
        None => std::future::pending().await,
    }
}
