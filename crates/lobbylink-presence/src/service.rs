//! The presence/matchmaking service boundary.
//!
//! Everything the session core needs from the external presence backend is
//! behind [`PresenceService`]. Requests are fire-and-forget: the methods
//! return as soon as the request is issued, and the outcome arrives later
//! as a [`PresenceEvent`] fed back into the gateway.

use lobbylink_protocol::{
    EnterResponse, LobbyId, LobbyKind, MemberChange, PeerId,
};

use crate::PresenceError;

/// Which lobbies a list request should return.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ListFilter {
    /// Joinable public lobbies.
    #[default]
    Public,
    /// Lobbies hosted by established contacts.
    Friends,
}

impl ListFilter {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Public => "public",
            Self::Friends => "friends",
        }
    }
}

/// Asynchronous completions and notifications from the presence backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PresenceEvent {
    /// A creation request completed. `None` means creation failed.
    Created { lobby: Option<LobbyId> },
    /// An enter attempt completed (success or a refusal verdict).
    Entered {
        lobby: LobbyId,
        response: EnterResponse,
    },
    /// A list request completed with these candidate lobbies.
    ListReceived { lobbies: Vec<LobbyId> },
    /// A member entered, left, or was removed from a lobby.
    MembershipChanged {
        lobby: LobbyId,
        member: PeerId,
        change: MemberChange,
    },
    /// Another user invited the local peer to their lobby.
    InviteReceived { lobby: LobbyId, from: PeerId },
    /// The local user accepted an invite or requested a join through the
    /// platform overlay; the session core should start a join toward it.
    JoinRequested { lobby: LobbyId },
}

/// Operations the session core performs against the presence backend.
///
/// Metadata is a string key/value store per lobby (and per member within a
/// lobby); absent keys read as the empty string, matching how presence
/// backends behave.
pub trait PresenceService {
    /// Whether the backend session is up and requests can be issued.
    fn is_ready(&self) -> bool;

    /// The local user's peer identity.
    fn local_peer(&self) -> PeerId;

    /// Display name for a peer (empty if unknown).
    fn display_name(&self, peer: PeerId) -> String;

    /// Whether `peer` is an established contact of the local user.
    fn is_contact(&self, peer: PeerId) -> bool;

    /// Requests creation of a lobby. Completes via
    /// [`PresenceEvent::Created`].
    ///
    /// # Errors
    /// Returns an error if the request could not be issued.
    fn request_create(
        &mut self,
        kind: LobbyKind,
        max_members: u32,
    ) -> Result<(), PresenceError>;

    /// Requests entry into `lobby`. Completes via
    /// [`PresenceEvent::Entered`].
    ///
    /// # Errors
    /// Returns an error if the request could not be issued.
    fn request_join(&mut self, lobby: LobbyId) -> Result<(), PresenceError>;

    /// Leaves `lobby`. Fire-and-forget; never fails.
    fn leave(&mut self, lobby: LobbyId);

    /// Requests a filtered lobby list. Completes via
    /// [`PresenceEvent::ListReceived`].
    ///
    /// # Errors
    /// Returns an error if the request could not be issued.
    fn request_list(&mut self, filter: ListFilter)
    -> Result<(), PresenceError>;

    /// Marks a lobby as joinable or not (host only).
    fn set_joinable(&mut self, lobby: LobbyId, joinable: bool);

    /// Writes a lobby metadata entry (host only).
    fn set_lobby_data(&mut self, lobby: LobbyId, key: &str, value: &str);

    /// Reads a lobby metadata entry. Absent keys read as `""`.
    fn lobby_data(&self, lobby: LobbyId, key: &str) -> String;

    /// Writes a metadata entry on the local member of `lobby`.
    fn set_member_data(&mut self, lobby: LobbyId, key: &str, value: &str);

    /// Reads a metadata entry of `member` within `lobby`. Absent keys read
    /// as `""`.
    fn member_data(&self, lobby: LobbyId, member: PeerId, key: &str)
    -> String;

    /// Current members of `lobby`.
    fn members(&self, lobby: LobbyId) -> Vec<PeerId>;

    /// Current member count of `lobby` (0 if unknown).
    fn member_count(&self, lobby: LobbyId) -> usize;

    /// Member capacity of `lobby` (0 if unknown).
    fn member_limit(&self, lobby: LobbyId) -> usize;

    /// The lobby's owner, if known.
    fn owner(&self, lobby: LobbyId) -> Option<PeerId>;
}
