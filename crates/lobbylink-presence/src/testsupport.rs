//! In-memory presence backend shared by this crate's unit tests.

use std::collections::{HashMap, HashSet};

use lobbylink_protocol::{LobbyId, LobbyKind, PeerId};

use crate::{ListFilter, PresenceError, PresenceService};

/// Requests the fake recorded, in call order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Create { kind: LobbyKind, max_members: u32 },
    Join(LobbyId),
    Leave(LobbyId),
    List(ListFilter),
    SetJoinable { lobby: LobbyId, joinable: bool },
}

/// A scriptable [`PresenceService`] backed by hash maps.
#[derive(Debug)]
pub struct FakePresence {
    pub ready: bool,
    pub local: PeerId,
    pub names: HashMap<PeerId, String>,
    pub contacts: HashSet<PeerId>,
    pub lobby_data: HashMap<(LobbyId, String), String>,
    pub member_data: HashMap<(LobbyId, PeerId, String), String>,
    pub members: HashMap<LobbyId, Vec<PeerId>>,
    pub limits: HashMap<LobbyId, usize>,
    pub owners: HashMap<LobbyId, PeerId>,
    pub calls: Vec<Call>,
    /// When true, every request_* call fails.
    pub fail_requests: bool,
}

impl FakePresence {
    pub fn new(local: PeerId) -> Self {
        Self {
            ready: true,
            local,
            names: HashMap::new(),
            contacts: HashSet::new(),
            lobby_data: HashMap::new(),
            member_data: HashMap::new(),
            members: HashMap::new(),
            limits: HashMap::new(),
            owners: HashMap::new(),
            calls: Vec::new(),
            fail_requests: false,
        }
    }

    pub fn with_name(mut self, peer: PeerId, name: &str) -> Self {
        self.names.insert(peer, name.to_owned());
        self
    }

    pub fn with_contact(mut self, peer: PeerId) -> Self {
        self.contacts.insert(peer);
        self
    }

    /// Seeds a lobby whose member roster includes the local peer.
    pub fn in_lobby(mut self, lobby: LobbyId) -> Self {
        self.members.entry(lobby).or_default().push(self.local);
        self.limits.entry(lobby).or_insert(4);
        self
    }

    pub fn with_lobby_data(
        mut self,
        lobby: LobbyId,
        key: &str,
        value: &str,
    ) -> Self {
        self.lobby_data.insert((lobby, key.to_owned()), value.to_owned());
        self
    }

    pub fn with_members(
        mut self,
        lobby: LobbyId,
        members: &[PeerId],
        limit: usize,
    ) -> Self {
        self.members.insert(lobby, members.to_vec());
        self.limits.insert(lobby, limit);
        self
    }

    pub fn with_owner(mut self, lobby: LobbyId, owner: PeerId) -> Self {
        self.owners.insert(lobby, owner);
        self
    }

    fn check(&self) -> Result<(), PresenceError> {
        if self.fail_requests {
            return Err(PresenceError::Backend("scripted failure".into()));
        }
        if !self.ready {
            return Err(PresenceError::NotReady);
        }
        Ok(())
    }
}

impl PresenceService for FakePresence {
    fn is_ready(&self) -> bool {
        self.ready
    }

    fn local_peer(&self) -> PeerId {
        self.local
    }

    fn display_name(&self, peer: PeerId) -> String {
        self.names.get(&peer).cloned().unwrap_or_default()
    }

    fn is_contact(&self, peer: PeerId) -> bool {
        self.contacts.contains(&peer)
    }

    fn request_create(
        &mut self,
        kind: LobbyKind,
        max_members: u32,
    ) -> Result<(), PresenceError> {
        self.check()?;
        self.calls.push(Call::Create { kind, max_members });
        Ok(())
    }

    fn request_join(&mut self, lobby: LobbyId) -> Result<(), PresenceError> {
        self.check()?;
        self.calls.push(Call::Join(lobby));
        Ok(())
    }

    fn leave(&mut self, lobby: LobbyId) {
        self.calls.push(Call::Leave(lobby));
        if let Some(members) = self.members.get_mut(&lobby) {
            members.retain(|m| *m != self.local);
        }
    }

    fn request_list(
        &mut self,
        filter: ListFilter,
    ) -> Result<(), PresenceError> {
        self.check()?;
        self.calls.push(Call::List(filter));
        Ok(())
    }

    fn set_joinable(&mut self, lobby: LobbyId, joinable: bool) {
        self.calls.push(Call::SetJoinable { lobby, joinable });
    }

    fn set_lobby_data(&mut self, lobby: LobbyId, key: &str, value: &str) {
        self.lobby_data.insert((lobby, key.to_owned()), value.to_owned());
    }

    fn lobby_data(&self, lobby: LobbyId, key: &str) -> String {
        self.lobby_data
            .get(&(lobby, key.to_owned()))
            .cloned()
            .unwrap_or_default()
    }

    fn set_member_data(&mut self, lobby: LobbyId, key: &str, value: &str) {
        self.member_data
            .insert((lobby, self.local, key.to_owned()), value.to_owned());
    }

    fn member_data(
        &self,
        lobby: LobbyId,
        member: PeerId,
        key: &str,
    ) -> String {
        self.member_data
            .get(&(lobby, member, key.to_owned()))
            .cloned()
            .unwrap_or_default()
    }

    fn members(&self, lobby: LobbyId) -> Vec<PeerId> {
        self.members.get(&lobby).cloned().unwrap_or_default()
    }

    fn member_count(&self, lobby: LobbyId) -> usize {
        self.members.get(&lobby).map_or(0, Vec::len)
    }

    fn member_limit(&self, lobby: LobbyId) -> usize {
        self.limits.get(&lobby).copied().unwrap_or(0)
    }

    fn owner(&self, lobby: LobbyId) -> Option<PeerId> {
        self.owners.get(&lobby).copied()
    }
}
