//! Lobby list collection and join-code lookup.
//!
//! The presence backend answers a list request with bare lobby ids; the
//! browser turns them into displayable summaries, filtering out entries a
//! player could not actually join. Every request carries a version stamp
//! (from [`PresenceGateway::request_list`](crate::PresenceGateway)) so a
//! late response for a superseded request is dropped, not rendered.

use lobbylink_protocol::{
    LobbyId, LobbyKind, MAX_LIST_RESULTS, SessionPhase, keys,
};
use tracing::debug;

use crate::{ListFilter, PresenceService};

/// One joinable lobby, ready for display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LobbySummary {
    pub id: LobbyId,
    pub name: String,
    pub host_name: String,
    pub kind: LobbyKind,
    pub member_count: usize,
    pub member_limit: usize,
}

/// Result of scanning a candidate list for a join code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodeLookup {
    /// A joinable lobby advertises this code.
    Found(LobbyId),
    /// The only lobbies advertising this code are full.
    FoundFull,
    NotFound,
}

/// Versioned list-request state plus candidate filtering.
#[derive(Debug)]
pub struct LobbyBrowser {
    filter: ListFilter,
    pending: Option<u64>,
}

impl LobbyBrowser {
    pub fn new(filter: ListFilter) -> Self {
        Self {
            filter,
            pending: None,
        }
    }

    pub fn filter(&self) -> ListFilter {
        self.filter
    }

    pub fn set_filter(&mut self, filter: ListFilter) {
        self.filter = filter;
    }

    /// Records the version of the request just issued. A newer `begin`
    /// supersedes any older one still pending.
    pub fn begin(&mut self, version: u64) {
        self.pending = Some(version);
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Consumes a list response. Returns `None` if `version` does not
    /// match the pending request (stale or unsolicited); otherwise the
    /// filtered summaries, delivered exactly once.
    pub fn take_response<P: PresenceService>(
        &mut self,
        service: &P,
        version: u64,
        candidates: &[LobbyId],
    ) -> Option<Vec<LobbySummary>> {
        if self.pending != Some(version) {
            debug!(version, "stale lobby list discarded");
            return None;
        }
        self.pending = None;

        let summaries: Vec<LobbySummary> = candidates
            .iter()
            .take(MAX_LIST_RESULTS)
            .filter_map(|lobby| self.summarize(service, *lobby))
            .collect();
        debug!(
            version,
            candidates = candidates.len(),
            kept = summaries.len(),
            "lobby list collected"
        );
        Some(summaries)
    }

    /// Gives up on the pending request (list timeout). Returns the empty
    /// result to deliver, or `None` if `version` was already superseded.
    pub fn expire(&mut self, version: u64) -> Option<Vec<LobbySummary>> {
        if self.pending != Some(version) {
            return None;
        }
        self.pending = None;
        debug!(version, "lobby list request timed out");
        Some(Vec::new())
    }

    /// Gives up on whatever request is pending, if any.
    pub fn expire_pending(&mut self) -> Option<Vec<LobbySummary>> {
        let version = self.pending?;
        self.expire(version)
    }

    fn summarize<P: PresenceService>(
        &self,
        service: &P,
        lobby: LobbyId,
    ) -> Option<LobbySummary> {
        if lobby.0 == 0 {
            return None;
        }
        let name = service.lobby_data(lobby, keys::NAME);
        if name.is_empty() {
            return None;
        }
        if service.lobby_data(lobby, keys::HOST_PEER).is_empty() {
            return None;
        }
        let phase = service.lobby_data(lobby, keys::PHASE);
        if phase != SessionPhase::Lobby.as_str() {
            return None;
        }

        let member_count = service.member_count(lobby);
        let member_limit = service.member_limit(lobby);
        let kind = LobbyKind::parse(&service.lobby_data(lobby, keys::KIND));

        match self.filter {
            ListFilter::Public => {
                if member_count == 0 || member_count >= member_limit {
                    return None;
                }
            }
            ListFilter::Friends => {
                if kind == LobbyKind::Private {
                    return None;
                }
                let owner = service.owner(lobby)?;
                if !service.is_contact(owner) {
                    return None;
                }
            }
        }

        Some(LobbySummary {
            id: lobby,
            name,
            host_name: service.lobby_data(lobby, keys::HOST_NAME),
            kind,
            member_count,
            member_limit,
        })
    }
}

/// Scans `candidates` for a lobby advertising `code`.
pub fn find_by_code<P: PresenceService>(
    service: &P,
    candidates: &[LobbyId],
    code: &str,
) -> CodeLookup {
    let mut saw_full = false;
    for lobby in candidates {
        if service.lobby_data(*lobby, keys::CODE) != code {
            continue;
        }
        let count = service.member_count(*lobby);
        let limit = service.member_limit(*lobby);
        if limit > 0 && count >= limit {
            saw_full = true;
            continue;
        }
        return CodeLookup::Found(*lobby);
    }
    if saw_full {
        CodeLookup::FoundFull
    } else {
        CodeLookup::NotFound
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testsupport::FakePresence;
    use lobbylink_protocol::PeerId;

    fn listable(service: FakePresence, lobby: u64, host: u64) -> FakePresence {
        let id = LobbyId(lobby);
        service
            .with_lobby_data(id, keys::NAME, "game night")
            .with_lobby_data(id, keys::HOST_PEER, &host.to_string())
            .with_lobby_data(id, keys::HOST_NAME, "Host")
            .with_lobby_data(id, keys::PHASE, "lobby")
            .with_members(id, &[PeerId(host)], 4)
            .with_owner(id, PeerId(host))
    }

    #[test]
    fn test_take_response_keeps_joinable_public_lobby() {
        let service = listable(FakePresence::new(PeerId(1)), 5, 42);
        let mut browser = LobbyBrowser::new(ListFilter::Public);
        browser.begin(1);

        let result = browser
            .take_response(&service, 1, &[LobbyId(5)])
            .unwrap();
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].id, LobbyId(5));
        assert_eq!(result[0].name, "game night");
        assert_eq!(result[0].member_count, 1);
    }

    #[test]
    fn test_take_response_with_stale_version_returns_none() {
        let service = listable(FakePresence::new(PeerId(1)), 5, 42);
        let mut browser = LobbyBrowser::new(ListFilter::Public);
        browser.begin(2);

        assert_eq!(browser.take_response(&service, 1, &[LobbyId(5)]), None);
        // The matching response still lands.
        assert!(browser.take_response(&service, 2, &[LobbyId(5)]).is_some());
    }

    #[test]
    fn test_take_response_delivers_once() {
        let service = listable(FakePresence::new(PeerId(1)), 5, 42);
        let mut browser = LobbyBrowser::new(ListFilter::Public);
        browser.begin(1);

        assert!(browser.take_response(&service, 1, &[LobbyId(5)]).is_some());
        assert_eq!(browser.take_response(&service, 1, &[LobbyId(5)]), None);
    }

    #[test]
    fn test_full_lobby_dropped_in_public_mode() {
        let service = listable(FakePresence::new(PeerId(1)), 5, 42)
            .with_members(LobbyId(5), &[PeerId(42), PeerId(43)], 2);
        let mut browser = LobbyBrowser::new(ListFilter::Public);
        browser.begin(1);

        let result = browser.take_response(&service, 1, &[LobbyId(5)]).unwrap();
        assert!(result.is_empty());
    }

    #[test]
    fn test_lobby_without_host_address_dropped() {
        let service = listable(FakePresence::new(PeerId(1)), 5, 42)
            .with_lobby_data(LobbyId(5), keys::HOST_PEER, "");
        let mut browser = LobbyBrowser::new(ListFilter::Public);
        browser.begin(1);

        let result = browser.take_response(&service, 1, &[LobbyId(5)]).unwrap();
        assert!(result.is_empty());
    }

    #[test]
    fn test_in_game_lobby_dropped() {
        let service = listable(FakePresence::new(PeerId(1)), 5, 42)
            .with_lobby_data(LobbyId(5), keys::PHASE, "game");
        let mut browser = LobbyBrowser::new(ListFilter::Public);
        browser.begin(1);

        let result = browser.take_response(&service, 1, &[LobbyId(5)]).unwrap();
        assert!(result.is_empty());
    }

    #[test]
    fn test_friends_mode_requires_contact_host() {
        let stranger = listable(FakePresence::new(PeerId(1)), 5, 42);
        let mut browser = LobbyBrowser::new(ListFilter::Friends);
        browser.begin(1);
        let result = browser.take_response(&stranger, 1, &[LobbyId(5)]).unwrap();
        assert!(result.is_empty());

        let friend =
            listable(FakePresence::new(PeerId(1)), 5, 42).with_contact(PeerId(42));
        browser.begin(2);
        let result = browser.take_response(&friend, 2, &[LobbyId(5)]).unwrap();
        assert_eq!(result.len(), 1);
    }

    #[test]
    fn test_friends_mode_drops_private_lobbies() {
        let service = listable(FakePresence::new(PeerId(1)), 5, 42)
            .with_contact(PeerId(42))
            .with_lobby_data(LobbyId(5), keys::KIND, "private");
        let mut browser = LobbyBrowser::new(ListFilter::Friends);
        browser.begin(1);

        let result = browser.take_response(&service, 1, &[LobbyId(5)]).unwrap();
        assert!(result.is_empty());
    }

    #[test]
    fn test_expire_delivers_empty_result_once() {
        let mut browser = LobbyBrowser::new(ListFilter::Public);
        browser.begin(1);

        assert_eq!(browser.expire(1), Some(Vec::new()));
        assert_eq!(browser.expire(1), None);
    }

    #[test]
    fn test_expire_of_superseded_version_is_ignored() {
        let mut browser = LobbyBrowser::new(ListFilter::Public);
        browser.begin(1);
        browser.begin(2);

        assert_eq!(browser.expire(1), None);
        assert!(browser.is_pending());
    }

    #[test]
    fn test_find_by_code_returns_matching_lobby() {
        let service = listable(FakePresence::new(PeerId(1)), 5, 42)
            .with_lobby_data(LobbyId(5), keys::CODE, "123456");

        assert_eq!(
            find_by_code(&service, &[LobbyId(4), LobbyId(5)], "123456"),
            CodeLookup::Found(LobbyId(5))
        );
    }

    #[test]
    fn test_find_by_code_full_match_reports_found_full() {
        let service = listable(FakePresence::new(PeerId(1)), 5, 42)
            .with_lobby_data(LobbyId(5), keys::CODE, "123456")
            .with_members(LobbyId(5), &[PeerId(42), PeerId(43)], 2);

        assert_eq!(
            find_by_code(&service, &[LobbyId(5)], "123456"),
            CodeLookup::FoundFull
        );
    }

    #[test]
    fn test_find_by_code_no_match_reports_not_found() {
        let service = listable(FakePresence::new(PeerId(1)), 5, 42)
            .with_lobby_data(LobbyId(5), keys::CODE, "999999");

        assert_eq!(
            find_by_code(&service, &[LobbyId(5)], "123456"),
            CodeLookup::NotFound
        );
    }
}
