//! Time-bounded permits for invite-based joins.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use lobbylink_protocol::LobbyId;
use tracing::debug;

/// Lobbies the local user holds a live invite for.
///
/// Each entry carries an expiry instant; entries are evicted lazily, on
/// lookup, so the whitelist needs no timer of its own. An invite permit
/// lets a join bypass the private-lobby reversal.
#[derive(Debug)]
pub struct InviteWhitelist {
    ttl: Duration,
    entries: HashMap<LobbyId, Instant>,
}

impl InviteWhitelist {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: HashMap::new(),
        }
    }

    /// Records an invite for `lobby`, valid for the TTL from `now`.
    /// A repeat invite refreshes the expiry.
    pub fn insert(&mut self, lobby: LobbyId, now: Instant) {
        let expires = now + self.ttl;
        self.entries.insert(lobby, expires);
        debug!(%lobby, "invite recorded");
    }

    /// Whether a live (non-expired) invite exists for `lobby`.
    /// Expired entries encountered on the way are evicted.
    pub fn contains(&mut self, lobby: LobbyId, now: Instant) -> bool {
        self.entries.retain(|id, expires| {
            let live = *expires > now;
            if !live {
                debug!(lobby = %id, "invite expired");
            }
            live
        });
        self.entries.contains_key(&lobby)
    }

    /// Drops the invite for `lobby`, if any.
    pub fn remove(&mut self, lobby: LobbyId) {
        self.entries.remove(&lobby);
    }

    /// Drops every invite.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Number of recorded invites, expired ones included until the next
    /// lookup evicts them.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TTL: Duration = Duration::from_secs(300);

    #[test]
    fn test_contains_live_invite_returns_true() {
        let mut whitelist = InviteWhitelist::new(TTL);
        let now = Instant::now();
        whitelist.insert(LobbyId(7), now);

        assert!(whitelist.contains(LobbyId(7), now));
        assert!(
            whitelist.contains(LobbyId(7), now + Duration::from_secs(299))
        );
    }

    #[test]
    fn test_contains_expired_invite_returns_false_and_evicts() {
        let mut whitelist = InviteWhitelist::new(TTL);
        let now = Instant::now();
        whitelist.insert(LobbyId(7), now);

        assert!(!whitelist.contains(LobbyId(7), now + TTL));
        assert!(whitelist.is_empty());
    }

    #[test]
    fn test_insert_refreshes_expiry() {
        let mut whitelist = InviteWhitelist::new(TTL);
        let now = Instant::now();
        whitelist.insert(LobbyId(7), now);
        whitelist.insert(LobbyId(7), now + Duration::from_secs(200));

        // Past the first expiry, inside the refreshed one.
        assert!(
            whitelist.contains(LobbyId(7), now + Duration::from_secs(400))
        );
    }

    #[test]
    fn test_lookup_evicts_other_expired_entries() {
        let mut whitelist = InviteWhitelist::new(TTL);
        let now = Instant::now();
        whitelist.insert(LobbyId(1), now);
        whitelist.insert(LobbyId(2), now + Duration::from_secs(100));

        assert!(whitelist.contains(LobbyId(2), now + Duration::from_secs(350)));
        assert_eq!(whitelist.len(), 1, "expired entry should be gone");
    }

    #[test]
    fn test_remove_drops_entry() {
        let mut whitelist = InviteWhitelist::new(TTL);
        let now = Instant::now();
        whitelist.insert(LobbyId(7), now);
        whitelist.remove(LobbyId(7));

        assert!(!whitelist.contains(LobbyId(7), now));
    }
}
