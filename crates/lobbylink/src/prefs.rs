//! Locally persisted user preferences.
//!
//! A small JSON file holding the last-used creation parameters and list
//! filter. Read at create/list time, written after a successful create
//! parameterization or a filter change. A missing file yields defaults; a
//! corrupt file is an error the caller may choose to ignore.

use std::path::Path;

use lobbylink_presence::ListFilter;
use lobbylink_protocol::{LobbyKind, MAX_MEMBERS, MIN_MEMBERS};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Preference persistence failures.
#[derive(Debug, thiserror::Error)]
pub enum PrefsError {
    #[error("preferences io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("preferences format error: {0}")]
    Format(#[from] serde_json::Error),
}

/// Last-used session settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Preferences {
    pub max_members: u32,
    pub lobby_name: String,
    pub lobby_kind: LobbyKind,
    pub filter_friends: bool,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            max_members: 4,
            lobby_name: String::new(),
            lobby_kind: LobbyKind::Public,
            filter_friends: false,
        }
    }
}

impl Preferences {
    /// Loads preferences from `path`. A missing file yields defaults.
    ///
    /// # Errors
    /// Returns an error for unreadable or malformed files.
    pub fn load(path: &Path) -> Result<Self, PrefsError> {
        if !path.exists() {
            debug!(path = %path.display(), "no preferences file, using defaults");
            return Ok(Self::default());
        }
        let raw = std::fs::read_to_string(path)?;
        let mut prefs: Self = serde_json::from_str(&raw)?;
        prefs.max_members = prefs.max_members.clamp(MIN_MEMBERS, MAX_MEMBERS);
        Ok(prefs)
    }

    /// Writes preferences to `path`.
    ///
    /// # Errors
    /// Returns an error if the file cannot be written.
    pub fn save(&self, path: &Path) -> Result<(), PrefsError> {
        let raw = serde_json::to_string_pretty(self)?;
        std::fs::write(path, raw)?;
        debug!(path = %path.display(), "preferences saved");
        Ok(())
    }

    pub fn filter(&self) -> ListFilter {
        if self.filter_friends {
            ListFilter::Friends
        } else {
            ListFilter::Public
        }
    }

    pub fn set_filter(&mut self, filter: ListFilter) {
        self.filter_friends = filter == ListFilter::Friends;
    }
}
