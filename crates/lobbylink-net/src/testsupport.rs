//! In-memory transport shared by this crate's unit tests.

use lobbylink_protocol::PeerId;

use crate::{NetError, NetTransport};

/// A scriptable [`NetTransport`] that records everything done to it.
#[derive(Debug, Default)]
pub struct FakeTransport {
    pub hosting: bool,
    pub client_host: Option<PeerId>,
    pub max_connections: Option<u32>,
    pub broadcasts: Vec<Vec<u8>>,
    pub disconnected: Vec<PeerId>,
    /// When true, start_host/start_client fail.
    pub fail_start: bool,
}

impl FakeTransport {
    pub fn new() -> Self {
        Self::default()
    }
}

impl NetTransport for FakeTransport {
    fn start_host(&mut self) -> Result<(), NetError> {
        if self.fail_start {
            return Err(NetError::Transport("scripted failure".into()));
        }
        self.hosting = true;
        Ok(())
    }

    fn stop_host(&mut self) {
        self.hosting = false;
    }

    fn start_client(&mut self, host: PeerId) -> Result<(), NetError> {
        if self.fail_start {
            return Err(NetError::Transport("scripted failure".into()));
        }
        self.client_host = Some(host);
        Ok(())
    }

    fn stop_client(&mut self) {
        self.client_host = None;
    }

    fn host_active(&self) -> bool {
        self.hosting
    }

    fn client_active(&self) -> bool {
        self.client_host.is_some()
    }

    fn set_max_connections(&mut self, max: u32) {
        self.max_connections = Some(max);
    }

    fn broadcast(&mut self, frame: &[u8]) {
        self.broadcasts.push(frame.to_vec());
    }

    fn disconnect(&mut self, peer: PeerId) {
        self.disconnected.push(peer);
    }
}
