//! In-memory UI collaborators shared by tests.

use std::sync::Mutex;

use lobbylink_protocol::ErrorKind;

use crate::{ErrorSink, SceneLoader};

/// An [`ErrorSink`] that records everything shown.
#[derive(Debug, Default)]
pub struct CollectingErrorSink {
    shown: Mutex<Vec<ErrorKind>>,
}

impl CollectingErrorSink {
    pub fn shown(&self) -> Vec<ErrorKind> {
        self.shown.lock().expect("sink lock poisoned").clone()
    }
}

impl ErrorSink for CollectingErrorSink {
    fn show(&self, kind: ErrorKind) {
        self.shown.lock().expect("sink lock poisoned").push(kind);
    }
}

/// A [`SceneLoader`] that records load requests and completes instantly.
#[derive(Debug)]
pub struct FakeSceneLoader {
    pub current: String,
    pub loaded: Vec<String>,
}

impl FakeSceneLoader {
    pub fn new(current: &str) -> Self {
        Self {
            current: current.to_owned(),
            loaded: Vec::new(),
        }
    }
}

impl SceneLoader for FakeSceneLoader {
    fn current_scene(&self) -> &str {
        &self.current
    }

    async fn load_scene(&mut self, name: &str) {
        self.loaded.push(name.to_owned());
        self.current = name.to_owned();
    }
}
