use std::sync::Arc;

use tokio::sync::watch;

use crate::api::{BoxedTransport, HttpTransport};
use crate::chat::ChatController;
use crate::core::{AppConfig, SharedState, Snapshot};
use crate::session::SessionController;
use crate::stream::StreamDecoder;

/// Wires the shared state, the transport and both controllers
/// together. Cheap to clone.
#[derive(Clone)]
pub struct Client {
    state: SharedState,
    sessions: SessionController,
    chat: ChatController,
}

impl Client {
    pub fn new(config: &AppConfig, transport: BoxedTransport) -> Self {
        let state = SharedState::new();
        let sessions = SessionController::new(state.clone(), transport.clone(), config.clone());
        let chat = ChatController::new(
            state.clone(),
            transport,
            StreamDecoder::new(config.typing_delay),
        );
        Self {
            state,
            sessions,
            chat,
        }
    }

    /// Talk to the backend over HTTP
    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(config, Arc::new(HttpTransport::from_config(config)))
    }

    pub fn sessions(&self) -> &SessionController {
        &self.sessions
    }

    pub fn chat(&self) -> &ChatController {
        &self.chat
    }

    pub fn snapshot(&self) -> Snapshot {
        self.state.snapshot()
    }

    pub fn subscribe(&self) -> watch::Receiver<Snapshot> {
        self.state.subscribe()
    }
}
