//! The single owned client state shared by the controllers.
//!
//! Controllers mutate it through `SharedState::mutate`, which publishes
//! a complete `Snapshot` after every change. The render layer only
//! ever sees those snapshots.
use std::sync::{Arc, PoisonError, RwLock};

use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::chat::{Message, Transcript};
use crate::session::{Session, SessionStore};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ChatPhase {
    #[default]
    Ready,
    Sending,
    Streaming,
}

/// Bookkeeping for the one exchange allowed at a time
#[derive(Debug)]
pub(crate) struct ActiveExchange {
    pub id: Uuid,
    pub session_id: String,
    pub epoch: u64,
    pub token: CancellationToken,
    pub phase: ChatPhase,
}

#[derive(Debug, Default)]
pub struct ClientState {
    pub(crate) store: SessionStore,
    pub(crate) transcript: Transcript,
    pub(crate) uploading: bool,
    pub(crate) exchange: Option<ActiveExchange>,
    // Bumped by every change of the active session
    pub(crate) navigation: u64,
    revision: u64,
}

impl ClientState {
    pub fn phase(&self) -> ChatPhase {
        self.exchange
            .as_ref()
            .map(|ex| ex.phase)
            .unwrap_or(ChatPhase::Ready)
    }

    pub fn store(&self) -> &SessionStore {
        &self.store
    }

    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    pub fn is_uploading(&self) -> bool {
        self.uploading
    }

    /// Stop the current exchange, if any. Whatever the in-flight
    /// message holds is kept, an empty placeholder is dropped.
    pub(crate) fn abandon_exchange(&mut self) -> bool {
        let Some(exchange) = self.exchange.take() else {
            return false;
        };
        exchange.token.cancel();
        self.transcript.abandon(exchange.epoch);
        self.transcript.confirm_pending_user(exchange.epoch);
        tracing::info!(
            "Cancelled exchange {} for session {}",
            exchange.id,
            exchange.session_id
        );
        true
    }

    /// Point at another session (or none) with the given history.
    /// Returns false without touching anything if the session is not
    /// in the store.
    pub(crate) fn activate(&mut self, session_id: Option<&str>, messages: Vec<Message>) -> bool {
        if session_id.is_some_and(|id| !self.store.contains(id)) {
            return false;
        }
        self.abandon_exchange();
        self.store.set_active(session_id);
        self.transcript.replace(session_id, messages);
        self.navigation += 1;
        true
    }

    fn snapshot(&self) -> Snapshot {
        Snapshot {
            revision: self.revision,
            sessions: self.store.list(),
            active: self.store.active().cloned(),
            transcript: self.transcript.messages().to_vec(),
            phase: self.phase(),
            is_uploading: self.uploading,
        }
    }
}

/// A complete, read-only view of the client state
#[derive(Clone, Debug, Default)]
pub struct Snapshot {
    pub revision: u64,
    pub sessions: Vec<Session>,
    pub active: Option<Session>,
    pub transcript: Vec<Message>,
    pub phase: ChatPhase,
    pub is_uploading: bool,
}

#[derive(Clone)]
pub struct SharedState {
    inner: Arc<RwLock<ClientState>>,
    tx: Arc<watch::Sender<Snapshot>>,
}

impl Default for SharedState {
    fn default() -> Self {
        Self::new()
    }
}

impl SharedState {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(Snapshot::default());
        Self {
            inner: Arc::new(RwLock::new(ClientState::default())),
            tx: Arc::new(tx),
        }
    }

    pub fn read<R>(&self, f: impl FnOnce(&ClientState) -> R) -> R {
        let guard = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        f(&guard)
    }

    /// Apply a change and publish the resulting snapshot. The lock is
    /// never held across an await point.
    pub fn mutate<R>(&self, f: impl FnOnce(&mut ClientState) -> R) -> R {
        let mut guard = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        let result = f(&mut guard);
        guard.revision += 1;
        self.tx.send_replace(guard.snapshot());
        result
    }

    pub fn snapshot(&self) -> Snapshot {
        self.read(ClientState::snapshot)
    }

    pub fn subscribe(&self) -> watch::Receiver<Snapshot> {
        self.tx.subscribe()
    }
}
