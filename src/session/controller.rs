//! Session lifecycle: list, create by upload, add documents, switch,
//! start over and delete.
//!
//! The backend is the source of truth for the session list, so every
//! create and delete is followed by a fresh listing.
use chrono::Utc;

use super::models::Session;
use crate::api::{BoxedTransport, Document};
use crate::chat::{Message, Role};
use crate::core::{AppConfig, ClientError, ClientState, SharedState};

#[derive(Clone, Debug, PartialEq)]
pub enum SessionState {
    Idle,
    Uploading,
    Active(Session),
}

pub fn ready_message(file_name: &str) -> String {
    format!("{} is ready. Ask me anything about it.", file_name)
}

pub fn added_message(file_name: &str) -> String {
    format!("{} was added to this chat.", file_name)
}

/// Clears the upload flag however the upload ends, including when the
/// future is dropped mid-flight.
struct UploadGuard {
    state: SharedState,
}

impl UploadGuard {
    /// Claim the upload slot if `check` passes, in one step
    fn acquire<T>(
        state: &SharedState,
        check: impl FnOnce(&mut ClientState) -> Result<T, ClientError>,
    ) -> Result<(Self, T), ClientError> {
        let value = state.mutate(|s| {
            if s.uploading {
                return Err(ClientError::precondition(
                    "Another upload is still in progress",
                ));
            }
            let value = check(s)?;
            s.uploading = true;
            Ok(value)
        })?;
        let guard = Self {
            state: state.clone(),
        };
        Ok((guard, value))
    }
}

impl Drop for UploadGuard {
    fn drop(&mut self) {
        self.state.mutate(|s| s.uploading = false);
    }
}

#[derive(Clone)]
pub struct SessionController {
    state: SharedState,
    transport: BoxedTransport,
    config: AppConfig,
}

impl SessionController {
    pub fn new(state: SharedState, transport: BoxedTransport, config: AppConfig) -> Self {
        Self {
            state,
            transport,
            config,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state.read(|s| match (s.store.active(), s.uploading) {
            (Some(session), _) => SessionState::Active(session.clone()),
            (None, true) => SessionState::Uploading,
            (None, false) => SessionState::Idle,
        })
    }

    pub fn sessions(&self) -> Vec<Session> {
        self.state.read(|s| s.store.list())
    }

    pub fn active(&self) -> Option<Session> {
        self.state.read(|s| s.store.active().cloned())
    }

    fn check_document(&self, doc: &Document) -> Result<(), ClientError> {
        if doc.file_name.trim().is_empty() {
            return Err(ClientError::precondition("No file selected"));
        }
        if !self.config.accepts(&doc.file_name) {
            return Err(ClientError::precondition(format!(
                "{} is not a supported document (accepted: {})",
                doc.file_name,
                self.config.accepted_extensions.join(", ")
            )));
        }
        Ok(())
    }

    /// Reload the session list from the backend
    pub async fn refresh(&self) -> Result<Vec<Session>, ClientError> {
        let sessions = self.transport.list_sessions().await?;
        let count = sessions.len();
        let sessions = self.state.mutate(|s| {
            if s.store.sync(sessions) {
                tracing::info!("Active session no longer exists, returning to idle");
                s.activate(None, Vec::new());
            }
            s.store.list()
        });
        tracing::debug!("Loaded {} sessions", count);
        Ok(sessions)
    }

    /// Upload a document as a new session and make it active
    pub async fn create(&self, doc: &Document) -> Result<Session, ClientError> {
        self.check_document(doc)?;
        // The current session stays as is until the upload succeeds
        let (_guard, _) = UploadGuard::acquire(&self.state, |_| Ok(()))?;

        tracing::info!("Creating a session for {}", doc.file_name);
        let created = self
            .transport
            .create_or_augment_session(doc, None)
            .await
            .inspect_err(|e| tracing::error!("Upload of {} failed: {}", doc.file_name, e))?;

        let listing = self.transport.list_sessions().await;
        let session = self.state.mutate(|s| {
            match listing {
                Ok(sessions) => {
                    s.store.sync(sessions);
                }
                Err(e) => tracing::warn!("Refreshing sessions after upload failed: {}", e),
            }
            let session = match s.store.get(&created.session_id) {
                Some(session) => session.clone(),
                None => {
                    let session =
                        Session::new(&created.session_id, &created.file_name, Utc::now());
                    s.store.upsert(session.clone());
                    session
                }
            };
            s.activate(
                Some(&session.id),
                vec![Message::new(Role::System, &ready_message(&created.file_name))],
            );
            session
        });

        tracing::info!("Session {} is ready", session.id);
        Ok(session)
    }

    /// Add another document to the active session
    pub async fn augment(&self, doc: &Document) -> Result<(), ClientError> {
        self.check_document(doc)?;
        let (_guard, (session_id, epoch)) = UploadGuard::acquire(&self.state, |s| {
            let Some(id) = s.store.active_id() else {
                return Err(ClientError::precondition("No session is selected"));
            };
            if s.exchange.is_some() {
                return Err(ClientError::precondition(
                    "Wait for the response to finish before adding a document",
                ));
            }
            Ok((id.to_string(), s.transcript.epoch()))
        })?;

        tracing::info!("Adding {} to session {}", doc.file_name, session_id);
        let added = self
            .transport
            .create_or_augment_session(doc, Some(&session_id))
            .await
            .inspect_err(|e| tracing::error!("Upload of {} failed: {}", doc.file_name, e))?;

        let announced = self.state.mutate(|s| {
            if s.transcript.epoch() != epoch || s.transcript.has_in_flight() {
                return false;
            }
            s.transcript
                .push(Message::new(Role::System, &added_message(&added.file_name)));
            true
        });
        if !announced {
            tracing::debug!(
                "Session {} is no longer shown, not announcing {}",
                session_id,
                added.file_name
            );
        }
        Ok(())
    }

    /// Leave the active session and go back to the creation screen
    pub fn new_chat(&self) {
        self.state.mutate(|s| s.activate(None, Vec::new()));
    }

    /// Make another session active, replacing the transcript with its
    /// persisted history. A running exchange is cancelled first. When
    /// switches overlap the one issued last wins.
    pub async fn switch(&self, session_id: &str) -> Result<(), ClientError> {
        let navigation = self.state.mutate(|s| {
            if !s.store.contains(session_id) {
                return Err(ClientError::precondition(format!(
                    "Unknown session {}",
                    session_id
                )));
            }
            s.abandon_exchange();
            // Supersedes any switch still loading
            s.navigation += 1;
            Ok(s.navigation)
        })?;

        tracing::info!("Switching to session {}", session_id);
        let messages = self
            .transport
            .load_messages(session_id)
            .await
            .inspect_err(|e| tracing::error!("Loading session {} failed: {}", session_id, e))?;

        self.state.mutate(|s| {
            if s.navigation != navigation {
                return Err(ClientError::precondition(format!(
                    "Switching to {} was superseded",
                    session_id
                )));
            }
            if !s.activate(Some(session_id), messages) {
                return Err(ClientError::precondition(format!(
                    "Session {} no longer exists",
                    session_id
                )));
            }
            Ok(())
        })
    }

    /// Delete a session on the backend. Only a confirmed delete
    /// touches local state.
    pub async fn delete(&self, session_id: &str) -> Result<(), ClientError> {
        tracing::info!("Deleting session {}", session_id);
        self.transport
            .delete_session(session_id)
            .await
            .inspect_err(|e| tracing::error!("Deleting session {} failed: {}", session_id, e))?;

        self.state.mutate(|s| {
            if s.store.active_id() == Some(session_id) {
                s.activate(None, Vec::new());
            }
            s.store.remove(session_id);
        });

        if let Err(e) = self.refresh().await {
            tracing::warn!("Refreshing sessions after delete failed: {}", e);
        }
        Ok(())
    }
}
