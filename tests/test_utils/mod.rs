//! Test utilities for integration tests
#![allow(dead_code)]
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use futures::StreamExt;
use futures::channel::mpsc;
use tokio::sync::oneshot;

use docchat::Client;
use docchat::api::{ByteStream, Document, Transport, UploadResponse};
use docchat::chat::Message;
use docchat::core::{AppConfig, ClientError, Snapshot};
use docchat::session::Session;

pub type ChunkSender = mpsc::UnboundedSender<Result<Vec<u8>, ClientError>>;

/// Operations that can be told to fail once
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Op {
    List,
    Upload,
    Load,
    Delete,
    Chat,
}

#[derive(Default)]
struct Backend {
    sessions: Vec<Session>,
    messages: HashMap<String, Vec<Message>>,
    answers: VecDeque<ByteStream>,
    failures: HashMap<Op, ClientError>,
    upload_gate: Option<oneshot::Receiver<()>>,
    calls: Vec<String>,
    next_id: u32,
    load_delays: HashMap<String, Duration>,
}

/// An in-memory stand-in for the document chat backend
#[derive(Default)]
pub struct FakeTransport {
    backend: Mutex<Backend>,
}

impl FakeTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn backend(&self) -> std::sync::MutexGuard<'_, Backend> {
        self.backend.lock().unwrap()
    }

    /// Make the next call of `op` fail with `err`
    pub fn fail_next(&self, op: Op, err: ClientError) {
        self.backend().failures.insert(op, err);
    }

    /// Answer the next question with these chunks
    pub fn answer(&self, chunks: Vec<&str>) {
        let chunks: Vec<Result<Vec<u8>, ClientError>> = chunks
            .into_iter()
            .map(|c| Ok(c.as_bytes().to_vec()))
            .collect();
        self.answer_with(futures::stream::iter(chunks).boxed());
    }

    pub fn answer_with(&self, stream: ByteStream) {
        self.backend().answers.push_back(stream);
    }

    /// Answer the next question with whatever the test sends
    pub fn answer_channel(&self) -> ChunkSender {
        let (tx, rx) = mpsc::unbounded();
        self.answer_with(rx.boxed());
        tx
    }

    /// Hold uploads until the returned sender fires (or is dropped)
    pub fn hold_uploads(&self) -> oneshot::Sender<()> {
        let (tx, rx) = oneshot::channel();
        self.backend().upload_gate = Some(rx);
        tx
    }

    pub fn set_messages(&self, session_id: &str, messages: Vec<Message>) {
        self.backend()
            .messages
            .insert(session_id.to_string(), messages);
    }

    /// Create a session directly on the backend
    pub fn seed_session(&self, file_name: &str) -> String {
        let mut backend = self.backend();
        Self::insert_session(&mut backend, file_name)
    }

    /// Remove a session behind the client's back
    /// Make loading this session's messages take `delay`
    pub fn delay_load(&self, session_id: &str, delay: Duration) {
        self.backend()
            .load_delays
            .insert(session_id.to_string(), delay);
    }

    pub fn drop_session(&self, session_id: &str) {
        self.backend().sessions.retain(|s| s.id != session_id);
    }

    pub fn calls(&self) -> Vec<String> {
        self.backend().calls.clone()
    }

    fn insert_session(backend: &mut Backend, file_name: &str) -> String {
        backend.next_id += 1;
        let id = format!("session-{}", backend.next_id);
        let created_at = Utc.with_ymd_and_hms(2025, 1, 28, 10, 0, 0).unwrap()
            + chrono::Duration::minutes(backend.next_id as i64);
        backend
            .sessions
            .push(Session::new(&id, file_name, created_at));
        id
    }

    fn begin(&self, op: Op, call: String) -> Result<(), ClientError> {
        let mut backend = self.backend();
        backend.calls.push(call);
        match backend.failures.remove(&op) {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn not_found() -> ClientError {
        ClientError::ServerError {
            status: 404,
            message: Some("Session not found".to_string()),
        }
    }
}

#[async_trait]
impl Transport for FakeTransport {
    async fn list_sessions(&self) -> Result<Vec<Session>, ClientError> {
        self.begin(Op::List, "list".to_string())?;
        Ok(self.backend().sessions.clone())
    }

    async fn create_or_augment_session(
        &self,
        doc: &Document,
        session_id: Option<&str>,
    ) -> Result<UploadResponse, ClientError> {
        let gate = self.backend().upload_gate.take();
        if let Some(gate) = gate {
            let _ = gate.await;
        }
        self.begin(
            Op::Upload,
            format!("upload {} {}", doc.file_name, session_id.unwrap_or("-")),
        )?;

        let mut backend = self.backend();
        let session_id = match session_id {
            Some(id) if backend.sessions.iter().any(|s| s.id == id) => id.to_string(),
            Some(_) => return Err(Self::not_found()),
            None => Self::insert_session(&mut backend, &doc.file_name),
        };
        Ok(UploadResponse {
            session_id,
            file_name: doc.file_name.clone(),
        })
    }

    async fn load_messages(&self, session_id: &str) -> Result<Vec<Message>, ClientError> {
        let delay = self.backend().load_delays.get(session_id).copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        self.begin(Op::Load, format!("load {}", session_id))?;
        let backend = self.backend();
        if !backend.sessions.iter().any(|s| s.id == session_id) {
            return Err(Self::not_found());
        }
        Ok(backend
            .messages
            .get(session_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn delete_session(&self, session_id: &str) -> Result<(), ClientError> {
        self.begin(Op::Delete, format!("delete {}", session_id))?;
        let mut backend = self.backend();
        let before = backend.sessions.len();
        backend.sessions.retain(|s| s.id != session_id);
        if backend.sessions.len() == before {
            return Err(Self::not_found());
        }
        Ok(())
    }

    async fn send_question(
        &self,
        session_id: &str,
        text: &str,
    ) -> Result<ByteStream, ClientError> {
        self.begin(Op::Chat, format!("chat {} {}", session_id, text))?;
        let answer = self.backend().answers.pop_front();
        Ok(answer.unwrap_or_else(|| futures::stream::empty().boxed()))
    }
}

pub fn test_config(typing_delay: Duration) -> AppConfig {
    AppConfig {
        api_url: String::from("http://127.0.0.1:8000"),
        typing_delay,
        request_timeout: Duration::from_secs(5),
        accepted_extensions: vec![String::from("pdf")],
    }
}

/// A client wired to a fresh fake backend, streaming without delay
pub fn test_client() -> (Client, Arc<FakeTransport>) {
    test_client_with_delay(Duration::ZERO)
}

pub fn test_client_with_delay(typing_delay: Duration) -> (Client, Arc<FakeTransport>) {
    let transport = FakeTransport::new();
    let client = Client::new(&test_config(typing_delay), transport.clone());
    (client, transport)
}

pub fn pdf(name: &str) -> Document {
    Document::new(name, b"%PDF-1.7".to_vec())
}

/// Wait until a published snapshot satisfies `f`
pub async fn wait_for(client: &Client, f: impl FnMut(&Snapshot) -> bool) -> Snapshot {
    let mut rx = client.subscribe();
    let snapshot = tokio::time::timeout(Duration::from_secs(30), rx.wait_for(f))
        .await
        .expect("Timed out waiting for snapshot")
        .expect("State was dropped");
    snapshot.clone()
}

/// Content of the last message in the transcript
pub fn last_content(client: &Client) -> String {
    client
        .snapshot()
        .transcript
        .last()
        .map(|m| m.content.clone())
        .unwrap_or_default()
}
