//! Client side of the document chat backend.
//!
//! Every call maps to exactly one HTTP request. Nothing is retried
//! here; failures go back to the caller as a `ClientError`.
use std::path::Path;

use async_trait::async_trait;
use futures::stream::BoxStream;

use crate::chat::Message;
use crate::core::ClientError;
use crate::session::Session;

mod http;
pub mod public;

pub use http::HttpTransport;
pub use public::UploadResponse;

/// Raw body of a chat answer, chunked however the network delivers it
pub type ByteStream = BoxStream<'static, Result<Vec<u8>, ClientError>>;

/// A local document to upload
#[derive(Clone, Debug, PartialEq)]
pub struct Document {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

impl Document {
    pub fn new(file_name: &str, bytes: Vec<u8>) -> Self {
        Self {
            file_name: file_name.to_string(),
            bytes,
        }
    }

    pub async fn from_path(path: impl AsRef<Path>) -> Result<Self, ClientError> {
        let path = path.as_ref();
        let file_name = path
            .file_name()
            .and_then(|name| name.to_str())
            .ok_or_else(|| ClientError::Io(format!("Not a file: {}", path.display())))?;
        let bytes = tokio::fs::read(path).await?;
        Ok(Self::new(file_name, bytes))
    }

    pub fn mime_type(&self) -> &'static str {
        let is_pdf = self
            .file_name
            .rsplit_once('.')
            .is_some_and(|(_, ext)| ext.eq_ignore_ascii_case("pdf"));
        if is_pdf {
            "application/pdf"
        } else {
            "application/octet-stream"
        }
    }
}

#[async_trait]
pub trait Transport: Send + Sync {
    /// `GET /sessions`
    async fn list_sessions(&self) -> Result<Vec<Session>, ClientError>;

    /// `POST /upload`. Creates a session when `session_id` is `None`,
    /// otherwise adds the document to that session.
    async fn create_or_augment_session(
        &self,
        doc: &Document,
        session_id: Option<&str>,
    ) -> Result<UploadResponse, ClientError>;

    /// `GET /sessions/{id}/messages`
    async fn load_messages(&self, session_id: &str) -> Result<Vec<Message>, ClientError>;

    /// `DELETE /sessions/{id}`
    async fn delete_session(&self, session_id: &str) -> Result<(), ClientError>;

    /// `POST /chat`. Resolves once the backend accepted the question;
    /// the answer follows on the returned stream.
    async fn send_question(&self, session_id: &str, text: &str)
    -> Result<ByteStream, ClientError>;
}

pub type BoxedTransport = std::sync::Arc<dyn Transport + 'static>;
