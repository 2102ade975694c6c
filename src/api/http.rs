use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use reqwest::multipart::{Form, Part};
use reqwest::{RequestBuilder, Response};
use serde::de::DeserializeOwned;

use super::public::{MessageResponse, UploadResponse, error_message};
use super::{ByteStream, Document, Transport};
use crate::chat::Message;
use crate::core::error::UNREADABLE_RESPONSE_MESSAGE;
use crate::core::{AppConfig, ClientError};
use crate::session::Session;

/// `Transport` over HTTP using `reqwest`
#[derive(Clone, Debug)]
pub struct HttpTransport {
    client: reqwest::Client,
    api_url: String,
    timeout: Duration,
}

impl HttpTransport {
    pub fn new(api_url: &str, timeout: Duration) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_url: api_url.trim_end_matches('/').to_string(),
            timeout,
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(&config.api_url, config.request_timeout)
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.api_url, path)
    }

    fn session_url(&self, session_id: &str, suffix: &str) -> String {
        self.url(&format!(
            "/sessions/{}{}",
            urlencoding::encode(session_id),
            suffix
        ))
    }

    fn timed_out(&self) -> ClientError {
        ClientError::NetworkError(format!("No response within {:?}", self.timeout))
    }

    /// Send a request and check its status. The timeout covers getting
    /// the response head only, the body is read at the caller's pace.
    async fn send(&self, request: RequestBuilder) -> Result<Response, ClientError> {
        let response = tokio::time::timeout(self.timeout, request.send())
            .await
            .map_err(|_| self.timed_out())?
            .map_err(|e| ClientError::NetworkError(e.to_string()))?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        // The body is best effort, the status alone is enough to fail
        let body = tokio::time::timeout(self.timeout, response.text())
            .await
            .ok()
            .and_then(Result::ok)
            .unwrap_or_default();
        let message = error_message(&body);
        tracing::error!("Request failed with status {}: {}", status, body);
        Err(ClientError::ServerError {
            status: status.as_u16(),
            message,
        })
    }

    async fn json<T: DeserializeOwned>(&self, response: Response) -> Result<T, ClientError> {
        let status = response.status().as_u16();
        let body = tokio::time::timeout(self.timeout, response.bytes())
            .await
            .map_err(|_| self.timed_out())?
            .map_err(|e| ClientError::NetworkError(e.to_string()))?;
        serde_json::from_slice(&body).map_err(|e| {
            tracing::error!(
                "Parsing response failed for {}\nError: {}",
                String::from_utf8_lossy(&body),
                e
            );
            ClientError::ServerError {
                status,
                message: Some(UNREADABLE_RESPONSE_MESSAGE.to_string()),
            }
        })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn list_sessions(&self) -> Result<Vec<Session>, ClientError> {
        tracing::debug!("Listing sessions");
        let response = self.send(self.client.get(self.url("/sessions"))).await?;
        self.json(response).await
    }

    async fn create_or_augment_session(
        &self,
        doc: &Document,
        session_id: Option<&str>,
    ) -> Result<UploadResponse, ClientError> {
        tracing::debug!(
            "Uploading {} ({} bytes) to session {:?}",
            doc.file_name,
            doc.bytes.len(),
            session_id
        );
        let part = Part::bytes(doc.bytes.clone())
            .file_name(doc.file_name.clone())
            .mime_str(doc.mime_type())
            .map_err(|e| ClientError::precondition(e.to_string()))?;
        let mut form = Form::new().part("file", part);
        if let Some(id) = session_id {
            form = form.text("session_id", id.to_string());
        }

        let response = self
            .send(self.client.post(self.url("/upload")).multipart(form))
            .await?;
        self.json(response).await
    }

    async fn load_messages(&self, session_id: &str) -> Result<Vec<Message>, ClientError> {
        tracing::debug!("Loading messages for session {}", session_id);
        let response = self
            .send(self.client.get(self.session_url(session_id, "/messages")))
            .await?;
        let messages: Vec<MessageResponse> = self.json(response).await?;
        Ok(messages.into_iter().map(Message::from).collect())
    }

    async fn delete_session(&self, session_id: &str) -> Result<(), ClientError> {
        tracing::debug!("Deleting session {}", session_id);
        self.send(self.client.delete(self.session_url(session_id, "")))
            .await?;
        Ok(())
    }

    async fn send_question(
        &self,
        session_id: &str,
        text: &str,
    ) -> Result<ByteStream, ClientError> {
        tracing::debug!("Sending question to session {}", session_id);
        let form = Form::new()
            .text("question", text.to_string())
            .text("session_id", session_id.to_string());
        let response = self
            .send(self.client.post(self.url("/chat")).multipart(form))
            .await?;

        let stream = response
            .bytes_stream()
            .map(|chunk| {
                chunk
                    .map(|bytes| bytes.to_vec())
                    .map_err(|e| ClientError::StreamInterrupted(e.to_string()))
            })
            .boxed();
        Ok(stream)
    }
}
