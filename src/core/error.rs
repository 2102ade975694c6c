//! Error taxonomy shared by the transport and the controllers.
use thiserror::Error;

pub const NETWORK_ERROR_MESSAGE: &str = "Could not get a response. Is the backend running?";
pub const STREAM_INTERRUPTED_MESSAGE: &str = "The response was interrupted before it finished.";
pub const UNREADABLE_RESPONSE_MESSAGE: &str = "The server sent a response that could not be read.";

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ClientError {
    /// Rejected locally before reaching the network
    #[error("Precondition violated: {0}")]
    PreconditionViolation(String),

    /// The request could not be sent or the connection dropped
    #[error("Network error: {0}")]
    NetworkError(String),

    /// Non-success status, with the backend's message when it sent one
    #[error("Server error ({status}): {}", .message.as_deref().unwrap_or("no message"))]
    ServerError { status: u16, message: Option<String> },

    /// The answer stream closed before it completed naturally
    #[error("Stream interrupted: {0}")]
    StreamInterrupted(String),

    /// A local document could not be read
    #[error("IO error: {0}")]
    Io(String),
}

impl ClientError {
    pub fn precondition(reason: impl Into<String>) -> Self {
        Self::PreconditionViolation(reason.into())
    }

    pub fn is_precondition(&self) -> bool {
        matches!(self, Self::PreconditionViolation(_))
    }

    /// The text shown to a user, either in a notification or as a
    /// `system` message in the transcript.
    pub fn user_message(&self) -> String {
        match self {
            Self::PreconditionViolation(reason) => reason.clone(),
            Self::NetworkError(_) => NETWORK_ERROR_MESSAGE.to_string(),
            Self::ServerError {
                message: Some(message),
                ..
            } => message.clone(),
            Self::ServerError {
                status,
                message: None,
            } => format!("The server returned an error (status {}).", status),
            Self::StreamInterrupted(_) => STREAM_INTERRUPTED_MESSAGE.to_string(),
            Self::Io(reason) => format!("Could not read the document: {}", reason),
        }
    }
}

impl From<std::io::Error> for ClientError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}
