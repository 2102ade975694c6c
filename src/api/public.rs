//! Wire types for the document chat backend

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::chat::{Message, Role};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UploadResponse {
    pub session_id: String,
    pub file_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageResponse {
    pub role: Role,
    pub content: String,
}

impl From<MessageResponse> for Message {
    fn from(value: MessageResponse) -> Self {
        Message::new(value.role, &value.content)
    }
}

/// Extract the human readable message from an error body. FastAPI
/// puts it under `detail`, other servers use `message` or `error`.
pub fn error_message(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;
    ["detail", "message", "error"]
        .into_iter()
        .find_map(|key| value[key].as_str())
        .filter(|msg| !msg.is_empty())
        .map(str::to_string)
}
