use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A binding between one or more uploaded documents and a transcript.
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub id: String,
    pub file_name: String,
    pub created_at: DateTime<Utc>,
}

impl Session {
    pub fn new(id: &str, file_name: &str, created_at: DateTime<Utc>) -> Self {
        Self {
            id: id.to_string(),
            file_name: file_name.to_string(),
            created_at,
        }
    }
}
