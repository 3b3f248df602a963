//! Persisted-record and navigation models.
//!
//! When the user continues from a result, a lightweight chat record is
//! written that cross-references the artifact and the session. The
//! backing store keeps `metadata` as a string, and older rows were written
//! double-encoded, so reads go through [`RecordMetadata::parse_lenient`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use ts_rs::TS;

use crate::execution_models::FormInput;

/// Metadata `type` for image results.
pub const IMAGE_RECORD_KIND: &str = "image";

/// Nesting depth accepted when unwrapping string-encoded metadata.
const MAX_METADATA_ENCODING_DEPTH: usize = 3;

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, TS)]
#[serde(rename_all = "lowercase")]
pub enum RecordRole {
    User,
    Assistant,
}

/// Metadata attached to a chat record that references a generated artifact.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, TS)]
pub struct RecordMetadata {
    #[serde(rename = "type")]
    pub kind: String,

    pub image_url: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub library_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// The form input the artifact was generated from.
    #[serde(rename = "originalParams", default)]
    pub original_params: FormInput,
}

impl RecordMetadata {
    /// Serialize to the string form the record store expects.
    pub fn encode(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Parse metadata read back from the store.
    ///
    /// Accepts an object, a JSON string holding an object, or a string
    /// encoded more than once. Anything else yields `None`.
    pub fn parse_lenient(raw: &Value) -> Option<Self> {
        let mut current = raw.clone();
        for _ in 0..MAX_METADATA_ENCODING_DEPTH {
            match current {
                Value::Object(_) => return serde_json::from_value(current).ok(),
                Value::String(text) => current = serde_json::from_str(&text).ok()?,
                _ => return None,
            }
        }
        None
    }
}

/// A record to be created.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, TS)]
pub struct NewChatRecord {
    pub content: String,
    pub role: RecordRole,
    pub timestamp: DateTime<Utc>,
    pub session_id: String,

    /// [`RecordMetadata`] encoded as a JSON string.
    pub metadata: String,
}

/// A record as read back from the store.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, TS)]
pub struct ChatRecord {
    pub id: String,
    pub content: String,
    pub role: RecordRole,
    pub timestamp: DateTime<Utc>,
    pub session_id: String,

    /// Either a string or an object, depending on who wrote the row.
    #[serde(default)]
    pub metadata: Value,
}

impl ChatRecord {
    pub fn from_new(id: String, record: NewChatRecord) -> Self {
        Self {
            id,
            content: record.content,
            role: record.role,
            timestamp: record.timestamp,
            session_id: record.session_id,
            metadata: Value::String(record.metadata),
        }
    }

    pub fn parsed_metadata(&self) -> Option<RecordMetadata> {
        RecordMetadata::parse_lenient(&self.metadata)
    }
}

/// Where the UI goes after the user continues from a result.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, TS)]
#[serde(tag = "view", rename_all = "camelCase")]
pub enum Destination {
    /// The chat view, scoped to the conversation when one is known.
    #[serde(rename_all = "camelCase")]
    Chat { session_id: Option<String> },

    /// The generated-material library.
    Library,
}
