//! Remote execution endpoint models.
//!
//! The execute endpoint either finishes synchronously (the response carries
//! the produced artifact) or acknowledges the request and reports progress
//! over the progress channel. [`ExecuteResponse::into_outcome`] decides
//! which of the two shapes a response has.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::execution_models::{ArtifactData, FormInput};

/// Body of the execute request.
///
/// ```json
/// {
///   "executionIdentifier": "generate_image",
///   "serializedInput": "{\"description\":\"lion\"}",
///   "context": { "description": "lion" },
///   "sessionId": "session-1",
///   "confirmExecution": true
/// }
/// ```
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, TS)]
#[serde(rename_all = "camelCase")]
pub struct ExecuteRequest {
    /// Remote name of the capability, resolved from the agent type.
    pub execution_identifier: String,

    /// The form input serialized as a JSON string.
    pub serialized_input: String,

    /// The form input as an object.
    pub context: FormInput,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,

    /// Always true: the user already confirmed in the form.
    pub confirm_execution: bool,
}

/// Status reported by an asynchronous acknowledgement.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, TS)]
#[serde(rename_all = "lowercase")]
pub enum RemoteStatus {
    Queued,
    Running,
    Completed,
    Failed,
    #[serde(other)]
    Unknown,
}

/// Raw response of the execute endpoint.
///
/// Synchronous shape:
/// `{ "image_url": "...", "revised_prompt": "...", "title": "...", "library_id": "...", "message_id": "..." }`
///
/// Asynchronous shape:
/// `{ "executionId": "exec-1", "status": "running" }`
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq, TS)]
pub struct ExecuteResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub revised_prompt: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub library_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message_id: Option<String>,

    #[serde(
        default,
        rename = "executionId",
        alias = "execution_id",
        skip_serializing_if = "Option::is_none"
    )]
    pub execution_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<RemoteStatus>,

    /// Error text the remote side attaches to a failed status.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Interpretation of an [`ExecuteResponse`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResponseOutcome {
    /// The response already carries the produced artifact.
    Completed {
        execution_id: Option<String>,
        data: ArtifactData,
    },

    /// The request was accepted; progress arrives over the channel.
    Accepted {
        execution_id: Option<String>,
        status: Option<RemoteStatus>,
    },

    /// The remote side refused or failed the execution in its response.
    Rejected { message: String },
}

impl ExecuteResponse {
    /// Classify the response.
    ///
    /// A non-empty `image_url` wins over everything else. Without one, a
    /// `failed` status is a rejection, and so is a `completed` status: the
    /// remote side reports the run as done but returned nothing to show, and
    /// no completion frame would follow. Anything else is an acknowledgement.
    pub fn into_outcome(self) -> ResponseOutcome {
        let execution_id = self.execution_id.filter(|id| !id.trim().is_empty());

        if let Some(image_url) = self.image_url.filter(|url| !url.trim().is_empty()) {
            return ResponseOutcome::Completed {
                execution_id,
                data: ArtifactData {
                    image_url,
                    revised_prompt: self.revised_prompt,
                    title: self.title,
                    library_id: self.library_id,
                    message_id: self.message_id,
                },
            };
        }

        match self.status {
            Some(RemoteStatus::Failed) => {
                return ResponseOutcome::Rejected {
                    message: self
                        .error
                        .unwrap_or_else(|| "Remote execution failed".to_string()),
                };
            }
            Some(RemoteStatus::Completed) => {
                return ResponseOutcome::Rejected {
                    message: self.error.unwrap_or_else(|| {
                        "Remote execution completed without a result".to_string()
                    }),
                };
            }
            _ => {}
        }

        ResponseOutcome::Accepted {
            execution_id,
            status: self.status,
        }
    }
}
