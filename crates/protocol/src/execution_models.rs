//! Execution state models.
//!
//! This module defines the single source of truth for one agent workflow:
//! the coarse [`Phase`], the submitted form input, progress, the final
//! result, and the last error. The UI renders directly from
//! [`ExecutionState`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use ts_rs::TS;

use crate::progress_models::ConnectionStatus;

/// Form field name to value, as supplied by the caller.
///
/// Used both to prefill the form and as the submission payload.
pub type FormInput = BTreeMap<String, Value>;

/// Coarse state of the workflow.
///
/// The phase progresses: Idle -> Form -> InProgress -> Result.
/// A failed submission returns to Form with the input preserved.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default, TS)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Phase {
    /// No workflow is open.
    #[default]
    Idle,

    /// The form is shown and accepts a submission.
    Form,

    /// The remote call was issued; progress is being tracked.
    InProgress,

    /// A result is available.
    Result,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::Form => "form",
            Self::InProgress => "in-progress",
            Self::Result => "result",
        };
        f.write_str(name)
    }
}

/// Identifier of the requested capability (e.g. `image_generation`).
///
/// Opaque to the controller apart from the lookup that translates it into
/// a remote execution identifier.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, TS)]
#[serde(transparent)]
pub struct AgentType(pub String);

impl AgentType {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AgentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for AgentType {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Latest progress reported for an execution.
///
/// Last-write-wins: the store does not enforce monotonic percentages.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq, TS)]
#[serde(rename_all = "camelCase")]
pub struct ProgressSnapshot {
    /// Completion percentage in `0..=100`.
    pub percentage: u8,

    /// Human-readable status line.
    pub message: String,

    /// Name of the step the remote side is currently running.
    pub current_step: String,
}

impl ProgressSnapshot {
    /// True when no progress has arrived yet; the UI shows an
    /// indeterminate indicator in that case.
    pub fn is_empty(&self) -> bool {
        self.percentage == 0 && self.message.is_empty() && self.current_step.is_empty()
    }
}

/// Payload of a produced artifact.
///
/// Serialized in camelCase for the UI; the snake_case names the remote side
/// uses are accepted on input.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq, TS)]
#[serde(rename_all = "camelCase")]
pub struct ArtifactData {
    /// URL of the generated image.
    #[serde(alias = "image_url")]
    pub image_url: String,

    /// Prompt as rewritten by the remote model, if it changed it.
    #[serde(default, alias = "revised_prompt", skip_serializing_if = "Option::is_none")]
    pub revised_prompt: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    /// Id of the material-library entry the remote side persisted.
    #[serde(default, alias = "library_id", skip_serializing_if = "Option::is_none")]
    pub library_id: Option<String>,

    /// Id of a chat message the remote side already created for this
    /// result. When set, no further cross-reference record is written.
    #[serde(default, alias = "message_id", skip_serializing_if = "Option::is_none")]
    pub message_id: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, TS)]
#[serde(rename_all = "camelCase")]
pub struct ResultMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub execution_id: Option<String>,

    pub completed_at: DateTime<Utc>,
}

/// Final result of one run. Set exactly once per run.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, TS)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionResult {
    pub artifact_id: String,
    pub data: ArtifactData,
    pub metadata: ResultMetadata,
}

/// State of the agent workflow.
///
/// Exactly one of progress activity, `result`, or `error` is current,
/// governed by `phase`. `execution_id` is set whenever the phase is
/// `InProgress` and the remote call has been accepted.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, TS)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionState {
    pub phase: Phase,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent_type: Option<AgentType>,

    #[serde(default)]
    pub form_input: FormInput,

    /// Handle assigned once the remote call is accepted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub execution_id: Option<String>,

    /// Correlation id of the surrounding conversation. Passed through,
    /// never interpreted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,

    #[serde(default)]
    pub progress: ProgressSnapshot,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<ExecutionResult>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    /// Status of the live progress channel, `None` when no channel is open.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub connection: Option<ConnectionStatus>,

    /// Number of the current submission. Zero until the first submission.
    #[serde(default)]
    pub run: u64,
}

impl ExecutionState {
    /// Fresh form-phase state for a newly opened workflow.
    pub fn opened(
        agent_type: AgentType,
        form_input: FormInput,
        session_id: Option<String>,
    ) -> Self {
        Self {
            phase: Phase::Form,
            agent_type: Some(agent_type),
            form_input,
            session_id,
            ..Self::default()
        }
    }

    pub fn is_idle(&self) -> bool {
        self.phase == Phase::Idle
    }
}
