//! Progress channel models.
//!
//! The progress channel is a streaming connection scoped to one execution
//! id. Inbound frames are JSON objects tagged by `type`:
//!
//! ```json
//! { "type": "progress", "progress": 50, "message": "halfway", "step": "render" }
//! { "type": "completed", "result": { "image_url": "https://..." } }
//! { "type": "error", "message": "model crashed" }
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use ts_rs::TS;

use crate::execution_models::{ArtifactData, ProgressSnapshot};

/// Step name the remote side uses while it stores the produced artifact.
pub const FINALIZING_STEP: &str = "finalizing";

/// Connection status of a progress channel.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, TS)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConnectionStatus {
    /// A connection is being opened, or a reconnect is scheduled.
    Connecting,
    Connected,
    /// The last connection attempt or the open connection failed.
    Error,
}

/// How chatty the remote side should be on the progress channel.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default, TS)]
#[serde(rename_all = "lowercase")]
pub enum Verbosity {
    Minimal,
    #[default]
    Normal,
    Verbose,
}

impl Verbosity {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Minimal => "minimal",
            Self::Normal => "normal",
            Self::Verbose => "verbose",
        }
    }
}

impl fmt::Display for Verbosity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An inbound progress channel frame.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, TS)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ChannelMessage {
    /// Progress update. Overwrites the current snapshot.
    Progress {
        progress: f64,
        #[serde(default)]
        message: String,
        #[serde(default)]
        step: String,
    },

    /// Explicit completion carrying the produced artifact.
    Completed { result: ArtifactData },

    /// The remote execution failed.
    Error { message: String },

    /// Any frame type this client does not handle.
    #[serde(other)]
    Other,
}

impl ChannelMessage {
    /// Parse a text frame.
    pub fn parse(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    /// Snapshot for a progress frame, with the percentage clamped to `0..=100`.
    pub fn snapshot(&self) -> Option<ProgressSnapshot> {
        match self {
            Self::Progress {
                progress,
                message,
                step,
            } => Some(ProgressSnapshot {
                percentage: progress.clamp(0.0, 100.0).round() as u8,
                message: message.clone(),
                current_step: step.clone(),
            }),
            _ => None,
        }
    }

    /// True for progress frames that look final (100% or the finalizing
    /// step). Advisory only: completion arrives separately.
    pub fn is_terminal_progress(&self) -> bool {
        match self {
            Self::Progress { progress, step, .. } => {
                *progress >= 100.0 || step.eq_ignore_ascii_case(FINALIZING_STEP)
            }
            _ => false,
        }
    }
}
