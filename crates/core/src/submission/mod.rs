//! Submission orchestrator.
//!
//! Sends validated form input to the remote execution endpoint and feeds
//! the response into the [`ExecutionStore`]. A response that already
//! carries the artifact completes the run directly and no progress channel
//! is opened; an acknowledgement hands the execution id to the store, which
//! opens the channel. Failures become the store's `error`; nothing is
//! returned to the caller as an `Err`.

use crate::remote::base::ExecutionApi;
use crate::remote::registry::ExecutionRegistry;
use crate::state::execution::TransitionError;
use crate::state::store::{ExecutionStore, RunHandle};
use af_protocol::api_models::{ExecuteRequest, ResponseOutcome};
use af_protocol::execution_models::{ExecutionResult, FormInput, ResultMetadata};
use chrono::Utc;
use std::sync::Arc;
use tracing::{error, info, warn};
use uuid::Uuid;

/// What became of one `submit` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmissionOutcome {
    /// The response carried the result; the store is in `Result`.
    Completed,

    /// Accepted; progress is tracked on the channel for this id.
    Accepted { execution_id: String },

    /// Accepted without an id; a local id was synthesized and no progress
    /// can be tracked.
    Untracked { execution_id: String },

    /// The submission failed; the store is back in `Form` with this error.
    Failed(String),

    /// Not submitted: the workflow was not in `Form`.
    Rejected(TransitionError),

    /// The workflow was closed or resubmitted before the response arrived;
    /// the response was discarded.
    Superseded,
}

pub struct SubmissionOrchestrator {
    store: ExecutionStore,
    api: Arc<dyn ExecutionApi>,
    registry: ExecutionRegistry,
}

impl SubmissionOrchestrator {
    pub fn new(store: ExecutionStore, api: Arc<dyn ExecutionApi>, registry: ExecutionRegistry) -> Self {
        Self {
            store,
            api,
            registry,
        }
    }

    pub fn store(&self) -> &ExecutionStore {
        &self.store
    }

    /// Submit `form_input` for the open workflow.
    ///
    /// The input is assumed valid; field checks belong to the form.
    ///
    /// # Returns
    ///
    /// The [`SubmissionOutcome`]. The store already reflects it when this
    /// returns.
    pub async fn submit(&self, form_input: FormInput) -> SubmissionOutcome {
        let run = match self.store.begin_submission(form_input) {
            Ok(run) => run,
            Err(e) => {
                warn!(error = %e, "Submission rejected");
                return SubmissionOutcome::Rejected(e);
            }
        };

        let state = self.store.snapshot();
        let Some(agent_type) = state.agent_type else {
            return self.failed(&run, "No agent type selected".to_string());
        };
        info!(run = run.run(), agent_type = %agent_type, "Submitting execution");

        let Some(execution_identifier) = self.registry.resolve(&agent_type) else {
            let message = format!("No remote execution is configured for agent type '{agent_type}'");
            error!(agent_type = %agent_type, "{message}");
            return self.failed(&run, message);
        };

        let serialized_input = match serde_json::to_string(&state.form_input) {
            Ok(serialized) => serialized,
            Err(e) => return self.failed(&run, format!("Failed to serialize form input: {e}")),
        };

        let request = ExecuteRequest {
            execution_identifier: execution_identifier.to_string(),
            serialized_input,
            context: state.form_input,
            session_id: state.session_id,
            confirm_execution: true,
        };

        let response = match self.api.execute(&request).await {
            Ok(response) => response,
            Err(e) => {
                error!(run = run.run(), error = %e, "Remote execution request failed");
                return self.failed(&run, e.to_string());
            }
        };

        match response.into_outcome() {
            ResponseOutcome::Completed { execution_id, data } => {
                let result = ExecutionResult {
                    artifact_id: execution_id
                        .clone()
                        .unwrap_or_else(|| Uuid::new_v4().to_string()),
                    data,
                    metadata: ResultMetadata {
                        execution_id,
                        completed_at: Utc::now(),
                    },
                };
                if !run.complete_synchronously(result) {
                    return SubmissionOutcome::Superseded;
                }
                info!(run = run.run(), "Execution completed synchronously");
                SubmissionOutcome::Completed
            }
            ResponseOutcome::Accepted {
                execution_id: Some(execution_id),
                status,
            } => {
                if !run.accept_execution_id(execution_id.clone()) {
                    return SubmissionOutcome::Superseded;
                }
                info!(run = run.run(), execution_id = %execution_id, status = ?status, "Execution accepted");
                SubmissionOutcome::Accepted { execution_id }
            }
            ResponseOutcome::Accepted {
                execution_id: None, ..
            } => match run.accept_untracked() {
                Some(execution_id) => SubmissionOutcome::Untracked { execution_id },
                None => SubmissionOutcome::Superseded,
            },
            ResponseOutcome::Rejected { message } => {
                error!(run = run.run(), error = %message, "Remote execution rejected");
                self.failed(&run, message)
            }
        }
    }

    /// Cancel the workflow locally.
    ///
    /// There is no remote cancel endpoint, so an in-flight execution keeps
    /// running on the remote side; its late response or progress is
    /// discarded.
    pub fn cancel(&self) {
        if let Some(execution_id) = self.store.execution_id() {
            warn!(
                execution_id = %execution_id,
                "Cancelled locally; the remote execution may continue"
            );
        }
        self.store.close();
    }

    fn failed(&self, run: &RunHandle, message: String) -> SubmissionOutcome {
        if run.fail(message.clone()) {
            SubmissionOutcome::Failed(message)
        } else {
            SubmissionOutcome::Superseded
        }
    }
}
