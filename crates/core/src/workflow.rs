//! The assembled controller.
//!
//! `AgentWorkflow` wires the store, submission orchestrator and completion
//! coordinator together and maps UI [`Op`]s onto them. The UI observes the
//! state through [`AgentWorkflow::subscribe`].

use crate::completion::coordinator::{CompletionCoordinator, CompletionReport};
use crate::completion::gate::ActionGate;
use crate::completion::records::{Navigator, RecordStore};
use crate::config::models::ControllerConfig;
use crate::progress::transport::ProgressTransport;
use crate::progress::websocket::WebSocketTransport;
use crate::remote::base::{ApiError, ExecutionApi};
use crate::remote::http::HttpExecutionApi;
use crate::remote::registry::ExecutionRegistry;
use crate::state::store::ExecutionStore;
use crate::submission::{SubmissionOrchestrator, SubmissionOutcome};
use af_protocol::execution_models::ExecutionState;
use af_protocol::ipc::Op;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::debug;

/// Result of handling one [`Op`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OpOutcome {
    Opened,
    Submitted(SubmissionOutcome),
    Cancelled,

    /// `None` when the continue was dropped by the action gate.
    Continued(Option<CompletionReport>),

    Closed,
}

pub struct AgentWorkflow {
    store: ExecutionStore,
    submission: SubmissionOrchestrator,
    completion: CompletionCoordinator,
}

impl AgentWorkflow {
    /// Build a controller talking to the configured HTTP and WebSocket
    /// endpoints.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Transport` if the HTTP client cannot be built.
    pub fn from_config(
        config: &ControllerConfig,
        records: Arc<dyn RecordStore>,
        navigator: Arc<dyn Navigator>,
    ) -> Result<Self, ApiError> {
        let api = Arc::new(HttpExecutionApi::from_config(config)?);
        let transport = Arc::new(WebSocketTransport::from_config(config));
        Ok(Self::new(config, api, transport, records, navigator))
    }

    /// Build a controller from explicit collaborators.
    ///
    /// # Arguments
    ///
    /// * `config` - Timing, verbosity and agent type overrides
    /// * `api` - The remote execution endpoint
    /// * `transport` - Opens progress channels
    /// * `records` - Where completion records are written
    /// * `navigator` - Moves the UI after completion
    pub fn new(
        config: &ControllerConfig,
        api: Arc<dyn ExecutionApi>,
        transport: Arc<dyn ProgressTransport>,
        records: Arc<dyn RecordStore>,
        navigator: Arc<dyn Navigator>,
    ) -> Self {
        let store = ExecutionStore::new(transport, config.channel_settings());
        let registry = ExecutionRegistry::with_overrides(&config.executions);
        let submission = SubmissionOrchestrator::new(store.clone(), api, registry);
        let completion = CompletionCoordinator::new(store.clone(), records, navigator)
            .with_gate(ActionGate::new(config.timing.action_cooldown()))
            .with_settle_delay(config.timing.record_settle_delay());

        Self {
            store,
            submission,
            completion,
        }
    }

    pub fn store(&self) -> &ExecutionStore {
        &self.store
    }

    pub fn subscribe(&self) -> watch::Receiver<ExecutionState> {
        self.store.subscribe()
    }

    pub fn snapshot(&self) -> ExecutionState {
        self.store.snapshot()
    }

    /// Apply one UI command.
    pub async fn handle(&self, op: Op) -> OpOutcome {
        match op {
            Op::Open {
                agent_type,
                form_input,
                session_id,
            } => {
                self.store.open(agent_type, form_input, session_id);
                OpOutcome::Opened
            }
            Op::Submit { form_input } => {
                OpOutcome::Submitted(self.submission.submit(form_input).await)
            }
            Op::Cancel => {
                self.submission.cancel();
                OpOutcome::Cancelled
            }
            Op::Continue => OpOutcome::Continued(self.completion.continue_from_result().await),
            Op::Close => {
                self.store.close();
                OpOutcome::Closed
            }
        }
    }

    /// Close the workflow and cancel the completion gate.
    pub fn teardown(&self) {
        self.store.close();
        self.completion.teardown();
        debug!("Workflow torn down");
    }
}

impl Drop for AgentWorkflow {
    fn drop(&mut self) {
        self.teardown();
    }
}
