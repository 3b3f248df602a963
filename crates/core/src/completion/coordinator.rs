//! Completion coordinator.
//!
//! When the user continues from a result, three steps run in order through
//! the [`ActionGate`]: write a chat record that cross-references the result
//! and the session, close the workflow, then navigate to the chat. Each step
//! skips itself when its inputs are missing; a skipped or failed step never
//! stops the ones after it.

use crate::completion::gate::ActionGate;
use crate::completion::records::{Navigator, RecordStore};
use crate::config::models::DEFAULT_RECORD_SETTLE_DELAY;
use crate::state::store::ExecutionStore;
use af_protocol::execution_models::{ExecutionResult, ExecutionState};
use af_protocol::record_models::{
    Destination, NewChatRecord, RecordMetadata, RecordRole, IMAGE_RECORD_KIND,
};
use chrono::Utc;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Record content when the result has no title.
const DEFAULT_RECORD_CONTENT: &str = "Generated image";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordStep {
    /// A record was written with this id.
    Created(String),

    /// A message or record already references the result; carries its id.
    AlreadyLinked(String),

    /// Required data was missing.
    Skipped(String),

    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NavigationStep {
    Navigated(Destination),
    Failed(String),
}

/// What one completion run did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionReport {
    pub record: RecordStep,

    /// False if the workflow was already idle.
    pub closed: bool,

    pub navigation: NavigationStep,
}

pub struct CompletionCoordinator {
    store: ExecutionStore,
    records: Arc<dyn RecordStore>,
    navigator: Arc<dyn Navigator>,
    gate: ActionGate,
    settle_delay: Duration,
}

impl CompletionCoordinator {
    pub fn new(
        store: ExecutionStore,
        records: Arc<dyn RecordStore>,
        navigator: Arc<dyn Navigator>,
    ) -> Self {
        Self {
            store,
            records,
            navigator,
            gate: ActionGate::default(),
            settle_delay: DEFAULT_RECORD_SETTLE_DELAY,
        }
    }

    pub fn with_gate(mut self, gate: ActionGate) -> Self {
        self.gate = gate;
        self
    }

    /// Pause after a record write before navigating.
    pub fn with_settle_delay(mut self, settle_delay: Duration) -> Self {
        self.settle_delay = settle_delay;
        self
    }

    /// Handle the user continuing from the current result.
    ///
    /// # Returns
    ///
    /// `None` when the call was dropped by the gate (a repeat click within
    /// the cooldown, or after teardown).
    pub async fn continue_from_result(&self) -> Option<CompletionReport> {
        let report = self.gate.run(self.complete()).await;
        if report.is_none() {
            debug!("Continue dropped by action gate");
        }
        report
    }

    /// Cancel the gate so no further completion runs.
    pub fn teardown(&self) {
        self.gate.cancel();
    }

    async fn complete(&self) -> CompletionReport {
        let state = self.store.snapshot();

        let record = self.write_record(&state).await;

        let closed = !state.is_idle();
        self.store.close();

        let destination = Destination::Chat {
            session_id: state.session_id.clone(),
        };
        if state.session_id.is_none() {
            warn!("No session id, navigating to chat without one");
        }
        let navigation = match self.navigator.navigate(destination.clone()).await {
            Ok(()) => NavigationStep::Navigated(destination),
            Err(e) => {
                warn!(error = %e, "Navigation after completion failed");
                NavigationStep::Failed(e.to_string())
            }
        };

        info!(record = ?record, closed, "Completion finished");
        CompletionReport {
            record,
            closed,
            navigation,
        }
    }

    async fn write_record(&self, state: &ExecutionState) -> RecordStep {
        let Some(result) = state.result.as_ref() else {
            return skipped("no result to record");
        };
        if let Some(message_id) = &result.data.message_id {
            debug!(message_id = %message_id, "Result already linked to a message");
            return RecordStep::AlreadyLinked(message_id.clone());
        }
        if result.data.image_url.trim().is_empty() {
            return skipped("result has no image url");
        }
        let Some(library_id) = &result.data.library_id else {
            return skipped("result has no library id");
        };
        let Some(session_id) = &state.session_id else {
            return skipped("no session id");
        };

        if let Some(existing) = self.existing_record(session_id, result, library_id).await {
            debug!(record_id = %existing, "Result already recorded in this session");
            return RecordStep::AlreadyLinked(existing);
        }

        let record = match build_record(state, result, library_id, session_id) {
            Ok(record) => record,
            Err(e) => {
                warn!(error = %e, "Failed to encode record metadata");
                return RecordStep::Failed(e.to_string());
            }
        };

        match self.records.create(record).await {
            Ok(id) => {
                info!(record_id = %id, session_id = %session_id, "Result record created");
                // Readers have no read-after-write guarantee
                tokio::time::sleep(self.settle_delay).await;
                RecordStep::Created(id)
            }
            Err(e) => {
                warn!(error = %e, "Failed to create result record");
                RecordStep::Failed(e.to_string())
            }
        }
    }

    /// Id of a session record that already references this result. A failed
    /// lookup counts as no record.
    async fn existing_record(
        &self,
        session_id: &str,
        result: &ExecutionResult,
        library_id: &str,
    ) -> Option<String> {
        let records = match self.records.records_for_session(session_id).await {
            Ok(records) => records,
            Err(e) => {
                warn!(error = %e, "Failed to look up existing records");
                return None;
            }
        };

        records
            .into_iter()
            .find(|record| {
                record.parsed_metadata().is_some_and(|metadata| {
                    metadata.image_url == result.data.image_url
                        && metadata.library_id.as_deref() == Some(library_id)
                })
            })
            .map(|record| record.id)
    }
}

fn skipped(reason: &str) -> RecordStep {
    warn!(reason, "Skipping result record");
    RecordStep::Skipped(reason.to_string())
}

fn build_record(
    state: &ExecutionState,
    result: &ExecutionResult,
    library_id: &str,
    session_id: &str,
) -> Result<NewChatRecord, serde_json::Error> {
    let description = result.data.revised_prompt.clone().or_else(|| {
        state
            .form_input
            .get("description")
            .and_then(Value::as_str)
            .map(str::to_string)
    });

    let metadata = RecordMetadata {
        kind: IMAGE_RECORD_KIND.to_string(),
        image_url: result.data.image_url.clone(),
        library_id: Some(library_id.to_string()),
        title: result.data.title.clone(),
        description,
        original_params: state.form_input.clone(),
    };

    Ok(NewChatRecord {
        content: result
            .data
            .title
            .clone()
            .unwrap_or_else(|| DEFAULT_RECORD_CONTENT.to_string()),
        role: RecordRole::Assistant,
        timestamp: Utc::now(),
        session_id: session_id.to_string(),
        metadata: metadata.encode()?,
    })
}
