//! Test fixtures.

use super::navigator::RecordingNavigator;
use af_core::completion::MemoryRecordStore;
use af_core::config::ControllerConfig;
use af_core::progress::ScriptedTransport;
use af_core::remote::MockExecutionApi;
use af_core::AgentWorkflow;
use af_protocol::execution_models::{AgentType, FormInput};
use af_protocol::ipc::Op;
use serde_json::json;
use std::sync::Arc;

pub const SESSION_ID: &str = "session-1";

/// The form input used across scenarios.
pub fn lion_input() -> FormInput {
    let mut input = FormInput::new();
    input.insert("description".to_string(), json!("lion for biology class"));
    input
}

pub fn open_image_op() -> Op {
    Op::Open {
        agent_type: AgentType::from("image_generation"),
        form_input: FormInput::new(),
        session_id: Some(SESSION_ID.to_string()),
    }
}

/// A workflow wired to mocks, plus handles to inspect them.
pub struct Harness {
    pub workflow: AgentWorkflow,
    pub api: MockExecutionApi,
    pub transport: ScriptedTransport,
    pub records: MemoryRecordStore,
    pub navigator: RecordingNavigator,
}

#[allow(dead_code)]
impl Harness {
    pub fn new(api: MockExecutionApi, transport: ScriptedTransport) -> Self {
        Self::with_config(&ControllerConfig::default(), api, transport)
    }

    pub fn with_config(
        config: &ControllerConfig,
        api: MockExecutionApi,
        transport: ScriptedTransport,
    ) -> Self {
        let records = MemoryRecordStore::new();
        let navigator = RecordingNavigator::new();
        let workflow = AgentWorkflow::new(
            config,
            Arc::new(api.clone()),
            Arc::new(transport.clone()),
            Arc::new(records.clone()),
            Arc::new(navigator.clone()),
        );
        navigator.watch(workflow.store());

        Self {
            workflow,
            api,
            transport,
            records,
            navigator,
        }
    }
}
