//! State assertions.

use af_protocol::execution_models::{ExecutionState, FormInput, Phase};

/// Assert the state is back on the form with `input` kept and an error set.
#[allow(dead_code)]
pub fn assert_failed_back_to_form(state: &ExecutionState, input: &FormInput) {
    assert_eq!(state.phase, Phase::Form, "expected Form, got {:?}", state.phase);
    assert_eq!(&state.form_input, input, "form input must be preserved");
    assert!(state.error.is_some(), "error must be set");
    assert_eq!(state.execution_id, None);
    assert_eq!(state.result, None);
}

/// Assert the state is the fully reset idle shape.
#[allow(dead_code)]
pub fn assert_idle(state: &ExecutionState) {
    assert_eq!(state, &ExecutionState::default());
}
