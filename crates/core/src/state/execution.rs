//! Execution state machine.
//!
//! Pure transition functions over [`ExecutionState`]. Each returns whether
//! the state changed; transitions that do not apply in the current phase
//! leave the state untouched.

use af_protocol::execution_models::{
    AgentType, ExecutionResult, ExecutionState, FormInput, Phase, ProgressSnapshot,
};
use af_protocol::progress_models::ConnectionStatus;
use thiserror::Error;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionError {
    #[error("Invalid phase: expected {expected}, found {actual}")]
    InvalidPhase { expected: Phase, actual: Phase },
}

pub type TransitionResult<T> = Result<T, TransitionError>;

/// Reset to a fresh `Form` phase for `agent_type`.
pub fn open(
    state: &mut ExecutionState,
    agent_type: AgentType,
    form_input: FormInput,
    session_id: Option<String>,
) {
    *state = ExecutionState::opened(agent_type, form_input, session_id);
}

/// Reset to `Idle`. Returns false if the state was already idle.
pub fn close(state: &mut ExecutionState) -> bool {
    if *state == ExecutionState::default() {
        return false;
    }
    *state = ExecutionState::default();
    true
}

/// Record the submitted input and move `Form -> InProgress` as run `run`.
///
/// # Errors
///
/// Returns `TransitionError::InvalidPhase` when not in `Form`; the state is
/// not modified.
pub fn begin_submission(
    state: &mut ExecutionState,
    form_input: FormInput,
    run: u64,
) -> TransitionResult<()> {
    if state.phase != Phase::Form {
        return Err(TransitionError::InvalidPhase {
            expected: Phase::Form,
            actual: state.phase,
        });
    }

    state.phase = Phase::InProgress;
    state.form_input = form_input;
    state.execution_id = None;
    state.progress = ProgressSnapshot::default();
    state.result = None;
    state.error = None;
    state.connection = None;
    state.run = run;
    Ok(())
}

pub fn accept_execution_id(state: &mut ExecutionState, execution_id: String) -> bool {
    if state.phase != Phase::InProgress {
        return false;
    }
    state.execution_id = Some(execution_id);
    true
}

/// Store the result and move to `Result`.
pub fn complete(state: &mut ExecutionState, result: ExecutionResult) -> bool {
    if state.phase != Phase::InProgress {
        return false;
    }
    state.phase = Phase::Result;
    state.result = Some(result);
    state.error = None;
    state.connection = None;
    true
}

/// Overwrite the progress snapshot. Last write wins.
pub fn apply_progress(state: &mut ExecutionState, snapshot: ProgressSnapshot) -> bool {
    if state.phase != Phase::InProgress || state.progress == snapshot {
        return false;
    }
    state.progress = snapshot;
    true
}

/// Record a failure.
///
/// From `InProgress` this returns to `Form` with the submitted input kept so
/// the user can retry. In `Form` it only sets the error.
pub fn fail(state: &mut ExecutionState, message: String) -> bool {
    match state.phase {
        Phase::InProgress => {
            state.phase = Phase::Form;
            state.execution_id = None;
            state.progress = ProgressSnapshot::default();
            state.connection = None;
            state.error = Some(message);
            true
        }
        Phase::Form => {
            state.error = Some(message);
            true
        }
        Phase::Idle | Phase::Result => false,
    }
}

pub fn set_connection(state: &mut ExecutionState, status: Option<ConnectionStatus>) -> bool {
    if state.connection == status {
        return false;
    }
    state.connection = status;
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use af_protocol::execution_models::{ArtifactData, ResultMetadata};
    use chrono::Utc;
    use serde_json::json;

    fn form_input() -> FormInput {
        let mut input = FormInput::new();
        input.insert("description".to_string(), json!("lion for biology class"));
        input
    }

    fn opened() -> ExecutionState {
        let mut state = ExecutionState::default();
        open(
            &mut state,
            AgentType::from("image_generation"),
            FormInput::new(),
            Some("session-1".to_string()),
        );
        state
    }

    fn in_progress() -> ExecutionState {
        let mut state = opened();
        begin_submission(&mut state, form_input(), 1).unwrap();
        state
    }

    fn result() -> ExecutionResult {
        ExecutionResult {
            artifact_id: "a-1".to_string(),
            data: ArtifactData {
                image_url: "https://x/y.png".to_string(),
                ..ArtifactData::default()
            },
            metadata: ResultMetadata {
                execution_id: None,
                completed_at: Utc::now(),
            },
        }
    }

    #[test]
    fn test_open_resets_to_form() {
        let mut state = in_progress();
        state.error = Some("old".to_string());
        open(&mut state, AgentType::from("quiz"), form_input(), None);

        assert_eq!(state.phase, Phase::Form);
        assert_eq!(state.agent_type, Some(AgentType::from("quiz")));
        assert_eq!(state.form_input, form_input());
        assert_eq!(state.execution_id, None);
        assert_eq!(state.error, None);
        assert_eq!(state.run, 0);
    }

    #[test]
    fn test_begin_submission_preserves_input() {
        let state = in_progress();
        assert_eq!(state.phase, Phase::InProgress);
        assert_eq!(state.form_input, form_input());
        assert_eq!(state.session_id.as_deref(), Some("session-1"));
        assert_eq!(state.run, 1);
    }

    #[test]
    fn test_begin_submission_outside_form_is_rejected() {
        let mut state = in_progress();
        let before = state.clone();

        let err = begin_submission(&mut state, FormInput::new(), 2).unwrap_err();
        assert_eq!(
            err,
            TransitionError::InvalidPhase {
                expected: Phase::Form,
                actual: Phase::InProgress
            }
        );
        assert_eq!(state, before);

        let mut idle = ExecutionState::default();
        assert!(begin_submission(&mut idle, form_input(), 3).is_err());
        assert_eq!(idle, ExecutionState::default());
    }

    #[test]
    fn test_close_is_idempotent() {
        let mut state = in_progress();
        assert!(close(&mut state));
        let once = state.clone();
        assert!(!close(&mut state));
        assert_eq!(state, once);
        assert_eq!(state, ExecutionState::default());
    }

    #[test]
    fn test_complete_does_not_need_execution_id() {
        let mut state = in_progress();
        assert!(complete(&mut state, result()));
        assert_eq!(state.phase, Phase::Result);
        assert_eq!(state.execution_id, None);
        assert!(state.result.is_some());

        // Set once per run
        assert!(!complete(&mut state, result()));
    }

    #[test]
    fn test_progress_only_applies_in_progress() {
        let mut state = opened();
        let snapshot = ProgressSnapshot {
            percentage: 50,
            message: "halfway".to_string(),
            current_step: String::new(),
        };
        assert!(!apply_progress(&mut state, snapshot.clone()));

        let mut state = in_progress();
        assert!(apply_progress(&mut state, snapshot.clone()));
        assert_eq!(state.phase, Phase::InProgress);
        assert_eq!(state.progress, snapshot);

        // Not monotonic: last write wins
        let lower = ProgressSnapshot {
            percentage: 20,
            ..snapshot
        };
        assert!(apply_progress(&mut state, lower));
        assert_eq!(state.progress.percentage, 20);
    }

    #[test]
    fn test_fail_returns_to_form_with_input() {
        let mut state = in_progress();
        accept_execution_id(&mut state, "exec-1".to_string());
        set_connection(&mut state, Some(ConnectionStatus::Connected));

        assert!(fail(&mut state, "network down".to_string()));
        assert_eq!(state.phase, Phase::Form);
        assert_eq!(state.form_input, form_input());
        assert_eq!(state.error.as_deref(), Some("network down"));
        assert_eq!(state.execution_id, None);
        assert_eq!(state.connection, None);
    }

    #[test]
    fn test_fail_ignored_when_idle_or_done() {
        let mut idle = ExecutionState::default();
        assert!(!fail(&mut idle, "x".to_string()));
        assert_eq!(idle.error, None);

        let mut done = in_progress();
        complete(&mut done, result());
        assert!(!fail(&mut done, "x".to_string()));
        assert_eq!(done.phase, Phase::Result);
    }

    #[test]
    fn test_accept_execution_id_requires_in_progress() {
        let mut state = opened();
        assert!(!accept_execution_id(&mut state, "exec-1".to_string()));
        assert_eq!(state.execution_id, None);
    }
}
