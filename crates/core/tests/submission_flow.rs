//! Integration tests for submission through the assembled workflow.
//!
//! Covers the synchronous and asynchronous completion paths, failure
//! handling and the store's close/cancel behaviour.

mod common;

use af_core::progress::{ScriptedTransport, Session};
use af_core::remote::MockExecutionApi;
use af_core::submission::SubmissionOutcome;
use af_core::OpOutcome;
use af_protocol::execution_models::{FormInput, Phase};
use af_protocol::ipc::Op;
use af_protocol::progress_models::{ConnectionStatus, Verbosity};
use common::*;
use std::time::Duration;
use tokio::sync::mpsc;

async fn settle() {
    tokio::time::sleep(Duration::from_millis(10)).await;
}

#[tokio::test]
async fn test_open_then_submit_moves_to_in_progress_with_input() {
    let harness = Harness::new(
        MockExecutionApi::accepting("exec-1"),
        ScriptedTransport::idle(),
    );
    let workflow = &harness.workflow;

    assert_eq!(workflow.handle(open_image_op()).await, OpOutcome::Opened);
    assert_eq!(workflow.snapshot().phase, Phase::Form);

    workflow
        .handle(Op::Submit {
            form_input: lion_input(),
        })
        .await;

    let state = workflow.snapshot();
    assert_eq!(state.phase, Phase::InProgress);
    assert_eq!(state.form_input, lion_input());
}

/// Scenario A: the response carries the image, so no channel is opened.
#[tokio::test]
async fn test_synchronous_completion_opens_no_channel() {
    let harness = Harness::new(
        MockExecutionApi::completing("https://x/y.png"),
        ScriptedTransport::idle(),
    );
    let workflow = &harness.workflow;
    workflow.handle(open_image_op()).await;

    let outcome = workflow
        .handle(Op::Submit {
            form_input: lion_input(),
        })
        .await;
    assert_eq!(outcome, OpOutcome::Submitted(SubmissionOutcome::Completed));

    let state = workflow.snapshot();
    assert_eq!(state.phase, Phase::Result);
    assert_eq!(state.result.unwrap().data.image_url, "https://x/y.png");
    assert_eq!(workflow.store().channels_opened(), 0);
    assert_eq!(harness.transport.connect_count(), 0);
}

/// Scenario B: an acknowledgement opens exactly one channel for its id and
/// progress frames update the snapshot without changing the phase.
#[tokio::test(start_paused = true)]
async fn test_asynchronous_progress_updates_state() {
    let (session, frames) = Session::live();
    let harness = Harness::new(
        MockExecutionApi::accepting("exec-1"),
        ScriptedTransport::new(vec![session]),
    );
    let workflow = &harness.workflow;
    workflow.handle(open_image_op()).await;

    let outcome = workflow
        .handle(Op::Submit {
            form_input: lion_input(),
        })
        .await;
    assert_eq!(
        outcome,
        OpOutcome::Submitted(SubmissionOutcome::Accepted {
            execution_id: "exec-1".to_string()
        })
    );
    assert_eq!(workflow.store().channels_opened(), 1);
    assert_eq!(workflow.store().live_channel().as_deref(), Some("exec-1"));

    frames
        .send(Ok(
            r#"{"type":"progress","progress":50,"message":"halfway"}"#.to_string()
        ))
        .unwrap();
    settle().await;

    let state = workflow.snapshot();
    assert_eq!(state.progress.percentage, 50);
    assert_eq!(state.progress.message, "halfway");
    assert_eq!(state.phase, Phase::InProgress);
    assert_eq!(state.connection, Some(ConnectionStatus::Connected));
    assert_eq!(
        harness.transport.connections(),
        vec![("exec-1".to_string(), Verbosity::Normal)]
    );
}

#[tokio::test(start_paused = true)]
async fn test_terminal_progress_is_advisory() {
    let (session, frames) = Session::live();
    let harness = Harness::new(
        MockExecutionApi::accepting("exec-1"),
        ScriptedTransport::new(vec![session]),
    );
    let workflow = &harness.workflow;
    workflow.handle(open_image_op()).await;
    workflow
        .handle(Op::Submit {
            form_input: lion_input(),
        })
        .await;

    frames
        .send(Ok(
            r#"{"type":"progress","progress":100,"step":"finalizing"}"#.to_string(),
        ))
        .unwrap();
    settle().await;
    assert_eq!(workflow.snapshot().phase, Phase::InProgress);
    assert_eq!(workflow.snapshot().progress.percentage, 100);

    frames
        .send(Ok(
            r#"{"type":"completed","result":{"image_url":"https://x/z.png","library_id":"lib-2"}}"#
                .to_string(),
        ))
        .unwrap();
    settle().await;

    let state = workflow.snapshot();
    assert_eq!(state.phase, Phase::Result);
    let result = state.result.unwrap();
    assert_eq!(result.artifact_id, "exec-1");
    assert_eq!(result.data.library_id.as_deref(), Some("lib-2"));
    assert_eq!(workflow.store().live_channel(), None);
}

/// Scenario D: a network failure returns to the form with input intact.
#[tokio::test]
async fn test_network_failure_returns_to_form() {
    let harness = Harness::new(
        MockExecutionApi::failing("connection refused"),
        ScriptedTransport::idle(),
    );
    let workflow = &harness.workflow;
    workflow.handle(open_image_op()).await;

    let outcome = workflow
        .handle(Op::Submit {
            form_input: lion_input(),
        })
        .await;
    assert!(matches!(
        outcome,
        OpOutcome::Submitted(SubmissionOutcome::Failed(ref m)) if m.contains("connection refused")
    ));

    let state = workflow.snapshot();
    assert_failed_back_to_form(&state, &lion_input());
    assert_eq!(workflow.store().channels_opened(), 0);

    // The user can resubmit from the form
    let retry = workflow
        .handle(Op::Submit {
            form_input: lion_input(),
        })
        .await;
    assert!(matches!(retry, OpOutcome::Submitted(SubmissionOutcome::Failed(_))));
    assert_eq!(harness.api.request_count(), 2);
}

#[tokio::test]
async fn test_unmapped_agent_type_is_a_configuration_error() {
    let harness = Harness::new(
        MockExecutionApi::completing("https://x/y.png"),
        ScriptedTransport::idle(),
    );
    let workflow = &harness.workflow;
    workflow
        .handle(Op::Open {
            agent_type: "song_writer".into(),
            form_input: FormInput::new(),
            session_id: None,
        })
        .await;

    workflow
        .handle(Op::Submit {
            form_input: lion_input(),
        })
        .await;

    let state = workflow.snapshot();
    assert_failed_back_to_form(&state, &lion_input());
    assert!(state.error.unwrap().contains("song_writer"));
    assert_eq!(harness.api.request_count(), 0);
}

#[tokio::test]
async fn test_close_twice_is_idle() {
    let harness = Harness::new(
        MockExecutionApi::accepting("exec-1"),
        ScriptedTransport::idle(),
    );
    let workflow = &harness.workflow;
    workflow.handle(open_image_op()).await;
    workflow
        .handle(Op::Submit {
            form_input: lion_input(),
        })
        .await;

    workflow.handle(Op::Close).await;
    let once = workflow.snapshot();
    workflow.handle(Op::Close).await;

    assert_idle(&once);
    assert_eq!(workflow.snapshot(), once);
    assert_eq!(workflow.store().live_channel(), None);
}

#[tokio::test(start_paused = true)]
async fn test_reopen_replaces_channel() {
    let transport = ScriptedTransport::idle();
    let harness = Harness::new(MockExecutionApi::accepting("exec-1"), transport.clone());
    let workflow = &harness.workflow;

    workflow.handle(open_image_op()).await;
    workflow
        .handle(Op::Submit {
            form_input: lion_input(),
        })
        .await;
    assert_eq!(workflow.store().live_channel().as_deref(), Some("exec-1"));

    workflow.handle(open_image_op()).await;
    assert_eq!(workflow.store().live_channel(), None);
    assert_eq!(workflow.snapshot().phase, Phase::Form);
}

#[tokio::test(start_paused = true)]
async fn test_cancel_discards_late_acceptance() {
    let harness = Harness::new(
        MockExecutionApi::accepting("exec-1").with_delay(Duration::from_secs(1)),
        ScriptedTransport::idle(),
    );
    let workflow = std::sync::Arc::new(harness.workflow);
    workflow.handle(open_image_op()).await;

    let (tx, mut rx) = mpsc::channel(1);
    {
        let workflow = std::sync::Arc::clone(&workflow);
        tokio::spawn(async move {
            let outcome = workflow
                .handle(Op::Submit {
                    form_input: lion_input(),
                })
                .await;
            let _ = tx.send(outcome).await;
        });
    }

    settle().await;
    assert_eq!(workflow.snapshot().phase, Phase::InProgress);
    assert_eq!(workflow.handle(Op::Cancel).await, OpOutcome::Cancelled);
    assert_idle(&workflow.snapshot());

    let outcome = rx.recv().await.unwrap();
    assert_eq!(outcome, OpOutcome::Submitted(SubmissionOutcome::Superseded));
    assert_idle(&workflow.snapshot());
    assert_eq!(workflow.store().channels_opened(), 0);
}

#[tokio::test]
async fn test_subscribers_see_transitions() {
    let harness = Harness::new(
        MockExecutionApi::completing("https://x/y.png"),
        ScriptedTransport::idle(),
    );
    let workflow = &harness.workflow;
    let mut states = workflow.subscribe();

    workflow.handle(open_image_op()).await;
    assert!(states.has_changed().unwrap());
    assert_eq!(states.borrow_and_update().phase, Phase::Form);

    workflow
        .handle(Op::Submit {
            form_input: lion_input(),
        })
        .await;
    assert!(states.has_changed().unwrap());
    assert_eq!(states.borrow_and_update().phase, Phase::Result);
}
