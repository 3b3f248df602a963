use af_protocol::*;
use serde_json::json;

#[test]
fn test_execution_state_default_is_idle() {
    let state = ExecutionState::default();

    assert_eq!(state.phase, Phase::Idle);
    assert!(state.is_idle());
    assert!(state.form_input.is_empty());
    assert!(state.execution_id.is_none());
    assert!(state.result.is_none());
    assert!(state.error.is_none());
    assert!(state.progress.is_empty());
}

#[test]
fn test_execution_state_serialization() {
    let mut form_input = FormInput::new();
    form_input.insert("description".to_string(), json!("lion for biology class"));

    let mut state = ExecutionState::opened(
        AgentType::new("image_generation"),
        form_input,
        Some("session-1".to_string()),
    );
    state.phase = Phase::InProgress;
    state.execution_id = Some("exec-1".to_string());
    state.connection = Some(ConnectionStatus::Connected);
    state.progress = ProgressSnapshot {
        percentage: 40,
        message: "sketching".to_string(),
        current_step: "render".to_string(),
    };

    let value = serde_json::to_value(&state).expect("Failed to serialize ExecutionState");
    assert_eq!(value["phase"], "IN_PROGRESS");
    assert_eq!(value["agentType"], "image_generation");
    assert_eq!(value["executionId"], "exec-1");
    assert_eq!(value["sessionId"], "session-1");
    assert_eq!(value["connection"], "CONNECTED");
    assert_eq!(value["progress"]["currentStep"], "render");
    assert!(value.get("result").is_none());

    let deserialized: ExecutionState =
        serde_json::from_value(value).expect("Failed to deserialize ExecutionState");
    assert_eq!(deserialized, state);
}

#[test]
fn test_result_serialization_uses_camel_case() {
    let result = ExecutionResult {
        artifact_id: "exec-1".to_string(),
        data: ArtifactData {
            image_url: "https://x/y.png".to_string(),
            title: Some("Lion".to_string()),
            ..ArtifactData::default()
        },
        metadata: ResultMetadata {
            execution_id: Some("exec-1".to_string()),
            completed_at: chrono::Utc::now(),
        },
    };

    let value = serde_json::to_value(&result).expect("Failed to serialize ExecutionResult");
    assert_eq!(value["artifactId"], "exec-1");
    assert_eq!(value["data"]["imageUrl"], "https://x/y.png");
    assert_eq!(value["metadata"]["executionId"], "exec-1");
    assert!(value["data"].get("libraryId").is_none());
}

#[test]
fn test_execute_request_serialization() {
    let mut context = FormInput::new();
    context.insert("description".to_string(), json!("lion"));

    let request = ExecuteRequest {
        execution_identifier: "generate_image".to_string(),
        serialized_input: serde_json::to_string(&context).unwrap(),
        context,
        session_id: None,
        confirm_execution: true,
    };

    let value = serde_json::to_value(&request).expect("Failed to serialize ExecuteRequest");
    assert_eq!(
        value,
        json!({
            "executionIdentifier": "generate_image",
            "serializedInput": "{\"description\":\"lion\"}",
            "context": { "description": "lion" },
            "confirmExecution": true
        })
    );
}

#[test]
fn test_phase_serialization() {
    let json = serde_json::to_value(Phase::InProgress).expect("Failed to serialize Phase");
    assert_eq!(json, "IN_PROGRESS");

    let deserialized: Phase = serde_json::from_value(json).expect("Failed to deserialize Phase");
    assert_eq!(deserialized, Phase::InProgress);
    assert_eq!(Phase::Result.to_string(), "result");
}

#[test]
fn test_op_enum_serialization() {
    let op: Op = serde_json::from_value(json!({
        "type": "open",
        "payload": {
            "agent_type": "image_generation",
            "form_input": { "description": "lion" }
        }
    }))
    .expect("Failed to deserialize Op::Open");

    match op {
        Op::Open {
            agent_type,
            form_input,
            session_id,
        } => {
            assert_eq!(agent_type.as_str(), "image_generation");
            assert_eq!(form_input["description"], "lion");
            assert!(session_id.is_none());
        }
        other => panic!("Wrong variant: {other:?}"),
    }

    let json = serde_json::to_value(&Op::Continue).expect("Failed to serialize Op::Continue");
    assert_eq!(json["type"], "continue");
}

#[test]
fn test_channel_message_round_trip_tags() {
    let message = ChannelMessage::Error {
        message: "model crashed".to_string(),
    };
    let value = serde_json::to_value(&message).expect("Failed to serialize ChannelMessage");
    assert_eq!(value, json!({"type": "error", "message": "model crashed"}));

    let completed = ChannelMessage::parse(
        r#"{"type":"completed","result":{"image_url":"https://x/z.png","library_id":"lib-9"}}"#,
    )
    .expect("Failed to parse completed frame");
    assert!(matches!(
        completed,
        ChannelMessage::Completed { result } if result.image_url == "https://x/z.png" && result.library_id.as_deref() == Some("lib-9")
    ));
}
