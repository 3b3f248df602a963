//! Mock execution API for testing.

use crate::remote::base::{ApiError, ExecutionApi};
use af_protocol::api_models::{ExecuteRequest, ExecuteResponse, RemoteStatus};
use async_trait::async_trait;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

/// Answers every request with the same scripted reply and records the
/// requests it received.
#[derive(Clone)]
pub struct MockExecutionApi {
    reply: Result<ExecuteResponse, ApiError>,
    delay: Option<Duration>,
    requests: Arc<Mutex<Vec<ExecuteRequest>>>,
}

impl MockExecutionApi {
    pub fn new(reply: Result<ExecuteResponse, ApiError>) -> Self {
        Self {
            reply,
            delay: None,
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Synchronous completion with the given image URL.
    pub fn completing(image_url: &str) -> Self {
        Self::new(Ok(ExecuteResponse {
            image_url: Some(image_url.to_string()),
            ..ExecuteResponse::default()
        }))
    }

    /// Asynchronous acknowledgement with the given execution id.
    pub fn accepting(execution_id: &str) -> Self {
        Self::new(Ok(ExecuteResponse {
            execution_id: Some(execution_id.to_string()),
            status: Some(RemoteStatus::Running),
            ..ExecuteResponse::default()
        }))
    }

    /// Network failure.
    pub fn failing(message: &str) -> Self {
        Self::new(Err(ApiError::Transport(message.to_string())))
    }

    /// Wait before replying.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn requests(&self) -> Vec<ExecuteRequest> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn request_count(&self) -> usize {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

#[async_trait]
impl ExecutionApi for MockExecutionApi {
    async fn execute(&self, request: &ExecuteRequest) -> Result<ExecuteResponse, ApiError> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(request.clone());

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        self.reply.clone()
    }
}
