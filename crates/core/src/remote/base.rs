//! Execution API trait and supporting types.

use af_protocol::api_models::{ExecuteRequest, ExecuteResponse};
use async_trait::async_trait;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    #[error("Request failed: {0}")]
    Transport(String),
    #[error("Execution endpoint returned {status}: {body}")]
    Status { status: u16, body: String },
    #[error("Failed to decode execution response: {0}")]
    Decode(String),
}

/// The remote side that runs generative tasks.
///
/// `execute` resolves once the remote side either produced the artifact or
/// accepted the request for asynchronous processing.
#[async_trait]
pub trait ExecutionApi: Send + Sync {
    async fn execute(&self, request: &ExecuteRequest) -> Result<ExecuteResponse, ApiError>;
}
