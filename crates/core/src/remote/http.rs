//! HTTP implementation of the execution API.

use crate::config::ControllerConfig;
use crate::remote::base::{ApiError, ExecutionApi};
use af_protocol::api_models::{ExecuteRequest, ExecuteResponse};
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use tracing::debug;

/// Path of the execute endpoint, relative to the API base URL.
pub const EXECUTE_PATH: &str = "/agents/execute";

/// Calls the execute endpoint over HTTP with a JSON body.
pub struct HttpExecutionApi {
    client: Client,
    endpoint: String,
    auth_token: Option<String>,
}

impl HttpExecutionApi {
    /// Create a client for the API rooted at `base_url`.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Transport` if the HTTP client cannot be built.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ApiError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ApiError::Transport(e.to_string()))?;

        Ok(Self {
            client,
            endpoint: format!("{}{EXECUTE_PATH}", base_url.trim_end_matches('/')),
            auth_token: None,
        })
    }

    pub fn from_config(config: &ControllerConfig) -> Result<Self, ApiError> {
        let api = Self::new(&config.api_base_url, config.timing.request_timeout())?;
        Ok(match &config.auth_token {
            Some(token) => api.with_auth_token(token.clone()),
            None => api,
        })
    }

    /// Send `Authorization: Bearer <token>` with every request.
    pub fn with_auth_token(mut self, token: String) -> Self {
        self.auth_token = Some(token);
        self
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl ExecutionApi for HttpExecutionApi {
    async fn execute(&self, request: &ExecuteRequest) -> Result<ExecuteResponse, ApiError> {
        debug!(
            endpoint = %self.endpoint,
            execution_identifier = %request.execution_identifier,
            "Calling execute endpoint"
        );

        let mut builder = self.client.post(&self.endpoint).json(request);
        if let Some(token) = &self.auth_token {
            builder = builder.bearer_auth(token);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| ApiError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ApiError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let body = response
            .text()
            .await
            .map_err(|e| ApiError::Transport(e.to_string()))?;

        serde_json::from_str(&body).map_err(|e| ApiError::Decode(e.to_string()))
    }
}
