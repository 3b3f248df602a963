//! Progress transport trait and supporting types.

use af_protocol::progress_models::Verbosity;
use async_trait::async_trait;
use std::pin::Pin;
use thiserror::Error;
use tokio_stream::Stream;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ChannelError {
    #[error("Failed to connect progress channel: {0}")]
    Connect(String),
    #[error("Progress channel read failed: {0}")]
    Read(String),
}

/// Text frames of one connection. The stream ends when the connection
/// closes; an `Err` item reports a failure right before the close.
pub type FrameStream = Pin<Box<dyn Stream<Item = Result<String, ChannelError>> + Send>>;

/// Opens streaming connections scoped to one execution id.
#[async_trait]
pub trait ProgressTransport: Send + Sync {
    async fn connect(
        &self,
        execution_id: &str,
        verbosity: Verbosity,
    ) -> Result<FrameStream, ChannelError>;
}
