//! Scripted progress transport for testing.

use crate::progress::transport::{ChannelError, FrameStream, ProgressTransport};
use af_protocol::progress_models::Verbosity;
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::mpsc;

/// What one connection attempt does.
pub enum Session {
    /// The connection attempt fails.
    Refuse(String),

    /// Emit the frames, then close the connection.
    Close(Vec<Result<String, ChannelError>>),

    /// Emit the frames, then stay open without further traffic.
    Hold(Vec<Result<String, ChannelError>>),

    /// Forward frames pushed by the test; closes when the sender drops.
    Live(mpsc::UnboundedReceiver<Result<String, ChannelError>>),
}

impl Session {
    /// A live session and the sender that feeds it.
    pub fn live() -> (Self, mpsc::UnboundedSender<Result<String, ChannelError>>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self::Live(rx), tx)
    }
}

/// Plays back one [`Session`] per connection attempt, in order. Once the
/// script runs out every further attempt holds an idle connection.
#[derive(Clone)]
pub struct ScriptedTransport {
    sessions: Arc<Mutex<VecDeque<Session>>>,
    connections: Arc<Mutex<Vec<(String, Verbosity)>>>,
}

impl ScriptedTransport {
    pub fn new(sessions: Vec<Session>) -> Self {
        Self {
            sessions: Arc::new(Mutex::new(sessions.into())),
            connections: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// A transport whose connections stay open and silent.
    pub fn idle() -> Self {
        Self::new(Vec::new())
    }

    /// Queue another session behind the scripted ones.
    pub fn push(&self, session: Session) {
        self.sessions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push_back(session);
    }

    /// Execution ids and verbosity of every connection attempt so far.
    pub fn connections(&self) -> Vec<(String, Verbosity)> {
        self.connections
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn connect_count(&self) -> usize {
        self.connections
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

#[async_trait]
impl ProgressTransport for ScriptedTransport {
    async fn connect(
        &self,
        execution_id: &str,
        verbosity: Verbosity,
    ) -> Result<FrameStream, ChannelError> {
        self.connections
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((execution_id.to_string(), verbosity));

        let session = self
            .sessions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front()
            .unwrap_or(Session::Hold(Vec::new()));

        let stream: FrameStream = match session {
            Session::Refuse(reason) => return Err(ChannelError::Connect(reason)),
            Session::Close(frames) => Box::pin(async_stream::stream! {
                for frame in frames {
                    yield frame;
                }
            }),
            Session::Hold(frames) => Box::pin(async_stream::stream! {
                for frame in frames {
                    yield frame;
                }
                std::future::pending::<()>().await;
            }),
            Session::Live(mut rx) => Box::pin(async_stream::stream! {
                while let Some(frame) = rx.recv().await {
                    yield frame;
                }
            }),
        };
        Ok(stream)
    }
}
