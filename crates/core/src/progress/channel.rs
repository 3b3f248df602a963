//! Reconnecting progress channel.
//!
//! A `ProgressChannel` owns one background task that connects to the
//! progress stream of a single execution, publishes the latest snapshot and
//! connection status, and forwards [`ChannelEvent`]s to its owner. When a
//! connection closes, exactly one reconnect is scheduled after the
//! configured delay. `teardown` cancels the pending reconnect and the open
//! connection; nothing fires afterwards.

use crate::config::models::{DEFAULT_MAX_RECONNECT_DELAY, DEFAULT_RECONNECT_DELAY};
use crate::progress::transport::ProgressTransport;
use af_protocol::execution_models::{ArtifactData, ProgressSnapshot};
use af_protocol::progress_models::{ChannelMessage, ConnectionStatus, Verbosity};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_stream::StreamExt;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Cap on the backoff exponent.
const MAX_BACKOFF_DOUBLINGS: u32 = 16;

/// What the channel reports to its owner.
#[derive(Debug, Clone, PartialEq)]
pub enum ChannelEvent {
    Status(ConnectionStatus),
    Progress(ProgressSnapshot),
    Completed(ArtifactData),
    Failed(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelSettings {
    pub verbosity: Verbosity,
    pub reconnect_delay: Duration,

    /// Double the delay after each consecutive failed connection attempt.
    pub backoff: bool,

    pub max_reconnect_delay: Duration,
}

impl Default for ChannelSettings {
    fn default() -> Self {
        Self {
            verbosity: Verbosity::default(),
            reconnect_delay: DEFAULT_RECONNECT_DELAY,
            backoff: false,
            max_reconnect_delay: DEFAULT_MAX_RECONNECT_DELAY,
        }
    }
}

impl ChannelSettings {
    /// Delay before the next reconnect, given the number of consecutive
    /// failed connection attempts.
    pub fn reconnect_delay_for(&self, consecutive_failures: u32) -> Duration {
        if !self.backoff || consecutive_failures <= 1 {
            return self.reconnect_delay;
        }
        let doublings = (consecutive_failures - 1).min(MAX_BACKOFF_DOUBLINGS);
        self.reconnect_delay
            .saturating_mul(1 << doublings)
            .min(self.max_reconnect_delay)
    }
}

/// Progress stream of one execution.
pub struct ProgressChannel {
    execution_id: String,
    snapshot: watch::Receiver<ProgressSnapshot>,
    status: watch::Receiver<ConnectionStatus>,
    reconnects: Arc<AtomicUsize>,
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

impl ProgressChannel {
    /// Start connecting to the progress stream of `execution_id`.
    ///
    /// Must be called from within a tokio runtime.
    pub fn open(
        execution_id: impl Into<String>,
        transport: Arc<dyn ProgressTransport>,
        settings: ChannelSettings,
        events_tx: mpsc::Sender<ChannelEvent>,
    ) -> Self {
        let execution_id = execution_id.into();
        let (snapshot_tx, snapshot) = watch::channel(ProgressSnapshot::default());
        let (status_tx, status) = watch::channel(ConnectionStatus::Connecting);
        let reconnects = Arc::new(AtomicUsize::new(0));
        let cancel = CancellationToken::new();

        let driver = ChannelDriver {
            execution_id: execution_id.clone(),
            transport,
            settings,
            snapshot_tx,
            status_tx,
            events_tx,
            reconnects: Arc::clone(&reconnects),
            cancel: cancel.clone(),
        };
        let task = tokio::spawn(driver.run());

        debug!(execution_id = %execution_id, "Progress channel opened");

        Self {
            execution_id,
            snapshot,
            status,
            reconnects,
            cancel,
            task,
        }
    }

    pub fn execution_id(&self) -> &str {
        &self.execution_id
    }

    /// Latest progress snapshot.
    pub fn snapshot(&self) -> ProgressSnapshot {
        self.snapshot.borrow().clone()
    }

    pub fn connection_status(&self) -> ConnectionStatus {
        *self.status.borrow()
    }

    pub fn subscribe_progress(&self) -> watch::Receiver<ProgressSnapshot> {
        self.snapshot.clone()
    }

    pub fn subscribe_status(&self) -> watch::Receiver<ConnectionStatus> {
        self.status.clone()
    }

    /// Number of reconnects scheduled so far.
    pub fn reconnect_attempts(&self) -> usize {
        self.reconnects.load(Ordering::SeqCst)
    }

    pub fn is_torn_down(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Cancel any pending reconnect and close the open connection.
    /// Idempotent.
    pub fn teardown(&self) {
        if self.cancel.is_cancelled() {
            return;
        }
        self.cancel.cancel();
        self.task.abort();
        debug!(execution_id = %self.execution_id, "Progress channel torn down");
    }
}

impl Drop for ProgressChannel {
    fn drop(&mut self) {
        self.teardown();
    }
}

struct ChannelDriver {
    execution_id: String,
    transport: Arc<dyn ProgressTransport>,
    settings: ChannelSettings,
    snapshot_tx: watch::Sender<ProgressSnapshot>,
    status_tx: watch::Sender<ConnectionStatus>,
    events_tx: mpsc::Sender<ChannelEvent>,
    reconnects: Arc<AtomicUsize>,
    cancel: CancellationToken,
}

impl ChannelDriver {
    async fn run(self) {
        let mut consecutive_failures: u32 = 0;

        loop {
            self.set_status(ConnectionStatus::Connecting).await;

            let connected = tokio::select! {
                _ = self.cancel.cancelled() => return,
                result = self.transport.connect(&self.execution_id, self.settings.verbosity) => result,
            };

            match connected {
                Ok(mut frames) => {
                    consecutive_failures = 0;
                    self.set_status(ConnectionStatus::Connected).await;
                    info!(execution_id = %self.execution_id, "Progress channel connected");

                    loop {
                        let next = tokio::select! {
                            _ = self.cancel.cancelled() => return,
                            next = frames.next() => next,
                        };

                        match next {
                            Some(Ok(text)) => self.handle_frame(&text).await,
                            Some(Err(e)) => {
                                warn!(execution_id = %self.execution_id, error = %e, "Progress channel error");
                                self.set_status(ConnectionStatus::Error).await;
                                break;
                            }
                            None => break,
                        }
                    }
                }
                Err(e) => {
                    consecutive_failures = consecutive_failures.saturating_add(1);
                    warn!(execution_id = %self.execution_id, error = %e, "Progress channel connection failed");
                    self.set_status(ConnectionStatus::Error).await;
                }
            }

            if self.cancel.is_cancelled() {
                return;
            }

            // Connection closed: schedule exactly one reconnect
            let delay = self.settings.reconnect_delay_for(consecutive_failures);
            self.reconnects.fetch_add(1, Ordering::SeqCst);
            self.set_status(ConnectionStatus::Connecting).await;
            info!(
                execution_id = %self.execution_id,
                delay = ?delay,
                "Progress channel closed, reconnect scheduled"
            );

            tokio::select! {
                _ = self.cancel.cancelled() => return,
                _ = tokio::time::sleep(delay) => {}
            }
        }
    }

    /// Handle one inbound text frame. Malformed frames are logged and
    /// dropped; they never change the connection status.
    async fn handle_frame(&self, text: &str) {
        let message = match ChannelMessage::parse(text) {
            Ok(message) => message,
            Err(e) => {
                warn!(execution_id = %self.execution_id, error = %e, "Ignoring malformed progress frame");
                return;
            }
        };

        if message.is_terminal_progress() {
            debug!(
                execution_id = %self.execution_id,
                "Terminal progress received, awaiting explicit completion"
            );
        }

        if let Some(snapshot) = message.snapshot() {
            self.snapshot_tx.send_replace(snapshot.clone());
            self.emit(ChannelEvent::Progress(snapshot)).await;
            return;
        }

        match message {
            ChannelMessage::Completed { result } => {
                self.emit(ChannelEvent::Completed(result)).await;
            }
            ChannelMessage::Error { message } => {
                self.emit(ChannelEvent::Failed(message)).await;
            }
            ChannelMessage::Progress { .. } | ChannelMessage::Other => {
                debug!(execution_id = %self.execution_id, "Ignoring unhandled progress frame");
            }
        }
    }

    async fn set_status(&self, status: ConnectionStatus) {
        let changed = self.status_tx.send_if_modified(|current| {
            if *current == status {
                false
            } else {
                *current = status;
                true
            }
        });
        if changed {
            self.emit(ChannelEvent::Status(status)).await;
        }
    }

    async fn emit(&self, event: ChannelEvent) {
        // The owner may already be gone
        let _ = self.events_tx.send(event).await;
    }
}
