//! Leading-edge rate limiter for user-triggered actions.

use crate::config::models::DEFAULT_ACTION_COOLDOWN;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Runs the first call of a burst and drops every call that arrives within
/// `cooldown` of it, or while an admitted action is still running. Dropped
/// calls are not queued.
pub struct ActionGate {
    cooldown: Duration,
    last_fired: Mutex<Option<Instant>>,
    running: AtomicBool,
    cancel: CancellationToken,
}

/// Clears the running flag when the admitted action ends or is dropped.
struct RunningGuard<'a>(&'a AtomicBool);

impl Drop for RunningGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

impl ActionGate {
    pub fn new(cooldown: Duration) -> Self {
        Self {
            cooldown,
            last_fired: Mutex::new(None),
            running: AtomicBool::new(false),
            cancel: CancellationToken::new(),
        }
    }

    pub fn cooldown(&self) -> Duration {
        self.cooldown
    }

    /// Claim the gate. Returns false if the call must be dropped.
    pub fn try_acquire(&self) -> bool {
        if self.cancel.is_cancelled() {
            debug!("Action gate cancelled, dropping call");
            return false;
        }

        let now = Instant::now();
        let mut last_fired = self
            .last_fired
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if let Some(last) = *last_fired {
            if now.duration_since(last) < self.cooldown {
                debug!(
                    cooldown = ?self.cooldown,
                    "Action gate dropping call within cooldown"
                );
                return false;
            }
        }
        *last_fired = Some(now);
        true
    }

    /// Run `action` if the gate admits this call.
    ///
    /// # Returns
    ///
    /// `None` when the call was dropped, or when the gate was cancelled
    /// before `action` finished.
    pub async fn run<F, T>(&self, action: F) -> Option<T>
    where
        F: Future<Output = T>,
    {
        if self.running.swap(true, Ordering::SeqCst) {
            debug!("Action gate dropping call while the previous action runs");
            return None;
        }
        let _running = RunningGuard(&self.running);

        if !self.try_acquire() {
            return None;
        }
        tokio::select! {
            _ = self.cancel.cancelled() => None,
            output = action => Some(output),
        }
    }

    /// Permanently close the gate; later calls are dropped.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

impl Default for ActionGate {
    fn default() -> Self {
        Self::new(DEFAULT_ACTION_COOLDOWN)
    }
}
