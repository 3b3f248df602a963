//! Execution state store.
//!
//! `ExecutionStore` is the single owner of [`ExecutionState`]. All changes
//! go through its transition methods; observers subscribe to a watch
//! channel. The store also owns the live [`ProgressChannel`]: one is opened
//! whenever an execution id is accepted, and it is torn down when the id is
//! replaced, the run reaches `Result` or fails, or the workflow is opened
//! again or closed.

use crate::progress::channel::{ChannelEvent, ChannelSettings, ProgressChannel};
use crate::progress::transport::ProgressTransport;
use crate::state::execution::{self, TransitionResult};
use af_protocol::execution_models::{
    AgentType, ExecutionResult, ExecutionState, FormInput, Phase, ProgressSnapshot, ResultMetadata,
};
use af_protocol::progress_models::ConnectionStatus;
use chrono::Utc;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Prefix of execution ids synthesized when the remote side accepts a
/// request without returning one.
pub const LOCAL_EXECUTION_PREFIX: &str = "local-";

const CHANNEL_EVENT_BUFFER: usize = 64;

struct LiveChannel {
    channel: ProgressChannel,
    pump: JoinHandle<()>,
}

impl LiveChannel {
    fn teardown(self) {
        self.channel.teardown();
        self.pump.abort();
    }
}

struct StoreInner {
    state: watch::Sender<ExecutionState>,
    transport: Arc<dyn ProgressTransport>,
    channel_settings: ChannelSettings,
    live: Mutex<Option<LiveChannel>>,
    channels_opened: AtomicUsize,
    next_run: AtomicU64,
}

/// Shared handle to the execution state. Cloning is cheap.
#[derive(Clone)]
pub struct ExecutionStore {
    inner: Arc<StoreInner>,
}

impl ExecutionStore {
    /// Create an idle store.
    ///
    /// # Arguments
    ///
    /// * `transport` - Opens progress connections for accepted executions
    /// * `channel_settings` - Verbosity and reconnect policy for those channels
    pub fn new(transport: Arc<dyn ProgressTransport>, channel_settings: ChannelSettings) -> Self {
        let (state, _) = watch::channel(ExecutionState::default());
        Self {
            inner: Arc::new(StoreInner {
                state,
                transport,
                channel_settings,
                live: Mutex::new(None),
                channels_opened: AtomicUsize::new(0),
                next_run: AtomicU64::new(1),
            }),
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<ExecutionState> {
        self.inner.state.subscribe()
    }

    /// Copy of the current state.
    pub fn snapshot(&self) -> ExecutionState {
        self.inner.state.borrow().clone()
    }

    pub fn phase(&self) -> Phase {
        self.inner.state.borrow().phase
    }

    pub fn execution_id(&self) -> Option<String> {
        self.inner.state.borrow().execution_id.clone()
    }

    /// Number of progress channels constructed over the store's lifetime.
    pub fn channels_opened(&self) -> usize {
        self.inner.channels_opened.load(Ordering::SeqCst)
    }

    /// Execution id of the live progress channel, if any.
    pub fn live_channel(&self) -> Option<String> {
        self.live()
            .as_ref()
            .map(|live| live.channel.execution_id().to_string())
    }

    /// Open the workflow for `agent_type` in the `Form` phase.
    pub fn open(&self, agent_type: AgentType, form_input: FormInput, session_id: Option<String>) {
        let mut live = self.live();
        self.inner.state.send_modify(|state| {
            execution::open(state, agent_type.clone(), form_input, session_id)
        });
        teardown_live(&mut live);
        debug!(agent_type = %agent_type, "Workflow opened");
    }

    /// Reset to `Idle` and tear down the live channel. Idempotent.
    pub fn close(&self) {
        let mut live = self.live();
        let changed = self.inner.state.send_if_modified(execution::close);
        teardown_live(&mut live);
        if changed {
            debug!("Workflow closed");
        }
    }

    /// Record the submitted input and move `Form -> InProgress`.
    ///
    /// # Returns
    ///
    /// A [`RunHandle`] for applying the outcome of this submission.
    ///
    /// # Errors
    ///
    /// Returns `TransitionError::InvalidPhase` when the workflow is not in
    /// `Form`. The state is left untouched.
    pub fn begin_submission(&self, form_input: FormInput) -> TransitionResult<RunHandle> {
        let run = self.inner.next_run.fetch_add(1, Ordering::SeqCst);
        let mut outcome = Ok(());
        self.inner.state.send_if_modified(|state| {
            outcome = execution::begin_submission(state, form_input, run);
            outcome.is_ok()
        });
        outcome?;

        debug!(run, "Submission started");
        Ok(RunHandle {
            store: self.clone(),
            run,
        })
    }

    /// Set the execution id of the in-flight run and open its progress
    /// channel. Ignored unless `InProgress`.
    pub fn accept_execution_id(&self, execution_id: impl Into<String>) -> bool {
        self.accept(None, execution_id.into())
    }

    /// Accept a run the remote side gave no id for. A local id is
    /// synthesized so the run can be cancelled; no channel is opened.
    pub fn accept_untracked_execution(&self) -> Option<String> {
        self.accept_untracked(None)
    }

    /// Store a result delivered with the remote response and move to
    /// `Result`.
    pub fn complete_synchronously(&self, result: ExecutionResult) -> bool {
        self.complete(None, result)
    }

    /// Overwrite the progress snapshot. No phase change.
    pub fn apply_progress(&self, snapshot: ProgressSnapshot) -> bool {
        self.inner
            .state
            .send_if_modified(|state| execution::apply_progress(state, snapshot))
    }

    /// Record a failure; `InProgress` returns to `Form` with input kept.
    pub fn fail(&self, message: impl Into<String>) -> bool {
        self.fail_run(None, message.into())
    }

    fn live(&self) -> MutexGuard<'_, Option<LiveChannel>> {
        self.inner.live.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Apply `f` if `run` is still current. Returns `None` when stale.
    fn transition(
        &self,
        run: Option<u64>,
        f: impl FnOnce(&mut ExecutionState) -> bool,
    ) -> Option<bool> {
        let mut applied = None;
        self.inner.state.send_if_modified(|state| {
            if run.is_some_and(|run| state.run != run || state.phase != Phase::InProgress) {
                return false;
            }
            let changed = f(state);
            applied = Some(changed);
            changed
        });
        applied
    }

    fn accept(&self, run: Option<u64>, execution_id: String) -> bool {
        let mut live = self.live();
        let accepted = self.transition(run, |state| {
            let changed = execution::accept_execution_id(state, execution_id.clone());
            if changed {
                execution::set_connection(state, Some(ConnectionStatus::Connecting));
            }
            changed
        });
        if accepted != Some(true) {
            return false;
        }

        teardown_live(&mut live);
        *live = Some(self.open_channel(&execution_id));
        info!(execution_id = %execution_id, "Execution accepted, tracking progress");
        true
    }

    fn accept_untracked(&self, run: Option<u64>) -> Option<String> {
        let execution_id = format!("{LOCAL_EXECUTION_PREFIX}{}", Uuid::new_v4());
        let accepted = self.transition(run, |state| {
            let changed = execution::accept_execution_id(state, execution_id.clone());
            if changed {
                execution::set_connection(state, None);
            }
            changed
        });
        if accepted != Some(true) {
            return None;
        }
        warn!(
            execution_id = %execution_id,
            "Execution accepted without an id, progress cannot be tracked"
        );
        Some(execution_id)
    }

    fn complete(&self, run: Option<u64>, result: ExecutionResult) -> bool {
        let mut live = self.live();
        let completed = self.transition(run, |state| execution::complete(state, result));
        if completed != Some(true) {
            return false;
        }
        teardown_live(&mut live);
        true
    }

    fn fail_run(&self, run: Option<u64>, message: String) -> bool {
        let mut live = self.live();
        let failed = self.transition(run, |state| execution::fail(state, message));
        if failed != Some(true) {
            return false;
        }
        teardown_live(&mut live);
        true
    }

    fn open_channel(&self, execution_id: &str) -> LiveChannel {
        let (events_tx, mut events_rx) = mpsc::channel(CHANNEL_EVENT_BUFFER);
        let channel = ProgressChannel::open(
            execution_id,
            Arc::clone(&self.inner.transport),
            self.inner.channel_settings,
            events_tx,
        );
        self.inner.channels_opened.fetch_add(1, Ordering::SeqCst);

        let store = Arc::downgrade(&self.inner);
        let id = execution_id.to_string();
        let pump = tokio::spawn(async move {
            while let Some(event) = events_rx.recv().await {
                let Some(inner) = Weak::upgrade(&store) else {
                    break;
                };
                ExecutionStore { inner }.apply_channel_event(&id, event);
            }
        });

        LiveChannel { channel, pump }
    }

    /// Fold one channel event into the state, unless the channel's
    /// execution is no longer current.
    fn apply_channel_event(&self, execution_id: &str, event: ChannelEvent) {
        let current = {
            let state = self.inner.state.borrow();
            state.phase == Phase::InProgress && state.execution_id.as_deref() == Some(execution_id)
        };
        if !current {
            debug!(execution_id = %execution_id, "Discarding event for stale execution");
            return;
        }

        match event {
            ChannelEvent::Status(status) => {
                self.inner.state.send_if_modified(|state| {
                    execution::set_connection(state, Some(status))
                });
            }
            ChannelEvent::Progress(snapshot) => {
                self.apply_progress(snapshot);
            }
            ChannelEvent::Completed(data) => {
                let result = ExecutionResult {
                    artifact_id: execution_id.to_string(),
                    data,
                    metadata: ResultMetadata {
                        execution_id: Some(execution_id.to_string()),
                        completed_at: Utc::now(),
                    },
                };
                if self.complete(None, result) {
                    info!(execution_id = %execution_id, "Execution completed via progress channel");
                }
            }
            ChannelEvent::Failed(message) => {
                warn!(execution_id = %execution_id, error = %message, "Remote execution failed");
                self.fail_run(None, message);
            }
        }
    }
}

fn teardown_live(live: &mut Option<LiveChannel>) {
    if let Some(channel) = live.take() {
        channel.teardown();
    }
}

/// One submission's view of the store.
///
/// Transitions applied through a handle are discarded once its run is no
/// longer current, so a response that arrives after the workflow was
/// closed, cancelled or resubmitted cannot overwrite newer state.
#[derive(Clone)]
pub struct RunHandle {
    store: ExecutionStore,
    run: u64,
}

impl RunHandle {
    pub fn run(&self) -> u64 {
        self.run
    }

    /// True while the store is still `InProgress` for this run.
    pub fn is_current(&self) -> bool {
        let state = self.store.inner.state.borrow();
        state.run == self.run && state.phase == Phase::InProgress
    }

    pub fn accept_execution_id(&self, execution_id: impl Into<String>) -> bool {
        let execution_id = execution_id.into();
        let applied = self.store.accept(Some(self.run), execution_id.clone());
        if !applied {
            self.discarded("acceptance", Some(&execution_id));
        }
        applied
    }

    pub fn accept_untracked(&self) -> Option<String> {
        let execution_id = self.store.accept_untracked(Some(self.run));
        if execution_id.is_none() {
            self.discarded("acceptance", None);
        }
        execution_id
    }

    pub fn complete_synchronously(&self, result: ExecutionResult) -> bool {
        let applied = self.store.complete(Some(self.run), result);
        if !applied {
            self.discarded("result", None);
        }
        applied
    }

    pub fn fail(&self, message: impl Into<String>) -> bool {
        let applied = self.store.fail_run(Some(self.run), message.into());
        if !applied {
            self.discarded("failure", None);
        }
        applied
    }

    fn discarded(&self, what: &str, execution_id: Option<&str>) {
        info!(
            run = self.run,
            execution_id = execution_id.unwrap_or_default(),
            "Discarding late {what} for a run that is no longer current"
        );
    }
}
