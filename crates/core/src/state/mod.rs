//! Execution state: pure transitions and the store that owns them.

pub mod execution;
pub mod store;

pub use execution::{TransitionError, TransitionResult};
pub use store::{ExecutionStore, RunHandle, LOCAL_EXECUTION_PREFIX};
