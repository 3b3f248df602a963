//! # af-core
//!
//! Agent execution lifecycle controller for agentflow.
//!
//! This crate provides:
//! - An explicit execution state machine with a subscribable store
//! - Submission of generative tasks to a remote execution endpoint, with
//!   synchronous and asynchronous completion paths
//! - A reconnecting progress channel scoped to one execution
//! - A leading-edge action gate and the completion side effects it guards
//!
//! ## Modules
//!
//! - [`config`]: Configuration loading and named timing constants
//! - [`remote`]: Execution API trait, HTTP client and agent type lookup
//! - [`progress`]: Progress transports and the reconnecting channel
//! - [`state`]: State transitions and the execution store
//! - [`submission`]: Submission orchestrator
//! - [`completion`]: Action gate, record store and completion coordinator
//! - [`workflow`]: The assembled controller

pub mod completion;
pub mod config;
pub mod progress;
pub mod remote;
pub mod state;
pub mod submission;
pub mod workflow;

pub use workflow::{AgentWorkflow, OpOutcome};
