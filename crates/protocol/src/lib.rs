//! # af-protocol
//!
//! State and wire definitions for agentflow.
//!
//! This crate defines all shared data structures used for:
//! - The execution state the UI renders from
//! - The remote execute endpoint
//! - The progress channel frames
//! - Chat records written when the user continues from a result
//! - Commands sent from the UI to the controller
//!
//! ## Modules
//!
//! - [`execution_models`]: Phase, progress, result and workflow state
//! - [`api_models`]: Execute request/response and response classification
//! - [`progress_models`]: Progress channel frames and connection status
//! - [`record_models`]: Chat records, record metadata and destinations
//! - [`ipc`]: Operations sent from the UI
//!
//! ## Design Principles
//!
//! - Minimal dependencies: only serde, ts-rs and chrono
//! - TypeScript generation: all types derive `TS` for the UI layer
//! - Independent compilation: no dependencies on other agentflow crates

pub mod api_models;
pub mod execution_models;
pub mod ipc;
pub mod progress_models;
pub mod record_models;

// Re-export all public types for convenience
pub use api_models::*;
pub use execution_models::*;
pub use ipc::*;
pub use progress_models::*;
pub use record_models::*;
