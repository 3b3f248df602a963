//! Remote execution endpoint.
//!
//! This module provides the `ExecutionApi` trait (Adapter Pattern), its
//! HTTP and mock implementations, and the agent type lookup table.

pub mod base;
pub mod http;
pub mod mock;
pub mod registry;

pub use base::{ApiError, ExecutionApi};
pub use http::HttpExecutionApi;
pub use mock::MockExecutionApi;
pub use registry::ExecutionRegistry;
