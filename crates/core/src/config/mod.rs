//! Configuration loading and management.
//!
//! This module provides the controller configuration, the named timing
//! constants it defaults to, and the loader for `.agentflow/config.toml`.

pub mod error;
pub mod loader;
pub mod models;

pub use error::{ConfigError, ConfigResult};
pub use loader::load_config;
pub use models::*;
