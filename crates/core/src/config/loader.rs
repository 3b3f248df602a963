//! Configuration file loader for the `.agentflow/` directory.
//!
//! The controller reads a single optional file, `.agentflow/config.toml`.
//! A missing directory or file yields the built-in defaults; nothing is
//! read from the environment.

use crate::config::error::{ConfigError, ConfigResult};
use crate::config::models::ControllerConfig;
use std::path::Path;

/// Name of the configuration directory under the project root.
pub const CONFIG_DIR: &str = ".agentflow";

/// Name of the configuration file inside [`CONFIG_DIR`].
pub const CONFIG_FILE: &str = "config.toml";

/// Loads the controller configuration under `root`.
///
/// # Arguments
///
/// * `root` - Root directory containing the `.agentflow/` folder
///
/// # Errors
///
/// Returns `ConfigError` if the file exists but cannot be read, is not
/// valid TOML, or holds values that fail validation.
///
/// # Example
///
/// ```rust,no_run
/// use af_core::config::loader::load_config;
/// use std::path::Path;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let config = load_config(Path::new(".")).await?;
/// println!("Reconnecting after {:?}", config.timing.reconnect_delay());
/// # Ok(())
/// # }
/// ```
pub async fn load_config(root: &Path) -> ConfigResult<ControllerConfig> {
    let config_path = root.join(CONFIG_DIR).join(CONFIG_FILE);

    if !config_path.exists() {
        return Ok(ControllerConfig::default());
    }

    let content = tokio::fs::read_to_string(&config_path)
        .await
        .map_err(|source| ConfigError::FileRead {
            path: config_path.clone(),
            source,
        })?;

    parse_config(&content, &config_path)
}

/// Parses and validates configuration text. `path` is only used in errors.
pub fn parse_config(content: &str, path: &Path) -> ConfigResult<ControllerConfig> {
    let config: ControllerConfig =
        toml::from_str(content).map_err(|source| ConfigError::TomlParse {
            path: path.to_path_buf(),
            source,
        })?;

    config
        .validate()
        .map_err(|reason| ConfigError::InvalidConfig {
            path: path.to_path_buf(),
            reason,
        })?;

    Ok(config)
}
