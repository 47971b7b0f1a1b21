//! Configuration loading.
//!
//! Precedence, lowest to highest: built-in defaults, the JSON config file
//! (if given), `GALLERIA_*` environment variables.

use std::path::{Path, PathBuf};

use galleria_domain::{ClientConfig, DomainError};
use thiserror::Error;
use tracing::debug;

/// Overrides the REST base URL.
pub const ENV_API_BASE_URL: &str = "GALLERIA_API_BASE_URL";
/// Overrides the page origin used for the socket URL.
pub const ENV_PAGE_ORIGIN: &str = "GALLERIA_PAGE_ORIGIN";
/// Overrides the notification service port.
pub const ENV_WS_PORT: &str = "GALLERIA_WS_PORT";
/// Overrides the state file location.
pub const ENV_STATE_FILE: &str = "GALLERIA_STATE_FILE";

/// Errors loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The config file could not be read.
    #[error("failed to read {path}: {source}")]
    Read {
        /// File path.
        path: PathBuf,
        /// Underlying error.
        source: std::io::Error,
    },

    /// The config file is not valid JSON for [`ClientConfig`].
    #[error("failed to parse {path}: {message}")]
    Parse {
        /// File path.
        path: PathBuf,
        /// Parser message.
        message: String,
    },

    /// An environment variable has an unusable value.
    #[error("invalid value for {name}: {value}")]
    InvalidEnv {
        /// Variable name.
        name: &'static str,
        /// Offending value.
        value: String,
    },

    /// The resulting configuration is invalid.
    #[error(transparent)]
    Invalid(#[from] DomainError),
}

/// Loads configuration from `file` and the process environment.
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed, or the result
/// fails validation.
pub async fn load_config(file: Option<&Path>) -> Result<ClientConfig, ConfigError> {
    let config = match file {
        Some(path) => {
            let raw = tokio::fs::read_to_string(path)
                .await
                .map_err(|source| ConfigError::Read {
                    path: path.to_path_buf(),
                    source,
                })?;
            serde_json::from_str(&raw).map_err(|e| ConfigError::Parse {
                path: path.to_path_buf(),
                message: e.to_string(),
            })?
        }
        None => ClientConfig::default(),
    };

    let config = apply_env(config, |name| std::env::var(name).ok())?;
    config.validate()?;
    debug!(api = %config.api_base_url, ws_port = config.ws_port, "Configuration loaded");
    Ok(config)
}

/// Applies `GALLERIA_*` overrides read through `lookup`.
///
/// # Errors
///
/// Returns [`ConfigError::InvalidEnv`] for a non-numeric port.
pub fn apply_env(
    mut config: ClientConfig,
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<ClientConfig, ConfigError> {
    if let Some(url) = lookup(ENV_API_BASE_URL) {
        config.api_base_url = url;
    }
    if let Some(origin) = lookup(ENV_PAGE_ORIGIN) {
        config.page_origin = Some(origin);
    }
    if let Some(port) = lookup(ENV_WS_PORT) {
        config.ws_port = port.parse().map_err(|_| ConfigError::InvalidEnv {
            name: ENV_WS_PORT,
            value: port,
        })?;
    }
    if let Some(path) = lookup(ENV_STATE_FILE) {
        config.state_file = Some(PathBuf::from(path));
    }
    Ok(config)
}
