//! Client configuration.
//!
//! Every field has a default so a partial JSON document, or none at all,
//! yields a usable configuration.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{DomainError, DomainResult};
use crate::notification::{NotificationEndpoint, ReconnectPolicy, RegistrationTiming};

/// Runtime configuration for one client session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Base URL of the REST backend.
    pub api_base_url: String,
    /// Origin of the hosting page; scheme and host drive the socket URL.
    /// Falls back to `api_base_url` when unset.
    pub page_origin: Option<String>,
    /// Port of the notification service.
    pub ws_port: u16,
    /// Path of the notification socket.
    pub ws_path: String,
    /// Delay between reconnection attempts.
    pub reconnect_delay_ms: u64,
    /// Reconnection attempts before giving up.
    pub max_reconnect_attempts: u32,
    /// Delay between socket open and the registration message.
    pub register_delay_ms: u64,
    /// Delay before the single registration retry.
    pub register_retry_delay_ms: u64,
    /// Endpoints sent without credentials.
    pub public_endpoints: Vec<String>,
    /// File holding persisted client state. `None` selects the platform data dir.
    pub state_file: Option<PathBuf>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_base_url: "http://localhost:8080".to_string(),
            page_origin: None,
            ws_port: 8080,
            ws_path: "/ws/notify".to_string(),
            reconnect_delay_ms: 3000,
            max_reconnect_attempts: 5,
            register_delay_ms: 500,
            register_retry_delay_ms: 1000,
            public_endpoints: vec!["/api/logout".to_string()],
            state_file: None,
        }
    }
}

impl ClientConfig {
    /// Parses the API base URL.
    ///
    /// # Errors
    ///
    /// Returns [`DomainError::InvalidUrl`] if the URL is malformed.
    pub fn api_base(&self) -> DomainResult<Url> {
        Url::parse(&self.api_base_url)
            .map_err(|e| DomainError::InvalidUrl(format!("{e}: {}", self.api_base_url)))
    }

    /// Computes the notification socket endpoint.
    ///
    /// # Errors
    ///
    /// Returns [`DomainError::InvalidUrl`] if the origin cannot be parsed.
    pub fn notification_endpoint(&self) -> DomainResult<NotificationEndpoint> {
        let origin = self.page_origin.as_deref().unwrap_or(&self.api_base_url);
        let origin = Url::parse(origin)
            .map_err(|e| DomainError::InvalidUrl(format!("{e}: {origin}")))?;
        NotificationEndpoint::from_origin(&origin, self.ws_port, &self.ws_path)
    }

    /// Reconnection policy for the notification socket.
    #[must_use]
    pub const fn reconnect_policy(&self) -> ReconnectPolicy {
        ReconnectPolicy {
            delay: Duration::from_millis(self.reconnect_delay_ms),
            max_attempts: self.max_reconnect_attempts,
        }
    }

    /// Registration timing for the notification socket.
    #[must_use]
    pub const fn registration_timing(&self) -> RegistrationTiming {
        RegistrationTiming {
            delay: Duration::from_millis(self.register_delay_ms),
            retry_delay: Duration::from_millis(self.register_retry_delay_ms),
        }
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if a URL is malformed or the socket port is zero.
    pub fn validate(&self) -> DomainResult<()> {
        self.api_base()?;
        if self.ws_port == 0 {
            return Err(DomainError::InvalidConfig("ws_port must be non-zero".to_string()));
        }
        if !self.ws_path.starts_with('/') {
            return Err(DomainError::InvalidConfig(format!(
                "ws_path must start with '/': {}",
                self.ws_path
            )));
        }
        self.notification_endpoint().map(|_| ())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_defaults() {
        let config = ClientConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.reconnect_policy().max_attempts, 5);
        assert_eq!(config.registration_timing().delay, Duration::from_millis(500));
        assert_eq!(config.public_endpoints, vec!["/api/logout".to_string()]);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: ClientConfig =
            serde_json::from_str(r#"{"api_base_url":"https://gallery.example.com"}"#).unwrap();
        assert_eq!(config.ws_port, 8080);
        assert_eq!(
            config.notification_endpoint().unwrap().url.as_str(),
            "wss://gallery.example.com:8080/ws/notify"
        );
    }

    #[test]
    fn test_page_origin_overrides_base() {
        let config = ClientConfig {
            page_origin: Some("http://localhost:5173".to_string()),
            ws_port: 9000,
            ..ClientConfig::default()
        };
        assert_eq!(
            config.notification_endpoint().unwrap().url.as_str(),
            "ws://localhost:9000/ws/notify"
        );
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let config = ClientConfig {
            ws_port: 0,
            ..ClientConfig::default()
        };
        assert!(matches!(config.validate(), Err(DomainError::InvalidConfig(_))));

        let config = ClientConfig {
            api_base_url: "not a url".to_string(),
            ..ClientConfig::default()
        };
        assert!(matches!(config.validate(), Err(DomainError::InvalidUrl(_))));
    }
}
