//! Notification socket types.
//!
//! Connection state, inbound notification payloads and the outbound
//! registration message exchanged with the notification service.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use url::Url;

use crate::error::{DomainError, DomainResult};

/// Kind of the acknowledgement the server sends after registration.
pub const REGISTERED_KIND: &str = "registered";

/// Kind assigned to payloads that are not JSON objects.
pub const TEXT_KIND: &str = "text";

/// Notification socket connection state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    /// Not connected and not trying to.
    #[default]
    Disconnected,
    /// Connection in progress.
    Connecting,
    /// Connected and ready.
    Connected,
    /// Waiting out the delay before the next attempt.
    Reconnecting,
    /// Gave up after the configured number of attempts.
    Exhausted,
}

impl ConnectionState {
    /// Check if the connection is active.
    #[must_use]
    pub const fn is_connected(&self) -> bool {
        matches!(self, Self::Connected)
    }

    /// Get a human-readable status string.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Disconnected => "Disconnected",
            Self::Connecting => "Connecting...",
            Self::Connected => "Connected",
            Self::Reconnecting => "Reconnecting...",
            Self::Exhausted => "Reconnection attempts exhausted",
        }
    }
}

/// Socket URL derived from the page origin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationEndpoint {
    /// Full `ws://` or `wss://` URL.
    pub url: Url,
}

impl NotificationEndpoint {
    /// Builds the endpoint: `wss` for `https` origins, `ws` otherwise,
    /// the origin's host, the given port and path.
    ///
    /// # Errors
    ///
    /// Returns [`DomainError::InvalidUrl`] if the origin has no host.
    pub fn from_origin(origin: &Url, port: u16, path: &str) -> DomainResult<Self> {
        let scheme = if origin.scheme() == "https" { "wss" } else { "ws" };
        let host = origin
            .host_str()
            .ok_or_else(|| DomainError::InvalidUrl(format!("origin has no host: {origin}")))?;
        let raw = format!("{scheme}://{host}:{port}{path}");
        let url = Url::parse(&raw).map_err(|e| DomainError::InvalidUrl(format!("{e}: {raw}")))?;
        Ok(Self { url })
    }
}

/// Fixed-delay, bounded reconnection policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconnectPolicy {
    /// Delay before each attempt.
    pub delay: Duration,
    /// Attempts allowed after a close before giving up.
    pub max_attempts: u32,
}

impl ReconnectPolicy {
    /// Returns true if another attempt may be scheduled after `attempts_made`.
    #[must_use]
    pub const fn allows(&self, attempts_made: u32) -> bool {
        attempts_made < self.max_attempts
    }
}

/// Timing of the registration message after a socket opens.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegistrationTiming {
    /// Delay after open before registering.
    pub delay: Duration,
    /// Delay before the single retry when the socket was not open.
    pub retry_delay: Duration,
}

/// Outbound message binding a connection to a user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterMessage {
    /// Always `"register"`.
    #[serde(rename = "type")]
    pub kind: String,
    /// Member id.
    pub user_id: i64,
    /// Username, when known.
    pub username: Option<String>,
}

impl RegisterMessage {
    /// Creates a registration message.
    #[must_use]
    pub fn new(user_id: i64, username: Option<String>) -> Self {
        Self {
            kind: "register".to_string(),
            user_id,
            username,
        }
    }
}

/// An inbound notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    /// The `type` field of the payload.
    pub kind: String,
    /// Text to show the user.
    pub message: String,
    /// Full payload as received (or synthesized for plain text).
    pub payload: Value,
}

impl Notification {
    /// Parses a raw socket frame.
    ///
    /// JSON objects are taken as-is. Anything else, including malformed
    /// JSON, becomes `{ "message": <raw>, "type": "text" }`.
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        match serde_json::from_str::<Value>(raw) {
            Ok(Value::Object(map)) => {
                let kind = map
                    .get("type")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string();
                let message = match map.get("message") {
                    Some(Value::String(s)) => s.clone(),
                    Some(other) if !other.is_null() => other.to_string(),
                    _ => raw.to_string(),
                };
                Self {
                    kind,
                    message,
                    payload: Value::Object(map),
                }
            }
            _ => Self::text(raw),
        }
    }

    /// Wraps plain text as a notification.
    #[must_use]
    pub fn text(raw: &str) -> Self {
        Self {
            kind: TEXT_KIND.to_string(),
            message: raw.to_string(),
            payload: serde_json::json!({ "message": raw, "type": TEXT_KIND }),
        }
    }

    /// Returns true for the server's registration acknowledgement.
    #[must_use]
    pub fn is_registered_ack(&self) -> bool {
        self.kind == REGISTERED_KIND
    }
}
