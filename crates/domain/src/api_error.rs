//! Backend error envelope.

use serde::{Deserialize, Serialize};

/// Generic text shown when a failing response carries no usable message.
pub const GENERIC_SERVER_MESSAGE: &str = "A server error occurred.";

/// Error body returned by the gallery backend on failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiErrorBody {
    /// Application-specific error code, e.g. `IMAGE_NOT_FOUND`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_code: Option<String>,
    /// Human readable message.
    #[serde(default)]
    pub message: String,
    /// HTTP status echoed by the backend.
    #[serde(default)]
    pub status: u16,
    /// Server timestamp.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
}

impl ApiErrorBody {
    /// Message suitable for showing to the user.
    ///
    /// `[CODE] message` when a code is present, otherwise the message,
    /// otherwise a generic text.
    #[must_use]
    pub fn user_message(&self) -> String {
        match (&self.error_code, self.message.is_empty()) {
            (Some(code), _) => format!("[{code}] {}", self.message),
            (None, false) => self.message.clone(),
            (None, true) => GENERIC_SERVER_MESSAGE.to_string(),
        }
    }

    /// Fixed message for a known error code.
    #[must_use]
    pub fn message_for_code(code: &str) -> &'static str {
        match code {
            "FORUM_NOT_FOUND" => "The post could not be found.",
            "MEMBER_NOT_FOUND" => "The user could not be found.",
            "UNAUTHORIZED" => "Authentication is required.",
            "FORBIDDEN" => "You do not have permission.",
            "DUPLICATE_USERNAME" => "That username is already taken.",
            "DUPLICATE_DISPLAY_NAME" => "That display name is already taken.",
            "INVALID_PASSWORD" => "The password is incorrect.",
            "IMAGE_NOT_FOUND" => "The image could not be found.",
            _ => "An unknown error occurred.",
        }
    }
}
