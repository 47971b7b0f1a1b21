//! Request body types

use serde::{Deserialize, Serialize};

/// Body of an outgoing request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RequestBody {
    /// No body.
    #[default]
    None,
    /// A JSON document, sent as `application/json`.
    Json(serde_json::Value),
    /// Raw bytes with an explicit content type (direct storage transfers).
    Bytes {
        /// MIME type sent as `Content-Type`.
        content_type: String,
        /// Raw payload.
        data: Vec<u8>,
    },
}

impl RequestBody {
    /// Returns the content type implied by this body, if any.
    #[must_use]
    pub fn content_type(&self) -> Option<&str> {
        match self {
            Self::None => None,
            Self::Json(_) => Some("application/json"),
            Self::Bytes { content_type, .. } => Some(content_type),
        }
    }

    /// Returns true when there is no body.
    #[must_use]
    pub const fn is_none(&self) -> bool {
        matches!(self, Self::None)
    }
}
