//! Authentication types for the bearer-token session.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Access token plus the identity of the user who owns it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credential {
    /// The bearer access token.
    pub access_token: String,
    /// Owning user id, once known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner_user_id: Option<i64>,
    /// Owning username, once known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner_username: Option<String>,
}

impl Credential {
    /// Creates a credential whose owner is not yet known.
    #[must_use]
    pub fn new(access_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            owner_user_id: None,
            owner_username: None,
        }
    }

    /// Attaches the owning user.
    #[must_use]
    pub fn owned_by(mut self, user: &CurrentUser) -> Self {
        self.owner_user_id = Some(user.id);
        self.owner_username = Some(user.username.clone());
        self
    }

    /// Returns a short preview of the token for logs (first 8 chars + ...).
    #[must_use]
    pub fn token_preview(&self) -> String {
        let token = &self.access_token;
        match token.char_indices().nth(8) {
            Some((idx, _)) if token.len() > 12 => format!("{}...", &token[..idx]),
            _ => token.clone(),
        }
    }
}

/// The signed-in user as returned by `/api/members/userinfo`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CurrentUser {
    /// Member id.
    pub id: i64,
    /// Login name.
    pub username: String,
    /// Email address.
    #[serde(default)]
    pub email: String,
    /// Display name shown in the forum.
    #[serde(default)]
    pub display_name: String,
    /// Profile picture URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile_image: Option<String>,
    /// Whether the account is premium.
    #[serde(default)]
    pub is_premium: bool,
    /// Granted roles.
    #[serde(default)]
    pub role_set: Vec<String>,
}

/// Body of `POST /api/login/jwt`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginRequest {
    /// Login name.
    pub username: String,
    /// Plain password, sent over TLS.
    pub password: String,
}

/// Body returned by the login and refresh endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenResponse {
    /// Newly issued access token.
    pub access_token: String,
}

/// Authentication errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    /// No access token exists in this client context.
    #[error("not authenticated")]
    NotAuthenticated,

    /// A protected request was still rejected after one refresh-and-retry.
    #[error("request to {url} is unauthorized")]
    Unauthorized {
        /// URL of the rejected request.
        url: String,
    },

    /// The refresh endpoint refused to issue a token.
    #[error("token refresh rejected with status {status}")]
    RefreshRejected {
        /// Status returned by the refresh endpoint.
        status: u16,
    },

    /// The refresh call failed before a response was received.
    #[error("failed to refresh token: {message}")]
    RefreshFailed {
        /// Error description.
        message: String,
    },

    /// Login was refused or could not complete.
    #[error("login failed: {message}")]
    LoginFailed {
        /// Error description.
        message: String,
    },
}
