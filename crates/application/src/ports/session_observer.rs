//! Session lifecycle port

use galleria_domain::AuthError;

/// Why a session was ended by the client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TerminationReason {
    /// A protected request was attempted with no token at all.
    NotAuthenticated,
    /// The token could not be refreshed.
    RefreshFailed(AuthError),
}

impl TerminationReason {
    /// Message shown to the user.
    #[must_use]
    pub const fn user_message(&self) -> &'static str {
        "Your session has expired. Please log in again."
    }
}

/// Receives session-ending events, typically to navigate to the login page.
pub trait SessionObserver: Send + Sync {
    /// Called once after the session has been torn down.
    fn session_ended(&self, reason: &TerminationReason);
}
