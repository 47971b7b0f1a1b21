//! Session-ended reporting.

use galleria_application::ports::{SessionObserver, TerminationReason};
use tracing::warn;

/// Reports ended sessions in the log.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSessionObserver;

impl SessionObserver for TracingSessionObserver {
    fn session_ended(&self, reason: &TerminationReason) {
        warn!(?reason, "{}", reason.user_message());
    }
}
