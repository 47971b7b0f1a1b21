//! Clock port

use chrono::{DateTime, Utc};

/// Source of the current time.
///
/// View history windows are computed against this so tests can pin the clock.
pub trait Clock: Send + Sync {
    /// Returns the current UTC timestamp.
    fn now(&self) -> DateTime<Utc>;
}
