//! Rolling view history.
//!
//! Maps an entity id to the last time it was viewed (milliseconds since the
//! Unix epoch). Entries older than [`VIEW_WINDOW_HOURS`] are pruned so a
//! view is counted at most once per day per entity.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Length of the rolling window.
pub const VIEW_WINDOW_HOURS: i64 = 24;

/// Entity id to last-viewed timestamp.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ViewHistory {
    entries: BTreeMap<i64, i64>,
}

impl ViewHistory {
    /// Creates an empty history.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses the persisted form. Missing or malformed input yields an empty history.
    #[must_use]
    pub fn parse(raw: Option<&str>) -> Self {
        raw.and_then(|s| serde_json::from_str(s).ok())
            .unwrap_or_default()
    }

    /// Serializes to the persisted form.
    #[must_use]
    pub fn to_json(&self) -> String {
        // A map of integers always serializes.
        serde_json::to_string(&self.entries).unwrap_or_else(|_| "{}".to_string())
    }

    /// Drops entries outside the window ending at `now` and returns the ids kept.
    pub fn prune(&mut self, now: DateTime<Utc>) -> BTreeSet<i64> {
        let window_ms = Duration::hours(VIEW_WINDOW_HOURS).num_milliseconds();
        let now_ms = now.timestamp_millis();
        self.entries.retain(|_, viewed_at| now_ms - *viewed_at < window_ms);
        self.ids()
    }

    /// Stamps `id` as viewed at `now`.
    pub fn record(&mut self, id: i64, now: DateTime<Utc>) {
        self.entries.insert(id, now.timestamp_millis());
    }

    /// Ids currently recorded.
    #[must_use]
    pub fn ids(&self) -> BTreeSet<i64> {
        self.entries.keys().copied().collect()
    }

    /// Returns the last-viewed time of `id`, if recorded.
    #[must_use]
    pub fn viewed_at(&self, id: i64) -> Option<i64> {
        self.entries.get(&id).copied()
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if there are no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_prune_keeps_recent_entries() {
        let now = Utc::now();
        let mut history = ViewHistory::new();
        history.record(1, now - Duration::hours(25));
        history.record(2, now - Duration::hours(1));

        let kept = history.prune(now);

        assert_eq!(kept.into_iter().collect::<Vec<_>>(), vec![2]);
        assert_eq!(history.len(), 1);
        assert!(history.viewed_at(1).is_none());
    }

    #[test]
    fn test_parse_malformed_is_empty() {
        assert!(ViewHistory::parse(Some("{not json")).is_empty());
        assert!(ViewHistory::parse(Some("[1,2]")).is_empty());
        assert!(ViewHistory::parse(None).is_empty());
    }

    #[test]
    fn test_persisted_form_uses_string_keys() {
        let history = ViewHistory::parse(Some(r#"{"12":1700000000000}"#));
        assert_eq!(history.viewed_at(12), Some(1_700_000_000_000));
        assert_eq!(history.to_json(), r#"{"12":1700000000000}"#);
    }
}
