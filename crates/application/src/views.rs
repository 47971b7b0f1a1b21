//! Per-entity view tracking with a rolling 24-hour window.
//!
//! A view is reported at most once per entity per window. The history is
//! persisted and pruned every time a tracker is initialized.

use std::collections::BTreeSet;
use std::sync::Arc;

use galleria_domain::ViewHistory;
use parking_lot::Mutex;
use tracing::debug;

use crate::ports::{keys, Clock, KeyValueStore};
use crate::ApplicationResult;

/// Which view history a tracker maintains.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewKind {
    /// Gallery images.
    Image,
    /// Forum posts.
    Forum,
}

impl ViewKind {
    /// Storage key of this history.
    #[must_use]
    pub const fn storage_key(self) -> &'static str {
        match self {
            Self::Image => keys::IMAGE_VIEWS,
            Self::Forum => keys::FORUM_VIEWS,
        }
    }
}

/// Tracks which entities were viewed within the window.
pub struct ViewTracker {
    kind: ViewKind,
    storage: Arc<dyn KeyValueStore>,
    clock: Arc<dyn Clock>,
    history: Mutex<ViewHistory>,
}

impl ViewTracker {
    /// Loads and prunes the persisted history, writing the pruned form back.
    ///
    /// # Errors
    ///
    /// Returns an error if persisted state cannot be read or written.
    pub async fn init(
        kind: ViewKind,
        storage: Arc<dyn KeyValueStore>,
        clock: Arc<dyn Clock>,
    ) -> ApplicationResult<Self> {
        let raw = storage.get(kind.storage_key()).await?;
        let mut history = ViewHistory::parse(raw.as_deref());
        let kept = history.prune(clock.now());
        storage.set(kind.storage_key(), &history.to_json()).await?;
        debug!(?kind, kept = kept.len(), "View history loaded");

        Ok(Self {
            kind,
            storage,
            clock,
            history: Mutex::new(history),
        })
    }

    /// Returns true if `id` was viewed within the window.
    #[must_use]
    pub fn has_viewed(&self, id: i64) -> bool {
        self.history.lock().viewed_at(id).is_some()
    }

    /// Records a view of `id`.
    ///
    /// Returns true if this is the first view in the window, i.e. the one
    /// that should be counted.
    ///
    /// # Errors
    ///
    /// Returns an error if the history cannot be persisted.
    pub async fn record_view(&self, id: i64) -> ApplicationResult<bool> {
        let raw = {
            let mut history = self.history.lock();
            if history.viewed_at(id).is_some() {
                return Ok(false);
            }
            history.record(id, self.clock.now());
            history.to_json()
        };
        self.storage.set(self.kind.storage_key(), &raw).await?;
        Ok(true)
    }

    /// Ids viewed within the window.
    #[must_use]
    pub fn viewed_ids(&self) -> BTreeSet<i64> {
        self.history.lock().ids()
    }
}
