//! In-memory preview URL registry.

use std::collections::HashMap;

use galleria_application::ports::PreviewUrlRegistry;
use galleria_application::ApplicationResult;
use galleria_domain::SourceFile;
use parking_lot::Mutex;
use uuid::Uuid;

const SCHEME_PREFIX: &str = "blob:galleria/";

/// Keeps staged file bytes in memory under `blob:galleria/<uuid>` URLs.
#[derive(Debug, Default)]
pub struct InMemoryPreviewRegistry {
    files: Mutex<HashMap<String, Vec<u8>>>,
}

impl InMemoryPreviewRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live preview URLs.
    #[must_use]
    pub fn live_count(&self) -> usize {
        self.files.lock().len()
    }
}

impl PreviewUrlRegistry for InMemoryPreviewRegistry {
    fn create(&self, file: &SourceFile) -> ApplicationResult<String> {
        let url = format!("{SCHEME_PREFIX}{}", Uuid::now_v7());
        self.files.lock().insert(url.clone(), file.data.clone());
        Ok(url)
    }

    fn revoke(&self, url: &str) {
        self.files.lock().remove(url);
    }

    fn resolve(&self, url: &str) -> Option<Vec<u8>> {
        self.files.lock().get(url).cloned()
    }
}
