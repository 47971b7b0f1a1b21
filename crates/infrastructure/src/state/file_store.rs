//! JSON-file key-value store.
//!
//! The whole state lives in one small JSON object, e.g.:
//! ```json
//! {
//!   "accessToken": "eyJ...",
//!   "image_views": "{\"12\":1700000000000}",
//!   "user": "{\"id\":7,\"username\":\"alice\"}"
//! }
//! ```
//! Values are strings; structured values are stored pre-serialized, the way
//! browser local storage holds them.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use galleria_application::ports::{KeyValueStore, StorageError};
use tokio::fs;
use tokio::sync::Mutex;
use tracing::warn;

/// Returns the platform default state file, e.g.
/// `~/.local/share/galleria/state.json`.
#[must_use]
pub fn default_state_file() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("galleria")
        .join("state.json")
}

/// [`KeyValueStore`] persisted to a JSON file.
///
/// Writes replace the file through a temporary sibling so a crash never
/// leaves a truncated file behind.
#[derive(Debug)]
pub struct FileKeyValueStore {
    path: PathBuf,
    cache: Mutex<Option<BTreeMap<String, String>>>,
}

impl FileKeyValueStore {
    /// Creates a store backed by `path`. The file is read lazily.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            cache: Mutex::new(None),
        }
    }

    /// The backing file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn load(&self) -> Result<BTreeMap<String, String>, StorageError> {
        match fs::read(&self.path).await {
            Ok(bytes) => match serde_json::from_slice(&bytes) {
                Ok(map) => Ok(map),
                Err(e) => {
                    warn!(path = %self.path.display(), error = %e, "State file is malformed, starting empty");
                    Ok(BTreeMap::new())
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(BTreeMap::new()),
            Err(e) => Err(StorageError::Io(e)),
        }
    }

    async fn save(&self, map: &BTreeMap<String, String>) -> Result<(), StorageError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).await?;
        }
        let mut json = serde_json::to_string_pretty(map)
            .map_err(|e| StorageError::Serialization(e.to_string()))?;
        json.push('\n');

        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, json).await?;
        fs::rename(&tmp, &self.path).await?;
        Ok(())
    }

    async fn update(
        &self,
        apply: impl FnOnce(&mut BTreeMap<String, String>) -> bool + Send,
    ) -> Result<(), StorageError> {
        let mut cache = self.cache.lock().await;
        if cache.is_none() {
            *cache = Some(self.load().await?);
        }
        let Some(map) = cache.as_mut() else {
            return Ok(());
        };
        if apply(map) {
            self.save(map).await?;
        }
        Ok(())
    }
}

#[async_trait]
impl KeyValueStore for FileKeyValueStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let mut cache = self.cache.lock().await;
        if cache.is_none() {
            *cache = Some(self.load().await?);
        }
        Ok(cache.as_ref().and_then(|map| map.get(key).cloned()))
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.update(|map| {
            map.insert(key.to_string(), value.to_string()).as_deref() != Some(value)
        })
        .await
    }

    async fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.update(|map| map.remove(key).is_some()).await
    }
}
