//! Persisted key-value state port

use async_trait::async_trait;
use thiserror::Error;

/// Well-known keys of the persisted client state.
pub mod keys {
    /// Current bearer token.
    pub const ACCESS_TOKEN: &str = "accessToken";
    /// Serialized current user.
    pub const USER: &str = "user";
    /// Image id to last-viewed timestamp.
    pub const IMAGE_VIEWS: &str = "image_views";
    /// Forum post id to last-viewed timestamp.
    pub const FORUM_VIEWS: &str = "forum_views";
}

/// Errors that can occur while accessing persisted state.
#[derive(Debug, Error)]
pub enum StorageError {
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization error.
    #[error("serialization error: {0}")]
    Serialization(String),
}

/// String key-value store that survives restarts.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Returns the value stored under `key`.
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Stores `value` under `key`.
    async fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Removes `key`. Removing a missing key is not an error.
    async fn remove(&self, key: &str) -> Result<(), StorageError>;
}
