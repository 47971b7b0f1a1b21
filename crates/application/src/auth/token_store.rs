//! Persisted token storage.
//!
//! The token and user are cached in memory and written through to a
//! [`KeyValueStore`] so a restarted client can resume its session.

use std::sync::Arc;

use galleria_domain::{Credential, CurrentUser};
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::ports::{keys, KeyValueStore};
use crate::ApplicationResult;

/// Thread-safe store for the current access token and user.
#[derive(Clone)]
pub struct TokenStore {
    credential: Arc<RwLock<Option<Credential>>>,
    user: Arc<RwLock<Option<CurrentUser>>>,
    storage: Arc<dyn KeyValueStore>,
}

impl std::fmt::Debug for TokenStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenStore").finish_non_exhaustive()
    }
}

impl TokenStore {
    /// Creates an empty store backed by `storage`.
    #[must_use]
    pub fn new(storage: Arc<dyn KeyValueStore>) -> Self {
        Self {
            credential: Arc::new(RwLock::new(None)),
            user: Arc::new(RwLock::new(None)),
            storage,
        }
    }

    /// Loads the persisted token and user.
    ///
    /// A user entry that cannot be parsed clears the whole persisted session.
    ///
    /// # Errors
    ///
    /// Returns an error if persisted state cannot be read.
    pub async fn restore(&self) -> ApplicationResult<bool> {
        let token = self.storage.get(keys::ACCESS_TOKEN).await?;
        let raw_user = self.storage.get(keys::USER).await?;

        let user = match raw_user.as_deref().map(serde_json::from_str::<CurrentUser>) {
            Some(Ok(user)) => Some(user),
            Some(Err(e)) => {
                warn!(error = %e, "Persisted user is malformed, clearing session");
                self.clear().await?;
                return Ok(false);
            }
            None => None,
        };

        let credential = token.map(|token| {
            let credential = Credential::new(token);
            match &user {
                Some(user) => credential.owned_by(user),
                None => credential,
            }
        });
        let restored = credential.is_some();
        *self.credential.write().await = credential;
        *self.user.write().await = user;
        debug!(restored, "Session state restored");
        Ok(restored)
    }

    /// Returns the current access token.
    pub async fn access_token(&self) -> Option<String> {
        self.credential
            .read()
            .await
            .as_ref()
            .map(|c| c.access_token.clone())
    }

    /// Returns the current credential.
    pub async fn credential(&self) -> Option<Credential> {
        self.credential.read().await.clone()
    }

    /// Returns the signed-in user.
    pub async fn current_user(&self) -> Option<CurrentUser> {
        self.user.read().await.clone()
    }

    /// Returns true if a token is held.
    pub async fn is_authenticated(&self) -> bool {
        self.credential.read().await.is_some()
    }

    /// Replaces the access token, keeping the known owner.
    ///
    /// # Errors
    ///
    /// Returns an error if the token cannot be persisted. The in-memory
    /// token is updated regardless.
    pub async fn set_access_token(&self, token: &str) -> ApplicationResult<()> {
        {
            let user = self.user.read().await;
            let credential = Credential::new(token);
            *self.credential.write().await = Some(match user.as_ref() {
                Some(user) => credential.owned_by(user),
                None => credential,
            });
        }
        self.storage.set(keys::ACCESS_TOKEN, token).await?;
        Ok(())
    }

    /// Records the signed-in user.
    ///
    /// # Errors
    ///
    /// Returns an error if the user cannot be persisted.
    pub async fn set_user(&self, user: CurrentUser) -> ApplicationResult<()> {
        let raw = serde_json::to_string(&user)
            .map_err(|e| crate::ports::StorageError::Serialization(e.to_string()))?;
        if let Some(credential) = self.credential.write().await.as_mut() {
            credential.owner_user_id = Some(user.id);
            credential.owner_username = Some(user.username.clone());
        }
        *self.user.write().await = Some(user);
        self.storage.set(keys::USER, &raw).await?;
        Ok(())
    }

    /// Forgets the token and user, in memory and on disk.
    ///
    /// # Errors
    ///
    /// Returns an error if persisted state cannot be removed. Memory is
    /// cleared first either way.
    pub async fn clear(&self) -> ApplicationResult<()> {
        *self.credential.write().await = None;
        *self.user.write().await = None;
        self.storage.remove(keys::ACCESS_TOKEN).await?;
        self.storage.remove(keys::USER).await?;
        Ok(())
    }
}
