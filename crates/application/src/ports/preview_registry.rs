//! Local preview URL port

use galleria_domain::SourceFile;

use crate::ApplicationResult;

/// Issues locally-scoped URLs that refer to in-memory files.
///
/// Preview URLs are never network-visible. Each one stays valid until it is
/// revoked.
pub trait PreviewUrlRegistry: Send + Sync {
    /// Registers `file` and returns a fresh, unique preview URL.
    ///
    /// # Errors
    ///
    /// Returns [`ApplicationError::Preview`](crate::ApplicationError::Preview)
    /// if the file cannot be registered.
    fn create(&self, file: &SourceFile) -> ApplicationResult<String>;

    /// Releases a preview URL. Unknown URLs are ignored.
    fn revoke(&self, url: &str);

    /// Returns the bytes behind a live preview URL.
    fn resolve(&self, url: &str) -> Option<Vec<u8>>;
}
