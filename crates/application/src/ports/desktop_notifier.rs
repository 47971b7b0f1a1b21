//! Platform notification popup port

use async_trait::async_trait;

/// Permission to show platform notifications.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationPermission {
    /// Popups may be shown.
    Granted,
    /// The user refused popups.
    Denied,
    /// Not decided yet; a request may be made.
    Default,
}

/// Shows platform notification popups.
#[async_trait]
pub trait DesktopNotifier: Send + Sync {
    /// Current permission, or `None` when the platform has no popups.
    fn permission(&self) -> Option<NotificationPermission>;

    /// Asks the user for permission.
    async fn request_permission(&self) -> NotificationPermission;

    /// Shows a popup.
    ///
    /// # Errors
    ///
    /// Returns a description of the failure; callers treat it as non-fatal.
    fn show(&self, title: &str, body: &str) -> Result<(), String>;
}
