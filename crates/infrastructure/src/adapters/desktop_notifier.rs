//! Terminal stand-in for platform notification popups.

use async_trait::async_trait;
use galleria_application::ports::{DesktopNotifier, NotificationPermission};
use tracing::info;

/// Shows popups as structured log events.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingNotifier;

#[async_trait]
impl DesktopNotifier for TracingNotifier {
    fn permission(&self) -> Option<NotificationPermission> {
        Some(NotificationPermission::Granted)
    }

    async fn request_permission(&self) -> NotificationPermission {
        NotificationPermission::Granted
    }

    fn show(&self, title: &str, body: &str) -> Result<(), String> {
        info!(target: "galleria::popup", %title, %body, "Notification");
        Ok(())
    }
}
