//! Port definitions (interfaces)
//!
//! Ports define the boundaries between the application core and external systems.
//! Each port is a trait that can be implemented by adapters in the infrastructure layer.

mod api_client;
mod clock;
mod desktop_notifier;
mod http_client;
mod key_value_store;
mod notification_transport;
mod preview_registry;
mod session_observer;

pub use api_client::ApiClient;
pub use clock::Clock;
pub use desktop_notifier::{DesktopNotifier, NotificationPermission};
pub use http_client::{HttpClient, HttpClientError};
pub use key_value_store::{keys, KeyValueStore, StorageError};
pub use notification_transport::{NotificationTransport, SocketChannel, SocketEvent, TransportError};
pub use preview_registry::PreviewUrlRegistry;
pub use session_observer::{SessionObserver, TerminationReason};
