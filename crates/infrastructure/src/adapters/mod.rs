//! Port implementations.

mod desktop_notifier;
mod preview_registry;
mod reqwest_client;
mod session_observer;
mod system_clock;
mod tungstenite_transport;

pub use desktop_notifier::TracingNotifier;
pub use preview_registry::InMemoryPreviewRegistry;
pub use reqwest_client::ReqwestHttpClient;
pub use session_observer::TracingSessionObserver;
pub use system_clock::SystemClock;
pub use tungstenite_transport::TungsteniteTransport;
