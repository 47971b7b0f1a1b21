//! Galleria Infrastructure - Adapters and implementations
//!
//! This crate provides concrete implementations of the ports
//! defined in the application layer.

pub mod adapters;
pub mod config;
pub mod state;

pub use adapters::{
    InMemoryPreviewRegistry, ReqwestHttpClient, SystemClock, TracingNotifier,
    TracingSessionObserver, TungsteniteTransport,
};
pub use config::{load_config, ConfigError};
pub use state::{default_state_file, FileKeyValueStore};
