//! Notification socket client.

mod client;

pub use client::{NotificationClient, SessionSnapshot};
