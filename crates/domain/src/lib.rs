//! Galleria Domain - Core client types
//!
//! This crate defines the domain model for the Galleria gallery and forum client.
//! All types here are pure Rust with no I/O dependencies.

pub mod api_error;
pub mod auth;
pub mod config;
pub mod error;
pub mod notification;
pub mod request;
pub mod response;
pub mod upload;
pub mod view_history;

pub use api_error::ApiErrorBody;
pub use auth::{AuthError, Credential, CurrentUser, LoginRequest, TokenResponse};
pub use config::ClientConfig;
pub use error::{DomainError, DomainResult};
pub use notification::{
    ConnectionState, Notification, NotificationEndpoint, ReconnectPolicy, RegisterMessage,
    RegistrationTiming, REGISTERED_KIND, TEXT_KIND,
};
pub use request::{Header, Headers, HttpMethod, RequestBody, RequestSpec};
pub use response::{ResponseSpec, StatusCode};
pub use upload::{
    AssetUploadRecord, DisplayMetadata, ImageGrade, ImageUploadEntry, PresignedUpload,
    SourceFile, Tag, UrlMapping,
};
pub use view_history::{ViewHistory, VIEW_WINDOW_HOURS};
