//! Authentication domain types

mod types;

pub use types::{AuthError, Credential, CurrentUser, LoginRequest, TokenResponse};
