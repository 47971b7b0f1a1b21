//! Authentication module for the Galleria client.
//!
//! This module provides:
//! - Persisted token and user storage
//! - Single-flight token refresh with queued waiters
//! - The authenticated request pipeline
//! - Login, logout and session termination

mod pipeline;
mod refresh;
mod session;
mod token_store;

pub use pipeline::{AuthenticatedClient, EndpointPolicy, LOGIN_ENDPOINT, REFRESH_ENDPOINT};
pub use refresh::{HttpTokenRefresher, RefreshCoordinator, SessionTerminator, TokenRefresher};
pub use session::{SessionService, LOGOUT_ENDPOINT, USER_INFO_ENDPOINT};
pub use token_store::TokenStore;
