//! Backend API port

use async_trait::async_trait;
use galleria_domain::{RequestSpec, ResponseSpec};

use crate::ApplicationResult;

/// Port for calls to the gallery backend.
///
/// Unlike [`HttpClient`](super::HttpClient), an `ApiClient` is expected to
/// manage credentials on the caller's behalf.
#[async_trait]
pub trait ApiClient: Send + Sync {
    /// Sends a request to the backend.
    ///
    /// # Errors
    ///
    /// Returns an error on transport failure or unrecoverable authorization failure.
    async fn send(&self, request: RequestSpec) -> ApplicationResult<ResponseSpec>;
}
