//! HTTP Client port

use async_trait::async_trait;
use galleria_domain::{RequestSpec, ResponseSpec};
use thiserror::Error;

/// Errors raised before an HTTP response is received.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum HttpClientError {
    /// The URL could not be parsed.
    #[error("invalid URL: {0}")]
    InvalidUrl(String),

    /// The request timed out.
    #[error("request timed out")]
    Timeout,

    /// The connection could not be established.
    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    /// Any other transport failure.
    #[error("{0}")]
    Other(String),
}

/// Port for executing raw HTTP requests.
///
/// Implementations send the request exactly as given. Credentials, retries
/// and refresh handling live above this port.
#[async_trait]
pub trait HttpClient: Send + Sync {
    /// Executes an HTTP request and returns the response, whatever its status.
    ///
    /// # Errors
    ///
    /// Returns an error if no response could be obtained.
    async fn execute(&self, request: RequestSpec) -> Result<ResponseSpec, HttpClientError>;
}
