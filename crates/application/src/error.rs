//! Application error types

use galleria_domain::{ApiErrorBody, AuthError, DomainError, ResponseSpec};
use thiserror::Error;

use crate::ports::{HttpClientError, StorageError, TransportError};

/// Application-level errors.
#[derive(Debug, Error)]
pub enum ApplicationError {
    /// A domain validation error occurred.
    #[error("domain error: {0}")]
    Domain(#[from] DomainError),

    /// An HTTP request failed before a response arrived.
    #[error("HTTP error: {0}")]
    Http(#[from] HttpClientError),

    /// Authentication failed or the session ended.
    #[error("auth error: {0}")]
    Auth(#[from] AuthError),

    /// The backend answered with a non-success status.
    #[error("API error ({status}): {message}")]
    Api {
        /// HTTP status.
        status: u16,
        /// User-facing message derived from the error body.
        message: String,
    },

    /// Persisted client state could not be read or written.
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    /// The notification socket failed.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// A local preview URL could not be created.
    #[error("preview error: {0}")]
    Preview(String),

    /// Object storage rejected a direct transfer.
    #[error("transfer of '{filename}' failed with status {status}")]
    TransferFailed {
        /// File being transferred.
        filename: String,
        /// Status returned by storage.
        status: u16,
    },

    /// Metadata was requested for a file that was never uploaded.
    #[error("'{filename}' has not been uploaded yet")]
    NotCommitted {
        /// File without a permanent URL.
        filename: String,
    },
}

impl ApplicationError {
    /// Builds an [`ApplicationError::Api`] from a failing response.
    #[must_use]
    pub fn from_response(response: &ResponseSpec) -> Self {
        let message = response.api_error().map_or_else(
            || response.status.reason_phrase().to_string(),
            |body: ApiErrorBody| body.user_message(),
        );
        Self::Api {
            status: response.status.as_u16(),
            message,
        }
    }
}

/// Result type alias for application operations.
pub type ApplicationResult<T> = Result<T, ApplicationError>;

/// Passes successful responses through and turns the rest into errors.
///
/// # Errors
///
/// Returns [`ApplicationError::Api`] for any non-2xx status.
pub fn expect_success(response: ResponseSpec) -> ApplicationResult<ResponseSpec> {
    if response.is_success() {
        Ok(response)
    } else {
        Err(ApplicationError::from_response(&response))
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn test_from_response_uses_error_body() {
        let response = ResponseSpec::json(
            404,
            &serde_json::json!({"errorCode": "IMAGE_NOT_FOUND", "message": "gone", "status": 404}),
        );
        match ApplicationError::from_response(&response) {
            ApplicationError::Api { status, message } => {
                assert_eq!(status, 404);
                assert_eq!(message, "[IMAGE_NOT_FOUND] gone");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_expect_success() {
        assert!(expect_success(ResponseSpec::empty(204)).is_ok());
        assert!(matches!(
            expect_success(ResponseSpec::empty(502)),
            Err(ApplicationError::Api { status: 502, .. })
        ));
    }
}
