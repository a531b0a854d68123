//! API error types.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

/// API error response.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Error code for programmatic handling.
    pub code: String,
    /// Human-readable error message.
    pub message: String,
}

/// API error type.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("metadata error: {0}")]
    Metadata(#[from] tally_metadata::MetadataError),
}

impl ApiError {
    /// Get the error code for this error.
    pub fn code(&self) -> &'static str {
        match self {
            Self::BadRequest(_) => "bad_request",
            Self::Metadata(_) => "metadata_error",
        }
    }

    /// Get the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Metadata(tally_metadata::MetadataError::Invalid(_)) => StatusCode::BAD_REQUEST,
            Self::Metadata(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = ErrorResponse {
            code: self.code().to_string(),
            message: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

/// Result type for API handlers.
pub type ApiResult<T> = std::result::Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;
    use tally_metadata::MetadataError;

    #[test]
    fn test_storage_unavailable_is_server_error() {
        let err = ApiError::from(MetadataError::Database(sqlx::Error::PoolClosed));
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.code(), "metadata_error");
    }

    #[test]
    fn test_only_invalid_metadata_input_is_client_error() {
        for err in [
            MetadataError::Config("missing database".to_string()),
            MetadataError::Internal("unexpected row count".to_string()),
            MetadataError::Io(std::io::Error::other("disk full")),
        ] {
            let err = ApiError::from(err);
            assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
            assert_eq!(err.code(), "metadata_error");
        }
    }

    #[test]
    fn test_invalid_input_is_client_error() {
        let err = ApiError::from(MetadataError::Invalid(tally_core::Error::InvalidVisit(
            "page cannot be empty".to_string(),
        )));
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_bad_request_response_body() {
        let response = ApiError::BadRequest("increment must be an integer".to_string())
            .into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
