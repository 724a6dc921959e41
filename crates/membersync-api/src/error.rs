//! API error types.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use membersync_core::error::SyncError;
use serde::Serialize;
use thiserror::Error;

/// Startup and runtime errors for the API server.
#[derive(Debug, Error)]
pub enum AppError {
    /// A required environment variable is missing or invalid.
    #[error("configuration error: {0}")]
    Config(String),

    /// Database connection or pool error.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A client could not be constructed at startup.
    #[error("initialization error: {0}")]
    Init(#[from] SyncError),

    /// Network binding or I/O error.
    #[error("server error: {0}")]
    Server(#[from] std::io::Error),
}

/// JSON body returned for error responses.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    /// Machine-readable error code.
    pub error: &'static str,
    /// Human-readable error message.
    pub message: String,
}

/// HTTP-layer wrapper around `SyncError` that implements `IntoResponse`.
///
/// Upstream failures (the source, a group, the mailer) map to 502: the
/// run failed because a dependency misbehaved, not because the request
/// was wrong. Storage failures and violated preconditions map to 500.
#[derive(Debug)]
pub struct ApiError(pub SyncError);

impl From<SyncError> for ApiError {
    fn from(err: SyncError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code) = match &self.0 {
            SyncError::RetryExhausted { .. } => (StatusCode::BAD_GATEWAY, "retries_exhausted"),
            SyncError::External { .. } => (StatusCode::BAD_GATEWAY, "external_service_error"),
            SyncError::Parse(_) => (StatusCode::BAD_GATEWAY, "parse_error"),
            SyncError::Storage(_) => (StatusCode::INTERNAL_SERVER_ERROR, "storage_error"),
            SyncError::Precondition(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "precondition_violated")
            }
        };

        let body = ErrorBody {
            error: error_code,
            message: self.0.to_string(),
        };

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;

    fn status_of(err: SyncError) -> StatusCode {
        ApiError(err).into_response().status()
    }

    #[test]
    fn test_retry_exhausted_maps_to_502() {
        assert_eq!(
            status_of(SyncError::RetryExhausted {
                service: "registration-source".into(),
                attempts: 5,
                message: "HTTP 503".into(),
            }),
            StatusCode::BAD_GATEWAY
        );
    }

    #[test]
    fn test_external_maps_to_502() {
        assert_eq!(
            status_of(SyncError::external("mailing-list", "HTTP 400")),
            StatusCode::BAD_GATEWAY
        );
    }

    #[test]
    fn test_parse_maps_to_502() {
        assert_eq!(
            status_of(SyncError::Parse("missing field".into())),
            StatusCode::BAD_GATEWAY
        );
    }

    #[test]
    fn test_storage_maps_to_500() {
        assert_eq!(
            status_of(SyncError::Storage("connection reset".into())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_precondition_maps_to_500() {
        assert_eq!(
            status_of(SyncError::Precondition("empty member list".into())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
