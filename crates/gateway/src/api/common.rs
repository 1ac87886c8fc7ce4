// Common DTOs and error mapping for the public API

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use promptgate_core::ServiceError;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Standard error response for API endpoints.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    /// Error message describing what went wrong.
    pub error: String,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }

    /// Convert to axum response tuple
    pub fn into_response(self, status: StatusCode) -> (StatusCode, Json<Self>) {
        (status, Json(self))
    }
}

/// Error returned by the generation and similarity handlers
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

impl ApiError {
    pub fn internal(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: message.into(),
        }
    }
}

impl From<ServiceError> for ApiError {
    fn from(err: ServiceError) -> Self {
        if err.is_client_error() {
            return Self {
                status: StatusCode::BAD_REQUEST,
                message: err.to_string(),
            };
        }

        tracing::error!(error = %err, "Request failed");
        Self::internal(err.to_string())
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        tracing::warn!(error = %err, "Request body is not valid JSON");
        Self::internal(err.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        ErrorResponse::new(self.message)
            .into_response(self.status)
            .into_response()
    }
}

pub const POST_ONLY: &str = "Only POST requests are allowed";

/// Fallback for POST-only routes
pub async fn post_only() -> (StatusCode, Json<ErrorResponse>) {
    ErrorResponse::new(POST_ONLY).into_response(StatusCode::METHOD_NOT_ALLOWED)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bad_request_mapping() {
        let err: ApiError = ServiceError::bad_request("Missing prompt").into();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
        assert_eq!(err.message, "Missing prompt");
    }

    #[test]
    fn test_upstream_maps_to_500() {
        let err: ApiError = ServiceError::upstream(503).into();
        assert_eq!(err.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.message, "API request failed with status code 503");
    }

    #[test]
    fn test_json_error_maps_to_500() {
        let parse_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err: ApiError = parse_err.into();
        assert_eq!(err.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!err.message.is_empty());
    }
}
