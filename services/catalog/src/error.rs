//! Custom error types for the catalog service

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

/// Custom error type for the catalog service
#[derive(Error, Debug)]
pub enum ApiError {
    /// A required field is missing or out of range
    #[error("Validation failed for {field}: {message}")]
    Validation { field: String, message: String },

    /// The referenced user, product, or image does not exist
    #[error("{0} not found")]
    NotFound(String),

    /// The requester does not own the referenced product
    #[error("{0}")]
    Forbidden(String),

    /// Missing, malformed, expired, or invalid credential
    #[error("Not authorized")]
    Unauthenticated,

    /// The stored OTP has passed its validity window
    #[error("OTP has expired. Please request a new one.")]
    OtpExpired,

    /// The supplied OTP does not match the stored one
    #[error("Invalid OTP")]
    OtpMismatch,

    /// The blob store or record store failed
    #[error("Upstream failure: {0}")]
    Upstream(String),

    /// Internal server error
    #[error("Internal server error")]
    Internal,

    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] common::error::DatabaseError),
}

impl ApiError {
    /// Shortcut for field-level validation failures
    pub fn validation(field: &str, message: impl Into<String>) -> Self {
        ApiError::Validation {
            field: field.to_string(),
            message: message.into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            ApiError::Validation { field, message } => (
                StatusCode::BAD_REQUEST,
                json!({
                    "success": false,
                    "message": message,
                    "field": field,
                }),
            ),
            ApiError::NotFound(what) => (
                StatusCode::NOT_FOUND,
                json!({
                    "success": false,
                    "message": format!("{} not found", what),
                }),
            ),
            ApiError::Forbidden(message) => (
                StatusCode::FORBIDDEN,
                json!({
                    "success": false,
                    "message": message,
                }),
            ),
            ApiError::Unauthenticated => (
                StatusCode::UNAUTHORIZED,
                json!({
                    "success": false,
                    "message": "Not authorized",
                }),
            ),
            ApiError::OtpExpired => (
                StatusCode::BAD_REQUEST,
                json!({
                    "success": false,
                    "message": "OTP has expired. Please request a new one.",
                }),
            ),
            ApiError::OtpMismatch => (
                StatusCode::BAD_REQUEST,
                json!({
                    "success": false,
                    "message": "Invalid OTP",
                }),
            ),
            ApiError::Upstream(_) | ApiError::Internal | ApiError::Database(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                json!({
                    "success": false,
                    "message": "Internal server error",
                }),
            ),
        };

        (status, Json(body)).into_response()
    }
}

/// Type alias for API results
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_carries_field_detail() {
        let err = ApiError::validation("name", "Product name is required");
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_status_codes_follow_taxonomy() {
        assert_eq!(
            ApiError::NotFound("Product".to_string())
                .into_response()
                .status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ApiError::Forbidden("Not authorized to update this product".to_string())
                .into_response()
                .status(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            ApiError::Unauthenticated.into_response().status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            ApiError::OtpExpired.into_response().status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::OtpMismatch.into_response().status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::Upstream("s3 unreachable".to_string())
                .into_response()
                .status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_internal_detail_is_not_leaked() {
        let err = ApiError::Upstream("bucket misconfigured: secret-bucket-name".to_string());
        assert!(format!("{}", err).contains("secret-bucket-name"));
        // The wire body stays generic
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
