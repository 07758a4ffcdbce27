//! Success response envelope
//!
//! Every successful JSON response carries a `success` flag, usually a
//! human-readable `message`, and an optional payload. List responses add a
//! record count. Failures are produced by `ApiError` with the same envelope
//! shape.

use axum::{
    Json,
    response::{IntoResponse, Response},
};
use serde::Serialize;

/// Response envelope for successful operations
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub count: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T: Serialize> ApiResponse<T> {
    /// A successful response with a message and a payload
    pub fn ok(message: impl Into<String>, data: T) -> Self {
        ApiResponse {
            success: true,
            message: Some(message.into()),
            count: None,
            data: Some(data),
        }
    }

    /// A successful response carrying only a payload
    pub fn data(data: T) -> Self {
        ApiResponse {
            success: true,
            message: None,
            count: None,
            data: Some(data),
        }
    }

    /// A successful list response with a record count
    pub fn list(count: usize, data: T) -> Self {
        ApiResponse {
            success: true,
            message: None,
            count: Some(count),
            data: Some(data),
        }
    }
}

impl ApiResponse<()> {
    /// A successful response with a message and no payload
    pub fn message(message: impl Into<String>) -> Self {
        ApiResponse {
            success: true,
            message: Some(message.into()),
            count: None,
            data: None,
        }
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        Json(self).into_response()
    }
}
