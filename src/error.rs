//! Error types and HTTP error response handling.
//!
//! This module defines all application errors and how they are converted
//! into HTTP responses with appropriate status codes and JSON bodies.

use axum::{
    Json,
    extract::multipart::{MultipartError, MultipartRejection},
    extract::rejection::{JsonRejection, QueryRejection},
    http::{HeaderValue, StatusCode, header::RETRY_AFTER},
    response::{IntoResponse, Response},
};
use serde_json::json;

use crate::services::json_store::StoreError;

/// Convenience alias for handler and service return types.
pub type AppResult<T> = Result<T, AppError>;

/// Application-wide error type.
///
/// Each variant maps to one HTTP status code and one stable machine-readable
/// code in the response body.
///
/// # Error Categories
///
/// - **Input Errors**: missing or malformed request data, undecodable images
/// - **Authentication Errors**: bad credentials, invalid or expired tokens
/// - **Admission Errors**: the caller exhausted its quota for the route
/// - **Resource Errors**: unknown history items, foods, or paths
/// - **Upstream Errors**: the classifier failed or its label has no metadata
/// - **Internal Errors**: storage faults and anything unexpected
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Request body, query or form data is missing or invalid.
    ///
    /// Returns HTTP 400 Bad Request.
    #[error("{0}")]
    Validation(String),

    /// Uploaded bytes could not be decoded into a bitmap.
    ///
    /// Returns HTTP 400 Bad Request.
    #[error("Invalid image: {0}")]
    InvalidImage(String),

    /// Request body exceeds the upload limit.
    ///
    /// Returns HTTP 413 Payload Too Large.
    #[error("{0}")]
    PayloadTooLarge(String),

    /// Credentials were rejected or the bearer token is missing, invalid or expired.
    ///
    /// Returns HTTP 401 Unauthorized.
    #[error("{0}")]
    Unauthorized(String),

    /// The principal exhausted its quota for the current window.
    ///
    /// Returns HTTP 429 Too Many Requests with a `Retry-After` header.
    #[error("Too many requests, retry in {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    /// Requested resource does not exist for this caller.
    ///
    /// Returns HTTP 404 Not Found.
    #[error("{0}")]
    NotFound(String),

    /// The classifier failed, timed out or returned an unusable answer.
    ///
    /// Returns HTTP 500. The detail is logged, never sent to the client.
    #[error("Classification failed: {0}")]
    ClassificationFailed(String),

    /// The predicted label has no entry in the food catalog.
    ///
    /// Returns HTTP 404 Not Found.
    #[error("Food information not found")]
    FoodInfoMissing(String),

    /// Unexpected failure (storage fault, hashing failure, ...).
    ///
    /// Returns HTTP 500. The detail is logged, never sent to the client.
    #[error("Internal server error")]
    Internal(String),
}

/// Convert AppError into an HTTP response.
///
/// # Response Format
///
/// Every error uses the same envelope so clients can branch on `success`:
/// ```json
/// {
///   "success": false,
///   "error": "error_code",
///   "message": "Human-readable error message"
/// }
/// ```
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::Validation(m) => (StatusCode::BAD_REQUEST, "validation_error", m.clone()),
            AppError::InvalidImage(_) => {
                (StatusCode::BAD_REQUEST, "invalid_image", self.to_string())
            }
            AppError::PayloadTooLarge(m) => {
                (StatusCode::PAYLOAD_TOO_LARGE, "payload_too_large", m.clone())
            }
            AppError::Unauthorized(m) => (StatusCode::UNAUTHORIZED, "unauthorized", m.clone()),
            AppError::RateLimited { .. } => (
                StatusCode::TOO_MANY_REQUESTS,
                "rate_limited",
                self.to_string(),
            ),
            AppError::NotFound(m) => (StatusCode::NOT_FOUND, "not_found", m.clone()),
            AppError::ClassificationFailed(detail) => {
                tracing::error!(error = %detail, "classification failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "classification_failed",
                    "Classification failed".to_string(),
                )
            }
            AppError::FoodInfoMissing(label) => {
                tracing::error!(label = %label, "classifier label missing from food catalog");
                (StatusCode::NOT_FOUND, "food_info_missing", self.to_string())
            }
            AppError::Internal(detail) => {
                tracing::error!(error = %detail, "internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    self.to_string(),
                )
            }
        };

        let body = Json(json!({
            "success": false,
            "error": code,
            "message": message
        }));

        let mut response = (status, body).into_response();
        if let AppError::RateLimited { retry_after_secs } = self {
            if let Ok(value) = HeaderValue::from_str(&retry_after_secs.to_string()) {
                response.headers_mut().insert(RETRY_AFTER, value);
            }
        }
        response
    }
}

impl From<StoreError> for AppError {
    fn from(e: StoreError) -> Self {
        AppError::Internal(e.to_string())
    }
}

impl From<JsonRejection> for AppError {
    fn from(e: JsonRejection) -> Self {
        AppError::Validation(e.body_text())
    }
}

impl From<QueryRejection> for AppError {
    fn from(e: QueryRejection) -> Self {
        AppError::Validation(e.body_text())
    }
}

impl From<MultipartRejection> for AppError {
    fn from(e: MultipartRejection) -> Self {
        AppError::Validation(e.body_text())
    }
}

impl From<MultipartError> for AppError {
    fn from(e: MultipartError) -> Self {
        if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
            AppError::PayloadTooLarge("Image exceeds the upload size limit".into())
        } else {
            AppError::Validation(e.body_text())
        }
    }
}
