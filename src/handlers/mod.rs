//! HTTP request handlers (route handlers).
//!
//! Each handler is an async function that:
//! 1. Receives HTTP request data (JSON body, multipart form, query, path)
//! 2. Delegates to the services in `AppState`
//! 3. Returns a JSON response or an `AppError`

use crate::error::AppError;

/// Registration, login and token refresh
pub mod auth;

/// Food catalog search and detail
pub mod foods;

/// Liveness probe
pub mod health;

/// Per-user prediction history
pub mod history;

/// Image classification
pub mod predict;

/// Fallback for unknown paths.
pub async fn not_found() -> AppError {
    AppError::NotFound("Endpoint not found".to_string())
}
