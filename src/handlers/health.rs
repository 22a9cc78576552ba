//! Health check endpoint for service monitoring.

use axum::Json;
use serde::Serialize;

/// Liveness response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub success: bool,

    /// Always `healthy` while the process serves requests
    pub status: &'static str,

    pub service: &'static str,
    pub version: &'static str,
}

/// Health check handler.
///
/// # Response (200 OK)
///
/// ```json
/// {
///   "success": true,
///   "status": "healthy",
///   "service": "food-recognition-api",
///   "version": "0.1.0"
/// }
/// ```
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        success: true,
        status: "healthy",
        service: "food-recognition-api",
        version: env!("CARGO_PKG_VERSION"),
    })
}
