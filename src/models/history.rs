//! Prediction history models.
//!
//! Each user owns one JSON file containing an array of [`HistoryRecord`]s in
//! insertion order (oldest first).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One saved prediction.
///
/// Records are only ever appended or removed whole; there is no in-place edit.
///
/// # JSON Example
///
/// ```json
/// {
///   "_id": "550e8400-e29b-41d4-a716-446655440000",
///   "timestamp": "2025-12-20T10:00:00Z",
///   "food_name": "pho",
///   "confidence": 97.4,
///   "image_base64": "/9j/4AAQSkZJRg..."
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryRecord {
    /// Unique within the owner's history
    #[serde(rename = "_id", alias = "id")]
    pub id: Uuid,

    pub timestamp: DateTime<Utc>,

    pub food_name: String,

    /// Classifier confidence in percent
    pub confidence: f64,

    /// JPEG snapshot of the classified image, base64 encoded
    #[serde(default)]
    pub image_base64: Option<String>,
}

/// Query string for `GET /api/history`.
#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    pub limit: Option<usize>,
}

/// Response body for `GET /api/history`.
#[derive(Debug, Serialize)]
pub struct HistoryResponse {
    pub success: bool,
    pub history: Vec<HistoryRecord>,
    pub username: String,
}

/// Response body for both history deletion endpoints.
#[derive(Debug, Serialize)]
pub struct HistoryDeletedResponse {
    pub success: bool,
    pub message: String,
    pub deleted_by: String,
}
