//! Prediction history HTTP handlers.
//!
//! All endpoints require a signed-in user and only ever touch that user's
//! own records:
//! - GET /api/history - Most recent predictions
//! - DELETE /api/history - Purge all predictions
//! - DELETE /api/history/{id} - Remove one prediction

use axum::{
    Json,
    extract::{Path, Query, State, rejection::QueryRejection},
};
use tracing::info;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::models::history::{HistoryDeletedResponse, HistoryQuery, HistoryResponse};
use crate::state::AppState;

const DEFAULT_LIMIT: usize = 20;
const MAX_LIMIT: usize = 100;

/// List the caller's predictions, newest first.
///
/// # Endpoint
///
/// `GET /api/history?limit=N`
///
/// `limit` defaults to 20 and is clamped to `1..=100`.
///
/// # Response (200 OK)
///
/// ```json
/// {
///   "success": true,
///   "history": [
///     {
///       "_id": "550e8400-e29b-41d4-a716-446655440000",
///       "timestamp": "2025-12-20T10:00:00Z",
///       "food_name": "pho",
///       "confidence": 97.4,
///       "image_base64": "/9j/4AAQ..."
///     }
///   ],
///   "username": "alice"
/// }
/// ```
pub async fn list_history(
    State(state): State<AppState>,
    AuthUser(username): AuthUser,
    query: Result<Query<HistoryQuery>, QueryRejection>,
) -> AppResult<Json<HistoryResponse>> {
    let Query(query) = query?;
    let limit = query.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);

    let history = state.history.list_recent(&username, limit).await;

    Ok(Json(HistoryResponse {
        success: true,
        history,
        username,
    }))
}

/// Delete every prediction the caller owns.
///
/// # Endpoint
///
/// `DELETE /api/history`
pub async fn delete_history(
    State(state): State<AppState>,
    AuthUser(username): AuthUser,
) -> AppResult<Json<HistoryDeletedResponse>> {
    state.history.delete_all(&username).await?;
    info!(username = %username, "history purged");

    Ok(Json(HistoryDeletedResponse {
        success: true,
        message: "History deleted".to_string(),
        deleted_by: username,
    }))
}

/// Delete one of the caller's predictions.
///
/// # Endpoint
///
/// `DELETE /api/history/{id}`
///
/// # Response
///
/// - **Success (200 OK)**: the record was removed
/// - **Error (404)**: no record with that id in the caller's history
///   (a malformed id is reported the same way)
pub async fn delete_history_item(
    State(state): State<AppState>,
    AuthUser(username): AuthUser,
    Path(item_id): Path<String>,
) -> AppResult<Json<HistoryDeletedResponse>> {
    let not_found = || AppError::NotFound("Item not found".to_string());
    let record_id = Uuid::parse_str(&item_id).map_err(|_| not_found())?;

    if !state.history.delete_one(&username, record_id).await? {
        return Err(not_found());
    }

    Ok(Json(HistoryDeletedResponse {
        success: true,
        message: "History item deleted".to_string(),
        deleted_by: username,
    }))
}
