//! Food catalog HTTP handlers.
//!
//! - GET /api/foods/search - Filter and paginate the catalog
//! - GET /api/food/{name} - One food's localized details

use axum::{
    Json,
    extract::{Path, Query, State, rejection::QueryRejection},
};

use crate::error::{AppError, AppResult};
use crate::models::food::{FoodResponse, LanguageQuery, SearchQuery, SearchResponse};
use crate::state::AppState;

/// Search the catalog.
///
/// # Endpoint
///
/// `GET /api/foods/search?search=&region=&page=&per_page=&lang=`
///
/// # Query Parameters
///
/// - `search`: case-insensitive substring of the label or description
/// - `region`: `all` (default), `north`, `central`, `south` or `nationwide`
/// - `page`: 1-based, clamped into range
/// - `per_page`: defaults to 12
/// - `lang`: `VN` (default) or `EN`
///
/// # Response (200 OK)
///
/// ```json
/// {
///   "success": true,
///   "foods": [ { "id": "pho", "name": "pho", "region": "north", ... } ],
///   "pagination": {
///     "page": 1, "per_page": 12, "total": 1, "total_pages": 1,
///     "has_next": false, "has_prev": false
///   }
/// }
/// ```
pub async fn search_foods(
    State(state): State<AppState>,
    query: Result<Query<SearchQuery>, QueryRejection>,
) -> AppResult<Json<SearchResponse>> {
    let Query(query) = query?;
    let (foods, pagination) = state.catalog.search(&query)?;

    Ok(Json(SearchResponse {
        success: true,
        foods,
        pagination,
    }))
}

/// Localized details for one food.
///
/// # Endpoint
///
/// `GET /api/food/{name}?lang=`
pub async fn get_food(
    State(state): State<AppState>,
    Path(name): Path<String>,
    query: Result<Query<LanguageQuery>, QueryRejection>,
) -> AppResult<Json<FoodResponse>> {
    let Query(query) = query?;
    let food = state
        .catalog
        .lookup(&name, query.lang)
        .ok_or_else(|| AppError::NotFound("Food not found".to_string()))?;

    Ok(Json(FoodResponse {
        success: true,
        food,
    }))
}
