//! Router construction.
//!
//! Layering, outermost first:
//! 1. Request tracing
//! 2. CORS
//! 3. Identity resolution (every route)
//! 4. Admission control (per route, see [`Route`])
//! 5. The handler, with `AuthUser` on routes that require a signed-in user

use axum::{
    Router,
    extract::DefaultBodyLimit,
    middleware as axum_middleware,
    routing::{delete, get, post},
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::middleware::auth::resolve_identity;
use crate::middleware::rate_limit::{self, RoutePolicy};
use crate::services::rate_limiter::Route;
use crate::state::AppState;

/// Build the full application router.
pub fn create_routes(state: AppState) -> Router {
    let limit = |route: Route| {
        axum_middleware::from_fn_with_state(RoutePolicy::new(&state, route), rate_limit::enforce)
    };

    let api = Router::new()
        .route(
            "/api/health",
            get(handlers::health::health_check).layer(limit(Route::Default)),
        )
        // Public account routes
        .route(
            "/api/register",
            post(handlers::auth::register).layer(limit(Route::Register)),
        )
        .route(
            "/api/login",
            post(handlers::auth::login).layer(limit(Route::Login)),
        )
        .route(
            "/api/refresh",
            post(handlers::auth::refresh).layer(limit(Route::Refresh)),
        )
        // History routes (signed-in users only)
        .route(
            "/api/history",
            get(handlers::history::list_history).layer(limit(Route::HistoryRead)),
        )
        .route(
            "/api/history",
            delete(handlers::history::delete_history).layer(limit(Route::HistoryDeleteAll)),
        )
        .route(
            "/api/history/{id}",
            delete(handlers::history::delete_history_item).layer(limit(Route::HistoryDeleteOne)),
        )
        // Classification
        .route(
            "/api/predict",
            post(handlers::predict::predict)
                .layer(DefaultBodyLimit::max(state.max_upload_bytes))
                .layer(limit(Route::Predict)),
        )
        // Food catalog
        .route(
            "/api/foods/search",
            get(handlers::foods::search_foods).layer(limit(Route::FoodLookup)),
        )
        .route(
            "/api/food/{name}",
            get(handlers::foods::get_food).layer(limit(Route::FoodLookup)),
        )
        .fallback(handlers::not_found);

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    api.layer(axum_middleware::from_fn_with_state(
        state.clone(),
        resolve_identity,
    ))
    .layer(cors)
    .layer(TraceLayer::new_for_http())
    .with_state(state)
}
