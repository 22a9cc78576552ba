//! Food Recognition API - Main Application Entry Point
//!
//! # Startup Flow
//!
//! 1. Load configuration from environment variables
//! 2. Load and validate the food catalog
//! 3. Build the classifier client
//! 4. Resolve the token signing secret
//! 5. Build shared state, start the rate limiter janitor
//! 6. Build the HTTP router and start serving on the configured port

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tracing_subscriber::EnvFilter;

use food_recognition_api::{
    config::Config,
    routes,
    services::{
        classifier::HttpClassifier, food_catalog::FoodCatalog, token_service::resolve_secret,
    },
    state::AppState,
};

const JANITOR_PERIOD: Duration = Duration::from_secs(5 * 60);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging with tracing subscriber. Reads RUST_LOG environment variable (defaults to "info" level)
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = Config::from_env()?;
    tracing::info!("Configuration loaded");

    let catalog = FoodCatalog::load(&config.food_database_path).with_context(|| {
        format!(
            "loading food catalog from {}",
            config.food_database_path.display()
        )
    })?;
    tracing::info!(foods = catalog.len(), "Food catalog loaded");

    let classifier = HttpClassifier::new(
        config.classifier_url.clone(),
        Duration::from_secs(config.classifier_timeout_secs),
    )?;
    tracing::info!(endpoint = %config.classifier_url, "Classifier client ready");

    let jwt_secret = resolve_secret(config.jwt_secret.as_deref(), &config.data_dir)
        .context("resolving JWT secret")?;

    let state = AppState::new(&config, &jwt_secret, catalog, Arc::new(classifier));
    state.limiter.spawn_janitor(JANITOR_PERIOD);

    let app = routes::create_routes(state);

    // Bind to network address and start server
    let addr = format!("0.0.0.0:{}", config.server_port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {}", addr);

    // Peer addresses identify anonymous callers for rate limiting
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
