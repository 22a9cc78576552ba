//! Shared application state.
//!
//! Built once in `main` (or a test harness) and cloned into every handler.
//! All members are cheap `Arc` handles.

use std::sync::Arc;
use std::time::Duration;

use chrono::Duration as TokenTtl;

use crate::config::Config;
use crate::services::classifier::Classifier;
use crate::services::credential_store::CredentialStore;
use crate::services::food_catalog::FoodCatalog;
use crate::services::history_store::HistoryStore;
use crate::services::prediction_service::PredictionService;
use crate::services::rate_limiter::RateLimiter;
use crate::services::token_service::TokenService;

#[derive(Clone)]
pub struct AppState {
    pub tokens: Arc<TokenService>,
    pub limiter: Arc<RateLimiter>,
    pub credentials: Arc<CredentialStore>,
    pub history: Arc<HistoryStore>,
    pub catalog: Arc<FoodCatalog>,
    pub predictions: Arc<PredictionService>,

    /// Upload cap for `POST /api/predict`, in bytes
    pub max_upload_bytes: usize,

    /// Whether `X-Forwarded-For` identifies anonymous callers
    pub trust_forwarded_for: bool,
}

impl AppState {
    pub fn new(
        config: &Config,
        jwt_secret: &str,
        catalog: FoodCatalog,
        classifier: Arc<dyn Classifier>,
    ) -> Self {
        let tokens = TokenService::new(
            jwt_secret.as_bytes(),
            TokenTtl::minutes(config.access_token_expire_minutes),
            TokenTtl::days(config.refresh_token_expire_days),
        );
        let catalog = Arc::new(catalog);
        let history = Arc::new(HistoryStore::new(config.history_dir()));
        let predictions = PredictionService::new(
            classifier,
            catalog.clone(),
            history.clone(),
            Duration::from_secs(config.classifier_timeout_secs),
        );

        Self {
            tokens: Arc::new(tokens),
            limiter: Arc::new(RateLimiter::new()),
            credentials: Arc::new(CredentialStore::new(config.users_path(), config.bcrypt_cost)),
            history,
            catalog,
            predictions: Arc::new(predictions),
            max_upload_bytes: config.max_upload_bytes,
            trust_forwarded_for: config.trust_forwarded_for,
        }
    }
}
