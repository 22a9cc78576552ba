//! Application configuration management.
//!
//! Configuration is read from environment variables with the `envy` crate,
//! after an optional `.env` file has been loaded. Every field has a default so
//! the service can start with an empty environment during development.

use std::path::PathBuf;

use serde::Deserialize;

/// Application configuration loaded from environment variables.
///
/// # Environment Variables
///
/// - `SERVER_PORT`: HTTP port, defaults to 5000
/// - `DATA_DIR`: directory holding `users.json`, `history/` and the persisted JWT secret
/// - `FOOD_DATABASE_PATH`: food metadata JSON file
/// - `CLASSIFIER_URL`: inference endpoint receiving JPEG uploads
/// - `CLASSIFIER_TIMEOUT_SECS`: upper bound for a single classification call
/// - `JWT_SECRET`: HS256 signing secret (generated and persisted when unset)
/// - `ACCESS_TOKEN_EXPIRE_MINUTES` / `REFRESH_TOKEN_EXPIRE_DAYS`: token lifetimes
/// - `MAX_UPLOAD_BYTES`: request body cap for `/api/predict`
/// - `TRUST_FORWARDED_FOR`: take the client address from `X-Forwarded-For`
/// - `BCRYPT_COST`: password hashing cost factor
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default = "default_port")]
    pub server_port: u16,

    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    #[serde(default = "default_food_database_path")]
    pub food_database_path: PathBuf,

    #[serde(default = "default_classifier_url")]
    pub classifier_url: String,

    #[serde(default = "default_classifier_timeout_secs")]
    pub classifier_timeout_secs: u64,

    #[serde(default)]
    pub jwt_secret: Option<String>,

    #[serde(default = "default_access_token_expire_minutes")]
    pub access_token_expire_minutes: i64,

    #[serde(default = "default_refresh_token_expire_days")]
    pub refresh_token_expire_days: i64,

    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,

    #[serde(default)]
    pub trust_forwarded_for: bool,

    #[serde(default = "default_bcrypt_cost")]
    pub bcrypt_cost: u32,
}

fn default_port() -> u16 {
    5000
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("./data")
}

fn default_food_database_path() -> PathBuf {
    PathBuf::from("./data/food_database.json")
}

fn default_classifier_url() -> String {
    "http://127.0.0.1:8501/v1/classify".to_string()
}

fn default_classifier_timeout_secs() -> u64 {
    30
}

fn default_access_token_expire_minutes() -> i64 {
    15
}

fn default_refresh_token_expire_days() -> i64 {
    7
}

fn default_max_upload_bytes() -> usize {
    10 * 1024 * 1024
}

fn default_bcrypt_cost() -> u32 {
    10
}

/// Cost bounds accepted by bcrypt.
const BCRYPT_COST_RANGE: std::ops::RangeInclusive<u32> = 4..=31;
const ACCESS_TOKEN_MINUTES_RANGE: std::ops::RangeInclusive<i64> = 1..=7 * 24 * 60;
const REFRESH_TOKEN_DAYS_RANGE: std::ops::RangeInclusive<i64> = 1..=3650;

/// Errors raised while loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read environment: {0}")]
    Env(#[from] envy::Error),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_port: default_port(),
            data_dir: default_data_dir(),
            food_database_path: default_food_database_path(),
            classifier_url: default_classifier_url(),
            classifier_timeout_secs: default_classifier_timeout_secs(),
            jwt_secret: None,
            access_token_expire_minutes: default_access_token_expire_minutes(),
            refresh_token_expire_days: default_refresh_token_expire_days(),
            max_upload_bytes: default_max_upload_bytes(),
            trust_forwarded_for: false,
            bcrypt_cost: default_bcrypt_cost(),
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// A `.env` file is loaded first if one exists. Field names map to upper
    /// case variables (`data_dir` -> `DATA_DIR`).
    ///
    /// # Errors
    ///
    /// Returns an error if a variable cannot be parsed into its field type or
    /// if the resulting values fail [`Config::validate`].
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let config = envy::from_env::<Config>()?;
        config.validate()?;
        Ok(config)
    }

    /// Check cross-field constraints that serde cannot express.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let url = url::Url::parse(&self.classifier_url)
            .map_err(|e| ConfigError::Invalid(format!("CLASSIFIER_URL: {e}")))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(ConfigError::Invalid(
                "CLASSIFIER_URL must use http or https".to_string(),
            ));
        }

        if self.classifier_timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "CLASSIFIER_TIMEOUT_SECS must be positive".to_string(),
            ));
        }
        if !ACCESS_TOKEN_MINUTES_RANGE.contains(&self.access_token_expire_minutes) {
            return Err(ConfigError::Invalid(format!(
                "ACCESS_TOKEN_EXPIRE_MINUTES must be between {} and {}",
                ACCESS_TOKEN_MINUTES_RANGE.start(),
                ACCESS_TOKEN_MINUTES_RANGE.end()
            )));
        }
        if !REFRESH_TOKEN_DAYS_RANGE.contains(&self.refresh_token_expire_days) {
            return Err(ConfigError::Invalid(format!(
                "REFRESH_TOKEN_EXPIRE_DAYS must be between {} and {}",
                REFRESH_TOKEN_DAYS_RANGE.start(),
                REFRESH_TOKEN_DAYS_RANGE.end()
            )));
        }
        if !BCRYPT_COST_RANGE.contains(&self.bcrypt_cost) {
            return Err(ConfigError::Invalid(format!(
                "BCRYPT_COST must be between {} and {}",
                BCRYPT_COST_RANGE.start(),
                BCRYPT_COST_RANGE.end()
            )));
        }

        Ok(())
    }

    /// Location of the credential collection.
    pub fn users_path(&self) -> PathBuf {
        self.data_dir.join("users.json")
    }

    /// Directory holding one history file per user.
    pub fn history_dir(&self) -> PathBuf {
        self.data_dir.join("history")
    }
}
