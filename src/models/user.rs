//! User credential model and authentication request/response types.
//!
//! Credentials are stored as a JSON array in `users.json`. Passwords are never
//! stored in clear text, only their bcrypt digest.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A stored user credential.
///
/// # Storage
///
/// One entry of the `users.json` array:
/// - `username`: unique, case-sensitive
/// - `password`: bcrypt digest of the password
/// - `created_at`: registration time
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Credential {
    pub username: String,

    /// bcrypt digest of the user's password
    #[serde(rename = "password")]
    pub password_digest: String,

    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
}

/// Request body for both registration and login.
///
/// Fields default to empty strings so a missing field is reported through the
/// regular validation path instead of a deserialization rejection.
///
/// # JSON Example
///
/// ```json
/// {
///   "username": "alice",
///   "password": "pw123"
/// }
/// ```
#[derive(Debug, Deserialize)]
pub struct CredentialsRequest {
    #[serde(default)]
    pub username: String,

    #[serde(default)]
    pub password: String,
}

/// Request body for `POST /api/refresh`.
#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    #[serde(default)]
    pub refresh_token: String,
}

/// Generic `{success, message}` response.
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub success: bool,
    pub message: String,
}

impl MessageResponse {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }
}

/// Response returned by a successful login.
///
/// # JSON Example
///
/// ```json
/// {
///   "success": true,
///   "access_token": "eyJhbGciOi...",
///   "refresh_token": "eyJhbGciOi...",
///   "token_type": "Bearer",
///   "expires_in": 900,
///   "username": "alice"
/// }
/// ```
#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub success: bool,
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: &'static str,

    /// Access token lifetime in seconds
    pub expires_in: i64,
    pub username: String,
}

/// Response returned by a successful refresh.
#[derive(Debug, Serialize)]
pub struct RefreshResponse {
    pub success: bool,
    pub access_token: String,
    pub token_type: &'static str,
    pub expires_in: i64,
}
