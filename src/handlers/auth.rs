//! Account HTTP handlers.
//!
//! This module implements the public authentication endpoints:
//! - POST /api/register - Create a user
//! - POST /api/login - Exchange credentials for an access/refresh token pair
//! - POST /api/refresh - Exchange a refresh token for a new access token

use axum::{Json, extract::State, extract::rejection::JsonRejection};
use tracing::{info, warn};

use crate::error::{AppError, AppResult};
use crate::models::user::{
    CredentialsRequest, LoginResponse, MessageResponse, RefreshRequest, RefreshResponse,
};
use crate::services::token_service::TokenKind;
use crate::state::AppState;

const TOKEN_TYPE: &str = "Bearer";
const USERNAME_LEN: std::ops::RangeInclusive<usize> = 3..=32;
const PASSWORD_LEN: std::ops::RangeInclusive<usize> = 5..=128;

/// Usernames double as history file names, so only a filesystem-safe
/// alphabet is accepted.
fn validate_registration(username: &str, password: &str) -> AppResult<()> {
    if !USERNAME_LEN.contains(&username.chars().count())
        || !username
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-'))
    {
        return Err(AppError::Validation(
            "Username must be 3-32 characters of letters, digits, '_', '.' or '-'".into(),
        ));
    }
    if !PASSWORD_LEN.contains(&password.chars().count()) {
        return Err(AppError::Validation(
            "Password must be between 5 and 128 characters".into(),
        ));
    }
    Ok(())
}

fn require_credentials(request: &CredentialsRequest) -> AppResult<(&str, &str)> {
    let username = request.username.trim();
    if username.is_empty() || request.password.is_empty() {
        return Err(AppError::Validation("Username and password required".into()));
    }
    Ok((username, request.password.as_str()))
}

/// Register a new user.
///
/// # Endpoint
///
/// `POST /api/register`
///
/// # Request Body
///
/// ```json
/// {
///   "username": "alice",
///   "password": "pw123"
/// }
/// ```
///
/// # Response
///
/// - **Success (200 OK)**: `{"success": true, "message": "User created successfully"}`
/// - **Error (400)**: Missing fields, invalid username/password, or username taken
/// - **Error (429)**: Too many registrations from this caller
pub async fn register(
    State(state): State<AppState>,
    payload: Result<Json<CredentialsRequest>, JsonRejection>,
) -> AppResult<Json<MessageResponse>> {
    let Json(request) = payload?;
    let (username, password) = require_credentials(&request)?;
    validate_registration(username, password)?;

    state.credentials.create(username, password).await?;

    Ok(Json(MessageResponse::ok("User created successfully")))
}

/// Log in.
///
/// # Endpoint
///
/// `POST /api/login`
///
/// # Response
///
/// - **Success (200 OK)**: token pair plus the access token lifetime in seconds
/// - **Error (400)**: Missing fields
/// - **Error (401)**: Unknown user or wrong password (indistinguishable)
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
pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<CredentialsRequest>, JsonRejection>,
) -> AppResult<Json<LoginResponse>> {
    let Json(request) = payload?;
    let (username, password) = require_credentials(&request)?;

    if !state.credentials.verify(username, password).await? {
        warn!(username = %username, "failed login attempt");
        return Err(AppError::Unauthorized("Invalid username or password".into()));
    }

    let access_token = state.tokens.issue_access(username)?;
    let refresh_token = state.tokens.issue_refresh(username)?;
    info!(username = %username, "user logged in");

    Ok(Json(LoginResponse {
        success: true,
        access_token,
        refresh_token,
        token_type: TOKEN_TYPE,
        expires_in: state.tokens.access_ttl_secs(),
        username: username.to_string(),
    }))
}

/// Mint a new access token from a refresh token.
///
/// The refresh token itself is neither rotated nor revoked.
///
/// # Endpoint
///
/// `POST /api/refresh`
pub async fn refresh(
    State(state): State<AppState>,
    payload: Result<Json<RefreshRequest>, JsonRejection>,
) -> AppResult<Json<RefreshResponse>> {
    let Json(request) = payload?;
    let token = request.refresh_token.trim();
    if token.is_empty() {
        return Err(AppError::Validation("Refresh token required".into()));
    }

    let username = state
        .tokens
        .verify(token, TokenKind::Refresh)
        .ok_or_else(|| AppError::Unauthorized("Invalid or expired refresh token".into()))?;

    Ok(Json(RefreshResponse {
        success: true,
        access_token: state.tokens.issue_access(&username)?,
        token_type: TOKEN_TYPE,
        expires_in: state.tokens.access_ttl_secs(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registration_rules() {
        assert!(validate_registration("alice", "pw1234").is_ok());
        assert!(validate_registration("a.b-c_d", "pw1234").is_ok());
        assert!(validate_registration("al", "pw1234").is_err());
        assert!(validate_registration("../etc", "pw1234").is_err());
        assert!(validate_registration("alice smith", "pw1234").is_err());
        assert!(validate_registration("alice", "pw12").is_err());
        assert!(validate_registration("alice", &"x".repeat(129)).is_err());
    }

    #[test]
    fn credentials_are_required() {
        let missing = CredentialsRequest {
            username: "  ".into(),
            password: "pw1234".into(),
        };
        assert!(matches!(
            require_credentials(&missing),
            Err(AppError::Validation(m)) if m == "Username and password required"
        ));
    }
}
