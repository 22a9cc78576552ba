//! Caller identity.
//!
//! Identity resolution runs router-wide and never rejects: it inserts an
//! [`Identity`] into the request extensions, anonymous unless the request
//! carries a valid access token. Routes that require a signed-in user take
//! the [`AuthUser`] extractor, which turns an anonymous identity into 401.

use std::convert::Infallible;

use axum::{
    extract::{FromRequestParts, Request, State},
    http::request::Parts,
    middleware::Next,
    response::Response,
};

use crate::error::AppError;
use crate::services::token_service::bearer_token;
use crate::state::AppState;

/// Who is making the request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Identity {
    Anonymous,
    User(String),
}

impl Identity {
    pub fn username(&self) -> Option<&str> {
        match self {
            Identity::User(name) => Some(name),
            Identity::Anonymous => None,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(self, Identity::User(_))
    }
}

/// Resolve the caller from `Authorization: Bearer <access token>`.
///
/// # Flow
///
/// 1. Extract the bearer token, if any
/// 2. Verify it as an access token
/// 3. Insert `Identity::User` on success, `Identity::Anonymous` otherwise
pub async fn resolve_identity(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let identity = match state.tokens.resolve_identity(request.headers()) {
        Some(username) => Identity::User(username),
        None => Identity::Anonymous,
    };

    request.extensions_mut().insert(identity);
    next.run(request).await
}

/// Reads the identity inserted by [`resolve_identity`]; anonymous when absent.
impl<S> FromRequestParts<S> for Identity
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(parts
            .extensions
            .get::<Identity>()
            .cloned()
            .unwrap_or(Identity::Anonymous))
    }
}

/// A signed-in caller. Rejects anonymous requests with 401.
///
/// The message tells a missing or malformed header apart from a token that
/// failed verification.
#[derive(Debug, Clone)]
pub struct AuthUser(pub String);

impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        if let Some(Identity::User(username)) = parts.extensions.get::<Identity>() {
            return Ok(AuthUser(username.clone()));
        }

        let message = if bearer_token(&parts.headers).is_none() {
            "Missing or invalid authorization header"
        } else {
            "Invalid or expired token"
        };
        Err(AppError::Unauthorized(message.to_string()))
    }
}
