//! Per-route admission control.
//!
//! Each rate-limited route gets its own [`RoutePolicy`] layer. The layer runs
//! after identity resolution and before any extractor touches the body, so
//! rejected uploads are never decoded.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    extract::{ConnectInfo, Request, State},
    middleware::Next,
    response::Response,
};
use tracing::warn;

use crate::error::AppError;
use crate::middleware::auth::Identity;
use crate::services::rate_limiter::{Admission, Principal, RateLimiter, Route};
use crate::state::AppState;

const FORWARDED_FOR: &str = "x-forwarded-for";

/// Admission policy bound to one route.
#[derive(Clone)]
pub struct RoutePolicy {
    pub limiter: Arc<RateLimiter>,
    pub route: Route,
    pub trust_forwarded_for: bool,
}

impl RoutePolicy {
    pub fn new(state: &AppState, route: Route) -> Self {
        Self {
            limiter: state.limiter.clone(),
            route,
            trust_forwarded_for: state.trust_forwarded_for,
        }
    }
}

/// Count the request against its principal and reject it with 429 once the
/// route's quota is spent.
///
/// Signed-in callers are counted by username, anonymous callers by client
/// address. Routes without an anonymous quota let anonymous requests through
/// to the handler's own auth check.
pub async fn enforce(
    State(policy): State<RoutePolicy>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let identity = request
        .extensions()
        .get::<Identity>()
        .cloned()
        .unwrap_or(Identity::Anonymous);

    let Some(quota) = policy.route.quota(identity.is_authenticated()) else {
        return Ok(next.run(request).await);
    };

    let principal = match identity {
        Identity::User(username) => Principal::User(username),
        Identity::Anonymous => Principal::Ip(client_address(&request, policy.trust_forwarded_for)),
    };

    match policy.limiter.check_and_consume(&principal, policy.route, quota) {
        Admission::Allowed { .. } => Ok(next.run(request).await),
        Admission::Limited { retry_after } => {
            warn!(
                principal = %principal,
                route = policy.route.as_str(),
                "request rejected by rate limiter"
            );
            let secs = retry_after.as_secs() + u64::from(retry_after.subsec_nanos() > 0);
            Err(AppError::RateLimited {
                retry_after_secs: secs.max(1),
            })
        }
    }
}

/// Client address of an anonymous request.
///
/// The first `X-Forwarded-For` entry when trusted, else the socket peer,
/// else `unknown`.
fn client_address(request: &Request, trust_forwarded_for: bool) -> String {
    if trust_forwarded_for {
        let forwarded = request
            .headers()
            .get(FORWARDED_FOR)
            .and_then(|h| h.to_str().ok())
            .and_then(|s| s.split(',').next())
            .map(str::trim)
            .filter(|s| !s.is_empty());
        if let Some(addr) = forwarded {
            return addr.to_string();
        }
    }

    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}
