//! HTTP middleware components.
//!
//! Middleware run before route handlers. Here they:
//! - Resolve the caller's identity from a bearer token (router wide)
//! - Enforce per-route rate limits (per route)

/// Identity resolution and the `AuthUser` extractor
pub mod auth;

/// Per-route admission control
pub mod rate_limit;
