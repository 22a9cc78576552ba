//! Access and refresh token issuing and verification.
//!
//! Tokens are HS256 JWTs carrying `{username, type, exp, iat}`. Verification
//! is stateless: a token is valid while its signature matches and `exp` has
//! not passed. There is no revocation list, so a leaked token stays usable for
//! its configured lifetime.

use std::fs::OpenOptions;
use std::io::{self, Write};
#[cfg(unix)]
use std::os::unix::fs::OpenOptionsExt;
use std::path::{Path, PathBuf};

use axum::http::{HeaderMap, header::AUTHORIZATION};
use chrono::{Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use rand::distr::Alphanumeric;
use rand::{Rng, rng};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{AppError, AppResult};

/// Which of the two token families a token belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    Access,
    Refresh,
}

/// JWT claim set shared by both token kinds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenClaims {
    pub username: String,

    #[serde(rename = "type")]
    pub kind: TokenKind,

    /// Expiry as a unix timestamp (seconds)
    pub exp: i64,

    /// Issue time as a unix timestamp (seconds)
    pub iat: i64,
}

/// Issues and verifies signed tokens with a single shared secret.
#[derive(Clone)]
pub struct TokenService {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    access_ttl: Duration,
    refresh_ttl: Duration,
}

impl TokenService {
    /// Create a service signing with `secret`.
    pub fn new(secret: &[u8], access_ttl: Duration, refresh_ttl: Duration) -> Self {
        let mut validation = Validation::default();
        validation.validate_exp = true;
        validation.leeway = 0;

        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            validation,
            access_ttl,
            refresh_ttl,
        }
    }

    /// Access token lifetime in seconds, reported to clients as `expires_in`.
    pub fn access_ttl_secs(&self) -> i64 {
        self.access_ttl.num_seconds()
    }

    /// Issue a short-lived access token.
    pub fn issue_access(&self, username: &str) -> AppResult<String> {
        self.issue(username, TokenKind::Access, self.access_ttl)
    }

    /// Issue a long-lived refresh token.
    pub fn issue_refresh(&self, username: &str) -> AppResult<String> {
        self.issue(username, TokenKind::Refresh, self.refresh_ttl)
    }

    fn issue(&self, username: &str, kind: TokenKind, ttl: Duration) -> AppResult<String> {
        let now = Utc::now();
        let claims = TokenClaims {
            username: username.to_string(),
            kind,
            exp: (now + ttl).timestamp(),
            iat: now.timestamp(),
        };

        encode(&Header::default(), &claims, &self.encoding)
            .map_err(|e| AppError::Internal(format!("jwt encode: {e}")))
    }

    /// Verify `token` and return its username.
    ///
    /// Returns `None` when the signature does not match, the payload is
    /// malformed, the token has expired, or it is not of `expected` kind.
    pub fn verify(&self, token: &str, expected: TokenKind) -> Option<String> {
        let claims = match decode::<TokenClaims>(token, &self.decoding, &self.validation) {
            Ok(data) => data.claims,
            Err(e) => {
                debug!(error = %e, "token rejected");
                return None;
            }
        };

        if claims.kind != expected {
            debug!(got = ?claims.kind, ?expected, "token kind mismatch");
            return None;
        }
        Some(claims.username)
    }

    /// Resolve the caller from an `Authorization: Bearer <token>` header.
    ///
    /// Anything other than a valid access token yields `None` (anonymous).
    pub fn resolve_identity(&self, headers: &HeaderMap) -> Option<String> {
        let token = bearer_token(headers)?;
        self.verify(token, TokenKind::Access)
    }
}

/// Extract the token part of an `Authorization: Bearer <token>` header.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

/// Resolve the signing secret: configured value, else the persisted file in
/// `data_dir`, else a freshly generated one that is persisted for next time.
pub fn resolve_secret(configured: Option<&str>, data_dir: &Path) -> io::Result<String> {
    if let Some(secret) = configured.map(str::trim).filter(|s| !s.is_empty()) {
        return Ok(secret.to_string());
    }

    let secret_path = secret_path(data_dir);
    match std::fs::read_to_string(&secret_path) {
        Ok(existing) if !existing.trim().is_empty() => return Ok(existing.trim().to_string()),
        Ok(_) => {}
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => return Err(e),
    }

    let secret: String = rng()
        .sample_iter(&Alphanumeric)
        .take(64)
        .map(char::from)
        .collect();
    std::fs::create_dir_all(data_dir)?;
    write_private(&secret_path, secret.as_bytes())?;
    info!(path = %secret_path.display(), "generated new JWT secret");
    Ok(secret)
}

fn secret_path(data_dir: &Path) -> PathBuf {
    data_dir.join("jwt-secret")
}

/// Owner-only temp file, fsync, then rename over `path`.
fn write_private(path: &Path, bytes: &[u8]) -> io::Result<()> {
    let tmp_path = path.with_file_name(format!(".jwt-secret.{}.tmp", Uuid::new_v4().simple()));

    let result = (|| {
        let mut options = OpenOptions::new();
        options.write(true).create_new(true);
        #[cfg(unix)]
        options.mode(0o600);

        let mut file = options.open(&tmp_path)?;
        file.write_all(bytes)?;
        file.sync_all()?;
        std::fs::rename(&tmp_path, path)
    })();

    if result.is_err() {
        let _ = std::fs::remove_file(&tmp_path);
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    const SECRET: &[u8] = b"test-secret-key-at-least-32-characters-long";

    fn service() -> TokenService {
        TokenService::new(SECRET, Duration::minutes(15), Duration::days(7))
    }

    #[test]
    fn access_token_round_trip() {
        let tokens = service();
        let token = tokens.issue_access("alice").unwrap();
        assert_eq!(
            tokens.verify(&token, TokenKind::Access).as_deref(),
            Some("alice")
        );
    }

    #[test]
    fn kinds_are_not_interchangeable() {
        let tokens = service();
        let access = tokens.issue_access("alice").unwrap();
        let refresh = tokens.issue_refresh("alice").unwrap();

        assert!(tokens.verify(&refresh, TokenKind::Access).is_none());
        assert!(tokens.verify(&access, TokenKind::Refresh).is_none());
        assert_eq!(
            tokens.verify(&refresh, TokenKind::Refresh).as_deref(),
            Some("alice")
        );
    }

    #[test]
    fn expired_token_is_rejected() {
        let tokens = TokenService::new(SECRET, Duration::seconds(-5), Duration::days(7));
        let token = tokens.issue_access("alice").unwrap();
        assert!(tokens.verify(&token, TokenKind::Access).is_none());
    }

    #[test]
    fn foreign_signature_is_rejected() {
        let other = TokenService::new(
            b"another-secret-key-entirely-different",
            Duration::minutes(15),
            Duration::days(7),
        );
        let token = other.issue_access("alice").unwrap();
        assert!(service().verify(&token, TokenKind::Access).is_none());
        assert!(service().verify("not.a.jwt", TokenKind::Access).is_none());
    }

    #[test]
    fn identity_resolution_degrades_to_anonymous() {
        let tokens = service();
        let mut headers = HeaderMap::new();
        assert!(tokens.resolve_identity(&headers).is_none());

        headers.insert(AUTHORIZATION, HeaderValue::from_static("Basic abc"));
        assert!(tokens.resolve_identity(&headers).is_none());

        let refresh = tokens.issue_refresh("bob").unwrap();
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {refresh}")).unwrap(),
        );
        assert!(tokens.resolve_identity(&headers).is_none());

        let access = tokens.issue_access("bob").unwrap();
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {access}")).unwrap(),
        );
        assert_eq!(tokens.resolve_identity(&headers).as_deref(), Some("bob"));
    }

    #[test]
    fn secret_is_generated_once_and_reused() {
        let dir = tempfile::tempdir().unwrap();
        let first = resolve_secret(None, dir.path()).unwrap();
        let second = resolve_secret(Some("  "), dir.path()).unwrap();
        assert_eq!(first.len(), 64);
        assert_eq!(first, second);
        assert_eq!(resolve_secret(Some("configured"), dir.path()).unwrap(), "configured");
    }

    #[test]
    fn generated_secret_file_is_owner_only_and_complete() {
        let dir = tempfile::tempdir().unwrap();
        let secret = resolve_secret(None, dir.path()).unwrap();

        let path = dir.path().join("jwt-secret");
        assert_eq!(std::fs::read_to_string(&path).unwrap(), secret);

        let leftovers: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .filter(|name| name != "jwt-secret")
            .collect();
        assert!(leftovers.is_empty(), "unexpected files: {leftovers:?}");

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = std::fs::metadata(&path).unwrap().permissions().mode();
            assert_eq!(mode & 0o777, 0o600);
        }
    }
}
