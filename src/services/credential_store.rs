//! File-backed username/password store.
//!
//! All credentials live in one JSON array. Writers are serialized by a
//! store-wide mutex; readers load the last committed snapshot without locking,
//! which is safe because saves replace the file atomically.

use std::path::PathBuf;

use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::error::AppError;
use crate::models::user::Credential;
use crate::services::json_store::{self, StoreError};

/// Credential store failures.
#[derive(Debug, thiserror::Error)]
pub enum CredentialError {
    #[error("Username already exists")]
    UsernameTaken,

    #[error("password hashing failed: {0}")]
    Hashing(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl From<CredentialError> for AppError {
    fn from(e: CredentialError) -> Self {
        match e {
            CredentialError::UsernameTaken => AppError::Validation(e.to_string()),
            CredentialError::Hashing(msg) => AppError::Internal(msg),
            CredentialError::Store(e) => AppError::from(e),
        }
    }
}

pub struct CredentialStore {
    path: PathBuf,
    cost: u32,
    write_lock: Mutex<()>,
}

impl CredentialStore {
    /// Create a store persisting to `path`, hashing with bcrypt `cost`.
    pub fn new(path: PathBuf, cost: u32) -> Self {
        Self {
            path,
            cost,
            write_lock: Mutex::new(()),
        }
    }

    /// Register a new user.
    ///
    /// # Errors
    ///
    /// - `UsernameTaken` if the username exists in any letter case; history
    ///   files are keyed by the lowercased name
    /// - `Hashing` if bcrypt fails
    /// - `Store` if the collection cannot be read or written
    pub async fn create(&self, username: &str, password: &str) -> Result<(), CredentialError> {
        let _guard = self.write_lock.lock().await;

        let mut users: Vec<Credential> = json_store::load(&self.path).await?;
        let folded = username.to_lowercase();
        if users.iter().any(|u| u.username.to_lowercase() == folded) {
            return Err(CredentialError::UsernameTaken);
        }

        let password_digest = hash_password(password.to_string(), self.cost).await?;
        users.push(Credential {
            username: username.to_string(),
            password_digest,
            created_at: chrono::Utc::now(),
        });

        json_store::save_atomic(&self.path, &users).await?;
        info!(username = %username, "user registered");
        Ok(())
    }

    /// Check `password` against the stored digest for `username`.
    ///
    /// Unknown users and wrong passwords both yield `Ok(false)`.
    pub async fn verify(&self, username: &str, password: &str) -> Result<bool, CredentialError> {
        let users: Vec<Credential> = json_store::load(&self.path).await?;
        let Some(user) = users.into_iter().find(|u| u.username == username) else {
            return Ok(false);
        };

        verify_password(password.to_string(), user.password_digest).await
    }
}

async fn hash_password(password: String, cost: u32) -> Result<String, CredentialError> {
    tokio::task::spawn_blocking(move || bcrypt::hash(password, cost))
        .await
        .map_err(|e| CredentialError::Hashing(format!("hash task failed: {e}")))?
        .map_err(|e| CredentialError::Hashing(format!("bcrypt hash: {e}")))
}

async fn verify_password(password: String, digest: String) -> Result<bool, CredentialError> {
    let outcome = tokio::task::spawn_blocking(move || bcrypt::verify(password, &digest))
        .await
        .map_err(|e| CredentialError::Hashing(format!("verify task failed: {e}")))?;

    match outcome {
        Ok(matches) => Ok(matches),
        Err(e) => {
            // A digest that does not parse can never match.
            warn!(error = %e, "stored password digest is unreadable");
            Ok(false)
        }
    }
}
