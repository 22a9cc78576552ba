//! Per-user prediction history.
//!
//! Each user owns `<dir>/<lowercased username>.json`, a JSON array of
//! [`HistoryRecord`]s in insertion order. Every mutation is a load, modify,
//! atomic-save transaction under that user's mutex; different users never
//! contend with each other.

use std::path::PathBuf;
use std::sync::Arc;

use chrono::Utc;
use dashmap::DashMap;
use tokio::sync::Mutex;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::models::history::HistoryRecord;
use crate::services::json_store::{self, StoreError};

pub struct HistoryStore {
    dir: PathBuf,
    locks: DashMap<String, Arc<Mutex<()>>>,
}

/// Storage key for a username. Lookups are case-insensitive.
fn storage_key(username: &str) -> String {
    username.to_lowercase()
}

impl HistoryStore {
    pub fn new(dir: PathBuf) -> Self {
        Self {
            dir,
            locks: DashMap::new(),
        }
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }

    fn lock_for(&self, key: &str) -> Arc<Mutex<()>> {
        self.locks
            .entry(key.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Append a record and return its id.
    pub async fn append(
        &self,
        username: &str,
        food_name: &str,
        confidence: f64,
        image_base64: Option<String>,
    ) -> Result<Uuid, StoreError> {
        let key = storage_key(username);
        let lock = self.lock_for(&key);
        let _guard = lock.lock().await;

        let path = self.path_for(&key);
        let mut records: Vec<HistoryRecord> = json_store::load(&path).await?;

        let record = HistoryRecord {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            food_name: food_name.to_string(),
            confidence,
            image_base64,
        };
        let id = record.id;
        records.push(record);

        json_store::save_atomic(&path, &records).await?;
        debug!(username = %key, record_id = %id, total = records.len(), "history record appended");
        Ok(id)
    }

    /// Up to `limit` records, newest first.
    ///
    /// A corrupt or unreadable file is logged and read as empty.
    pub async fn list_recent(&self, username: &str, limit: usize) -> Vec<HistoryRecord> {
        let key = storage_key(username);
        let path = self.path_for(&key);

        match json_store::load::<Vec<HistoryRecord>>(&path).await {
            Ok(records) => records.into_iter().rev().take(limit).collect(),
            Err(e) => {
                warn!(username = %key, error = %e, "history unreadable, returning empty list");
                Vec::new()
            }
        }
    }

    /// Remove one record by id. Returns `false` (and writes nothing) when no
    /// record has that id.
    pub async fn delete_one(&self, username: &str, record_id: Uuid) -> Result<bool, StoreError> {
        let key = storage_key(username);
        let lock = self.lock_for(&key);
        let _guard = lock.lock().await;

        let path = self.path_for(&key);
        let mut records: Vec<HistoryRecord> = json_store::load(&path).await?;
        let before = records.len();
        records.retain(|r| r.id != record_id);

        if records.len() == before {
            return Ok(false);
        }

        json_store::save_atomic(&path, &records).await?;
        debug!(username = %key, record_id = %record_id, "history record deleted");
        Ok(true)
    }

    /// Remove every record the user owns.
    pub async fn delete_all(&self, username: &str) -> Result<(), StoreError> {
        let key = storage_key(username);
        let lock = self.lock_for(&key);
        let _guard = lock.lock().await;

        let empty: Vec<HistoryRecord> = Vec::new();
        json_store::save_atomic(&self.path_for(&key), &empty).await?;
        debug!(username = %key, "history cleared");
        Ok(())
    }
}
