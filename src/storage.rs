//! Key-value storage behind the progress snapshot
//!
//! The tracker only needs `get` and `set` on string values. Two backends:
//! SQLite (the durable one) and an in-process map.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;
use sqlx::Row;

use crate::db::DbPool;

/// ---------------------------------------------------------------------------
/// Error Handling
/// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
  #[error("Database error: {0}")]
  Database(#[from] sqlx::Error),

  #[error("Migration failed: {0}")]
  Migration(#[from] sqlx::migrate::MigrateError),

  #[error("I/O error: {0}")]
  Io(#[from] std::io::Error),

  #[error("Storage unavailable: {0}")]
  Unavailable(String),
}

/// ---------------------------------------------------------------------------
/// Store Contract
/// ---------------------------------------------------------------------------

#[async_trait]
pub trait KeyValueStore: Send + Sync {
  async fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

  async fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;
}

/// ---------------------------------------------------------------------------
/// SQLite Backend
/// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct SqliteKeyValueStore {
  pool: DbPool,
}

impl SqliteKeyValueStore {
  pub fn new(pool: DbPool) -> Self {
    Self { pool }
  }
}

#[async_trait]
impl KeyValueStore for SqliteKeyValueStore {
  async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
    let row = sqlx::query("SELECT value FROM kv_store WHERE key = ?")
      .bind(key)
      .fetch_optional(&self.pool)
      .await?;

    Ok(row.map(|r| r.get::<String, _>("value")))
  }

  async fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
    sqlx::query(
      r#"
      INSERT INTO kv_store (key, value, updated_at)
      VALUES (?1, ?2, ?3)
      ON CONFLICT(key) DO UPDATE SET
        value = excluded.value,
        updated_at = excluded.updated_at
      "#,
    )
    .bind(key)
    .bind(value)
    .bind(Utc::now().to_rfc3339())
    .execute(&self.pool)
    .await?;

    Ok(())
  }
}

/// ---------------------------------------------------------------------------
/// In-Memory Backend
/// ---------------------------------------------------------------------------

/// Process-local store. Writes can be switched off to model a denied or
/// full storage area.
#[derive(Debug, Default)]
pub struct MemoryKeyValueStore {
  entries: Mutex<HashMap<String, String>>,
  read_only: AtomicBool,
}

impl MemoryKeyValueStore {
  pub fn new() -> Self {
    Self::default()
  }

  /// Seed a raw value, bypassing the read-only switch
  pub fn with_entry(key: &str, value: &str) -> Self {
    let store = Self::new();
    if let Ok(mut entries) = store.entries.lock() {
      entries.insert(key.to_string(), value.to_string());
    }
    store
  }

  pub fn set_read_only(&self, read_only: bool) {
    self.read_only.store(read_only, Ordering::SeqCst);
  }
}

#[async_trait]
impl KeyValueStore for MemoryKeyValueStore {
  async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
    let entries = self
      .entries
      .lock()
      .map_err(|_| StorageError::Unavailable("memory store lock poisoned".into()))?;
    Ok(entries.get(key).cloned())
  }

  async fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
    if self.read_only.load(Ordering::SeqCst) {
      return Err(StorageError::Unavailable("writes are disabled".into()));
    }
    let mut entries = self
      .entries
      .lock()
      .map_err(|_| StorageError::Unavailable("memory store lock poisoned".into()))?;
    entries.insert(key.to_string(), value.to_string());
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[tokio::test]
  async fn test_sqlite_get_missing_key() {
    let pool = crate::test_utils::setup_test_db().await;
    let store = SqliteKeyValueStore::new(pool.clone());

    let value = store.get("training-progress").await.expect("Should query");
    assert!(value.is_none());

    crate::test_utils::teardown_test_db(pool).await;
  }

  #[tokio::test]
  async fn test_sqlite_set_overwrites() {
    let pool = crate::test_utils::setup_test_db().await;
    let store = SqliteKeyValueStore::new(pool.clone());

    store.set("training-progress", "{\"phase\":1}").await.expect("first write");
    store.set("training-progress", "{\"phase\":2}").await.expect("second write");

    let value = store.get("training-progress").await.expect("Should query");
    assert_eq!(value.as_deref(), Some("{\"phase\":2}"));

    let (rows,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM kv_store")
      .fetch_one(&pool)
      .await
      .expect("count rows");
    assert_eq!(rows, 1);

    crate::test_utils::teardown_test_db(pool).await;
  }

  #[tokio::test]
  async fn test_memory_store_read_only_rejects_writes() {
    let store = MemoryKeyValueStore::with_entry("k", "old");
    store.set_read_only(true);

    let result = store.set("k", "new").await;
    assert!(matches!(result, Err(StorageError::Unavailable(_))));
    assert_eq!(store.get("k").await.unwrap().as_deref(), Some("old"));

    store.set_read_only(false);
    store.set("k", "new").await.expect("writes enabled again");
    assert_eq!(store.get("k").await.unwrap().as_deref(), Some("new"));
  }
}
