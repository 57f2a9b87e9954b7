use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::storage::StorageError;

pub type DbPool = SqlitePool;

const APP_DIR: &str = "halfmarathon-tracker";
const DB_FILE: &str = "tracker.db";

/// Default location of the database file
/// e.g. ~/.local/share/halfmarathon-tracker/tracker.db
pub fn default_db_path() -> PathBuf {
  dirs::data_dir()
    .unwrap_or_else(|| PathBuf::from("."))
    .join(APP_DIR)
    .join(DB_FILE)
}

/// Initialize the database connection pool and run migrations
pub async fn initialize_db(db_path: &Path) -> Result<DbPool, StorageError> {
  // Create directory if it doesn't exist
  if let Some(parent) = db_path.parent() {
    if !parent.as_os_str().is_empty() {
      fs::create_dir_all(parent)?;
    }
  }

  let db_url = format!("sqlite://{}?mode=rwc", db_path.display());
  info!("Initializing database at: {}", db_path.display());

  let pool = SqlitePoolOptions::new()
    .max_connections(5)
    .connect(&db_url)
    .await?;

  sqlx::migrate!("./migrations").run(&pool).await?;

  info!("Database initialized successfully");

  Ok(pool)
}
