use std::env;
use std::path::PathBuf;

use crate::db::default_db_path;
use crate::persistence::DEFAULT_STORAGE_KEY;

/// ---------------------------------------------------------------------------
/// Configuration Constants
/// ---------------------------------------------------------------------------

const DB_PATH_VAR: &str = "TRACKER_DB_PATH";
const STORAGE_KEY_VAR: &str = "TRACKER_STORAGE_KEY";
const PLAN_FILE_VAR: &str = "TRACKER_PLAN_FILE";
const SAVE_QUEUE_VAR: &str = "TRACKER_SAVE_QUEUE";
const DEFAULT_SAVE_QUEUE: usize = 64;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
  #[error("Invalid value for {var}: '{value}'")]
  Invalid { var: &'static str, value: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackerConfig {
  pub db_path: PathBuf,
  pub storage_key: String,
  /// Replaces the built-in plan when set
  pub plan_file: Option<PathBuf>,
  pub save_queue_capacity: usize,
}

impl Default for TrackerConfig {
  fn default() -> Self {
    Self {
      db_path: default_db_path(),
      storage_key: DEFAULT_STORAGE_KEY.to_string(),
      plan_file: None,
      save_queue_capacity: DEFAULT_SAVE_QUEUE,
    }
  }
}

impl TrackerConfig {
  /// Read configuration from the environment. Call `dotenvy::dotenv()`
  /// first to pick up a `.env` file.
  pub fn from_env() -> Result<Self, ConfigError> {
    let defaults = Self::default();

    let storage_key = match non_empty_var(STORAGE_KEY_VAR) {
      Some(key) => key,
      None => defaults.storage_key,
    };

    let save_queue_capacity = match non_empty_var(SAVE_QUEUE_VAR) {
      Some(raw) => match raw.parse::<usize>() {
        Ok(n) if n > 0 => n,
        _ => {
          return Err(ConfigError::Invalid {
            var: SAVE_QUEUE_VAR,
            value: raw,
          })
        }
      },
      None => defaults.save_queue_capacity,
    };

    Ok(Self {
      db_path: non_empty_var(DB_PATH_VAR)
        .map(PathBuf::from)
        .unwrap_or(defaults.db_path),
      storage_key,
      plan_file: non_empty_var(PLAN_FILE_VAR).map(PathBuf::from),
      save_queue_capacity,
    })
  }
}

fn non_empty_var(name: &str) -> Option<String> {
  env::var(name).ok().filter(|v| !v.trim().is_empty())
}
