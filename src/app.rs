use std::sync::{Arc, Mutex, MutexGuard};

use tracing::{error, info};

use crate::catalog::Catalog;
use crate::config::TrackerConfig;
use crate::db;
use crate::error::TrackerError;
use crate::persistence::{ProgressPersistence, SaveQueue};
use crate::storage::{KeyValueStore, MemoryKeyValueStore, SqliteKeyValueStore};
use crate::store::ProgressStore;

/// Application state shared by the command layer
pub struct AppState {
  pub catalog: Catalog,
  store: Mutex<ProgressStore>,
  persistence: ProgressPersistence,
  save_queue: SaveQueue,
}

impl AppState {
  /// Load the plan, open storage and restore saved progress. Storage that
  /// cannot be opened degrades to an in-memory store for this session.
  pub async fn initialize(config: &TrackerConfig) -> Result<Self, TrackerError> {
    let catalog = match &config.plan_file {
      Some(path) => {
        info!("Loading plan from {}", path.display());
        Catalog::from_file(path)?
      }
      None => Catalog::builtin()?,
    };

    let kv: Arc<dyn KeyValueStore> = match db::initialize_db(&config.db_path).await {
      Ok(pool) => Arc::new(SqliteKeyValueStore::new(pool)),
      Err(e) => {
        error!("Failed to initialize database: {}", e);
        Arc::new(MemoryKeyValueStore::new())
      }
    };

    Ok(Self::with_store(catalog, kv, &config.storage_key, config.save_queue_capacity).await)
  }

  /// Build state on an already opened key-value store
  pub async fn with_store(
    catalog: Catalog,
    kv: Arc<dyn KeyValueStore>,
    storage_key: &str,
    save_queue_capacity: usize,
  ) -> Self {
    let persistence = ProgressPersistence::new(kv, storage_key);
    let snapshot = persistence.load_or_default(&catalog).await;
    let save_queue = SaveQueue::spawn(persistence.clone(), save_queue_capacity);
    let store = ProgressStore::with_saver(snapshot, save_queue.handle());

    Self {
      catalog,
      store: Mutex::new(store),
      persistence,
      save_queue,
    }
  }

  pub fn store(&self) -> Result<MutexGuard<'_, ProgressStore>, TrackerError> {
    self.store.lock().map_err(|_| TrackerError::StoreUnavailable)
  }

  /// Write the current snapshot and wait for the result. Background saves
  /// only log their failures; this surfaces them.
  pub async fn save_now(&self) -> Result<(), TrackerError> {
    let snapshot = self.store()?.snapshot().clone();
    self.persistence.save(&snapshot).await?;
    Ok(())
  }

  /// Flush pending saves and stop the writer
  pub async fn shutdown(self) {
    self.save_queue.shutdown().await;
  }
}
