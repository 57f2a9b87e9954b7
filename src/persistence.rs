//! Persistence adapter for the progress snapshot
//!
//! Snapshots are stored as one JSON document under a single key of a
//! [`KeyValueStore`]. Loading happens once at startup and never fails the
//! caller: missing or corrupt data yields an empty snapshot. Saving goes
//! through [`SaveQueue`], a background writer the store feeds without
//! awaiting.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::{Map, Value};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::analytics::orphaned_keys;
use crate::catalog::{Catalog, PhaseIndex};
use crate::models::{ProgressSnapshot, WorkoutImport};
use crate::storage::{KeyValueStore, StorageError};

pub const DEFAULT_STORAGE_KEY: &str = "training-progress";

// ---------------------------------------------------------------------------
/// Error Handling
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum PersistenceError {
    #[error("Failed to read saved progress: {0}")]
    Load(#[source] StorageError),

    #[error("Saved progress is corrupt: {0}")]
    Corrupt(#[source] serde_json::Error),

    #[error("Failed to encode progress: {0}")]
    Encode(#[source] serde_json::Error),

    #[error("Failed to save progress: {0}")]
    Save(#[source] StorageError),
}

// ---------------------------------------------------------------------------
/// Stored Shape
// ---------------------------------------------------------------------------

/// Snapshot as found in storage. Every field may be absent, null or
/// malformed, e.g. when the document was written by an older revision.
/// Each field is read on its own so one bad value only loses that value.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StoredProgress {
    #[serde(deserialize_with = "lenient_flags")]
    pub completed: BTreeMap<String, bool>,
    #[serde(deserialize_with = "lenient_flags")]
    pub exercises: BTreeMap<String, bool>,
    #[serde(deserialize_with = "lenient_imports")]
    pub workout_data: BTreeMap<String, WorkoutImport>,
    #[serde(deserialize_with = "lenient_value")]
    pub phase: Option<PhaseIndex>,
    #[serde(deserialize_with = "lenient_value")]
    pub last_update: Option<DateTime<Utc>>,
}

fn object_entries(value: Option<Value>) -> Map<String, Value> {
    match value {
        None | Some(Value::Null) => Map::new(),
        Some(Value::Object(entries)) => entries,
        Some(other) => {
            warn!(found = %other, "Saved progress map is not an object, ignoring");
            Map::new()
        }
    }
}

fn lenient_flags<'de, D>(deserializer: D) -> Result<BTreeMap<String, bool>, D::Error>
where
    D: Deserializer<'de>,
{
    let mut flags = BTreeMap::new();
    for (key, value) in object_entries(Option::deserialize(deserializer)?) {
        match value.as_bool() {
            Some(done) => {
                flags.insert(key, done);
            }
            None => warn!(key = %key, "Dropping non-boolean progress flag"),
        }
    }
    Ok(flags)
}

fn lenient_imports<'de, D>(deserializer: D) -> Result<BTreeMap<String, WorkoutImport>, D::Error>
where
    D: Deserializer<'de>,
{
    let mut imports = BTreeMap::new();
    for (key, value) in object_entries(Option::deserialize(deserializer)?) {
        match serde_json::from_value::<WorkoutImport>(value) {
            Ok(import) => {
                imports.insert(key, import);
            }
            Err(e) => warn!(key = %key, error = %e, "Dropping unreadable import record"),
        }
    }
    Ok(imports)
}

fn lenient_value<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(None),
        Some(value) => match serde_json::from_value(value) {
            Ok(parsed) => Ok(Some(parsed)),
            Err(e) => {
                warn!(error = %e, "Ignoring unreadable saved field");
                Ok(None)
            }
        },
    }
}

impl StoredProgress {
    /// Reconcile loaded data with the current plan. An unknown phase falls
    /// back to the catalog default. Keys that no longer match a slot are
    /// kept; they are only reported.
    pub fn merge(self, catalog: &Catalog) -> ProgressSnapshot {
        let selected_phase = match self.phase {
            Some(phase) if catalog.contains(phase) => phase,
            Some(phase) => {
                warn!(
                    phase,
                    fallback = catalog.default_phase(),
                    "Saved phase is not in the plan, using default"
                );
                catalog.default_phase()
            }
            None => catalog.default_phase(),
        };

        let snapshot = ProgressSnapshot {
            completed_workouts: self.completed,
            completed_exercises: self.exercises,
            workout_data: self.workout_data,
            selected_phase,
            last_update: self.last_update,
        };

        let orphans = orphaned_keys(catalog, &snapshot);
        if !orphans.is_empty() {
            warn!(
                count = orphans.len(),
                "Saved progress references slots that are no longer in the plan"
            );
            debug!(?orphans, "Orphaned progress keys");
        }

        snapshot
    }
}

pub fn encode(snapshot: &ProgressSnapshot) -> Result<String, PersistenceError> {
    serde_json::to_string(snapshot).map_err(PersistenceError::Encode)
}

pub fn decode(raw: &str) -> Result<StoredProgress, PersistenceError> {
    serde_json::from_str(raw).map_err(PersistenceError::Corrupt)
}

// ---------------------------------------------------------------------------
/// Adapter
// ---------------------------------------------------------------------------

#[derive(Clone)]
pub struct ProgressPersistence {
    store: Arc<dyn KeyValueStore>,
    key: String,
}

impl ProgressPersistence {
    pub fn new(store: Arc<dyn KeyValueStore>, key: impl Into<String>) -> Self {
        Self {
            store,
            key: key.into(),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Read the stored document. `Ok(None)` means nothing was ever saved.
    pub async fn load(&self) -> Result<Option<StoredProgress>, PersistenceError> {
        let raw = self
            .store
            .get(&self.key)
            .await
            .map_err(PersistenceError::Load)?;
        raw.as_deref().map(decode).transpose()
    }

    /// Startup load merged into live state. Failures degrade to an empty
    /// snapshot on the catalog's default phase.
    pub async fn load_or_default(&self, catalog: &Catalog) -> ProgressSnapshot {
        match self.load().await {
            Ok(Some(stored)) => {
                let snapshot = stored.merge(catalog);
                info!(
                    workouts = snapshot.completed_workouts.len(),
                    exercises = snapshot.completed_exercises.len(),
                    imports = snapshot.workout_data.len(),
                    phase = snapshot.selected_phase,
                    "Loaded saved progress"
                );
                snapshot
            }
            Ok(None) => {
                info!("No saved progress, starting fresh");
                ProgressSnapshot::empty(catalog.default_phase())
            }
            Err(e) => {
                warn!(error = %e, "Ignoring unreadable saved progress");
                ProgressSnapshot::empty(catalog.default_phase())
            }
        }
    }

    pub async fn save(&self, snapshot: &ProgressSnapshot) -> Result<(), PersistenceError> {
        let raw = encode(snapshot)?;
        self.store
            .set(&self.key, &raw)
            .await
            .map_err(PersistenceError::Save)?;
        debug!(bytes = raw.len(), "Progress saved");
        Ok(())
    }
}

// ---------------------------------------------------------------------------
/// Background Writer
// ---------------------------------------------------------------------------

/// Sending side of the save queue. Cheap to clone, never blocks.
#[derive(Clone)]
pub struct SaveHandle {
    wake: mpsc::Sender<()>,
    latest: Arc<Mutex<Option<ProgressSnapshot>>>,
}

impl SaveHandle {
    /// Hand a snapshot to the writer. Only the newest pending snapshot is
    /// kept, so a slow write never holds back later state.
    pub fn submit(&self, snapshot: ProgressSnapshot) {
        match self.latest.lock() {
            Ok(mut slot) => *slot = Some(snapshot),
            Err(_) => {
                warn!("Save slot lock poisoned, snapshot dropped");
                return;
            }
        }

        match self.wake.try_send(()) {
            // Full: a wake-up is already pending and will pick up the slot
            Ok(()) | Err(mpsc::error::TrySendError::Full(())) => {}
            Err(mpsc::error::TrySendError::Closed(())) => {
                warn!("Save queue is closed, progress kept in memory only");
            }
        }
    }
}

pub struct SaveQueue {
    handle: SaveHandle,
    shutdown: oneshot::Sender<()>,
    worker: JoinHandle<()>,
}

impl SaveQueue {
    /// Spawn the writer task on the current tokio runtime
    pub fn spawn(persistence: ProgressPersistence, capacity: usize) -> Self {
        let (wake_tx, mut wake_rx) = mpsc::channel::<()>(capacity.max(1));
        let (shutdown_tx, mut shutdown_rx) = oneshot::channel::<()>();
        let latest: Arc<Mutex<Option<ProgressSnapshot>>> = Arc::new(Mutex::new(None));

        let slot = Arc::clone(&latest);
        let worker = tokio::spawn(async move {
            loop {
                tokio::select! {
                    msg = wake_rx.recv() => {
                        if msg.is_none() {
                            break;
                        }
                        write_pending(&persistence, &slot).await;
                    }
                    _ = &mut shutdown_rx => {
                        break;
                    }
                }
            }
            // Flush whatever arrived before shutdown
            write_pending(&persistence, &slot).await;
            debug!("Save queue stopped");
        });

        Self {
            handle: SaveHandle {
                wake: wake_tx,
                latest,
            },
            shutdown: shutdown_tx,
            worker,
        }
    }

    pub fn handle(&self) -> SaveHandle {
        self.handle.clone()
    }

    /// Stop the writer after flushing the newest pending snapshot
    pub async fn shutdown(self) {
        let _ = self.shutdown.send(());
        if let Err(e) = self.worker.await {
            warn!(error = %e, "Save queue worker ended abnormally");
        }
    }
}

async fn write_pending(persistence: &ProgressPersistence, slot: &Mutex<Option<ProgressSnapshot>>) {
    let pending = match slot.lock() {
        Ok(mut guard) => guard.take(),
        Err(_) => None,
    };
    if let Some(snapshot) = pending {
        // In-memory state stays authoritative; the next change retries.
        if let Err(e) = persistence.save(&snapshot).await {
            warn!(error = %e, "Save failed");
        }
    }
}
