//! Test utilities and helpers for unit testing
//!
//! This module provides common test infrastructure including:
//! - Database setup/teardown
//! - Seeded progress snapshots
//! - Application state over an in-memory store

use std::sync::Arc;

use chrono::{Duration, Utc};
use sqlx::SqlitePool;

use crate::app::AppState;
use crate::catalog::Catalog;
use crate::models::{ProgressSnapshot, WorkoutImport};
use crate::persistence::DEFAULT_STORAGE_KEY;
use crate::storage::MemoryKeyValueStore;

/// ---------------------------------------------------------------------------
/// Database Test Utilities
/// ---------------------------------------------------------------------------

/// Create an in-memory SQLite database for testing
/// Runs all migrations and returns a ready-to-use pool
///
/// Uses max_connections(1) to prevent multiple pool connections from creating
/// isolated in-memory databases, which would cause intermittent test failures
pub async fn setup_test_db() -> SqlitePool {
  let pool = sqlx::sqlite::SqlitePoolOptions::new()
    .max_connections(1)
    .connect("sqlite::memory:")
    .await
    .expect("Failed to create in-memory database");

  sqlx::migrate!("./migrations")
    .run(&pool)
    .await
    .expect("Failed to run migrations");

  pool
}

/// Close a test database pool
pub async fn teardown_test_db(pool: SqlitePool) {
  pool.close().await;
}

/// ---------------------------------------------------------------------------
/// Progress Fixtures
/// ---------------------------------------------------------------------------

/// A snapshot with some of everything: finished and reverted workouts,
/// exercises, an import and a pre-season entry
pub fn seeded_snapshot() -> ProgressSnapshot {
  let now = Utc::now();
  let mut snapshot = ProgressSnapshot::empty(1);

  snapshot.completed_workouts.insert("0-1-corrida-Segunda".into(), true);
  snapshot.completed_workouts.insert("0-1-musculacao-Terça".into(), true);
  snapshot.completed_workouts.insert("0-2-corrida-Quarta".into(), false);
  snapshot.completed_workouts.insert("-1-4-corrida-Sábado".into(), true);

  for i in 0..3 {
    snapshot
      .completed_exercises
      .insert(format!("0-1-musculacao-Terça-ex-{}", i), i != 1);
  }

  snapshot.workout_data.insert(
    "0-1-corrida-Segunda".into(),
    WorkoutImport::new("segunda.gpx", now - Duration::hours(2), Some("<gpx version=\"1.1\"/>")),
  );
  snapshot.last_update = Some(now);

  snapshot
}

/// ---------------------------------------------------------------------------
/// Application State
/// ---------------------------------------------------------------------------

/// App state on the built-in plan with nothing saved yet
pub async fn memory_app_state() -> AppState {
  let catalog = Catalog::builtin().expect("builtin plan");
  AppState::with_store(catalog, Arc::new(MemoryKeyValueStore::new()), DEFAULT_STORAGE_KEY, 8).await
}
