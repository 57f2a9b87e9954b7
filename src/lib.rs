//! Half-marathon training plan tracker
//!
//! Read-only plan catalog, completion progress keyed against it, derived
//! analytics and snapshot persistence over a key-value store.

pub mod analytics;
pub mod app;
pub mod catalog;
pub mod commands;
pub mod config;
pub mod db;
pub mod error;
pub mod import;
pub mod keys;
pub mod models;
pub mod persistence;
pub mod storage;
pub mod store;

#[cfg(test)]
mod test_utils;

pub use app::AppState;
pub use catalog::{Catalog, PhaseIndex};
pub use config::TrackerConfig;
pub use error::TrackerError;
pub use keys::{Category, CompletionKey};
pub use models::{ProgressSnapshot, WorkoutImport};
pub use store::ProgressStore;
