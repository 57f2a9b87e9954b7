use serde::Serialize;

use crate::catalog::{CatalogError, PhaseIndex};
use crate::config::ConfigError;
use crate::import::ImportError;
use crate::keys::{Category, KeyParseError};
use crate::persistence::PersistenceError;

/// ---------------------------------------------------------------------------
/// Error Handling
/// ---------------------------------------------------------------------------

/// Every failure the tracker can surface. None of them is fatal: callers
/// keep the in-memory state and continue accepting input.
#[derive(Debug, thiserror::Error)]
pub enum TrackerError {
  #[error(transparent)]
  Config(#[from] ConfigError),

  #[error(transparent)]
  Catalog(#[from] CatalogError),

  /// Load or save of the snapshot failed
  #[error(transparent)]
  Persistence(#[from] PersistenceError),

  /// File could not be imported; nothing was recorded
  #[error("Import failed: {0}")]
  Import(#[from] ImportError),

  /// A raw completion key did not parse
  #[error(transparent)]
  Key(#[from] KeyParseError),

  #[error("Phase {0} is not part of the plan")]
  PhaseNotFound(PhaseIndex),

  #[error("No {category} workout on '{day}' in week {week} of phase {phase}")]
  SlotNotFound {
    phase: PhaseIndex,
    week: u32,
    category: Category,
    day: String,
  },

  #[error("Exercise {index} does not exist in '{day}' (week {week}, phase {phase})")]
  ExerciseNotFound {
    phase: PhaseIndex,
    week: u32,
    day: String,
    index: usize,
  },

  #[error("Progress store is unavailable")]
  StoreUnavailable,
}

impl TrackerError {
  /// Catalog lookups that missed. Callers render a fallback for these.
  pub fn is_lookup_miss(&self) -> bool {
    matches!(
      self,
      Self::PhaseNotFound(_) | Self::SlotNotFound { .. } | Self::ExerciseNotFound { .. }
    )
  }
}

impl Serialize for TrackerError {
  fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
  where
    S: serde::Serializer,
  {
    serializer.serialize_str(&self.to_string())
  }
}
