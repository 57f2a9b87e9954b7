use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::catalog::PhaseIndex;

/// Longest content excerpt kept from an imported file, in characters
pub const MAX_EXCERPT_CHARS: usize = 1000;

/// Metadata attached to a workout slot by a file import.
/// The file format is never interpreted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkoutImport {
  pub file_name: String,
  pub upload_date: DateTime<Utc>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub content: Option<String>,
}

impl WorkoutImport {
  /// Build an import record, truncating the excerpt to `MAX_EXCERPT_CHARS`
  pub fn new(file_name: impl Into<String>, upload_date: DateTime<Utc>, content: Option<&str>) -> Self {
    Self {
      file_name: file_name.into(),
      upload_date,
      content: content.map(truncate_excerpt),
    }
  }
}

fn truncate_excerpt(content: &str) -> String {
  content.chars().take(MAX_EXCERPT_CHARS).collect()
}

/// Complete persisted progress state. Maps are keyed by completion key
/// strings so the serialized form stays stable across plan revisions.
/// Decoding goes through `persistence::StoredProgress`, which tolerates
/// partial documents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressSnapshot {
  #[serde(rename = "completed")]
  pub completed_workouts: BTreeMap<String, bool>,
  #[serde(rename = "exercises")]
  pub completed_exercises: BTreeMap<String, bool>,
  pub workout_data: BTreeMap<String, WorkoutImport>,
  #[serde(rename = "phase")]
  pub selected_phase: PhaseIndex,
  pub last_update: Option<DateTime<Utc>>,
}

impl ProgressSnapshot {
  /// First-run state: nothing completed, cursor on the given phase
  pub fn empty(selected_phase: PhaseIndex) -> Self {
    Self {
      completed_workouts: BTreeMap::new(),
      completed_exercises: BTreeMap::new(),
      workout_data: BTreeMap::new(),
      selected_phase,
      last_update: None,
    }
  }

  /// Whether any progress has been recorded at all
  pub fn is_blank(&self) -> bool {
    self.completed_workouts.is_empty()
      && self.completed_exercises.is_empty()
      && self.workout_data.is_empty()
  }
}
