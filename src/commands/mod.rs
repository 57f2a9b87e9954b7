pub mod analysis;
pub mod progress;

use crate::app::AppState;
use crate::catalog::{Phase, PhaseIndex, PhaseWorkouts};
use crate::error::TrackerError;
use crate::models::ProgressSnapshot;
use crate::store::PhaseChange;

pub fn get_phases(state: &AppState) -> Vec<Phase> {
  state.catalog.phases().cloned().collect()
}

/// Workouts of a phase (the selected one by default). A phase outside the
/// plan yields an empty week.
pub fn get_phase_workouts(state: &AppState, phase: Option<PhaseIndex>) -> Result<PhaseWorkouts, TrackerError> {
  let phase = resolve_phase(state, phase)?;
  Ok(state.catalog.workouts_or_empty(phase).clone())
}

pub fn select_phase(state: &AppState, phase: PhaseIndex) -> Result<PhaseChange, TrackerError> {
  if !state.catalog.contains(phase) {
    return Err(TrackerError::PhaseNotFound(phase));
  }
  let mut store = state.store()?;
  Ok(store.set_phase(phase))
}

pub fn get_progress_snapshot(state: &AppState) -> Result<ProgressSnapshot, TrackerError> {
  Ok(state.store()?.snapshot().clone())
}

/// Persist the current state and report a storage failure to the caller
pub async fn save_progress(state: &AppState) -> Result<(), TrackerError> {
  state.save_now().await
}

pub(crate) fn resolve_phase(state: &AppState, phase: Option<PhaseIndex>) -> Result<PhaseIndex, TrackerError> {
  match phase {
    Some(index) => Ok(index),
    None => Ok(state.store()?.selected_phase()),
  }
}
