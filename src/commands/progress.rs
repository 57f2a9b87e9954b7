//! Commands that mutate progress

use std::path::Path;

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::app::AppState;
use crate::catalog::PhaseIndex;
use crate::commands::resolve_phase;
use crate::error::TrackerError;
use crate::import::read_import;
use crate::keys::{Category, CompletionKey};
use crate::models::WorkoutImport;

/// A workout slot as addressed by a caller. `phase: None` means the
/// currently selected phase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotRef {
    pub phase: Option<PhaseIndex>,
    pub week: u32,
    pub category: Category,
    pub day: String,
}

/// Turn a slot reference into its completion key, checking it against the plan
pub fn resolve_slot(state: &AppState, slot: &SlotRef) -> Result<CompletionKey, TrackerError> {
    let phase = resolve_phase(state, slot.phase)?;
    let key = CompletionKey::workout(phase, slot.week, slot.category, slot.day.as_str());
    if !state.catalog.has_slot(&key) {
        return Err(TrackerError::SlotNotFound {
            phase,
            week: slot.week,
            category: slot.category,
            day: slot.day.clone(),
        });
    }
    Ok(key)
}

/// Flip a workout slot; returns the new completion state
pub fn toggle_workout(state: &AppState, slot: &SlotRef) -> Result<bool, TrackerError> {
    let key = resolve_slot(state, slot)?;
    let mut store = state.store()?;
    Ok(store.toggle_workout(&key))
}

/// Flip one exercise of a strength session; returns the new state
pub fn toggle_exercise(state: &AppState, slot: &SlotRef, exercise_index: usize) -> Result<bool, TrackerError> {
    let key = resolve_slot(state, slot)?;
    if !state.catalog.has_slot(&key.exercise(exercise_index)) {
        return Err(TrackerError::ExerciseNotFound {
            phase: key.phase,
            week: key.week,
            day: key.day.clone(),
            index: exercise_index,
        });
    }
    let mut store = state.store()?;
    Ok(store.toggle_exercise(&key, exercise_index))
}

/// Flip a workout or exercise given its raw completion key, e.g.
/// `-1-2-musculacao-Terça-ex-3`
pub fn toggle_key(state: &AppState, raw_key: &str) -> Result<bool, TrackerError> {
    let key: CompletionKey = raw_key.parse()?;
    let slot = SlotRef {
        phase: Some(key.phase),
        week: key.week,
        category: key.category,
        day: key.day,
    };
    match key.exercise {
        Some(index) => toggle_exercise(state, &slot, index),
        None => toggle_workout(state, &slot),
    }
}

/// Attach a watch export to a slot. On any failure nothing is recorded.
pub async fn import_workout_file(
    state: &AppState,
    slot: &SlotRef,
    path: &Path,
) -> Result<WorkoutImport, TrackerError> {
    let key = resolve_slot(state, slot)?;
    let import = read_import(path, Utc::now()).await?;

    let mut store = state.store()?;
    store.record_import(&key, import.clone());
    Ok(import)
}
