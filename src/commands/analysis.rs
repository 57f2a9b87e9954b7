//! Read-only analytics commands

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::analytics::{self, ProgressSummary, WeekProgress};
use crate::app::AppState;
use crate::catalog::PhaseIndex;
use crate::commands::progress::{resolve_slot, SlotRef};
use crate::commands::resolve_phase;
use crate::error::TrackerError;

#[derive(Debug, Clone, Serialize)]
pub struct RecentImport {
    pub key: String,
    pub file_name: String,
    pub upload_date: DateTime<Utc>,
}

pub fn get_summary(state: &AppState) -> Result<ProgressSummary, TrackerError> {
    Ok(state.store()?.summary())
}

pub fn get_week_progress(
    state: &AppState,
    phase: Option<PhaseIndex>,
    week: u32,
) -> Result<WeekProgress, TrackerError> {
    let phase = resolve_phase(state, phase)?;
    let store = state.store()?;
    Ok(analytics::week_progress(&state.catalog, store.snapshot(), phase, week))
}

pub fn get_phase_progress(state: &AppState, phase: Option<PhaseIndex>) -> Result<Vec<WeekProgress>, TrackerError> {
    let phase = resolve_phase(state, phase)?;
    let store = state.store()?;
    Ok(analytics::phase_progress(&state.catalog, store.snapshot(), phase))
}

/// Exercises done and total for one strength session
pub fn get_exercise_progress(state: &AppState, slot: &SlotRef) -> Result<(usize, usize), TrackerError> {
    let key = resolve_slot(state, slot)?;
    let total = state
        .catalog
        .workouts_or_empty(key.phase)
        .strength_by_day(&key.day)
        .map(|w| w.exercises.len())
        .unwrap_or(0);
    let store = state.store()?;
    Ok((store.exercise_progress(&key, total), total))
}

pub fn get_recent_imports(state: &AppState, limit: usize) -> Result<Vec<RecentImport>, TrackerError> {
    let store = state.store()?;
    Ok(analytics::recent_imports(store.snapshot(), limit)
        .into_iter()
        .map(|(key, import)| RecentImport {
            key: key.to_string(),
            file_name: import.file_name.clone(),
            upload_date: import.upload_date,
        })
        .collect())
}
