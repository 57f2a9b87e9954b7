//! Progress analytics
//!
//! Aggregates derived from the snapshot. Two denominators are in play and
//! they differ on purpose:
//! - [`compute_summary`] counts only slots that were toggled at least once
//!   (any key present in the map, true or false). Untouched slots are
//!   invisible to it.
//! - [`week_progress`] divides by every workout the catalog defines for the
//!   phase, whether touched or not.

use serde::{Deserialize, Serialize};

use crate::catalog::{Catalog, PhaseIndex};
use crate::keys::{Category, CompletionKey};
use crate::models::{ProgressSnapshot, WorkoutImport};

/// Rounded percentage; an empty denominator reads as 0 %
fn percent(part: usize, whole: usize) -> u32 {
    if whole == 0 {
        return 0;
    }
    ((part as f64 / whole as f64) * 100.0).round() as u32
}

// ---------------------------------------------------------------------------
/// Summary
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressSummary {
    /// Workout slots toggled at least once
    pub total_workouts: usize,
    pub completed_workouts: usize,
    pub running_completed: usize,
    pub strength_completed: usize,
    /// Exercise slots toggled at least once
    pub total_exercises: usize,
    pub completed_exercises: usize,
    pub import_count: usize,
}

impl ProgressSummary {
    pub fn completion_rate(&self) -> u32 {
        percent(self.completed_workouts, self.total_workouts)
    }

    pub fn exercise_rate(&self) -> u32 {
        percent(self.completed_exercises, self.total_exercises)
    }

    /// Share of completed workouts that were runs
    pub fn running_share(&self) -> u32 {
        percent(self.running_completed, self.completed_workouts)
    }

    /// Share of completed workouts that were strength sessions
    pub fn strength_share(&self) -> u32 {
        percent(self.strength_completed, self.completed_workouts)
    }
}

/// Aggregate counts over every key present in the snapshot. Category
/// attribution matches the token inside the raw key, it does not consult
/// the catalog.
pub fn compute_summary(snapshot: &ProgressSnapshot) -> ProgressSummary {
    let mut summary = ProgressSummary {
        import_count: snapshot.workout_data.len(),
        ..Default::default()
    };

    for (key, &done) in &snapshot.completed_workouts {
        summary.total_workouts += 1;
        if done {
            summary.completed_workouts += 1;
            if Category::Running.matches_key(key) {
                summary.running_completed += 1;
            }
            if Category::Strength.matches_key(key) {
                summary.strength_completed += 1;
            }
        }
    }

    summary.total_exercises = snapshot.completed_exercises.len();
    summary.completed_exercises = snapshot.completed_exercises.values().filter(|&&done| done).count();

    summary
}

// ---------------------------------------------------------------------------
/// Week / Phase Progress
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeekProgress {
    pub phase: PhaseIndex,
    pub week: u32,
    pub completed: usize,
    /// Workouts the catalog defines for one week of the phase
    pub total: usize,
}

impl WeekProgress {
    pub fn percent(&self) -> u32 {
        percent(self.completed, self.total)
    }
}

/// Completion of one week against the full catalog week. An unknown phase
/// reports an empty week.
pub fn week_progress(
    catalog: &Catalog,
    snapshot: &ProgressSnapshot,
    phase: PhaseIndex,
    week: u32,
) -> WeekProgress {
    let keys = catalog.workout_keys(phase, week);
    let completed = keys
        .iter()
        .filter(|key| is_set(&snapshot.completed_workouts, &key.to_string()))
        .count();

    WeekProgress {
        phase,
        week,
        completed,
        total: keys.len(),
    }
}

/// Week-by-week progress for every week of a phase
pub fn phase_progress(catalog: &Catalog, snapshot: &ProgressSnapshot, phase: PhaseIndex) -> Vec<WeekProgress> {
    let weeks = catalog.get_phase(phase).map(|p| p.weeks).unwrap_or(0);
    (1..=weeks)
        .map(|week| week_progress(catalog, snapshot, phase, week))
        .collect()
}

// ---------------------------------------------------------------------------
/// Exercise Progress
// ---------------------------------------------------------------------------

/// Completed exercises among indices `0..total_exercises` of one workout
pub fn exercise_progress(snapshot: &ProgressSnapshot, workout: &CompletionKey, total_exercises: usize) -> usize {
    let slot = workout.workout_slot();
    (0..total_exercises)
        .filter(|&i| is_set(&snapshot.completed_exercises, &slot.exercise(i).to_string()))
        .count()
}

// ---------------------------------------------------------------------------
/// Imports / Diagnostics
// ---------------------------------------------------------------------------

/// Most recent imports first
pub fn recent_imports(snapshot: &ProgressSnapshot, limit: usize) -> Vec<(&str, &WorkoutImport)> {
    let mut imports: Vec<(&str, &WorkoutImport)> = snapshot
        .workout_data
        .iter()
        .map(|(key, import)| (key.as_str(), import))
        .collect();
    imports.sort_by(|a, b| b.1.upload_date.cmp(&a.1.upload_date));
    imports.truncate(limit);
    imports
}

/// Stored keys that no longer address a slot in the catalog, e.g. after a
/// day label was renamed. Their progress is unreachable but kept.
pub fn orphaned_keys(catalog: &Catalog, snapshot: &ProgressSnapshot) -> Vec<String> {
    snapshot
        .completed_workouts
        .keys()
        .chain(snapshot.completed_exercises.keys())
        .chain(snapshot.workout_data.keys())
        .filter(|raw| match raw.parse::<CompletionKey>() {
            Ok(key) => !catalog.has_slot(&key),
            Err(_) => true,
        })
        .cloned()
        .collect()
}

fn is_set(map: &std::collections::BTreeMap<String, bool>, key: &str) -> bool {
    map.get(key).copied().unwrap_or(false)
}
