//! Progress store
//!
//! Owns the live [`ProgressSnapshot`] and every operation that mutates it.
//! All operations are synchronous. When a save handle is attached, each
//! effective change hands a copy of the snapshot to the background writer
//! without waiting for it.

use chrono::Utc;
use tracing::debug;

use crate::analytics::{self, ProgressSummary};
use crate::catalog::PhaseIndex;
use crate::keys::{Category, CompletionKey};
use crate::models::{ProgressSnapshot, WorkoutImport};
use crate::persistence::SaveHandle;

// ---------------------------------------------------------------------------
/// Change Signals
// ---------------------------------------------------------------------------

/// Result of selecting a phase. Receiving one means any open week/day detail
/// view must collapse, even when the same phase was selected again.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[must_use]
pub struct PhaseChange {
    pub previous: PhaseIndex,
    pub current: PhaseIndex,
}

impl PhaseChange {
    pub fn moved(&self) -> bool {
        self.previous != self.current
    }
}

/// Which week and category list a renderer has expanded
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DetailCursor {
    pub expanded_week: Option<u32>,
    pub expanded_category: Option<(u32, Category)>,
}

impl DetailCursor {
    /// Expand `week`, or collapse it if it is already open
    pub fn toggle_week(&mut self, week: u32) {
        self.expanded_week = if self.expanded_week == Some(week) {
            None
        } else {
            Some(week)
        };
    }

    pub fn toggle_category(&mut self, week: u32, category: Category) {
        let target = Some((week, category));
        self.expanded_category = if self.expanded_category == target {
            None
        } else {
            target
        };
    }

    pub fn apply(&mut self, _change: &PhaseChange) {
        *self = Self::default();
    }
}

// ---------------------------------------------------------------------------
/// Store
// ---------------------------------------------------------------------------

pub struct ProgressStore {
    snapshot: ProgressSnapshot,
    saver: Option<SaveHandle>,
}

impl ProgressStore {
    /// Store without persistence, e.g. for previews and tests
    pub fn new(snapshot: ProgressSnapshot) -> Self {
        Self {
            snapshot,
            saver: None,
        }
    }

    pub fn with_saver(snapshot: ProgressSnapshot, saver: SaveHandle) -> Self {
        Self {
            snapshot,
            saver: Some(saver),
        }
    }

    pub fn snapshot(&self) -> &ProgressSnapshot {
        &self.snapshot
    }

    pub fn selected_phase(&self) -> PhaseIndex {
        self.snapshot.selected_phase
    }

    /// Flip a workout slot. A slot never touched counts as not done, so the
    /// first toggle marks it done. Returns the new state.
    pub fn toggle_workout(&mut self, key: &CompletionKey) -> bool {
        let raw = key.workout_slot().to_string();
        let entry = self.snapshot.completed_workouts.entry(raw).or_insert(false);
        *entry = !*entry;
        let done = *entry;
        debug!(key = %key, done, "Workout toggled");
        self.changed();
        done
    }

    /// Flip one exercise of a workout slot. Returns the new state.
    pub fn toggle_exercise(&mut self, workout: &CompletionKey, exercise_index: usize) -> bool {
        let raw = workout.workout_slot().exercise(exercise_index).to_string();
        let entry = self.snapshot.completed_exercises.entry(raw).or_insert(false);
        *entry = !*entry;
        let done = *entry;
        debug!(key = %workout, exercise_index, done, "Exercise toggled");
        self.changed();
        done
    }

    /// Attach import metadata to a slot, replacing any earlier import.
    /// Returns false when the identical record was already present.
    pub fn record_import(&mut self, key: &CompletionKey, import: WorkoutImport) -> bool {
        let raw = key.workout_slot().to_string();
        if self.snapshot.workout_data.get(&raw) == Some(&import) {
            return false;
        }
        debug!(key = %raw, file = %import.file_name, "Import recorded");
        self.snapshot.workout_data.insert(raw, import);
        self.changed();
        true
    }

    /// Move the phase cursor. Completion data is untouched.
    pub fn set_phase(&mut self, index: PhaseIndex) -> PhaseChange {
        let previous = self.snapshot.selected_phase;
        self.snapshot.selected_phase = index;
        self.changed();
        PhaseChange {
            previous,
            current: index,
        }
    }

    pub fn is_workout_done(&self, key: &CompletionKey) -> bool {
        self.snapshot
            .completed_workouts
            .get(&key.workout_slot().to_string())
            .copied()
            .unwrap_or(false)
    }

    pub fn is_exercise_done(&self, workout: &CompletionKey, exercise_index: usize) -> bool {
        self.snapshot
            .completed_exercises
            .get(&workout.workout_slot().exercise(exercise_index).to_string())
            .copied()
            .unwrap_or(false)
    }

    pub fn import_for(&self, key: &CompletionKey) -> Option<&WorkoutImport> {
        self.snapshot.workout_data.get(&key.workout_slot().to_string())
    }

    pub fn summary(&self) -> ProgressSummary {
        analytics::compute_summary(&self.snapshot)
    }

    pub fn exercise_progress(&self, workout: &CompletionKey, total_exercises: usize) -> usize {
        analytics::exercise_progress(&self.snapshot, workout, total_exercises)
    }

    fn changed(&mut self) {
        self.snapshot.last_update = Some(Utc::now());
        if let Some(saver) = &self.saver {
            saver.submit(self.snapshot.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Catalog;
    use crate::persistence::{ProgressPersistence, SaveQueue, DEFAULT_STORAGE_KEY};
    use crate::storage::MemoryKeyValueStore;
    use std::sync::Arc;

    fn key(raw: &str) -> CompletionKey {
        raw.parse().expect("valid key")
    }

    #[test]
    fn test_first_toggle_marks_done_and_double_toggle_restores() {
        let mut store = ProgressStore::new(ProgressSnapshot::empty(0));
        let k = key("1-2-corrida-Segunda");

        assert!(store.toggle_workout(&k));
        assert_eq!(store.snapshot().completed_workouts.get("1-2-corrida-Segunda"), Some(&true));

        assert!(!store.toggle_workout(&k));
        assert_eq!(store.snapshot().completed_workouts.get("1-2-corrida-Segunda"), Some(&false));
    }

    #[test]
    fn test_scenario_summary_after_toggles() {
        let mut store = ProgressStore::new(ProgressSnapshot::empty(0));
        let k = key("1-2-corrida-Segunda");

        store.toggle_workout(&k);
        let summary = store.summary();
        assert_eq!(summary.total_workouts, 1);
        assert_eq!(summary.completed_workouts, 1);

        store.toggle_workout(&k);
        let summary = store.summary();
        assert_eq!(summary.total_workouts, 1);
        assert_eq!(summary.completed_workouts, 0);
    }

    #[test]
    fn test_untouched_key_has_no_entry() {
        let mut store = ProgressStore::new(ProgressSnapshot::empty(0));
        store.toggle_workout(&key("0-1-corrida-Segunda"));

        assert!(!store.snapshot().completed_workouts.contains_key("0-1-corrida-Quarta"));
        assert!(!store.is_workout_done(&key("0-1-corrida-Quarta")));
        assert_eq!(store.summary().total_workouts, 1);
    }

    #[test]
    fn test_toggle_exercise_uses_derived_key() {
        let mut store = ProgressStore::new(ProgressSnapshot::empty(0));
        let workout = key("0-1-musculacao-Terça");

        assert!(store.toggle_exercise(&workout, 0));
        assert!(store.toggle_exercise(&workout, 3));
        assert!(store.is_exercise_done(&workout, 3));
        assert!(store
            .snapshot()
            .completed_exercises
            .contains_key("0-1-musculacao-Terça-ex-3"));
        assert_eq!(store.exercise_progress(&workout, 5), 2);

        assert!(!store.toggle_exercise(&workout, 3));
        assert_eq!(store.exercise_progress(&workout, 5), 1);
    }

    #[test]
    fn test_record_import_overwrites_and_ignores_identical() {
        let mut store = ProgressStore::new(ProgressSnapshot::empty(0));
        let k = key("0-1-corrida-Sábado");
        let when = Utc::now();

        let first = WorkoutImport::new("long.gpx", when, Some("<gpx>"));
        assert!(store.record_import(&k, first.clone()));
        assert!(!store.record_import(&k, first));

        let second = WorkoutImport::new("long.tcx", when, None);
        assert!(store.record_import(&k, second));
        assert_eq!(store.import_for(&k).map(|i| i.file_name.as_str()), Some("long.tcx"));
        assert_eq!(store.summary().import_count, 1);
    }

    #[test]
    fn test_set_phase_leaves_progress_alone() {
        let mut store = ProgressStore::new(ProgressSnapshot::empty(0));
        store.toggle_workout(&key("0-1-corrida-Segunda"));
        store.toggle_exercise(&key("0-1-musculacao-Terça"), 1);
        store.record_import(
            &key("0-1-corrida-Segunda"),
            WorkoutImport::new("seg.csv", Utc::now(), Some("a,b")),
        );
        let before = store.snapshot().clone();

        let change = store.set_phase(-1);
        assert_eq!(change, PhaseChange { previous: 0, current: -1 });
        assert!(change.moved());
        assert_eq!(store.selected_phase(), -1);

        let after = store.snapshot();
        assert_eq!(after.completed_workouts, before.completed_workouts);
        assert_eq!(after.completed_exercises, before.completed_exercises);
        assert_eq!(after.workout_data, before.workout_data);
    }

    #[test]
    fn test_pre_season_selection_resolves_in_catalog() {
        let catalog = Catalog::builtin().unwrap();
        let mut store = ProgressStore::new(ProgressSnapshot::empty(catalog.default_phase()));

        let _ = store.set_phase(-1);
        let workouts = catalog.get_workouts(store.selected_phase());
        assert!(workouts.is_some());
        assert_eq!(catalog.get_phase(-1).map(|p| p.weeks), Some(4));
    }

    #[test]
    fn test_phase_change_collapses_detail_cursor() {
        let mut store = ProgressStore::new(ProgressSnapshot::empty(0));
        let mut cursor = DetailCursor::default();
        cursor.toggle_week(3);
        cursor.toggle_category(3, Category::Strength);

        let change = store.set_phase(0);
        assert!(!change.moved());
        cursor.apply(&change);
        assert_eq!(cursor, DetailCursor::default());
    }

    #[test]
    fn test_detail_cursor_toggles() {
        let mut cursor = DetailCursor::default();
        cursor.toggle_week(2);
        assert_eq!(cursor.expanded_week, Some(2));
        cursor.toggle_week(2);
        assert_eq!(cursor.expanded_week, None);

        cursor.toggle_category(1, Category::Running);
        cursor.toggle_category(1, Category::Strength);
        assert_eq!(cursor.expanded_category, Some((1, Category::Strength)));
    }

    #[tokio::test]
    async fn test_mutations_write_through_save_queue() {
        let kv = Arc::new(MemoryKeyValueStore::new());
        let persistence = ProgressPersistence::new(kv, DEFAULT_STORAGE_KEY);
        let queue = SaveQueue::spawn(persistence.clone(), 8);
        let catalog = Catalog::builtin().unwrap();

        let mut store = ProgressStore::with_saver(ProgressSnapshot::empty(0), queue.handle());
        store.toggle_workout(&key("0-1-corrida-Segunda"));
        store.toggle_exercise(&key("0-1-musculacao-Terça"), 0);
        let _ = store.set_phase(2);
        let expected = store.snapshot().clone();

        queue.shutdown().await;

        let reloaded = persistence.load_or_default(&catalog).await;
        assert_eq!(reloaded, expected);
    }

    #[tokio::test]
    async fn test_failed_save_keeps_memory_state() {
        let kv = Arc::new(MemoryKeyValueStore::new());
        kv.set_read_only(true);
        let persistence = ProgressPersistence::new(kv.clone(), DEFAULT_STORAGE_KEY);
        let queue = SaveQueue::spawn(persistence, 8);

        let mut store = ProgressStore::with_saver(ProgressSnapshot::empty(0), queue.handle());
        assert!(store.toggle_workout(&key("0-1-corrida-Segunda")));
        queue.shutdown().await;

        assert!(store.is_workout_done(&key("0-1-corrida-Segunda")));
        assert!(store.toggle_workout(&key("0-1-corrida-Quarta")));
        assert_eq!(store.summary().completed_workouts, 2);
    }
}
