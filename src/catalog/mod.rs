//! Training plan catalog
//!
//! Read-only hierarchy of phases, weekly workout templates and exercise
//! lists. Phases are addressed by index equality through an explicit map,
//! so the pre-season phase (a negative index) needs no special handling by
//! callers.
//!
//! The plan itself is data: `plan.json` is embedded at build time and may be
//! replaced at startup by a file with the same shape.

use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::keys::{Category, CompletionKey};

pub type PhaseIndex = i32;

const BUILTIN_PLAN: &str = include_str!("plan.json");

/// Returned for lookups that miss, so callers can render a fallback.
static EMPTY_WORKOUTS: PhaseWorkouts = PhaseWorkouts {
    running: Vec::new(),
    strength: Vec::new(),
};

// ---------------------------------------------------------------------------
/// Templates
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Phase {
    pub index: PhaseIndex,
    pub name: String,
    /// Human date range, e.g. "Fevereiro - Março"
    #[serde(default)]
    pub period: String,
    pub weeks: u32,
    /// Display color tag
    #[serde(default)]
    pub color: String,
}

/// Treadmill variant of a running session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndoorOption {
    pub pace: String,
    pub incline: String,
    pub details: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunningWorkout {
    /// Day label, not a calendar date (may still be a literal date string)
    pub day: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub details: String,
    pub pace: String,
    pub zone: String,
    pub location: String,
    pub indoor_option: IndoorOption,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StrengthWorkout {
    pub day: String,
    pub name: String,
    pub exercises: Vec<ExerciseSpec>,
}

/// One exercise of a strength session. Target sets/reps live in the name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "ExerciseEntry")]
pub struct ExerciseSpec {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
    /// Intensity or progression annotation
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

impl ExerciseSpec {
    pub fn plain(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            link: None,
            note: None,
        }
    }
}

/// Stored exercise shape. Older plans list bare strings, newer ones records.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ExerciseEntry {
    Plain(String),
    Detailed {
        name: String,
        #[serde(default)]
        link: Option<String>,
        #[serde(default)]
        note: Option<String>,
    },
}

impl From<ExerciseEntry> for ExerciseSpec {
    fn from(entry: ExerciseEntry) -> Self {
        match entry {
            ExerciseEntry::Plain(name) => Self::plain(name),
            ExerciseEntry::Detailed { name, link, note } => Self { name, link, note },
        }
    }
}

/// All templates scheduled in every week of one phase
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhaseWorkouts {
    #[serde(default)]
    pub running: Vec<RunningWorkout>,
    #[serde(default)]
    pub strength: Vec<StrengthWorkout>,
}

impl PhaseWorkouts {
    /// Number of workout slots in one week
    pub fn len(&self) -> usize {
        self.running.len() + self.strength.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Day labels of one category, in template order
    pub fn days(&self, category: Category) -> Vec<&str> {
        match category {
            Category::Running => self.running.iter().map(|w| w.day.as_str()).collect(),
            Category::Strength => self.strength.iter().map(|w| w.day.as_str()).collect(),
        }
    }

    pub fn strength_by_day(&self, day: &str) -> Option<&StrengthWorkout> {
        self.strength.iter().find(|w| w.day == day)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhasePlan {
    #[serde(flatten)]
    pub phase: Phase,
    #[serde(flatten)]
    pub workouts: PhaseWorkouts,
}

#[derive(Debug, Deserialize)]
struct PlanFile {
    default_phase: PhaseIndex,
    phases: Vec<PhasePlan>,
}

// ---------------------------------------------------------------------------
/// Error Handling
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("Failed to parse plan: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Failed to read plan file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Plan defines no phases")]
    Empty,

    #[error("Phase {0} is defined more than once")]
    DuplicatePhase(PhaseIndex),

    #[error("Phase indices must be contiguous: expected {expected}, found {found}")]
    NonContiguous {
        expected: PhaseIndex,
        found: PhaseIndex,
    },

    #[error("Default phase {0} is not defined")]
    MissingDefault(PhaseIndex),

    #[error("Phase {0} has no weeks")]
    NoWeeks(PhaseIndex),
}

// ---------------------------------------------------------------------------
/// Catalog
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct Catalog {
    default_phase: PhaseIndex,
    phases: BTreeMap<PhaseIndex, PhasePlan>,
}

impl Catalog {
    /// The plan shipped with the crate
    pub fn builtin() -> Result<Self, CatalogError> {
        Self::from_json(BUILTIN_PLAN)
    }

    pub fn from_json(json: &str) -> Result<Self, CatalogError> {
        let plan: PlanFile = serde_json::from_str(json)?;
        Self::new(plan.default_phase, plan.phases)
    }

    pub fn from_file(path: &Path) -> Result<Self, CatalogError> {
        let json = fs::read_to_string(path).map_err(|source| CatalogError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&json)
    }

    /// Build and validate a catalog from phase plans in any order
    pub fn new(default_phase: PhaseIndex, plans: Vec<PhasePlan>) -> Result<Self, CatalogError> {
        let mut phases = BTreeMap::new();
        for plan in plans {
            let index = plan.phase.index;
            if plan.phase.weeks == 0 {
                return Err(CatalogError::NoWeeks(index));
            }
            warn_duplicate_days(&plan);
            if phases.insert(index, plan).is_some() {
                return Err(CatalogError::DuplicatePhase(index));
            }
        }

        let first = *phases.keys().next().ok_or(CatalogError::Empty)?;
        for (offset, &found) in phases.keys().enumerate() {
            let expected = first + offset as PhaseIndex;
            if found != expected {
                return Err(CatalogError::NonContiguous { expected, found });
            }
        }

        if !phases.contains_key(&default_phase) {
            return Err(CatalogError::MissingDefault(default_phase));
        }

        debug!(phases = phases.len(), default_phase, "Plan catalog loaded");
        Ok(Self {
            default_phase,
            phases,
        })
    }

    /// Phase selected when no saved progress exists
    pub fn default_phase(&self) -> PhaseIndex {
        self.default_phase
    }

    pub fn contains(&self, index: PhaseIndex) -> bool {
        self.phases.contains_key(&index)
    }

    pub fn get_phase(&self, index: PhaseIndex) -> Option<&Phase> {
        self.phases.get(&index).map(|p| &p.phase)
    }

    pub fn get_workouts(&self, index: PhaseIndex) -> Option<&PhaseWorkouts> {
        self.phases.get(&index).map(|p| &p.workouts)
    }

    /// Like `get_workouts`, but a miss yields an empty week instead of `None`
    pub fn workouts_or_empty(&self, index: PhaseIndex) -> &PhaseWorkouts {
        self.get_workouts(index).unwrap_or(&EMPTY_WORKOUTS)
    }

    /// Phases in index order
    pub fn phases(&self) -> impl Iterator<Item = &Phase> {
        self.phases.values().map(|p| &p.phase)
    }

    /// Keys of every workout slot in one week, running first
    pub fn workout_keys(&self, phase: PhaseIndex, week: u32) -> Vec<CompletionKey> {
        let workouts = self.workouts_or_empty(phase);
        Category::ALL
            .iter()
            .flat_map(|&category| {
                workouts
                    .days(category)
                    .into_iter()
                    .map(move |day| CompletionKey::workout(phase, week, category, day))
            })
            .collect()
    }

    /// Whether a key still addresses a slot of the current plan
    pub fn has_slot(&self, key: &CompletionKey) -> bool {
        let Some(plan) = self.phases.get(&key.phase) else {
            return false;
        };
        if key.week == 0 || key.week > plan.phase.weeks {
            return false;
        }
        match (key.category, key.exercise) {
            (Category::Running, None) => plan.workouts.running.iter().any(|w| w.day == key.day),
            (Category::Running, Some(_)) => false,
            (Category::Strength, None) => plan.workouts.strength_by_day(&key.day).is_some(),
            (Category::Strength, Some(index)) => plan
                .workouts
                .strength_by_day(&key.day)
                .is_some_and(|w| index < w.exercises.len()),
        }
    }
}

/// Same-day templates share a completion key. That is accepted, but worth
/// knowing about when a plan is edited.
fn warn_duplicate_days(plan: &PhasePlan) {
    for category in Category::ALL {
        let mut seen = HashSet::new();
        for day in plan.workouts.days(category) {
            if !seen.insert(day) {
                warn!(
                    phase = plan.phase.index,
                    category = category.token(),
                    day,
                    "Duplicate day label; these workouts share progress"
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn phase_plan(index: PhaseIndex, weeks: u32) -> PhasePlan {
        PhasePlan {
            phase: Phase {
                index,
                name: format!("Phase {}", index),
                period: String::new(),
                weeks,
                color: String::new(),
            },
            workouts: PhaseWorkouts::default(),
        }
    }

    #[test]
    fn test_builtin_plan_parses() {
        let catalog = Catalog::builtin().expect("builtin plan should be valid");
        let indices: Vec<PhaseIndex> = catalog.phases().map(|p| p.index).collect();
        assert_eq!(indices, vec![-1, 0, 1, 2, 3]);
        assert_eq!(catalog.default_phase(), 0);
    }

    #[test]
    fn test_pre_season_lookup_by_index() {
        let catalog = Catalog::builtin().unwrap();
        let phase = catalog.get_phase(-1).expect("pre-season phase");
        assert_eq!(phase.weeks, 4);
        let workouts = catalog.get_workouts(-1).expect("pre-season workouts");
        assert_eq!(workouts.running.len(), 3);
        assert_eq!(workouts.strength.len(), 2);
    }

    #[test]
    fn test_lookup_miss_returns_empty() {
        let catalog = Catalog::builtin().unwrap();
        assert!(catalog.get_phase(9).is_none());
        assert!(catalog.get_workouts(-5).is_none());
        assert!(catalog.workouts_or_empty(9).is_empty());
        assert!(catalog.workout_keys(9, 1).is_empty());
    }

    #[test]
    fn test_plain_and_detailed_exercises_normalise() {
        let catalog = Catalog::builtin().unwrap();

        let base = catalog.get_workouts(0).unwrap();
        let first = &base.strength[0].exercises[0];
        assert_eq!(first, &ExerciseSpec::plain("Agachamento livre: 4x10-12"));

        let pre = catalog.get_workouts(-1).unwrap();
        let goblet = &pre.strength[0].exercises[0];
        assert_eq!(goblet.name, "Agachamento goblet: 3x12");
        assert!(goblet.link.is_some());
        assert_eq!(goblet.note.as_deref(), Some("Carga leve, foco na técnica"));

        // Mixed list: a bare string among records
        let dead_bug = &pre.strength[1].exercises[3];
        assert_eq!(dead_bug, &ExerciseSpec::plain("Dead bug: 3x10"));
    }

    #[test]
    fn test_workout_keys_cover_every_slot() {
        let catalog = Catalog::builtin().unwrap();
        let keys: Vec<String> = catalog.workout_keys(1, 2).iter().map(|k| k.to_string()).collect();
        assert_eq!(keys.len(), 7);
        assert_eq!(keys[0], "1-2-corrida-Segunda");
        assert_eq!(keys[6], "1-2-musculacao-Sábado");
    }

    #[test]
    fn test_has_slot() {
        let catalog = Catalog::builtin().unwrap();
        let slot = CompletionKey::workout(0, 1, Category::Strength, "Terça");
        assert!(catalog.has_slot(&slot));
        assert!(catalog.has_slot(&slot.exercise(6)));
        assert!(!catalog.has_slot(&slot.exercise(7)));
        assert!(!catalog.has_slot(&CompletionKey::workout(0, 9, Category::Strength, "Terça")));
        assert!(!catalog.has_slot(&CompletionKey::workout(0, 1, Category::Running, "Terça")));
        assert!(!catalog.has_slot(&CompletionKey::workout(7, 1, Category::Running, "Segunda")));
    }

    #[test]
    fn test_rejects_non_contiguous_indices() {
        let result = Catalog::new(0, vec![phase_plan(0, 4), phase_plan(2, 4)]);
        assert!(matches!(
            result,
            Err(CatalogError::NonContiguous { expected: 1, found: 2 })
        ));
    }

    #[test]
    fn test_rejects_duplicate_and_missing_default() {
        let duplicate = Catalog::new(0, vec![phase_plan(0, 4), phase_plan(0, 8)]);
        assert!(matches!(duplicate, Err(CatalogError::DuplicatePhase(0))));

        let missing = Catalog::new(5, vec![phase_plan(0, 4)]);
        assert!(matches!(missing, Err(CatalogError::MissingDefault(5))));

        let empty = Catalog::new(0, vec![]);
        assert!(matches!(empty, Err(CatalogError::Empty)));
    }

    #[test]
    fn test_rejects_zero_week_phase() {
        let result = Catalog::new(0, vec![phase_plan(0, 0)]);
        assert!(matches!(result, Err(CatalogError::NoWeeks(0))));
    }

    #[test]
    fn test_from_file_reports_missing_path() {
        let result = Catalog::from_file(Path::new("/nonexistent/plan.json"));
        assert!(matches!(result, Err(CatalogError::Read { .. })));
    }
}
