//! Completion key scheme
//!
//! A completion key is the only link between mutable progress and the
//! immutable plan catalog. The canonical string form is
//! `{phase}-{week}-{category}-{day}` for a workout slot and
//! `{phase}-{week}-{category}-{day}-ex-{index}` for one exercise of it.
//! Every key that reaches storage is built and parsed here.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::catalog::PhaseIndex;

const EXERCISE_MARKER: &str = "-ex-";

// ---------------------------------------------------------------------------
/// Category: which template list a workout slot belongs to
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Running,
    Strength,
}

impl Category {
    pub const ALL: [Category; 2] = [Category::Running, Category::Strength];

    /// Token embedded in stored keys. Must never change: existing progress
    /// is addressed by it.
    pub fn token(&self) -> &'static str {
        match self {
            Self::Running => "corrida",
            Self::Strength => "musculacao",
        }
    }

    pub fn from_token(token: &str) -> Option<Self> {
        match token {
            "corrida" => Some(Self::Running),
            "musculacao" => Some(Self::Strength),
            _ => None,
        }
    }

    /// Substring attribution used by the summary analytics.
    pub fn matches_key(&self, raw_key: &str) -> bool {
        raw_key.contains(self.token())
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

impl FromStr for Category {
    type Err = KeyParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lowered = s.to_lowercase();
        match lowered.as_str() {
            "running" | "run" => Ok(Self::Running),
            "strength" | "gym" => Ok(Self::Strength),
            other => Self::from_token(other).ok_or_else(|| KeyParseError::new(s, "unknown category")),
        }
    }
}

// ---------------------------------------------------------------------------
/// Error Handling
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Malformed completion key '{key}': {reason}")]
pub struct KeyParseError {
    pub key: String,
    pub reason: &'static str,
}

impl KeyParseError {
    fn new(key: &str, reason: &'static str) -> Self {
        Self {
            key: key.to_string(),
            reason,
        }
    }
}

// ---------------------------------------------------------------------------
/// Completion Key
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CompletionKey {
    pub phase: PhaseIndex,
    pub week: u32,
    pub category: Category,
    pub day: String,
    pub exercise: Option<usize>,
}

impl CompletionKey {
    pub fn workout(phase: PhaseIndex, week: u32, category: Category, day: impl Into<String>) -> Self {
        Self {
            phase,
            week,
            category,
            day: day.into(),
            exercise: None,
        }
    }

    /// Key of one exercise inside this workout slot.
    pub fn exercise(&self, index: usize) -> Self {
        Self {
            exercise: Some(index),
            ..self.clone()
        }
    }

    /// The workout slot this key belongs to (drops any exercise index).
    pub fn workout_slot(&self) -> Self {
        Self {
            exercise: None,
            ..self.clone()
        }
    }

    pub fn is_exercise(&self) -> bool {
        self.exercise.is_some()
    }
}

impl fmt::Display for CompletionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}-{}-{}-{}",
            self.phase,
            self.week,
            self.category.token(),
            self.day
        )?;
        if let Some(index) = self.exercise {
            write!(f, "{}{}", EXERCISE_MARKER, index)?;
        }
        Ok(())
    }
}

impl FromStr for CompletionKey {
    type Err = KeyParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // A leading '-' belongs to a negative phase index, not to a separator.
        let (negative, rest) = match s.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, s),
        };

        let (phase_str, rest) = rest
            .split_once('-')
            .ok_or_else(|| KeyParseError::new(s, "missing phase separator"))?;
        let magnitude: PhaseIndex = phase_str
            .parse()
            .map_err(|_| KeyParseError::new(s, "phase is not an integer"))?;
        let phase = if negative { -magnitude } else { magnitude };

        let (week_str, rest) = rest
            .split_once('-')
            .ok_or_else(|| KeyParseError::new(s, "missing week separator"))?;
        let week: u32 = week_str
            .parse()
            .map_err(|_| KeyParseError::new(s, "week is not a positive integer"))?;

        let (token, rest) = rest
            .split_once('-')
            .ok_or_else(|| KeyParseError::new(s, "missing category separator"))?;
        let category =
            Category::from_token(token).ok_or_else(|| KeyParseError::new(s, "unknown category"))?;

        // Day labels may contain '-' (literal dates), so only a trailing
        // `-ex-<digits>` is treated as an exercise suffix.
        let (day, exercise) = match rest.rfind(EXERCISE_MARKER) {
            Some(pos) => {
                let tail = &rest[pos + EXERCISE_MARKER.len()..];
                if !tail.is_empty() && tail.bytes().all(|b| b.is_ascii_digit()) {
                    let index = tail
                        .parse()
                        .map_err(|_| KeyParseError::new(s, "exercise index out of range"))?;
                    (&rest[..pos], Some(index))
                } else {
                    (rest, None)
                }
            }
            None => (rest, None),
        };

        if day.is_empty() {
            return Err(KeyParseError::new(s, "empty day label"));
        }

        Ok(Self {
            phase,
            week,
            category,
            day: day.to_string(),
            exercise,
        })
    }
}
