pub mod progress;

pub use progress::{ProgressSnapshot, WorkoutImport, MAX_EXCERPT_CHARS};
