use std::env;
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use halfmarathon_tracker_lib::catalog::PhaseIndex;
use halfmarathon_tracker_lib::commands::{self, analysis, progress::{self, SlotRef}};
use halfmarathon_tracker_lib::keys::{Category, CompletionKey};
use halfmarathon_tracker_lib::{AppState, TrackerConfig};

#[derive(Parser, Debug)]
#[command(author, version, about = "Track progress through the half-marathon training plan")]
struct Cli {
  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
  /// List the plan's phases
  Phases,
  /// Select the current phase (e.g. -1 for pre-season)
  Phase {
    #[arg(allow_negative_numbers = true)]
    index: PhaseIndex,
  },
  /// Show one week of a phase with completion marks
  Week {
    week: u32,
    #[arg(long, allow_negative_numbers = true)]
    phase: Option<PhaseIndex>,
  },
  /// Mark a workout done, or undo it
  Toggle {
    #[command(flatten)]
    slot: SlotArgs,
  },
  /// Mark one exercise of a strength session done, or undo it
  ToggleExercise {
    #[command(flatten)]
    slot: SlotArgs,
    /// Zero-based position in the exercise list
    #[arg(long)]
    index: usize,
  },
  /// Toggle by completion key, e.g. 0-3-corrida-Segunda or -1-1-musculacao-Terça-ex-2
  ToggleKey {
    #[arg(allow_hyphen_values = true)]
    key: String,
  },
  /// Attach a watch export (.csv, .gpx, .tcx, .fit, .txt) to a workout
  Import {
    #[command(flatten)]
    slot: SlotArgs,
    file: PathBuf,
  },
  /// Overall progress analysis
  Summary,
}

impl Command {
  /// Commands that change saved progress
  fn mutates(&self) -> bool {
    matches!(
      self,
      Command::Phase { .. }
        | Command::Toggle { .. }
        | Command::ToggleExercise { .. }
        | Command::ToggleKey { .. }
        | Command::Import { .. }
    )
  }
}

#[derive(clap::Args, Debug)]
struct SlotArgs {
  #[arg(long)]
  week: u32,
  /// corrida/running or musculacao/strength
  #[arg(long, default_value = "corrida")]
  category: Category,
  /// Day label as written in the plan, e.g. "Segunda"
  #[arg(long)]
  day: String,
  /// Defaults to the selected phase
  #[arg(long, allow_negative_numbers = true)]
  phase: Option<PhaseIndex>,
}

impl From<SlotArgs> for SlotRef {
  fn from(args: SlotArgs) -> Self {
    SlotRef {
      phase: args.phase,
      week: args.week,
      category: args.category,
      day: args.day,
    }
  }
}

fn init_tracing() {
  let filter = EnvFilter::try_from_env("TRACKER_LOG")
    .unwrap_or_else(|_| EnvFilter::new("halfmarathon_tracker_lib=info,warn"));

  let format = env::var("TRACKER_LOG_FORMAT").unwrap_or_else(|_| "compact".to_string());

  let registry = tracing_subscriber::registry().with(filter);

  match format.as_str() {
    "json" => {
      registry.with(fmt::layer().json().with_writer(std::io::stderr)).init();
    }
    _ => {
      registry.with(fmt::layer().compact().with_writer(std::io::stderr)).init();
    }
  }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
  // Load environment variables from .env file
  dotenvy::dotenv().ok();
  init_tracing();

  let cli = Cli::parse();
  let config = TrackerConfig::from_env()?;
  let state = AppState::initialize(&config).await?;

  let mutates = cli.command.mutates();
  let mut result = dispatch(&state, cli.command).await;
  if result.is_ok() && mutates {
    result = commands::save_progress(&state).await.map_err(Into::into);
  }
  state.shutdown().await;
  result
}

async fn dispatch(state: &AppState, command: Command) -> Result<(), Box<dyn std::error::Error>> {
  match command {
    Command::Phases => {
      let selected = commands::get_progress_snapshot(state)?.selected_phase;
      for phase in commands::get_phases(state) {
        let marker = if phase.index == selected { "*" } else { " " };
        println!(
          "{} {:>2}  {} ({}, {} weeks)",
          marker, phase.index, phase.name, phase.period, phase.weeks
        );
      }
    }
    Command::Phase { index } => {
      let change = commands::select_phase(state, index)?;
      println!("Phase {} selected (was {})", change.current, change.previous);
    }
    Command::Week { week, phase } => print_week(state, phase, week)?,
    Command::Toggle { slot } => {
      let done = progress::toggle_workout(state, &slot.into())?;
      println!("{}", if done { "Marked done" } else { "Unmarked" });
    }
    Command::ToggleExercise { slot, index } => {
      let slot: SlotRef = slot.into();
      let done = progress::toggle_exercise(state, &slot, index)?;
      let (completed, total) = analysis::get_exercise_progress(state, &slot)?;
      println!(
        "Exercise {} {} ({}/{} done)",
        index,
        if done { "done" } else { "undone" },
        completed,
        total
      );
    }
    Command::ToggleKey { key } => {
      let done = progress::toggle_key(state, &key)?;
      println!("{} {}", key, if done { "done" } else { "undone" });
    }
    Command::Import { slot, file } => {
      let import = progress::import_workout_file(state, &slot.into(), &file).await?;
      println!("Imported {} at {}", import.file_name, import.upload_date.to_rfc3339());
    }
    Command::Summary => print_summary(state)?,
  }
  Ok(())
}

fn print_week(state: &AppState, phase: Option<PhaseIndex>, week: u32) -> Result<(), Box<dyn std::error::Error>> {
  let workouts = commands::get_phase_workouts(state, phase)?;
  let progress = analysis::get_week_progress(state, phase, week)?;
  let snapshot = commands::get_progress_snapshot(state)?;
  let mark = |key: &CompletionKey| {
    if snapshot.completed_workouts.get(&key.to_string()).copied().unwrap_or(false) {
      "[x]"
    } else {
      "[ ]"
    }
  };

  println!("Week {} of phase {}: {}% complete", week, progress.phase, progress.percent());

  println!("Running");
  for workout in &workouts.running {
    let key = CompletionKey::workout(progress.phase, week, Category::Running, workout.day.as_str());
    println!("  {} {} - {}: {}", mark(&key), workout.day, workout.kind, workout.details);
    println!("      pace {} | {} | {}", workout.pace, workout.zone, workout.location);
    println!(
      "      indoor: {} at {} incline, {}",
      workout.indoor_option.pace, workout.indoor_option.incline, workout.indoor_option.details
    );
    if let Some(import) = snapshot.workout_data.get(&key.to_string()) {
      println!("      data: {}", import.file_name);
    }
  }

  println!("Strength");
  for workout in &workouts.strength {
    let key = CompletionKey::workout(progress.phase, week, Category::Strength, workout.day.as_str());
    println!("  {} {} - {}", mark(&key), workout.day, workout.name);
    for (i, exercise) in workout.exercises.iter().enumerate() {
      let done = snapshot
        .completed_exercises
        .get(&key.exercise(i).to_string())
        .copied()
        .unwrap_or(false);
      let note = exercise.note.as_deref().map(|n| format!(" ({})", n)).unwrap_or_default();
      println!("      {} {}. {}{}", if done { "x" } else { "-" }, i, exercise.name, note);
    }
  }
  Ok(())
}

fn print_summary(state: &AppState) -> Result<(), Box<dyn std::error::Error>> {
  let summary = analysis::get_summary(state)?;

  println!("Completion rate: {}%", summary.completion_rate());
  println!("Workouts done:   {}", summary.completed_workouts);
  println!("  Running:       {} ({}%)", summary.running_completed, summary.running_share());
  println!("  Strength:      {} ({}%)", summary.strength_completed, summary.strength_share());
  println!(
    "Exercises:       {}/{} ({}%)",
    summary.completed_exercises,
    summary.total_exercises,
    summary.exercise_rate()
  );
  println!("Imported files:  {}", summary.import_count);

  let recent = analysis::get_recent_imports(state, 5)?;
  if !recent.is_empty() {
    println!("Recent imports:");
    for import in recent {
      println!("  {}  {}  ({})", import.upload_date.format("%d/%m/%Y"), import.file_name, import.key);
    }
  }
  Ok(())
}
