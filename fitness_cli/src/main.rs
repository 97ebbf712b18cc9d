use chrono::{Local, NaiveDate};
use clap::{Args, Parser, Subcommand};
use fitness_core::catalog;
use fitness_core::report::{
    bar, format_display_date, goal_progress, pluralize, set_line, weekly_activity, DATE_FORMAT,
};
use fitness_core::*;
use std::io::BufRead;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Parser)]
#[command(name = "fitlog")]
#[command(about = "Workout and step tracker", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Override data directory
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Override backend base URL
    #[arg(long, global = true)]
    api_url: Option<String>,

    /// Log debug output to stderr
    #[arg(long, short, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Today's steps and the workout in progress (default)
    Home,

    /// Add an exercise to today's workout
    Add(ExerciseArgs),

    /// Replace an exercise in today's workout
    Edit {
        /// Position shown by `fitlog home` (starting at 1)
        position: usize,

        #[command(flatten)]
        exercise: ExerciseArgs,
    },

    /// Remove an exercise from today's workout
    Remove {
        /// Position shown by `fitlog home` (starting at 1)
        position: usize,
    },

    /// Discard today's workout
    Clear,

    /// Save today's workout
    Save {
        /// Workout date (YYYY-MM-DD), defaults to today
        #[arg(long)]
        date: Option<NaiveDate>,

        /// Duration in minutes
        #[arg(long)]
        duration: Option<u32>,

        #[arg(long)]
        notes: Option<String>,
    },

    /// List saved workouts
    History {
        /// First day (YYYY-MM-DD); requires --to
        #[arg(long, requires = "to")]
        from: Option<NaiveDate>,

        /// Last day (YYYY-MM-DD); requires --from
        #[arg(long, requires = "from")]
        to: Option<NaiveDate>,
    },

    /// Show a single saved workout
    Show { id: String },

    /// Delete a saved workout
    Delete { id: String },

    /// Stats, weekly activity and goals
    Progress,

    /// Totals at a glance
    Profile,

    /// Browse the exercise library
    Exercises {
        #[arg(long)]
        category: Option<String>,
    },

    /// Step tracking
    Steps {
        #[command(subcommand)]
        action: StepsCommand,
    },

    /// Export workout history to CSV
    Export { path: PathBuf },
}

#[derive(Subcommand)]
enum StepsCommand {
    /// Record today's step count
    Set { count: u64 },

    /// Track live step deltas read from stdin, one integer per line
    Track {
        /// Steps already taken today before tracking starts
        #[arg(long, default_value_t = 0)]
        baseline: u64,
    },

    /// Show logged step counts
    History {
        /// First day (YYYY-MM-DD); requires --to
        #[arg(long, requires = "to")]
        from: Option<NaiveDate>,

        /// Last day (YYYY-MM-DD); requires --from
        #[arg(long, requires = "from")]
        to: Option<NaiveDate>,
    },
}

#[derive(Args)]
struct ExerciseArgs {
    /// Exercise name; library names fill in the category
    name: String,

    /// Category for exercises outside the library
    #[arg(long)]
    category: Option<String>,

    /// A set as REPSxWEIGHT, e.g. 10x50 (repeat for more sets)
    #[arg(long = "set", value_name = "REPSxWEIGHT", required = true)]
    sets: Vec<ExerciseSet>,
}

impl ExerciseArgs {
    fn into_exercise(self) -> Result<Exercise> {
        let template = catalog::find_exercise(&self.name);
        let name = template
            .map(|t| t.name.clone())
            .unwrap_or_else(|| self.name.trim().to_string());
        let category = match (self.category, template) {
            (Some(category), _) => category,
            (None, Some(template)) => template.category.clone(),
            (None, None) => {
                return Err(Error::Other(format!(
                    "'{}' is not in the exercise library; pass --category",
                    self.name
                )))
            }
        };
        Ok(Exercise::new(name, category, self.sets))
    }
}

/// Everything a command needs: the store and where its draft lives
struct App {
    store: WorkoutStore<HttpWorkoutApi>,
    draft_path: PathBuf,
    config: Config,
}

impl App {
    fn new(config: Config, data_dir: Option<PathBuf>, api_url: Option<String>) -> Result<Self> {
        let mut config = config;
        if let Some(dir) = data_dir {
            config.data.data_dir = dir;
        }
        if let Some(url) = api_url {
            config.api.base_url = url;
        }
        config.validate()?;

        let api = HttpWorkoutApi::new(&config.api.base_url)?;
        let draft_path = config.draft_path();
        let draft = DraftFile::load(&draft_path)?;
        let store = WorkoutStore::with_draft(api, draft.exercises);

        Ok(Self {
            store,
            draft_path,
            config,
        })
    }

    fn persist_draft(&self) -> Result<()> {
        DraftFile::new(self.store.current_workout()).save(&self.draft_path)
    }

    /// Fail the command if the last store operation recorded an error
    fn check_store_error(&self, action: &str) -> Result<()> {
        match self.store.error() {
            Some(message) => Err(Error::Other(format!("Failed to {}: {}", action, message))),
            None => Ok(()),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if cli.verbose {
        fitness_core::logging::init_with_level("debug");
    } else {
        fitness_core::logging::init();
    }

    let config = Config::load()?;
    let app = App::new(config, cli.data_dir, cli.api_url)?;

    match cli.command.unwrap_or(Commands::Home) {
        Commands::Home => cmd_home(&app).await,
        Commands::Add(args) => cmd_add(&app, args),
        Commands::Edit { position, exercise } => cmd_edit(&app, position, exercise),
        Commands::Remove { position } => cmd_remove(&app, position),
        Commands::Clear => cmd_clear(&app),
        Commands::Save {
            date,
            duration,
            notes,
        } => cmd_save(&app, date, duration, notes).await,
        Commands::History { from, to } => cmd_history(&app, date_range(from, to)).await,
        Commands::Show { id } => cmd_show(&app, &id).await,
        Commands::Delete { id } => cmd_delete(&app, &id).await,
        Commands::Progress => cmd_progress(&app).await,
        Commands::Profile => cmd_profile(&app).await,
        Commands::Exercises { category } => cmd_exercises(&app, category.as_deref()).await,
        Commands::Steps { action } => match action {
            StepsCommand::Set { count } => cmd_steps_set(&app, count).await,
            StepsCommand::Track { baseline } => cmd_steps_track(&app, baseline).await,
            StepsCommand::History { from, to } => {
                cmd_steps_history(&app, date_range(from, to)).await
            }
        },
        Commands::Export { path } => cmd_export(&app, &path).await,
    }
}

fn today() -> String {
    Local::now().format(DATE_FORMAT).to_string()
}

/// Inclusive day range when both ends were given
fn date_range(from: Option<NaiveDate>, to: Option<NaiveDate>) -> Option<DateRange> {
    match (from, to) {
        (Some(from), Some(to)) => Some(DateRange::new(
            from.format(DATE_FORMAT).to_string(),
            to.format(DATE_FORMAT).to_string(),
        )),
        _ => None,
    }
}

/// Convert a 1-based position from the command line to an index
fn position_to_index(position: usize) -> Option<usize> {
    position.checked_sub(1)
}

// ============================================================================
// Home
// ============================================================================

async fn cmd_home(app: &App) -> Result<()> {
    app.store.fetch_stats().await;

    println!("\nToday's Steps");
    match app.store.stats() {
        Some(stats) => println!("  {}", stats.total_steps_today),
        None => println!("  – (backend unreachable)"),
    }

    println!("\nToday's Workout");
    display_draft(&app.store.current_workout());
    Ok(())
}

fn display_draft(draft: &[Exercise]) {
    if draft.is_empty() {
        println!("  No exercises added yet");
        println!("  Add one with: fitlog add <name> --set 10x50");
        return;
    }

    for (index, exercise) in draft.iter().enumerate() {
        println!("  {}. {} ({})", index + 1, exercise.name, exercise.category);
        for (i, set) in exercise.sets.iter().enumerate() {
            println!("       {}", set_line(i, set));
        }
    }
}

fn cmd_add(app: &App, args: ExerciseArgs) -> Result<()> {
    let exercise = args.into_exercise()?;
    let name = exercise.name.clone();
    app.store.add_exercise(exercise);
    app.persist_draft()?;

    println!(
        "✓ Added {} ({} in today's workout)",
        name,
        pluralize(app.store.current_workout().len(), "exercise")
    );
    Ok(())
}

fn cmd_edit(app: &App, position: usize, args: ExerciseArgs) -> Result<()> {
    let exercise = args.into_exercise()?;
    let replaced = position_to_index(position)
        .map(|index| app.store.update_exercise(index, exercise))
        .unwrap_or(false);

    if replaced {
        app.persist_draft()?;
        println!("✓ Updated exercise {}", position);
    } else {
        println!("No exercise at position {} - nothing changed.", position);
    }
    Ok(())
}

fn cmd_remove(app: &App, position: usize) -> Result<()> {
    let removed = position_to_index(position)
        .map(|index| app.store.remove_exercise(index))
        .unwrap_or(false);

    if removed {
        app.persist_draft()?;
        println!("✓ Removed exercise {}", position);
    } else {
        println!("No exercise at position {} - nothing changed.", position);
    }
    Ok(())
}

fn cmd_clear(app: &App) -> Result<()> {
    app.store.clear_current_workout();
    app.persist_draft()?;
    println!("✓ Cleared today's workout");
    Ok(())
}

async fn cmd_save(
    app: &App,
    date: Option<NaiveDate>,
    duration: Option<u32>,
    notes: Option<String>,
) -> Result<()> {
    if app.store.current_workout().is_empty() {
        return Err(Error::Other("Please add at least one exercise".into()));
    }

    let date = date
        .map(|d| d.format(DATE_FORMAT).to_string())
        .unwrap_or_else(today);
    let notes = notes.filter(|n| !n.trim().is_empty());

    let saved = app.store.save_workout(&date, duration, notes).await?;
    app.persist_draft()?;

    println!("✓ Workout saved successfully!");
    if let Some(id) = saved.id {
        println!("  ID: {}", id);
    }
    println!("  Date: {}", format_display_date(&saved.date));
    println!("  {}", pluralize(saved.exercises.len(), "exercise"));
    Ok(())
}

// ============================================================================
// History
// ============================================================================

async fn cmd_history(app: &App, range: Option<DateRange>) -> Result<()> {
    app.store.fetch_workouts_in(range.as_ref()).await;
    app.check_store_error("fetch workouts")?;

    let workouts = app.store.workouts();
    println!("\nWorkout History");
    println!("  {}", pluralize(workouts.len(), "workout"));

    if workouts.is_empty() {
        println!("\n  No workouts recorded yet");
        println!("  Start logging your workouts to see them here");
        return Ok(());
    }

    for workout in &workouts {
        display_workout(workout);
    }
    Ok(())
}

fn display_workout(workout: &Workout) {
    println!();
    let mut header = format!("  {}", format_display_date(&workout.date));
    if let Some(duration) = workout.duration {
        header.push_str(&format!("  ⏱ {} min", duration));
    }
    if let Some(ref id) = workout.id {
        header.push_str(&format!("  [{}]", id));
    }
    println!("{}", header);

    for exercise in &workout.exercises {
        println!(
            "    • {} - {} • {}",
            exercise.name,
            pluralize(exercise.sets.len(), "set"),
            exercise.category
        );
    }

    if let Some(ref notes) = workout.notes {
        println!("    Notes: {}", notes);
    }
}

async fn cmd_show(app: &App, id: &str) -> Result<()> {
    let workout = app.store.api().get_workout(id).await?;
    display_workout(&workout);
    for exercise in &workout.exercises {
        println!("\n    {} ({})", exercise.name, exercise.category);
        for (i, set) in exercise.sets.iter().enumerate() {
            let mark = if set.completed { "✓" } else { " " };
            println!("      {} {}", mark, set_line(i, set));
        }
    }
    Ok(())
}

async fn cmd_delete(app: &App, id: &str) -> Result<()> {
    app.store.delete_workout(id).await;
    app.check_store_error("delete workout")?;

    println!("✓ Workout deleted");
    println!(
        "  {} remaining",
        pluralize(app.store.workouts().len(), "workout")
    );
    Ok(())
}

// ============================================================================
// Progress and profile
// ============================================================================

async fn cmd_progress(app: &App) -> Result<()> {
    app.store.fetch_workouts().await;
    app.store.fetch_stats().await;
    app.check_store_error("fetch workouts")?;

    let stats = app.store.stats().unwrap_or_default();
    let target = app.config.goals.weekly_workouts;

    println!("\nYour Progress");
    println!("  Keep up the great work!\n");
    println!("  {:<16}{}", "Total Workouts", stats.total_workouts);
    println!("  {:<16}{}", "Total Minutes", stats.total_duration);
    println!("  {:<16}{}", "This Week", stats.workouts_this_week);
    println!("  {:<16}{}", "Steps Today", stats.total_steps_today);

    let workouts = app.store.workouts();
    if !workouts.is_empty() {
        let week = weekly_activity(&workouts, Local::now().date_naive());
        let max = week.iter().map(|d| d.exercises).max().unwrap_or(0).max(10);

        println!("\nWeekly Activity");
        println!("  Exercises completed per day");
        for day in &week {
            println!("  {} {:>3} {}", day.label, day.exercises, bar(day.exercises, max, 30));
        }
    }

    println!("\nWorkout Streak");
    println!(
        "  {} this week",
        pluralize(stats.workouts_this_week as usize, "day")
    );

    let percent = goal_progress(stats.workouts_this_week, target);
    println!("\nWeekly Goals");
    println!(
        "  {} Workouts per week  {}/{}{}",
        target,
        stats.workouts_this_week,
        target,
        if percent >= 100 { "  ✓" } else { "" }
    );
    println!("  [{:<20}] {}%", bar(percent as usize, 100, 20), percent);
    Ok(())
}

async fn cmd_profile(app: &App) -> Result<()> {
    app.store.fetch_stats().await;
    let stats = app.store.stats().unwrap_or_default();

    println!("\nFitness Enthusiast");
    println!("  Keep pushing your limits!\n");
    println!("  {:<16}{}", "Total Workouts", stats.total_workouts);
    println!("  {:<16}{}", "Total Minutes", stats.total_duration);
    println!("  {:<16}{}", "This Month", stats.workouts_this_month);
    println!("\n  Backend: {}", app.store.api().base_url());
    println!("  Data: {}", app.config.data.data_dir.display());
    println!("  fitlog v{}", env!("CARGO_PKG_VERSION"));
    Ok(())
}

/// Library served by the backend, or the built-in one when it is unreachable
async fn exercise_templates(app: &App) -> Vec<ExerciseTemplate> {
    match app.store.api().list_exercises().await {
        Ok(templates) if !templates.is_empty() => templates,
        Ok(_) => exercise_library().to_vec(),
        Err(e) => {
            tracing::warn!("Using built-in exercise library: {}", e);
            exercise_library().to_vec()
        }
    }
}

async fn cmd_exercises(app: &App, category: Option<&str>) -> Result<()> {
    let templates = exercise_templates(app).await;
    let mut categories = catalog::categories_of(&templates);

    if let Some(wanted) = category {
        let known = categories.join(", ");
        categories.retain(|c| c.eq_ignore_ascii_case(wanted.trim()));
        if categories.is_empty() {
            return Err(Error::Other(format!(
                "Unknown category '{}'. Known: {}",
                wanted, known
            )));
        }
    }

    for name in categories {
        println!("{}", name);
        for template in catalog::exercises_in_category(&templates, name) {
            println!("  {}", template.name);
        }
    }
    Ok(())
}

// ============================================================================
// Steps
// ============================================================================

async fn cmd_steps_set(app: &App, count: u64) -> Result<()> {
    app.store.update_steps(count);
    app.store.save_steps(&today(), count).await;

    println!("✓ Steps today: {}", app.store.steps());
    if app.store.stats().is_none() {
        eprintln!("  Warning: steps could not be confirmed by the backend");
    }
    Ok(())
}

async fn cmd_steps_track(app: &App, baseline: u64) -> Result<()> {
    let pedometer = ChannelPedometer::new();
    if baseline > 0 {
        pedometer.record(baseline);
    }

    let feed = pedometer.clone();
    let reader = async move {
        // Deltas only count once the tracker is listening
        for _ in 0..LISTENER_WAIT_ATTEMPTS {
            if feed.listener_count() > 0 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        tokio::task::spawn_blocking(move || read_step_deltas(&feed)).await
    };

    let tracker = StepTracker::new(&app.store, &pedometer);
    let (summary, read) = tokio::join!(tracker.run(), reader);
    let summary = summary?;
    read.map_err(|e| Error::Other(format!("Step reader failed: {}", e)))?;

    println!("✓ Steps today: {}", summary.total);
    println!("  {}", pluralize(summary.updates, "live update"));
    Ok(())
}

const LISTENER_WAIT_ATTEMPTS: usize = 500;

/// Feed stdin into the pedometer until EOF, then close it
fn read_step_deltas(pedometer: &ChannelPedometer) {
    let stdin = std::io::stdin();
    for line in stdin.lock().lines() {
        let line = match line {
            Ok(line) => line,
            Err(e) => {
                tracing::warn!("Stopped reading steps: {}", e);
                break;
            }
        };
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        match trimmed.parse::<u64>() {
            Ok(steps) => pedometer.record(steps),
            Err(_) => tracing::warn!("Ignoring step line '{}'", trimmed),
        }
    }
    pedometer.close();
}

async fn cmd_steps_history(app: &App, range: Option<DateRange>) -> Result<()> {
    let logs = app.store.api().list_steps(range.as_ref()).await?;
    if logs.is_empty() {
        println!("No steps logged yet");
        return Ok(());
    }

    for log in logs {
        println!("  {}  {:>7}", format_display_date(&log.date), log.steps);
    }
    Ok(())
}

// ============================================================================
// Export
// ============================================================================

async fn cmd_export(app: &App, path: &Path) -> Result<()> {
    app.store.fetch_workouts().await;
    app.check_store_error("fetch workouts")?;

    let workouts = app.store.workouts();
    let rows = export_workouts(&workouts, path)?;

    println!(
        "✓ Exported {} from {}",
        pluralize(rows, "set"),
        pluralize(workouts.len(), "workout")
    );
    println!("  CSV: {}", path.display());
    Ok(())
}
