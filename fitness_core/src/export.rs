//! CSV export of workout history.
//!
//! One row per set, so the file can be pivoted in a spreadsheet without
//! any further flattening. The file is written to a temp file next to the
//! destination and renamed into place.

use crate::{Error, Result, Workout};
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;

/// A row in the CSV output
#[derive(Debug, serde::Serialize)]
struct CsvRow<'a> {
    workout_id: &'a str,
    date: &'a str,
    duration: Option<u32>,
    exercise: &'a str,
    category: &'a str,
    set: usize,
    reps: u32,
    weight: f64,
    completed: bool,
}

/// Write every set of `workouts` to `out`, returning the number of rows
pub fn write_csv<W: Write>(workouts: &[Workout], out: W) -> Result<usize> {
    let mut writer = csv::Writer::from_writer(out);
    let mut rows = 0;

    for workout in workouts {
        let workout_id = workout.id.as_deref().unwrap_or("");
        for exercise in &workout.exercises {
            for (index, set) in exercise.sets.iter().enumerate() {
                writer.serialize(CsvRow {
                    workout_id,
                    date: &workout.date,
                    duration: workout.duration,
                    exercise: &exercise.name,
                    category: &exercise.category,
                    set: index + 1,
                    reps: set.reps,
                    weight: set.weight,
                    completed: set.completed,
                })?;
                rows += 1;
            }
        }
    }

    writer.flush()?;
    Ok(rows)
}

/// Export `workouts` to the CSV file at `path`, replacing it atomically
pub fn export_workouts(workouts: &[Workout], path: &Path) -> Result<usize> {
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(parent)?;

    let mut temp = NamedTempFile::new_in(parent)?;
    let rows = write_csv(workouts, temp.as_file_mut())?;
    temp.as_file().sync_all()?;
    temp.persist(path).map_err(|e| Error::Io(e.error))?;

    tracing::info!("Exported {} sets from {} workouts to {:?}", rows, workouts.len(), path);
    Ok(rows)
}
