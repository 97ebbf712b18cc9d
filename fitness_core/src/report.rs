//! Presentation helpers shared by the screens.
//!
//! Nothing in here touches the store or the network; these turn workouts
//! and stats into the strings and series the screens print.

use chrono::{Duration, NaiveDate};

use crate::types::{ExerciseSet, Workout};

/// Wire format of workout dates
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// One bar of the weekly activity chart
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DayActivity {
    pub date: NaiveDate,
    /// Short weekday name, e.g. `Mon`
    pub label: String,
    /// Exercises logged across all workouts on that day
    pub exercises: usize,
}

/// `2024-01-15` → `Jan 15, 2024`. Anything unparsable comes back unchanged.
pub fn format_display_date(date: &str) -> String {
    match NaiveDate::parse_from_str(date, DATE_FORMAT) {
        Ok(d) => d.format("%b %d, %Y").to_string(),
        Err(_) => date.to_string(),
    }
}

/// Exercise counts for the seven days ending on `today`, oldest first.
pub fn weekly_activity(workouts: &[Workout], today: NaiveDate) -> Vec<DayActivity> {
    (0..7)
        .rev()
        .map(|days_ago| {
            let date = today - Duration::days(days_ago);
            let key = date.format(DATE_FORMAT).to_string();
            let exercises = workouts
                .iter()
                .filter(|w| w.date == key)
                .map(|w| w.exercises.len())
                .sum();
            DayActivity {
                date,
                label: date.format("%a").to_string(),
                exercises,
            }
        })
        .collect()
}

/// Percentage of `target` reached, capped at 100. A zero target counts as met.
pub fn goal_progress(done: u64, target: u64) -> u8 {
    if target == 0 {
        return 100;
    }
    (done.saturating_mul(100) / target).min(100) as u8
}

/// `1 set`, `2 sets`
pub fn pluralize(count: usize, word: &str) -> String {
    if count == 1 {
        format!("{} {}", count, word)
    } else {
        format!("{} {}s", count, word)
    }
}

/// `Set 1: 10 reps × 50kg` for the zero-based `index`
pub fn set_line(index: usize, set: &ExerciseSet) -> String {
    format!("Set {}: {}", index + 1, set)
}

/// Horizontal bar of `width` cells filled to `value / max`
pub fn bar(value: usize, max: usize, width: usize) -> String {
    if max == 0 {
        return String::new();
    }
    let filled = (value * width + max / 2) / max;
    "█".repeat(filled.min(width))
}
