//! Built-in exercise library.
//!
//! The screens offer these templates when adding an exercise; picking one
//! fills in the category. The backend serves the same list from
//! `/api/exercises`.

use crate::types::ExerciseTemplate;
use once_cell::sync::Lazy;

/// Categories in display order
pub const CATEGORIES: &[&str] = &["Chest", "Legs", "Back", "Shoulders", "Arms", "Core"];

const LIBRARY: &[(&str, &str)] = &[
    ("Bench Press", "Chest"),
    ("Push Ups", "Chest"),
    ("Incline Dumbbell Press", "Chest"),
    ("Squats", "Legs"),
    ("Leg Press", "Legs"),
    ("Lunges", "Legs"),
    ("Deadlifts", "Back"),
    ("Pull Ups", "Back"),
    ("Bent Over Rows", "Back"),
    ("Overhead Press", "Shoulders"),
    ("Lateral Raises", "Shoulders"),
    ("Front Raises", "Shoulders"),
    ("Bicep Curls", "Arms"),
    ("Tricep Dips", "Arms"),
    ("Hammer Curls", "Arms"),
    ("Planks", "Core"),
    ("Crunches", "Core"),
    ("Russian Twists", "Core"),
];

static DEFAULT_LIBRARY: Lazy<Vec<ExerciseTemplate>> = Lazy::new(|| {
    LIBRARY
        .iter()
        .map(|(name, category)| ExerciseTemplate {
            name: (*name).to_string(),
            category: (*category).to_string(),
        })
        .collect()
});

/// The cached built-in library
pub fn exercise_library() -> &'static [ExerciseTemplate] {
    &DEFAULT_LIBRARY
}

/// Case-insensitive lookup by exercise name
pub fn find_exercise(name: &str) -> Option<&'static ExerciseTemplate> {
    let wanted = name.trim();
    exercise_library()
        .iter()
        .find(|t| t.name.eq_ignore_ascii_case(wanted))
}

/// Templates in `category` (case-insensitive), in `templates` order
pub fn exercises_in_category<'a>(
    templates: &'a [ExerciseTemplate],
    category: &str,
) -> Vec<&'a ExerciseTemplate> {
    templates
        .iter()
        .filter(|t| t.category.eq_ignore_ascii_case(category.trim()))
        .collect()
}

/// Categories present in `templates`: known ones in display order, then the
/// rest as first seen
pub fn categories_of(templates: &[ExerciseTemplate]) -> Vec<&str> {
    let mut categories: Vec<&str> = CATEGORIES
        .iter()
        .copied()
        .filter(|c| templates.iter().any(|t| t.category == *c))
        .collect();
    for template in templates {
        if !categories.contains(&template.category.as_str()) {
            categories.push(&template.category);
        }
    }
    categories
}
