//! Core domain types for workout tracking.
//!
//! This module defines the fundamental types shared by the store, the API
//! client and the screens:
//! - Sets, exercises and workouts
//! - The create-workout request body
//! - The server-computed stats snapshot
//! - Step logs and exercise templates

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::Error;

// ============================================================================
// Workout Types
// ============================================================================

/// A single set of an exercise
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ExerciseSet {
    pub reps: u32,
    pub weight: f64,
    #[serde(default = "default_completed")]
    pub completed: bool,
}

fn default_completed() -> bool {
    true
}

impl ExerciseSet {
    /// A completed set with the given reps and weight
    pub fn new(reps: u32, weight: f64) -> Self {
        Self {
            reps,
            weight,
            completed: true,
        }
    }
}

/// Parses the `REPSxWEIGHT` form used on the command line, e.g. `10x50` or `8x22.5`.
///
/// A bare rep count (`12`) is a bodyweight set with zero weight.
impl FromStr for ExerciseSet {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let (reps_str, weight_str) = match trimmed.split_once(|c: char| c == 'x' || c == 'X') {
            Some((reps, weight)) => (reps.trim(), weight.trim()),
            None => (trimmed, "0"),
        };

        let reps = reps_str
            .parse::<u32>()
            .map_err(|_| Error::InvalidSet(format!("'{}': reps must be a whole number", s)))?;
        let weight = weight_str
            .parse::<f64>()
            .map_err(|_| Error::InvalidSet(format!("'{}': weight must be a number", s)))?;

        if !weight.is_finite() || weight < 0.0 {
            return Err(Error::InvalidSet(format!(
                "'{}': weight must be zero or positive",
                s
            )));
        }

        Ok(ExerciseSet::new(reps, weight))
    }
}

impl fmt::Display for ExerciseSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} reps × {}kg", self.reps, self.weight)
    }
}

/// An exercise with its ordered sets
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Exercise {
    pub name: String,
    pub category: String,
    pub sets: Vec<ExerciseSet>,
}

impl Exercise {
    pub fn new(name: impl Into<String>, category: impl Into<String>, sets: Vec<ExerciseSet>) -> Self {
        Self {
            name: name.into(),
            category: category.into(),
            sets,
        }
    }
}

/// A persisted workout as returned by the server
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Workout {
    #[serde(
        rename = "_id",
        alias = "id",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub id: Option<String>,
    pub date: String,
    #[serde(default)]
    pub exercises: Vec<Exercise>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
}

/// Request body for creating a workout
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct NewWorkout {
    pub date: String,
    pub exercises: Vec<Exercise>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

// ============================================================================
// Stats and Steps
// ============================================================================

/// Server-computed aggregate snapshot.
///
/// The client never derives these figures itself. Fields it does not know
/// about are kept in `extra` so the snapshot round-trips untouched.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct Stats {
    #[serde(default)]
    pub total_workouts: u64,
    #[serde(default)]
    pub total_duration: u64,
    #[serde(default)]
    pub workouts_this_week: u64,
    #[serde(default)]
    pub workouts_this_month: u64,
    #[serde(default)]
    pub total_steps_today: u64,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// Daily step count as submitted to and listed by the server
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct StepLog {
    pub date: String,
    pub steps: u64,
}

/// An entry of the exercise library
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ExerciseTemplate {
    pub name: String,
    pub category: String,
}
