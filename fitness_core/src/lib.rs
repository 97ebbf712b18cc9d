#![forbid(unsafe_code)]

//! Core library for the fitlog workout tracker.
//!
//! This crate provides:
//! - Domain types (sets, exercises, workouts, stats, step logs)
//! - The HTTP client for the workout backend
//! - The workout store shared by the screens
//! - Pedometer abstraction and step tracking
//! - Draft persistence, CSV export and presentation helpers

pub mod types;
pub mod error;
pub mod api;
pub mod catalog;
pub mod config;
pub mod logging;
pub mod store;
pub mod steps;
pub mod draft;
pub mod export;
pub mod report;

#[cfg(test)]
pub(crate) mod test_support;

// Re-export commonly used types
pub use error::{Error, Result};
pub use types::*;
pub use api::{ApiError, DateRange, HttpWorkoutApi, WorkoutApi};
pub use catalog::{exercise_library, find_exercise};
pub use config::Config;
pub use store::{StoreState, WorkoutStore};
pub use steps::{ChannelPedometer, Pedometer, StepSubscription, StepTracker, UnavailablePedometer};
pub use draft::DraftFile;
pub use export::export_workouts;
