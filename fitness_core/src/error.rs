//! Error types for the fitness_core library.

use std::io;

use crate::api::ApiError;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for fitness_core operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// IO error occurred
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// CSV error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// TOML parsing error
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Remote API call failed
    #[error("API error: {0}")]
    Api(#[from] ApiError),

    /// Configuration validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// A set could not be parsed from user input
    #[error("Invalid set: {0}")]
    InvalidSet(String),

    /// Draft workout file error
    #[error("Draft error: {0}")]
    Draft(String),

    /// Generic error
    #[error("{0}")]
    Other(String),
}
