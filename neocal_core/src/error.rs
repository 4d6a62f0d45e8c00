//! Error types for the neocal_core library.

use crate::validation::ValidationError;
use std::io;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for neocal_core operations
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

    /// Configuration validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// One or more patient input fields failed validation
    #[error("Invalid patient input: {0}")]
    Validation(#[from] ValidationError),

    /// Rule evaluation could not complete; no partial schedule exists
    #[error("Milestone calculation failed: {0}")]
    Computation(String),

    /// Settings profile management error
    #[error("Profile error: {0}")]
    Profile(String),

    /// Record store error
    #[error("Persistence error: {0}")]
    Persistence(String),

    /// Generic error
    #[error("{0}")]
    Other(String),
}
