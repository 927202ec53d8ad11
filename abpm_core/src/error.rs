//! Error types for the abpm_core library.
//!
//! Hemodynamic formulas never return this type: numeric faults surface as
//! NaN or infinity in the `f64` result. Everything around them (API, files,
//! configuration, input validation) reports through [`Error`].

use std::io;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for abpm_core operations
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

    /// Transport-level HTTP failure
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The API answered with a non-success status
    #[error("API error: {status} from {url}")]
    Api { status: u16, url: String },

    /// Configuration validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// A measurement violates the documented preconditions
    #[error("Invalid measurement: {0}")]
    InvalidMeasurement(String),

    /// Date or timestamp could not be parsed
    #[error("Date error: {0}")]
    Date(String),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// HTTP status for API failures, if there is one
    pub fn status(&self) -> Option<u16> {
        match self {
            Error::Api { status, .. } => Some(*status),
            Error::Http(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}
