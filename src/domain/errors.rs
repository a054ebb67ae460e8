//! Domain error types
//!
//! This module defines the error hierarchy for the intake pipeline.
//! All errors are domain-specific and don't expose third-party types.

use thiserror::Error;

/// Main intake error type
///
/// This is the primary error type used throughout the application.
/// Structural parse failures are wrapped in [`ParseError`] so callers can
/// match on the failure kind instead of the message text.
#[derive(Debug, Error)]
pub enum IntakeError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Database-related errors
    #[error("Database error: {0}")]
    Database(String),

    /// Network/connection errors
    #[error("Connection error: {0}")]
    Connection(String),

    /// Spreadsheet could not be opened or read
    #[error("Spreadsheet error: {0}")]
    Spreadsheet(String),

    /// Structural parse failure for a whole file
    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(String),

    /// Alert delivery errors
    #[error("Alert error: {0}")]
    Alert(String),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(String),

    /// Generic errors with context
    #[error("{0}")]
    Other(String),
}

/// Structural parse failures
///
/// Any of these aborts the whole file; no rows are produced.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    /// No row in the scanned prefix matched enough known header names
    #[error("header row not found in the first {scanned_rows} rows")]
    HeaderNotFound { scanned_rows: usize },

    /// A header row was found but required columns are absent
    #[error("missing required columns: {}", missing.join(", "))]
    MissingRequiredColumns { missing: Vec<String> },

    /// The workbook has no sheet or the first sheet is empty
    #[error("workbook contains no readable sheet")]
    EmptySheet,

    /// The workbook could not be decoded
    #[error("unreadable workbook: {0}")]
    Unreadable(String),
}

impl From<std::io::Error> for IntakeError {
    fn from(err: std::io::Error) -> Self {
        IntakeError::Io(err.to_string())
    }
}

impl From<serde_json::Error> for IntakeError {
    fn from(err: serde_json::Error) -> Self {
        IntakeError::Serialization(err.to_string())
    }
}

impl From<toml::de::Error> for IntakeError {
    fn from(err: toml::de::Error) -> Self {
        IntakeError::Configuration(format!("TOML parse error: {err}"))
    }
}

impl From<tokio_postgres::Error> for IntakeError {
    fn from(err: tokio_postgres::Error) -> Self {
        IntakeError::Database(err.to_string())
    }
}

impl From<calamine::Error> for IntakeError {
    fn from(err: calamine::Error) -> Self {
        IntakeError::Spreadsheet(err.to_string())
    }
}
