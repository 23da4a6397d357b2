//! Error types for the cleaning stage

use std::path::PathBuf;

/// Errors that abort a cleaning run
#[derive(Debug, thiserror::Error)]
pub enum CleanError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Input file not found: {0}")]
    InputNotFound(PathBuf),

    #[error("Input has no header row")]
    MissingHeader,

    #[error("Required column(s) missing from input: {}", .0.join(", "))]
    MissingColumns(Vec<String>),

    #[error("Duplicate column after header normalization: {0}")]
    DuplicateColumn(String),

    #[error("Unknown text encoding label: {0}")]
    UnknownEncoding(String),
}

/// Errors raised while parsing a single cell value
///
/// These never abort a run: the offending row is quarantined with the message.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValueError {
    #[error("empty value")]
    Empty,

    #[error("'{0}' is not a number")]
    NotANumber(String),

    #[error("'{0}' is not a whole number")]
    NotAnInteger(String),

    #[error("{value} is out of range: {reason}")]
    OutOfRange { value: String, reason: String },
}
