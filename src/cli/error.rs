//! CLI-specific error types

use std::path::PathBuf;

use thiserror::Error;

use crate::analysis::AnalysisError;
use crate::cleaning::CleanError;
use crate::config::ConfigError;
use crate::database::DatabaseError;

/// CLI-specific error type
#[derive(Error, Debug)]
pub enum CliError {
    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Database not initialized in {0}. Run 'db init' first.")]
    NotInitialized(PathBuf),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Cleaning failed: {0}")]
    Clean(#[from] CleanError),

    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    #[error("Analysis failed: {0}")]
    Analysis(#[from] AnalysisError),

    #[error("IO error: {0}")]
    IoError(String),
}
