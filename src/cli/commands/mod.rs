//! CLI command implementations

pub mod clean;
pub mod customer;
pub mod db;
pub mod query;
pub mod report;

use std::path::Path;

use crate::cli::error::CliError;
use crate::config::SalesConfig;
use crate::database::{DuckDBBackend, OutputFormat, QueryResult, format_query_result};

/// Load the workspace config and open its database, which must already exist
pub(crate) fn open_workspace(workspace: &Path) -> Result<(SalesConfig, DuckDBBackend), CliError> {
    let config = SalesConfig::load(workspace)?;
    let db_path = config.get_duckdb_path(workspace);
    if !db_path.exists() {
        return Err(CliError::NotInitialized(workspace.to_path_buf()));
    }

    let backend = DuckDBBackend::new(&db_path)?;
    Ok((config, backend))
}

pub(crate) fn parse_format(format: &str) -> Result<OutputFormat, CliError> {
    format.parse().map_err(|e: String| CliError::InvalidArgument(e))
}

/// Print a result to stdout; timing goes to stderr for non-JSON formats
pub(crate) fn print_result(result: &QueryResult, format: OutputFormat) {
    println!("{}", format_query_result(result, format));

    if format != OutputFormat::Json {
        eprintln!("\nExecution time: {}ms", result.execution_time_ms);
    }
}
