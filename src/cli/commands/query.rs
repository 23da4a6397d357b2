//! SQL query CLI command
//!
//! Executes an ad-hoc SQL query against the workspace database.

use std::path::PathBuf;

use super::{open_workspace, parse_format, print_result};
use crate::cli::error::CliError;
use crate::database::SalesBackend;

/// Query command arguments
#[derive(Debug, Clone)]
pub struct QueryArgs {
    /// SQL query to execute
    pub sql: String,
    /// Workspace path
    pub workspace: PathBuf,
    /// Output format
    pub format: String,
}

/// Execute a SQL query against the workspace database
pub fn handle_query(args: &QueryArgs) -> Result<(), CliError> {
    let output_format = parse_format(&args.format)?;
    let (_, backend) = open_workspace(&args.workspace)?;

    let result = backend.execute_query(&args.sql)?;
    print_result(&result, output_format);

    Ok(())
}
