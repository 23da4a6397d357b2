//! Customer lookup CLI command

use std::path::PathBuf;

use super::{open_workspace, parse_format, print_result};
use crate::analysis::Analyzer;
use crate::cli::error::CliError;

/// Customer command arguments
#[derive(Debug, Clone)]
pub struct CustomerArgs {
    pub customer_id: String,
    pub workspace: PathBuf,
    /// Output format
    pub format: String,
}

/// Show order-level detail for one customer
pub fn handle_customer(args: &CustomerArgs) -> Result<(), CliError> {
    let output_format = parse_format(&args.format)?;
    let (_, backend) = open_workspace(&args.workspace)?;

    let result = Analyzer::new(&backend).customer_orders_result(&args.customer_id)?;
    print_result(&result, output_format);

    Ok(())
}
