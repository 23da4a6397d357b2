//! Report CLI command

use std::path::PathBuf;

use super::{open_workspace, parse_format, print_result};
use crate::analysis::{Analyzer, ReportKind};
use crate::cli::error::CliError;

/// Report command arguments
#[derive(Debug, Clone)]
pub struct ReportArgs {
    /// Report name (e.g. `top-products`)
    pub name: String,
    pub workspace: PathBuf,
    /// Output format
    pub format: String,
    /// Size of the top-products report, overrides config
    pub top_n: Option<usize>,
}

/// Run one report from the analysis catalog
pub fn handle_report(args: &ReportArgs) -> Result<(), CliError> {
    let kind: ReportKind = args.name.parse().map_err(CliError::InvalidArgument)?;
    let output_format = parse_format(&args.format)?;
    let (config, backend) = open_workspace(&args.workspace)?;

    let analyzer = Analyzer::new(&backend)
        .with_top_n(args.top_n.unwrap_or(config.analysis.top_n))
        .with_thresholds(config.segment_thresholds());

    let result = analyzer.run_report(kind)?;
    print_result(&result, output_format);

    Ok(())
}

