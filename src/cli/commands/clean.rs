//! Clean CLI command

use std::path::PathBuf;

use crate::cleaning::{Cleaner, OutputEncoding, rejects_path_for};
use crate::cli::error::CliError;
use crate::config::SalesConfig;

/// Clean command arguments
#[derive(Debug, Clone)]
pub struct CleanArgs {
    /// Raw export to clean
    pub input: PathBuf,
    /// Cleaned file to write
    pub output: PathBuf,
    /// Rejects file (default: `<output stem>.rejects.csv`)
    pub rejects: Option<PathBuf>,
    /// Workspace path (for configuration)
    pub workspace: PathBuf,
    /// Fallback encoding label, overrides config
    pub encoding: Option<String>,
    /// Output character set, overrides config
    pub output_encoding: Option<String>,
    /// Read ambiguous dates as day/month
    pub day_first: bool,
    /// Print statistics as JSON
    pub json: bool,
}

/// Clean a raw export into the canonical format
pub fn handle_clean(args: &CleanArgs) -> Result<(), CliError> {
    if !args.input.exists() {
        return Err(CliError::FileNotFound(args.input.clone()));
    }

    let mut config = SalesConfig::load(&args.workspace)?;
    if let Some(encoding) = &args.encoding {
        config.cleaning.default_encoding = encoding.clone();
    }
    if let Some(output_encoding) = &args.output_encoding {
        config.cleaning.output_encoding = output_encoding
            .parse::<OutputEncoding>()
            .map_err(CliError::InvalidArgument)?;
    }
    if args.day_first {
        config.cleaning.day_first = true;
    }

    let rejects = args
        .rejects
        .clone()
        .unwrap_or_else(|| rejects_path_for(&args.output));

    let cleaner = Cleaner::new(config.clean_options()?);
    let stats = cleaner.clean_file(&args.input, &args.output, &rejects)?;

    if args.json {
        let json = serde_json::to_string_pretty(&stats)
            .map_err(|e| CliError::IoError(format!("Failed to serialize stats: {}", e)))?;
        println!("{}", json);
        return Ok(());
    }

    println!("Cleaned {}", args.input.display());
    if let Some(report) = &stats.encoding {
        println!("  Encoding:     {} ({})", report.encoding, report.method);
    }
    println!("  Rows read:    {}", stats.rows_read);
    println!("  Rows written: {}", stats.rows_written);
    println!("  Quarantined:  {}", stats.rows_quarantined);
    println!("  Dates missing: {}", stats.dates_missing);
    println!("  Output:       {}", args.output.display());
    if stats.rows_quarantined > 0 {
        println!("  Rejects:      {}", rejects.display());
        for error in stats.errors.iter().take(5) {
            println!("    {}", error);
        }
        if stats.errors_count > 5 {
            println!("    ... and {} more", stats.errors_count - 5);
        }
    }
    println!("  Duration:     {}", stats.duration_string());

    Ok(())
}
