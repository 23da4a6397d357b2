//! Database management CLI commands

use std::path::PathBuf;

use super::open_workspace;
use crate::cli::error::CliError;
use crate::config::{CONFIG_FILENAME, SalesConfig};
use crate::database::{DuckDBBackend, SalesBackend};

/// `db init` arguments
#[derive(Debug, Clone)]
pub struct DbInitArgs {
    pub workspace: PathBuf,
    /// DuckDB file, relative to the workspace
    pub db_path: Option<String>,
}

/// `db load` arguments
#[derive(Debug, Clone)]
pub struct DbLoadArgs {
    pub workspace: PathBuf,
    /// Cleaned file to load
    pub file: PathBuf,
    /// Target relation, overrides config
    pub table: Option<String>,
    /// Empty the target before loading
    pub truncate: bool,
    /// The file has no header row
    pub no_header: bool,
    pub json: bool,
}

/// `db truncate` arguments
#[derive(Debug, Clone)]
pub struct DbTruncateArgs {
    pub workspace: PathBuf,
}

/// `db status` arguments
#[derive(Debug, Clone)]
pub struct DbStatusArgs {
    pub workspace: PathBuf,
    /// Number of recent load runs to show
    pub limit: usize,
    pub json: bool,
}

/// Create the config file (if missing) and the database schema
pub fn handle_db_init(args: &DbInitArgs) -> Result<(), CliError> {
    if !args.workspace.is_dir() {
        return Err(CliError::FileNotFound(args.workspace.clone()));
    }

    let config = if SalesConfig::exists(&args.workspace) {
        let mut config = SalesConfig::load(&args.workspace)?;
        if let Some(path) = &args.db_path {
            config.database.path = path.clone();
            config.save(&args.workspace)?;
        }
        config
    } else {
        let config = match &args.db_path {
            Some(path) => SalesConfig::duckdb(path.clone()),
            None => SalesConfig::new(),
        };
        config.save(&args.workspace)?;
        println!("Wrote {}", args.workspace.join(CONFIG_FILENAME).display());
        config
    };

    let db_path = config.get_duckdb_path(&args.workspace);
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| {
            CliError::IoError(format!("Failed to create {}: {}", parent.display(), e))
        })?;
    }
    let backend = DuckDBBackend::new(&db_path)?;
    backend.initialize()?;

    println!("Database initialized: {}", db_path.display());
    Ok(())
}

/// Load a cleaned file into the database
pub fn handle_db_load(args: &DbLoadArgs) -> Result<(), CliError> {
    if !args.file.exists() {
        return Err(CliError::FileNotFound(args.file.clone()));
    }

    let (mut config, backend) = open_workspace(&args.workspace)?;
    if let Some(table) = &args.table {
        config.load.table = table.clone();
    }
    if args.no_header {
        config.load.skip_header = false;
    }

    let options = config
        .load_options(&args.file)?
        .with_truncate_first(args.truncate);
    let stats = backend.load_file(&options)?;

    if args.json {
        let json = serde_json::to_string_pretty(&stats)
            .map_err(|e| CliError::IoError(format!("Failed to serialize stats: {}", e)))?;
        println!("{}", json);
        return Ok(());
    }

    println!("Load run {}", stats.run_id);
    println!("  Table:     {}", stats.target_table);
    println!("  Source:    {}", stats.source_path);
    println!("  SHA-256:   {}", stats.source_sha256);
    println!("  Attempted: {}", stats.rows_attempted);
    println!("  Loaded:    {}", stats.rows_loaded);
    println!("  Rejected:  {}", stats.rows_rejected);
    for reject in stats.rejects.iter().take(5) {
        println!("    line {}: {}", reject.line_number, reject.reason);
    }
    if stats.rows_rejected > 5 {
        println!("    ... and {} more", stats.rows_rejected - 5);
    }
    println!("  Duration:  {}", stats.duration_string());

    Ok(())
}

/// Remove every row from `orders`
pub fn handle_db_truncate(args: &DbTruncateArgs) -> Result<(), CliError> {
    let (_, backend) = open_workspace(&args.workspace)?;
    let removed = backend.truncate_orders()?;
    println!("Removed {} rows from orders", removed);
    Ok(())
}

/// Show row counts, totals and recent load runs
pub fn handle_db_status(args: &DbStatusArgs) -> Result<(), CliError> {
    let (config, backend) = open_workspace(&args.workspace)?;
    let db_path = config.get_duckdb_path(&args.workspace);

    let healthy = backend.health_check()?;
    let totals = backend.order_totals()?;
    let history = backend.load_history(args.limit)?;

    if args.json {
        let status = serde_json::json!({
            "database": db_path.display().to_string(),
            "backend": backend.backend_type(),
            "healthy": healthy,
            "totals": totals,
            "loadRuns": history,
        });
        let json = serde_json::to_string_pretty(&status)
            .map_err(|e| CliError::IoError(format!("Failed to serialize status: {}", e)))?;
        println!("{}", json);
        return Ok(());
    }

    println!("Database: {} ({})", db_path.display(), backend.backend_type());
    println!("  Healthy:        {}", healthy);
    println!("  Line items:     {}", totals.line_items);
    println!("  Total sales:    {}", totals.total_sales);
    println!("  Total profit:   {}", totals.total_profit);
    println!("  Total quantity: {}", totals.total_quantity);

    if history.is_empty() {
        println!("  No load runs recorded");
    } else {
        println!("  Recent load runs:");
        for run in &history {
            println!(
                "    {}  {} -> {}: {} loaded, {} rejected ({})",
                run.started_at,
                run.source_path,
                run.target_table,
                run.rows_loaded,
                run.rows_rejected,
                run.run_id
            );
        }
    }

    Ok(())
}
