//! CLI binary entry point for sales-analytics

#[cfg(feature = "cli")]
use clap::{Parser, Subcommand};
#[cfg(feature = "cli")]
use sales_analytics::cli::commands::clean::{CleanArgs, handle_clean};
#[cfg(feature = "cli")]
use sales_analytics::cli::commands::customer::{CustomerArgs, handle_customer};
#[cfg(feature = "cli")]
use sales_analytics::cli::commands::db::{
    DbInitArgs, DbLoadArgs, DbStatusArgs, DbTruncateArgs, handle_db_init, handle_db_load,
    handle_db_status, handle_db_truncate,
};
#[cfg(feature = "cli")]
use sales_analytics::cli::commands::query::{QueryArgs, handle_query};
#[cfg(feature = "cli")]
use sales_analytics::cli::commands::report::{ReportArgs, handle_report};
#[cfg(feature = "cli")]
use std::path::PathBuf;
#[cfg(feature = "cli")]
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[cfg(feature = "cli")]
#[derive(Parser)]
#[command(name = "sales-analytics")]
#[command(about = "Clean retail sales exports, load them into DuckDB and run reports")]
#[command(version)]
struct Cli {
    /// Log debug output (takes precedence over RUST_LOG)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[cfg(feature = "cli")]
#[derive(Subcommand)]
enum Commands {
    /// Clean a raw sales export into the canonical CSV format
    Clean {
        /// Raw export file
        input: PathBuf,
        /// Cleaned output file
        output: PathBuf,
        /// Rejects file (default: <output stem>.rejects.csv)
        #[arg(long)]
        rejects: Option<PathBuf>,
        /// Workspace path holding the configuration file
        #[arg(short, long, default_value = ".")]
        workspace: PathBuf,
        /// Encoding assumed when detection fails (e.g. windows-1252, latin1)
        #[arg(short, long)]
        encoding: Option<String>,
        /// Output character set (ascii, utf8)
        #[arg(long)]
        output_encoding: Option<String>,
        /// Read ambiguous numeric dates as day/month
        #[arg(long)]
        day_first: bool,
        /// Print statistics as JSON
        #[arg(long)]
        json: bool,
    },

    /// Database management commands
    Db {
        #[command(subcommand)]
        command: DbCommands,
    },

    /// Run a report from the analysis catalog
    Report {
        /// Report name (top-products, monthly-trend, customer-segments, loss-makers,
        /// region-summary, above-average-orders)
        name: String,
        /// Workspace path (default: current directory)
        #[arg(short, long, default_value = ".")]
        workspace: PathBuf,
        /// Output format (table, json, csv)
        #[arg(short, long, default_value = "table")]
        format: String,
        /// Number of products in the top-products report
        #[arg(short = 'n', long)]
        top_n: Option<usize>,
    },

    /// Show every order line for one customer
    Customer {
        /// Customer identifier (e.g. CG-12520)
        customer_id: String,
        /// Workspace path (default: current directory)
        #[arg(short, long, default_value = ".")]
        workspace: PathBuf,
        /// Output format (table, json, csv)
        #[arg(short, long, default_value = "table")]
        format: String,
    },

    /// Execute SQL queries against the workspace database
    Query {
        /// SQL query to execute
        sql: String,
        /// Workspace path (default: current directory)
        #[arg(short, long, default_value = ".")]
        workspace: PathBuf,
        /// Output format (table, json, csv)
        #[arg(short, long, default_value = "table")]
        format: String,
    },
}

#[cfg(feature = "cli")]
#[derive(Subcommand)]
enum DbCommands {
    /// Initialize the database for a workspace
    Init {
        /// Workspace path
        #[arg(default_value = ".")]
        workspace: PathBuf,
        /// DuckDB file, relative to the workspace
        #[arg(long)]
        db_path: Option<String>,
    },

    /// Load a cleaned file into the orders table
    Load {
        /// Cleaned CSV file
        file: PathBuf,
        /// Workspace path
        #[arg(short, long, default_value = ".")]
        workspace: PathBuf,
        /// Target table (default from configuration)
        #[arg(short, long)]
        table: Option<String>,
        /// Empty the target table before loading
        #[arg(long)]
        truncate: bool,
        /// The file has no header row
        #[arg(long)]
        no_header: bool,
        /// Print statistics as JSON
        #[arg(long)]
        json: bool,
    },

    /// Remove every row from the orders table
    Truncate {
        /// Workspace path
        #[arg(default_value = ".")]
        workspace: PathBuf,
    },

    /// Show table totals and recent load runs
    Status {
        /// Workspace path
        #[arg(default_value = ".")]
        workspace: PathBuf,
        /// Number of load runs to show
        #[arg(short, long, default_value_t = 10)]
        limit: usize,
        /// Print status as JSON
        #[arg(long)]
        json: bool,
    },
}

#[cfg(feature = "cli")]
fn init_tracing(verbose: bool) {
    let filter = if verbose {
        tracing_subscriber::EnvFilter::new("debug")
    } else {
        tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"))
    };
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

#[cfg(feature = "cli")]
fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = match cli.command {
        Commands::Clean {
            input,
            output,
            rejects,
            workspace,
            encoding,
            output_encoding,
            day_first,
            json,
        } => {
            let args = CleanArgs {
                input,
                output,
                rejects,
                workspace,
                encoding,
                output_encoding,
                day_first,
                json,
            };
            handle_clean(&args)
        }

        Commands::Db { command } => match command {
            DbCommands::Init { workspace, db_path } => {
                let args = DbInitArgs { workspace, db_path };
                handle_db_init(&args)
            }
            DbCommands::Load {
                file,
                workspace,
                table,
                truncate,
                no_header,
                json,
            } => {
                let args = DbLoadArgs {
                    workspace,
                    file,
                    table,
                    truncate,
                    no_header,
                    json,
                };
                handle_db_load(&args)
            }
            DbCommands::Truncate { workspace } => {
                let args = DbTruncateArgs { workspace };
                handle_db_truncate(&args)
            }
            DbCommands::Status {
                workspace,
                limit,
                json,
            } => {
                let args = DbStatusArgs {
                    workspace,
                    limit,
                    json,
                };
                handle_db_status(&args)
            }
        },

        Commands::Report {
            name,
            workspace,
            format,
            top_n,
        } => {
            let args = ReportArgs {
                name,
                workspace,
                format,
                top_n,
            };
            handle_report(&args)
        }

        Commands::Customer {
            customer_id,
            workspace,
            format,
        } => {
            let args = CustomerArgs {
                customer_id,
                workspace,
                format,
            };
            handle_customer(&args)
        }

        Commands::Query {
            sql,
            workspace,
            format,
        } => {
            let args = QueryArgs {
                sql,
                workspace,
                format,
            };
            handle_query(&args)
        }
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

#[cfg(not(feature = "cli"))]
fn main() {
    eprintln!("CLI feature is not enabled. Build with --features cli");
    std::process::exit(1);
}
