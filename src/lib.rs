//! Sales Analytics - clean, load and analyze retail order data
//!
//! Provides:
//! - Cleaning of raw order exports (encoding detection, header normalization,
//!   tolerant date and currency parsing, row quarantine)
//! - Loading of cleaned files into an embedded DuckDB `orders` relation with
//!   per-run audit records
//! - A catalog of analytical queries (top products, monthly trend, customer
//!   segmentation, loss makers, region summary view, customer lookup)
//! - Workspace configuration via `.sales-analytics.toml`

pub mod analysis;
pub mod cleaning;
#[cfg(feature = "cli")]
pub mod cli;
pub mod config;
pub mod database;
pub mod models;

pub use analysis::{AnalysisError, Analyzer, ReportKind, SegmentThresholds};
pub use cleaning::{CleanError, CleanOptions, CleanStats, Cleaner, OutputEncoding};
pub use config::{ConfigError, SalesConfig};
#[cfg(feature = "duckdb-backend")]
pub use database::DuckDBBackend;
pub use database::{
    DatabaseError, DatabaseResult, LoadOptions, LoadStats, OutputFormat, QueryResult,
    SalesBackend, format_query_result,
};
pub use models::{CustomerValue, OrderLine, OrderTotals};
