//! Storage layer for the sales dataset
//!
//! This module provides:
//! - the `orders` relation, load audit tables and summary view ([`schema`])
//! - parsing of cleaned files into order lines ([`load`])
//! - the [`SalesBackend`] trait and its DuckDB implementation
//! - generic query results and their table/JSON/CSV rendering

use serde::{Deserialize, Serialize};

#[cfg(feature = "duckdb-backend")]
pub mod duckdb;

pub mod load;
pub mod schema;

#[cfg(feature = "duckdb-backend")]
pub use self::duckdb::DuckDBBackend;

pub use load::{LoadOptions, LoadReject, LoadRun, LoadStats};
pub use schema::DatabaseSchema;

use crate::models::OrderTotals;

/// Error type for database operations
#[derive(Debug, thiserror::Error)]
pub enum DatabaseError {
    /// Failed to connect to database
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Query execution failed
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Load of a cleaned file failed as a whole
    #[error("Load failed: {0}")]
    LoadFailed(String),

    /// Schema migration failed
    #[error("Migration failed: {0}")]
    MigrationFailed(String),

    /// Transaction failed
    #[error("Transaction failed: {0}")]
    TransactionFailed(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// Database not initialized
    #[error("Database not initialized. Run 'db init' first.")]
    NotInitialized,

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// IO error
    #[error("IO error: {0}")]
    IoError(String),
}

/// Result type for database operations
pub type DatabaseResult<T> = Result<T, DatabaseError>;

/// Query result row as a JSON value
pub type QueryRow = serde_json::Value;

/// Query result set
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryResult {
    /// Column names
    pub columns: Vec<String>,
    /// Rows of data
    pub rows: Vec<QueryRow>,
    /// Number of rows affected (for INSERT/UPDATE/DELETE)
    pub rows_affected: Option<u64>,
    /// Execution time in milliseconds
    pub execution_time_ms: u64,
}

impl QueryResult {
    /// Create a new query result
    pub fn new(columns: Vec<String>, rows: Vec<QueryRow>) -> Self {
        Self {
            columns,
            rows,
            rows_affected: None,
            execution_time_ms: 0,
        }
    }

    /// Create an empty result
    pub fn empty() -> Self {
        Self::new(Vec::new(), Vec::new())
    }

    /// Get the number of rows
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Check if the result is empty
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Storage backend for the sales dataset
///
/// Implementations hold a single connection; every method takes `&self` and
/// serializes access internally.
pub trait SalesBackend: Send + Sync {
    /// Create tables, indexes and the summary view if they don't exist
    fn initialize(&self) -> DatabaseResult<()>;

    /// Execute a SQL query and return results
    fn execute_query(&self, sql: &str) -> DatabaseResult<QueryResult>;

    /// Execute a parameterized SQL query
    ///
    /// Parameters use `?` placeholders and are bound as text.
    fn execute_query_params(
        &self,
        sql: &str,
        params: &[serde_json::Value],
    ) -> DatabaseResult<QueryResult>;

    /// Bulk-load a cleaned file, recording the run and its rejects
    fn load_file(&self, options: &LoadOptions) -> DatabaseResult<LoadStats>;

    /// Remove every row from `orders`
    ///
    /// # Returns
    /// Number of rows removed
    fn truncate_orders(&self) -> DatabaseResult<usize>;

    /// Fill `order_month`, `order_month_num`, `order_year` and `shipping_days`
    fn apply_derived_columns(&self) -> DatabaseResult<usize>;

    /// Line count and sums over `orders`
    fn order_totals(&self) -> DatabaseResult<OrderTotals>;

    /// Most recent load runs, newest first
    fn load_history(&self, limit: usize) -> DatabaseResult<Vec<LoadRun>>;

    /// Check if database is healthy and accessible
    fn health_check(&self) -> DatabaseResult<bool>;

    /// Get the database backend type name
    fn backend_type(&self) -> &'static str;
}

/// Output format for query results
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// ASCII table format (default)
    #[default]
    Table,
    /// JSON format
    Json,
    /// CSV format
    Csv,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "table" => Ok(OutputFormat::Table),
            "json" => Ok(OutputFormat::Json),
            "csv" => Ok(OutputFormat::Csv),
            _ => Err(format!("Unknown output format: {}", s)),
        }
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Table => write!(f, "table"),
            OutputFormat::Json => write!(f, "json"),
            OutputFormat::Csv => write!(f, "csv"),
        }
    }
}

/// Format query results for display
pub fn format_query_result(result: &QueryResult, format: OutputFormat) -> String {
    match format {
        OutputFormat::Json => {
            serde_json::to_string_pretty(&result.rows).unwrap_or_else(|_| "[]".to_string())
        }
        OutputFormat::Csv => format_as_csv(result),
        OutputFormat::Table => format_as_table(result),
    }
}

fn cell_text(value: &serde_json::Value, null: &str) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        serde_json::Value::Null => null.to_string(),
        other => other.to_string(),
    }
}

fn format_as_csv(result: &QueryResult) -> String {
    let mut writer = csv::Writer::from_writer(Vec::new());

    let mut records = vec![result.columns.clone()];
    records.extend(result.rows.iter().map(|row| {
        result
            .columns
            .iter()
            .map(|col| cell_text(row.get(col).unwrap_or(&serde_json::Value::Null), ""))
            .collect()
    }));

    for record in &records {
        if let Err(e) = writer.write_record(record) {
            tracing::warn!("Failed to render CSV row: {}", e);
        }
    }

    writer
        .into_inner()
        .map(|bytes| String::from_utf8_lossy(&bytes).into_owned())
        .unwrap_or_default()
}

fn format_as_table(result: &QueryResult) -> String {
    if result.is_empty() {
        return "(0 rows)".to_string();
    }

    let cells: Vec<Vec<String>> = result
        .rows
        .iter()
        .map(|row| {
            result
                .columns
                .iter()
                .map(|col| cell_text(row.get(col).unwrap_or(&serde_json::Value::Null), "null"))
                .collect()
        })
        .collect();

    // Column widths
    let mut widths: Vec<usize> = result.columns.iter().map(|c| c.chars().count()).collect();
    for row in &cells {
        for (i, value) in row.iter().enumerate() {
            widths[i] = widths[i].max(value.chars().count());
        }
    }

    let mut output = String::new();

    let header: Vec<String> = result
        .columns
        .iter()
        .enumerate()
        .map(|(i, c)| format!("{:width$}", c, width = widths[i]))
        .collect();
    output.push_str(&header.join(" | "));
    output.push('\n');

    let separator: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
    output.push_str(&separator.join("-+-"));
    output.push('\n');

    for row in &cells {
        let values: Vec<String> = row
            .iter()
            .enumerate()
            .map(|(i, value)| format!("{:width$}", value, width = widths[i]))
            .collect();
        output.push_str(values.join(" | ").trim_end());
        output.push('\n');
    }

    output.push_str(&format!("({} rows)", result.row_count()));

    output
}
