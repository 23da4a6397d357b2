//! DuckDB database backend implementation
//!
//! Provides an embedded database backend using DuckDB for loading and
//! querying the sales dataset.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::{Mutex, MutexGuard};
use std::time::Instant;

use chrono::{DateTime, NaiveDate, Utc};
use duckdb::{ToSql, params};
use rust_decimal::Decimal;

use super::load::{self, LoadOptions, LoadRun, LoadStats, validate_identifier};
use super::schema::{DatabaseSchema, ORDERS_TABLE, SCHEMA_VERSION, load_sql, order_sql};
use super::{DatabaseError, DatabaseResult, QueryResult, SalesBackend};
use crate::models::OrderTotals;

/// Days from 0001-01-01 (CE day 1) to 1970-01-01
const UNIX_EPOCH_DAYS_FROM_CE: i32 = 719_163;

/// Timestamp layout accepted by `CAST(? AS TIMESTAMP)`
const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.6f";

/// DuckDB database backend
///
/// Supports both file-based persistence and in-memory mode.
pub struct DuckDBBackend {
    /// Path to the database file (None for in-memory)
    db_path: Option<PathBuf>,
    /// DuckDB connection (wrapped in Mutex for thread safety)
    connection: Mutex<duckdb::Connection>,
}

impl DuckDBBackend {
    /// Create a new DuckDB backend with a file-based database
    pub fn new(db_path: impl AsRef<Path>) -> DatabaseResult<Self> {
        let path = db_path.as_ref().to_path_buf();
        let connection = duckdb::Connection::open(&path).map_err(|e| {
            DatabaseError::ConnectionFailed(format!("Failed to open DuckDB: {}", e))
        })?;

        Ok(Self {
            db_path: Some(path),
            connection: Mutex::new(connection),
        })
    }

    /// Create an in-memory DuckDB backend
    ///
    /// Useful for testing where persistence is not needed.
    pub fn in_memory() -> DatabaseResult<Self> {
        let connection = duckdb::Connection::open_in_memory().map_err(|e| {
            DatabaseError::ConnectionFailed(format!("Failed to create in-memory DuckDB: {}", e))
        })?;

        Ok(Self {
            db_path: None,
            connection: Mutex::new(connection),
        })
    }

    /// Get the database file path (None for in-memory)
    pub fn db_path(&self) -> Option<&Path> {
        self.db_path.as_deref()
    }

    /// Check if this is an in-memory database
    pub fn is_in_memory(&self) -> bool {
        self.db_path.is_none()
    }

    fn lock(&self) -> DatabaseResult<MutexGuard<'_, duckdb::Connection>> {
        self.connection
            .lock()
            .map_err(|e| DatabaseError::ConnectionFailed(format!("Lock error: {}", e)))
    }

    /// Execute a SQL statement that doesn't return rows
    fn execute(&self, sql: &str) -> DatabaseResult<usize> {
        self.lock()?
            .execute(sql, [])
            .map_err(|e| DatabaseError::QueryFailed(format!("Execute failed: {}", e)))
    }

    /// Execute multiple SQL statements
    fn execute_batch(&self, sql: &str) -> DatabaseResult<()> {
        self.lock()?
            .execute_batch(sql)
            .map_err(|e| DatabaseError::QueryFailed(format!("Batch execute failed: {}", e)))
    }

    /// Run a query with bound parameters and collect the rows as JSON
    fn run_query(&self, sql: &str, params: &[&dyn ToSql]) -> DatabaseResult<QueryResult> {
        let start = Instant::now();
        let conn = self.lock()?;

        let mut stmt = conn
            .prepare(sql)
            .map_err(|e| DatabaseError::QueryFailed(format!("Prepare failed: {}", e)))?;

        // In DuckDB 1.4+, we need to execute the query first, then get columns
        let mut result_rows = stmt
            .query(params)
            .map_err(|e| DatabaseError::QueryFailed(format!("Query failed: {}", e)))?;

        let column_count = result_rows.as_ref().map(|r| r.column_count()).unwrap_or(0);
        let columns: Vec<String> = (0..column_count)
            .map(|i| {
                result_rows
                    .as_ref()
                    .and_then(|r| r.column_name(i).ok())
                    .map(|s| s.to_string())
                    .unwrap_or_else(|| format!("col{}", i))
            })
            .collect();

        let mut rows = Vec::new();
        while let Some(row) = result_rows
            .next()
            .map_err(|e| DatabaseError::QueryFailed(format!("Row fetch error: {}", e)))?
        {
            rows.push(Self::row_to_json(row, &columns));
        }

        Ok(QueryResult {
            columns,
            rows,
            rows_affected: None,
            execution_time_ms: start.elapsed().as_millis() as u64,
        })
    }

    /// Convert a DuckDB row to a JSON object keyed by column name
    fn row_to_json(row: &duckdb::Row, columns: &[String]) -> serde_json::Value {
        let map = columns
            .iter()
            .enumerate()
            .map(|(i, col_name)| {
                let value = row
                    .get_ref(i)
                    .map(Self::value_ref_to_json)
                    .unwrap_or(serde_json::Value::Null);
                (col_name.clone(), value)
            })
            .collect();

        serde_json::Value::Object(map)
    }

    /// Convert a DuckDB ValueRef to a JSON value
    ///
    /// Decimals are rendered as strings so money never passes through `f64`.
    fn value_ref_to_json(value: duckdb::types::ValueRef) -> serde_json::Value {
        use duckdb::types::{TimeUnit, ValueRef};

        match value {
            ValueRef::Null => serde_json::Value::Null,
            ValueRef::Boolean(b) => serde_json::Value::Bool(b),
            ValueRef::TinyInt(i) => serde_json::Value::Number(i.into()),
            ValueRef::SmallInt(i) => serde_json::Value::Number(i.into()),
            ValueRef::Int(i) => serde_json::Value::Number(i.into()),
            ValueRef::BigInt(i) => serde_json::Value::Number(i.into()),
            ValueRef::HugeInt(i) => match i64::try_from(i) {
                Ok(small) => serde_json::Value::Number(small.into()),
                Err(_) => serde_json::Value::String(i.to_string()),
            },
            ValueRef::UTinyInt(i) => serde_json::Value::Number(i.into()),
            ValueRef::USmallInt(i) => serde_json::Value::Number(i.into()),
            ValueRef::UInt(i) => serde_json::Value::Number(i.into()),
            ValueRef::UBigInt(i) => serde_json::Value::Number(i.into()),
            ValueRef::Float(f) => serde_json::Number::from_f64(f as f64)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            ValueRef::Double(f) => serde_json::Number::from_f64(f)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            ValueRef::Decimal(d) => serde_json::Value::String(d.to_string()),
            ValueRef::Text(bytes) => String::from_utf8_lossy(bytes).into_owned().into(),
            ValueRef::Blob(bytes) => {
                use base64::Engine;
                serde_json::Value::String(base64::engine::general_purpose::STANDARD.encode(bytes))
            }
            ValueRef::Date32(days) => days
                .checked_add(UNIX_EPOCH_DAYS_FROM_CE)
                .and_then(NaiveDate::from_num_days_from_ce_opt)
                .map(|d| serde_json::Value::String(d.format("%Y-%m-%d").to_string()))
                .unwrap_or(serde_json::Value::Null),
            ValueRef::Timestamp(unit, raw) => {
                let micros = match unit {
                    TimeUnit::Second => raw.saturating_mul(1_000_000),
                    TimeUnit::Millisecond => raw.saturating_mul(1_000),
                    TimeUnit::Microsecond => raw,
                    TimeUnit::Nanosecond => raw / 1_000,
                };
                DateTime::<Utc>::from_timestamp_micros(micros)
                    .map(|dt| {
                        serde_json::Value::String(dt.format("%Y-%m-%d %H:%M:%S").to_string())
                    })
                    .unwrap_or(serde_json::Value::Null)
            }
            ValueRef::Time64(_, _)
            | ValueRef::Interval { .. }
            | ValueRef::List(_, _)
            | ValueRef::Enum(_, _)
            | ValueRef::Struct(_, _)
            | ValueRef::Map(_, _)
            | ValueRef::Union(_, _)
            | ValueRef::Array(_, _) => serde_json::Value::String(format!("{:?}", value)),
            #[allow(unreachable_patterns)]
            _ => serde_json::Value::String(format!("{:?}", value)),
        }
    }

    /// Row ids already present in `table`
    fn existing_row_ids(&self, table: &str) -> DatabaseResult<HashSet<i64>> {
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare(&order_sql::select_row_ids(table))
            .map_err(|e| DatabaseError::QueryFailed(format!("Prepare failed: {}", e)))?;
        let ids = stmt
            .query_map([], |row| row.get::<_, i64>(0))
            .map_err(|e| DatabaseError::QueryFailed(format!("Query failed: {}", e)))?
            .collect::<Result<HashSet<_>, _>>()
            .map_err(|e| DatabaseError::QueryFailed(format!("Row fetch error: {}", e)))?;
        Ok(ids)
    }

    fn apply_derived_columns_to(&self, table: &str) -> DatabaseResult<usize> {
        let updated = self.execute(&order_sql::apply_derived(table))?;
        tracing::debug!("Derived columns refreshed for {} rows of {}", updated, table);
        Ok(updated)
    }
}

impl SalesBackend for DuckDBBackend {
    fn initialize(&self) -> DatabaseResult<()> {
        self.execute_batch(&DatabaseSchema::create_tables_sql())?;
        self.execute_batch(DatabaseSchema::create_indexes_sql())?;
        self.execute_batch(DatabaseSchema::create_views_sql())?;

        self.lock()?
            .execute(DatabaseSchema::record_schema_version_sql(), [SCHEMA_VERSION])
            .map_err(|e| {
                DatabaseError::MigrationFailed(format!("Failed to record schema version: {}", e))
            })?;

        tracing::info!(
            "Initialized DuckDB schema v{} ({})",
            SCHEMA_VERSION,
            self.db_path
                .as_ref()
                .map(|p| p.display().to_string())
                .unwrap_or_else(|| "in-memory".to_string())
        );
        Ok(())
    }

    fn execute_query(&self, sql: &str) -> DatabaseResult<QueryResult> {
        self.run_query(sql, &[])
    }

    fn execute_query_params(
        &self,
        sql: &str,
        params: &[serde_json::Value],
    ) -> DatabaseResult<QueryResult> {
        // Bind everything as text; the SQL casts where it needs a type
        let string_params: Vec<Option<String>> = params
            .iter()
            .map(|p| match p {
                serde_json::Value::String(s) => Some(s.clone()),
                serde_json::Value::Null => None,
                other => Some(other.to_string()),
            })
            .collect();

        let param_refs: Vec<&dyn ToSql> = string_params
            .iter()
            .map(|s| s as &dyn ToSql)
            .collect();

        self.run_query(sql, &param_refs)
    }

    fn load_file(&self, options: &LoadOptions) -> DatabaseResult<LoadStats> {
        let start = Instant::now();
        let table = validate_identifier(&options.table)?;
        let mut stats = LoadStats::new(table, &options.path);

        let mut parsed = load::read_cleaned_file(options)?;
        stats.source_sha256 = parsed.source_sha256.clone();
        stats.rows_attempted = parsed.rows_attempted;

        self.execute_batch(&DatabaseSchema::create_orders_table_sql(table))?;

        // After a truncate nothing already in the table can collide
        if !options.truncate_first {
            parsed.reject_existing(&self.existing_row_ids(table)?);
        }
        parsed.rejects.sort_by_key(|r| r.line_number);

        let run_id = stats.run_id.to_string();
        let updated = {
            let mut conn = self.lock()?;
            let tx = conn.transaction().map_err(|e| {
                DatabaseError::TransactionFailed(format!("Failed to begin load: {}", e))
            })?;

            if options.truncate_first {
                let removed = tx.execute(&order_sql::truncate(table), []).map_err(|e| {
                    DatabaseError::LoadFailed(format!("Failed to truncate {}: {}", table, e))
                })?;
                tracing::info!("Truncating {}: {} rows removed", table, removed);
            }

            {
                let mut insert = tx
                    .prepare(&order_sql::insert(table))
                    .map_err(|e| DatabaseError::QueryFailed(format!("Prepare failed: {}", e)))?;

                for (line_number, line) in &parsed.lines {
                    let order_date = line.order_date.map(|d| d.format("%Y-%m-%d").to_string());
                    let ship_date = line.ship_date.map(|d| d.format("%Y-%m-%d").to_string());
                    insert
                        .execute(params![
                            line.row_id,
                            line.order_id,
                            order_date,
                            ship_date,
                            line.ship_mode,
                            line.customer_id,
                            line.customer_name,
                            line.segment,
                            line.country,
                            line.city,
                            line.state,
                            line.postal_code,
                            line.region,
                            line.product_id,
                            line.category,
                            line.sub_category,
                            line.product_name,
                            line.sales.to_string(),
                            line.quantity,
                            line.discount.to_string(),
                            line.profit.to_string(),
                        ])
                        .map_err(|e| {
                            DatabaseError::LoadFailed(format!(
                                "line {} (row_id {}): {}",
                                line_number, line.row_id, e
                            ))
                        })?;
                }

                let mut reject = tx
                    .prepare(load_sql::INSERT_REJECT)
                    .map_err(|e| DatabaseError::QueryFailed(format!("Prepare failed: {}", e)))?;
                for r in &parsed.rejects {
                    reject
                        .execute(params![run_id, r.line_number as i64, r.row_id, r.reason])
                        .map_err(|e| {
                            DatabaseError::LoadFailed(format!("Failed to record reject: {}", e))
                        })?;
                }
            }

            let finished_at = Utc::now();
            tx.execute(
                load_sql::INSERT_RUN,
                params![
                    run_id,
                    table,
                    stats.source_path,
                    stats.source_sha256,
                    parsed.rows_attempted as i64,
                    parsed.lines.len() as i64,
                    parsed.rejects.len() as i64,
                    stats.started_at.format(TIMESTAMP_FORMAT).to_string(),
                    finished_at.format(TIMESTAMP_FORMAT).to_string(),
                ],
            )
            .map_err(|e| DatabaseError::LoadFailed(format!("Failed to record load run: {}", e)))?;

            let updated = tx.execute(&order_sql::apply_derived(table), []).map_err(|e| {
                DatabaseError::LoadFailed(format!("Failed to derive columns: {}", e))
            })?;

            tx.commit().map_err(|e| {
                DatabaseError::TransactionFailed(format!("Failed to commit load: {}", e))
            })?;
            updated
        };
        tracing::debug!("Derived columns refreshed for {} rows of {}", updated, table);

        stats.rows_loaded = parsed.lines.len();
        for r in parsed.rejects {
            stats.add_reject(r);
        }
        stats.duration = start.elapsed();

        if stats.rows_rejected > 0 {
            tracing::warn!(
                "{} of {} rows rejected while loading {}",
                stats.rows_rejected,
                stats.rows_attempted,
                stats.source_path
            );
        }
        tracing::info!(
            "Loaded {} rows into {} from {} ({})",
            stats.rows_loaded,
            table,
            stats.source_path,
            stats.duration_string()
        );

        Ok(stats)
    }

    fn truncate_orders(&self) -> DatabaseResult<usize> {
        let removed = self.execute(&order_sql::truncate(ORDERS_TABLE))?;
        tracing::info!("Truncated {}: {} rows removed", ORDERS_TABLE, removed);
        Ok(removed)
    }

    fn apply_derived_columns(&self) -> DatabaseResult<usize> {
        self.apply_derived_columns_to(ORDERS_TABLE)
    }

    fn order_totals(&self) -> DatabaseResult<OrderTotals> {
        let (line_items, total_sales, total_profit, total_quantity) = self
            .lock()?
            .query_row(order_sql::TOTALS, [], |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, i64>(3)?,
                ))
            })
            .map_err(|e| DatabaseError::QueryFailed(format!("Totals query failed: {}", e)))?;

        let decimal = |raw: &str| {
            Decimal::from_str(raw).map_err(|e| {
                DatabaseError::SerializationError(format!("Bad decimal '{}': {}", raw, e))
            })
        };

        Ok(OrderTotals {
            line_items,
            total_sales: decimal(&total_sales)?,
            total_profit: decimal(&total_profit)?,
            total_quantity,
        })
    }

    fn load_history(&self, limit: usize) -> DatabaseResult<Vec<LoadRun>> {
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare(load_sql::SELECT_RECENT_RUNS)
            .map_err(|e| DatabaseError::QueryFailed(format!("Prepare failed: {}", e)))?;

        let runs = stmt
            .query_map([limit as i64], |row| {
                Ok(LoadRun {
                    run_id: row.get(0)?,
                    target_table: row.get(1)?,
                    source_path: row.get(2)?,
                    source_sha256: row.get(3)?,
                    rows_attempted: row.get(4)?,
                    rows_loaded: row.get(5)?,
                    rows_rejected: row.get(6)?,
                    started_at: row.get(7)?,
                    finished_at: row.get(8)?,
                })
            })
            .map_err(|e| DatabaseError::QueryFailed(format!("Query failed: {}", e)))?
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| DatabaseError::QueryFailed(format!("Row fetch error: {}", e)))?;

        Ok(runs)
    }

    fn health_check(&self) -> DatabaseResult<bool> {
        let result = self.execute_query("SELECT 1 AS healthy")?;
        Ok(!result.rows.is_empty())
    }

    fn backend_type(&self) -> &'static str {
        "duckdb"
    }
}
