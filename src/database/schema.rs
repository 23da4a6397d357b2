//! Database schema definitions
//!
//! DDL for the `orders` relation, the load audit tables and the
//! `region_category_summary` view, plus the SQL statements the backend runs
//! against them. Everything here targets DuckDB.

/// Schema version for migrations
pub const SCHEMA_VERSION: i32 = 1;

/// Relation the analysis catalog reads from
pub const ORDERS_TABLE: &str = "orders";

/// Database schema helper
pub struct DatabaseSchema;

impl DatabaseSchema {
    /// Get the initial schema creation SQL
    pub fn create_tables_sql() -> String {
        format!(
            "{}\n{}",
            Self::create_orders_table_sql(ORDERS_TABLE),
            r#"
-- One row per load invocation
CREATE TABLE IF NOT EXISTS load_runs (
    run_id UUID PRIMARY KEY,
    target_table VARCHAR NOT NULL,
    source_path VARCHAR NOT NULL,
    source_sha256 VARCHAR NOT NULL,
    rows_attempted BIGINT NOT NULL,
    rows_loaded BIGINT NOT NULL,
    rows_rejected BIGINT NOT NULL,
    started_at TIMESTAMP NOT NULL,
    finished_at TIMESTAMP NOT NULL
);

-- Rows set aside by a load run
CREATE TABLE IF NOT EXISTS load_rejects (
    run_id UUID NOT NULL,
    line_number BIGINT NOT NULL,
    row_id VARCHAR,
    reason VARCHAR NOT NULL
);

-- Schema version tracking
CREATE TABLE IF NOT EXISTS schema_version (
    version INTEGER PRIMARY KEY,
    applied_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
);
"#
        )
    }

    /// DDL for an order line relation named `table`
    ///
    /// `table` must already be a validated identifier. The derived columns are
    /// nullable and filled after each load.
    pub fn create_orders_table_sql(table: &str) -> String {
        format!(
            r#"
-- Order line items, one row per product within an order
CREATE TABLE IF NOT EXISTS {table} (
    row_id BIGINT PRIMARY KEY,
    order_id VARCHAR NOT NULL,
    order_date DATE,
    ship_date DATE,
    ship_mode VARCHAR NOT NULL,
    customer_id VARCHAR NOT NULL,
    customer_name VARCHAR NOT NULL,
    segment VARCHAR NOT NULL,
    country VARCHAR NOT NULL,
    city VARCHAR,
    state VARCHAR,
    postal_code VARCHAR,
    region VARCHAR NOT NULL,
    product_id VARCHAR NOT NULL,
    category VARCHAR NOT NULL,
    sub_category VARCHAR NOT NULL,
    product_name VARCHAR NOT NULL,
    sales DECIMAL(12,2) NOT NULL,
    quantity INTEGER NOT NULL CHECK (quantity >= 0),
    discount DECIMAL(4,2) NOT NULL CHECK (discount >= 0 AND discount <= 1),
    profit DECIMAL(12,2) NOT NULL,
    order_month VARCHAR,
    order_month_num INTEGER,
    order_year INTEGER,
    shipping_days INTEGER,
    CHECK (order_date IS NULL OR ship_date IS NULL OR ship_date >= order_date)
);
"#
        )
    }

    /// Get index creation SQL
    pub fn create_indexes_sql() -> &'static str {
        r#"
-- Customer lookup
CREATE INDEX IF NOT EXISTS idx_orders_customer ON orders(customer_id);

-- Load history
CREATE INDEX IF NOT EXISTS idx_load_rejects_run ON load_rejects(run_id);
"#
    }

    /// Get view creation SQL
    pub fn create_views_sql() -> &'static str {
        r#"
CREATE OR REPLACE VIEW region_category_summary AS
SELECT
    region,
    category,
    CAST(SUM(sales) AS DECIMAL(18,2)) AS total_sales,
    CAST(SUM(profit) AS DECIMAL(18,2)) AS total_profit,
    COUNT(*) AS line_items
FROM orders
GROUP BY region, category;
"#
    }

    /// Insert a record into schema_version table
    pub fn record_schema_version_sql() -> &'static str {
        "INSERT INTO schema_version (version) VALUES (?) ON CONFLICT (version) DO NOTHING"
    }
}

/// SQL for the order line relation
pub mod order_sql {
    use crate::models::ORDER_COLUMNS;

    /// Parameterized insert; dates and money are bound as text and cast
    pub fn insert(table: &str) -> String {
        let placeholders: Vec<&str> = ORDER_COLUMNS
            .iter()
            .map(|column| match *column {
                "order_date" | "ship_date" => "CAST(? AS DATE)",
                "sales" | "profit" => "CAST(? AS DECIMAL(12,2))",
                "discount" => "CAST(? AS DECIMAL(4,2))",
                _ => "?",
            })
            .collect();

        format!(
            "INSERT INTO {} ({}) VALUES ({})",
            table,
            ORDER_COLUMNS.join(", "),
            placeholders.join(", ")
        )
    }

    pub fn truncate(table: &str) -> String {
        format!("DELETE FROM {}", table)
    }

    pub fn select_row_ids(table: &str) -> String {
        format!("SELECT row_id FROM {}", table)
    }

    /// Recompute the derived calendar and shipping columns
    pub fn apply_derived(table: &str) -> String {
        format!(
            r#"
UPDATE {table} SET
    order_month = monthname(order_date),
    order_month_num = month(order_date),
    order_year = year(order_date),
    shipping_days = date_diff('day', order_date, ship_date)
"#
        )
    }

    pub const TOTALS: &str = r#"
SELECT
    COUNT(*) AS line_items,
    CAST(COALESCE(SUM(sales), 0) AS VARCHAR) AS total_sales,
    CAST(COALESCE(SUM(profit), 0) AS VARCHAR) AS total_profit,
    CAST(COALESCE(SUM(quantity), 0) AS BIGINT) AS total_quantity
FROM orders
"#;
}

/// SQL for the load audit tables
pub mod load_sql {
    pub const INSERT_RUN: &str = r#"
INSERT INTO load_runs (
    run_id, target_table, source_path, source_sha256,
    rows_attempted, rows_loaded, rows_rejected, started_at, finished_at
)
VALUES (CAST(? AS UUID), ?, ?, ?, ?, ?, ?, CAST(? AS TIMESTAMP), CAST(? AS TIMESTAMP))
"#;

    pub const INSERT_REJECT: &str = r#"
INSERT INTO load_rejects (run_id, line_number, row_id, reason)
VALUES (CAST(? AS UUID), ?, ?, ?)
"#;

    pub const SELECT_RECENT_RUNS: &str = r#"
SELECT
    CAST(run_id AS VARCHAR) AS run_id,
    target_table,
    source_path,
    source_sha256,
    rows_attempted,
    rows_loaded,
    rows_rejected,
    strftime(started_at, '%Y-%m-%d %H:%M:%S') AS started_at,
    strftime(finished_at, '%Y-%m-%d %H:%M:%S') AS finished_at
FROM load_runs
ORDER BY load_runs.started_at DESC
LIMIT ?
"#;
}
