//! Analysis catalog over the loaded `orders` relation
//!
//! A fixed set of read-only aggregate queries. Each one is independent,
//! re-executable and returns typed rows; [`Analyzer::run_report`] returns the
//! same data as a generic [`QueryResult`] for rendering.

pub mod queries;
pub mod segmentation;

use std::fmt;
use std::str::FromStr;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::de::DeserializeOwned;

pub use segmentation::SegmentThresholds;

use crate::database::{DatabaseError, QueryResult, SalesBackend};
use crate::models::{
    CustomerOrderLine, CustomerSegment, LossMaker, MonthlyTrend, OrderTotal, ProductProfit,
    RegionCategorySummary,
};

/// Default size of the top-by-profit report
pub const DEFAULT_TOP_N: usize = 5;

/// Longest accepted customer identifier
pub const MAX_CUSTOMER_ID_LEN: usize = 32;

static RE_CUSTOMER_ID: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9-]+$").expect("Invalid regex"));

/// Error type for analysis queries
#[derive(Debug, thiserror::Error)]
pub enum AnalysisError {
    #[error(transparent)]
    Database(#[from] DatabaseError),

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Failed to decode query row: {0}")]
    Decode(String),
}

/// Result type for analysis operations
pub type AnalysisResult<T> = Result<T, AnalysisError>;

/// Check a customer identifier before it is bound into the lookup query
pub fn validate_customer_id(customer_id: &str) -> AnalysisResult<&str> {
    if customer_id.is_empty() {
        return Err(AnalysisError::InvalidParameter(
            "customer id must not be empty".to_string(),
        ));
    }
    if customer_id.len() > MAX_CUSTOMER_ID_LEN {
        return Err(AnalysisError::InvalidParameter(format!(
            "customer id is longer than {} characters",
            MAX_CUSTOMER_ID_LEN
        )));
    }
    if !RE_CUSTOMER_ID.is_match(customer_id) {
        return Err(AnalysisError::InvalidParameter(format!(
            "customer id '{}' may only contain letters, digits and '-'",
            customer_id
        )));
    }
    Ok(customer_id)
}

/// Named parameterless reports
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportKind {
    TopProducts,
    MonthlyTrend,
    CustomerSegments,
    LossMakers,
    RegionSummary,
    AboveAverageOrders,
}

impl ReportKind {
    pub const ALL: [ReportKind; 6] = [
        ReportKind::TopProducts,
        ReportKind::MonthlyTrend,
        ReportKind::CustomerSegments,
        ReportKind::LossMakers,
        ReportKind::RegionSummary,
        ReportKind::AboveAverageOrders,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            ReportKind::TopProducts => "top-products",
            ReportKind::MonthlyTrend => "monthly-trend",
            ReportKind::CustomerSegments => "customer-segments",
            ReportKind::LossMakers => "loss-makers",
            ReportKind::RegionSummary => "region-summary",
            ReportKind::AboveAverageOrders => "above-average-orders",
        }
    }
}

impl fmt::Display for ReportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for ReportKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase().replace('_', "-");
        ReportKind::ALL
            .into_iter()
            .find(|kind| kind.name() == wanted)
            .ok_or_else(|| {
                let names: Vec<&str> = ReportKind::ALL.iter().map(|k| k.name()).collect();
                format!("Unknown report: {}. Use one of: {}", s, names.join(", "))
            })
    }
}

/// Runs the analysis catalog against a backend
pub struct Analyzer<'a, B: SalesBackend + ?Sized> {
    backend: &'a B,
    top_n: usize,
    thresholds: SegmentThresholds,
}

impl<'a, B: SalesBackend + ?Sized> Analyzer<'a, B> {
    pub fn new(backend: &'a B) -> Self {
        Self {
            backend,
            top_n: DEFAULT_TOP_N,
            thresholds: SegmentThresholds::default(),
        }
    }

    pub fn with_top_n(mut self, top_n: usize) -> Self {
        self.top_n = top_n;
        self
    }

    pub fn with_thresholds(mut self, thresholds: SegmentThresholds) -> Self {
        self.thresholds = thresholds;
        self
    }

    pub fn thresholds(&self) -> &SegmentThresholds {
        &self.thresholds
    }

    /// SQL behind a named report
    pub fn report_sql(&self, kind: ReportKind) -> String {
        match kind {
            ReportKind::TopProducts => queries::top_products_by_profit(self.top_n),
            ReportKind::MonthlyTrend => queries::MONTHLY_TREND.to_string(),
            ReportKind::CustomerSegments => queries::customer_segments(&self.thresholds),
            ReportKind::LossMakers => queries::LOSS_MAKING_PRODUCTS.to_string(),
            ReportKind::RegionSummary => queries::REGION_CATEGORY_SUMMARY.to_string(),
            ReportKind::AboveAverageOrders => queries::ABOVE_AVERAGE_ORDERS.to_string(),
        }
    }

    /// Run a named report and return the raw rows
    pub fn run_report(&self, kind: ReportKind) -> AnalysisResult<QueryResult> {
        if kind == ReportKind::TopProducts && self.top_n == 0 {
            return Err(AnalysisError::InvalidParameter(
                "top_n must be at least 1".to_string(),
            ));
        }
        tracing::debug!("Running report {}", kind);
        Ok(self.backend.execute_query(&self.report_sql(kind))?)
    }

    /// Top N products by summed profit
    pub fn top_products_by_profit(&self) -> AnalysisResult<Vec<ProductProfit>> {
        decode_rows(self.run_report(ReportKind::TopProducts)?)
    }

    /// Sales and profit per month in calendar order
    pub fn monthly_trend(&self) -> AnalysisResult<Vec<MonthlyTrend>> {
        decode_rows(self.run_report(ReportKind::MonthlyTrend)?)
    }

    /// Customers with lifetime sales and value bucket, highest sales first
    pub fn customer_segments(&self) -> AnalysisResult<Vec<CustomerSegment>> {
        decode_rows(self.run_report(ReportKind::CustomerSegments)?)
    }

    /// Products with a negative summed profit, biggest loss first
    pub fn loss_making_products(&self) -> AnalysisResult<Vec<LossMaker>> {
        decode_rows(self.run_report(ReportKind::LossMakers)?)
    }

    /// Contents of the `region_category_summary` view
    pub fn region_category_summary(&self) -> AnalysisResult<Vec<RegionCategorySummary>> {
        decode_rows(self.run_report(ReportKind::RegionSummary)?)
    }

    /// Orders whose total is above the average order total
    pub fn above_average_orders(&self) -> AnalysisResult<Vec<OrderTotal>> {
        decode_rows(self.run_report(ReportKind::AboveAverageOrders)?)
    }

    /// Order lines for one customer as a raw result
    pub fn customer_orders_result(&self, customer_id: &str) -> AnalysisResult<QueryResult> {
        let customer_id = validate_customer_id(customer_id)?;
        let result = self.backend.execute_query_params(
            queries::CUSTOMER_ORDERS,
            &[serde_json::Value::String(customer_id.to_string())],
        )?;
        if result.is_empty() {
            tracing::info!("No orders found for customer {}", customer_id);
        }
        Ok(result)
    }

    /// Order lines for one customer, by order date
    ///
    /// A malformed identifier is an error; an unknown one yields no rows.
    pub fn customer_orders(&self, customer_id: &str) -> AnalysisResult<Vec<CustomerOrderLine>> {
        decode_rows(self.customer_orders_result(customer_id)?)
    }
}

/// Deserialize every JSON row of a result into `T`
pub fn decode_rows<T: DeserializeOwned>(result: QueryResult) -> AnalysisResult<Vec<T>> {
    result
        .rows
        .into_iter()
        .map(|row| serde_json::from_value(row).map_err(|e| AnalysisError::Decode(e.to_string())))
        .collect()
}
