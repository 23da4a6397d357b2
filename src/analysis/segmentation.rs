//! Customer value segmentation thresholds

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::models::CustomerValue;

/// Lifetime-sales cut-offs for the customer value buckets
///
/// Totals strictly above `high` are High-Value, strictly above `mid` are
/// Mid-Value, anything else is Low-Value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SegmentThresholds {
    pub high: Decimal,
    pub mid: Decimal,
}

impl Default for SegmentThresholds {
    fn default() -> Self {
        Self {
            high: Decimal::new(10_000, 0),
            mid: Decimal::new(5_000, 0),
        }
    }
}

impl SegmentThresholds {
    pub fn new(high: Decimal, mid: Decimal) -> Self {
        Self { high, mid }
    }

    /// Bucket a lifetime sales total
    pub fn classify(&self, total_sales: Decimal) -> CustomerValue {
        if total_sales > self.high {
            CustomerValue::High
        } else if total_sales > self.mid {
            CustomerValue::Mid
        } else {
            CustomerValue::Low
        }
    }

    /// SQL `CASE` expression equivalent to [`classify`](Self::classify) over `column`
    pub fn case_expression(&self, column: &str) -> String {
        format!(
            "CASE WHEN {column} > {high} THEN '{h}' WHEN {column} > {mid} THEN '{m}' ELSE '{l}' END",
            column = column,
            high = self.high,
            mid = self.mid,
            h = CustomerValue::High.label(),
            m = CustomerValue::Mid.label(),
            l = CustomerValue::Low.label(),
        )
    }
}
