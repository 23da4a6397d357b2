//! Typed rows produced by the analysis catalog

use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// One product in the top-N-by-profit ranking
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductProfit {
    /// Rank by summed profit, descending (equal profits share a rank)
    pub profit_rank: i64,
    pub product_id: String,
    pub product_name: String,
    pub total_profit: Decimal,
}

/// Sales and profit for one calendar month
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlyTrend {
    pub order_year: i32,
    /// Calendar month number, 1 = January
    pub order_month_num: u32,
    pub order_month: String,
    pub total_sales: Decimal,
    pub total_profit: Decimal,
}

/// Customer value bucket derived from lifetime sales
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CustomerValue {
    #[serde(rename = "High-Value")]
    High,
    #[serde(rename = "Mid-Value")]
    Mid,
    #[serde(rename = "Low-Value")]
    Low,
}

impl CustomerValue {
    /// Label used in reports and in the SQL classifier
    pub fn label(&self) -> &'static str {
        match self {
            CustomerValue::High => "High-Value",
            CustomerValue::Mid => "Mid-Value",
            CustomerValue::Low => "Low-Value",
        }
    }
}

impl fmt::Display for CustomerValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

impl FromStr for CustomerValue {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "high-value" | "high" => Ok(CustomerValue::High),
            "mid-value" | "mid" => Ok(CustomerValue::Mid),
            "low-value" | "low" => Ok(CustomerValue::Low),
            _ => Err(format!("Unknown customer value segment: {}", s)),
        }
    }
}

/// Lifetime sales and order count for one customer, with its value bucket
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomerSegment {
    pub customer_id: String,
    pub customer_name: String,
    pub total_sales: Decimal,
    /// Number of distinct orders
    pub order_count: i64,
    pub value_segment: CustomerValue,
}

/// A product whose summed profit is negative
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LossMaker {
    pub product_id: String,
    pub product_name: String,
    pub category: String,
    pub total_profit: Decimal,
}

/// One row of the `region_category_summary` view
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegionCategorySummary {
    pub region: String,
    pub category: String,
    pub total_sales: Decimal,
    pub total_profit: Decimal,
    pub line_items: i64,
}

/// Order-level detail for the customer lookup
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomerOrderLine {
    pub row_id: i64,
    pub order_id: String,
    pub order_date: Option<NaiveDate>,
    pub ship_date: Option<NaiveDate>,
    pub ship_mode: String,
    pub product_id: String,
    pub product_name: String,
    pub sales: Decimal,
    pub quantity: i64,
    pub discount: Decimal,
    pub profit: Decimal,
}

/// An order whose total exceeds the average order total
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderTotal {
    pub order_id: String,
    pub customer_id: String,
    pub order_total: Decimal,
}
