//! Order line item model
//!
//! One `OrderLine` is one row of the cleaned dataset: a single product within an
//! order. Values here are already canonical (ISO dates, plain two-decimal
//! numbers), so parsing is strict; the tolerant parsers live in
//! [`crate::cleaning::values`].

use std::str::FromStr;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Canonical column order of the cleaned file and the `orders` relation.
pub const ORDER_COLUMNS: [&str; 21] = [
    "row_id",
    "order_id",
    "order_date",
    "ship_date",
    "ship_mode",
    "customer_id",
    "customer_name",
    "segment",
    "country",
    "city",
    "state",
    "postal_code",
    "region",
    "product_id",
    "category",
    "sub_category",
    "product_name",
    "sales",
    "quantity",
    "discount",
    "profit",
];

/// Columns that may be absent from a source file.
pub const OPTIONAL_COLUMNS: [&str; 3] = ["city", "state", "postal_code"];

/// Largest quantity the `orders.quantity` column (`INTEGER`) can hold
pub const MAX_QUANTITY: i64 = i32::MAX as i64;

/// Integer digits available to `sales` and `profit` (`DECIMAL(12,2)`)
pub const MONEY_INTEGER_DIGITS: u32 = 10;

/// Errors raised while building an [`OrderLine`] from canonical text values
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum OrderLineError {
    #[error("missing value for required column '{0}'")]
    MissingField(&'static str),

    #[error("invalid value '{value}' for column '{field}': {reason}")]
    InvalidField {
        field: &'static str,
        value: String,
        reason: String,
    },

    #[error("ship_date {ship_date} is before order_date {order_date}")]
    ShipBeforeOrder {
        order_date: NaiveDate,
        ship_date: NaiveDate,
    },
}

/// A single order line item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderLine {
    pub row_id: i64,
    pub order_id: String,
    pub order_date: Option<NaiveDate>,
    pub ship_date: Option<NaiveDate>,
    pub ship_mode: String,
    pub customer_id: String,
    pub customer_name: String,
    pub segment: String,
    pub country: String,
    pub city: Option<String>,
    pub state: Option<String>,
    pub postal_code: Option<String>,
    pub region: String,
    pub product_id: String,
    pub category: String,
    pub sub_category: String,
    pub product_name: String,
    pub sales: Decimal,
    pub quantity: i64,
    pub discount: Decimal,
    pub profit: Decimal,
}

impl OrderLine {
    /// Build an order line from canonical text values.
    ///
    /// `lookup` returns the raw cell for a column name, or `None` when the column
    /// is absent. Empty cells are missing; a date cell equal to `missing_marker`
    /// is missing too. Values that would not fit their `orders` column are
    /// rejected here rather than at insert time.
    pub fn from_canonical<'a, F>(lookup: F, missing_marker: &str) -> Result<Self, OrderLineError>
    where
        F: Fn(&str) -> Option<&'a str>,
    {
        let cell = |name: &'static str| -> Option<&'a str> {
            lookup(name).map(str::trim).filter(|v| !v.is_empty())
        };
        let required = |name: &'static str| -> Result<String, OrderLineError> {
            cell(name)
                .map(str::to_string)
                .ok_or(OrderLineError::MissingField(name))
        };
        let date = |name: &'static str| -> Result<Option<NaiveDate>, OrderLineError> {
            cell(name)
                .filter(|v| *v != missing_marker)
                .map(|v| {
                    NaiveDate::parse_from_str(v, "%Y-%m-%d").map_err(|e| {
                        OrderLineError::InvalidField {
                            field: name,
                            value: v.to_string(),
                            reason: e.to_string(),
                        }
                    })
                })
                .transpose()
        };
        let decimal = |name: &'static str| -> Result<Decimal, OrderLineError> {
            let raw = cell(name).ok_or(OrderLineError::MissingField(name))?;
            Decimal::from_str(raw).map_err(|e| OrderLineError::InvalidField {
                field: name,
                value: raw.to_string(),
                reason: e.to_string(),
            })
        };
        let money = |name: &'static str| -> Result<Decimal, OrderLineError> {
            let value = decimal(name)?;
            let limit = Decimal::from(10_i64.pow(MONEY_INTEGER_DIGITS));
            if value.abs() >= limit {
                return Err(OrderLineError::InvalidField {
                    field: name,
                    value: value.to_string(),
                    reason: format!("magnitude must be below {}", limit),
                });
            }
            Ok(value)
        };

        let row_id_raw = cell("row_id").ok_or(OrderLineError::MissingField("row_id"))?;
        let row_id = row_id_raw
            .parse::<i64>()
            .map_err(|e| OrderLineError::InvalidField {
                field: "row_id",
                value: row_id_raw.to_string(),
                reason: e.to_string(),
            })?;

        let quantity_raw = cell("quantity").ok_or(OrderLineError::MissingField("quantity"))?;
        let quantity = quantity_raw
            .parse::<i64>()
            .map_err(|e| OrderLineError::InvalidField {
                field: "quantity",
                value: quantity_raw.to_string(),
                reason: e.to_string(),
            })?;
        if quantity < 0 {
            return Err(OrderLineError::InvalidField {
                field: "quantity",
                value: quantity_raw.to_string(),
                reason: "quantity must not be negative".to_string(),
            });
        }
        if quantity > MAX_QUANTITY {
            return Err(OrderLineError::InvalidField {
                field: "quantity",
                value: quantity_raw.to_string(),
                reason: format!("quantity must not exceed {}", MAX_QUANTITY),
            });
        }

        let discount = decimal("discount")?;
        if discount < Decimal::ZERO || discount > Decimal::ONE {
            return Err(OrderLineError::InvalidField {
                field: "discount",
                value: discount.to_string(),
                reason: "discount must be a fraction between 0 and 1".to_string(),
            });
        }

        let line = Self {
            row_id,
            order_id: required("order_id")?,
            order_date: date("order_date")?,
            ship_date: date("ship_date")?,
            ship_mode: required("ship_mode")?,
            customer_id: required("customer_id")?,
            customer_name: required("customer_name")?,
            segment: required("segment")?,
            country: required("country")?,
            city: cell("city").map(str::to_string),
            state: cell("state").map(str::to_string),
            postal_code: cell("postal_code").map(str::to_string),
            region: required("region")?,
            product_id: required("product_id")?,
            category: required("category")?,
            sub_category: required("sub_category")?,
            product_name: required("product_name")?,
            sales: money("sales")?,
            quantity,
            discount,
            profit: money("profit")?,
        };

        line.check_dates()?;
        Ok(line)
    }

    /// Enforce `ship_date >= order_date` when both dates are present
    pub fn check_dates(&self) -> Result<(), OrderLineError> {
        match (self.order_date, self.ship_date) {
            (Some(order_date), Some(ship_date)) if ship_date < order_date => {
                Err(OrderLineError::ShipBeforeOrder {
                    order_date,
                    ship_date,
                })
            }
            _ => Ok(()),
        }
    }

    /// Days between order and shipment, if both dates are known
    pub fn shipping_days(&self) -> Option<i64> {
        match (self.order_date, self.ship_date) {
            (Some(order_date), Some(ship_date)) => Some((ship_date - order_date).num_days()),
            _ => None,
        }
    }
}

/// Aggregate totals over the whole `orders` relation
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderTotals {
    pub line_items: i64,
    pub total_sales: Decimal,
    pub total_profit: Decimal,
    pub total_quantity: i64,
}
