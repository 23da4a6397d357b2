//! Models module
//!
//! Defines the order line entity loaded into the `orders` relation and the
//! typed rows returned by the analysis catalog.

pub mod order;
pub mod report;

pub use order::{
    MAX_QUANTITY, MONEY_INTEGER_DIGITS, OPTIONAL_COLUMNS, ORDER_COLUMNS, OrderLine, OrderLineError,
    OrderTotals,
};
pub use report::{
    CustomerOrderLine, CustomerSegment, CustomerValue, LossMaker, MonthlyTrend, OrderTotal,
    ProductProfit, RegionCategorySummary,
};
