//! SQL for the analysis catalog
//!
//! Every query reads the `orders` relation (or the view built on it) and is
//! safe to re-run. Aggregated money is cast to `DECIMAL(18,2)` so it comes back
//! as an exact decimal.

use super::segmentation::SegmentThresholds;

/// Products ranked by summed profit; equal profits share a rank and are
/// listed by `product_id`
pub fn top_products_by_profit(limit: usize) -> String {
    format!(
        r#"
WITH product_profit AS (
    SELECT
        product_id,
        MIN(product_name) AS product_name,
        SUM(profit) AS total_profit
    FROM orders
    GROUP BY product_id
)
SELECT
    RANK() OVER (ORDER BY total_profit DESC) AS profit_rank,
    product_id,
    product_name,
    CAST(total_profit AS DECIMAL(18,2)) AS total_profit
FROM product_profit
ORDER BY profit_rank, product_id
LIMIT {limit}
"#
    )
}

/// Sales and profit per calendar month, oldest first
pub const MONTHLY_TREND: &str = r#"
SELECT
    order_year,
    order_month_num,
    order_month,
    CAST(SUM(sales) AS DECIMAL(18,2)) AS total_sales,
    CAST(SUM(profit) AS DECIMAL(18,2)) AS total_profit
FROM orders
WHERE order_date IS NOT NULL
GROUP BY order_year, order_month_num, order_month
ORDER BY order_year, order_month_num
"#;

/// Customers with lifetime sales, distinct order count and value bucket
pub fn customer_segments(thresholds: &SegmentThresholds) -> String {
    format!(
        r#"
WITH customer_totals AS (
    SELECT
        customer_id,
        MIN(customer_name) AS customer_name,
        SUM(sales) AS total_sales,
        COUNT(DISTINCT order_id) AS order_count
    FROM orders
    GROUP BY customer_id
)
SELECT
    customer_id,
    customer_name,
    CAST(total_sales AS DECIMAL(18,2)) AS total_sales,
    order_count,
    {segment} AS value_segment
FROM customer_totals
ORDER BY customer_totals.total_sales DESC, customer_id
"#,
        segment = thresholds.case_expression("customer_totals.total_sales")
    )
}

/// Products whose summed profit is negative, biggest loss first
pub const LOSS_MAKING_PRODUCTS: &str = r#"
SELECT
    product_id,
    MIN(product_name) AS product_name,
    category,
    CAST(SUM(profit) AS DECIMAL(18,2)) AS total_profit
FROM orders
GROUP BY product_id, category
HAVING SUM(profit) < 0
ORDER BY SUM(profit), product_id
"#;

pub const REGION_CATEGORY_SUMMARY: &str = r#"
SELECT region, category, total_sales, total_profit, line_items
FROM region_category_summary
ORDER BY region, category
"#;

/// Order-level detail for one customer; the id is bound as `?`
pub const CUSTOMER_ORDERS: &str = r#"
SELECT
    row_id,
    order_id,
    order_date,
    ship_date,
    ship_mode,
    product_id,
    product_name,
    sales,
    quantity,
    discount,
    profit
FROM orders
WHERE customer_id = ?
ORDER BY order_date, order_id, row_id
"#;

/// Orders whose total sales exceed the average order total
pub const ABOVE_AVERAGE_ORDERS: &str = r#"
WITH order_sums AS (
    SELECT
        order_id,
        MIN(customer_id) AS customer_id,
        SUM(sales) AS order_total
    FROM orders
    GROUP BY order_id
)
SELECT
    order_id,
    customer_id,
    CAST(order_total AS DECIMAL(18,2)) AS order_total
FROM order_sums
WHERE order_sums.order_total > (SELECT AVG(order_total) FROM order_sums)
ORDER BY order_sums.order_total DESC, order_id
"#;
