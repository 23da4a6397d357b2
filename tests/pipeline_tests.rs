//! End-to-end tests: clean a raw export, load it into DuckDB, run the catalog

#![cfg(feature = "duckdb-backend")]

use std::path::{Path, PathBuf};

use rust_decimal::Decimal;
use sales_analytics::analysis::{AnalysisError, Analyzer, ReportKind, SegmentThresholds};
use sales_analytics::cleaning::{Cleaner, rejects_path_for};
use sales_analytics::database::{DuckDBBackend, LoadOptions, SalesBackend};
use sales_analytics::models::CustomerValue;
use tempfile::TempDir;

const RAW_HEADER: &str = "Row ID,Order ID,Order Date,Ship Date,Ship Mode,Customer ID,Customer Name,Segment,Country,City,State,Postal Code,Region,Product ID,Category,Sub-Category,Product Name,Sales,Quantity,Discount,Profit";

/// Raw export in windows-1252 with currency symbols, percentages, US dates
/// and one row with a malformed sales value
fn raw_export() -> Vec<u8> {
    let rows = [
        r#"1,CA-2016-100001,1/5/2016,1/8/2016,Standard Class,AA-10000,Alice Adams,Consumer,United States,Seattle,Washington,98103,West,TEC-PH-1001,Technology,Phones,Desk Phone,"$5,000.00",2,0%,"$1,000.00""#,
        r#"2,CA-2016-100001,1/5/2016,1/8/2016,Standard Class,AA-10000,Alice Adams,Consumer,United States,Seattle,Washington,98103,West,FUR-TA-2001,Furniture,Tables,Oak Table,5000.00,1,0,500.00"#,
        r#"3,CA-2016-100002,2/10/2016,2/14/2016,First Class,BB-20000,Bob Brown,Corporate,United States,New York City,New York,10024,East,TEC-PH-1001,Technology,Phones,Desk Phone,"$10,000.01",1,10%,"$2,000.00""#,
        r#"4,CA-2016-100003,2/20/2016,2/25/2016,Second Class,CC-30000,Cara Cole,Home Office,United States,Portland,Oregon,97206,West,OFF-BI-3001,Office Supplies,Binders,CAFE Binder,$200.00,4,20%,($50.00)"#,
        r#"5,CA-2016-100004,3/1/2016,3/3/2016,Second Class,CC-30000,Cara Cole,Home Office,United States,Portland,Oregon,97206,West,FUR-TA-2001,Furniture,Tables,Oak Table,$100.00,1,0,$25.00"#,
        r#"6,CA-2016-100005,3/2/2016,3/4/2016,Second Class,DD-40000,Dan Dole,Consumer,United States,Austin,Texas,78745,Central,OFF-BI-3001,Office Supplies,Binders,CAFE Binder,abc,1,0,1.00"#,
    ];

    let mut text = format!("{}\r\n", RAW_HEADER);
    for row in rows {
        text.push_str(row);
        text.push_str("\r\n");
    }

    // "CAFE" becomes "CAF" followed by 0xE9 (e-acute in windows-1252)
    let mut bytes = Vec::new();
    for chunk in text.split("CAFE") {
        if !bytes.is_empty() {
            bytes.extend_from_slice(b"Caf\xe9");
        }
        bytes.extend_from_slice(chunk.as_bytes());
    }
    bytes
}

struct Pipeline {
    backend: DuckDBBackend,
    cleaned: PathBuf,
    _dir: TempDir,
}

fn clean_into(dir: &Path) -> PathBuf {
    let raw = dir.join("raw.csv");
    std::fs::write(&raw, raw_export()).unwrap();

    let cleaned = dir.join("cleaned.csv");
    let stats = Cleaner::default()
        .clean_file(&raw, &cleaned, &rejects_path_for(&cleaned))
        .unwrap();
    assert_eq!(stats.rows_read, 6);
    assert_eq!(stats.rows_written, 5);
    assert_eq!(stats.rows_quarantined, 1);
    cleaned
}

fn pipeline() -> Pipeline {
    let dir = TempDir::new().unwrap();
    let cleaned = clean_into(dir.path());

    let backend = DuckDBBackend::new(dir.path().join("sales.duckdb")).unwrap();
    backend.initialize().unwrap();
    let stats = backend.load_file(&LoadOptions::new(&cleaned)).unwrap();
    assert_eq!(stats.rows_loaded, 5);
    assert_eq!(stats.rows_rejected, 0);

    Pipeline {
        backend,
        cleaned,
        _dir: dir,
    }
}

#[test]
fn test_cleaned_file_is_canonical() {
    let dir = TempDir::new().unwrap();
    let cleaned = clean_into(dir.path());

    let content = std::fs::read_to_string(&cleaned).unwrap();
    let mut lines = content.lines();
    assert_eq!(
        lines.next().unwrap(),
        "row_id,order_id,order_date,ship_date,ship_mode,customer_id,customer_name,segment,country,city,state,postal_code,region,product_id,category,sub_category,product_name,sales,quantity,discount,profit"
    );
    assert!(
        lines
            .next()
            .unwrap()
            .ends_with(",Desk Phone,5000.00,2,0.00,1000.00")
    );
    assert!(content.contains(",2016-02-20,2016-02-25,"));
    assert!(content.contains(",Caf Binder,200.00,4,0.20,-50.00"));
    assert!(content.is_ascii());

    let rejects = std::fs::read_to_string(rejects_path_for(&cleaned)).unwrap();
    assert!(rejects.starts_with("line,reason,"));
    assert!(rejects.contains("DD-40000"));
}

#[test]
fn test_load_totals_match_cleaned_file() {
    let p = pipeline();
    let totals = p.backend.order_totals().unwrap();

    assert_eq!(totals.line_items, 5);
    assert_eq!(totals.total_sales, Decimal::new(2030001, 2));
    assert_eq!(totals.total_profit, Decimal::new(347500, 2));
    assert_eq!(totals.total_quantity, 9);
}

#[test]
fn test_reload_is_reproducible() {
    let p = pipeline();
    let first = p.backend.order_totals().unwrap();

    let options = LoadOptions::new(&p.cleaned).with_truncate_first(true);
    let stats = p.backend.load_file(&options).unwrap();
    assert_eq!(stats.rows_loaded, 5);
    assert_eq!(p.backend.order_totals().unwrap(), first);

    // Loading again without truncating rejects every row as a duplicate
    let stats = p.backend.load_file(&LoadOptions::new(&p.cleaned)).unwrap();
    assert_eq!(stats.rows_loaded, 0);
    assert_eq!(stats.rows_rejected, 5);
    assert_eq!(p.backend.order_totals().unwrap(), first);

    assert_eq!(p.backend.load_history(10).unwrap().len(), 3);
}

#[test]
fn test_top_products_by_profit() {
    let p = pipeline();
    let top = Analyzer::new(&p.backend)
        .with_top_n(2)
        .top_products_by_profit()
        .unwrap();

    assert_eq!(top.len(), 2);
    assert_eq!(top[0].product_id, "TEC-PH-1001");
    assert_eq!(top[0].profit_rank, 1);
    assert_eq!(top[0].total_profit, Decimal::new(300000, 2));
    assert_eq!(top[1].product_id, "FUR-TA-2001");
    assert_eq!(top[1].total_profit, Decimal::new(52500, 2));

    let all = Analyzer::new(&p.backend).top_products_by_profit().unwrap();
    assert_eq!(all.len(), 3);
}

#[test]
fn test_top_products_tie_at_cut_ordered_by_product_id() {
    let lines = [
        ("P-A", "60.00"),
        ("P-E", "60.00"),
        ("P-B", "90.00"),
        ("P-F", "10.00"),
        ("P-D", "60.00"),
        ("P-C", "80.00"),
        ("P-G", "70.00"),
        ("P-A", "40.00"),
    ];
    let mut content = String::from(
        "row_id,order_id,order_date,ship_date,ship_mode,customer_id,customer_name,segment,country,city,state,postal_code,region,product_id,category,sub_category,product_name,sales,quantity,discount,profit\n",
    );
    for (i, (product_id, profit)) in lines.iter().enumerate() {
        content.push_str(&format!(
            "{},CA-2017-{:06},2017-03-0{},2017-03-09,Standard Class,AA-10000,Alice Adams,Consumer,United States,Seattle,Washington,98103,West,{},Office Supplies,Paper,Paper {},200.00,1,0.00,{}\n",
            i + 1,
            i + 1,
            i + 1,
            product_id,
            product_id,
            profit
        ));
    }

    let dir = TempDir::new().unwrap();
    let cleaned = dir.path().join("cleaned.csv");
    std::fs::write(&cleaned, content).unwrap();

    let backend = DuckDBBackend::in_memory().unwrap();
    backend.initialize().unwrap();
    assert_eq!(
        backend
            .load_file(&LoadOptions::new(&cleaned))
            .unwrap()
            .rows_loaded,
        8
    );

    let top = Analyzer::new(&backend).top_products_by_profit().unwrap();
    let ranked: Vec<(i64, &str, Decimal)> = top
        .iter()
        .map(|p| (p.profit_rank, p.product_id.as_str(), p.total_profit))
        .collect();
    assert_eq!(
        ranked,
        vec![
            (1, "P-A", Decimal::new(10000, 2)),
            (2, "P-B", Decimal::new(9000, 2)),
            (3, "P-C", Decimal::new(8000, 2)),
            (4, "P-G", Decimal::new(7000, 2)),
            (5, "P-D", Decimal::new(6000, 2)),
        ]
    );

    // P-E shares rank 5 with P-D and falls just past the cut
    let six = Analyzer::new(&backend)
        .with_top_n(6)
        .top_products_by_profit()
        .unwrap();
    assert_eq!(six[5].product_id, "P-E");
    assert_eq!(six[5].profit_rank, six[4].profit_rank);
}

#[test]
fn test_top_products_rejects_zero() {
    let p = pipeline();
    let result = Analyzer::new(&p.backend)
        .with_top_n(0)
        .run_report(ReportKind::TopProducts);
    assert!(matches!(result, Err(AnalysisError::InvalidParameter(_))));
}

#[test]
fn test_monthly_trend_in_calendar_order() {
    let p = pipeline();
    let trend = Analyzer::new(&p.backend).monthly_trend().unwrap();

    let months: Vec<(i32, u32, &str)> = trend
        .iter()
        .map(|m| (m.order_year, m.order_month_num, m.order_month.as_str()))
        .collect();
    assert_eq!(
        months,
        vec![(2016, 1, "January"), (2016, 2, "February"), (2016, 3, "March")]
    );
    assert_eq!(trend[1].total_sales, Decimal::new(1020001, 2));
    assert_eq!(trend[1].total_profit, Decimal::new(195000, 2));
}

#[test]
fn test_customer_segment_boundaries() {
    let p = pipeline();
    let segments = Analyzer::new(&p.backend).customer_segments().unwrap();

    let find = |id: &str| segments.iter().find(|s| s.customer_id == id).unwrap();

    // Exactly 10000.00 is not above the high threshold
    assert_eq!(find("AA-10000").total_sales, Decimal::new(1000000, 2));
    assert_eq!(find("AA-10000").value_segment, CustomerValue::Mid);
    assert_eq!(find("AA-10000").order_count, 1);
    assert_eq!(find("BB-20000").value_segment, CustomerValue::High);
    assert_eq!(find("CC-30000").value_segment, CustomerValue::Low);
    assert_eq!(find("CC-30000").order_count, 2);

    assert_eq!(segments[0].customer_id, "BB-20000");
}

#[test]
fn test_customer_segments_follow_thresholds() {
    let p = pipeline();
    let thresholds = SegmentThresholds::new(Decimal::new(9999, 0), Decimal::new(250, 0));
    let segments = Analyzer::new(&p.backend)
        .with_thresholds(thresholds)
        .customer_segments()
        .unwrap();

    for segment in &segments {
        let expected = match segment.customer_id.as_str() {
            "CC-30000" => CustomerValue::Mid,
            _ => CustomerValue::High,
        };
        assert_eq!(segment.value_segment, expected, "{}", segment.customer_id);
    }
}

#[test]
fn test_loss_making_products() {
    let p = pipeline();
    let losses = Analyzer::new(&p.backend).loss_making_products().unwrap();

    assert_eq!(losses.len(), 1);
    assert_eq!(losses[0].product_id, "OFF-BI-3001");
    assert_eq!(losses[0].product_name, "Caf Binder");
    assert_eq!(losses[0].total_profit, Decimal::new(-5000, 2));
}

#[test]
fn test_region_category_summary_view() {
    let p = pipeline();
    let summary = Analyzer::new(&p.backend).region_category_summary().unwrap();

    let keys: Vec<(&str, &str)> = summary
        .iter()
        .map(|s| (s.region.as_str(), s.category.as_str()))
        .collect();
    assert_eq!(
        keys,
        vec![
            ("East", "Technology"),
            ("West", "Furniture"),
            ("West", "Office Supplies"),
            ("West", "Technology"),
        ]
    );
    assert_eq!(summary[1].total_sales, Decimal::new(510000, 2));
    assert_eq!(summary[1].line_items, 2);
}

#[test]
fn test_above_average_orders() {
    let p = pipeline();
    let orders = Analyzer::new(&p.backend).above_average_orders().unwrap();

    let ids: Vec<&str> = orders.iter().map(|o| o.order_id.as_str()).collect();
    assert_eq!(ids, vec!["CA-2016-100002", "CA-2016-100001"]);
    assert_eq!(orders[0].customer_id, "BB-20000");
}

#[test]
fn test_customer_lookup() {
    let p = pipeline();
    let analyzer = Analyzer::new(&p.backend);

    let lines = analyzer.customer_orders("CC-30000").unwrap();
    assert_eq!(lines.len(), 2);
    assert_eq!(lines[0].order_id, "CA-2016-100003");
    assert_eq!(lines[0].discount, Decimal::new(20, 2));
    assert_eq!(lines[1].order_id, "CA-2016-100004");

    assert!(analyzer.customer_orders("ZZ-99999").unwrap().is_empty());
}

#[test]
fn test_customer_lookup_rejects_injection() {
    let p = pipeline();
    let result = Analyzer::new(&p.backend).customer_orders("x' OR '1'='1");
    assert!(matches!(result, Err(AnalysisError::InvalidParameter(_))));

    // The table is untouched
    assert_eq!(p.backend.order_totals().unwrap().line_items, 5);
}
