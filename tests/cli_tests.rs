//! CLI command tests

#![cfg(feature = "cli")]

use std::path::PathBuf;

use sales_analytics::cli::commands::clean::{CleanArgs, handle_clean};
use sales_analytics::cli::commands::customer::{CustomerArgs, handle_customer};
use sales_analytics::cli::commands::db::{
    DbInitArgs, DbLoadArgs, DbStatusArgs, DbTruncateArgs, handle_db_init, handle_db_load,
    handle_db_status, handle_db_truncate,
};
use sales_analytics::cli::commands::query::{QueryArgs, handle_query};
use sales_analytics::cli::commands::report::{ReportArgs, handle_report};
use sales_analytics::cli::error::CliError;
use sales_analytics::config::{CONFIG_FILENAME, DEFAULT_DUCKDB_FILENAME, SalesConfig};
use sales_analytics::database::{DuckDBBackend, SalesBackend};
use tempfile::TempDir;

const RAW: &str = "\u{feff}Row ID,Order ID,Order Date,Ship Date,Ship Mode,Customer ID,Customer Name,Segment,Country,City,State,Postal Code,Region,Product ID,Category,Sub-Category,Product Name,Sales,Quantity,Discount,Profit
1,CA-2016-152156,11/8/2016,11/11/2016,Second Class,CG-12520,Claire Gute,Consumer,United States,Henderson,Kentucky,42420,South,FUR-BO-10001798,Furniture,Bookcases,Bush Somerset Collection Bookcase,$261.96,2,0%,$41.91
2,CA-2016-152156,11/8/2016,11/11/2016,Second Class,CG-12520,Claire Gute,Consumer,United States,Henderson,Kentucky,42420,South,FUR-CH-10000454,Furniture,Chairs,Hon Deluxe Fabric Upholstered Stacking Chairs,$731.94,3,0%,$219.58
3,US-2015-108966,10/11/2015,10/18/2015,Standard Class,SO-20335,Sean O'Donnell,Consumer,United States,Fort Lauderdale,Florida,33311,South,FUR-TA-10000577,Furniture,Tables,Bretford CR4500 Series Slim Rectangular Table,$957.58,5,45%,($383.03)
";

fn workspace() -> TempDir {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("raw.csv"), RAW).unwrap();
    dir
}

fn clean_args(dir: &TempDir) -> CleanArgs {
    CleanArgs {
        input: dir.path().join("raw.csv"),
        output: dir.path().join("cleaned.csv"),
        rejects: None,
        workspace: dir.path().to_path_buf(),
        encoding: None,
        output_encoding: None,
        day_first: false,
        json: false,
    }
}

fn load_args(dir: &TempDir) -> DbLoadArgs {
    DbLoadArgs {
        workspace: dir.path().to_path_buf(),
        file: dir.path().join("cleaned.csv"),
        table: None,
        truncate: false,
        no_header: false,
        json: false,
    }
}

fn init(dir: &TempDir) {
    handle_db_init(&DbInitArgs {
        workspace: dir.path().to_path_buf(),
        db_path: None,
    })
    .unwrap();
}

fn prepared_workspace() -> TempDir {
    let dir = workspace();
    handle_clean(&clean_args(&dir)).unwrap();
    init(&dir);
    handle_db_load(&load_args(&dir)).unwrap();
    dir
}

fn open(dir: &TempDir) -> DuckDBBackend {
    DuckDBBackend::new(dir.path().join(DEFAULT_DUCKDB_FILENAME)).unwrap()
}

#[test]
fn test_cli_clean_writes_output_and_rejects() {
    let dir = workspace();
    handle_clean(&clean_args(&dir)).unwrap();

    let cleaned = std::fs::read_to_string(dir.path().join("cleaned.csv")).unwrap();
    assert_eq!(cleaned.lines().count(), 4);
    assert!(cleaned.contains(",2015-10-11,2015-10-18,"));
    assert!(cleaned.contains(",957.58,5,0.45,-383.03"));
    assert!(dir.path().join("cleaned.rejects.csv").exists());
}

#[test]
fn test_cli_clean_missing_input() {
    let dir = TempDir::new().unwrap();
    let result = handle_clean(&clean_args(&dir));
    assert!(matches!(result, Err(CliError::FileNotFound(_))));
}

#[test]
fn test_cli_clean_rejects_unknown_encoding() {
    let dir = workspace();
    let mut args = clean_args(&dir);
    args.encoding = Some("not-a-charset".to_string());
    assert!(handle_clean(&args).is_err());
    assert!(!dir.path().join("cleaned.csv").exists());
}

#[test]
fn test_cli_db_init_writes_config() {
    let dir = workspace();
    init(&dir);

    assert!(dir.path().join(CONFIG_FILENAME).exists());
    assert!(dir.path().join(DEFAULT_DUCKDB_FILENAME).exists());
    assert!(SalesConfig::is_initialized(dir.path()));

    // A second init keeps the existing config and schema
    init(&dir);
}

#[test]
fn test_cli_db_init_custom_path() {
    let dir = workspace();
    handle_db_init(&DbInitArgs {
        workspace: dir.path().to_path_buf(),
        db_path: Some("data/sales.duckdb".to_string()),
    })
    .unwrap();

    assert!(dir.path().join("data/sales.duckdb").exists());
    let config = SalesConfig::load(dir.path()).unwrap();
    assert_eq!(config.database.path, "data/sales.duckdb");
}

#[test]
fn test_cli_commands_require_init() {
    let dir = workspace();
    handle_clean(&clean_args(&dir)).unwrap();

    let result = handle_db_load(&load_args(&dir));
    assert!(matches!(result, Err(CliError::NotInitialized(_))));

    let result = handle_report(&ReportArgs {
        name: "top-products".to_string(),
        workspace: dir.path().to_path_buf(),
        format: "table".to_string(),
        top_n: None,
    });
    assert!(matches!(result, Err(CliError::NotInitialized(_))));
}

#[test]
fn test_cli_load_and_status() {
    let dir = prepared_workspace();

    let totals = open(&dir).order_totals().unwrap();
    assert_eq!(totals.line_items, 3);
    assert_eq!(totals.total_quantity, 10);

    handle_db_status(&DbStatusArgs {
        workspace: dir.path().to_path_buf(),
        limit: 5,
        json: true,
    })
    .unwrap();
}

#[test]
fn test_cli_load_truncate_reload() {
    let dir = prepared_workspace();

    let mut args = load_args(&dir);
    args.truncate = true;
    handle_db_load(&args).unwrap();
    assert_eq!(open(&dir).order_totals().unwrap().line_items, 3);

    handle_db_truncate(&DbTruncateArgs {
        workspace: dir.path().to_path_buf(),
    })
    .unwrap();
    assert_eq!(open(&dir).order_totals().unwrap().line_items, 0);
}

#[test]
fn test_cli_load_rejects_bad_table_name() {
    let dir = prepared_workspace();
    let mut args = load_args(&dir);
    args.table = Some("orders; DROP TABLE orders".to_string());

    assert!(handle_db_load(&args).is_err());
    assert_eq!(open(&dir).order_totals().unwrap().line_items, 3);
}

#[test]
fn test_cli_reports() {
    let dir = prepared_workspace();

    for name in [
        "top-products",
        "monthly-trend",
        "customer-segments",
        "loss-makers",
        "region_summary",
        "above-average-orders",
    ] {
        for format in ["table", "json", "csv"] {
            let args = ReportArgs {
                name: name.to_string(),
                workspace: dir.path().to_path_buf(),
                format: format.to_string(),
                top_n: Some(2),
            };
            handle_report(&args).unwrap_or_else(|e| panic!("{} ({}): {}", name, format, e));
        }
    }
}

#[test]
fn test_cli_report_invalid_arguments() {
    let dir = prepared_workspace();
    let args = |name: &str, format: &str, top_n| ReportArgs {
        name: name.to_string(),
        workspace: dir.path().to_path_buf(),
        format: format.to_string(),
        top_n,
    };

    assert!(matches!(
        handle_report(&args("best-sellers", "table", None)),
        Err(CliError::InvalidArgument(_))
    ));
    assert!(matches!(
        handle_report(&args("top-products", "xml", None)),
        Err(CliError::InvalidArgument(_))
    ));
    assert!(matches!(
        handle_report(&args("top-products", "table", Some(0))),
        Err(CliError::Analysis(_))
    ));
}

#[test]
fn test_cli_customer_lookup() {
    let dir = prepared_workspace();
    let args = |id: &str| CustomerArgs {
        customer_id: id.to_string(),
        workspace: dir.path().to_path_buf(),
        format: "json".to_string(),
    };

    handle_customer(&args("CG-12520")).unwrap();
    handle_customer(&args("NO-00000")).unwrap();
    assert!(matches!(
        handle_customer(&args("CG-12520'; --")),
        Err(CliError::Analysis(_))
    ));
}

#[test]
fn test_cli_query() {
    let dir = prepared_workspace();
    handle_query(&QueryArgs {
        sql: "SELECT region, COUNT(*) AS n FROM orders GROUP BY region".to_string(),
        workspace: dir.path().to_path_buf(),
        format: "csv".to_string(),
    })
    .unwrap();

    let result = handle_query(&QueryArgs {
        sql: "SELECT * FROM no_such_table".to_string(),
        workspace: PathBuf::from(dir.path()),
        format: "table".to_string(),
    });
    assert!(matches!(result, Err(CliError::Database(_))));
}
