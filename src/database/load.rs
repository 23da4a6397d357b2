//! Reading a cleaned file into order lines ready for insertion
//!
//! Parsing is kept apart from the backend so the same rejection rules apply
//! regardless of where rows end up.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, Utc};
use csv::{ReaderBuilder, StringRecord};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use super::{DatabaseError, DatabaseResult};
use crate::cleaning::normalize_header;
use crate::models::{OPTIONAL_COLUMNS, ORDER_COLUMNS, OrderLine};

/// Default target relation
pub const DEFAULT_TABLE: &str = "orders";

/// Maximum number of rejects retained in [`LoadStats`]
const MAX_RECORDED_REJECTS: usize = 100;

static RE_IDENTIFIER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]{0,62}$").expect("Invalid regex"));

/// Check that `name` is safe to splice into SQL as a relation name
pub fn validate_identifier(name: &str) -> DatabaseResult<&str> {
    if RE_IDENTIFIER.is_match(name) {
        Ok(name)
    } else {
        Err(DatabaseError::InvalidInput(format!(
            "'{}' is not a valid table name",
            name
        )))
    }
}

/// Compute SHA256 hash of content
pub fn compute_hash(content: &[u8]) -> String {
    format!("{:x}", Sha256::digest(content))
}

/// Options for a bulk load of a cleaned file
#[derive(Debug, Clone)]
pub struct LoadOptions {
    /// Cleaned file to read
    pub path: PathBuf,
    /// Target relation (validated identifier)
    pub table: String,
    pub delimiter: u8,
    pub quote: u8,
    /// First row is a header; columns are then matched by name
    pub skip_header: bool,
    /// Cell value meaning "no date"
    pub missing_marker: String,
    /// Empty the target relation before inserting
    pub truncate_first: bool,
}

impl LoadOptions {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            table: DEFAULT_TABLE.to_string(),
            delimiter: b',',
            quote: b'"',
            skip_header: true,
            missing_marker: String::new(),
            truncate_first: false,
        }
    }

    /// Set the target relation, rejecting anything that is not a plain identifier
    pub fn with_table(mut self, table: &str) -> DatabaseResult<Self> {
        self.table = validate_identifier(table)?.to_string();
        Ok(self)
    }

    pub fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }

    pub fn with_quote(mut self, quote: u8) -> Self {
        self.quote = quote;
        self
    }

    pub fn with_skip_header(mut self, skip_header: bool) -> Self {
        self.skip_header = skip_header;
        self
    }

    pub fn with_missing_marker(mut self, marker: impl Into<String>) -> Self {
        self.missing_marker = marker.into();
        self
    }

    pub fn with_truncate_first(mut self, truncate_first: bool) -> Self {
        self.truncate_first = truncate_first;
        self
    }
}

/// A row set aside during load
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadReject {
    /// Line of the record in the source file (header is line 1)
    pub line_number: u64,
    /// Raw row id, when one could be read
    pub row_id: Option<String>,
    pub reason: String,
}

/// The outcome of parsing a cleaned file
#[derive(Debug, Clone, Default)]
pub struct ParsedLoad {
    /// Accepted lines with their source line number
    pub lines: Vec<(u64, OrderLine)>,
    pub rejects: Vec<LoadReject>,
    /// Data records seen in the file
    pub rows_attempted: usize,
    /// SHA-256 of the file contents
    pub source_sha256: String,
}

impl ParsedLoad {
    /// Move lines whose `row_id` is already present in the target into the rejects
    pub fn reject_existing(&mut self, existing: &HashSet<i64>) {
        if existing.is_empty() {
            return;
        }

        let (kept, clashing): (Vec<_>, Vec<_>) = std::mem::take(&mut self.lines)
            .into_iter()
            .partition(|(_, line)| !existing.contains(&line.row_id));

        self.lines = kept;
        self.rejects
            .extend(clashing.into_iter().map(|(line_number, line)| LoadReject {
                line_number,
                row_id: Some(line.row_id.to_string()),
                reason: format!("row_id {} already exists in the table", line.row_id),
            }));
    }
}

/// Read and parse the cleaned file named by `options`
pub fn read_cleaned_file(options: &LoadOptions) -> DatabaseResult<ParsedLoad> {
    let content = std::fs::read(&options.path).map_err(|e| {
        DatabaseError::IoError(format!(
            "Failed to read {}: {}",
            options.path.display(),
            e
        ))
    })?;
    parse_cleaned(&content, options)
}

/// Parse cleaned file contents into order lines and rejects
pub fn parse_cleaned(content: &[u8], options: &LoadOptions) -> DatabaseResult<ParsedLoad> {
    let mut parsed = ParsedLoad {
        source_sha256: compute_hash(content),
        ..Default::default()
    };

    let mut reader = ReaderBuilder::new()
        .delimiter(options.delimiter)
        .quote(options.quote)
        .has_headers(options.skip_header)
        .flexible(true)
        .from_reader(content);

    let positions = if options.skip_header {
        let headers = reader
            .headers()
            .map_err(|e| DatabaseError::InvalidInput(format!("Unreadable header: {}", e)))?;
        header_positions(headers)?
    } else {
        ORDER_COLUMNS
            .iter()
            .enumerate()
            .map(|(i, c)| (c.to_string(), i))
            .collect()
    };

    let mut seen: HashSet<i64> = HashSet::new();
    let first_line = if options.skip_header { 2 } else { 1 };

    for (index, result) in reader.records().enumerate() {
        parsed.rows_attempted += 1;
        let fallback_line = first_line + index as u64;

        let record = match result {
            Ok(record) => record,
            Err(e) => {
                parsed.rejects.push(LoadReject {
                    line_number: e.position().map(|p| p.line()).unwrap_or(fallback_line),
                    row_id: None,
                    reason: format!("unreadable record: {}", e),
                });
                continue;
            }
        };
        let line_number = record
            .position()
            .map(|p| p.line())
            .unwrap_or(fallback_line);
        let raw_row_id = positions
            .get("row_id")
            .and_then(|i| record.get(*i))
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty());

        if !options.skip_header && record.len() != ORDER_COLUMNS.len() {
            parsed.rejects.push(LoadReject {
                line_number,
                row_id: raw_row_id,
                reason: format!(
                    "expected {} fields, found {}",
                    ORDER_COLUMNS.len(),
                    record.len()
                ),
            });
            continue;
        }

        let lookup = |name: &str| positions.get(name).and_then(|i| record.get(*i));
        match OrderLine::from_canonical(lookup, &options.missing_marker) {
            Ok(line) => {
                if !seen.insert(line.row_id) {
                    parsed.rejects.push(LoadReject {
                        line_number,
                        row_id: raw_row_id,
                        reason: format!("duplicate row_id {} within file", line.row_id),
                    });
                    continue;
                }
                parsed.lines.push((line_number, line));
            }
            Err(e) => parsed.rejects.push(LoadReject {
                line_number,
                row_id: raw_row_id,
                reason: e.to_string(),
            }),
        }
    }

    Ok(parsed)
}

/// Map canonical column names to their position in a header row
fn header_positions(headers: &StringRecord) -> DatabaseResult<HashMap<String, usize>> {
    let mut positions = HashMap::new();
    for (index, raw) in headers.iter().enumerate() {
        let name = normalize_header(raw);
        if ORDER_COLUMNS.contains(&name.as_str()) {
            positions.entry(name).or_insert(index);
        }
    }

    let missing: Vec<&str> = ORDER_COLUMNS
        .iter()
        .copied()
        .filter(|c| !OPTIONAL_COLUMNS.contains(c) && !positions.contains_key(*c))
        .collect();
    if !missing.is_empty() {
        return Err(DatabaseError::InvalidInput(format!(
            "Cleaned file is missing column(s): {}",
            missing.join(", ")
        )));
    }

    Ok(positions)
}

/// Statistics from a load run
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadStats {
    pub run_id: Uuid,
    pub target_table: String,
    pub source_path: String,
    pub source_sha256: String,
    /// Data records read from the file
    pub rows_attempted: usize,
    /// Rows inserted into the target relation
    pub rows_loaded: usize,
    pub rows_rejected: usize,
    /// Rejected rows (limited to first 100)
    pub rejects: Vec<LoadReject>,
    pub started_at: DateTime<Utc>,
    /// Duration of the load
    #[serde(skip)]
    pub duration: Duration,
}

impl LoadStats {
    pub fn new(target_table: &str, source_path: &Path) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            target_table: target_table.to_string(),
            source_path: source_path.display().to_string(),
            source_sha256: String::new(),
            rows_attempted: 0,
            rows_loaded: 0,
            rows_rejected: 0,
            rejects: Vec::new(),
            started_at: Utc::now(),
            duration: Duration::ZERO,
        }
    }

    /// Record a reject (details limited to 100)
    pub fn add_reject(&mut self, reject: LoadReject) {
        self.rows_rejected += 1;
        if self.rejects.len() < MAX_RECORDED_REJECTS {
            self.rejects.push(reject);
        }
    }

    /// Format duration as human-readable string
    pub fn duration_string(&self) -> String {
        let secs = self.duration.as_secs();
        if secs < 60 {
            format!("{}s", secs)
        } else if secs < 3600 {
            format!("{}m {}s", secs / 60, secs % 60)
        } else {
            format!("{}h {}m {}s", secs / 3600, (secs % 3600) / 60, secs % 60)
        }
    }
}

/// A row of `load_runs`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoadRun {
    pub run_id: String,
    pub target_table: String,
    pub source_path: String,
    pub source_sha256: String,
    pub rows_attempted: i64,
    pub rows_loaded: i64,
    pub rows_rejected: i64,
    pub started_at: String,
    pub finished_at: String,
}
