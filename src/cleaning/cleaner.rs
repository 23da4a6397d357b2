//! Row-by-row cleaning of a raw order export

use std::collections::HashMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use csv::{ReaderBuilder, StringRecord, WriterBuilder};
use encoding_rs::Encoding;
use serde::{Deserialize, Serialize};

use super::encoding::{
    DecodedText, DetectionMethod, EncodingReport, detect_and_decode, resolve_encoding,
};
use super::error::CleanError;
use super::values::{
    OutputEncoding, normalize_header, parse_currency, parse_date, parse_discount, parse_quantity,
    parse_row_id, strip_unrepresentable,
};
use crate::models::{OPTIONAL_COLUMNS, ORDER_COLUMNS};

/// Maximum number of error messages retained in [`CleanStats`]
const MAX_RECORDED_ERRORS: usize = 100;

/// Options controlling a cleaning run
#[derive(Debug, Clone)]
pub struct CleanOptions {
    /// Encoding used when detection fails
    pub fallback_encoding: &'static Encoding,
    /// Character set of the cleaned output
    pub output_encoding: OutputEncoding,
    /// Read ambiguous numeric dates as day/month
    pub day_first: bool,
    /// Written in place of a date that could not be parsed
    pub missing_marker: String,
    /// Field delimiter of the raw input
    pub delimiter: u8,
}

impl Default for CleanOptions {
    fn default() -> Self {
        Self {
            fallback_encoding: encoding_rs::WINDOWS_1252,
            output_encoding: OutputEncoding::default(),
            day_first: false,
            missing_marker: String::new(),
            delimiter: b',',
        }
    }
}

impl CleanOptions {
    /// Create options with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the fallback encoding by label (e.g. `"latin1"`)
    pub fn with_fallback_encoding(mut self, label: &str) -> Result<Self, CleanError> {
        self.fallback_encoding = resolve_encoding(label)?;
        Ok(self)
    }

    pub fn with_output_encoding(mut self, output_encoding: OutputEncoding) -> Self {
        self.output_encoding = output_encoding;
        self
    }

    pub fn with_day_first(mut self, day_first: bool) -> Self {
        self.day_first = day_first;
        self
    }

    pub fn with_missing_marker(mut self, marker: impl Into<String>) -> Self {
        self.missing_marker = marker.into();
        self
    }

    pub fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }
}

/// Statistics from a cleaning run
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CleanStats {
    /// Data rows read from the input (header excluded)
    pub rows_read: usize,
    /// Rows written to the cleaned output
    pub rows_written: usize,
    /// Rows set aside in the rejects output
    pub rows_quarantined: usize,
    /// Date cells written as the missing marker
    pub dates_missing: usize,
    /// Source columns that are not part of the order schema
    pub ignored_columns: Vec<String>,
    /// How the input was decoded
    pub encoding: Option<EncodingReport>,
    /// Number of errors encountered
    pub errors_count: usize,
    /// List of errors (limited to first 100)
    pub errors: Vec<String>,
    /// Duration of the run
    #[serde(skip)]
    pub duration: Duration,
}

impl CleanStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an error (limited to 100)
    pub fn add_error(&mut self, error: String) {
        self.errors_count += 1;
        if self.errors.len() < MAX_RECORDED_ERRORS {
            self.errors.push(error);
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

/// Default location of the rejects file for a cleaned output path
///
/// `out/cleaned.csv` becomes `out/cleaned.rejects.csv`.
pub fn rejects_path_for(output: &Path) -> PathBuf {
    let stem = output
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "cleaned".to_string());
    output.with_file_name(format!("{}.rejects.csv", stem))
}

/// Position of each canonical column in the source record
struct ColumnPlan {
    source_index: Vec<Option<usize>>,
    source_headers: Vec<String>,
    ignored: Vec<String>,
}

impl ColumnPlan {
    fn from_headers(headers: &StringRecord) -> Result<Self, CleanError> {
        let source_headers: Vec<String> = headers.iter().map(normalize_header).collect();
        if source_headers.iter().all(String::is_empty) {
            return Err(CleanError::MissingHeader);
        }

        let mut positions: HashMap<&str, usize> = HashMap::new();
        for (index, name) in source_headers.iter().enumerate() {
            if name.is_empty() {
                continue;
            }
            if positions.insert(name.as_str(), index).is_some() {
                return Err(CleanError::DuplicateColumn(name.clone()));
            }
        }

        let missing: Vec<String> = ORDER_COLUMNS
            .iter()
            .copied()
            .filter(|c| !OPTIONAL_COLUMNS.contains(c) && !positions.contains_key(c))
            .map(|c| c.to_string())
            .collect();
        if !missing.is_empty() {
            return Err(CleanError::MissingColumns(missing));
        }

        let ignored = source_headers
            .iter()
            .filter(|h| !h.is_empty() && !ORDER_COLUMNS.contains(&h.as_str()))
            .cloned()
            .collect();

        let source_index = ORDER_COLUMNS
            .iter()
            .map(|c| positions.get(c).copied())
            .collect();

        Ok(Self {
            source_index,
            source_headers,
            ignored,
        })
    }
}

/// Cleans raw order exports into the canonical delimited format
pub struct Cleaner {
    options: CleanOptions,
}

impl Default for Cleaner {
    fn default() -> Self {
        Self::new(CleanOptions::default())
    }
}

impl Cleaner {
    pub fn new(options: CleanOptions) -> Self {
        Self { options }
    }

    /// Clean `input` into `output`, quarantining bad rows into `rejects`.
    ///
    /// Nothing is written when the header is unusable.
    pub fn clean_file(
        &self,
        input: &Path,
        output: &Path,
        rejects: &Path,
    ) -> Result<CleanStats, CleanError> {
        if !input.exists() {
            return Err(CleanError::InputNotFound(input.to_path_buf()));
        }

        let bytes = fs::read(input)?;
        let mut cleaned = Vec::new();
        let mut rejected = Vec::new();
        let stats = self.clean_bytes(&bytes, &mut cleaned, &mut rejected)?;

        fs::write(output, cleaned)?;
        fs::write(rejects, rejected)?;

        tracing::info!(
            "Cleaned {} -> {}: {} written, {} quarantined ({})",
            input.display(),
            output.display(),
            stats.rows_written,
            stats.rows_quarantined,
            stats.duration_string()
        );

        Ok(stats)
    }

    /// Detect the encoding of `bytes`, then clean the decoded text
    pub fn clean_bytes(
        &self,
        bytes: &[u8],
        output: &mut dyn Write,
        rejects: &mut dyn Write,
    ) -> Result<CleanStats, CleanError> {
        let decoded = detect_and_decode(bytes, self.options.fallback_encoding);
        self.clean_decoded(decoded, output, rejects)
    }

    /// Clean text that is already decoded
    pub fn clean_text(
        &self,
        text: &str,
        output: &mut dyn Write,
        rejects: &mut dyn Write,
    ) -> Result<CleanStats, CleanError> {
        let decoded = DecodedText {
            text: text.trim_start_matches('\u{feff}').to_string(),
            report: EncodingReport {
                encoding: encoding_rs::UTF_8.name().to_string(),
                method: DetectionMethod::Utf8Valid,
                had_errors: false,
            },
        };
        self.clean_decoded(decoded, output, rejects)
    }

    fn clean_decoded(
        &self,
        decoded: DecodedText,
        output: &mut dyn Write,
        rejects: &mut dyn Write,
    ) -> Result<CleanStats, CleanError> {
        let start = Instant::now();
        let mut stats = CleanStats::new();
        stats.encoding = Some(decoded.report);

        let mut reader = ReaderBuilder::new()
            .delimiter(self.options.delimiter)
            .flexible(true)
            .from_reader(decoded.text.as_bytes());

        let headers = reader.headers()?.clone();
        let plan = ColumnPlan::from_headers(&headers)?;
        for column in &plan.ignored {
            tracing::info!("Ignoring column '{}' (not part of the order schema)", column);
        }
        stats.ignored_columns = plan.ignored.clone();

        let mut writer = WriterBuilder::new().from_writer(output);
        let mut reject_writer = WriterBuilder::new().flexible(true).from_writer(rejects);

        writer.write_record(ORDER_COLUMNS)?;
        let mut reject_header = vec!["line".to_string(), "reason".to_string()];
        reject_header.extend(plan.source_headers.iter().cloned());
        reject_writer.write_record(&reject_header)?;

        for (index, result) in reader.records().enumerate() {
            stats.rows_read += 1;
            // Header is line 1
            let fallback_line = index as u64 + 2;

            let record = match result {
                Ok(record) => record,
                Err(e) => {
                    let line = e
                        .position()
                        .map(|p| p.line())
                        .unwrap_or(fallback_line);
                    stats.rows_quarantined += 1;
                    stats.add_error(format!("line {}: unreadable record: {}", line, e));
                    reject_writer.write_record([line.to_string(), e.to_string()])?;
                    continue;
                }
            };
            let line = record
                .position()
                .map(|p| p.line())
                .unwrap_or(fallback_line);

            match self.clean_record(&record, &plan, &mut stats) {
                Ok(cleaned) => {
                    writer.write_record(&cleaned)?;
                    stats.rows_written += 1;
                }
                Err(reasons) => {
                    let reason = reasons.join("; ");
                    tracing::debug!("Quarantined line {}: {}", line, reason);
                    stats.rows_quarantined += 1;
                    stats.add_error(format!("line {}: {}", line, reason));

                    let mut rejected = vec![line.to_string(), reason];
                    rejected.extend(record.iter().map(str::to_string));
                    reject_writer.write_record(&rejected)?;
                }
            }
        }

        writer.flush()?;
        reject_writer.flush()?;

        if stats.rows_quarantined > 0 {
            tracing::warn!(
                "{} of {} rows quarantined during cleaning",
                stats.rows_quarantined,
                stats.rows_read
            );
        }

        stats.duration = start.elapsed();
        Ok(stats)
    }

    /// Clean one record into canonical column order, or return every problem found
    fn clean_record(
        &self,
        record: &StringRecord,
        plan: &ColumnPlan,
        stats: &mut CleanStats,
    ) -> Result<Vec<String>, Vec<String>> {
        let mut cleaned = Vec::with_capacity(ORDER_COLUMNS.len());
        let mut problems = Vec::new();
        let mut order_date = None;
        let mut ship_date = None;

        for (column, source) in ORDER_COLUMNS.iter().zip(&plan.source_index) {
            let value = source
                .and_then(|i| record.get(i))
                .map(|v| strip_unrepresentable(v, self.options.output_encoding))
                .unwrap_or_default();

            let out = match *column {
                "row_id" => parse_row_id(&value).map(|v| v.to_string()),
                "sales" | "profit" => parse_currency(&value).map(|v| v.to_string()),
                "discount" => parse_discount(&value).map(|v| v.to_string()),
                "quantity" => parse_quantity(&value).map(|v| v.to_string()),
                "order_date" | "ship_date" => {
                    let parsed = parse_date(&value, self.options.day_first);
                    if *column == "order_date" {
                        order_date = parsed;
                    } else {
                        ship_date = parsed;
                    }
                    match parsed {
                        Some(date) => Ok(date.format("%Y-%m-%d").to_string()),
                        None => {
                            if !value.is_empty() {
                                tracing::debug!("Unparsable {} '{}'", column, value);
                            }
                            stats.dates_missing += 1;
                            Ok(self.options.missing_marker.clone())
                        }
                    }
                }
                _ => {
                    if value.is_empty() && !OPTIONAL_COLUMNS.contains(column) {
                        problems.push(format!("{}: missing value", column));
                    }
                    Ok(value)
                }
            };

            match out {
                Ok(v) => cleaned.push(v),
                Err(e) => {
                    problems.push(format!("{}: {}", column, e));
                    cleaned.push(String::new());
                }
            }
        }

        if let (Some(ordered), Some(shipped)) = (order_date, ship_date)
            && shipped < ordered
        {
            problems.push(format!(
                "ship_date {} is before order_date {}",
                shipped, ordered
            ));
        }

        if problems.is_empty() {
            Ok(cleaned)
        } else {
            Err(problems)
        }
    }
}
