//! Workspace configuration file support
//!
//! Handles parsing of `.sales-analytics.toml` configuration files and
//! environment variable overrides.

use std::path::{Path, PathBuf};

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::analysis::SegmentThresholds;
use crate::cleaning::{CleanOptions, OutputEncoding, resolve_encoding};
use crate::database::load::{DEFAULT_TABLE, LoadOptions};

/// Default database filename for DuckDB
pub const DEFAULT_DUCKDB_FILENAME: &str = ".sales-analytics.duckdb";

/// Default configuration filename
pub const CONFIG_FILENAME: &str = ".sales-analytics.toml";

/// Environment variable for DuckDB path
pub const ENV_DUCKDB_PATH: &str = "SALES_ANALYTICS_DUCKDB_PATH";

/// Environment variable for the fallback input encoding
pub const ENV_DEFAULT_ENCODING: &str = "SALES_ANALYTICS_DEFAULT_ENCODING";

/// Environment variable for the top-N report size
pub const ENV_TOP_N: &str = "SALES_ANALYTICS_TOP_N";

/// Error type for configuration handling
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Database configuration section
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseSection {
    /// Path to DuckDB database file (relative to workspace)
    #[serde(default = "default_duckdb_path")]
    pub path: String,
}

fn default_duckdb_path() -> String {
    DEFAULT_DUCKDB_FILENAME.to_string()
}

impl Default for DatabaseSection {
    fn default() -> Self {
        Self {
            path: default_duckdb_path(),
        }
    }
}

/// Cleaning configuration section
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CleaningSection {
    /// Encoding assumed when detection fails
    #[serde(default = "default_encoding")]
    pub default_encoding: String,

    #[serde(default)]
    pub output_encoding: OutputEncoding,

    /// Read ambiguous numeric dates as day/month
    #[serde(default)]
    pub day_first: bool,

    /// Written in place of unparsable dates
    #[serde(default)]
    pub missing_marker: String,
}

fn default_encoding() -> String {
    crate::cleaning::DEFAULT_FALLBACK_ENCODING.to_string()
}

impl Default for CleaningSection {
    fn default() -> Self {
        Self {
            default_encoding: default_encoding(),
            output_encoding: OutputEncoding::default(),
            day_first: false,
            missing_marker: String::new(),
        }
    }
}

/// Load configuration section
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoadSection {
    /// Target relation
    #[serde(default = "default_table")]
    pub table: String,

    #[serde(default = "default_delimiter")]
    pub delimiter: String,

    #[serde(default = "default_quote")]
    pub quote: String,

    /// Whether the cleaned file starts with a header row
    #[serde(default = "default_true")]
    pub skip_header: bool,
}

fn default_table() -> String {
    DEFAULT_TABLE.to_string()
}

fn default_delimiter() -> String {
    ",".to_string()
}

fn default_quote() -> String {
    "\"".to_string()
}

fn default_true() -> bool {
    true
}

impl Default for LoadSection {
    fn default() -> Self {
        Self {
            table: default_table(),
            delimiter: default_delimiter(),
            quote: default_quote(),
            skip_header: true,
        }
    }
}

/// Analysis configuration section
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisSection {
    /// Number of products in the top-by-profit report
    #[serde(default = "default_top_n")]
    pub top_n: usize,
}

fn default_top_n() -> usize {
    5
}

impl Default for AnalysisSection {
    fn default() -> Self {
        Self {
            top_n: default_top_n(),
        }
    }
}

/// Customer segmentation thresholds
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SegmentationSection {
    /// Lifetime sales above this are High-Value
    #[serde(default = "default_high_threshold")]
    pub high_value_threshold: Decimal,

    /// Lifetime sales above this (and not High) are Mid-Value
    #[serde(default = "default_mid_threshold")]
    pub mid_value_threshold: Decimal,
}

fn default_high_threshold() -> Decimal {
    Decimal::new(10_000, 0)
}

fn default_mid_threshold() -> Decimal {
    Decimal::new(5_000, 0)
}

impl Default for SegmentationSection {
    fn default() -> Self {
        Self {
            high_value_threshold: default_high_threshold(),
            mid_value_threshold: default_mid_threshold(),
        }
    }
}

/// Main configuration structure
///
/// Represents the `.sales-analytics.toml` configuration file format.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct SalesConfig {
    #[serde(default)]
    pub database: DatabaseSection,

    #[serde(default)]
    pub cleaning: CleaningSection,

    #[serde(default)]
    pub load: LoadSection,

    #[serde(default)]
    pub analysis: AnalysisSection,

    #[serde(default)]
    pub segmentation: SegmentationSection,
}

impl SalesConfig {
    /// Create a new default configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a configuration pointing at a specific DuckDB file
    pub fn duckdb(path: impl Into<String>) -> Self {
        Self {
            database: DatabaseSection { path: path.into() },
            ..Default::default()
        }
    }

    /// Load configuration from a workspace directory
    ///
    /// Looks for `.sales-analytics.toml` in the workspace directory.
    /// Falls back to defaults if not found.
    pub fn load(workspace_path: &Path) -> Result<Self, ConfigError> {
        let config_path = workspace_path.join(CONFIG_FILENAME);

        let mut config = if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            Self::parse(&content)?
        } else {
            tracing::debug!("No {} in {}, using defaults", CONFIG_FILENAME, workspace_path.display());
            Self::default()
        };

        config.apply_env_overrides();
        config.validate()?;

        Ok(config)
    }

    /// Parse configuration from TOML string
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Save configuration to a workspace directory
    pub fn save(&self, workspace_path: &Path) -> Result<(), ConfigError> {
        let config_path = workspace_path.join(CONFIG_FILENAME);
        std::fs::write(&config_path, self.to_toml()?)?;
        Ok(())
    }

    /// Convert configuration to TOML string
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Apply environment variable overrides
    pub fn apply_env_overrides(&mut self) {
        if let Ok(path) = std::env::var(ENV_DUCKDB_PATH) {
            self.database.path = path;
        }

        if let Ok(encoding) = std::env::var(ENV_DEFAULT_ENCODING) {
            self.cleaning.default_encoding = encoding;
        }

        if let Ok(top_n) = std::env::var(ENV_TOP_N)
            && let Ok(top_n) = top_n.parse()
        {
            self.analysis.top_n = top_n;
        }
    }

    /// Check cross-field constraints
    pub fn validate(&self) -> Result<(), ConfigError> {
        let seg = &self.segmentation;
        if seg.mid_value_threshold >= seg.high_value_threshold {
            return Err(ConfigError::Invalid(format!(
                "mid_value_threshold ({}) must be below high_value_threshold ({})",
                seg.mid_value_threshold, seg.high_value_threshold
            )));
        }

        if self.analysis.top_n == 0 {
            return Err(ConfigError::Invalid("top_n must be at least 1".to_string()));
        }

        resolve_encoding(&self.cleaning.default_encoding)
            .map_err(|e| ConfigError::Invalid(e.to_string()))?;

        single_byte("load.delimiter", &self.load.delimiter)?;
        single_byte("load.quote", &self.load.quote)?;

        Ok(())
    }

    /// Get the DuckDB database path for a workspace
    pub fn get_duckdb_path(&self, workspace_path: &Path) -> PathBuf {
        if self.database.path.is_empty() {
            workspace_path.join(DEFAULT_DUCKDB_FILENAME)
        } else if Path::new(&self.database.path).is_absolute() {
            PathBuf::from(&self.database.path)
        } else {
            workspace_path.join(&self.database.path)
        }
    }

    /// Cleaning options derived from the `[cleaning]` section
    pub fn clean_options(&self) -> Result<CleanOptions, ConfigError> {
        let options = CleanOptions::new()
            .with_fallback_encoding(&self.cleaning.default_encoding)
            .map_err(|e| ConfigError::Invalid(e.to_string()))?
            .with_output_encoding(self.cleaning.output_encoding)
            .with_day_first(self.cleaning.day_first)
            .with_missing_marker(self.cleaning.missing_marker.clone());
        Ok(options)
    }

    /// Load options for `path` derived from the `[load]` section
    pub fn load_options(&self, path: impl Into<PathBuf>) -> Result<LoadOptions, ConfigError> {
        LoadOptions::new(path)
            .with_table(&self.load.table)
            .map_err(|e| ConfigError::Invalid(e.to_string()))
            .map(|options| {
                options
                    .with_delimiter(single_byte_or_default(&self.load.delimiter, b','))
                    .with_quote(single_byte_or_default(&self.load.quote, b'"'))
                    .with_skip_header(self.load.skip_header)
                    .with_missing_marker(self.cleaning.missing_marker.clone())
            })
    }

    /// Segmentation thresholds from the `[segmentation]` section
    pub fn segment_thresholds(&self) -> SegmentThresholds {
        SegmentThresholds::new(
            self.segmentation.high_value_threshold,
            self.segmentation.mid_value_threshold,
        )
    }

    /// Check if configuration exists in a workspace
    pub fn exists(workspace_path: &Path) -> bool {
        workspace_path.join(CONFIG_FILENAME).exists()
    }

    /// Check if the workspace has a config file and a database file
    pub fn is_initialized(workspace_path: &Path) -> bool {
        if !Self::exists(workspace_path) {
            return false;
        }

        match Self::load(workspace_path) {
            Ok(config) => config.get_duckdb_path(workspace_path).exists(),
            Err(_) => false,
        }
    }
}

fn single_byte(field: &str, value: &str) -> Result<u8, ConfigError> {
    match value.as_bytes() {
        [byte] => Ok(*byte),
        _ => Err(ConfigError::Invalid(format!(
            "{} must be a single byte, got {:?}",
            field, value
        ))),
    }
}

fn single_byte_or_default(value: &str, default: u8) -> u8 {
    single_byte("", value).unwrap_or(default)
}

/// Generate a sample configuration file content
pub fn sample_config() -> &'static str {
    r#"# Sales Analytics Configuration

[database]
# Path to DuckDB database file (relative to workspace, or absolute)
path = ".sales-analytics.duckdb"

[cleaning]
# Encoding assumed when the input is neither BOM-marked nor valid UTF-8
default_encoding = "windows-1252"
# Character set of the cleaned file: "ascii" (default) or "utf8"
output_encoding = "ascii"
# Read 03/04/2017 as 3 April instead of 4 March
day_first = false
# Written in place of dates that cannot be parsed
missing_marker = ""

[load]
table = "orders"
delimiter = ","
quote = "\""
skip_header = true

[analysis]
# Number of products in the top-by-profit report
top_n = 5

[segmentation]
# Lifetime sales above high => High-Value, above mid => Mid-Value
high_value_threshold = "10000"
mid_value_threshold = "5000"
"#
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_default_config() {
        let config = SalesConfig::new();
        assert_eq!(config.database.path, DEFAULT_DUCKDB_FILENAME);
        assert_eq!(config.cleaning.default_encoding, "windows-1252");
        assert_eq!(config.cleaning.output_encoding, OutputEncoding::Ascii);
        assert_eq!(config.load.table, "orders");
        assert_eq!(config.analysis.top_n, 5);
        assert_eq!(config.segmentation.high_value_threshold, Decimal::new(10_000, 0));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_config() {
        let toml = r#"
[database]
path = "custom.duckdb"

[cleaning]
output_encoding = "utf8"
day_first = true

[analysis]
top_n = 10

[segmentation]
high_value_threshold = "20000"
mid_value_threshold = "7500.50"
"#;
        let config = SalesConfig::parse(toml).unwrap();
        assert_eq!(config.database.path, "custom.duckdb");
        assert_eq!(config.cleaning.output_encoding, OutputEncoding::Utf8);
        assert!(config.cleaning.day_first);
        assert_eq!(config.analysis.top_n, 10);
        assert_eq!(config.segmentation.mid_value_threshold, Decimal::new(750_050, 2));
        // untouched sections keep their defaults
        assert_eq!(config.load.delimiter, ",");
    }

    #[test]
    fn test_validate_rejects_inverted_thresholds() {
        let mut config = SalesConfig::new();
        config.segmentation.mid_value_threshold = Decimal::new(10_000, 0);
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = SalesConfig::new();
        config.analysis.top_n = 0;
        assert!(config.validate().is_err());

        let mut config = SalesConfig::new();
        config.cleaning.default_encoding = "klingon".to_string();
        assert!(config.validate().is_err());

        let mut config = SalesConfig::new();
        config.load.delimiter = ";;".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempdir().unwrap();
        let config = SalesConfig::duckdb("my-db.duckdb");

        config.save(dir.path()).unwrap();
        assert!(dir.path().join(CONFIG_FILENAME).exists());

        let loaded = SalesConfig::load(dir.path()).unwrap();
        assert_eq!(loaded.database.path, "my-db.duckdb");
        assert_eq!(
            loaded.segmentation.high_value_threshold,
            config.segmentation.high_value_threshold
        );
    }

    #[test]
    fn test_get_duckdb_path() {
        let config = SalesConfig::duckdb("relative.duckdb");
        let workspace = Path::new("/workspace");
        assert_eq!(
            config.get_duckdb_path(workspace),
            PathBuf::from("/workspace/relative.duckdb")
        );
    }

    #[test]
    fn test_derived_options() {
        let mut config = SalesConfig::new();
        config.load.delimiter = ";".to_string();
        config.cleaning.missing_marker = "NA".to_string();

        let load = config.load_options("cleaned.csv").unwrap();
        assert_eq!(load.delimiter, b';');
        assert_eq!(load.table, "orders");
        assert_eq!(load.missing_marker, "NA");

        let clean = config.clean_options().unwrap();
        assert_eq!(clean.fallback_encoding.name(), "windows-1252");
        assert_eq!(clean.missing_marker, "NA");
    }

    #[test]
    fn test_sample_config_is_valid() {
        let config = SalesConfig::parse(sample_config());
        assert!(config.is_ok(), "Sample config should be valid TOML");
        assert!(config.unwrap().validate().is_ok());
    }
}
