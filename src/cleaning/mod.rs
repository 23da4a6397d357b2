//! Cleaning of raw order exports
//!
//! Turns a messy delimited export (unknown encoding, free-form headers, mixed
//! date layouts, currency-formatted numbers) into the canonical file consumed
//! by [`crate::database::load`]. Rows that cannot be cleaned are quarantined
//! with a reason instead of being silently zeroed.

pub mod cleaner;
pub mod encoding;
pub mod error;
pub mod values;

pub use cleaner::{CleanOptions, CleanStats, Cleaner, rejects_path_for};
pub use encoding::{
    DEFAULT_FALLBACK_ENCODING, DecodedText, DetectionMethod, EncodingReport, detect_and_decode,
    resolve_encoding,
};
pub use error::{CleanError, ValueError};
pub use values::{
    OutputEncoding, normalize_header, parse_currency, parse_date, parse_discount, parse_quantity,
    parse_row_id, round_money, strip_unrepresentable,
};
