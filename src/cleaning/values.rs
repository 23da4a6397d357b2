//! Cell-level normalization: headers, characters, dates and numbers

use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, NaiveDate};
use once_cell::sync::Lazy;
use regex::Regex;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use super::error::ValueError;

static RE_HEADER_SEPARATORS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^a-z0-9]+").expect("Invalid regex"));
static RE_TRAILING_TIME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^(?P<date>.+?)[ T]\d{1,2}:\d{2}(?::\d{2}(?:\.\d+)?)?\s*(?:[AaPp][Mm])?\s*(?:Z|[+-]\d{2}:?\d{2})?$",
    )
    .expect("Invalid regex")
});

/// Symbols stripped from currency cells before parsing
const CURRENCY_SYMBOLS: [char; 4] = ['$', '€', '£', '¥'];

/// Numeric date layouts tried when month comes first (US style).
/// Two-digit-year layouts come first so that `%Y` never swallows a short year.
const MONTH_FIRST_FORMATS: [&str; 5] = ["%m/%d/%y", "%m-%d-%y", "%m/%d/%Y", "%m-%d-%Y", "%m.%d.%Y"];

/// Numeric date layouts tried when day comes first
const DAY_FIRST_FORMATS: [&str; 5] = ["%d/%m/%y", "%d-%m-%y", "%d/%m/%Y", "%d-%m-%Y", "%d.%m.%Y"];

/// Unambiguous layouts tried before the numeric ones
const UNAMBIGUOUS_FORMATS: [&str; 10] = [
    "%Y-%m-%d", "%Y/%m/%d", "%Y%m%d", "%d-%b-%Y", "%d %b %Y", "%d %B %Y", "%b %d, %Y",
    "%B %d, %Y", "%b %d %Y", "%B %d %Y",
];

/// Target character set of the cleaned file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputEncoding {
    /// Drop every non-ASCII character
    #[default]
    Ascii,
    /// Keep Unicode text, drop control and replacement characters
    Utf8,
}

impl FromStr for OutputEncoding {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "ascii" => Ok(OutputEncoding::Ascii),
            "utf8" | "utf-8" => Ok(OutputEncoding::Utf8),
            _ => Err(format!(
                "Unknown output encoding: {}. Use 'ascii' or 'utf8'.",
                s
            )),
        }
    }
}

impl fmt::Display for OutputEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputEncoding::Ascii => write!(f, "ascii"),
            OutputEncoding::Utf8 => write!(f, "utf8"),
        }
    }
}

/// Normalize a raw header to a snake_case column name
///
/// `" Sub-Category "` becomes `sub_category`, `"Row ID"` becomes `row_id`.
pub fn normalize_header(raw: &str) -> String {
    let lowered = raw.trim().trim_start_matches('\u{feff}').to_lowercase();
    RE_HEADER_SEPARATORS
        .replace_all(&lowered, "_")
        .trim_matches('_')
        .to_string()
}

/// Remove characters that cannot be represented in the target encoding
pub fn strip_unrepresentable(value: &str, target: OutputEncoding) -> String {
    let kept: String = value
        .chars()
        .filter(|c| match target {
            OutputEncoding::Ascii => c.is_ascii() && !c.is_ascii_control(),
            OutputEncoding::Utf8 => !c.is_control() && *c != '\u{fffd}' && *c != '\u{feff}',
        })
        .collect();
    kept.trim().to_string()
}

/// Tolerantly parse a date, returning `None` when no layout matches
///
/// Trailing time-of-day components are ignored. Numeric layouts are read
/// month-first unless `day_first` is set.
pub fn parse_date(raw: &str, day_first: bool) -> Option<NaiveDate> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }

    let date_part = RE_TRAILING_TIME
        .captures(trimmed)
        .and_then(|c| c.name("date"))
        .map(|m| m.as_str().trim())
        .unwrap_or(trimmed);

    let (first, second) = if day_first {
        (&DAY_FIRST_FORMATS[..], &MONTH_FIRST_FORMATS[..])
    } else {
        (&MONTH_FIRST_FORMATS[..], &DAY_FIRST_FORMATS[..])
    };

    UNAMBIGUOUS_FORMATS
        .iter()
        .chain(first.iter())
        .chain(second.iter())
        .filter_map(|format| NaiveDate::parse_from_str(date_part, format).ok())
        .find(|date| (1900..=2100).contains(&date.year()))
}

/// Parse a currency cell such as `"$1,234.50"` or `"(12.00)"` into a 2dp decimal
pub fn parse_currency(raw: &str) -> Result<Decimal, ValueError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(ValueError::Empty);
    }

    // Accounting notation: (1,234.50) is negative
    let (negative, body) = match trimmed.strip_prefix('(').and_then(|s| s.strip_suffix(')')) {
        Some(inner) => (true, inner),
        None => (false, trimmed),
    };

    let cleaned: String = body
        .chars()
        .filter(|c| !CURRENCY_SYMBOLS.contains(c) && *c != ',' && !c.is_whitespace())
        .collect();

    let value = parse_decimal(&cleaned).ok_or_else(|| ValueError::NotANumber(raw.to_string()))?;
    Ok(round_money(if negative { -value } else { value }))
}

/// Parse a discount cell into a fraction in [0, 1], rounded to 2dp
///
/// `"10%"` and `"10"` both become `0.10`; `"0.1"` stays `0.10`.
pub fn parse_discount(raw: &str) -> Result<Decimal, ValueError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(ValueError::Empty);
    }

    let has_percent = trimmed.contains('%');
    let cleaned: String = trimmed
        .chars()
        .filter(|c| *c != '%' && !c.is_whitespace())
        .collect();
    let value = parse_decimal(&cleaned).ok_or_else(|| ValueError::NotANumber(raw.to_string()))?;

    let hundred = Decimal::ONE_HUNDRED;
    let fraction = if has_percent || (value > Decimal::ONE && value <= hundred) {
        value / hundred
    } else {
        value
    };

    if fraction < Decimal::ZERO || fraction > Decimal::ONE {
        return Err(ValueError::OutOfRange {
            value: raw.to_string(),
            reason: "discount must be between 0% and 100%".to_string(),
        });
    }

    Ok(round_money(fraction))
}

/// Parse a non-negative whole quantity; `"3.0"` is accepted as 3
pub fn parse_quantity(raw: &str) -> Result<i64, ValueError> {
    let value = parse_whole(raw)?;
    if value < 0 {
        return Err(ValueError::OutOfRange {
            value: raw.trim().to_string(),
            reason: "quantity must not be negative".to_string(),
        });
    }
    Ok(value)
}

/// Parse a positive row identifier
pub fn parse_row_id(raw: &str) -> Result<i64, ValueError> {
    let value = parse_whole(raw)?;
    if value <= 0 {
        return Err(ValueError::OutOfRange {
            value: raw.trim().to_string(),
            reason: "row id must be positive".to_string(),
        });
    }
    Ok(value)
}

/// Round to two decimal places, midpoint away from zero, keeping scale 2
pub fn round_money(value: Decimal) -> Decimal {
    let mut rounded = value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    rounded.rescale(2);
    rounded
}

fn parse_decimal(cleaned: &str) -> Option<Decimal> {
    if cleaned.is_empty() {
        return None;
    }
    Decimal::from_str(cleaned)
        .or_else(|_| Decimal::from_scientific(cleaned))
        .ok()
}

fn parse_whole(raw: &str) -> Result<i64, ValueError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(ValueError::Empty);
    }
    if let Ok(value) = trimmed.parse::<i64>() {
        return Ok(value);
    }

    let cleaned: String = trimmed.chars().filter(|c| *c != ',').collect();
    let decimal =
        parse_decimal(&cleaned).ok_or_else(|| ValueError::NotAnInteger(trimmed.to_string()))?;
    if !decimal.fract().is_zero() {
        return Err(ValueError::NotAnInteger(trimmed.to_string()));
    }
    i64::try_from(decimal).map_err(|_| ValueError::NotAnInteger(trimmed.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn test_normalize_header() {
        assert_eq!(normalize_header(" Row ID "), "row_id");
        assert_eq!(normalize_header("Sub-Category"), "sub_category");
        assert_eq!(normalize_header("\u{feff}Order Date"), "order_date");
        assert_eq!(normalize_header("Postal  Code"), "postal_code");
        assert_eq!(normalize_header("Sales"), "sales");
    }

    #[test]
    fn test_strip_unrepresentable_ascii() {
        assert_eq!(
            strip_unrepresentable("  Café Bistro\u{7} ", OutputEncoding::Ascii),
            "Caf Bistro"
        );
    }

    #[test]
    fn test_strip_unrepresentable_utf8() {
        assert_eq!(
            strip_unrepresentable("Café\u{fffd}\t", OutputEncoding::Utf8),
            "Café"
        );
    }

    #[test]
    fn test_parse_date_layouts() {
        let expected = NaiveDate::from_ymd_opt(2016, 11, 8).unwrap();
        assert_eq!(parse_date("2016-11-08", false), Some(expected));
        assert_eq!(parse_date("11/8/2016", false), Some(expected));
        assert_eq!(parse_date("11/08/16", false), Some(expected));
        assert_eq!(parse_date("8-Nov-2016", false), Some(expected));
        assert_eq!(parse_date("November 8, 2016", false), Some(expected));
        assert_eq!(parse_date("2016-11-08 00:00:00", false), Some(expected));
        assert_eq!(parse_date("2016-11-08T13:45:00Z", false), Some(expected));
        assert_eq!(parse_date("11/8/2016 4:30 PM", false), Some(expected));
    }

    #[test]
    fn test_parse_date_day_first() {
        let expected = NaiveDate::from_ymd_opt(2016, 11, 8).unwrap();
        assert_eq!(parse_date("08/11/2016", true), Some(expected));
        assert_eq!(
            parse_date("08/11/2016", false),
            NaiveDate::from_ymd_opt(2016, 8, 11)
        );
        // Day 25 cannot be a month, so month-first input still parses
        assert_eq!(
            parse_date("11/25/2016", true),
            NaiveDate::from_ymd_opt(2016, 11, 25)
        );
    }

    #[test]
    fn test_parse_date_unparsable() {
        assert_eq!(parse_date("", false), None);
        assert_eq!(parse_date("not a date", false), None);
        assert_eq!(parse_date("13/45/2016", false), None);
    }

    #[test]
    fn test_parse_currency() {
        assert_eq!(parse_currency("$1,234.50").unwrap(), dec("1234.50"));
        assert_eq!(parse_currency("$200.00").unwrap(), dec("200.00"));
        assert_eq!(parse_currency("-$5.555").unwrap(), dec("-5.56"));
        assert_eq!(parse_currency("$-5.00").unwrap(), dec("-5.00"));
        assert_eq!(parse_currency("(1,234.50)").unwrap(), dec("-1234.50"));
        assert_eq!(parse_currency(" 261.96 ").unwrap(), dec("261.96"));
        assert_eq!(parse_currency("€ 12").unwrap().to_string(), "12.00");
    }

    #[test]
    fn test_parse_currency_errors() {
        assert_eq!(parse_currency(""), Err(ValueError::Empty));
        assert!(matches!(
            parse_currency("twelve"),
            Err(ValueError::NotANumber(_))
        ));
        assert!(matches!(parse_currency("$"), Err(ValueError::NotANumber(_))));
    }

    #[test]
    fn test_parse_discount() {
        assert_eq!(parse_discount("10%").unwrap(), dec("0.10"));
        assert_eq!(parse_discount("0.2").unwrap(), dec("0.20"));
        assert_eq!(parse_discount("45").unwrap(), dec("0.45"));
        assert_eq!(parse_discount("0").unwrap(), dec("0.00"));
        assert_eq!(parse_discount("12.5 %").unwrap(), dec("0.13"));
        assert_eq!(parse_discount("10%").unwrap().to_string(), "0.10");
    }

    #[test]
    fn test_parse_discount_out_of_range() {
        assert!(matches!(
            parse_discount("150%"),
            Err(ValueError::OutOfRange { .. })
        ));
        assert!(matches!(
            parse_discount("-0.1"),
            Err(ValueError::OutOfRange { .. })
        ));
        assert!(matches!(
            parse_discount("abc%"),
            Err(ValueError::NotANumber(_))
        ));
    }

    #[test]
    fn test_parse_quantity_and_row_id() {
        assert_eq!(parse_quantity("3"), Ok(3));
        assert_eq!(parse_quantity("3.0"), Ok(3));
        assert!(matches!(
            parse_quantity("2.5"),
            Err(ValueError::NotAnInteger(_))
        ));
        assert!(matches!(
            parse_quantity("-1"),
            Err(ValueError::OutOfRange { .. })
        ));
        assert_eq!(parse_row_id("9994"), Ok(9994));
        assert!(matches!(parse_row_id("0"), Err(ValueError::OutOfRange { .. })));
    }

    #[test]
    fn test_round_money_keeps_two_places() {
        assert_eq!(round_money(dec("200")).to_string(), "200.00");
        assert_eq!(round_money(dec("0.125")).to_string(), "0.13");
        assert_eq!(round_money(dec("-0.125")).to_string(), "-0.13");
    }
}
