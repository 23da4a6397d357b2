//! Text encoding detection and decoding
//!
//! Detection order: byte-order mark, then strict UTF-8 validation. When neither
//! succeeds the configured fallback encoding is used and a warning is logged.

use std::fmt;

use encoding_rs::{Encoding, UTF_8};
use serde::{Deserialize, Serialize};

use super::error::CleanError;

/// Encoding used when detection fails and nothing else is configured
pub const DEFAULT_FALLBACK_ENCODING: &str = "windows-1252";

/// How the encoding of an input was determined
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DetectionMethod {
    /// A byte-order mark was found
    Bom,
    /// The bytes are valid UTF-8
    Utf8Valid,
    /// Detection failed; the configured fallback was used
    Fallback,
}

impl fmt::Display for DetectionMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DetectionMethod::Bom => write!(f, "bom"),
            DetectionMethod::Utf8Valid => write!(f, "utf-8 validation"),
            DetectionMethod::Fallback => write!(f, "fallback"),
        }
    }
}

/// Summary of how a file was decoded
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EncodingReport {
    /// WHATWG name of the encoding used
    pub encoding: String,
    pub method: DetectionMethod,
    /// Whether malformed byte sequences were replaced during decoding
    pub had_errors: bool,
}

/// Decoded text plus the report describing how it was decoded
#[derive(Debug, Clone)]
pub struct DecodedText {
    pub text: String,
    pub report: EncodingReport,
}

/// Resolve an encoding label such as `"latin1"` or `"windows-1252"`
pub fn resolve_encoding(label: &str) -> Result<&'static Encoding, CleanError> {
    Encoding::for_label(label.trim().as_bytes())
        .ok_or_else(|| CleanError::UnknownEncoding(label.to_string()))
}

/// Detect the encoding of `bytes` and decode them to a `String`
pub fn detect_and_decode(bytes: &[u8], fallback: &'static Encoding) -> DecodedText {
    if let Some((encoding, bom_len)) = Encoding::for_bom(bytes) {
        let (text, had_errors) = encoding.decode_without_bom_handling(&bytes[bom_len..]);
        return DecodedText {
            text: text.into_owned(),
            report: EncodingReport {
                encoding: encoding.name().to_string(),
                method: DetectionMethod::Bom,
                had_errors,
            },
        };
    }

    if let Ok(text) = std::str::from_utf8(bytes) {
        return DecodedText {
            text: text.to_string(),
            report: EncodingReport {
                encoding: UTF_8.name().to_string(),
                method: DetectionMethod::Utf8Valid,
                had_errors: false,
            },
        };
    }

    tracing::warn!(
        "Could not detect input encoding; falling back to {}",
        fallback.name()
    );
    let (text, had_errors) = fallback.decode_without_bom_handling(bytes);
    if had_errors {
        tracing::warn!(
            "Malformed sequences replaced while decoding as {}",
            fallback.name()
        );
    }

    DecodedText {
        text: text.into_owned(),
        report: EncodingReport {
            encoding: fallback.name().to_string(),
            method: DetectionMethod::Fallback,
            had_errors,
        },
    }
}
