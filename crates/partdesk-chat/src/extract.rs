//! Entity extraction from message text.
//!
//! Pulls candidate part numbers, model numbers, and order IDs out of free
//! text. Each extractor returns at most the first match and never fails;
//! absence is `None`, not an error.

use regex::Regex;
use std::sync::LazyLock;

// Part numbers: "PS" plus an optional hyphen/space separator, then 6+
// digits. Matched case-insensitively, returned verbatim.
static PART_NUMBER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bPS[-\s]?\d{6,}\b").expect("invalid part-number regex"));

// Model tokens like WDT780SAEM1 or FGID2476SF: 2+ uppercase letters, a
// digit, then uppercase letters and digits. Case-sensitive on purpose.
static MODEL_NUMBER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b[A-Z]{2,}\d[A-Z0-9]+\b").expect("invalid model-number regex"));

// Order IDs: "PSO" plus exactly four digits, matched case-insensitively.
static ORDER_ID_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bPSO\d{4}\b").expect("invalid order-id regex"));

/// Raw identifier candidates found in one message.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ExtractedEntities {
    pub part_number: Option<String>,
    pub model_number: Option<String>,
    pub order_id: Option<String>,
}

/// First part-number-shaped token, verbatim.
pub fn extract_part_number(text: &str) -> Option<String> {
    PART_NUMBER_RE.find(text).map(|m| m.as_str().to_string())
}

/// First model-number-shaped token, verbatim.
///
/// Known limitation: the pattern is not anchored to product context and
/// will also match unrelated uppercase alphanumeric tokens (including part
/// and order IDs written in caps). Kept permissive pending product-owner
/// review.
pub fn extract_model_number(text: &str) -> Option<String> {
    MODEL_NUMBER_RE.find(text).map(|m| m.as_str().to_string())
}

/// First order ID, uppercased.
pub fn extract_order_id(text: &str) -> Option<String> {
    ORDER_ID_RE.find(text).map(|m| m.as_str().to_uppercase())
}

/// Run all three extractors over the message.
pub fn extract_entities(text: &str) -> ExtractedEntities {
    ExtractedEntities {
        part_number: extract_part_number(text),
        model_number: extract_model_number(text),
        order_id: extract_order_id(text),
    }
}
