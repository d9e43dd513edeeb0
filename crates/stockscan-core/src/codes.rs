//! # Unit Codes
//!
//! Normalization of scanned unit codes and the delimited-string boundary used
//! by persistence.
//!
//! ## Storage Boundary
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  In memory (everywhere)          │  Persisted (products / ledger rows)  │
//! │  ──────────────────────          │  ──────────────────────────────────  │
//! │  ["356938035643809",             │  "356938035643809,356938035643817"   │
//! │   "356938035643817"]             │                                      │
//! │                                  │                                      │
//! │  ["128GB", ""]                   │  "128GB,"                            │
//! │                                  │                                      │
//! │  encode_list ──────────────────► │ ◄────────────────────── decode_list  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The delimiter is never escaped. [`encode_list`] refuses elements that
//! contain it instead of silently corrupting the stored list.

use crate::error::ValidationError;
use crate::LIST_DELIMITER;

/// Trims a raw scan into a candidate code.
///
/// Hardware scanners append CR/LF and camera decoders sometimes pad with
/// spaces; both are stripped here.
pub fn normalize(raw: &str) -> String {
    raw.trim().to_string()
}

/// Case-insensitive key used for every code comparison.
///
/// Folds ASCII letters only, the same as SQLite's `lower()`, so the sold
/// check gives one answer whichever store runs it.
pub fn code_key(code: &str) -> String {
    code.trim().to_ascii_lowercase()
}

/// Returns true when two codes identify the same unit.
pub fn same_code(a: &str, b: &str) -> bool {
    code_key(a) == code_key(b)
}

/// Encodes an ordered list into its stored form.
///
/// ## Errors
/// [`ValidationError::ContainsDelimiter`] when an element contains the
/// delimiter; nothing is encoded in that case.
///
/// ## Example
/// ```rust
/// use stockscan_core::codes::encode_list;
///
/// let stored = encode_list("unit_codes", &["A1".to_string(), "A2".to_string()]).unwrap();
/// assert_eq!(stored, "A1,A2");
/// assert!(encode_list("unit_codes", &["A,1".to_string()]).is_err());
/// ```
pub fn encode_list(field: &str, items: &[String]) -> Result<String, ValidationError> {
    if let Some(bad) = items.iter().find(|item| item.contains(LIST_DELIMITER)) {
        return Err(ValidationError::ContainsDelimiter {
            field: field.to_string(),
            value: bad.clone(),
            delimiter: LIST_DELIMITER,
        });
    }

    let delimiter = LIST_DELIMITER.to_string();
    Ok(items.join(&delimiter))
}

/// Decodes a stored list, keeping positions (empty elements survive).
///
/// An empty string decodes to an empty list, not to `[""]`.
pub fn decode_list(stored: &str) -> Vec<String> {
    if stored.is_empty() {
        return Vec::new();
    }

    stored
        .split(LIST_DELIMITER)
        .map(|item| item.trim().to_string())
        .collect()
}

/// Decodes a stored unit-code list and its parallel tag list together.
///
/// Blank code positions are dropped along with their tags; a tag list that is
/// shorter than the code list is padded with empty tags, a longer one is cut.
///
/// ## Example
/// ```rust
/// use stockscan_core::codes::decode_units;
///
/// let (codes, tags) = decode_units("A1,,A2", "128GB");
/// assert_eq!(codes, ["A1", "A2"]);
/// assert_eq!(tags, ["128GB", ""]);
/// ```
pub fn decode_units(stored_codes: &str, stored_tags: &str) -> (Vec<String>, Vec<String>) {
    let raw_codes = decode_list(stored_codes);
    let mut raw_tags = decode_list(stored_tags);
    raw_tags.resize(raw_codes.len(), String::new());

    raw_codes
        .into_iter()
        .zip(raw_tags)
        .filter(|(code, _)| !code.is_empty())
        .unzip()
}

// =============================================================================
// Unit Tests
// =============================================================================
