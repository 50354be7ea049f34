//! Content-addressed patent identity for deduplication.
//!
//! Canonicalises a record's patent number and title so that the same patent
//! reported by different offices (differing only in country prefix,
//! punctuation, spacing or title case) hashes to the same fingerprint.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::types::PatentRecord;

/// Country-code prefixes stripped from the start of a normalised number.
///
/// Only these two offices are special-cased; `EP1234567` and `1234567` stay
/// distinct.
const STRIPPED_PREFIXES: &[&str] = &["US", "TW"];

/// A 128-bit MD5 digest of `normalized_number|normalized_title`, hex encoded.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Fingerprint(String);

impl Fingerprint {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Normalise a patent number for identity comparison.
///
/// 1. Uppercase.
/// 2. Drop every non-alphanumeric character.
/// 3. Strip one leading `US` or `TW` prefix.
///
/// # Examples
///
/// ```
/// use patent_coord::orchestrator::fingerprint::normalize_patent_number;
///
/// assert_eq!(normalize_patent_number("us 1,234,567"), "1234567");
/// assert_eq!(normalize_patent_number("TW-I123456"), "I123456");
/// assert_eq!(normalize_patent_number("EP1234567"), "EP1234567");
/// ```
pub fn normalize_patent_number(raw: &str) -> String {
    let cleaned: String = raw
        .to_uppercase()
        .chars()
        .filter(|c| c.is_alphanumeric())
        .collect();

    for prefix in STRIPPED_PREFIXES {
        if let Some(rest) = cleaned.strip_prefix(prefix) {
            return rest.to_owned();
        }
    }
    cleaned
}

/// Normalise a title: lowercase, surrounding whitespace trimmed.
pub fn normalize_title(raw: &str) -> String {
    raw.to_lowercase().trim().to_owned()
}

/// Compute the identity fingerprint of a record.
///
/// Only `patent_number` and `title` participate; every other field is
/// ignored. Records with empty or shared titles and equal numbers collapse
/// into one, which is the intended (if coarse) policy.
pub fn fingerprint(record: &PatentRecord) -> Fingerprint {
    fingerprint_parts(&record.patent_number, &record.title)
}

/// Compute the fingerprint of a raw number and title pair.
pub fn fingerprint_parts(patent_number: &str, title: &str) -> Fingerprint {
    let key = format!(
        "{}|{}",
        normalize_patent_number(patent_number),
        normalize_title(title)
    );
    Fingerprint(format!("{:x}", md5::compute(key.as_bytes())))
}
