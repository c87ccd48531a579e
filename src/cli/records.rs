//! Record-set files
//!
//! Commands read and write record sets as a JSON array of records, and
//! pseudonym lists as a JSON array of strings.

use crate::domain::{Pseudonym, PseudonymizerError, RecordSet, Result};
use serde::Serialize;
use std::fs;
use std::path::Path;

/// Reads a record set from a JSON file
///
/// # Errors
///
/// Fails on unreadable files, malformed JSON, invalid identities and
/// duplicate record keys.
pub fn read_record_set(path: impl AsRef<Path>) -> Result<RecordSet> {
    let content = fs::read_to_string(path.as_ref())?;
    let records: RecordSet = serde_json::from_str(&content)?;
    Ok(records)
}

/// Reads a list of pseudonyms from a JSON file
///
/// # Errors
///
/// Fails on unreadable files, malformed JSON and blank pseudonyms.
pub fn read_pseudonyms(path: impl AsRef<Path>) -> Result<Vec<Pseudonym>> {
    let content = fs::read_to_string(path.as_ref())?;
    let raw: Vec<String> = serde_json::from_str(&content)?;
    raw.into_iter()
        .map(|p| Pseudonym::new(p).map_err(PseudonymizerError::Validation))
        .collect()
}

/// Writes a value as pretty-printed JSON
///
/// # Errors
///
/// Fails if the value cannot be serialized or the file cannot be written.
pub fn write_json<T: Serialize>(path: impl AsRef<Path>, value: &T) -> Result<()> {
    let content = serde_json::to_string_pretty(value)?;
    fs::write(path.as_ref(), content)?;
    Ok(())
}
