//! Plain-text id lists
//!
//! Field lists (input of basket resolution) and subject lists (output of
//! cohort filters) are newline-separated ids.

use crate::{Error, Result};
use std::collections::HashSet;
use std::fs;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Parse a newline-separated id list
///
/// Surrounding whitespace is stripped, blank lines are ignored and repeated
/// ids keep only their first occurrence.
pub fn parse_id_list(text: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .filter(|line| seen.insert(line.to_string()))
        .map(str::to_string)
        .collect()
}

/// Read the field ids requested for a run
pub fn read_field_list(path: &Path) -> Result<Vec<String>> {
    if !path.exists() {
        return Err(Error::NotFound(path.to_path_buf()));
    }
    let text = fs::read_to_string(path).map_err(|e| Error::file(path, e))?;
    let fields = parse_id_list(&text);
    tracing::debug!("Read {} field ids from {}", fields.len(), path.display());
    Ok(fields)
}

/// Write subject ids, one per line
pub fn write_subject_list<S: AsRef<str>>(path: &Path, subjects: &[S]) -> Result<()> {
    let file = fs::File::create(path).map_err(|e| Error::file(path, e))?;
    let mut out = BufWriter::new(file);
    for subject in subjects {
        writeln!(out, "{}", subject.as_ref()).map_err(|e| Error::file(path, e))?;
    }
    out.flush().map_err(|e| Error::file(path, e))?;
    Ok(())
}
