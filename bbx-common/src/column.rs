//! Column name codec
//!
//! Extract columns are named `<field_id>-<instance_id>.<array_id>`, e.g.
//! `22009-0.3` is the third array entry of field 22009 at instance 0.
//! The subject id column (`eid`) and any index artefacts do not follow the
//! scheme; bulk scans report them as warnings instead of failing.

use crate::diagnostics::{Diagnosed, Warning};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Decoded column name
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ColumnKey {
    pub field_id: String,
    pub instance_id: String,
    pub array_id: String,
}

/// Column name that does not follow `<field>-<instance>.<array>`
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Invalid format for column: {column}. {reason}")]
pub struct MalformedColumn {
    pub column: String,
    pub reason: String,
}

impl ColumnKey {
    pub fn new(
        field_id: impl Into<String>,
        instance_id: impl Into<String>,
        array_id: impl Into<String>,
    ) -> Self {
        Self {
            field_id: field_id.into(),
            instance_id: instance_id.into(),
            array_id: array_id.into(),
        }
    }

    /// Strict parse: exactly one `-`, then exactly one `.` after it
    pub fn parse(column: &str) -> std::result::Result<Self, MalformedColumn> {
        let malformed = |reason: &str| MalformedColumn {
            column: column.to_string(),
            reason: reason.to_string(),
        };

        let mut dash = column.split('-');
        let field_id = dash.next().unwrap_or_default();
        let rest = dash
            .next()
            .ok_or_else(|| malformed("Missing '-' to separate field_id and instance_id/array_id."))?;
        if dash.next().is_some() {
            return Err(malformed("More than one '-' in column name."));
        }

        let mut dot = rest.split('.');
        let instance_id = dot.next().unwrap_or_default();
        let array_id = dot
            .next()
            .ok_or_else(|| malformed("Missing '.' to separate instance_id and array_id."))?;
        if dot.next().is_some() {
            return Err(malformed("More than one '.' after the field id."));
        }

        Ok(Self::new(field_id, instance_id, array_id))
    }

    /// Serialize back to `<field>-<instance>.<array>`
    pub fn encode(&self) -> String {
        encode(&self.field_id, &self.instance_id, &self.array_id)
    }

    /// Numeric (instance, array) pair for ordering, if both are integers
    pub fn numeric_position(&self) -> Option<(u64, u64)> {
        Some((self.instance_id.parse().ok()?, self.array_id.parse().ok()?))
    }
}

impl fmt::Display for ColumnKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}.{}", self.field_id, self.instance_id, self.array_id)
    }
}

impl FromStr for ColumnKey {
    type Err = MalformedColumn;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        ColumnKey::parse(s)
    }
}

/// Build a column name from its three parts
pub fn encode(field_id: &str, instance_id: &str, array_id: &str) -> String {
    format!("{}-{}.{}", field_id, instance_id, array_id)
}

/// Decode a column, turning a parse failure into a warning
pub fn decode(column: &str) -> Diagnosed<Option<ColumnKey>> {
    match ColumnKey::parse(column) {
        Ok(key) => Diagnosed::clean(Some(key)),
        Err(e) => Diagnosed::new(
            None,
            vec![Warning::MalformedColumn {
                column: e.column,
                reason: e.reason,
            }],
        ),
    }
}

/// Decode every column, collecting the warnings of the malformed ones
pub fn decode_all<'a, I>(columns: I) -> Diagnosed<Vec<(String, Option<ColumnKey>)>>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut warnings = Vec::new();
    let decoded = columns
        .into_iter()
        .map(|c| (c.to_string(), decode(c).absorb_into(&mut warnings)))
        .collect();
    Diagnosed::new(decoded, warnings)
}

/// Field component of a column: everything before the first `-`
///
/// Works on any column name, including `eid`, which is its own field.
pub fn field_of(column: &str) -> &str {
    column.split('-').next().unwrap_or(column)
}

/// Columns whose field component is one of `field_ids`, in input order
pub fn matches_fields<'a, S>(columns: &'a [S], field_ids: &[&str]) -> Vec<&'a str>
where
    S: AsRef<str>,
{
    columns
        .iter()
        .map(|c| c.as_ref())
        .filter(|c| field_ids.contains(&field_of(c)))
        .collect()
}
