//! Field dictionary: declared value kind per field id
//!
//! Loaded from the biobank data dictionary (tab-separated, with at least the
//! `FieldID` and `ValueType` columns). Components needing typed parsing look
//! the field of a column up here instead of guessing from the data.

use crate::column::field_of;
use crate::table::SUBJECT_COLUMN;
use crate::{Error, Result};
use csv::ReaderBuilder;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

/// Declared kind of a field's values
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueKind {
    Integer,
    Continuous,
    Categorical,
    Text,
}

/// Parsed cell value
#[derive(Debug, Clone, PartialEq)]
pub enum TypedValue {
    Missing,
    Integer(i64),
    Continuous(f64),
    Categorical(String),
    Text(String),
}

impl ValueKind {
    /// Map a dictionary `ValueType` to a kind
    ///
    /// `Categorical single` and `Categorical multiple` are categorical;
    /// dates, times, compound and unknown types are kept as text.
    pub fn from_value_type(value_type: &str) -> Self {
        let v = value_type.trim();
        if v.eq_ignore_ascii_case("integer") {
            ValueKind::Integer
        } else if v.eq_ignore_ascii_case("continuous") {
            ValueKind::Continuous
        } else if v.to_ascii_lowercase().starts_with("categorical") {
            ValueKind::Categorical
        } else {
            ValueKind::Text
        }
    }

    /// Parse a raw cell; `None` when the text does not fit the kind
    pub fn parse(self, raw: Option<&str>) -> Option<TypedValue> {
        let Some(raw) = raw.map(str::trim) else {
            return Some(TypedValue::Missing);
        };
        match self {
            ValueKind::Integer => parse_integer(raw).map(TypedValue::Integer),
            ValueKind::Continuous => raw.parse::<f64>().ok().map(TypedValue::Continuous),
            ValueKind::Categorical => Some(TypedValue::Categorical(category_key(raw))),
            ValueKind::Text => Some(TypedValue::Text(raw.to_string())),
        }
    }
}

/// Integers may have been written as floats (`"3.0"`) by earlier tools
fn parse_integer(raw: &str) -> Option<i64> {
    if let Ok(i) = raw.parse::<i64>() {
        return Some(i);
    }
    let f = raw.parse::<f64>().ok()?;
    (f.fract() == 0.0 && f.abs() < i64::MAX as f64).then_some(f as i64)
}

/// Canonical form of a categorical code
///
/// Numeric codes compare by value (`"1001"` and `"1001.0"` are the same
/// code); anything else compares as trimmed text.
pub fn category_key(raw: &str) -> String {
    let raw = raw.trim();
    match raw.parse::<f64>() {
        Ok(f) if f.is_finite() && f.fract() == 0.0 && f.abs() < 1e15 => {
            format!("{}", f as i64)
        }
        Ok(f) if f.is_finite() => format!("{}", f),
        _ => raw.to_string(),
    }
}

/// Field id to value kind lookup
#[derive(Debug, Clone, Default)]
pub struct FieldDictionary {
    kinds: HashMap<String, ValueKind>,
}

impl FieldDictionary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, field_id: impl Into<String>, kind: ValueKind) {
        self.kinds.insert(field_id.into(), kind);
    }

    pub fn len(&self) -> usize {
        self.kinds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.kinds.is_empty()
    }

    pub fn kind_of_field(&self, field_id: &str) -> Option<ValueKind> {
        self.kinds.get(field_id).copied()
    }

    /// Kind of a column; the subject column is always an integer
    pub fn kind_of_column(&self, column: &str) -> Option<ValueKind> {
        if column == SUBJECT_COLUMN {
            return Some(ValueKind::Integer);
        }
        self.kind_of_field(field_of(column))
    }

    /// Load the tab-separated data dictionary
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(Error::NotFound(path.to_path_buf()));
        }
        let mut reader = ReaderBuilder::new()
            .delimiter(b'\t')
            .flexible(true)
            .from_path(path)?;

        let headers = reader.headers()?.clone();
        let position = |name: &str| {
            headers.iter().position(|h| h == name).ok_or_else(|| {
                Error::InvalidInput(format!(
                    "Dictionary {} has no '{}' column",
                    path.display(),
                    name
                ))
            })
        };
        let field_col = position("FieldID")?;
        let type_col = position("ValueType")?;

        let mut dictionary = FieldDictionary::new();
        for record in reader.records() {
            let record = record?;
            let (Some(field), Some(value_type)) = (record.get(field_col), record.get(type_col))
            else {
                continue;
            };
            let field = field.trim();
            if field.is_empty() {
                continue;
            }
            // First entry wins when a field is listed twice
            dictionary
                .kinds
                .entry(field.to_string())
                .or_insert_with(|| ValueKind::from_value_type(value_type));
        }

        tracing::debug!(
            "Loaded {} field kinds from {}",
            dictionary.len(),
            path.display()
        );
        Ok(dictionary)
    }
}
