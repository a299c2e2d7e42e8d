//! Result values that carry recoverable warnings
//!
//! Structural problems (a malformed column, a field missing from a project,
//! a manifest that disagrees with an extract header) do not abort a run.
//! Each component returns them next to its value so the caller decides
//! whether a partial result is acceptable.

use std::fmt;

/// A recoverable problem found while producing a value
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Warning {
    /// Column name does not follow `<field>-<instance>.<array>`
    MalformedColumn { column: String, reason: String },

    /// No basket of the project provides the field
    MissingField { field: String, project_id: String },

    /// Manifest lists the field but the extract header has no column for it
    HeaderMismatch { basket: String, field: String },

    /// Cell expected to be numeric could not be parsed
    NonNumericValue {
        column: String,
        subject: String,
        value: String,
    },

    /// Fewer feature columns exist than were requested
    FewerFeatures {
        field: String,
        requested: usize,
        found: usize,
    },

    /// A feature to rename has no column in the table
    MissingFeature { feature: String, field: String },

    /// Free-form note
    Note(String),
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Warning::MalformedColumn { column, reason } => {
                write!(f, "Invalid format for column '{}': {}", column, reason)
            }
            Warning::MissingField { field, project_id } => {
                write!(f, "Field {} is missing in project {}", field, project_id)
            }
            Warning::HeaderMismatch { basket, field } => write!(
                f,
                "Field {} is listed in the manifest of {} but has no column in its extract",
                field, basket
            ),
            Warning::NonNumericValue {
                column,
                subject,
                value,
            } => write!(
                f,
                "Non-numeric value '{}' in column {} for subject {} (treated as missing)",
                value, column, subject
            ),
            Warning::FewerFeatures {
                field,
                requested,
                found,
            } => write!(
                f,
                "Field {} has {} columns, {} requested",
                field, found, requested
            ),
            Warning::MissingFeature { feature, field } => {
                write!(f, "Feature '{}' (field {}) has no column", feature, field)
            }
            Warning::Note(msg) => f.write_str(msg),
        }
    }
}

/// A value plus the warnings raised while computing it
#[derive(Debug, Clone, PartialEq)]
pub struct Diagnosed<T> {
    pub value: T,
    pub warnings: Vec<Warning>,
}

impl<T> Diagnosed<T> {
    /// Value without warnings
    pub fn clean(value: T) -> Self {
        Self {
            value,
            warnings: Vec::new(),
        }
    }

    pub fn new(value: T, warnings: Vec<Warning>) -> Self {
        Self { value, warnings }
    }

    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }

    /// Transform the value, keeping the warnings
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Diagnosed<U> {
        Diagnosed {
            value: f(self.value),
            warnings: self.warnings,
        }
    }

    /// Move the warnings into `sink` and return the bare value
    pub fn absorb_into(self, sink: &mut Vec<Warning>) -> T {
        sink.extend(self.warnings);
        self.value
    }

    pub fn into_parts(self) -> (T, Vec<Warning>) {
        (self.value, self.warnings)
    }
}
