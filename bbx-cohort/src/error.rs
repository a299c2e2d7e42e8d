//! Error types for bbx-cohort
//!
//! Data faults stop the filter: continuing would produce an empty or
//! meaningless cohort.

use thiserror::Error;

/// Cohort filter errors
#[derive(Debug, Error)]
pub enum CohortError {
    /// Table has no column for a field the filter needs
    #[error("No column found for field {0}")]
    NoMatchingColumns(String),

    /// Categorical filter kept nobody, so there is nothing to seed a medoid
    #[error("No subject reports a consistent {field} value of {category}")]
    EmptyReferenceGroup { field: String, category: String },

    /// No reference subject has a complete feature vector
    #[error("No usable rows for medoid computation: {0}")]
    NoUsableRows(String),

    /// Full distance matrix would exceed the configured cell budget
    #[error("Distance matrix for {points} points exceeds the budget of {budget} cells; use the memory-efficient medoid")]
    MatrixTooLarge { points: usize, budget: usize },

    /// Points of different dimensionality
    #[error("Point has {found} dimensions, expected {expected}")]
    DimensionMismatch { expected: usize, found: usize },

    /// Invalid filter configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// Shared error (I/O, CSV, table errors)
    #[error(transparent)]
    Common(#[from] bbx_common::Error),
}

/// Result type for cohort operations
pub type CohortResult<T> = Result<T, CohortError>;
