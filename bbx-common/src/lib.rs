//! # BBX Common Library
//!
//! Shared code for the biobank extract tools including:
//! - Error and diagnostics types
//! - Column name codec (`<field>-<instance>.<array>`)
//! - Unified subject-indexed table and its CSV I/O
//! - Field list and field dictionary loading
//! - Configuration loading

pub mod column;
pub mod config;
pub mod diagnostics;
pub mod dictionary;
pub mod error;
pub mod fields;
pub mod table;

pub use column::ColumnKey;
pub use diagnostics::{Diagnosed, Warning};
pub use error::{Error, Result};
pub use table::{SubjectId, UnifiedTable};
