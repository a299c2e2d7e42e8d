//! bbx-cohort library interface
//!
//! Cohort selection over the unified table:
//! - ancestry filter (consistent self-reported ethnicity + medoid distance
//!   in genetic principal component space)
//! - instance and population filters
//! - feature renaming
//! - phenotype labeling and diagnosis dates
//! - field inventory

pub mod ancestry;
pub mod describe;
pub mod error;
pub mod features;
pub mod filtering;
pub mod labeling;
pub mod medoid;

pub use crate::ancestry::{filter_ancestry, AncestryConfig, AncestryFilter, AncestryOutcome};
pub use crate::error::{CohortError, CohortResult};
pub use crate::medoid::{Medoid, MedoidStrategy, Points};
