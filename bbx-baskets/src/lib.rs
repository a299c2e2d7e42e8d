//! bbx-baskets library interface
//!
//! Resolves the most recent basket for each requested field of a project
//! and merges the resolved baskets into one subject-indexed table.

pub mod basket;
pub mod error;
pub mod mapping;
pub mod merger;
pub mod resolver;

pub use crate::error::{BasketError, BasketResult};
pub use crate::mapping::{BasketAssignment, FieldToBasket};
pub use crate::merger::merge;
pub use crate::resolver::resolve;
