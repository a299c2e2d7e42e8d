//! Error types for bbx-baskets
//!
//! Every variant is fatal for the run: resolution and merging stop at the
//! first one. Recoverable problems travel as warnings in `Diagnosed`.

use std::path::PathBuf;
use thiserror::Error;

/// Basket resolution and merge errors
#[derive(Debug, Error)]
pub enum BasketError {
    /// Basket root directory does not exist
    #[error("The specified folder '{}' does not exist", .0.display())]
    RootNotFound(PathBuf),

    /// Basket root exists but is not a directory
    #[error("Not a directory: {}", .0.display())]
    NotADirectory(PathBuf),

    /// A project basket has no field manifest
    #[error("fields.ukb file not found for basket: {basket} ({})", .path.display())]
    MissingManifest { basket: String, path: PathBuf },

    /// Directory name is not `<label>_project_<project_id>_<basket_id>`
    #[error("Cannot split basket name '{0}' into label, project id and basket id")]
    MalformedBasketName(String),

    /// Mapping resolves no field to any basket
    #[error("Field-to-basket mapping contains no resolved basket")]
    NothingToMerge,

    /// Mapping file has an unexpected shape
    #[error("Invalid mapping file {}: {reason}", .path.display())]
    InvalidMapping { path: PathBuf, reason: String },

    /// Shared error (I/O, CSV, JSON, table errors)
    #[error(transparent)]
    Common(#[from] bbx_common::Error),
}

/// Result type for basket operations
pub type BasketResult<T> = Result<T, BasketError>;

impl From<std::io::Error> for BasketError {
    fn from(e: std::io::Error) -> Self {
        BasketError::Common(bbx_common::Error::Io(e))
    }
}
