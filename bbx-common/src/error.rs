//! Common error types for BBX

use std::path::PathBuf;
use thiserror::Error;

/// Common result type for BBX operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types across BBX tools
#[derive(Error, Debug)]
pub enum Error {
    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// I/O error attached to the file it happened on
    #[error("IO error on {path}: {source}")]
    File {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// CSV parsing or writing error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// JSON encoding or decoding error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Required file or directory does not exist
    #[error("Not found: {}", .0.display())]
    NotFound(PathBuf),

    /// Invalid user input or request parameter
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Two sources provide a column with the same name
    #[error("Column collision: '{0}' is provided by more than one source")]
    ColumnCollision(String),

    /// The same subject appears twice in one source
    #[error("Duplicate subject '{subject}' in {source_name}")]
    DuplicateSubject {
        subject: String,
        source_name: String,
    },

    /// A table has no header row
    #[error("Empty table: {}", .0.display())]
    EmptyTable(PathBuf),
}

impl Error {
    /// Wrap an I/O error with the path it happened on
    pub fn file(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::File {
            path: path.into(),
            source,
        }
    }
}
