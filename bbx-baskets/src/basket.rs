//! Basket directory naming and layout
//!
//! A basket lives in `<root>/<label>_project_<project_id>_<basket_id>/` and
//! holds a field manifest (`fields.ukb`) plus its primary extract
//! (`ukb<basket_id>.csv`).

use crate::error::{BasketError, BasketResult};
use std::path::{Path, PathBuf};

/// File listing the field ids a basket provides
pub const MANIFEST_FILE: &str = "fields.ukb";

/// Parts of a basket directory name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BasketName {
    pub label: String,
    pub project_id: String,
    pub basket_id: String,
}

impl BasketName {
    /// Split `<label>_project_<project_id>_<basket_id>`
    ///
    /// The basket id is the last `_` segment; the project id is what
    /// follows the last `project_` before it.
    pub fn parse(name: &str) -> BasketResult<Self> {
        let malformed = || BasketError::MalformedBasketName(name.to_string());

        let (head, basket_id) = name.rsplit_once('_').ok_or_else(malformed)?;
        let (label, project_id) = head.rsplit_once("project_").ok_or_else(malformed)?;
        let label = label.strip_suffix('_').unwrap_or(label);

        if basket_id.is_empty() || project_id.is_empty() {
            return Err(malformed());
        }

        Ok(Self {
            label: label.to_string(),
            project_id: project_id.to_string(),
            basket_id: basket_id.to_string(),
        })
    }

    /// File name of the primary extract
    pub fn extract_file_name(&self) -> String {
        format!("ukb{}.csv", self.basket_id)
    }
}

/// Whether a directory name belongs to the project (substring match)
pub fn belongs_to_project(dir_name: &str, project_id: &str) -> bool {
    dir_name.contains(&format!("project_{}", project_id))
}

/// `<root>/<basket>/fields.ukb`
pub fn manifest_path(root: &Path, basket: &str) -> PathBuf {
    root.join(basket).join(MANIFEST_FILE)
}

/// `<root>/<basket>/ukb<basket_id>.csv`
pub fn extract_path(root: &Path, basket: &str) -> BasketResult<PathBuf> {
    let name = BasketName::parse(basket)?;
    Ok(root.join(basket).join(name.extract_file_name()))
}
