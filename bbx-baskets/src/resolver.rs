//! Basket resolver
//!
//! Finds, for each requested field, the most recent basket of a project
//! that provides it. "Most recent" is the lexicographically greatest
//! basket directory name. This is a whole-string comparison, so
//! `x_project_1_9` is newer than `x_project_1_10`; existing mapping files
//! were produced with this rule and it is kept as is.

use crate::basket::{belongs_to_project, manifest_path};
use crate::error::{BasketError, BasketResult};
use crate::mapping::{BasketAssignment, FieldToBasket};
use bbx_common::fields::parse_id_list;
use bbx_common::{Diagnosed, Error, Warning};
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use tracing::{debug, info};

/// Candidate baskets per requested field
pub type Candidates = Vec<(String, Vec<String>)>;

/// Names of the immediate subdirectories of `root` (symlinked ones included), sorted
pub fn list_baskets(root: &Path) -> BasketResult<Vec<String>> {
    if !root.exists() {
        return Err(BasketError::RootNotFound(root.to_path_buf()));
    }
    if !root.is_dir() {
        return Err(BasketError::NotADirectory(root.to_path_buf()));
    }

    let mut baskets = Vec::new();
    for entry in fs::read_dir(root).map_err(|e| Error::file(root, e))? {
        let entry = entry.map_err(|e| Error::file(root, e))?;
        // Follows symlinks: basket stores are often linked into the root
        if !entry.path().is_dir() {
            continue;
        }
        baskets.push(entry.file_name().to_string_lossy().into_owned());
    }
    baskets.sort();
    Ok(baskets)
}

/// Field ids listed in a basket's manifest
pub fn read_manifest(root: &Path, basket: &str) -> BasketResult<Vec<String>> {
    let path = manifest_path(root, basket);
    if !path.is_file() {
        return Err(BasketError::MissingManifest {
            basket: basket.to_string(),
            path,
        });
    }
    let text = fs::read_to_string(&path).map_err(|e| Error::file(&path, e))?;
    Ok(parse_id_list(&text))
}

/// Every project basket providing each requested field
///
/// Fields keep the order of `fields` (first occurrence). A project basket
/// without a manifest aborts the whole scan.
pub fn find_candidates(root: &Path, project_id: &str, fields: &[String]) -> BasketResult<Candidates> {
    let mut candidates: Candidates = Vec::new();
    let mut slot: HashMap<&str, usize> = HashMap::new();
    for field in fields {
        if !slot.contains_key(field.as_str()) {
            slot.insert(field.as_str(), candidates.len());
            candidates.push((field.clone(), Vec::new()));
        }
    }

    for basket in list_baskets(root)? {
        if !belongs_to_project(&basket, project_id) {
            continue;
        }
        let provided = read_manifest(root, &basket)?;
        debug!("Basket {} lists {} fields", basket, provided.len());

        for field in &provided {
            if let Some(&i) = slot.get(field.as_str()) {
                candidates[i].1.push(basket.clone());
            }
        }
    }
    Ok(candidates)
}

/// Pick the most recent basket (lexicographic maximum of the name)
pub fn most_recent(baskets: &[String]) -> Option<&String> {
    baskets.iter().max()
}

/// Resolve every requested field to its most recent basket
///
/// Fields no project basket provides resolve to `Missing` and are reported
/// as warnings; they stay in the mapping.
pub fn resolve(
    root: &Path,
    project_id: &str,
    fields: &[String],
) -> BasketResult<Diagnosed<FieldToBasket>> {
    info!(
        "Retrieving baskets of project {} for {} fields from {}",
        project_id,
        fields.len(),
        root.display()
    );
    let candidates = find_candidates(root, project_id, fields)?;

    let mut mapping = FieldToBasket::new();
    let mut warnings = Vec::new();
    for (field, baskets) in candidates {
        match most_recent(&baskets) {
            Some(basket) => {
                if baskets.len() > 1 {
                    debug!(
                        "Field {} found in {} baskets, keeping {}",
                        field,
                        baskets.len(),
                        basket
                    );
                }
                mapping.insert(field, BasketAssignment::Basket(basket.clone()));
            }
            None => {
                warnings.push(Warning::MissingField {
                    field: field.clone(),
                    project_id: project_id.to_string(),
                });
                mapping.insert(field, BasketAssignment::Missing);
            }
        }
    }

    info!(
        "Resolved {} of {} fields",
        mapping.len() - mapping.missing_fields().len(),
        mapping.len()
    );
    Ok(Diagnosed::new(mapping, warnings))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_most_recent_is_lexicographic() {
        let baskets = vec![
            "ukb_project_1_10".to_string(),
            "ukb_project_1_9".to_string(),
            "ukb_project_1_100".to_string(),
        ];
        assert_eq!(most_recent(&baskets).unwrap(), "ukb_project_1_9");
    }

    #[test]
    fn test_most_recent_of_nothing() {
        assert!(most_recent(&[]).is_none());
    }

    #[test]
    fn test_missing_root() {
        let err = resolve(Path::new("/nonexistent/baskets"), "1", &["31".to_string()]).unwrap_err();
        assert!(matches!(err, BasketError::RootNotFound(_)));
    }
}
