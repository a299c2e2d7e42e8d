//! Source merger
//!
//! Loads the requested columns of every resolved basket and inner-joins
//! them on subject id into one table.

use crate::basket::extract_path;
use crate::error::{BasketError, BasketResult};
use crate::mapping::FieldToBasket;
use bbx_common::column::matches_fields;
use bbx_common::{Diagnosed, UnifiedTable, Warning};
use std::path::Path;
use tracing::{info, warn};

/// Columns of one basket's extract to load
#[derive(Debug, Clone)]
pub struct BasketLoad {
    pub basket: String,
    pub extract: std::path::PathBuf,
    pub fields: Vec<String>,
}

/// Plan the per-basket loads for a mapping, in mapping order
pub fn plan_loads(root: &Path, mapping: &FieldToBasket) -> BasketResult<Vec<BasketLoad>> {
    mapping
        .by_basket()
        .into_iter()
        .map(|(basket, fields)| {
            let extract = extract_path(root, &basket)?;
            Ok(BasketLoad {
                basket,
                extract,
                fields,
            })
        })
        .collect()
}

/// Load one basket's subject column plus the columns of its fields
///
/// Fields the manifest promised but the header lacks are reported and
/// contribute nothing.
pub fn load_basket(load: &BasketLoad) -> BasketResult<Diagnosed<UnifiedTable>> {
    info!("Loading data from {}", load.extract.display());
    let header = UnifiedTable::read_header(&load.extract)?;

    let mut warnings = Vec::new();
    for field in &load.fields {
        if matches_fields(&header, &[field.as_str()]).is_empty() {
            warnings.push(Warning::HeaderMismatch {
                basket: load.basket.clone(),
                field: field.clone(),
            });
        }
    }

    let wanted: Vec<&str> = load.fields.iter().map(String::as_str).collect();
    let table = UnifiedTable::read_csv(&load.extract, Some(wanted.as_slice()))?.with_label(&load.basket);
    Ok(Diagnosed::new(table, warnings))
}

/// Merge the resolved baskets into one subject-indexed table
///
/// Baskets are joined pairwise in mapping order with an inner join on the
/// subject id; a subject absent from any basket is dropped. Two baskets
/// providing the same column is an error.
pub fn merge(root: &Path, mapping: &FieldToBasket) -> BasketResult<Diagnosed<UnifiedTable>> {
    let mut warnings = Vec::new();
    for field in mapping.missing_fields() {
        warnings.push(Warning::Note(format!(
            "Field {} has no basket and is left out of the merge",
            field
        )));
    }

    let loads = plan_loads(root, mapping)?;
    if loads.is_empty() {
        return Err(BasketError::NothingToMerge);
    }

    let mut merged: Option<UnifiedTable> = None;
    for load in &loads {
        let table = load_basket(load)?.absorb_into(&mut warnings);
        merged = Some(match merged {
            None => table,
            Some(left) => left.inner_join(table)?,
        });
    }

    let merged = merged.ok_or(BasketError::NothingToMerge)?;
    if merged.is_empty() {
        warn!("Merged table has no subject common to all baskets");
    }
    info!(
        "Merged {} baskets: {} subjects x {} columns",
        loads.len(),
        merged.len(),
        merged.columns().len()
    );
    Ok(Diagnosed::new(merged, warnings))
}
