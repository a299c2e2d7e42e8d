//! Column inventory of a unified table, grouped by field

use bbx_common::column::decode;
use bbx_common::dictionary::{FieldDictionary, ValueKind};
use bbx_common::{Diagnosed, UnifiedTable};
use serde::Serialize;

/// Summary of one field's columns
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldSummary {
    pub field_id: String,
    /// Declared kind, if the dictionary knows the field
    pub kind: Option<ValueKind>,
    pub columns: Vec<String>,
    /// Distinct instances, in column order
    pub instances: Vec<String>,
    /// Non-missing cells across the field's columns
    pub present: usize,
    /// Present cells that do not parse as the declared kind
    pub unparsable: usize,
}

/// Inventory of the table, fields in first-column order
///
/// Undecodable columns are reported and summarized under their own name.
pub fn describe(
    table: &UnifiedTable,
    dictionary: Option<&FieldDictionary>,
) -> Diagnosed<Vec<FieldSummary>> {
    let mut warnings = Vec::new();
    let mut summaries: Vec<FieldSummary> = Vec::new();

    for (col, column) in table.columns().iter().enumerate() {
        let key = decode(column).absorb_into(&mut warnings);
        let (field_id, instance) = match &key {
            Some(k) => (k.field_id.as_str(), Some(k.instance_id.as_str())),
            None => (column.as_str(), None),
        };

        let position = match summaries.iter().position(|s| s.field_id == field_id) {
            Some(p) => p,
            None => {
                summaries.push(FieldSummary {
                    field_id: field_id.to_string(),
                    kind: dictionary.and_then(|d| d.kind_of_field(field_id)),
                    columns: Vec::new(),
                    instances: Vec::new(),
                    present: 0,
                    unparsable: 0,
                });
                summaries.len() - 1
            }
        };
        let summary = &mut summaries[position];
        summary.columns.push(column.clone());
        if let Some(instance) = instance {
            if !summary.instances.iter().any(|i| i == instance) {
                summary.instances.push(instance.to_string());
            }
        }

        for row in 0..table.len() {
            if table.cell(row, col).is_none() {
                continue;
            }
            summary.present += 1;
            if let (Some(d), Some(_)) = (dictionary, summary.kind) {
                if table.typed_value(row, col, d).is_none() {
                    summary.unparsable += 1;
                }
            }
        }
    }
    Diagnosed::new(summaries, warnings)
}
