//! Column and row filters over the unified table
//!
//! Row filters return the subject ids that pass, in table order; callers
//! project the table with [`UnifiedTable::retain_subjects`].

use bbx_common::column::decode;
use bbx_common::{Diagnosed, SubjectId, UnifiedTable};
use tracing::debug;

/// Drop the columns recorded at another instance
///
/// Columns that do not decode as `<field>-<instance>.<array>` are kept and
/// reported.
pub fn filter_instance(table: &UnifiedTable, instance: &str) -> Diagnosed<UnifiedTable> {
    let mut warnings = Vec::new();
    let keep: Vec<bool> = table
        .columns()
        .iter()
        .map(|c| match decode(c).absorb_into(&mut warnings) {
            Some(key) => key.instance_id == instance,
            None => true,
        })
        .collect();

    let mut filtered = table.clone();
    let mut flags = keep.iter();
    filtered.retain_columns(|_| *flags.next().unwrap_or(&true));
    debug!(
        "Instance {}: kept {} of {} columns",
        instance,
        filtered.columns().len(),
        table.columns().len()
    );
    Diagnosed::new(filtered, warnings)
}

/// Subjects with a value in every column of the given fields
pub fn fully_populated(table: &UnifiedTable, field_ids: &[&str]) -> Vec<SubjectId> {
    let positions = table.field_positions(field_ids);
    table
        .rows()
        .filter(|row| positions.iter().all(|&col| row.at(col).is_some()))
        .map(|row| row.subject().to_string())
        .collect()
}

/// Subjects with a value in at least one column of the given fields
pub fn partially_populated(table: &UnifiedTable, field_ids: &[&str]) -> Vec<SubjectId> {
    let positions = table.field_positions(field_ids);
    table
        .rows()
        .filter(|row| positions.iter().any(|&col| row.at(col).is_some()))
        .map(|row| row.subject().to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use bbx_common::Warning;

    fn sample() -> UnifiedTable {
        let columns = ["31-0.0", "4080-0.0", "4080-1.0", "4080-0.1", "weird"];
        let mut t = UnifiedTable::new("t", columns.iter().map(|c| c.to_string()).collect());
        let rows: [(&str, [Option<&str>; 5]); 3] = [
            ("1", [Some("0"), Some("120"), Some("125"), Some("118"), None]),
            ("2", [Some("1"), None, Some("130"), None, Some("x")]),
            ("3", [Some("1"), None, None, None, None]),
        ];
        for (subject, cells) in rows {
            t.push_row(
                subject.to_string(),
                cells.iter().map(|c| c.map(str::to_string)).collect(),
            )
            .unwrap();
        }
        t
    }

    #[test]
    fn test_filter_instance_keeps_matching_and_undecodable() {
        let filtered = filter_instance(&sample(), "0");
        assert_eq!(
            filtered.value.columns(),
            &["31-0.0", "4080-0.0", "4080-0.1", "weird"]
        );
        assert_eq!(filtered.value.len(), 3);
        assert!(matches!(
            filtered.warnings.as_slice(),
            [Warning::MalformedColumn { column, .. }] if column == "weird"
        ));
    }

    #[test]
    fn test_fully_populated() {
        assert_eq!(fully_populated(&sample(), &["4080"]), vec!["1".to_string()]);
        assert_eq!(fully_populated(&sample(), &["31"]).len(), 3);
    }

    #[test]
    fn test_partially_populated() {
        assert_eq!(
            partially_populated(&sample(), &["4080"]),
            vec!["1".to_string(), "2".to_string()]
        );
    }

    #[test]
    fn test_unknown_field_selects_nothing_to_check() {
        // No columns: every subject trivially has all and none of them
        assert_eq!(fully_populated(&sample(), &["99999"]).len(), 3);
        assert!(partially_populated(&sample(), &["99999"]).is_empty());
    }
}
