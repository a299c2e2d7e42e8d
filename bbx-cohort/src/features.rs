//! Feature naming helpers

use crate::error::CohortResult;
use bbx_common::{Diagnosed, UnifiedTable, Warning};

/// Rename the columns of each field to a feature name
///
/// A field with one column becomes `name`; a field with several becomes
/// `name_0, name_1, …` in table order. Returns the new feature names. A
/// field with no column is reported and skipped.
pub fn rename_features(
    table: &mut UnifiedTable,
    features: &[(&str, &str)],
) -> CohortResult<Diagnosed<Vec<String>>> {
    let mut names = Vec::new();
    let mut warnings = Vec::new();

    for &(feature, field_id) in features {
        let columns: Vec<String> = table
            .field_columns(field_id)
            .into_iter()
            .map(str::to_string)
            .collect();
        match columns.as_slice() {
            [] => warnings.push(Warning::MissingFeature {
                feature: feature.to_string(),
                field: field_id.to_string(),
            }),
            [single] => {
                table.rename_column(single, feature)?;
                names.push(feature.to_string());
            }
            several => {
                for (i, column) in several.iter().enumerate() {
                    let name = format!("{}_{}", feature, i);
                    table.rename_column(column, &name)?;
                    names.push(name);
                }
            }
        }
    }
    Ok(Diagnosed::new(names, warnings))
}

/// First present value, scanning left to right
pub fn first_present<T>(values: &[Option<T>]) -> Option<&T> {
    values.iter().find_map(Option::as_ref)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CohortError;

    fn sample() -> UnifiedTable {
        let columns = ["31-0.0", "4080-0.0", "4080-0.1", "21000-0.0"];
        let mut t = UnifiedTable::new("t", columns.iter().map(|c| c.to_string()).collect());
        t.push_row(
            "1".to_string(),
            vec![
                Some("0".to_string()),
                Some("120".to_string()),
                Some("118".to_string()),
                None,
            ],
        )
        .unwrap();
        t
    }

    #[test]
    fn test_rename_single_and_multiple_columns() {
        let mut t = sample();
        let renamed = rename_features(&mut t, &[("sex", "31"), ("sbp", "4080"), ("bmi", "21001")])
            .unwrap();

        assert_eq!(renamed.value, vec!["sex", "sbp_0", "sbp_1"]);
        assert_eq!(t.columns(), &["sex", "sbp_0", "sbp_1", "21000-0.0"]);
        assert_eq!(t.row("1").unwrap().get("sbp_1"), Some("118"));
        assert_eq!(
            renamed.warnings,
            vec![Warning::MissingFeature {
                feature: "bmi".to_string(),
                field: "21001".to_string(),
            }]
        );
    }

    #[test]
    fn test_rename_collision_is_error() {
        let mut t = sample();
        let err = rename_features(&mut t, &[("21000-0.0", "31")]).unwrap_err();
        assert!(matches!(
            err,
            CohortError::Common(bbx_common::Error::ColumnCollision(_))
        ));
    }

    #[test]
    fn test_first_present() {
        assert_eq!(first_present(&[None, Some(3), Some(4)]), Some(&3));
        assert_eq!(first_present::<i32>(&[None, None]), None);
        assert_eq!(first_present::<i32>(&[]), None);
    }
}
