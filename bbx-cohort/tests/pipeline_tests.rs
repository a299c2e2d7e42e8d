//! Preprocessing pipeline over a unified table read from disk

use bbx_cohort::features::rename_features;
use bbx_cohort::filtering::{filter_instance, fully_populated};
use bbx_cohort::labeling::{first_diagnosis_date, matches_phenotype, PhenotypeRule};
use bbx_common::UnifiedTable;
use chrono::NaiveDate;
use std::collections::HashMap;
use std::fs;
use tempfile::TempDir;

const RAW_DATA: &str = "\
eid,31-0.0,21001-0.0,21001-1.0,4080-0.0,4080-0.1,4080-1.0,41270-0.0,41280-0.0,53-0.0
10,0,24.1,25.0,120,122,,I10,2014-02-01,2008-05-05
11,1,,31.2,140,,150,,,2009-06-06
12,1,27.5,,118,119,,E11,2016-07-07,2010-01-01
";

fn load() -> (TempDir, UnifiedTable) {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("raw_data.csv");
    fs::write(&path, RAW_DATA).unwrap();
    let table = UnifiedTable::read_csv(&path, None).unwrap();
    (dir, table)
}

#[test]
fn test_instance_then_population_then_rename() {
    let (_dir, table) = load();

    let baseline = filter_instance(&table, "0");
    assert!(baseline.warnings.is_empty());
    let baseline = baseline.value;
    assert!(!baseline.columns().iter().any(|c| c.contains("-1.")));

    let complete = fully_populated(&baseline, &["21001", "4080"]);
    assert_eq!(complete, vec!["10", "12"]);
    let mut selected = baseline.retain_subjects(&complete);

    let renamed = rename_features(&mut selected, &[("sex", "31"), ("bmi", "21001"), ("sbp", "4080")])
        .unwrap();
    assert!(renamed.warnings.is_empty());
    assert_eq!(renamed.value, vec!["sex", "bmi", "sbp_0", "sbp_1"]);
    assert_eq!(selected.row("12").unwrap().get("sbp_1"), Some("119"));
    assert_eq!(baseline.len(), 3);
}

#[test]
fn test_phenotype_labels_and_first_dates() {
    let (_dir, table) = load();
    let rules = vec![PhenotypeRule::any_code("41270", ["I10", "E11"])];
    let date_fields = HashMap::from([("41270".to_string(), "41280".to_string())]);

    let cases: Vec<(&str, bool, Option<NaiveDate>)> = table
        .rows()
        .map(|row| {
            (
                row.subject(),
                matches_phenotype(&row, &rules),
                first_diagnosis_date(&row, &rules, &date_fields).value,
            )
        })
        .collect();

    assert_eq!(
        cases,
        vec![
            ("10", true, NaiveDate::from_ymd_opt(2014, 2, 1)),
            ("11", false, None),
            ("12", true, NaiveDate::from_ymd_opt(2016, 7, 7)),
        ]
    );
}
