//! End-to-end tests for the ancestry filter on a unified table written to disk

use bbx_cohort::{AncestryConfig, AncestryFilter, CohortError, MedoidStrategy};
use bbx_common::{UnifiedTable, Warning};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

const COMPONENTS: usize = 15;

/// One subject: ethnicity at three instances, then the 15 components
struct Subject {
    eid: &'static str,
    ethnicity: [&'static str; 3],
    pcs: Vec<String>,
}

fn near(seed: f64) -> Vec<String> {
    (0..COMPONENTS)
        .map(|i| format!("{:.3}", seed + (i as f64) * 0.01))
        .collect()
}

fn far(offset: f64) -> Vec<String> {
    (0..COMPONENTS).map(|_| format!("{}", offset)).collect()
}

fn subject(eid: &'static str, ethnicity: [&'static str; 3], pcs: Vec<String>) -> Subject {
    Subject {
        eid,
        ethnicity,
        pcs,
    }
}

/// Write a unified table; components are written in a shuffled header order
fn write_raw_data(dir: &TempDir, subjects: &[Subject]) -> PathBuf {
    let mut header = vec![
        "eid".to_string(),
        "21000-0.0".to_string(),
        "21000-1.0".to_string(),
        "21000-2.0".to_string(),
    ];
    // 22009-0.10 .. 22009-0.15 before 22009-0.1 .. 22009-0.9
    let order: Vec<usize> = (10..=COMPONENTS).chain(1..10).collect();
    header.extend(order.iter().map(|i| format!("22009-0.{}", i)));
    header.push("31-0.0".to_string());

    let mut text = header.join(",");
    text.push('\n');
    for s in subjects {
        let mut cells = vec![s.eid.to_string()];
        cells.extend(s.ethnicity.iter().map(|e| e.to_string()));
        cells.extend(order.iter().map(|&i| s.pcs[i - 1].clone()));
        cells.push("1".to_string());
        text.push_str(&cells.join(","));
        text.push('\n');
    }

    let path = dir.path().join("raw_data.csv");
    fs::write(&path, text).unwrap();
    path
}

fn load(path: &Path) -> UnifiedTable {
    UnifiedTable::read_csv(path, Some(&["21000", "22009"][..])).unwrap()
}

fn six_subjects() -> Vec<Subject> {
    vec![
        subject("1", ["1001", "", ""], near(0.0)),
        subject("2", ["1001", "1001", ""], near(1.0)),
        subject("3", ["1001", "", "1001"], near(-1.0)),
        subject("4", ["1001", "NA", ""], near(0.5)),
        subject("5", ["1001", "", ""], far(150.0)),
        subject("6", ["1001", "", ""], far(-200.0)),
    ]
}

#[test]
fn test_clustered_subjects_are_kept() {
    let dir = TempDir::new().unwrap();
    let table = load(&write_raw_data(&dir, &six_subjects()));

    let outcome = AncestryFilter::default().run(&table).unwrap();
    assert!(outcome.warnings.is_empty(), "{:?}", outcome.warnings);
    let outcome = outcome.value;

    assert_eq!(outcome.cohort, vec!["1", "2", "3", "4"]);
    assert_eq!(outcome.reference_size, 6);
    assert!(["1", "4"].contains(&outcome.medoid_subject.as_str()));
    assert_eq!(outcome.feature_columns.len(), COMPONENTS);
    assert_eq!(outcome.feature_columns[0], "22009-0.1");
    assert_eq!(outcome.feature_columns[14], "22009-0.15");
}

#[test]
fn test_strategies_agree() {
    let dir = TempDir::new().unwrap();
    let table = load(&write_raw_data(&dir, &six_subjects()));

    let run = |strategy| {
        let config = AncestryConfig {
            strategy,
            ..AncestryConfig::default()
        };
        AncestryFilter::new(config).run(&table).unwrap().value
    };
    let full = run(MedoidStrategy::FullMatrix);
    let lean = run(MedoidStrategy::MemoryEfficient);
    assert_eq!(full.cohort, lean.cohort);
    assert_eq!(full.medoid_subject, lean.medoid_subject);
}

#[test]
fn test_non_reference_subjects_within_threshold_are_kept() {
    let dir = TempDir::new().unwrap();
    let mut subjects = six_subjects();
    // Inconsistent ethnicity: not in the reference group, still close
    subjects.push(subject("7", ["1001", "1002", ""], near(0.2)));
    // Other ethnicity far away
    subjects.push(subject("8", ["3001", "", ""], far(90.0)));
    let table = load(&write_raw_data(&dir, &subjects));

    let outcome = AncestryFilter::default().run(&table).unwrap().value;
    assert_eq!(outcome.reference_size, 6);
    assert_eq!(outcome.cohort, vec!["1", "2", "3", "4", "7"]);
}

#[test]
fn test_incomplete_feature_vectors_are_excluded() {
    let dir = TempDir::new().unwrap();
    let mut subjects = six_subjects();
    let mut missing = near(0.0);
    missing[3] = String::new();
    subjects.push(subject("7", ["1001", "", ""], missing));
    let mut garbled = near(0.0);
    garbled[7] = "abc".to_string();
    subjects.push(subject("8", ["1001", "", ""], garbled));
    let table = load(&write_raw_data(&dir, &subjects));

    let outcome = AncestryFilter::default().run(&table).unwrap();
    assert_eq!(outcome.value.cohort, vec!["1", "2", "3", "4"]);
    assert_eq!(outcome.value.reference_size, 6);
    assert_eq!(
        outcome.warnings,
        vec![Warning::NonNumericValue {
            column: "22009-0.8".to_string(),
            subject: "8".to_string(),
            value: "abc".to_string(),
        }]
    );
}

#[test]
fn test_fewer_components_than_requested_warns() {
    let dir = TempDir::new().unwrap();
    let table = load(&write_raw_data(&dir, &six_subjects()));
    let config = AncestryConfig {
        components: 20,
        ..AncestryConfig::default()
    };

    let outcome = AncestryFilter::new(config).run(&table).unwrap();
    assert_eq!(outcome.value.feature_columns.len(), COMPONENTS);
    assert_eq!(outcome.value.cohort.len(), 4);
    assert!(matches!(
        outcome.warnings.as_slice(),
        [Warning::FewerFeatures { requested: 20, found: 15, .. }]
    ));
}

#[test]
fn test_null_ethnicity_tokens_do_not_break_consistency() {
    let dir = TempDir::new().unwrap();
    let mut subjects = six_subjects();
    subjects[1].ethnicity = ["1001", "NULL", "None"];
    subjects[2].ethnicity = ["<NA>", "1001", "N/A"];
    let table = load(&write_raw_data(&dir, &subjects));

    let outcome = AncestryFilter::default().run(&table).unwrap().value;
    assert_eq!(outcome.reference_size, 6);
    assert_eq!(outcome.cohort, vec!["1", "2", "3", "4"]);
}

#[test]
fn test_threshold_is_strict() {
    let mut table = UnifiedTable::new(
        "t",
        vec!["21000-0.0".to_string(), "22009-0.1".to_string()],
    );
    for (eid, pc) in [("1", "0"), ("2", "0"), ("3", "40"), ("4", "39.5")] {
        table
            .push_row(
                eid.to_string(),
                vec![Some("1001".to_string()), Some(pc.to_string())],
            )
            .unwrap();
    }

    let cohort = AncestryFilter::default().filter(&table).unwrap().value;
    // Medoid is subject 1 at 0; subject 3 sits exactly at the threshold
    assert_eq!(cohort, vec!["1", "2", "4"]);
}

#[test]
fn test_missing_ethnicity_field_is_fatal() {
    let dir = TempDir::new().unwrap();
    let path = write_raw_data(&dir, &six_subjects());
    let table = UnifiedTable::read_csv(&path, Some(&["22009"][..])).unwrap();

    assert!(matches!(
        AncestryFilter::default().run(&table),
        Err(CohortError::NoMatchingColumns(f)) if f == "21000"
    ));
}

#[test]
fn test_empty_reference_group_is_fatal() {
    let dir = TempDir::new().unwrap();
    let table = load(&write_raw_data(&dir, &six_subjects()));
    let config = AncestryConfig {
        target_category: "4001".to_string(),
        ..AncestryConfig::default()
    };

    assert!(matches!(
        AncestryFilter::new(config).run(&table),
        Err(CohortError::EmptyReferenceGroup { .. })
    ));
}

#[test]
fn test_reference_without_features_is_fatal() {
    let dir = TempDir::new().unwrap();
    let subjects = vec![
        subject("1", ["1001", "", ""], vec![String::new(); COMPONENTS]),
        subject("2", ["1002", "", ""], near(0.0)),
    ];
    let table = load(&write_raw_data(&dir, &subjects));

    assert!(matches!(
        AncestryFilter::default().run(&table),
        Err(CohortError::NoUsableRows(_))
    ));
}

#[test]
fn test_full_matrix_budget_is_enforced() {
    let dir = TempDir::new().unwrap();
    let table = load(&write_raw_data(&dir, &six_subjects()));
    let config = AncestryConfig {
        strategy: MedoidStrategy::FullMatrix,
        cell_budget: 10,
        ..AncestryConfig::default()
    };

    assert!(matches!(
        AncestryFilter::new(config).run(&table),
        Err(CohortError::MatrixTooLarge { points: 6, budget: 10 })
    ));
}
