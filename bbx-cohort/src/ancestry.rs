//! Ancestry cohort filter
//!
//! Two stages:
//! 1. Reference group: subjects whose self-reported ethnic background is
//!    the same at every recorded instance and equals the target category.
//! 2. Proximity: the medoid of the reference group in genetic principal
//!    component space seeds the cohort; every subject of the table (not
//!    only the reference group) closer than the threshold is kept.

use crate::error::{CohortError, CohortResult};
use crate::medoid::{euclidean, MedoidStrategy, Points, DEFAULT_CELL_BUDGET};
use bbx_common::column::ColumnKey;
use bbx_common::config::CohortSettings;
use bbx_common::dictionary::category_key;
use bbx_common::table::RowView;
use bbx_common::{Diagnosed, SubjectId, UnifiedTable, Warning};
use std::collections::HashSet;
use tracing::info;

/// Ethnic background
pub const ETHNICITY_FIELD: &str = "21000";
/// "British" in the ethnic background coding
pub const TARGET_CATEGORY: &str = "1001";
/// Genetic principal components
pub const GENETIC_PC_FIELD: &str = "22009";
pub const DEFAULT_COMPONENTS: usize = 15;
pub const DEFAULT_THRESHOLD: f64 = 40.0;

/// Ancestry filter settings
#[derive(Debug, Clone, PartialEq)]
pub struct AncestryConfig {
    pub ethnicity_field: String,
    pub target_category: String,
    pub feature_field: String,
    /// Number of leading feature columns used for distances
    pub components: usize,
    /// Subjects strictly closer than this to the medoid are kept
    pub threshold: f64,
    pub strategy: MedoidStrategy,
    /// Largest matrix the full-matrix strategy may allocate
    pub cell_budget: usize,
}

impl Default for AncestryConfig {
    fn default() -> Self {
        Self {
            ethnicity_field: ETHNICITY_FIELD.to_string(),
            target_category: TARGET_CATEGORY.to_string(),
            feature_field: GENETIC_PC_FIELD.to_string(),
            components: DEFAULT_COMPONENTS,
            threshold: DEFAULT_THRESHOLD,
            strategy: MedoidStrategy::default(),
            cell_budget: DEFAULT_CELL_BUDGET,
        }
    }
}

impl AncestryConfig {
    /// Defaults overridden by the `[cohort]` config section
    pub fn from_settings(settings: &CohortSettings) -> CohortResult<Self> {
        let mut config = AncestryConfig::default();
        if let Some(v) = &settings.ethnicity_field {
            config.ethnicity_field = v.clone();
        }
        if let Some(v) = &settings.target_category {
            config.target_category = v.clone();
        }
        if let Some(v) = &settings.feature_field {
            config.feature_field = v.clone();
        }
        if let Some(v) = settings.components {
            config.components = v;
        }
        if let Some(v) = settings.threshold {
            config.threshold = v;
        }
        if let Some(v) = &settings.medoid {
            config.strategy = v.parse()?;
        }
        if let Some(v) = settings.full_matrix_cell_budget {
            config.cell_budget = v;
        }
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> CohortResult<()> {
        if self.components == 0 {
            return Err(CohortError::Config(
                "components must be at least 1".to_string(),
            ));
        }
        if !self.threshold.is_finite() || self.threshold <= 0.0 {
            return Err(CohortError::Config(format!(
                "threshold must be a positive number, got {}",
                self.threshold
            )));
        }
        Ok(())
    }
}

/// The single category a subject reports, if consistent
///
/// Missing values are ignored. Returns `None` when the subject reports no
/// value at all or more than one distinct value.
pub fn consistent_category(values: &[Option<&str>]) -> Option<String> {
    let distinct: HashSet<String> = values.iter().flatten().map(|v| category_key(v)).collect();
    if distinct.len() == 1 {
        distinct.into_iter().next()
    } else {
        None
    }
}

/// Subjects consistently reporting `target` for `field`, in table order
pub fn consistent_subjects(
    table: &UnifiedTable,
    field: &str,
    target: &str,
) -> CohortResult<Vec<SubjectId>> {
    let positions = table.field_positions(&[field]);
    if positions.is_empty() {
        return Err(CohortError::NoMatchingColumns(field.to_string()));
    }
    let target = category_key(target);

    let mut values: Vec<Option<&str>> = Vec::with_capacity(positions.len());
    let subjects: Vec<SubjectId> = table
        .rows()
        .filter(|row| {
            values.clear();
            values.extend(positions.iter().map(|&col| row.at(col)));
            consistent_category(&values).as_deref() == Some(target.as_str())
        })
        .map(|row| row.subject().to_string())
        .collect();

    info!(
        "{} of {} subjects consistently report {} = {}",
        subjects.len(),
        table.len(),
        field,
        target
    );
    Ok(subjects)
}

/// First `k` columns of a feature field, ordered by (instance, array index)
///
/// Columns whose instance/array are not integers follow in table order.
pub fn feature_columns(
    table: &UnifiedTable,
    field: &str,
    k: usize,
) -> CohortResult<Diagnosed<Vec<String>>> {
    let mut columns: Vec<(Option<(u64, u64)>, usize, &str)> = table
        .field_columns(field)
        .into_iter()
        .enumerate()
        .map(|(pos, c)| {
            let key = ColumnKey::parse(c)
                .ok()
                .and_then(|key| key.numeric_position());
            (key, pos, c)
        })
        .collect();
    if columns.is_empty() {
        return Err(CohortError::NoMatchingColumns(field.to_string()));
    }

    // None sorts before Some; undecodable columns go last instead
    columns.sort_by_key(|&(key, pos, _)| (key.is_none(), key, pos));

    let mut warnings = Vec::new();
    if columns.len() < k {
        warnings.push(Warning::FewerFeatures {
            field: field.to_string(),
            requested: k,
            found: columns.len(),
        });
    }
    let picked = columns
        .into_iter()
        .take(k)
        .map(|(_, _, c)| c.to_string())
        .collect();
    Ok(Diagnosed::new(picked, warnings))
}

/// Numeric feature vector of a row; `None` if any value is missing or not a number
fn feature_vector(
    row: &RowView<'_>,
    columns: &[String],
    positions: &[usize],
    warnings: &mut Vec<Warning>,
) -> Option<Vec<f64>> {
    let mut vector = Vec::with_capacity(columns.len());
    let mut complete = true;
    for (column, &col) in columns.iter().zip(positions) {
        match row.at(col) {
            None => complete = false,
            Some(raw) => match raw.trim().parse::<f64>() {
                Ok(v) if v.is_finite() => vector.push(v),
                _ => {
                    warnings.push(Warning::NonNumericValue {
                        column: column.clone(),
                        subject: row.subject().to_string(),
                        value: raw.to_string(),
                    });
                    complete = false;
                }
            },
        }
    }
    complete.then_some(vector)
}

/// Result of an ancestry filter run
#[derive(Debug, Clone, PartialEq)]
pub struct AncestryOutcome {
    /// Subjects closer than the threshold to the medoid, in table order
    pub cohort: Vec<SubjectId>,
    /// Consistent-category subjects with a complete feature vector
    pub reference_size: usize,
    /// Subject whose feature vector is the medoid
    pub medoid_subject: SubjectId,
    /// Feature columns used
    pub feature_columns: Vec<String>,
}

/// Categorical consistency + medoid distance filter
#[derive(Debug, Clone, Default)]
pub struct AncestryFilter {
    config: AncestryConfig,
}

impl AncestryFilter {
    pub fn new(config: AncestryConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &AncestryConfig {
        &self.config
    }

    /// Run both stages over the table
    pub fn run(&self, table: &UnifiedTable) -> CohortResult<Diagnosed<AncestryOutcome>> {
        let config = &self.config;
        config.validate()?;

        let reference =
            consistent_subjects(table, &config.ethnicity_field, &config.target_category)?;
        if reference.is_empty() {
            return Err(CohortError::EmptyReferenceGroup {
                field: config.ethnicity_field.clone(),
                category: config.target_category.clone(),
            });
        }

        let (columns, mut warnings) =
            feature_columns(table, &config.feature_field, config.components)?.into_parts();

        let positions: Vec<usize> = columns
            .iter()
            .filter_map(|c| table.column_index(c))
            .collect();
        // Parse every subject once; the reference group reuses these vectors
        let vectors: Vec<Option<Vec<f64>>> = table
            .rows()
            .map(|row| feature_vector(&row, &columns, &positions, &mut warnings))
            .collect();

        let reference: HashSet<&str> = reference.iter().map(String::as_str).collect();
        let mut points = Points::new(columns.len());
        let mut point_subjects = Vec::new();
        for (subject, vector) in table.subjects().iter().zip(&vectors) {
            if !reference.contains(subject.as_str()) {
                continue;
            }
            if let Some(v) = vector {
                points.push(v)?;
                point_subjects.push(subject.clone());
            }
        }
        if points.is_empty() {
            return Err(CohortError::NoUsableRows(format!(
                "none of the {} reference subjects has all {} values of field {}",
                reference.len(),
                columns.len(),
                config.feature_field
            )));
        }
        info!(
            "Computing {} medoid of {} reference subjects over {} components",
            config.strategy,
            points.len(),
            columns.len()
        );

        let medoid = config.strategy.compute(&points, config.cell_budget)?;
        let center = points.row(medoid.index).to_vec();

        let cohort: Vec<SubjectId> = table
            .subjects()
            .iter()
            .zip(&vectors)
            .filter_map(|(subject, vector)| {
                let v = vector.as_ref()?;
                (euclidean(v, &center) < config.threshold).then(|| subject.clone())
            })
            .collect();

        info!(
            "{} of {} subjects within distance {} of the medoid",
            cohort.len(),
            table.len(),
            config.threshold
        );

        Ok(Diagnosed::new(
            AncestryOutcome {
                cohort,
                reference_size: points.len(),
                medoid_subject: point_subjects[medoid.index].clone(),
                feature_columns: columns,
            },
            warnings,
        ))
    }

    /// Subject ids of the cohort
    pub fn filter(&self, table: &UnifiedTable) -> CohortResult<Diagnosed<Vec<SubjectId>>> {
        Ok(self.run(table)?.map(|outcome| outcome.cohort))
    }
}

/// Ancestry filter with the given settings
pub fn filter_ancestry(
    table: &UnifiedTable,
    config: AncestryConfig,
) -> CohortResult<Diagnosed<Vec<SubjectId>>> {
    AncestryFilter::new(config).filter(table)
}
