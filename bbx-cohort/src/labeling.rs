//! Phenotype labeling
//!
//! A phenotype is a list of rules, each pairing a field with a predicate on
//! the raw cell text. A subject matches when any present value of any rule's
//! field satisfies its predicate. Diagnosis dates come from a companion date
//! field recorded at the same instance/array as the matching column.

use bbx_common::column::{decode, encode, field_of};
use bbx_common::table::RowView;
use bbx_common::{Diagnosed, Warning};
use chrono::NaiveDate;
use std::collections::HashMap;
use std::fmt;

/// Date of attending the assessment centre, used when a field has no date field
pub const ASSESSMENT_DATE_FIELD: &str = "53";

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Field + predicate on its raw values
pub struct PhenotypeRule {
    pub field_id: String,
    condition: Box<dyn Fn(&str) -> bool>,
}

impl PhenotypeRule {
    pub fn new(field_id: impl Into<String>, condition: impl Fn(&str) -> bool + 'static) -> Self {
        Self {
            field_id: field_id.into(),
            condition: Box::new(condition),
        }
    }

    /// Rule matching any of the given codes exactly (e.g. ICD-10 codes)
    pub fn any_code<I, S>(field_id: impl Into<String>, codes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let codes: Vec<String> = codes.into_iter().map(Into::into).collect();
        Self::new(field_id, move |v| codes.iter().any(|c| c == v.trim()))
    }

    pub fn matches(&self, value: &str) -> bool {
        (self.condition)(value)
    }
}

impl fmt::Debug for PhenotypeRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PhenotypeRule")
            .field("field_id", &self.field_id)
            .finish_non_exhaustive()
    }
}

/// Columns of the row whose value satisfies a rule, rule order then column order
pub fn matching_columns<'a>(row: &RowView<'a>, rules: &[PhenotypeRule]) -> Vec<&'a str> {
    let mut matched = Vec::new();
    for rule in rules {
        for (column, value) in row.cells() {
            if field_of(column) != rule.field_id {
                continue;
            }
            if let Some(v) = value {
                if rule.matches(v) {
                    matched.push(column);
                }
            }
        }
    }
    matched
}

/// Whether any rule matches the row
pub fn matches_phenotype(row: &RowView<'_>, rules: &[PhenotypeRule]) -> bool {
    rules.iter().any(|rule| {
        row.cells().any(|(column, value)| {
            field_of(column) == rule.field_id
                && value.is_some_and(|v| rule.matches(v))
        })
    })
}

/// Diagnosis date cells of every matching column
///
/// `date_fields` maps a phenotype field to its date field, which shares the
/// matching column's instance and array index. Fields without a mapping use
/// the assessment date at array index 0 of the same instance. Matching
/// columns that do not decode, and date cells that are absent, are reported
/// and skipped.
pub fn diagnosis_dates<'a>(
    row: &RowView<'a>,
    rules: &[PhenotypeRule],
    date_fields: &HashMap<String, String>,
) -> Diagnosed<Vec<&'a str>> {
    let mut warnings = Vec::new();
    let mut dates = Vec::new();

    for column in matching_columns(row, rules) {
        let Some(key) = decode(column).absorb_into(&mut warnings) else {
            continue;
        };
        let date_column = match date_fields.get(&key.field_id) {
            Some(date_field) => encode(date_field, &key.instance_id, &key.array_id),
            None => encode(ASSESSMENT_DATE_FIELD, &key.instance_id, "0"),
        };
        match row.get(&date_column) {
            Some(date) => dates.push(date),
            None => warnings.push(Warning::Note(format!(
                "Subject {}: no date in {} for matching column {}",
                row.subject(),
                date_column,
                column
            ))),
        }
    }
    Diagnosed::new(dates, warnings)
}

/// Earliest diagnosis date of the row, `None` if no date is available
///
/// Dates are `YYYY-MM-DD`; unparsable dates are reported and ignored.
pub fn first_diagnosis_date(
    row: &RowView<'_>,
    rules: &[PhenotypeRule],
    date_fields: &HashMap<String, String>,
) -> Diagnosed<Option<NaiveDate>> {
    let (raw, mut warnings) = diagnosis_dates(row, rules, date_fields).into_parts();
    let first = raw
        .into_iter()
        .filter_map(|d| match NaiveDate::parse_from_str(d.trim(), DATE_FORMAT) {
            Ok(date) => Some(date),
            Err(e) => {
                warnings.push(Warning::Note(format!(
                    "Subject {}: ignoring date '{}' ({})",
                    row.subject(),
                    d,
                    e
                )));
                None
            }
        })
        .min();
    Diagnosed::new(first, warnings)
}

/// Format a date the way extracts write them
pub fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}
