//! Unified subject-indexed table
//!
//! Rows are keyed by subject id (`eid`); cells hold the raw text of the
//! extract, `None` when missing. Tables are built from extract CSV files,
//! combined with [`UnifiedTable::inner_join`] and written back as CSV.

use crate::column::{self, field_of};
use crate::dictionary::{FieldDictionary, TypedValue, ValueKind};
use crate::{Error, Result};
use csv::{ByteRecord, ReaderBuilder, WriterBuilder};
use std::collections::HashMap;
use std::path::Path;

/// Subject identifier, the `eid` column of every extract
pub type SubjectId = String;

/// Name of the subject id column
pub const SUBJECT_COLUMN: &str = "eid";

/// Subject-indexed table of raw cell values
#[derive(Debug, Clone, PartialEq)]
pub struct UnifiedTable {
    label: String,
    columns: Vec<String>,
    /// Column name -> position in `columns`
    positions: HashMap<String, usize>,
    subjects: Vec<SubjectId>,
    rows: Vec<Vec<Option<String>>>,
    index: HashMap<SubjectId, usize>,
}

/// Borrowed view of one subject's row
#[derive(Debug, Clone, Copy)]
pub struct RowView<'a> {
    table: &'a UnifiedTable,
    row: usize,
}

impl<'a> RowView<'a> {
    pub fn subject(&self) -> &'a str {
        &self.table.subjects[self.row]
    }

    /// Position of the row in the table
    pub fn index(&self) -> usize {
        self.row
    }

    /// Cell of the named column, `None` when missing or unknown
    pub fn get(&self, column: &str) -> Option<&'a str> {
        let col = self.table.column_index(column)?;
        self.table.cell(self.row, col)
    }

    /// Cell at a column position, `None` when missing or out of range
    pub fn at(&self, col: usize) -> Option<&'a str> {
        self.table.cell(self.row, col)
    }

    /// `(column, value)` pairs in column order
    pub fn cells(&self) -> impl Iterator<Item = (&'a str, Option<&'a str>)> + 'a {
        let table = self.table;
        let row = self.row;
        table
            .columns
            .iter()
            .enumerate()
            .map(move |(col, name)| (name.as_str(), table.cell(row, col)))
    }
}

/// Cells the extracts use for "no value": the pandas default NA tokens
pub fn is_missing(raw: &str) -> bool {
    matches!(
        raw.trim(),
        "" | "NA"
            | "N/A"
            | "n/a"
            | "#N/A"
            | "#N/A N/A"
            | "#NA"
            | "<NA>"
            | "NaN"
            | "-NaN"
            | "nan"
            | "-nan"
            | "1.#IND"
            | "-1.#IND"
            | "1.#QNAN"
            | "-1.#QNAN"
            | "NULL"
            | "null"
            | "None"
    )
}

fn index_columns(columns: &[String]) -> HashMap<String, usize> {
    let mut positions = HashMap::with_capacity(columns.len());
    for (i, name) in columns.iter().enumerate() {
        positions.entry(name.clone()).or_insert(i);
    }
    positions
}

/// Extract files are Latin-1: every byte is one code point
fn latin1(bytes: &[u8]) -> String {
    bytes.iter().map(|&b| b as char).collect()
}

impl UnifiedTable {
    /// Empty table; `label` names the source in error messages
    pub fn new(label: impl Into<String>, columns: Vec<String>) -> Self {
        Self {
            label: label.into(),
            positions: index_columns(&columns),
            columns,
            subjects: Vec::new(),
            rows: Vec::new(),
            index: HashMap::new(),
        }
    }

    /// Append a subject's row; a subject may appear only once
    pub fn push_row(&mut self, subject: SubjectId, cells: Vec<Option<String>>) -> Result<()> {
        if cells.len() != self.columns.len() {
            return Err(Error::InvalidInput(format!(
                "Row for subject {} has {} cells, table {} has {} columns",
                subject,
                cells.len(),
                self.label,
                self.columns.len()
            )));
        }
        if self.index.contains_key(&subject) {
            return Err(Error::DuplicateSubject {
                subject,
                source_name: self.label.clone(),
            });
        }
        self.index.insert(subject.clone(), self.rows.len());
        self.subjects.push(subject);
        self.rows.push(cells);
        Ok(())
    }

    /// Same table under another source label
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn subjects(&self) -> &[SubjectId] {
        &self.subjects
    }

    pub fn len(&self) -> usize {
        self.subjects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subjects.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.positions.get(name).copied()
    }

    /// Raw value at (row, column), `None` when missing
    pub fn cell(&self, row: usize, col: usize) -> Option<&str> {
        self.rows
            .get(row)
            .and_then(|r| r.get(col))
            .and_then(|c| c.as_deref())
    }

    pub fn row(&self, subject: &str) -> Option<RowView<'_>> {
        self.index
            .get(subject)
            .map(|&row| RowView { table: self, row })
    }

    pub fn rows(&self) -> impl Iterator<Item = RowView<'_>> {
        (0..self.len()).map(move |row| RowView { table: self, row })
    }

    /// Columns belonging to one field, in table order
    pub fn field_columns(&self, field_id: &str) -> Vec<&str> {
        column::matches_fields(&self.columns, &[field_id])
    }

    /// Positions of the columns belonging to any of the fields, in table order
    pub fn field_positions(&self, field_ids: &[&str]) -> Vec<usize> {
        self.columns
            .iter()
            .enumerate()
            .filter(|(_, c)| field_ids.contains(&field_of(c)))
            .map(|(i, _)| i)
            .collect()
    }

    /// Typed value of a cell, consulting the field dictionary
    ///
    /// Returns `None` when the cell cannot be parsed as its declared kind.
    pub fn typed_value(
        &self,
        row: usize,
        col: usize,
        dictionary: &FieldDictionary,
    ) -> Option<TypedValue> {
        let kind = self
            .columns
            .get(col)
            .and_then(|name| dictionary.kind_of_column(name))
            .unwrap_or(ValueKind::Text);
        kind.parse(self.cell(row, col))
    }

    /// Keep only the named columns, in the given order; unknown names are skipped
    pub fn select_columns(&self, names: &[&str]) -> UnifiedTable {
        let picks: Vec<usize> = names.iter().filter_map(|n| self.column_index(n)).collect();
        let columns: Vec<String> = picks.iter().map(|&c| self.columns[c].clone()).collect();
        UnifiedTable {
            label: self.label.clone(),
            positions: index_columns(&columns),
            columns,
            subjects: self.subjects.clone(),
            rows: self
                .rows
                .iter()
                .map(|r| picks.iter().map(|&c| r[c].clone()).collect())
                .collect(),
            index: self.index.clone(),
        }
    }

    /// Keep only the columns of the given fields
    pub fn select_fields(&self, field_ids: &[&str]) -> UnifiedTable {
        let names: Vec<String> = column::matches_fields(&self.columns, field_ids)
            .into_iter()
            .map(str::to_string)
            .collect();
        let refs: Vec<&str> = names.iter().map(String::as_str).collect();
        self.select_columns(&refs)
    }

    /// Drop every column for which `keep` returns false
    pub fn retain_columns(&mut self, mut keep: impl FnMut(&str) -> bool) {
        let flags: Vec<bool> = self.columns.iter().map(|c| keep(c.as_str())).collect();
        let mut it = flags.iter();
        self.columns.retain(|_| *it.next().unwrap_or(&false));
        for row in &mut self.rows {
            let mut it = flags.iter();
            row.retain(|_| *it.next().unwrap_or(&false));
        }
        self.positions = index_columns(&self.columns);
    }

    /// Keep only the listed subjects, preserving table order
    pub fn retain_subjects(&self, subjects: &[SubjectId]) -> UnifiedTable {
        let wanted: std::collections::HashSet<&str> =
            subjects.iter().map(String::as_str).collect();
        let mut out = UnifiedTable::new(self.label.clone(), self.columns.clone());
        for (subject, row) in self.subjects.iter().zip(&self.rows) {
            if wanted.contains(subject.as_str()) {
                out.index.insert(subject.clone(), out.rows.len());
                out.subjects.push(subject.clone());
                out.rows.push(row.clone());
            }
        }
        out
    }

    /// Rename a column; the new name must not already exist
    pub fn rename_column(&mut self, from: &str, to: &str) -> Result<()> {
        if from == to {
            return Ok(());
        }
        if self.column_index(to).is_some() {
            return Err(Error::ColumnCollision(to.to_string()));
        }
        let col = self
            .column_index(from)
            .ok_or_else(|| Error::InvalidInput(format!("Unknown column '{}'", from)))?;
        self.columns[col] = to.to_string();
        self.positions.remove(from);
        self.positions.insert(to.to_string(), col);
        Ok(())
    }

    /// Inner join on subject id
    ///
    /// Rows keep the order of `self`. Column names must be disjoint.
    pub fn inner_join(self, other: UnifiedTable) -> Result<UnifiedTable> {
        if let Some(dup) = other.columns.iter().find(|c| self.positions.contains_key(*c)) {
            return Err(Error::ColumnCollision(dup.clone()));
        }

        let mut columns = self.columns;
        columns.extend(other.columns);
        let label = format!("{} + {}", self.label, other.label);
        let mut joined = UnifiedTable::new(label, columns);

        let other_index = other.index;
        let mut other_rows: Vec<Option<Vec<Option<String>>>> =
            other.rows.into_iter().map(Some).collect();

        for (subject, mut row) in self.subjects.into_iter().zip(self.rows) {
            let Some(&j) = other_index.get(&subject) else {
                continue;
            };
            if let Some(right) = other_rows[j].take() {
                row.extend(right);
                joined.push_row(subject, row)?;
            }
        }
        Ok(joined)
    }

    /// Read only the header row of a CSV extract
    pub fn read_header(path: &Path) -> Result<Vec<String>> {
        let mut reader = open_reader(path)?;
        let header = reader.byte_headers()?;
        if header.is_empty() {
            return Err(Error::EmptyTable(path.to_path_buf()));
        }
        Ok(header.iter().map(latin1).collect())
    }

    /// Load a CSV extract
    ///
    /// The subject column is `eid`, or the first column when no column has
    /// that name. With `fields`, only the subject column and the columns of
    /// those fields are kept; other columns are never materialized.
    pub fn read_csv(path: &Path, fields: Option<&[&str]>) -> Result<UnifiedTable> {
        let mut reader = open_reader(path)?;
        let header: Vec<String> = reader.byte_headers()?.iter().map(latin1).collect();
        if header.is_empty() {
            return Err(Error::EmptyTable(path.to_path_buf()));
        }

        let subject_col = header
            .iter()
            .position(|c| c == SUBJECT_COLUMN)
            .unwrap_or(0);
        let picks: Vec<usize> = header
            .iter()
            .enumerate()
            .filter(|&(i, name)| {
                i != subject_col && fields.map_or(true, |f| f.contains(&field_of(name)))
            })
            .map(|(i, _)| i)
            .collect();

        let columns: Vec<String> = picks.iter().map(|&i| header[i].clone()).collect();
        let mut seen = std::collections::HashSet::with_capacity(columns.len());
        for name in &columns {
            if !seen.insert(name.as_str()) {
                return Err(Error::ColumnCollision(name.clone()));
            }
        }
        let mut table = UnifiedTable::new(path.display().to_string(), columns);

        let mut record = ByteRecord::new();
        while reader.read_byte_record(&mut record)? {
            let subject = record
                .get(subject_col)
                .map(|b| latin1(b).trim().to_string())
                .unwrap_or_default();
            if subject.is_empty() {
                tracing::warn!("Skipping row without subject id in {}", path.display());
                continue;
            }
            let cells = picks
                .iter()
                .map(|&i| {
                    record
                        .get(i)
                        .map(latin1)
                        .filter(|raw| !is_missing(raw))
                })
                .collect();
            table.push_row(subject, cells)?;
        }

        tracing::debug!(
            "Loaded {} subjects x {} columns from {}",
            table.len(),
            table.columns.len(),
            path.display()
        );
        Ok(table)
    }

    /// Write as CSV with the subject column first
    pub fn write_csv(&self, path: &Path) -> Result<()> {
        let mut writer = WriterBuilder::new().from_path(path)?;
        writer.write_field(SUBJECT_COLUMN)?;
        for c in &self.columns {
            writer.write_field(c)?;
        }
        writer.write_record(None::<&[u8]>)?;

        for (subject, row) in self.subjects.iter().zip(&self.rows) {
            writer.write_field(subject)?;
            for cell in row {
                writer.write_field(cell.as_deref().unwrap_or(""))?;
            }
            writer.write_record(None::<&[u8]>)?;
        }
        writer.flush().map_err(|e| Error::file(path, e))?;
        Ok(())
    }
}

fn open_reader(path: &Path) -> Result<csv::Reader<std::fs::File>> {
    if !path.exists() {
        return Err(Error::NotFound(path.to_path_buf()));
    }
    let file = std::fs::File::open(path).map_err(|e| Error::file(path, e))?;
    Ok(ReaderBuilder::new().has_headers(true).from_reader(file))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn table(label: &str, columns: &[&str], rows: &[(&str, Vec<Option<&str>>)]) -> UnifiedTable {
        let mut t = UnifiedTable::new(label, columns.iter().map(|c| c.to_string()).collect());
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
    fn test_duplicate_subject_rejected() {
        let mut t = table("a", &["1-0.0"], &[("1", vec![Some("x")])]);
        let err = t.push_row("1".to_string(), vec![None]).unwrap_err();
        assert!(matches!(err, Error::DuplicateSubject { .. }));
    }

    #[test]
    fn test_inner_join_keeps_shared_subjects() {
        let left = table(
            "left",
            &["1-0.0"],
            &[("1", vec![Some("a")]), ("2", vec![Some("b")]), ("3", vec![Some("c")])],
        );
        let right = table(
            "right",
            &["2-0.0"],
            &[("4", vec![Some("w")]), ("3", vec![Some("z")]), ("2", vec![None])],
        );
        let joined = left.inner_join(right).unwrap();
        assert_eq!(joined.subjects(), &["2".to_string(), "3".to_string()]);
        assert_eq!(joined.columns(), &["1-0.0".to_string(), "2-0.0".to_string()]);
        let row = joined.row("3").unwrap();
        assert_eq!(row.get("1-0.0"), Some("c"));
        assert_eq!(row.get("2-0.0"), Some("z"));
        assert_eq!(joined.row("2").unwrap().get("2-0.0"), None);
    }

    #[test]
    fn test_inner_join_column_collision() {
        let left = table("left", &["1-0.0"], &[("1", vec![Some("a")])]);
        let right = table("right", &["1-0.0"], &[("1", vec![Some("b")])]);
        match left.inner_join(right) {
            Err(Error::ColumnCollision(c)) => assert_eq!(c, "1-0.0"),
            other => panic!("Expected ColumnCollision, got {:?}", other),
        }
    }

    #[test]
    fn test_read_csv_projects_fields() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("ukb1.csv");
        fs::write(
            &path,
            "eid,31-0.0,21000-0.0,21000-1.0,22009-0.1\n1,0,1001,,0.5\n2,1,NA,1002,-1.5\n",
        )
        .unwrap();

        let t = UnifiedTable::read_csv(&path, Some(&["21000"][..])).unwrap();
        assert_eq!(t.columns(), &["21000-0.0".to_string(), "21000-1.0".to_string()]);
        assert_eq!(t.len(), 2);
        assert_eq!(t.row("1").unwrap().get("21000-1.0"), None);
        assert_eq!(t.row("2").unwrap().get("21000-0.0"), None);
        assert_eq!(t.row("2").unwrap().get("21000-1.0"), Some("1002"));
    }

    #[test]
    fn test_read_csv_implicit_subject_column() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("data.csv");
        fs::write(&path, "id,31-0.0\n7,1\n8,0\n").unwrap();

        let t = UnifiedTable::read_csv(&path, None).unwrap();
        assert_eq!(t.subjects(), &["7".to_string(), "8".to_string()]);
        assert_eq!(t.columns(), &["31-0.0".to_string()]);
    }

    #[test]
    fn test_read_csv_latin1_bytes() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("latin.csv");
        fs::write(&path, b"eid,20001-0.0\n1,caf\xe9\n").unwrap();

        let t = UnifiedTable::read_csv(&path, None).unwrap();
        assert_eq!(t.row("1").unwrap().get("20001-0.0"), Some("caf\u{e9}"));
    }

    #[test]
    fn test_write_then_read_preserves_cells() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out.csv");
        let t = table(
            "t",
            &["21000-0.0", "22009-0.1"],
            &[("1", vec![Some("1001"), None]), ("2", vec![None, Some("3.25")])],
        );
        t.write_csv(&path).unwrap();

        let text = fs::read_to_string(&path).unwrap();
        assert!(text.starts_with("eid,21000-0.0,22009-0.1\n"));
        let back = UnifiedTable::read_csv(&path, None).unwrap();
        assert_eq!(back.row("2").unwrap().get("22009-0.1"), Some("3.25"));
        assert_eq!(back.row("1").unwrap().get("22009-0.1"), None);
    }

    #[test]
    fn test_retain_columns_and_rename() {
        let mut t = table(
            "t",
            &["21000-0.0", "21000-1.0", "31-0.0"],
            &[("1", vec![Some("a"), Some("b"), Some("c")])],
        );
        t.retain_columns(|c| c != "21000-1.0");
        assert_eq!(t.columns(), &["21000-0.0".to_string(), "31-0.0".to_string()]);
        assert_eq!(t.row("1").unwrap().get("31-0.0"), Some("c"));

        t.rename_column("31-0.0", "sex").unwrap();
        assert!(t.rename_column("21000-0.0", "sex").is_err());
        assert_eq!(t.row("1").unwrap().get("sex"), Some("c"));
    }

    #[test]
    fn test_column_lookup_follows_projection_and_rename() {
        let t = table(
            "t",
            &["21000-0.0", "21000-1.0", "22009-0.1", "31-0.0"],
            &[("1", vec![Some("a"), Some("b"), Some("c"), Some("d")])],
        );
        let mut picked = t.select_columns(&["31-0.0", "22009-0.1"]);
        assert_eq!(picked.column_index("31-0.0"), Some(0));
        assert_eq!(picked.column_index("21000-0.0"), None);
        assert_eq!(picked.row("1").unwrap().get("22009-0.1"), Some("c"));

        picked.rename_column("22009-0.1", "pc_1").unwrap();
        assert_eq!(picked.row("1").unwrap().get("pc_1"), Some("c"));
        assert_eq!(picked.row("1").unwrap().get("22009-0.1"), None);
        picked.retain_columns(|c| c != "31-0.0");
        assert_eq!(picked.column_index("pc_1"), Some(0));
        assert_eq!(picked.row("1").unwrap().at(0), Some("c"));
        assert_eq!(picked.row("1").unwrap().get("31-0.0"), None);
        assert_eq!(t.field_positions(&["21000", "31"]), vec![0, 1, 3]);
    }

    #[test]
    fn test_pandas_missing_tokens() {
        for token in ["", " NA ", "NULL", "null", "N/A", "n/a", "#N/A", "<NA>", "None", "-nan"] {
            assert!(is_missing(token), "{:?}", token);
        }
        for value in ["0", "none", "Na", "1001"] {
            assert!(!is_missing(value), "{:?}", value);
        }

        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nulls.csv");
        fs::write(&path, "eid,21000-0.0,21000-1.0\n1,1001,NULL\n2,<NA>,1001\n").unwrap();
        let t = UnifiedTable::read_csv(&path, None).unwrap();
        assert_eq!(t.row("1").unwrap().get("21000-1.0"), None);
        assert_eq!(t.row("2").unwrap().get("21000-0.0"), None);
        assert_eq!(t.row("2").unwrap().get("21000-1.0"), Some("1001"));
    }

    #[test]
    fn test_read_csv_duplicate_header() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("dup.csv");
        fs::write(&path, "eid,31-0.0,31-0.0\n1,0,1\n").unwrap();
        assert!(matches!(
            UnifiedTable::read_csv(&path, None),
            Err(Error::ColumnCollision(_))
        ));
    }

    #[test]
    fn test_read_missing_file() {
        let err = UnifiedTable::read_csv(Path::new("/nonexistent/ukb.csv"), None).unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }
}
