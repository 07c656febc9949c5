//! Reading and writing database tables as CSV.
//!
//! The first column of every file is the row name. Empty cells mean the row
//! has no value for that column, so a table survives a write and a read with
//! the same set of values.

use crate::error::{FormatError, IoResultExt};
use crate::model::DatabaseTable;
use std::fs;
use std::path::Path;

/// The contents of one CSV file before it is turned into a table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsvFile {
    pub headers: Vec<String>,
    pub records: Vec<Vec<String>>,
}

impl CsvFile {
    fn primary(&self) -> Option<&str> {
        self.headers.first().map(String::as_str)
    }

    /// Rows as (name, non-empty values by column).
    fn rows(&self) -> impl Iterator<Item = (&str, Vec<(&str, &str)>)> + '_ {
        self.records.iter().filter_map(move |record| {
            let name = record.first()?.as_str();
            let values = self
                .headers
                .iter()
                .zip(record.iter())
                .skip(1)
                .filter(|(_, value)| !value.is_empty())
                .map(|(header, value)| (header.as_str(), value.as_str()))
                .collect();
            Some((name, values))
        })
    }
}

pub fn read_csv(path: &Path) -> Result<CsvFile, FormatError> {
    let text = fs::read_to_string(path).at_path(path)?;
    parse_csv(text.trim_start_matches('\u{feff}'))
        .map_err(|e| FormatError::ParseError(format!("{}: {e}", path.display())))
}

fn parse_csv(text: &str) -> Result<CsvFile, csv::Error> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_reader(text.as_bytes());
    let headers = reader
        .headers()?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();
    let mut records = Vec::new();
    for record in reader.records() {
        let record = record?;
        if record.iter().all(str::is_empty) {
            continue;
        }
        records.push(record.iter().map(str::to_string).collect());
    }
    Ok(CsvFile { headers, records })
}

/// Build one table from the plain file and its `_all` superset.
///
/// Columns come from `_all` first, then any the plain file adds. Rows are keyed
/// by name: `_all` rows in order, then rows only the plain file has. A value
/// the `_all` file lacks is taken from the plain file.
pub fn merge_tables(name: &str, plain: Option<&CsvFile>, all: Option<&CsvFile>) -> DatabaseTable {
    let primary = all
        .and_then(CsvFile::primary)
        .or_else(|| plain.and_then(CsvFile::primary))
        .unwrap_or("Name");
    let mut table = DatabaseTable::new(name, primary);
    for file in [all, plain].into_iter().flatten() {
        for header in file.headers.iter().skip(1) {
            table.add_column(header);
        }
    }

    let plain_rows: Vec<(&str, Vec<(&str, &str)>)> =
        plain.map(|f| f.rows().collect()).unwrap_or_default();
    let mut used = vec![false; plain_rows.len()];

    for (row_name, mut values) in all.into_iter().flat_map(CsvFile::rows) {
        if let Some(index) = plain_rows
            .iter()
            .enumerate()
            .position(|(i, (n, _))| !used[i] && *n == row_name)
        {
            used[index] = true;
            for &(column, value) in &plain_rows[index].1 {
                if !values.iter().any(|(c, _)| *c == column) {
                    values.push((column, value));
                }
            }
        }
        table.push_row(row_name, values);
    }
    for (index, (row_name, values)) in plain_rows.iter().enumerate() {
        if !used[index] {
            table.push_row(*row_name, values.iter().copied());
        }
    }
    table
}

/// Write a table with header = column order, primary column first.
pub fn write_table(path: &Path, table: &DatabaseTable) -> Result<(), FormatError> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer
        .write_record(table.columns())
        .map_err(|e| FormatError::SerializationError(e.to_string()))?;
    for row in table.rows() {
        let record: Vec<&str> = table
            .columns()
            .iter()
            .map(|column| row.values.get(column).map(String::as_str).unwrap_or(""))
            .collect();
        writer
            .write_record(&record)
            .map_err(|e| FormatError::SerializationError(e.to_string()))?;
    }
    let bytes = writer
        .into_inner()
        .map_err(|e| FormatError::SerializationError(e.to_string()))?;
    fs::write(path, bytes).at_path(path)
}
