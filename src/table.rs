use std::io::Read;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// One cell of a spreadsheet export as it arrives from the source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Cell {
    Empty,
    Number(f64),
    Text(String),
}

impl Cell {
    pub fn is_empty(&self) -> bool {
        match self {
            Cell::Empty => true,
            Cell::Number(_) => false,
            Cell::Text(s) => s.trim().is_empty(),
        }
    }

    /// Text form of the cell, trimmed. Numbers use their shortest float form.
    pub fn as_text(&self) -> Option<String> {
        match self {
            Cell::Empty => None,
            Cell::Number(v) => Some(v.to_string()),
            Cell::Text(s) => {
                let t = s.trim();
                if t.is_empty() {
                    None
                } else {
                    Some(t.to_string())
                }
            }
        }
    }
}

impl From<&str> for Cell {
    fn from(value: &str) -> Self {
        if value.is_empty() {
            Cell::Empty
        } else {
            Cell::Text(value.to_string())
        }
    }
}

impl From<String> for Cell {
    fn from(value: String) -> Self {
        Cell::from(value.as_str())
    }
}

impl From<f64> for Cell {
    fn from(value: f64) -> Self {
        Cell::Number(value)
    }
}

/// An export exactly as loaded: ordered headers and rows aligned to them.
/// Short rows read as empty cells past their end.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<Cell>>,
}

impl RawTable {
    pub fn new(headers: Vec<String>, rows: Vec<Vec<Cell>>) -> Self {
        Self { headers, rows }
    }

    /// Convenience for fixtures and tests: every cell given as text.
    pub fn from_text_rows(headers: &[&str], rows: &[&[&str]]) -> Self {
        Self {
            headers: headers.iter().map(|h| h.to_string()).collect(),
            rows: rows
                .iter()
                .map(|row| row.iter().map(|c| Cell::from(*c)).collect())
                .collect(),
        }
    }

    pub fn from_csv_reader<R: Read>(rdr: R) -> Result<Self> {
        let mut reader = csv::ReaderBuilder::new()
            .flexible(true)
            .trim(csv::Trim::None)
            .from_reader(rdr);
        let headers = reader
            .headers()
            .context("read csv header row")?
            .iter()
            .map(|h| h.to_string())
            .collect();
        let mut rows = Vec::new();
        for (idx, record) in reader.records().enumerate() {
            let record = record.with_context(|| format!("read csv row {}", idx + 1))?;
            rows.push(record.iter().map(Cell::from).collect());
        }
        Ok(Self { headers, rows })
    }

    pub fn from_csv_str(raw: &str) -> Result<Self> {
        Self::from_csv_reader(raw.as_bytes())
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn cell(&self, row: usize, col: usize) -> &Cell {
        static EMPTY: Cell = Cell::Empty;
        self.rows
            .get(row)
            .and_then(|r| r.get(col))
            .unwrap_or(&EMPTY)
    }

    pub fn column(&self, col: usize) -> Vec<&Cell> {
        (0..self.rows.len()).map(|row| self.cell(row, col)).collect()
    }

    /// Rows for which `keep` returns true, headers unchanged.
    pub fn filter_rows(&self, mut keep: impl FnMut(&[Cell]) -> bool) -> RawTable {
        RawTable {
            headers: self.headers.clone(),
            rows: self.rows.iter().filter(|r| keep(r)).cloned().collect(),
        }
    }

    pub fn to_output(&self) -> OutputTable {
        let rows = self
            .rows
            .iter()
            .map(|row| {
                (0..self.headers.len())
                    .map(|col| match row.get(col) {
                        None | Some(Cell::Empty) => Value::Missing,
                        Some(Cell::Number(v)) => Value::Float(*v),
                        Some(Cell::Text(s)) => Value::Text(s.clone()),
                    })
                    .collect()
            })
            .collect();
        OutputTable {
            columns: self.headers.clone(),
            rows,
        }
    }
}

/// A value in a result table.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    Missing,
    Int(i64),
    Float(f64),
    Text(String),
}

impl Value {
    /// CSV cell text: `.` decimal separator, no grouping, empty for missing.
    pub fn to_csv_field(&self) -> String {
        match self {
            Value::Missing => String::new(),
            Value::Int(v) => v.to_string(),
            Value::Float(v) if v.is_finite() => v.to_string(),
            Value::Float(_) => String::new(),
            Value::Text(s) => s.clone(),
        }
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Float(value)
    }
}

impl From<Option<f64>> for Value {
    fn from(value: Option<f64>) -> Self {
        value.map(Value::Float).unwrap_or(Value::Missing)
    }
}

impl From<u32> for Value {
    fn from(value: u32) -> Self {
        Value::Int(i64::from(value))
    }
}

impl From<Option<u32>> for Value {
    fn from(value: Option<u32>) -> Self {
        value.map(Value::from).unwrap_or(Value::Missing)
    }
}

impl From<usize> for Value {
    fn from(value: usize) -> Self {
        Value::Int(value as i64)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Text(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Text(value)
    }
}

impl From<Option<String>> for Value {
    fn from(value: Option<String>) -> Self {
        value.map(Value::Text).unwrap_or(Value::Missing)
    }
}

/// A result table: ordered rows of named fields, ready to render or export.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct OutputTable {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Value>>,
}

impl OutputTable {
    pub fn new(columns: &[&str]) -> Self {
        Self {
            columns: columns.iter().map(|c| c.to_string()).collect(),
            rows: Vec::new(),
        }
    }

    pub fn push(&mut self, row: Vec<Value>) {
        debug_assert_eq!(row.len(), self.columns.len());
        self.rows.push(row);
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn get(&self, row: usize, column: &str) -> Option<&Value> {
        let col = self.column_index(column)?;
        self.rows.get(row).and_then(|r| r.get(col))
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Anything that renders as a result table.
pub trait Tabular {
    fn to_table(&self) -> OutputTable;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn csv_reader_keeps_short_rows_and_blank_cells() {
        let raw = "Team,PF,Win%\nAlpha,1200,0.5\nBravo,,\nCharlie\n";
        let table = RawTable::from_csv_str(raw).expect("csv should parse");
        assert_eq!(table.headers, vec!["Team", "PF", "Win%"]);
        assert_eq!(table.len(), 3);
        assert_eq!(table.cell(1, 1), &Cell::Empty);
        assert_eq!(table.cell(2, 2), &Cell::Empty);
        assert_eq!(table.cell(0, 0).as_text().as_deref(), Some("Alpha"));
    }

    #[test]
    fn csv_field_uses_plain_decimal_form() {
        assert_eq!(Value::Float(1234.5).to_csv_field(), "1234.5");
        assert_eq!(Value::Float(f64::NAN).to_csv_field(), "");
        assert_eq!(Value::Missing.to_csv_field(), "");
        assert_eq!(Value::Int(7).to_csv_field(), "7");
    }
}
