use crate::error::{SchemaError, Warning};
use crate::records::{NormalizedTable, TeamRecord};
use crate::schema::{self, ColumnMap, Field, ReportKind};
use crate::table::{Cell, RawTable};

/// Parse a loosely formatted number: everything except digits, `.` and `-` is
/// dropped first, so `"1,234"`, `"62.5%"` and `"\u{202f}48 "` all read.
pub fn parse_number(raw: &str) -> Option<f64> {
    let cleaned: String = raw
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.' || *c == '-')
        .collect();
    if cleaned.is_empty() || cleaned == "-" || cleaned == "." {
        return None;
    }
    cleaned.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// How a single cell read as a number.
#[derive(Debug, Clone, PartialEq)]
pub enum CellNumber {
    Missing,
    Value(f64),
    /// The cell had content but no number could be read from it.
    Invalid(String),
}

pub fn cell_number(cell: &Cell) -> CellNumber {
    match cell {
        Cell::Empty => CellNumber::Missing,
        Cell::Number(v) if v.is_finite() => CellNumber::Value(*v),
        Cell::Number(v) => CellNumber::Invalid(v.to_string()),
        Cell::Text(s) if s.trim().is_empty() => CellNumber::Missing,
        Cell::Text(s) => match parse_number(s) {
            Some(v) => CellNumber::Value(v),
            None => CellNumber::Invalid(s.trim().to_string()),
        },
    }
}

/// A parsed column. `invalid` lists (position, raw text) for cells that had
/// content but failed to parse; those positions are `None` in `values`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NumericColumn {
    pub values: Vec<Option<f64>>,
    pub invalid: Vec<(usize, String)>,
    pub rescaled: bool,
}

impl NumericColumn {
    pub fn is_all_missing(&self) -> bool {
        self.values.iter().all(|v| v.is_none())
    }
}

pub fn normalize_numeric<'a>(cells: impl IntoIterator<Item = &'a Cell>) -> NumericColumn {
    let mut out = NumericColumn::default();
    for (idx, cell) in cells.into_iter().enumerate() {
        match cell_number(cell) {
            CellNumber::Missing => out.values.push(None),
            CellNumber::Value(v) => out.values.push(Some(v)),
            CellNumber::Invalid(raw) => {
                out.values.push(None);
                out.invalid.push((idx, raw));
            }
        }
    }
    out
}

/// Like [`normalize_numeric`], then put fractional columns on the 0–100 scale.
pub fn normalize_percent<'a>(cells: impl IntoIterator<Item = &'a Cell>) -> NumericColumn {
    let mut out = normalize_numeric(cells);
    out.rescaled = rescale_fraction_column(&mut out.values);
    out
}

/// If the largest present value is at most 1 the whole column is a fraction
/// and is multiplied by 100. Returns whether it rescaled. The decision is
/// made once per column, never per cell.
pub fn rescale_fraction_column(values: &mut [Option<f64>]) -> bool {
    let max = values
        .iter()
        .flatten()
        .copied()
        .fold(None, |acc: Option<f64>, v| Some(acc.map_or(v, |a| a.max(v))));
    match max {
        Some(max) if max <= 1.0 => {
            for v in values.iter_mut().flatten() {
                *v *= 100.0;
            }
            true
        }
        _ => false,
    }
}

/// Resolve the headers of a team-level report and turn every row into a
/// [`TeamRecord`]. Rows without a team name are skipped with a warning.
pub fn normalize_report(raw: &RawTable, kind: ReportKind) -> Result<NormalizedTable, SchemaError> {
    let map = schema::resolve(kind, &raw.headers)?;
    Ok(normalize_with_map(raw, &map))
}

pub fn normalize_with_map(raw: &RawTable, map: &ColumnMap) -> NormalizedTable {
    let mut warnings = Vec::new();
    let team_col = map.index(Field::Team);
    let id_col = map.index(Field::TeamId);

    let mut kept: Vec<usize> = Vec::with_capacity(raw.len());
    let mut records: Vec<TeamRecord> = Vec::with_capacity(raw.len());
    for row in 0..raw.len() {
        let team = team_col.and_then(|col| raw.cell(row, col).as_text());
        let Some(team) = team else {
            warnings.push(Warning::MissingTeam { row });
            continue;
        };
        let mut rec = TeamRecord::new(team);
        rec.team_id = id_col.and_then(|col| raw.cell(row, col).as_text());
        kept.push(row);
        records.push(rec);
    }

    let metrics = map.metrics();
    for metric in &metrics {
        let Some(col) = map.index(Field::Metric(*metric)) else {
            continue;
        };
        let cells = kept.iter().map(|row| raw.cell(*row, col));
        let column = if metric.is_percent() {
            normalize_percent(cells)
        } else {
            normalize_numeric(cells)
        };
        if column.rescaled {
            tracing::debug!(report = %map.report, metric = %metric, "fractional column rescaled to percent");
        }
        for (pos, raw_text) in &column.invalid {
            warnings.push(Warning::Parse {
                row: kept[*pos],
                column: map.headers[col].clone(),
                raw: raw_text.clone(),
            });
        }
        for (rec, value) in records.iter_mut().zip(column.values) {
            rec.set(*metric, value);
        }
    }

    let parse_failures = warnings
        .iter()
        .filter(|w| matches!(w, Warning::Parse { .. }))
        .count();
    if parse_failures > 0 {
        tracing::info!(
            report = %map.report,
            cells = parse_failures,
            "cells could not be read as numbers and are treated as missing"
        );
    }

    NormalizedTable {
        report: map.report,
        records,
        metrics,
        warnings,
    }
}
