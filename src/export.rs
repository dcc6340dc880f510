use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use rust_xlsxwriter::{Workbook, Worksheet};
use serde_json::{Map, Value as JsonValue};

use crate::table::{OutputTable, Value};

/// Write `table` as CSV: canonical column names as the header, `.` decimals,
/// empty fields for missing values.
pub fn write_csv<W: Write>(table: &OutputTable, out: W) -> Result<()> {
    let mut writer = csv::Writer::from_writer(out);
    writer
        .write_record(&table.columns)
        .context("write csv header")?;
    for (idx, row) in table.rows.iter().enumerate() {
        writer
            .write_record(row.iter().map(Value::to_csv_field))
            .with_context(|| format!("write csv row {idx}"))?;
    }
    writer.flush().context("flush csv writer")?;
    Ok(())
}

pub fn to_csv_string(table: &OutputTable) -> Result<String> {
    let mut buf = Vec::new();
    write_csv(table, &mut buf)?;
    String::from_utf8(buf).context("csv output is not utf-8")
}

/// Rows as JSON objects keyed by column name.
pub fn to_json_records(table: &OutputTable) -> JsonValue {
    let rows = table
        .rows
        .iter()
        .map(|row| {
            let mut obj = Map::new();
            for (col, value) in table.columns.iter().zip(row) {
                let v = serde_json::to_value(value).unwrap_or(JsonValue::Null);
                obj.insert(col.clone(), v);
            }
            JsonValue::Object(obj)
        })
        .collect();
    JsonValue::Array(rows)
}

/// Write each table to `<dir>/<name>.csv`. Returns the written paths.
pub fn write_csv_dir(dir: &Path, tables: &[(&str, OutputTable)]) -> Result<Vec<PathBuf>> {
    fs::create_dir_all(dir).with_context(|| format!("create {}", dir.display()))?;
    let mut written = Vec::with_capacity(tables.len());
    for (name, table) in tables {
        let path = dir.join(format!("{name}.csv"));
        let file = fs::File::create(&path).with_context(|| format!("create {}", path.display()))?;
        write_csv(table, file).with_context(|| format!("write {}", path.display()))?;
        written.push(path);
    }
    Ok(written)
}

/// One worksheet per table, named after it.
pub fn write_workbook(path: &Path, tables: &[(&str, OutputTable)]) -> Result<()> {
    let mut workbook = Workbook::new();
    for (name, table) in tables {
        let sheet = workbook.add_worksheet();
        sheet
            .set_name(sheet_name(name))
            .with_context(|| format!("name worksheet {name}"))?;
        write_rows(sheet, table)?;
    }
    workbook
        .save(path)
        .with_context(|| format!("failed writing workbook to {}", path.display()))?;
    Ok(())
}

/// Excel caps sheet names at 31 characters and forbids a few symbols.
fn sheet_name(name: &str) -> String {
    name.chars()
        .map(|c| match c {
            '[' | ']' | ':' | '*' | '?' | '/' | '\\' => '_',
            other => other,
        })
        .take(31)
        .collect()
}

fn write_rows(worksheet: &mut Worksheet, table: &OutputTable) -> Result<()> {
    for (col_idx, header) in table.columns.iter().enumerate() {
        worksheet
            .write_string(0, col_idx as u16, header)
            .with_context(|| format!("write header cell {col_idx}"))?;
    }
    for (row_idx, row) in table.rows.iter().enumerate() {
        let r = row_idx as u32 + 1;
        for (col_idx, value) in row.iter().enumerate() {
            let c = col_idx as u16;
            let res = match value {
                Value::Missing => continue,
                Value::Int(v) => worksheet.write_number(r, c, *v as f64).map(|_| ()),
                Value::Float(v) if v.is_finite() => worksheet.write_number(r, c, *v).map(|_| ()),
                Value::Float(_) => continue,
                Value::Text(s) => worksheet.write_string(r, c, s).map(|_| ()),
            };
            res.with_context(|| format!("write cell ({r},{col_idx})"))?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> OutputTable {
        let mut table = OutputTable::new(&["team", "win_pct", "rank"]);
        table.push(vec![Value::from("Alpha, Inc"), Value::from(62.5), Value::from(1u32)]);
        table.push(vec![Value::from("Bravo"), Value::Missing, Value::from(2u32)]);
        table
    }

    #[test]
    fn csv_has_canonical_header_and_plain_numbers() {
        let csv = to_csv_string(&sample()).unwrap();
        assert_eq!(csv, "team,win_pct,rank\n\"Alpha, Inc\",62.5,1\nBravo,,2\n");
    }

    #[test]
    fn json_rows_are_keyed_by_column() {
        let json = to_json_records(&sample());
        assert_eq!(json[0]["team"], "Alpha, Inc");
        assert_eq!(json[0]["win_pct"], 62.5);
        assert!(json[1]["win_pct"].is_null());
    }

    #[test]
    fn long_sheet_names_are_trimmed() {
        assert_eq!(sheet_name("a/b"), "a_b");
        assert_eq!(sheet_name(&"x".repeat(40)).len(), 31);
    }
}
