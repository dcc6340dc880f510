use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;

use crate::error::SchemaError;
use crate::schema::{self, Field, ReportKind, normalize_header};
use crate::table::{Cell, OutputTable, RawTable, Tabular, Value};

/// Bookkeeping columns left out of the move log.
const HIDDEN_COLUMNS: [&str; 4] = ["id", "type", "time", "status"];

/// Completed roster moves: only rows whose details mention an add or a drop,
/// lineup shuffles and other entries filtered out.
#[derive(Debug, Clone, PartialEq)]
pub struct TransactionLog {
    pub table: RawTable,
    team_col: usize,
}

fn is_roster_move(details: &Cell) -> bool {
    details.as_text().is_some_and(|text| {
        let lower = text.to_lowercase();
        lower.contains("add:") || lower.contains("drop:")
    })
}

pub fn completed_moves(raw: &RawTable) -> Result<TransactionLog, SchemaError> {
    let map = schema::resolve(ReportKind::Transactions, &raw.headers)?;
    let (Some(team_col), Some(details_col)) = (map.index(Field::Team), map.index(Field::Details))
    else {
        return Err(SchemaError::NoHeaders {
            report: ReportKind::Transactions,
        });
    };

    let keep: Vec<usize> = (0..raw.headers.len())
        .filter(|idx| {
            let header = normalize_header(&raw.headers[*idx]).to_lowercase();
            !HIDDEN_COLUMNS.contains(&header.as_str())
        })
        .collect();
    let new_team_col = keep.iter().position(|c| *c == team_col).unwrap_or(0);

    let rows: Vec<Vec<Cell>> = (0..raw.len())
        .filter(|row| is_roster_move(raw.cell(*row, details_col)))
        .map(|row| keep.iter().map(|col| raw.cell(row, *col).clone()).collect())
        .collect();
    tracing::debug!(total = raw.len(), kept = rows.len(), "filtered transactions to roster moves");

    Ok(TransactionLog {
        table: RawTable {
            headers: keep.iter().map(|c| raw.headers[*c].clone()).collect(),
            rows,
        },
        team_col: new_team_col,
    })
}

impl TransactionLog {
    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    fn team_of(&self, row: usize) -> Option<String> {
        self.table.cell(row, self.team_col).as_text()
    }

    /// Distinct team names, sorted.
    pub fn teams(&self) -> Vec<String> {
        (0..self.len())
            .filter_map(|row| self.team_of(row))
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Moves for one team (or all teams with `None`), sorted by team name.
    pub fn for_team(&self, team: Option<&str>) -> RawTable {
        let mut rows: Vec<(Option<String>, &Vec<Cell>)> = self
            .table
            .rows
            .iter()
            .enumerate()
            .map(|(idx, row)| (self.team_of(idx), row))
            .filter(|(name, _)| team.is_none_or(|t| name.as_deref() == Some(t)))
            .collect();
        rows.sort_by(|a, b| a.0.cmp(&b.0));
        RawTable {
            headers: self.table.headers.clone(),
            rows: rows.into_iter().map(|(_, row)| row.clone()).collect(),
        }
    }

    /// Moves per team, busiest first; equal counts by team name.
    pub fn move_counts(&self) -> Vec<MoveCount> {
        let mut counts: BTreeMap<String, usize> = BTreeMap::new();
        for row in 0..self.len() {
            if let Some(team) = self.team_of(row) {
                *counts.entry(team).or_default() += 1;
            }
        }
        let mut out: Vec<MoveCount> = counts
            .into_iter()
            .map(|(team, moves)| MoveCount { team, moves })
            .collect();
        out.sort_by(|a, b| b.moves.cmp(&a.moves));
        out
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MoveCount {
    pub team: String,
    pub moves: usize,
}

impl Tabular for [MoveCount] {
    fn to_table(&self) -> OutputTable {
        let mut out = OutputTable::new(&["team", "moves"]);
        for row in self {
            out.push(vec![Value::from(row.team.as_str()), Value::from(row.moves)]);
        }
        out
    }
}
