use std::fmt;

use serde::Serialize;

use crate::schema::{Field, ReportKind};

/// A required canonical field could not be found in the report headers.
/// Callers keep the raw table and show it as-is.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SchemaError {
    #[error("{report} report is missing columns: {}", join_fields(.missing))]
    MissingFields {
        report: ReportKind,
        missing: Vec<Field>,
        /// Normalized headers that were present, for the warning banner.
        headers: Vec<String>,
    },
    #[error("{report} report has no header row")]
    NoHeaders { report: ReportKind },
}

fn join_fields(fields: &[Field]) -> String {
    fields
        .iter()
        .map(|f| f.key())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Soft conditions collected while a report is processed. None of them stop
/// the pipeline.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Warning {
    /// A cell could not be read as a number and became missing.
    Parse {
        row: usize,
        column: String,
        raw: String,
    },
    /// A row had no team name and was left out.
    MissingTeam { row: usize },
    /// Matchup pairing for a week did not balance.
    Integrity {
        week: u32,
        teams: usize,
        pairs: usize,
        unpaired: Vec<String>,
    },
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Warning::Parse { row, column, raw } => {
                write!(f, "row {row}: could not read {raw:?} in {column} as a number")
            }
            Warning::MissingTeam { row } => write!(f, "row {row}: no team name, row skipped"),
            Warning::Integrity {
                week,
                teams,
                pairs,
                unpaired,
            } => {
                write!(
                    f,
                    "week {week}: {teams} teams but {pairs} matchups paired"
                )?;
                if !unpaired.is_empty() {
                    write!(f, " (unpaired: {})", unpaired.join(", "))?;
                }
                Ok(())
            }
        }
    }
}

/// Result of an aggregate that may have nothing to aggregate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub enum Aggregate<T> {
    Value(T),
    NoData,
}

impl<T> Aggregate<T> {
    pub fn value(self) -> Option<T> {
        match self {
            Aggregate::Value(v) => Some(v),
            Aggregate::NoData => None,
        }
    }

    pub fn is_no_data(&self) -> bool {
        matches!(self, Aggregate::NoData)
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Aggregate<U> {
        match self {
            Aggregate::Value(v) => Aggregate::Value(f(v)),
            Aggregate::NoData => Aggregate::NoData,
        }
    }
}

impl<T> From<Option<T>> for Aggregate<T> {
    fn from(value: Option<T>) -> Self {
        match value {
            Some(v) => Aggregate::Value(v),
            None => Aggregate::NoData,
        }
    }
}

/// Reported when a step needs more rows (or days) than it was given.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct InsufficientData {
    pub available: usize,
    pub required: usize,
}

impl fmt::Display for InsufficientData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "not enough data: {} available, {} required",
            self.available, self.required
        )
    }
}
