use std::collections::BTreeSet;

use crate::schema::{self, Field, ReportKind};
use crate::table::RawTable;

/// The injury sheet, shown mostly as-is with an optional team filter.
#[derive(Debug, Clone, PartialEq)]
pub struct InjuryReport {
    pub table: RawTable,
    team_col: Option<usize>,
}

impl InjuryReport {
    /// Never fails: a sheet without a recognizable team column just can't be
    /// filtered.
    pub fn new(raw: RawTable) -> Self {
        let team_col = schema::resolve(ReportKind::Injuries, &raw.headers)
            .ok()
            .and_then(|map| map.index(Field::Team));
        if team_col.is_none() && !raw.headers.is_empty() {
            tracing::debug!("injury report has no team column, filtering disabled");
        }
        Self {
            table: raw,
            team_col,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    pub fn can_filter(&self) -> bool {
        self.team_col.is_some()
    }

    pub fn teams(&self) -> Vec<String> {
        let Some(col) = self.team_col else {
            return Vec::new();
        };
        (0..self.table.len())
            .filter_map(|row| self.table.cell(row, col).as_text())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Rows for `team`; every row when the team is `None` or the sheet has no
    /// team column.
    pub fn for_team(&self, team: Option<&str>) -> RawTable {
        match (self.team_col, team) {
            (Some(col), Some(team)) => self
                .table
                .filter_rows(|row| row.get(col).and_then(|c| c.as_text()).as_deref() == Some(team)),
            _ => self.table.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn teams_are_distinct_and_sorted() {
        let report = InjuryReport::new(RawTable::from_text_rows(
            &["Player", "Team", "Status"],
            &[
                &["A. One", "Bravo", "Out"],
                &["B. Two", "Alpha", "Questionable"],
                &["C. Three", "Bravo", "IR"],
                &["D. Four", "", "Out"],
            ],
        ));
        assert_eq!(report.teams(), vec!["Alpha", "Bravo"]);
        assert_eq!(report.for_team(Some("Bravo")).len(), 2);
        assert_eq!(report.for_team(None).len(), 4);
    }

    #[test]
    fn sheet_without_team_column_is_shown_whole() {
        let report = InjuryReport::new(RawTable::from_text_rows(
            &["Player", "Status"],
            &[&["A. One", "Out"]],
        ));
        assert!(!report.can_filter());
        assert!(report.teams().is_empty());
        assert_eq!(report.for_team(Some("Alpha")).len(), 1);
    }
}
