use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::Warning;
use crate::schema::ReportKind;
use crate::table::{OutputTable, Tabular, Value};

/// Numeric canonical fields shared by the team-level reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Metric {
    Rank,
    Wins,
    Losses,
    Ties,
    WinPct,
    PointsFor,
    PointsAgainst,
    AllPlayPct,
    ActualWinPct,
    AvgMargin,
    RecentForm,
    RecentMargin,
    SosPlayed,
    SosRemaining,
    SosDelta,
    PowerIndex,
}

impl Metric {
    pub const ALL: [Metric; 16] = [
        Metric::Rank,
        Metric::Wins,
        Metric::Losses,
        Metric::Ties,
        Metric::WinPct,
        Metric::PointsFor,
        Metric::PointsAgainst,
        Metric::AllPlayPct,
        Metric::ActualWinPct,
        Metric::AvgMargin,
        Metric::RecentForm,
        Metric::RecentMargin,
        Metric::SosPlayed,
        Metric::SosRemaining,
        Metric::SosDelta,
        Metric::PowerIndex,
    ];

    /// Canonical field name used for export headers.
    pub fn key(self) -> &'static str {
        match self {
            Metric::Rank => "rank",
            Metric::Wins => "wins",
            Metric::Losses => "losses",
            Metric::Ties => "ties",
            Metric::WinPct => "win_pct",
            Metric::PointsFor => "pf",
            Metric::PointsAgainst => "pa",
            Metric::AllPlayPct => "all_play_pct",
            Metric::ActualWinPct => "actual_win_pct",
            Metric::AvgMargin => "avg_margin",
            Metric::RecentForm => "recent_form",
            Metric::RecentMargin => "recent_margin",
            Metric::SosPlayed => "sos_played",
            Metric::SosRemaining => "sos_remaining",
            Metric::SosDelta => "sos_delta",
            Metric::PowerIndex => "power_index",
        }
    }

    /// Header as it usually appears in the league spreadsheet.
    pub fn label(self) -> &'static str {
        match self {
            Metric::Rank => "Rank",
            Metric::Wins => "Wins",
            Metric::Losses => "Losses",
            Metric::Ties => "Ties",
            Metric::WinPct => "Win %",
            Metric::PointsFor => "PF",
            Metric::PointsAgainst => "PA",
            Metric::AllPlayPct => "All-Play %",
            Metric::ActualWinPct => "Actual Win %",
            Metric::AvgMargin => "Avg Margin",
            Metric::RecentForm => "Recent Form (3-wk avg)",
            Metric::RecentMargin => "Recent Margin (3-wk avg)",
            Metric::SosPlayed => "SoS Played",
            Metric::SosRemaining => "SoS Remaining",
            Metric::SosDelta => "SoS Δ vs Avg",
            Metric::PowerIndex => "Power Index",
        }
    }

    /// Percent columns go through fraction-scale detection.
    pub fn is_percent(self) -> bool {
        matches!(
            self,
            Metric::WinPct | Metric::AllPlayPct | Metric::ActualWinPct
        )
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Identity used to join tables from different loads. The team id wins when
/// both sides carry one; otherwise the case-folded team name is used.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TeamKey {
    Id(String),
    Name(String),
}

/// One team's normalized attributes. Missing metrics are simply absent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeamRecord {
    pub team: String,
    #[serde(default)]
    pub team_id: Option<String>,
    #[serde(default)]
    pub metrics: BTreeMap<Metric, f64>,
}

impl TeamRecord {
    pub fn new(team: impl Into<String>) -> Self {
        Self {
            team: team.into(),
            team_id: None,
            metrics: BTreeMap::new(),
        }
    }

    pub fn with(mut self, metric: Metric, value: f64) -> Self {
        self.set(metric, Some(value));
        self
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.team_id = Some(id.into());
        self
    }

    pub fn get(&self, metric: Metric) -> Option<f64> {
        self.metrics.get(&metric).copied()
    }

    /// Non-finite values are stored as absent.
    pub fn set(&mut self, metric: Metric, value: Option<f64>) {
        match value.filter(|v| v.is_finite()) {
            Some(v) => {
                self.metrics.insert(metric, v);
            }
            None => {
                self.metrics.remove(&metric);
            }
        }
    }

    pub fn name_key(&self) -> TeamKey {
        TeamKey::Name(self.team.trim().to_lowercase())
    }

    pub fn id_key(&self) -> Option<TeamKey> {
        self.team_id
            .as_ref()
            .map(|id| id.trim())
            .filter(|id| !id.is_empty())
            .map(|id| TeamKey::Id(id.to_string()))
    }
}

pub fn metric_column(records: &[TeamRecord], metric: Metric) -> Vec<Option<f64>> {
    records.iter().map(|r| r.get(metric)).collect()
}

/// Output of the normalizer for one report: records in source order, the
/// metrics the source actually carried, and anything worth warning about.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedTable {
    pub report: ReportKind,
    pub records: Vec<TeamRecord>,
    pub metrics: Vec<Metric>,
    pub warnings: Vec<Warning>,
}

impl NormalizedTable {
    pub fn column(&self, metric: Metric) -> Vec<Option<f64>> {
        metric_column(&self.records, metric)
    }

    pub fn has_metric(&self, metric: Metric) -> bool {
        self.metrics.contains(&metric)
    }

    pub fn find(&self, team: &str) -> Option<&TeamRecord> {
        self.records
            .iter()
            .find(|r| r.team.eq_ignore_ascii_case(team.trim()))
    }
}

impl Tabular for NormalizedTable {
    fn to_table(&self) -> OutputTable {
        let has_ids = self.records.iter().any(|r| r.team_id.is_some());
        let mut columns: Vec<&str> = vec!["team"];
        if has_ids {
            columns.push("team_id");
        }
        columns.extend(self.metrics.iter().map(|m| m.key()));
        let mut out = OutputTable::new(&columns);
        for rec in &self.records {
            let mut row = vec![Value::from(rec.team.as_str())];
            if has_ids {
                row.push(Value::from(rec.team_id.clone()));
            }
            row.extend(self.metrics.iter().map(|m| Value::from(rec.get(*m))));
            out.push(row);
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn non_finite_values_are_absent() {
        let mut rec = TeamRecord::new("Alpha").with(Metric::PowerIndex, 12.0);
        rec.set(Metric::PowerIndex, Some(f64::NAN));
        assert_eq!(rec.get(Metric::PowerIndex), None);
        rec.set(Metric::PointsFor, Some(f64::INFINITY));
        assert!(rec.metrics.is_empty());
    }

    #[test]
    fn blank_team_id_falls_back_to_name() {
        let rec = TeamRecord::new(" Alpha ").with_id("  ");
        assert_eq!(rec.id_key(), None);
        assert_eq!(rec.name_key(), TeamKey::Name("alpha".to_string()));
    }
}
