use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet, HashSet};

use serde::Serialize;

use crate::error::{SchemaError, Warning};
use crate::normalize::{CellNumber, cell_number};
use crate::schema::{self, Field, ReportKind};
use crate::table::{OutputTable, RawTable, Tabular, Value};

/// One team's line for one week: its own score against `opponent`.
/// Every real game shows up twice, once from each side.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchupRow {
    pub week: u32,
    pub team: String,
    pub opponent: String,
    /// Missing for games not played yet.
    pub points: Option<f64>,
}

impl MatchupRow {
    pub fn new(week: u32, team: &str, opponent: &str, points: Option<f64>) -> Self {
        Self {
            week,
            team: team.to_string(),
            opponent: opponent.to_string(),
            points,
        }
    }
}

/// Read matchup rows from a raw export. Rows without a usable week, team or
/// opponent are skipped; unreadable points become missing. Both come back
/// as warnings.
pub fn parse_matchup_rows(raw: &RawTable) -> Result<(Vec<MatchupRow>, Vec<Warning>), SchemaError> {
    let map = schema::resolve(ReportKind::Matchups, &raw.headers)?;
    let (Some(week_col), Some(team_col), Some(opp_col), Some(pts_col)) = (
        map.index(Field::Week),
        map.index(Field::Team),
        map.index(Field::Opponent),
        map.index(Field::Points),
    ) else {
        return Err(SchemaError::NoHeaders {
            report: ReportKind::Matchups,
        });
    };

    let mut rows = Vec::with_capacity(raw.len());
    let mut warnings = Vec::new();
    for idx in 0..raw.len() {
        let week = match cell_number(raw.cell(idx, week_col)) {
            CellNumber::Value(w) if w >= 0.0 && w.fract() == 0.0 => Some(w as u32),
            CellNumber::Value(w) => {
                warnings.push(Warning::Parse {
                    row: idx,
                    column: map.headers[week_col].clone(),
                    raw: w.to_string(),
                });
                None
            }
            CellNumber::Invalid(text) => {
                warnings.push(Warning::Parse {
                    row: idx,
                    column: map.headers[week_col].clone(),
                    raw: text,
                });
                None
            }
            CellNumber::Missing => None,
        };
        let team = raw.cell(idx, team_col).as_text();
        let opponent = raw.cell(idx, opp_col).as_text();
        let (Some(week), Some(team), Some(opponent)) = (week, team, opponent) else {
            if raw.cell(idx, team_col).is_empty() {
                warnings.push(Warning::MissingTeam { row: idx });
            }
            continue;
        };
        let points = match cell_number(raw.cell(idx, pts_col)) {
            CellNumber::Value(v) => Some(v),
            CellNumber::Missing => None,
            CellNumber::Invalid(text) => {
                warnings.push(Warning::Parse {
                    row: idx,
                    column: map.headers[pts_col].clone(),
                    raw: text,
                });
                None
            }
        };
        rows.push(MatchupRow {
            week,
            team,
            opponent,
            points,
        });
    }
    Ok((rows, warnings))
}

/// Distinct weeks in ascending order.
pub fn weeks(rows: &[MatchupRow]) -> Vec<u32> {
    rows.iter()
        .map(|r| r.week)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// The latest week with at least one scored row; the default week to show.
pub fn latest_scored_week(rows: &[MatchupRow]) -> Option<u32> {
    rows.iter()
        .filter(|r| r.points.is_some())
        .map(|r| r.week)
        .max()
}

/// One physical game, seen from the side whose team name sorts first.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchupPair {
    pub week: u32,
    pub team: String,
    pub points: Option<f64>,
    pub opponent: String,
    pub opp_points: Option<f64>,
    /// `None` for a tie or a game without both scores.
    pub winner: Option<String>,
    /// Absolute point difference, two decimals. `None` until both scores exist.
    pub margin: Option<f64>,
}

impl MatchupPair {
    pub fn is_tie(&self) -> bool {
        matches!((self.points, self.opp_points), (Some(a), Some(b)) if a == b)
    }
}

pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn decide(
    team: &str,
    points: Option<f64>,
    opponent: &str,
    opp_points: Option<f64>,
) -> (Option<String>, Option<f64>) {
    let (Some(a), Some(b)) = (points, opp_points) else {
        return (None, None);
    };
    let winner = match a.partial_cmp(&b) {
        Some(Ordering::Greater) => Some(team.to_string()),
        Some(Ordering::Less) => Some(opponent.to_string()),
        _ => None,
    };
    (winner, Some(round2((a - b).abs())))
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeekPairing {
    pub week: u32,
    pub pairs: Vec<MatchupPair>,
    pub warning: Option<Warning>,
}

/// Pair every row of `week` with its mirror row (same week, teams swapped)
/// and keep each game once. When the pairs don't cover every team exactly
/// once an integrity warning lists the teams left over; the pairs that did
/// form are still returned.
pub fn pair_week(rows: &[MatchupRow], week: u32) -> WeekPairing {
    let week_rows: Vec<&MatchupRow> = rows.iter().filter(|r| r.week == week).collect();
    let mut seen: HashSet<(String, String)> = HashSet::new();
    let mut pairs = Vec::new();

    for left in &week_rows {
        if left.team >= left.opponent {
            continue;
        }
        let Some(right) = week_rows
            .iter()
            .find(|r| r.team == left.opponent && r.opponent == left.team)
        else {
            continue;
        };
        if !seen.insert((left.team.clone(), right.team.clone())) {
            continue;
        }
        let (winner, margin) = decide(&left.team, left.points, &right.team, right.points);
        pairs.push(MatchupPair {
            week,
            team: left.team.clone(),
            points: left.points,
            opponent: right.team.clone(),
            opp_points: right.points,
            winner,
            margin,
        });
    }

    let teams: BTreeSet<&str> = week_rows.iter().map(|r| r.team.as_str()).collect();
    let paired: HashSet<&str> = pairs
        .iter()
        .flat_map(|p| [p.team.as_str(), p.opponent.as_str()])
        .collect();
    let warning = if pairs.len() * 2 != teams.len() {
        let unpaired: Vec<String> = teams
            .iter()
            .filter(|t| !paired.contains(*t))
            .map(|t| t.to_string())
            .collect();
        tracing::warn!(
            week,
            teams = teams.len(),
            pairs = pairs.len(),
            ?unpaired,
            "matchup rows do not pair up evenly"
        );
        Some(Warning::Integrity {
            week,
            teams: teams.len(),
            pairs: pairs.len(),
            unpaired,
        })
    } else {
        None
    };

    WeekPairing {
        week,
        pairs,
        warning,
    }
}

/// [`pair_week`] for every week, in week order.
pub fn pair_all(rows: &[MatchupRow]) -> Vec<WeekPairing> {
    weeks(rows).into_iter().map(|w| pair_week(rows, w)).collect()
}

impl Tabular for [MatchupPair] {
    fn to_table(&self) -> OutputTable {
        let mut out = OutputTable::new(&[
            "week",
            "team",
            "points",
            "opponent",
            "opp_points",
            "winner",
            "margin",
        ]);
        for pair in self {
            out.push(vec![
                Value::from(pair.week),
                Value::from(pair.team.as_str()),
                Value::from(pair.points),
                Value::from(pair.opponent.as_str()),
                Value::from(pair.opp_points),
                Value::from(pair.winner.clone()),
                Value::from(pair.margin),
            ]);
        }
        out
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeasonTotals {
    pub team: String,
    pub points_for: f64,
    pub points_against: f64,
    pub differential: f64,
}

/// Points for (as scorer) and against (as opponent) per team, outer-joined so
/// a team seen on only one side still gets a zero on the other. Sorted by
/// differential, best first; ties by team name.
pub fn season_totals(rows: &[MatchupRow]) -> Vec<SeasonTotals> {
    let mut sums: BTreeMap<&str, (f64, f64)> = BTreeMap::new();
    for row in rows {
        let points = row.points.unwrap_or(0.0);
        sums.entry(row.team.as_str()).or_insert((0.0, 0.0)).0 += points;
        sums.entry(row.opponent.as_str()).or_insert((0.0, 0.0)).1 += points;
    }
    let mut totals: Vec<SeasonTotals> = sums
        .into_iter()
        .map(|(team, (pf, pa))| SeasonTotals {
            team: team.to_string(),
            points_for: pf,
            points_against: pa,
            differential: pf - pa,
        })
        .collect();
    totals.sort_by(|a, b| b.differential.total_cmp(&a.differential));
    totals
}

impl Tabular for [SeasonTotals] {
    fn to_table(&self) -> OutputTable {
        let mut out = OutputTable::new(&["team", "pf", "pa", "diff"]);
        for row in self {
            out.push(vec![
                Value::from(row.team.as_str()),
                Value::from(row.points_for),
                Value::from(row.points_against),
                Value::from(row.differential),
            ]);
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mirrored_rows_collapse_to_one_pair() {
        let rows = vec![
            MatchupRow::new(1, "A", "B", Some(100.0)),
            MatchupRow::new(1, "B", "A", Some(90.0)),
        ];
        let week = pair_week(&rows, 1);
        assert!(week.warning.is_none());
        assert_eq!(
            week.pairs,
            vec![MatchupPair {
                week: 1,
                team: "A".to_string(),
                points: Some(100.0),
                opponent: "B".to_string(),
                opp_points: Some(90.0),
                winner: Some("A".to_string()),
                margin: Some(10.0),
            }]
        );
    }

    #[test]
    fn tied_game_has_no_winner() {
        let rows = vec![
            MatchupRow::new(2, "B", "A", Some(88.4)),
            MatchupRow::new(2, "A", "B", Some(88.4)),
        ];
        let pair = &pair_week(&rows, 2).pairs[0];
        assert_eq!(pair.team, "A");
        assert!(pair.is_tie());
        assert_eq!(pair.winner, None);
        assert_eq!(pair.margin, Some(0.0));
    }

    #[test]
    fn margin_is_rounded_to_cents() {
        let rows = vec![
            MatchupRow::new(1, "A", "B", Some(100.126)),
            MatchupRow::new(1, "B", "A", Some(90.0)),
        ];
        assert_eq!(pair_week(&rows, 1).pairs[0].margin, Some(10.13));
    }

    #[test]
    fn unplayed_game_pairs_without_result() {
        let rows = vec![
            MatchupRow::new(9, "A", "B", None),
            MatchupRow::new(9, "B", "A", None),
        ];
        let pair = &pair_week(&rows, 9).pairs[0];
        assert_eq!(pair.winner, None);
        assert_eq!(pair.margin, None);
        assert!(!pair.is_tie());
    }

    #[test]
    fn missing_mirror_row_is_an_integrity_warning() {
        let rows = vec![
            MatchupRow::new(3, "A", "B", Some(100.0)),
            MatchupRow::new(3, "B", "A", Some(95.0)),
            MatchupRow::new(3, "C", "D", Some(80.0)),
        ];
        let week = pair_week(&rows, 3);
        assert_eq!(week.pairs.len(), 1);
        match week.warning {
            Some(Warning::Integrity {
                teams,
                pairs,
                unpaired,
                ..
            }) => {
                assert_eq!(teams, 3);
                assert_eq!(pairs, 1);
                assert_eq!(unpaired, vec!["C".to_string()]);
            }
            other => panic!("expected integrity warning, got {other:?}"),
        }
    }

    #[test]
    fn latest_week_ignores_unscored_rows() {
        let rows = vec![
            MatchupRow::new(1, "A", "B", Some(1.0)),
            MatchupRow::new(2, "A", "B", Some(2.0)),
            MatchupRow::new(3, "A", "B", None),
        ];
        assert_eq!(weeks(&rows), vec![1, 2, 3]);
        assert_eq!(latest_scored_week(&rows), Some(2));
    }

    #[test]
    fn fractional_week_is_a_parse_warning() {
        let raw = RawTable::from_text_rows(
            &["week", "team", "opp", "pts"],
            &[&["1.6", "A", "B", "100"], &["2", "B", "A", "90"]],
        );
        let (rows, warnings) = parse_matchup_rows(&raw).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].week, 2);
        assert_eq!(warnings.len(), 1);
        assert!(matches!(&warnings[0], Warning::Parse { row: 0, raw, .. } if raw == "1.6"));
    }
}
