use std::cmp::Ordering;
use std::collections::BTreeMap;

use serde::Serialize;

use crate::records::{Metric, TeamRecord};
use crate::table::{OutputTable, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    HigherBetter,
    LowerBetter,
}

/// Which ordering a rank belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum RankKind {
    Standing,
    Power,
    SosPlayed,
    SosRemaining,
    SosDelta,
}

impl RankKind {
    pub fn key(self) -> &'static str {
        match self {
            RankKind::Standing => "standing_rank",
            RankKind::Power => "power_rank",
            RankKind::SosPlayed => "sos_played_rank",
            RankKind::SosRemaining => "sos_remaining_rank",
            RankKind::SosDelta => "sos_delta_rank",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedRecord {
    pub record: TeamRecord,
    pub ranks: BTreeMap<RankKind, u32>,
}

impl RankedRecord {
    pub fn rank(&self, kind: RankKind) -> Option<u32> {
        self.ranks.get(&kind).copied()
    }
}

fn cmp_dir(a: f64, b: f64, dir: Direction) -> Ordering {
    match dir {
        Direction::HigherBetter => b.total_cmp(&a),
        Direction::LowerBetter => a.total_cmp(&b),
    }
}

/// Competition ranking ("ties share the minimum rank"): `[90, 90, 80, 70]`
/// descending gives `[1, 1, 3, 4]`. Missing values stay unranked.
pub fn rank_min(values: &[Option<f64>], dir: Direction) -> Vec<Option<u32>> {
    let mut present: Vec<(usize, f64)> = values
        .iter()
        .enumerate()
        .filter_map(|(idx, v)| v.map(|v| (idx, v)))
        .collect();
    present.sort_by(|a, b| cmp_dir(a.1, b.1, dir));

    let mut out = vec![None; values.len()];
    let mut current = 0u32;
    let mut prev: Option<f64> = None;
    for (pos, (idx, value)) in present.into_iter().enumerate() {
        if prev != Some(value) {
            current = pos as u32 + 1;
            prev = Some(value);
        }
        out[idx] = Some(current);
    }
    out
}

/// Row order after a stable sort on `values`; missing values go last and
/// ties keep their original order.
pub fn stable_order(values: &[Option<f64>], dir: Direction) -> Vec<usize> {
    let mut order: Vec<usize> = (0..values.len()).collect();
    order.sort_by(|a, b| match (values[*a], values[*b]) {
        (Some(x), Some(y)) => cmp_dir(x, y, dir),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    });
    order
}

fn sort_by_rank(rows: &mut [RankedRecord], kind: RankKind) {
    rows.sort_by(|a, b| match (a.rank(kind), b.rank(kind)) {
        (Some(x), Some(y)) => x.cmp(&y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    });
}

/// Attach a ties-min rank on `metric` to every record, keeping input order.
pub fn attach_rank(
    rows: &mut [RankedRecord],
    metric: Metric,
    dir: Direction,
    kind: RankKind,
) {
    let values: Vec<Option<f64>> = rows.iter().map(|r| r.record.get(metric)).collect();
    for (row, rank) in rows.iter_mut().zip(rank_min(&values, dir)) {
        if let Some(rank) = rank {
            row.ranks.insert(kind, rank);
        }
    }
}

fn unranked(records: &[TeamRecord]) -> Vec<RankedRecord> {
    records
        .iter()
        .cloned()
        .map(|record| RankedRecord {
            record,
            ranks: BTreeMap::new(),
        })
        .collect()
}

/// League standings by win percentage, best first.
pub fn rank_standings(records: &[TeamRecord]) -> Vec<RankedRecord> {
    let mut rows = unranked(records);
    attach_rank(&mut rows, Metric::WinPct, Direction::HigherBetter, RankKind::Standing);
    sort_by_rank(&mut rows, RankKind::Standing);
    rows
}

/// Where a power ranking's order came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RankSource {
    /// The sheet carried its own rank column.
    Sheet,
    /// No usable rank column; ordered by power index instead.
    PowerIndex,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PowerRanking {
    pub rows: Vec<RankedRecord>,
    pub source: RankSource,
}

/// Use the sheet's own rank when any row has one, otherwise sort by power
/// index (stable) and number the rows 1..N.
pub fn rank_power(records: &[TeamRecord]) -> PowerRanking {
    let mut rows = unranked(records);
    let has_sheet_rank = records.iter().any(|r| r.get(Metric::Rank).is_some());
    if has_sheet_rank {
        for row in &mut rows {
            let rank = row
                .record
                .get(Metric::Rank)
                .filter(|r| *r >= 1.0)
                .map(|r| r.round() as u32);
            if let Some(rank) = rank {
                row.ranks.insert(RankKind::Power, rank);
            }
        }
        sort_by_rank(&mut rows, RankKind::Power);
        return PowerRanking {
            rows,
            source: RankSource::Sheet,
        };
    }

    let values: Vec<Option<f64>> = rows.iter().map(|r| r.record.get(Metric::PowerIndex)).collect();
    let order = stable_order(&values, Direction::HigherBetter);
    let mut slots: Vec<Option<RankedRecord>> = rows.into_iter().map(Some).collect();
    let mut sorted = Vec::with_capacity(slots.len());
    for (pos, idx) in order.into_iter().enumerate() {
        if let Some(mut row) = slots[idx].take() {
            row.ranks.insert(RankKind::Power, pos as u32 + 1);
            sorted.push(row);
        }
    }
    PowerRanking {
        rows: sorted,
        source: RankSource::PowerIndex,
    }
}

/// Strength-of-schedule ranks on three independent dimensions. Hardest
/// (highest value) ranks first; input order is kept.
pub fn rank_schedule(records: &[TeamRecord]) -> Vec<RankedRecord> {
    let mut rows = unranked(records);
    attach_rank(&mut rows, Metric::SosPlayed, Direction::HigherBetter, RankKind::SosPlayed);
    attach_rank(
        &mut rows,
        Metric::SosRemaining,
        Direction::HigherBetter,
        RankKind::SosRemaining,
    );
    attach_rank(&mut rows, Metric::SosDelta, Direction::HigherBetter, RankKind::SosDelta);
    rows
}

/// Ranked rows as a table: rank columns, then team, then the given metrics.
pub fn ranked_table(rows: &[RankedRecord], kinds: &[RankKind], metrics: &[Metric]) -> OutputTable {
    let mut columns: Vec<&str> = kinds.iter().map(|k| k.key()).collect();
    columns.push("team");
    columns.extend(metrics.iter().map(|m| m.key()));
    let mut out = OutputTable::new(&columns);
    for row in rows {
        let mut values: Vec<Value> = kinds.iter().map(|k| Value::from(row.rank(*k))).collect();
        values.push(Value::from(row.record.team.as_str()));
        values.extend(metrics.iter().map(|m| Value::from(row.record.get(*m))));
        out.push(values);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ties_share_the_minimum_rank() {
        let values = [Some(90.0), Some(90.0), Some(80.0), Some(70.0)];
        assert_eq!(
            rank_min(&values, Direction::HigherBetter),
            vec![Some(1), Some(1), Some(3), Some(4)]
        );
        let values = [Some(50.0), Some(50.0), Some(40.0)];
        assert_eq!(
            rank_min(&values, Direction::HigherBetter),
            vec![Some(1), Some(1), Some(3)]
        );
    }

    #[test]
    fn ascending_ranks_and_missing_values() {
        let values = [Some(3.0), None, Some(1.0), Some(3.0)];
        assert_eq!(
            rank_min(&values, Direction::LowerBetter),
            vec![Some(2), None, Some(1), Some(2)]
        );
    }

    #[test]
    fn stable_order_keeps_row_order_on_ties() {
        let values = [Some(10.0), None, Some(12.0), Some(10.0)];
        assert_eq!(stable_order(&values, Direction::HigherBetter), vec![2, 0, 3, 1]);
    }

    #[test]
    fn power_falls_back_to_index_when_sheet_has_no_rank() {
        let records = vec![
            TeamRecord::new("Alpha").with(Metric::PowerIndex, 80.0),
            TeamRecord::new("Bravo").with(Metric::PowerIndex, 95.0),
            TeamRecord::new("Charlie").with(Metric::PowerIndex, 80.0),
        ];
        let ranking = rank_power(&records);
        assert_eq!(ranking.source, RankSource::PowerIndex);
        let order: Vec<(&str, Option<u32>)> = ranking
            .rows
            .iter()
            .map(|r| (r.record.team.as_str(), r.rank(RankKind::Power)))
            .collect();
        assert_eq!(
            order,
            vec![("Bravo", Some(1)), ("Alpha", Some(2)), ("Charlie", Some(3))]
        );
    }

    #[test]
    fn power_prefers_sheet_rank() {
        let records = vec![
            TeamRecord::new("Alpha").with(Metric::Rank, 2.0).with(Metric::PowerIndex, 99.0),
            TeamRecord::new("Bravo").with(Metric::Rank, 1.0).with(Metric::PowerIndex, 10.0),
        ];
        let ranking = rank_power(&records);
        assert_eq!(ranking.source, RankSource::Sheet);
        assert_eq!(ranking.rows[0].record.team, "Bravo");
    }
}
