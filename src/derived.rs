use std::cmp::Ordering;

use serde::Serialize;

use crate::error::Aggregate;
use crate::records::{Metric, TeamRecord, metric_column};
use crate::table::{OutputTable, Tabular, Value};

/// Metrics compared against the power index on the analytics page.
pub const CORRELATION_METRICS: [Metric; 9] = [
    Metric::AllPlayPct,
    Metric::ActualWinPct,
    Metric::AvgMargin,
    Metric::RecentForm,
    Metric::RecentMargin,
    Metric::SosPlayed,
    Metric::SosRemaining,
    Metric::SosDelta,
    Metric::PointsFor,
];

pub fn mean(values: &[Option<f64>]) -> Aggregate<f64> {
    let present: Vec<f64> = values.iter().flatten().copied().collect();
    if present.is_empty() {
        return Aggregate::NoData;
    }
    Aggregate::Value(present.iter().sum::<f64>() / present.len() as f64)
}

fn idx_by(values: &[Option<f64>], better: impl Fn(f64, f64) -> bool) -> Aggregate<usize> {
    let mut best: Option<(usize, f64)> = None;
    for (idx, v) in values.iter().enumerate() {
        let Some(v) = *v else { continue };
        match best {
            Some((_, b)) if !better(v, b) => {}
            _ => best = Some((idx, v)),
        }
    }
    best.map(|(idx, _)| idx).into()
}

/// Position of the first maximum, ignoring missing values.
pub fn idx_max(values: &[Option<f64>]) -> Aggregate<usize> {
    idx_by(values, |v, best| v > best)
}

/// Position of the first minimum, ignoring missing values.
pub fn idx_min(values: &[Option<f64>]) -> Aggregate<usize> {
    idx_by(values, |v, best| v < best)
}

/// Actual Win % minus All-Play %; only defined when both are present.
pub fn luck_delta(record: &TeamRecord) -> Option<f64> {
    let actual = record.get(Metric::ActualWinPct)?;
    let all_play = record.get(Metric::AllPlayPct)?;
    Some(actual - all_play)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LuckRow {
    pub team: String,
    pub all_play_pct: f64,
    pub actual_win_pct: f64,
    pub luck_delta: f64,
}

/// Luckiest first. Teams missing either input are left out.
pub fn luck_leaderboard(records: &[TeamRecord]) -> Vec<LuckRow> {
    let mut rows: Vec<LuckRow> = records
        .iter()
        .filter_map(|r| {
            Some(LuckRow {
                team: r.team.clone(),
                all_play_pct: r.get(Metric::AllPlayPct)?,
                actual_win_pct: r.get(Metric::ActualWinPct)?,
                luck_delta: luck_delta(r)?,
            })
        })
        .collect();
    rows.sort_by(|a, b| b.luck_delta.total_cmp(&a.luck_delta));
    rows
}

impl Tabular for [LuckRow] {
    fn to_table(&self) -> OutputTable {
        let mut out = OutputTable::new(&["team", "all_play_pct", "actual_win_pct", "luck_delta"]);
        for row in self {
            out.push(vec![
                Value::from(row.team.as_str()),
                Value::from(row.all_play_pct),
                Value::from(row.actual_win_pct),
                Value::from(row.luck_delta),
            ]);
        }
        out
    }
}

/// Pearson correlation over positions where both sides are present.
/// Undefined with fewer than two pairs or with zero variance on either side.
pub fn pearson(xs: &[Option<f64>], ys: &[Option<f64>]) -> Option<f64> {
    let pairs: Vec<(f64, f64)> = xs
        .iter()
        .zip(ys)
        .filter_map(|(x, y)| Some(((*x)?, (*y)?)))
        .collect();
    if pairs.len() < 2 {
        return None;
    }
    let n = pairs.len() as f64;
    let mean_x = pairs.iter().map(|p| p.0).sum::<f64>() / n;
    let mean_y = pairs.iter().map(|p| p.1).sum::<f64>() / n;
    let mut cov = 0.0;
    let mut var_x = 0.0;
    let mut var_y = 0.0;
    for (x, y) in &pairs {
        let dx = x - mean_x;
        let dy = y - mean_y;
        cov += dx * dy;
        var_x += dx * dx;
        var_y += dy * dy;
    }
    if var_x <= 1e-12 || var_y <= 1e-12 {
        return None;
    }
    let r = cov / (var_x.sqrt() * var_y.sqrt());
    r.is_finite().then_some(r.clamp(-1.0, 1.0))
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CorrelationRow {
    pub metric: Metric,
    /// `None` when the correlation is undefined.
    pub correlation: Option<f64>,
    pub pairs: usize,
}

/// Correlate each selected metric with `reference`, strongest first and
/// undefined entries last. The reference itself is skipped.
pub fn correlations_with(
    records: &[TeamRecord],
    selected: &[Metric],
    reference: Metric,
) -> Vec<CorrelationRow> {
    let reference_col = metric_column(records, reference);
    let mut rows: Vec<CorrelationRow> = selected
        .iter()
        .filter(|m| **m != reference)
        .map(|metric| {
            let col = metric_column(records, *metric);
            let pairs = col
                .iter()
                .zip(&reference_col)
                .filter(|(a, b)| a.is_some() && b.is_some())
                .count();
            CorrelationRow {
                metric: *metric,
                correlation: pearson(&col, &reference_col),
                pairs,
            }
        })
        .collect();
    rows.sort_by(|a, b| match (a.correlation, b.correlation) {
        (Some(x), Some(y)) => y.total_cmp(&x),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    });
    rows
}

impl Tabular for [CorrelationRow] {
    fn to_table(&self) -> OutputTable {
        let mut out = OutputTable::new(&["metric", "correlation", "pairs"]);
        for row in self {
            out.push(vec![
                Value::from(row.metric.key()),
                Value::from(row.correlation),
                Value::from(row.pairs),
            ]);
        }
        out
    }
}

/// Sum of `parts`, or `None` if any part is missing.
pub fn combined_score(record: &TeamRecord, parts: &[Metric]) -> Option<f64> {
    parts.iter().map(|m| record.get(*m)).sum()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Leader {
    pub team: String,
    pub value: f64,
}

/// Team with the highest combined score. Not stored on the records.
pub fn combined_leader(records: &[TeamRecord], parts: &[Metric]) -> Aggregate<Leader> {
    let scores: Vec<Option<f64>> = records.iter().map(|r| combined_score(r, parts)).collect();
    idx_max(&scores).map(|idx| Leader {
        team: records[idx].team.clone(),
        value: scores[idx].unwrap_or_default(),
    })
}

pub fn leader_by(records: &[TeamRecord], metric: Metric) -> Aggregate<Leader> {
    let col = metric_column(records, metric);
    idx_max(&col).map(|idx| Leader {
        team: records[idx].team.clone(),
        value: col[idx].unwrap_or_default(),
    })
}

/// Headline numbers shown above the power rankings.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PowerSummary {
    pub teams: usize,
    pub top_team: Option<String>,
    pub avg_power_index: Aggregate<f64>,
    pub avg_points_for: Aggregate<f64>,
    pub best_recent_form: Aggregate<Leader>,
    pub best_all_play: Aggregate<Leader>,
    pub best_actual_win: Aggregate<Leader>,
    pub hardest_schedule: Aggregate<Leader>,
    /// Highest power index plus schedule played.
    pub best_combined: Aggregate<Leader>,
}

/// `ranked` must already be in rank order; its first row is the top team.
pub fn power_summary(ranked: &[TeamRecord]) -> PowerSummary {
    PowerSummary {
        teams: ranked.len(),
        top_team: ranked.first().map(|r| r.team.clone()),
        avg_power_index: mean(&metric_column(ranked, Metric::PowerIndex)),
        avg_points_for: mean(&metric_column(ranked, Metric::PointsFor)),
        best_recent_form: leader_by(ranked, Metric::RecentForm),
        best_all_play: leader_by(ranked, Metric::AllPlayPct),
        best_actual_win: leader_by(ranked, Metric::ActualWinPct),
        hardest_schedule: leader_by(ranked, Metric::SosPlayed),
        best_combined: combined_leader(ranked, &[Metric::PowerIndex, Metric::SosPlayed]),
    }
}
