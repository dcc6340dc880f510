use std::collections::BTreeMap;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;

use crate::error::InsufficientData;
use crate::records::{Metric, TeamRecord, metric_column};
use crate::table::{OutputTable, Tabular, Value};

/// Power-profile features used when the caller doesn't pick its own.
pub const DEFAULT_FEATURES: [Metric; 5] = [
    Metric::AllPlayPct,
    Metric::ActualWinPct,
    Metric::AvgMargin,
    Metric::SosPlayed,
    Metric::PowerIndex,
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ClusterConfig {
    pub k: usize,
    /// Independent k-means++ starts; the lowest inertia wins.
    pub restarts: usize,
    pub seed: u64,
    pub max_iter: usize,
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            k: 3,
            restarts: 10,
            seed: 42,
            max_iter: 300,
        }
    }
}

/// Min-max scale each column to `[0, 1]`. A constant column becomes all zeros.
pub fn min_max_scale(rows: &[Vec<f64>]) -> Vec<Vec<f64>> {
    let Some(width) = rows.first().map(Vec::len) else {
        return Vec::new();
    };
    let mut lo = vec![f64::INFINITY; width];
    let mut hi = vec![f64::NEG_INFINITY; width];
    for row in rows {
        for (j, v) in row.iter().enumerate() {
            lo[j] = lo[j].min(*v);
            hi[j] = hi[j].max(*v);
        }
    }
    rows.iter()
        .map(|row| {
            row.iter()
                .enumerate()
                .map(|(j, v)| {
                    let span = hi[j] - lo[j];
                    if span > 0.0 { (v - lo[j]) / span } else { 0.0 }
                })
                .collect()
        })
        .collect()
}

fn sq_dist(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum()
}

fn nearest(point: &[f64], centers: &[Vec<f64>]) -> (usize, f64) {
    let mut best = (0, f64::INFINITY);
    for (idx, c) in centers.iter().enumerate() {
        let d = sq_dist(point, c);
        if d < best.1 {
            best = (idx, d);
        }
    }
    best
}

fn plus_plus_init(points: &[Vec<f64>], k: usize, rng: &mut StdRng) -> Vec<Vec<f64>> {
    let mut centers = vec![points[rng.gen_range(0..points.len())].clone()];
    while centers.len() < k {
        let weights: Vec<f64> = points.iter().map(|p| nearest(p, &centers).1).collect();
        let total: f64 = weights.iter().sum();
        let pick = if total > 0.0 {
            let mut target = rng.gen_range(0.0..total);
            let mut chosen = points.len() - 1;
            for (idx, w) in weights.iter().enumerate() {
                if target < *w {
                    chosen = idx;
                    break;
                }
                target -= w;
            }
            chosen
        } else {
            rng.gen_range(0..points.len())
        };
        centers.push(points[pick].clone());
    }
    centers
}

struct Fit {
    labels: Vec<usize>,
    inertia: f64,
}

fn lloyd(points: &[Vec<f64>], mut centers: Vec<Vec<f64>>, max_iter: usize) -> Fit {
    let dims = points[0].len();
    let mut labels = vec![usize::MAX; points.len()];
    for _ in 0..max_iter.max(1) {
        let mut changed = false;
        for (idx, p) in points.iter().enumerate() {
            let (label, _) = nearest(p, &centers);
            if labels[idx] != label {
                labels[idx] = label;
                changed = true;
            }
        }
        if !changed {
            break;
        }
        let mut sums = vec![vec![0.0; dims]; centers.len()];
        let mut counts = vec![0usize; centers.len()];
        for (p, label) in points.iter().zip(&labels) {
            counts[*label] += 1;
            for (s, v) in sums[*label].iter_mut().zip(p) {
                *s += v;
            }
        }
        for (c, (sum, count)) in centers.iter_mut().zip(sums.into_iter().zip(counts)) {
            // Empty clusters keep their previous center.
            if count > 0 {
                *c = sum.into_iter().map(|s| s / count as f64).collect();
            }
        }
    }
    let inertia = points
        .iter()
        .zip(&labels)
        .map(|(p, label)| sq_dist(p, &centers[*label]))
        .sum();
    Fit { labels, inertia }
}

/// Renumber clusters in order of first appearance so equal partitions
/// always come out with equal labels.
fn relabel(labels: &[usize]) -> Vec<usize> {
    let mut mapping: BTreeMap<usize, usize> = BTreeMap::new();
    labels
        .iter()
        .map(|l| {
            let next = mapping.len();
            *mapping.entry(*l).or_insert(next)
        })
        .collect()
}

/// Seeded k-means with k-means++ starts. Returns relabelled cluster ids and
/// the best inertia, or `None` when there are fewer points than `k`.
pub fn kmeans(points: &[Vec<f64>], config: &ClusterConfig) -> Option<(Vec<usize>, f64)> {
    let k = config.k.max(1);
    if points.len() < k {
        return None;
    }
    let mut rng = StdRng::seed_from_u64(config.seed);
    let mut best: Option<Fit> = None;
    for _ in 0..config.restarts.max(1) {
        let centers = plus_plus_init(points, k, &mut rng);
        let fit = lloyd(points, centers, config.max_iter);
        if best.as_ref().is_none_or(|b| fit.inertia < b.inertia) {
            best = Some(fit);
        }
    }
    best.map(|fit| (relabel(&fit.labels), fit.inertia))
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClusterAssignment {
    pub team: String,
    pub cluster: usize,
    /// Unscaled feature values, in the report's feature order.
    pub features: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum ClusterStatus {
    Clustered { k: usize, inertia: f64 },
    InsufficientData(InsufficientData),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClusterReport {
    pub status: ClusterStatus,
    pub features: Vec<Metric>,
    pub assignments: Vec<ClusterAssignment>,
    /// Teams left out for missing at least one feature.
    pub excluded: Vec<String>,
}

impl ClusterReport {
    pub fn cluster_of(&self, team: &str) -> Option<usize> {
        self.assignments
            .iter()
            .find(|a| a.team == team)
            .map(|a| a.cluster)
    }
}

/// Group teams by their power profile. Rows missing any feature are dropped,
/// the rest are scaled to `[0, 1]` and clustered. Too few complete rows is a
/// status, not an error.
pub fn cluster_teams(
    records: &[TeamRecord],
    features: &[Metric],
    config: &ClusterConfig,
) -> ClusterReport {
    let mut complete: Vec<(&TeamRecord, Vec<f64>)> = Vec::new();
    let mut excluded = Vec::new();
    for rec in records {
        let values: Option<Vec<f64>> = features.iter().map(|m| rec.get(*m)).collect();
        match values {
            Some(values) => complete.push((rec, values)),
            None => excluded.push(rec.team.clone()),
        }
    }

    let raw: Vec<Vec<f64>> = complete.iter().map(|(_, v)| v.clone()).collect();
    let scaled = min_max_scale(&raw);
    let Some((labels, inertia)) = kmeans(&scaled, config) else {
        let status = InsufficientData {
            available: complete.len(),
            required: config.k.max(1),
        };
        tracing::info!(%status, "skipping team clustering");
        return ClusterReport {
            status: ClusterStatus::InsufficientData(status),
            features: features.to_vec(),
            assignments: Vec::new(),
            excluded,
        };
    };

    tracing::debug!(
        teams = complete.len(),
        excluded = excluded.len(),
        k = config.k,
        inertia,
        "clustered teams"
    );
    let assignments = complete
        .into_iter()
        .zip(labels)
        .map(|((rec, values), cluster)| ClusterAssignment {
            team: rec.team.clone(),
            cluster,
            features: values,
        })
        .collect();
    ClusterReport {
        status: ClusterStatus::Clustered {
            k: config.k.max(1),
            inertia,
        },
        features: features.to_vec(),
        assignments,
        excluded,
    }
}

impl Tabular for ClusterReport {
    fn to_table(&self) -> OutputTable {
        let mut columns = vec!["team", "cluster"];
        columns.extend(self.features.iter().map(|m| m.key()));
        let mut out = OutputTable::new(&columns);
        for a in &self.assignments {
            let mut row = vec![Value::from(a.team.as_str()), Value::from(a.cluster)];
            row.extend(a.features.iter().map(|v| Value::from(*v)));
            out.push(row);
        }
        out
    }
}

/// One team's metrics on a shared 0..100 scale.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RadarProfile {
    pub team: String,
    pub values: BTreeMap<Metric, f64>,
}

/// Scale each metric to 0..100 across all teams for side-by-side profiles.
/// Missing values stay missing; a constant metric scales to 0.
pub fn radar_profiles(records: &[TeamRecord], metrics: &[Metric]) -> Vec<RadarProfile> {
    let mut out: Vec<RadarProfile> = records
        .iter()
        .map(|r| RadarProfile {
            team: r.team.clone(),
            values: BTreeMap::new(),
        })
        .collect();
    for metric in metrics {
        let col = metric_column(records, *metric);
        let present = col.iter().flatten().copied();
        let (lo, hi) = present.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
            (lo.min(v), hi.max(v))
        });
        let span = hi - lo;
        for (profile, value) in out.iter_mut().zip(col) {
            if let Some(v) = value {
                let scaled = if span > 0.0 { (v - lo) / span * 100.0 } else { 0.0 };
                profile.values.insert(*metric, scaled);
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn team(name: &str, values: [f64; 5]) -> TeamRecord {
        DEFAULT_FEATURES
            .iter()
            .zip(values)
            .fold(TeamRecord::new(name), |rec, (m, v)| rec.with(*m, v))
    }

    #[test]
    fn constant_column_scales_to_zero() {
        let scaled = min_max_scale(&[vec![1.0, 5.0], vec![3.0, 5.0], vec![2.0, 5.0]]);
        assert_eq!(scaled, vec![vec![0.0, 0.0], vec![1.0, 0.0], vec![0.5, 0.0]]);
    }

    #[test]
    fn relabel_follows_first_appearance() {
        assert_eq!(relabel(&[2, 2, 0, 1, 0]), vec![0, 0, 1, 2, 1]);
    }

    #[test]
    fn separated_groups_land_in_separate_clusters() {
        let records = vec![
            team("A1", [90.0, 85.0, 20.0, 110.0, 130.0]),
            team("B1", [50.0, 50.0, 0.0, 100.0, 100.0]),
            team("A2", [88.0, 86.0, 19.0, 111.0, 129.0]),
            team("C1", [10.0, 15.0, -20.0, 90.0, 70.0]),
            team("B2", [51.0, 49.0, 1.0, 100.0, 101.0]),
            team("C2", [12.0, 14.0, -21.0, 91.0, 71.0]),
        ];
        let report = cluster_teams(&records, &DEFAULT_FEATURES, &ClusterConfig::default());
        assert!(matches!(report.status, ClusterStatus::Clustered { k: 3, .. }));
        assert_eq!(report.cluster_of("A1"), Some(0));
        assert_eq!(report.cluster_of("A2"), Some(0));
        assert_eq!(report.cluster_of("B1"), Some(1));
        assert_eq!(report.cluster_of("B2"), Some(1));
        assert_eq!(report.cluster_of("C1"), Some(2));
        assert_eq!(report.cluster_of("C2"), Some(2));
    }

    #[test]
    fn same_seed_gives_same_partition() {
        let records: Vec<TeamRecord> = (0..10)
            .map(|i| {
                let x = i as f64;
                team(&format!("T{i}"), [x * 7.0 % 10.0, x, x * 3.0 % 5.0, 100.0 - x, x * x])
            })
            .collect();
        let config = ClusterConfig::default();
        let a = cluster_teams(&records, &DEFAULT_FEATURES, &config);
        let b = cluster_teams(&records, &DEFAULT_FEATURES, &config);
        assert_eq!(a, b);
    }

    #[test]
    fn too_few_complete_rows_is_insufficient() {
        let records = vec![
            team("A", [1.0, 2.0, 3.0, 4.0, 5.0]),
            team("B", [2.0, 3.0, 4.0, 5.0, 6.0]),
            TeamRecord::new("C").with(Metric::PowerIndex, 50.0),
        ];
        let report = cluster_teams(&records, &DEFAULT_FEATURES, &ClusterConfig::default());
        assert_eq!(
            report.status,
            ClusterStatus::InsufficientData(InsufficientData {
                available: 2,
                required: 3
            })
        );
        assert_eq!(report.excluded, vec!["C".to_string()]);
        assert!(report.assignments.is_empty());
    }

    #[test]
    fn radar_scales_to_hundred_and_keeps_gaps() {
        let records = vec![
            TeamRecord::new("A").with(Metric::PointsFor, 100.0),
            TeamRecord::new("B").with(Metric::PointsFor, 150.0),
            TeamRecord::new("C"),
            TeamRecord::new("D").with(Metric::PointsFor, 200.0),
        ];
        let profiles = radar_profiles(&records, &[Metric::PointsFor]);
        assert_eq!(profiles[0].values.get(&Metric::PointsFor), Some(&0.0));
        assert_eq!(profiles[1].values.get(&Metric::PointsFor), Some(&50.0));
        assert_eq!(profiles[2].values.get(&Metric::PointsFor), None);
        assert_eq!(profiles[3].values.get(&Metric::PointsFor), Some(&100.0));
    }
}
