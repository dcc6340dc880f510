use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{Local, NaiveDate};
use serde::Serialize;

use crate::error::Aggregate;
use crate::records::{Metric, TeamKey, TeamRecord};
use crate::table::{OutputTable, Tabular, Value};

/// Source of the current period key. Snapshots are taken at most once per key.
pub trait PeriodClock: Send + Sync {
    fn today(&self) -> NaiveDate;
}

/// Local calendar date.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl PeriodClock for SystemClock {
    fn today(&self) -> NaiveDate {
        Local::now().date_naive()
    }
}

/// A clock pinned to one date, for tests and replays.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub NaiveDate);

impl PeriodClock for FixedClock {
    fn today(&self) -> NaiveDate {
        self.0
    }
}

impl<C: PeriodClock + ?Sized> PeriodClock for Arc<C> {
    fn today(&self) -> NaiveDate {
        (**self).today()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum CaptureOutcome {
    Captured,
    AlreadyCaptured,
}

/// Day-keyed snapshots of the all-play table, kept for the life of the
/// process. Capture is check-and-set under one lock, so concurrent callers
/// for the same day store exactly one snapshot.
#[derive(Debug, Default)]
pub struct SnapshotHistory {
    days: Mutex<BTreeMap<NaiveDate, Vec<TeamRecord>>>,
}

impl SnapshotHistory {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, BTreeMap<NaiveDate, Vec<TeamRecord>>> {
        // The map is only ever inserted into; a panicked writer leaves it usable.
        self.days.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn capture(&self, day: NaiveDate, records: &[TeamRecord]) -> CaptureOutcome {
        let mut days = self.lock();
        if days.contains_key(&day) {
            return CaptureOutcome::AlreadyCaptured;
        }
        days.insert(day, records.to_vec());
        tracing::info!(%day, teams = records.len(), "captured standings snapshot");
        CaptureOutcome::Captured
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn keys(&self) -> Vec<NaiveDate> {
        self.lock().keys().copied().collect()
    }

    pub fn get(&self, day: NaiveDate) -> Option<Vec<TeamRecord>> {
        self.lock().get(&day).cloned()
    }

    /// Latest snapshot strictly before `day`.
    pub fn previous(&self, day: NaiveDate) -> Option<(NaiveDate, Vec<TeamRecord>)> {
        self.lock()
            .range(..day)
            .next_back()
            .map(|(d, records)| (*d, records.clone()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TrendStatus {
    /// Deltas are against the snapshot taken on `baseline`.
    Available { baseline: NaiveDate },
    /// Fewer than two days captured; every delta is zero.
    NotYetAvailable { captured: usize },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrendRow {
    pub team: String,
    /// Current value minus baseline value, per metric. Zero before a
    /// baseline exists; `None` when the team or the metric is missing on
    /// either side.
    pub deltas: BTreeMap<Metric, Option<f64>>,
}

impl TrendRow {
    pub fn delta(&self, metric: Metric) -> Option<f64> {
        self.deltas.get(&metric).copied().flatten()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Mover {
    pub team: String,
    pub change: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrendReport {
    pub status: TrendStatus,
    pub metrics: Vec<Metric>,
    pub rows: Vec<TrendRow>,
}

impl TrendReport {
    pub fn is_available(&self) -> bool {
        matches!(self.status, TrendStatus::Available { .. })
    }

    pub fn biggest_riser(&self, metric: Metric) -> Aggregate<Mover> {
        self.extreme(metric, |a, b| a > b)
    }

    pub fn biggest_faller(&self, metric: Metric) -> Aggregate<Mover> {
        self.extreme(metric, |a, b| a < b)
    }

    pub fn average_change(&self, metric: Metric) -> Aggregate<f64> {
        if !self.is_available() {
            return Aggregate::NoData;
        }
        let changes: Vec<f64> = self.rows.iter().filter_map(|r| r.delta(metric)).collect();
        if changes.is_empty() {
            return Aggregate::NoData;
        }
        Aggregate::Value(changes.iter().sum::<f64>() / changes.len() as f64)
    }

    fn extreme(&self, metric: Metric, better: impl Fn(f64, f64) -> bool) -> Aggregate<Mover> {
        if !self.is_available() {
            return Aggregate::NoData;
        }
        let mut best: Option<(&TrendRow, f64)> = None;
        for row in &self.rows {
            let Some(change) = row.delta(metric) else {
                continue;
            };
            match best {
                Some((_, b)) if !better(change, b) => {}
                _ => best = Some((row, change)),
            }
        }
        best.map(|(row, change)| Mover {
            team: row.team.clone(),
            change,
        })
        .into()
    }
}

impl Tabular for TrendReport {
    fn to_table(&self) -> OutputTable {
        let mut columns = vec!["team".to_string()];
        columns.extend(self.metrics.iter().map(|m| format!("{}_delta", m.key())));
        let column_refs: Vec<&str> = columns.iter().map(String::as_str).collect();
        let mut out = OutputTable::new(&column_refs);
        for row in &self.rows {
            let mut values = vec![Value::from(row.team.as_str())];
            values.extend(self.metrics.iter().map(|m| Value::from(row.delta(*m))));
            out.push(values);
        }
        out
    }
}

/// Captures today's table and compares it with the most recent earlier day.
pub struct TrendTracker<C: PeriodClock = SystemClock> {
    history: Arc<SnapshotHistory>,
    clock: C,
}

impl<C: PeriodClock> TrendTracker<C> {
    pub fn new(history: Arc<SnapshotHistory>, clock: C) -> Self {
        Self { history, clock }
    }

    pub fn history(&self) -> &Arc<SnapshotHistory> {
        &self.history
    }

    pub fn today(&self) -> NaiveDate {
        self.clock.today()
    }

    /// Snapshot `current` for today if nothing was captured yet today.
    pub fn observe(&self, current: &[TeamRecord]) -> CaptureOutcome {
        self.history.capture(self.clock.today(), current)
    }

    /// [`observe`](Self::observe), then [`trend`](Self::trend).
    pub fn observe_and_trend(&self, current: &[TeamRecord], metrics: &[Metric]) -> TrendReport {
        self.observe(current);
        self.trend(current, metrics)
    }

    pub fn trend(&self, current: &[TeamRecord], metrics: &[Metric]) -> TrendReport {
        let captured = self.history.len();
        let baseline = if captured >= 2 {
            self.history.previous(self.clock.today())
        } else {
            None
        };
        let Some((day, previous)) = baseline else {
            return TrendReport {
                status: TrendStatus::NotYetAvailable { captured },
                metrics: metrics.to_vec(),
                rows: current
                    .iter()
                    .map(|rec| TrendRow {
                        team: rec.team.clone(),
                        deltas: metrics.iter().map(|m| (*m, Some(0.0))).collect(),
                    })
                    .collect(),
            };
        };

        let by_id: HashMap<TeamKey, &TeamRecord> = previous
            .iter()
            .filter_map(|r| r.id_key().map(|k| (k, r)))
            .collect();
        let by_name: HashMap<TeamKey, &TeamRecord> =
            previous.iter().map(|r| (r.name_key(), r)).collect();

        let rows = current
            .iter()
            .map(|rec| {
                let before = rec
                    .id_key()
                    .and_then(|k| by_id.get(&k))
                    .or_else(|| by_name.get(&rec.name_key()))
                    .copied();
                let deltas = metrics
                    .iter()
                    .map(|m| {
                        let delta = match (rec.get(*m), before.and_then(|b| b.get(*m))) {
                            (Some(now), Some(then)) => Some(now - then),
                            _ => None,
                        };
                        (*m, delta)
                    })
                    .collect();
                TrendRow {
                    team: rec.team.clone(),
                    deltas,
                }
            })
            .collect();

        TrendReport {
            status: TrendStatus::Available { baseline: day },
            metrics: metrics.to_vec(),
            rows,
        }
    }
}
