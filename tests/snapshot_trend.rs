use std::sync::Arc;
use std::thread;

use chrono::NaiveDate;
use fantasy_dash::records::{Metric, TeamRecord};
use fantasy_dash::snapshot::{CaptureOutcome, FixedClock, SnapshotHistory, TrendStatus, TrendTracker};

fn day(d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 11, d).expect("valid date")
}

#[test]
fn concurrent_captures_store_one_snapshot_per_day() {
    let history = Arc::new(SnapshotHistory::new());
    let handles: Vec<_> = (0..8)
        .map(|i| {
            let history = Arc::clone(&history);
            thread::spawn(move || {
                let table = vec![TeamRecord::new("Alpha").with(Metric::WinPct, i as f64)];
                history.capture(day(3), &table)
            })
        })
        .collect();
    let outcomes: Vec<CaptureOutcome> = handles
        .into_iter()
        .map(|h| h.join().expect("capture thread should not panic"))
        .collect();

    let captured = outcomes
        .iter()
        .filter(|o| **o == CaptureOutcome::Captured)
        .count();
    assert_eq!(captured, 1);
    assert_eq!(history.keys(), vec![day(3)]);
}

#[test]
fn trend_uses_latest_earlier_day_and_reports_movers() {
    let history = Arc::new(SnapshotHistory::new());
    history.capture(
        day(1),
        &[
            TeamRecord::new("Alpha").with(Metric::WinPct, 10.0),
            TeamRecord::new("Bravo").with(Metric::WinPct, 10.0),
        ],
    );
    history.capture(
        day(2),
        &[
            TeamRecord::new("Alpha").with(Metric::WinPct, 50.0),
            TeamRecord::new("Bravo").with(Metric::WinPct, 60.0),
        ],
    );

    let tracker = TrendTracker::new(history, FixedClock(day(4)));
    let current = [
        TeamRecord::new("Alpha").with(Metric::WinPct, 58.0),
        TeamRecord::new("Bravo").with(Metric::WinPct, 56.0),
    ];
    assert_eq!(tracker.observe(&current), CaptureOutcome::Captured);
    assert_eq!(tracker.observe(&current), CaptureOutcome::AlreadyCaptured);

    let report = tracker.trend(&current, &[Metric::WinPct]);
    assert_eq!(report.status, TrendStatus::Available { baseline: day(2) });
    let riser = report.biggest_riser(Metric::WinPct).value().expect("riser");
    assert_eq!(riser.team, "Alpha");
    assert!((riser.change - 8.0).abs() < 1e-9);
    let faller = report.biggest_faller(Metric::WinPct).value().expect("faller");
    assert_eq!(faller.team, "Bravo");
    let avg = report.average_change(Metric::WinPct).value().expect("average");
    assert!((avg - 2.0).abs() < 1e-9);
}

#[test]
fn trend_joins_by_team_not_row_position() {
    let history = Arc::new(SnapshotHistory::new());
    history.capture(
        day(1),
        &[
            TeamRecord::new("Alpha").with(Metric::WinPct, 40.0),
            TeamRecord::new("Bravo").with(Metric::WinPct, 70.0),
            TeamRecord::new("Charlie").with(Metric::WinPct, 55.0),
        ],
    );

    let tracker = TrendTracker::new(history, FixedClock(day(2)));
    let reordered = [
        TeamRecord::new("Charlie").with(Metric::WinPct, 50.0),
        TeamRecord::new("Bravo").with(Metric::WinPct, 72.0),
        TeamRecord::new("Alpha").with(Metric::WinPct, 49.0),
    ];
    let report = tracker.observe_and_trend(&reordered, &[Metric::WinPct]);

    let deltas: Vec<(&str, Option<f64>)> = report
        .rows
        .iter()
        .map(|r| (r.team.as_str(), r.delta(Metric::WinPct)))
        .collect();
    assert_eq!(
        deltas,
        vec![("Charlie", Some(-5.0)), ("Bravo", Some(2.0)), ("Alpha", Some(9.0))]
    );
    let riser = report.biggest_riser(Metric::WinPct).value().expect("riser");
    assert_eq!(riser.team, "Alpha");
    let faller = report.biggest_faller(Metric::WinPct).value().expect("faller");
    assert_eq!(faller.team, "Charlie");
}
