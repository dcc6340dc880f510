use fantasy_dash::error::{SchemaError, Warning};
use fantasy_dash::normalize::normalize_report;
use fantasy_dash::ranking::{RankKind, rank_schedule, rank_standings};
use fantasy_dash::records::Metric;
use fantasy_dash::schema::ReportKind;
use fantasy_dash::table::RawTable;

#[test]
fn messy_standings_export_normalizes_and_ranks() {
    let csv = "\u{feff}Team\u{00a0}Name, W ,L,Win%,PF\n\
               Alpha,9,3,0.75,\"1,402.5\"\n\
               Bravo,9,3,0.75,1300\n\
               Charlie,6,6,0.5,1250\n\
               ,1,11,0.08,900\n\
               Delta,3,9,0.25,TBD\n";
    let raw = RawTable::from_csv_str(csv).expect("csv should parse");
    let table = normalize_report(&raw, ReportKind::Standings).expect("standings should resolve");

    assert_eq!(table.records.len(), 4);
    assert_eq!(table.column(Metric::WinPct), vec![Some(75.0), Some(75.0), Some(50.0), Some(25.0)]);
    assert_eq!(table.find("alpha").and_then(|r| r.get(Metric::PointsFor)), Some(1402.5));
    assert!(table.warnings.contains(&Warning::MissingTeam { row: 3 }));
    assert!(table.warnings.iter().any(|w| matches!(w, Warning::Parse { row: 4, raw, .. } if raw == "TBD")));

    let ranked = rank_standings(&table.records);
    let ranks: Vec<(&str, Option<u32>)> = ranked
        .iter()
        .map(|r| (r.record.team.as_str(), r.rank(RankKind::Standing)))
        .collect();
    assert_eq!(
        ranks,
        vec![
            ("Alpha", Some(1)),
            ("Bravo", Some(1)),
            ("Charlie", Some(3)),
            ("Delta", Some(4)),
        ]
    );
}

#[test]
fn schedule_ranks_are_independent_per_dimension() {
    let raw = RawTable::from_text_rows(
        &["Team", "SoS Played", "SoS Remaining", "SoS Δ vs Avg", "Power Index"],
        &[
            &["Alpha", "110", "95", "2.5", "80"],
            &["Bravo", "100", "105", "-1.0", "70"],
            &["Charlie", "110", "", "2.5", "60"],
        ],
    );
    let table = normalize_report(&raw, ReportKind::Power).expect("power should resolve");
    let ranked = rank_schedule(&table.records);
    assert_eq!(ranked[0].rank(RankKind::SosPlayed), Some(1));
    assert_eq!(ranked[2].rank(RankKind::SosPlayed), Some(1));
    assert_eq!(ranked[1].rank(RankKind::SosPlayed), Some(3));
    assert_eq!(ranked[1].rank(RankKind::SosRemaining), Some(1));
    assert_eq!(ranked[2].rank(RankKind::SosRemaining), None);
    assert_eq!(ranked[1].rank(RankKind::SosDelta), Some(3));
}

#[test]
fn unresolvable_report_is_a_schema_error() {
    let raw = RawTable::from_text_rows(&["Player", "Yards"], &[&["X", "10"]]);
    let err = normalize_report(&raw, ReportKind::Standings).unwrap_err();
    assert!(matches!(err, SchemaError::MissingFields { report: ReportKind::Standings, .. }));
    assert!(err.to_string().contains("standings"));
}
