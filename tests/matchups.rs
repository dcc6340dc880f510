use fantasy_dash::error::Warning;
use fantasy_dash::matchups::{MatchupRow, pair_all, parse_matchup_rows, season_totals};
use fantasy_dash::table::RawTable;

const ROUND_ROBIN: &str = "\
week,team,opp,pts
1,A,B,100
1,B,A,90
2,A,C,80
2,C,A,85
3,B,C,95
3,C,B,100
";

fn totals_for<'a>(
    totals: &'a [fantasy_dash::matchups::SeasonTotals],
    team: &str,
) -> &'a fantasy_dash::matchups::SeasonTotals {
    totals
        .iter()
        .find(|t| t.team == team)
        .expect("team should have totals")
}

#[test]
fn season_totals_reconcile_across_the_league() {
    let raw = RawTable::from_csv_str(ROUND_ROBIN).expect("csv should parse");
    let (rows, warnings) = parse_matchup_rows(&raw).expect("matchup headers should resolve");
    assert!(warnings.is_empty());

    let totals = season_totals(&rows);
    let a = totals_for(&totals, "A");
    assert_eq!((a.points_for, a.points_against), (180.0, 175.0));
    let b = totals_for(&totals, "B");
    assert_eq!((b.points_for, b.points_against), (185.0, 200.0));
    let c = totals_for(&totals, "C");
    assert_eq!((c.points_for, c.points_against), (185.0, 175.0));

    let pf: f64 = totals.iter().map(|t| t.points_for).sum();
    let pa: f64 = totals.iter().map(|t| t.points_against).sum();
    assert_eq!(pf, pa);
    assert_eq!(totals[0].team, "C");
    assert_eq!(totals[2].team, "B");
}

#[test]
fn team_seen_only_as_opponent_still_gets_totals() {
    let rows = vec![MatchupRow::new(1, "A", "Ghost", Some(77.0))];
    let totals = season_totals(&rows);
    let ghost = totals_for(&totals, "Ghost");
    assert_eq!(ghost.points_for, 0.0);
    assert_eq!(ghost.points_against, 77.0);
}

#[test]
fn every_week_pairs_once_per_game() {
    let raw = RawTable::from_csv_str(ROUND_ROBIN).expect("csv should parse");
    let (rows, _) = parse_matchup_rows(&raw).expect("matchup headers should resolve");
    let weeks = pair_all(&rows);
    assert_eq!(weeks.len(), 3);
    for week in &weeks {
        assert_eq!(week.pairs.len(), 1, "week {}", week.week);
        assert!(week.warning.is_none());
    }
    let week2 = &weeks[1].pairs[0];
    assert_eq!(week2.team, "A");
    assert_eq!(week2.winner.as_deref(), Some("C"));
    assert_eq!(week2.margin, Some(5.0));
}

#[test]
fn bad_week_and_points_cells_become_warnings() {
    let raw = RawTable::from_text_rows(
        &["Week", "Team", "Opponent", "Points"],
        &[
            &["1", "A", "B", "n/a"],
            &["one", "B", "A", "90"],
            &["1", "", "A", "90"],
        ],
    );
    let (rows, warnings) = parse_matchup_rows(&raw).expect("matchup headers should resolve");
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].points, None);
    assert_eq!(warnings.len(), 3);
    assert!(matches!(&warnings[0], Warning::Parse { row: 0, raw, .. } if raw == "n/a"));
    assert!(matches!(&warnings[1], Warning::Parse { row: 1, .. }));
    assert!(matches!(warnings[2], Warning::MissingTeam { row: 2 }));
}
