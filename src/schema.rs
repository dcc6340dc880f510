use std::collections::HashMap;
use std::fmt;

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use crate::error::SchemaError;
use crate::records::Metric;

/// The report shapes the league spreadsheet exports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ReportKind {
    Standings,
    AllPlay,
    Injuries,
    Power,
    Matchups,
    Transactions,
}

impl ReportKind {
    pub const ALL: [ReportKind; 6] = [
        ReportKind::Standings,
        ReportKind::AllPlay,
        ReportKind::Injuries,
        ReportKind::Power,
        ReportKind::Matchups,
        ReportKind::Transactions,
    ];

    pub fn key(self) -> &'static str {
        match self {
            ReportKind::Standings => "standings",
            ReportKind::AllPlay => "all-play",
            ReportKind::Injuries => "injuries",
            ReportKind::Power => "power",
            ReportKind::Matchups => "matchups",
            ReportKind::Transactions => "transactions",
        }
    }
}

impl fmt::Display for ReportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Canonical semantic fields a header can resolve to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Field {
    Team,
    TeamId,
    Metric(Metric),
    Week,
    Opponent,
    Points,
    Player,
    Status,
    Details,
}

impl Field {
    pub fn key(self) -> &'static str {
        match self {
            Field::Team => "team",
            Field::TeamId => "team_id",
            Field::Metric(m) => m.key(),
            Field::Week => "week",
            Field::Opponent => "opponent",
            Field::Points => "points",
            Field::Player => "player",
            Field::Status => "status",
            Field::Details => "details",
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Accepted header variants for one canonical field.
#[derive(Debug, Clone, Copy)]
pub struct FieldSpec {
    pub field: Field,
    /// Known header spellings, matched whole and case-insensitively first.
    pub exact: &'static [&'static str],
    /// Substring needles for the heuristic pass.
    pub contains: &'static [&'static str],
    pub excludes: &'static [&'static str],
    pub required: bool,
}

const fn synonyms(
    field: Field,
    exact: &'static [&'static str],
    contains: &'static [&'static str],
    excludes: &'static [&'static str],
    required: bool,
) -> FieldSpec {
    FieldSpec {
        field,
        exact,
        contains,
        excludes,
        required,
    }
}

const TEAM: FieldSpec = synonyms(
    Field::Team,
    &["team", "team name", "manager"],
    &["team"],
    &["id", "opp"],
    true,
);
const TEAM_ID: FieldSpec = synonyms(Field::TeamId, &["team_id", "team id", "id"], &[], &[], false);
const RANK: FieldSpec = synonyms(
    Field::Metric(Metric::Rank),
    &["rank", "rk", "#"],
    &["rank"],
    &[],
    false,
);
const WINS: FieldSpec = synonyms(Field::Metric(Metric::Wins), &["w", "wins"], &[], &[], false);
const LOSSES: FieldSpec = synonyms(
    Field::Metric(Metric::Losses),
    &["l", "losses"],
    &["loss"],
    &[],
    false,
);
const TIES: FieldSpec = synonyms(Field::Metric(Metric::Ties), &["t", "ties"], &["tie"], &[], false);
const WIN_PCT: FieldSpec = synonyms(
    Field::Metric(Metric::WinPct),
    &["win %", "win%", "win pct", "pct", "win percentage", "w%"],
    &["win", "pct", "%"],
    &[],
    true,
);
const POINTS_FOR: FieldSpec = synonyms(
    Field::Metric(Metric::PointsFor),
    &["pf", "points for", "pts for", "total pf"],
    &["points for"],
    &[],
    false,
);
const POINTS_AGAINST: FieldSpec = synonyms(
    Field::Metric(Metric::PointsAgainst),
    &["pa", "points against", "pts against"],
    &["points against"],
    &[],
    false,
);

const STANDINGS: &[FieldSpec] = &[
    RANK,
    TEAM_ID,
    TEAM,
    WINS,
    LOSSES,
    TIES,
    POINTS_FOR,
    POINTS_AGAINST,
    WIN_PCT,
];

const ALL_PLAY: &[FieldSpec] = &[
    TEAM_ID,
    TEAM,
    WINS,
    LOSSES,
    TIES,
    synonyms(
        Field::Metric(Metric::WinPct),
        &["win%", "win %", "all-play %", "all play %", "all-play win%", "pct"],
        &["win", "pct", "%"],
        &[],
        true,
    ),
];

const POWER: &[FieldSpec] = &[
    RANK,
    TEAM_ID,
    TEAM,
    synonyms(
        Field::Metric(Metric::RecentForm),
        &["recent form (3-wk avg)", "recent form"],
        &["form"],
        &[],
        false,
    ),
    synonyms(
        Field::Metric(Metric::RecentMargin),
        &["recent margin (3-wk avg)", "recent margin"],
        &["recent margin"],
        &[],
        false,
    ),
    synonyms(
        Field::Metric(Metric::AvgMargin),
        &["avg margin", "average margin"],
        &["margin"],
        &["recent"],
        false,
    ),
    synonyms(
        Field::Metric(Metric::AllPlayPct),
        &["all-play %", "all-play%", "all play %", "allplay %", "all-play"],
        &["all-play", "all play", "allplay"],
        &[],
        false,
    ),
    synonyms(
        Field::Metric(Metric::ActualWinPct),
        &[
            "actual win %",
            "actual win%",
            "actual win",
            "actual win percentage",
        ],
        &["actual"],
        &[],
        false,
    ),
    synonyms(
        Field::Metric(Metric::SosRemaining),
        &["sos remaining"],
        &["remaining"],
        &[],
        false,
    ),
    synonyms(
        Field::Metric(Metric::SosDelta),
        &["sos δ vs avg", "sos delta vs avg", "sos delta", "sos δ"],
        &["δ", "delta", "vs avg"],
        &[],
        false,
    ),
    synonyms(
        Field::Metric(Metric::SosPlayed),
        &["sos played", "sos (opp pf avg)", "sos"],
        &["sos", "opp pf", "schedule"],
        &["remaining", "δ", "delta"],
        false,
    ),
    synonyms(
        Field::Metric(Metric::PowerIndex),
        &["power index", "power", "pi"],
        &["power"],
        &[],
        true,
    ),
    POINTS_FOR,
];

const MATCHUPS: &[FieldSpec] = &[
    synonyms(Field::Week, &["week", "wk"], &["week"], &[], true),
    synonyms(Field::Opponent, &["opp", "opponent", "vs"], &["opp"], &[], true),
    synonyms(Field::Team, &["team"], &["team"], &["opp", "id"], true),
    synonyms(
        Field::Points,
        &["pts", "points", "score"],
        &["pts", "points", "score"],
        &["opp"],
        true,
    ),
];

const TRANSACTIONS: &[FieldSpec] = &[
    synonyms(Field::Team, &["team"], &["team"], &["id"], true),
    synonyms(
        Field::Details,
        &["details", "detail", "description"],
        &["detail"],
        &[],
        true,
    ),
    synonyms(Field::Status, &["status"], &[], &[], false),
];

const INJURIES: &[FieldSpec] = &[
    synonyms(Field::Team, &["team"], &["team"], &["id"], false),
    synonyms(Field::Player, &["player", "name"], &["player"], &[], false),
    synonyms(
        Field::Status,
        &["status", "injury status"],
        &["status", "injury"],
        &[],
        false,
    ),
];

/// The synonym table for one report shape.
pub fn field_specs(kind: ReportKind) -> &'static [FieldSpec] {
    match kind {
        ReportKind::Standings => STANDINGS,
        ReportKind::AllPlay => ALL_PLAY,
        ReportKind::Injuries => INJURIES,
        ReportKind::Power => POWER,
        ReportKind::Matchups => MATCHUPS,
        ReportKind::Transactions => TRANSACTIONS,
    }
}

/// Exact variants folded to lowercase once, keyed per report.
static EXACT_INDEX: Lazy<HashMap<(ReportKind, String), Field>> = Lazy::new(|| {
    let mut out = HashMap::new();
    for kind in ReportKind::ALL {
        for entry in field_specs(kind) {
            for variant in entry.exact {
                out.entry((kind, variant.to_lowercase()))
                    .or_insert(entry.field);
            }
        }
    }
    out
});

/// Trim, drop BOM and zero-width characters, turn non-breaking spaces into
/// plain ones, and collapse whitespace runs.
pub fn normalize_header(raw: &str) -> String {
    let cleaned: String = raw
        .chars()
        .filter(|c| !matches!(c, '\u{feff}' | '\u{200b}' | '\u{200c}' | '\u{200d}' | '\u{2060}'))
        .map(|c| match c {
            '\u{00a0}' | '\u{202f}' | '\u{2007}' => ' ',
            other => other,
        })
        .collect();
    cleaned.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Where each canonical field lives in a particular table.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnMap {
    pub report: ReportKind,
    /// Normalized headers, index-aligned with the source table.
    pub headers: Vec<String>,
    columns: HashMap<Field, usize>,
}

impl ColumnMap {
    pub fn index(&self, field: Field) -> Option<usize> {
        self.columns.get(&field).copied()
    }

    pub fn contains(&self, field: Field) -> bool {
        self.columns.contains_key(&field)
    }

    /// Metrics that resolved, in canonical order.
    pub fn metrics(&self) -> Vec<Metric> {
        Metric::ALL
            .into_iter()
            .filter(|m| self.contains(Field::Metric(*m)))
            .collect()
    }

    /// Headers no field claimed.
    pub fn unmatched(&self) -> Vec<&str> {
        self.headers
            .iter()
            .enumerate()
            .filter(|(idx, _)| !self.columns.values().any(|c| c == idx))
            .map(|(_, h)| h.as_str())
            .collect()
    }
}

/// Map raw headers to canonical fields for `kind`. Exact variants are applied
/// before substring matching, and each header is claimed at most once.
pub fn resolve(kind: ReportKind, headers: &[String]) -> Result<ColumnMap, SchemaError> {
    if headers.is_empty() {
        return Err(SchemaError::NoHeaders { report: kind });
    }
    let normalized: Vec<String> = headers.iter().map(|h| normalize_header(h)).collect();
    let lowered: Vec<String> = normalized.iter().map(|h| h.to_lowercase()).collect();
    let mut columns: HashMap<Field, usize> = HashMap::new();
    let mut claimed = vec![false; normalized.len()];

    for (idx, header) in lowered.iter().enumerate() {
        let Some(field) = EXACT_INDEX.get(&(kind, header.clone())) else {
            continue;
        };
        if columns.contains_key(field) {
            continue;
        }
        columns.insert(*field, idx);
        claimed[idx] = true;
    }

    for entry in field_specs(kind) {
        if columns.contains_key(&entry.field) || entry.contains.is_empty() {
            continue;
        }
        let hit = lowered.iter().enumerate().find(|(idx, header)| {
            !claimed[*idx]
                && entry.contains.iter().any(|n| header.contains(n))
                && !entry.excludes.iter().any(|e| header.contains(e))
        });
        if let Some((idx, _)) = hit {
            tracing::debug!(
                report = %kind,
                field = %entry.field,
                header = %normalized[idx],
                "resolved column by substring match"
            );
            columns.insert(entry.field, idx);
            claimed[idx] = true;
        }
    }

    let missing: Vec<Field> = field_specs(kind)
        .iter()
        .filter(|s| s.required && !columns.contains_key(&s.field))
        .map(|s| s.field)
        .collect();
    if !missing.is_empty() {
        tracing::warn!(report = %kind, ?missing, "required columns not found");
        return Err(SchemaError::MissingFields {
            report: kind,
            missing,
            headers: normalized,
        });
    }

    Ok(ColumnMap {
        report: kind,
        headers: normalized,
        columns,
    })
}
