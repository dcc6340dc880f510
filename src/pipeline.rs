use std::collections::HashMap;
use std::sync::Arc;

use anyhow::Result;

use crate::bracket::{Bracket, build_bracket};
use crate::cluster::{ClusterReport, DEFAULT_FEATURES, RadarProfile, cluster_teams, radar_profiles};
use crate::config::PipelineConfig;
use crate::derived::{
    CORRELATION_METRICS, CorrelationRow, Leader, LuckRow, PowerSummary, correlations_with,
    luck_leaderboard, power_summary,
};
use crate::error::{Aggregate, InsufficientData, SchemaError, Warning};
use crate::injuries::InjuryReport;
use crate::matchups::{
    self, MatchupRow, SeasonTotals, WeekPairing, pair_week, parse_matchup_rows, season_totals,
};
use crate::normalize::normalize_report;
use crate::ranking::{PowerRanking, RankKind, RankedRecord, rank_power, rank_schedule, rank_standings};
use crate::records::{Metric, NormalizedTable, TeamRecord};
use crate::schema::ReportKind;
use crate::snapshot::{CaptureOutcome, PeriodClock, SnapshotHistory, SystemClock, TrendReport, TrendTracker};
use crate::table::{OutputTable, RawTable, Tabular};
use crate::transactions::{MoveCount, TransactionLog, completed_moves};

/// Fetches one raw report. Implemented by whatever talks to the spreadsheet.
pub trait ReportSource {
    fn load(&self, kind: ReportKind) -> Result<RawTable>;
}

/// Every raw report for one load cycle. Reports that failed to load are empty.
#[derive(Debug, Clone, Default)]
pub struct LeagueData {
    tables: HashMap<ReportKind, RawTable>,
}

impl LeagueData {
    pub fn insert(&mut self, kind: ReportKind, table: RawTable) {
        self.tables.insert(kind, table);
    }

    pub fn get(&self, kind: ReportKind) -> Option<&RawTable> {
        self.tables.get(&kind)
    }
}

/// Load every report kind. A failed load is logged and replaced by an empty
/// table so the other reports still render.
pub fn load_all(source: &dyn ReportSource) -> LeagueData {
    let mut data = LeagueData::default();
    for kind in ReportKind::ALL {
        let table = match source.load(kind) {
            Ok(table) => table,
            Err(err) => {
                tracing::warn!(report = %kind, error = %format!("{err:#}"), "report failed to load");
                RawTable::default()
            }
        };
        data.insert(kind, table);
    }
    data
}

#[derive(Debug, Clone, PartialEq)]
pub struct StandingsReport {
    pub normalized: NormalizedTable,
    pub ranked: Vec<RankedRecord>,
    pub bracket: Result<Bracket, InsufficientData>,
}

impl StandingsReport {
    pub fn to_table(&self) -> OutputTable {
        crate::ranking::ranked_table(&self.ranked, &[RankKind::Standing], &self.normalized.metrics)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AllPlayReport {
    pub normalized: NormalizedTable,
    /// Rows with a win percentage, best first.
    pub ranked: Vec<RankedRecord>,
    pub capture: CaptureOutcome,
    pub trend: TrendReport,
    pub top: Aggregate<Leader>,
    pub lowest: Aggregate<Leader>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PowerReport {
    pub normalized: NormalizedTable,
    pub ranking: PowerRanking,
    pub summary: PowerSummary,
    pub luck: Vec<LuckRow>,
}

impl PowerReport {
    pub fn to_table(&self) -> OutputTable {
        crate::ranking::ranked_table(&self.ranking.rows, &[RankKind::Power], &self.normalized.metrics)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AdvancedReport {
    pub correlations: Vec<CorrelationRow>,
    pub luck: Vec<LuckRow>,
    pub clusters: ClusterReport,
    pub schedule: Vec<RankedRecord>,
    pub radar: Vec<RadarProfile>,
}

impl AdvancedReport {
    pub fn schedule_table(&self) -> OutputTable {
        crate::ranking::ranked_table(
            &self.schedule,
            &[RankKind::SosPlayed, RankKind::SosRemaining, RankKind::SosDelta],
            &[Metric::SosPlayed, Metric::SosRemaining, Metric::SosDelta],
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MatchupReport {
    pub rows: Vec<MatchupRow>,
    pub weeks: Vec<u32>,
    /// The week shown: the requested one, else the latest scored week.
    pub week: Option<u32>,
    pub pairing: Option<WeekPairing>,
    pub totals: Vec<SeasonTotals>,
    pub warnings: Vec<Warning>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TransactionsReport {
    pub log: TransactionLog,
    pub counts: Vec<MoveCount>,
}

/// One entry point per report. The only state carried between calls is the
/// snapshot history behind the all-play trend.
pub struct Pipeline<C: PeriodClock = SystemClock> {
    config: PipelineConfig,
    tracker: TrendTracker<C>,
}

impl Pipeline<SystemClock> {
    pub fn new(config: PipelineConfig) -> Self {
        Self::with_clock(config, Arc::new(SnapshotHistory::new()), SystemClock)
    }
}

impl<C: PeriodClock> Pipeline<C> {
    pub fn with_clock(config: PipelineConfig, history: Arc<SnapshotHistory>, clock: C) -> Self {
        Self {
            config,
            tracker: TrendTracker::new(history, clock),
        }
    }

    pub fn history(&self) -> &Arc<SnapshotHistory> {
        self.tracker.history()
    }

    pub fn standings(&self, raw: &RawTable) -> Result<StandingsReport, SchemaError> {
        let normalized = normalize_report(raw, ReportKind::Standings)?;
        let ranked = rank_standings(&normalized.records);
        let bracket = build_bracket(&ranked, self.config.playoff_seeds);
        Ok(StandingsReport {
            normalized,
            ranked,
            bracket,
        })
    }

    /// Normalize, snapshot today's table if not done yet, and compare with the
    /// previous day.
    pub fn all_play(&self, raw: &RawTable) -> Result<AllPlayReport, SchemaError> {
        let normalized = normalize_report(raw, ReportKind::AllPlay)?;
        let scored: Vec<TeamRecord> = normalized
            .records
            .iter()
            .filter(|r| r.get(Metric::WinPct).is_some())
            .cloned()
            .collect();
        let ranked = rank_standings(&scored);
        let ordered: Vec<TeamRecord> = ranked.iter().map(|r| r.record.clone()).collect();
        let capture = self.tracker.observe(&ordered);
        let trend = self.tracker.trend(&ordered, &[Metric::WinPct]);
        let leader = |row: Option<&RankedRecord>| -> Aggregate<Leader> {
            row.and_then(|r| {
                r.record.get(Metric::WinPct).map(|value| Leader {
                    team: r.record.team.clone(),
                    value,
                })
            })
            .into()
        };
        Ok(AllPlayReport {
            top: leader(ranked.first()),
            lowest: leader(ranked.last()),
            normalized,
            ranked,
            capture,
            trend,
        })
    }

    pub fn power(&self, raw: &RawTable) -> Result<PowerReport, SchemaError> {
        let normalized = normalize_report(raw, ReportKind::Power)?;
        let ranking = rank_power(&normalized.records);
        let ordered: Vec<TeamRecord> = ranking.rows.iter().map(|r| r.record.clone()).collect();
        let summary = power_summary(&ordered);
        let luck = luck_leaderboard(&normalized.records);
        Ok(PowerReport {
            normalized,
            ranking,
            summary,
            luck,
        })
    }

    /// Correlations, luck, clusters and schedule ranks, all off the power sheet.
    pub fn advanced(&self, raw: &RawTable) -> Result<AdvancedReport, SchemaError> {
        let normalized = normalize_report(raw, ReportKind::Power)?;
        let records = &normalized.records;
        Ok(AdvancedReport {
            correlations: correlations_with(records, &CORRELATION_METRICS, Metric::PowerIndex),
            luck: luck_leaderboard(records),
            clusters: cluster_teams(records, &DEFAULT_FEATURES, &self.config.cluster),
            schedule: rank_schedule(records),
            radar: radar_profiles(records, &DEFAULT_FEATURES),
        })
    }

    pub fn matchups(&self, raw: &RawTable, week: Option<u32>) -> Result<MatchupReport, SchemaError> {
        let (rows, mut warnings) = parse_matchup_rows(raw)?;
        let weeks = matchups::weeks(&rows);
        let week = week
            .or_else(|| matchups::latest_scored_week(&rows))
            .or_else(|| weeks.last().copied());
        let pairing = week.map(|w| pair_week(&rows, w));
        if let Some(warning) = pairing.as_ref().and_then(|p| p.warning.clone()) {
            warnings.push(warning);
        }
        let totals = season_totals(&rows);
        Ok(MatchupReport {
            rows,
            weeks,
            week,
            pairing,
            totals,
            warnings,
        })
    }

    pub fn transactions(&self, raw: &RawTable) -> Result<TransactionsReport, SchemaError> {
        let log = completed_moves(raw)?;
        let counts = log.move_counts();
        Ok(TransactionsReport { log, counts })
    }

    pub fn injuries(&self, raw: &RawTable) -> InjuryReport {
        InjuryReport::new(raw.clone())
    }

    /// Every report for one load cycle. An empty source table skips its report.
    pub fn run(&self, data: &LeagueData) -> LeagueReport {
        let present = |kind| data.get(kind).filter(|t| !t.headers.is_empty());
        LeagueReport {
            standings: present(ReportKind::Standings).map(|raw| self.standings(raw)),
            all_play: present(ReportKind::AllPlay).map(|raw| self.all_play(raw)),
            power: present(ReportKind::Power).map(|raw| self.power(raw)),
            advanced: present(ReportKind::Power).map(|raw| self.advanced(raw)),
            matchups: present(ReportKind::Matchups).map(|raw| self.matchups(raw, None)),
            transactions: present(ReportKind::Transactions).map(|raw| self.transactions(raw)),
            injuries: present(ReportKind::Injuries).map(|raw| self.injuries(raw)),
        }
    }
}

/// Results of [`Pipeline::run`]. `None` means the source had nothing to show;
/// `Some(Err(_))` means its headers didn't match and the raw table should be
/// shown instead.
#[derive(Debug, Clone, PartialEq)]
pub struct LeagueReport {
    pub standings: Option<Result<StandingsReport, SchemaError>>,
    pub all_play: Option<Result<AllPlayReport, SchemaError>>,
    pub power: Option<Result<PowerReport, SchemaError>>,
    pub advanced: Option<Result<AdvancedReport, SchemaError>>,
    pub matchups: Option<Result<MatchupReport, SchemaError>>,
    pub transactions: Option<Result<TransactionsReport, SchemaError>>,
    pub injuries: Option<InjuryReport>,
}

impl LeagueReport {
    /// Every result table, named for export.
    pub fn tables(&self) -> Vec<(&'static str, OutputTable)> {
        let mut out = Vec::new();
        if let Some(Ok(r)) = &self.standings {
            out.push(("standings", r.to_table()));
            if let Ok(bracket) = &r.bracket {
                out.push(("bracket", bracket.to_table()));
            }
        }
        if let Some(Ok(r)) = &self.all_play {
            out.push((
                "all_play",
                crate::ranking::ranked_table(&r.ranked, &[RankKind::Standing], &r.normalized.metrics),
            ));
            out.push(("all_play_trend", r.trend.to_table()));
        }
        if let Some(Ok(r)) = &self.power {
            out.push(("power", r.to_table()));
        }
        if let Some(Ok(r)) = &self.advanced {
            out.push(("correlations", r.correlations.to_table()));
            out.push(("luck", r.luck.to_table()));
            out.push(("clusters", r.clusters.to_table()));
            out.push(("schedule", r.schedule_table()));
        }
        if let Some(Ok(r)) = &self.matchups {
            if let Some(pairing) = &r.pairing {
                out.push(("matchups", pairing.pairs.to_table()));
            }
            out.push(("season_totals", r.totals.to_table()));
        }
        if let Some(Ok(r)) = &self.transactions {
            out.push(("transactions", r.log.for_team(None).to_output()));
            out.push(("move_counts", r.counts.to_table()));
        }
        if let Some(r) = &self.injuries {
            out.push(("injuries", r.table.to_output()));
        }
        out
    }

    /// Every soft warning and schema failure, prefixed with its report.
    pub fn warnings(&self) -> Vec<String> {
        fn collect<T>(
            out: &mut Vec<String>,
            kind: ReportKind,
            result: &Option<Result<T, SchemaError>>,
            warnings: impl Fn(&T) -> Vec<Warning>,
        ) {
            match result {
                Some(Ok(report)) => {
                    out.extend(warnings(report).iter().map(|w| format!("{kind}: {w}")));
                }
                Some(Err(err)) => out.push(err.to_string()),
                None => {}
            }
        }
        let mut out = Vec::new();
        collect(&mut out, ReportKind::Standings, &self.standings, |r| {
            r.normalized.warnings.clone()
        });
        collect(&mut out, ReportKind::AllPlay, &self.all_play, |r| {
            r.normalized.warnings.clone()
        });
        collect(&mut out, ReportKind::Power, &self.power, |r| {
            r.normalized.warnings.clone()
        });
        collect(&mut out, ReportKind::Matchups, &self.matchups, |r| r.warnings.clone());
        collect(&mut out, ReportKind::Transactions, &self.transactions, |_| Vec::new());
        out
    }
}
