use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use tracing_subscriber::EnvFilter;

use fantasy_dash::config::PipelineConfig;
use fantasy_dash::export::{write_csv_dir, write_workbook};
use fantasy_dash::pipeline::{Pipeline, ReportSource, load_all};
use fantasy_dash::schema::ReportKind;
use fantasy_dash::table::RawTable;

/// Reads `<dir>/<report>.csv`, e.g. `standings.csv` or `all-play.csv`.
struct CsvDir {
    dir: PathBuf,
}

impl ReportSource for CsvDir {
    fn load(&self, kind: ReportKind) -> Result<RawTable> {
        let path = self.dir.join(format!("{}.csv", kind.key()));
        let file = fs::File::open(&path).with_context(|| format!("open {}", path.display()))?;
        RawTable::from_csv_reader(file).with_context(|| format!("parse {}", path.display()))
    }
}

fn main() -> Result<()> {
    let _ = dotenvy::from_filename(".env.local");
    let _ = dotenvy::from_filename(".env");
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let mut args = std::env::args().skip(1);
    let input = args.next().map(PathBuf::from).unwrap_or_else(|| PathBuf::from("data"));
    let output = args.next().map(PathBuf::from).unwrap_or_else(|| PathBuf::from("out"));

    let config = PipelineConfig::from_env();
    let pipeline = Pipeline::new(config);
    let data = load_all(&CsvDir { dir: input });
    let report = pipeline.run(&data);

    for warning in report.warnings() {
        println!("warning: {warning}");
    }
    if let Some(Ok(standings)) = &report.standings {
        if let Some(top) = standings.ranked.first() {
            println!("Standings leader: {}", top.record.team);
        }
    }
    if let Some(Ok(power)) = &report.power {
        if let Some(top) = &power.summary.top_team {
            println!("Power #1: {top}");
        }
    }
    if let Some(Ok(matchups)) = &report.matchups {
        if let Some(week) = matchups.week {
            let games = matchups.pairing.as_ref().map_or(0, |p| p.pairs.len());
            println!("Week {week}: {games} matchups");
        }
    }

    let tables = report.tables();
    let written = write_csv_dir(&output, &tables)?;
    let workbook = output.join("league_report.xlsx");
    write_workbook(&workbook, &tables)?;
    println!(
        "Wrote {} tables to {} and {}",
        written.len(),
        output.display(),
        workbook.display()
    );
    Ok(())
}
