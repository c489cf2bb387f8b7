// CSV import of players and weekly stats, and template export.
//
// Imports are row-by-row: a bad row is recorded with its line number and the
// rest of the file still loads.

use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;
use tracing::{info, warn};

use gridiron_core::db::Database;
use gridiron_core::error::FantasyError;
use gridiron_core::model::{Player, Position, ScoringFormat, StatLine, WeeklyStat};

use crate::scoring::fantasy_points;

pub const PLAYERS_TEMPLATE: &str = "players_template.csv";
pub const STATS_TEMPLATE: &str = "stats_template.csv";

pub const PLAYER_HEADERS: [&str; 4] = ["player_id", "name", "team", "position"];
pub const STAT_HEADERS: [&str; 13] = [
    "player_id",
    "week",
    "season",
    "passing_yards",
    "passing_tds",
    "interceptions",
    "rushing_yards",
    "rushing_tds",
    "receptions",
    "receiving_yards",
    "receiving_tds",
    "fumbles",
    "fantasy_points",
];

/// File-level failures. Row-level problems end up in `ImportReport::errors`.
#[derive(Debug, Error)]
pub enum CsvError {
    #[error("failed to open {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("CSV error in {path}: {source}")]
    Csv { path: String, source: csv::Error },
}

#[derive(Debug)]
pub struct RowError {
    /// 1-based line in the source file.
    pub line: u64,
    pub error: FantasyError,
}

#[derive(Debug, Default)]
pub struct ImportReport {
    pub imported: usize,
    pub errors: Vec<RowError>,
}

/// Week/season applied to stat rows that leave those columns blank.
#[derive(Debug, Clone, Copy, Default)]
pub struct StatDefaults {
    pub week: Option<u32>,
    pub season: Option<i32>,
}

// ---------------------------------------------------------------------------
// Raw CSV serde structs (private)
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct RawPlayerRow {
    player_id: String,
    name: String,
    #[serde(default)]
    team: String,
    position: String,
}

#[derive(Debug, Deserialize)]
struct RawStatRow {
    player_id: String,
    #[serde(default)]
    week: Option<u32>,
    #[serde(default)]
    season: Option<i32>,
    #[serde(default)]
    passing_yards: Option<f64>,
    #[serde(default)]
    passing_tds: Option<u32>,
    #[serde(default)]
    interceptions: Option<u32>,
    #[serde(default)]
    rushing_yards: Option<f64>,
    #[serde(default)]
    rushing_tds: Option<u32>,
    #[serde(default)]
    receptions: Option<u32>,
    #[serde(default)]
    receiving_yards: Option<f64>,
    #[serde(default)]
    receiving_tds: Option<u32>,
    #[serde(default)]
    fumbles: Option<u32>,
    #[serde(default)]
    fantasy_points: Option<f64>,
}

impl RawPlayerRow {
    fn into_player(self) -> Result<Player, FantasyError> {
        let player_id = self.player_id.trim().to_string();
        let name = self.name.trim().to_string();
        if player_id.is_empty() || name.is_empty() {
            return Err(FantasyError::InvalidInput(
                "player_id and name are required".into(),
            ));
        }
        let position = Position::from_str_pos(&self.position).ok_or_else(|| {
            FantasyError::InvalidInput(format!("unknown position '{}'", self.position.trim()))
        })?;
        let team = match self.team.trim() {
            "" => "FA".to_string(),
            t => t.to_uppercase(),
        };
        Ok(Player {
            player_id,
            name,
            team,
            position,
        })
    }
}

impl RawStatRow {
    fn into_stat(
        self,
        defaults: StatDefaults,
        format: ScoringFormat,
    ) -> Result<WeeklyStat, FantasyError> {
        let player_id = self.player_id.trim().to_string();
        if player_id.is_empty() {
            return Err(FantasyError::InvalidInput("player_id is required".into()));
        }
        let week = self
            .week
            .or(defaults.week)
            .ok_or_else(|| FantasyError::InvalidInput("week is missing".into()))?;
        let season = self
            .season
            .or(defaults.season)
            .ok_or_else(|| FantasyError::InvalidInput("season is missing".into()))?;

        let line = StatLine {
            passing_yards: self.passing_yards.unwrap_or(0.0),
            passing_tds: self.passing_tds.unwrap_or(0),
            interceptions: self.interceptions.unwrap_or(0),
            rushing_yards: self.rushing_yards.unwrap_or(0.0),
            rushing_tds: self.rushing_tds.unwrap_or(0),
            receptions: self.receptions.unwrap_or(0),
            receiving_yards: self.receiving_yards.unwrap_or(0.0),
            receiving_tds: self.receiving_tds.unwrap_or(0),
            fumbles: self.fumbles.unwrap_or(0),
        };
        let points = self
            .fantasy_points
            .unwrap_or_else(|| fantasy_points(&line, format));

        Ok(WeeklyStat {
            player_id,
            week,
            season,
            line,
            fantasy_points: points,
        })
    }
}

// ---------------------------------------------------------------------------
// Reader-based importers
// ---------------------------------------------------------------------------

/// Import players from CSV with columns `player_id,name,team,position`.
/// Existing players are updated in place.
pub fn import_players_from_reader<R: Read>(
    db: &Database,
    rdr: R,
) -> Result<ImportReport, csv::Error> {
    let mut reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(rdr);
    let headers = reader.headers()?.clone();
    let mut report = ImportReport::default();

    for record in reader.records() {
        let record = match record {
            Ok(record) => record,
            Err(e) => {
                let line = e.position().map_or(0, |p| p.line());
                warn!("skipping malformed player row at line {}: {}", line, e);
                report.errors.push(RowError {
                    line,
                    error: FantasyError::InvalidInput(e.to_string()),
                });
                continue;
            }
        };
        let line = record.position().map_or(0, |p| p.line());

        let result = record
            .deserialize::<RawPlayerRow>(Some(&headers))
            .map_err(|e| FantasyError::InvalidInput(e.to_string()))
            .and_then(RawPlayerRow::into_player)
            .and_then(|player| db.upsert_player(&player).map_err(FantasyError::from));

        match result {
            Ok(()) => report.imported += 1,
            Err(error) => {
                warn!("skipping player row at line {}: {}", line, error);
                report.errors.push(RowError { line, error });
            }
        }
    }

    info!(
        "Imported {} players ({} rows skipped)",
        report.imported,
        report.errors.len()
    );
    Ok(report)
}

/// Import weekly stats. Rows for players not in the database fail with
/// `NotFound`; blank `fantasy_points` are computed under `format`.
pub fn import_stats_from_reader<R: Read>(
    db: &Database,
    rdr: R,
    defaults: StatDefaults,
    format: ScoringFormat,
) -> Result<ImportReport, csv::Error> {
    let mut reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(rdr);
    let headers = reader.headers()?.clone();
    let mut report = ImportReport::default();

    for record in reader.records() {
        let record = match record {
            Ok(record) => record,
            Err(e) => {
                let line = e.position().map_or(0, |p| p.line());
                warn!("skipping malformed stat row at line {}: {}", line, e);
                report.errors.push(RowError {
                    line,
                    error: FantasyError::InvalidInput(e.to_string()),
                });
                continue;
            }
        };
        let line = record.position().map_or(0, |p| p.line());

        let result = record
            .deserialize::<RawStatRow>(Some(&headers))
            .map_err(|e| FantasyError::InvalidInput(e.to_string()))
            .and_then(|raw| raw.into_stat(defaults, format))
            .and_then(|stat| {
                if db.get_player(&stat.player_id)?.is_none() {
                    return Err(FantasyError::NotFound(format!("player {}", stat.player_id)));
                }
                db.upsert_player_stats(&stat)?;
                Ok(())
            });

        match result {
            Ok(()) => report.imported += 1,
            Err(error) => {
                warn!("skipping stat row at line {}: {}", line, error);
                report.errors.push(RowError { line, error });
            }
        }
    }

    info!(
        "Imported {} stat records ({} rows skipped)",
        report.imported,
        report.errors.len()
    );
    Ok(report)
}

// ---------------------------------------------------------------------------
// Path-based importers
// ---------------------------------------------------------------------------

fn open(path: &Path) -> Result<File, CsvError> {
    File::open(path).map_err(|e| CsvError::Io {
        path: path.display().to_string(),
        source: e,
    })
}

pub fn import_players(db: &Database, path: &Path) -> Result<ImportReport, CsvError> {
    import_players_from_reader(db, open(path)?).map_err(|e| CsvError::Csv {
        path: path.display().to_string(),
        source: e,
    })
}

pub fn import_stats(
    db: &Database,
    path: &Path,
    defaults: StatDefaults,
    format: ScoringFormat,
) -> Result<ImportReport, CsvError> {
    import_stats_from_reader(db, open(path)?, defaults, format).map_err(|e| CsvError::Csv {
        path: path.display().to_string(),
        source: e,
    })
}

// ---------------------------------------------------------------------------
// Templates
// ---------------------------------------------------------------------------

fn write_template(path: &Path, headers: &[&str], rows: &[&[&str]]) -> Result<(), CsvError> {
    let csv_err = |e: csv::Error| CsvError::Csv {
        path: path.display().to_string(),
        source: e,
    };
    let mut writer = csv::Writer::from_path(path).map_err(csv_err)?;
    writer.write_record(headers).map_err(csv_err)?;
    for row in rows {
        writer.write_record(*row).map_err(csv_err)?;
    }
    writer.flush().map_err(|e| CsvError::Io {
        path: path.display().to_string(),
        source: e,
    })
}

/// Write `players_template.csv` and `stats_template.csv` into `dir`.
pub fn export_templates(dir: &Path) -> Result<Vec<PathBuf>, CsvError> {
    let players_path = dir.join(PLAYERS_TEMPLATE);
    write_template(
        &players_path,
        &PLAYER_HEADERS,
        &[
            &["mahomes_patrick", "Patrick Mahomes", "KC", "QB"],
            &["mccaffrey_christian", "Christian McCaffrey", "SF", "RB"],
        ],
    )?;

    let stats_path = dir.join(STATS_TEMPLATE);
    write_template(
        &stats_path,
        &STAT_HEADERS,
        &[&[
            "mahomes_patrick",
            "1",
            "2024",
            "291",
            "2",
            "1",
            "5",
            "0",
            "0",
            "0",
            "0",
            "0",
            "18.14",
        ]],
    )?;

    info!("Wrote CSV templates to {}", dir.display());
    Ok(vec![players_path, stats_path])
}
