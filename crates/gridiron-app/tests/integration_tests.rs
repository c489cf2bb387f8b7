// Integration tests for the gridiron app layer.
//
// These drive the refresh service and the interactive menu against an
// in-memory database and a scripted stats source, so nothing touches the
// network.

use std::collections::HashMap;
use std::sync::Mutex;

use chrono::NaiveDate;

use async_trait::async_trait;

use gridiron_app::fetch::{SourceStat, StatsSource, FIRST_WEEK, LAST_WEEK};
use gridiron_app::menu::Menu;
use gridiron_app::refresh::{scheduled_refresh, RefreshService};
use gridiron_core::config::*;
use gridiron_core::db::Database;
use gridiron_core::error::{FantasyError, Result};
use gridiron_core::model::{Player, Position, ScoringFormat, StatLine, WeeklyStat};

const SEASON: i32 = 2024;

// ===========================================================================
// Test helpers
// ===========================================================================

/// Scripted `StatsSource`. `current_week: None` makes the week lookup fail,
/// `offline` makes every call fail.
#[derive(Default)]
struct FakeSource {
    players: Vec<Player>,
    weeks: HashMap<u32, Vec<SourceStat>>,
    current_week: Option<u32>,
    offline: bool,
    /// Seasons requested from `fetch_week_stats`, in call order.
    seasons: Mutex<Vec<i32>>,
}

#[async_trait]
impl StatsSource for FakeSource {
    async fn fetch_players(&self) -> Result<Vec<Player>> {
        if self.offline {
            return Err(FantasyError::ExternalService("connection refused".into()));
        }
        Ok(self.players.clone())
    }

    async fn fetch_week_stats(&self, season: i32, week: u32) -> Result<Vec<SourceStat>> {
        self.seasons.lock().unwrap().push(season);
        if self.offline {
            return Err(FantasyError::ExternalService("connection refused".into()));
        }
        Ok(self.weeks.get(&week).cloned().unwrap_or_default())
    }

    async fn current_week(&self) -> Result<u32> {
        self.current_week
            .ok_or_else(|| FantasyError::ExternalService("scoreboard unavailable".into()))
    }
}

fn player(id: &str, name: &str, team: &str, position: Position) -> Player {
    Player {
        player_id: id.into(),
        name: name.into(),
        team: team.into(),
        position,
    }
}

fn receiving(receptions: u32, yards: f64, tds: u32) -> StatLine {
    StatLine {
        receptions,
        receiving_yards: yards,
        receiving_tds: tds,
        ..StatLine::default()
    }
}

fn inline_config() -> Config {
    Config {
        league: LeagueConfig {
            size: 12,
            scoring_format: ScoringFormat::Ppr,
            season: Some(SEASON),
        },
        roster_limits: RosterLimits::new([
            (Position::Quarterback, 2),
            (Position::RunningBack, 4),
            (Position::WideReceiver, 4),
            (Position::TightEnd, 2),
            (Position::Kicker, 1),
            (Position::Defense, 1),
        ]),
        refresh: RefreshConfig {
            time: RefreshTime { hour: 6, minute: 0 },
            weeks_to_fetch: 2,
        },
        analysis: AnalysisConfig {
            weeks_to_analyze: 4,
            min_games_played: 2,
            valuation: ValuationSettings::default(),
            trade: TradeSettings::default(),
        },
        api: ApiConfig {
            sleeper_base: "http://localhost:1".into(),
            espn_base: "http://localhost:1".into(),
            timeout_secs: 1,
        },
        db_path: ":memory:".into(),
    }
}

fn seeded_db() -> Database {
    let db = Database::open(":memory:").unwrap();
    db.import_players(&[
        player("4046", "Patrick Mahomes", "KC", Position::Quarterback),
        player("6794", "Justin Jefferson", "MIN", Position::WideReceiver),
        player("7000", "Slow Receiver", "NYJ", Position::WideReceiver),
        player("K1", "Harrison Butker", "KC", Position::Kicker),
        player("K2", "Justin Tucker", "BAL", Position::Kicker),
    ])
    .unwrap();
    db
}

fn weekly(player_id: &str, week: u32, points: f64) -> WeeklyStat {
    WeeklyStat {
        player_id: player_id.into(),
        week,
        season: SEASON,
        line: StatLine::default(),
        fantasy_points: points,
    }
}

/// Feed `script` to a fresh menu and return everything it printed.
async fn run_menu(config: &Config, db: &Database, source: &FakeSource, script: &str) -> String {
    let mut out = Vec::new();
    {
        let mut menu = Menu::new(config, db, source, script.as_bytes(), &mut out).unwrap();
        menu.run().await.unwrap();
    }
    String::from_utf8(out).unwrap()
}

// ===========================================================================
// Refresh
// ===========================================================================

#[tokio::test]
async fn full_refresh_stores_known_players_only() {
    let db = Database::open(":memory:").unwrap();
    let mut weeks = HashMap::new();
    weeks.insert(
        2,
        vec![
            SourceStat {
                player_id: "6794".into(),
                line: receiving(8, 95.0, 1),
            },
            SourceStat {
                player_id: "ghost".into(),
                line: receiving(3, 20.0, 0),
            },
        ],
    );
    weeks.insert(
        3,
        vec![SourceStat {
            player_id: "6794".into(),
            line: receiving(5, 60.0, 0),
        }],
    );
    let source = FakeSource {
        players: vec![player("6794", "Justin Jefferson", "MIN", Position::WideReceiver)],
        weeks,
        current_week: Some(3),
        ..FakeSource::default()
    };

    let service = RefreshService::new(&source, &db, SEASON, ScoringFormat::Ppr);
    let summary = service.full_refresh(2).await.unwrap();

    assert_eq!(summary.players, Some(1));
    assert_eq!(summary.weeks, vec![(2, 1), (3, 1)]);
    assert_eq!(summary.stat_rows(), 2);
    assert_eq!(db.stat_count(SEASON).unwrap(), 2);
    assert!(db.last_refresh().unwrap().is_some());

    // Newest first; points computed with the league's scoring format.
    let stats = db.recent_player_stats("6794", SEASON, 4).unwrap();
    assert_eq!(stats.len(), 2);
    assert_eq!(stats[0].week, 3);
    assert!((stats[1].fantasy_points - 23.5).abs() < 1e-9);
}

#[tokio::test]
async fn quick_update_falls_back_to_calendar_week() {
    let db = Database::open(":memory:").unwrap();
    let source = FakeSource::default();

    let service = RefreshService::new(&source, &db, SEASON, ScoringFormat::Standard);
    let summary = service.quick_update().await.unwrap();

    assert_eq!(summary.players, None);
    assert_eq!(summary.weeks.len(), 1);
    let (week, rows) = summary.weeks[0];
    assert!((FIRST_WEEK..=LAST_WEEK).contains(&week));
    assert_eq!(rows, 0);
}

#[tokio::test]
async fn recent_weeks_never_start_before_week_one() {
    let db = Database::open(":memory:").unwrap();
    let source = FakeSource {
        current_week: Some(2),
        ..FakeSource::default()
    };

    let service = RefreshService::new(&source, &db, SEASON, ScoringFormat::Ppr);
    let weeks = service.refresh_recent_weeks(4).await.unwrap();
    let numbers: Vec<u32> = weeks.iter().map(|(w, _)| *w).collect();
    assert_eq!(numbers, vec![1, 2]);
}

#[tokio::test]
async fn scheduled_refresh_follows_the_season_rollover() {
    let mut config = inline_config();
    config.league.season = None;
    config.refresh.weeks_to_fetch = 1;
    let db = Database::open(":memory:").unwrap();
    let source = FakeSource {
        current_week: Some(5),
        ..FakeSource::default()
    };

    let february = NaiveDate::from_ymd_opt(2025, 2, 27).unwrap();
    let march = NaiveDate::from_ymd_opt(2025, 3, 1).unwrap();
    scheduled_refresh(&source, &db, &config, february).await.unwrap();
    scheduled_refresh(&source, &db, &config, march).await.unwrap();

    assert_eq!(*source.seasons.lock().unwrap(), vec![2024, 2025]);
}

#[tokio::test]
async fn offline_source_reports_external_service_error() {
    let db = Database::open(":memory:").unwrap();
    let source = FakeSource {
        offline: true,
        ..FakeSource::default()
    };

    let service = RefreshService::new(&source, &db, SEASON, ScoringFormat::Ppr);
    let err = service.full_refresh(2).await.unwrap_err();
    assert_eq!(err.kind(), "ExternalServiceError");
    assert!(db.last_refresh().unwrap().is_none());
}

// ===========================================================================
// Menu
// ===========================================================================

#[tokio::test]
async fn menu_exits_on_zero_and_on_end_of_input() {
    let config = inline_config();
    let db = seeded_db();
    let source = FakeSource::default();

    let out = run_menu(&config, &db, &source, "0\n").await;
    assert!(out.contains("Goodbye!"));

    let out = run_menu(&config, &db, &source, "").await;
    assert!(out.contains("Select an option"));
    assert!(!out.contains("Goodbye!"));
}

#[tokio::test]
async fn menu_rejects_unknown_option() {
    let config = inline_config();
    let db = seeded_db();
    let source = FakeSource::default();

    let out = run_menu(&config, &db, &source, "42\n0\n").await;
    assert!(out.contains("Invalid option '42'."));
}

#[tokio::test]
async fn menu_adds_views_and_removes_players() {
    let config = inline_config();
    let db = seeded_db();
    let source = FakeSource::default();

    let out = run_menu(&config, &db, &source, "4\nMahomes\nfranchise QB\n3\n0\n").await;
    assert!(out.contains("Added Patrick Mahomes (QB, KC) to your team."));
    assert!(out.contains("My Team (1 players)"));
    assert!(out.contains("franchise QB"));

    let saved = db.roster_entries().unwrap();
    assert_eq!(saved.len(), 1);
    assert_eq!(saved[0].notes, "franchise QB");

    // A new session loads the saved roster and can remove from it.
    let out = run_menu(&config, &db, &source, "5\n1\n0\n").await;
    assert!(out.contains("Removed Patrick Mahomes from your team."));
    assert!(db.roster_entries().unwrap().is_empty());
}

#[tokio::test]
async fn menu_picks_from_multiple_matches() {
    let config = inline_config();
    let db = seeded_db();
    let source = FakeSource::default();

    // "Justin" matches Jefferson and Tucker, listed by name.
    let out = run_menu(&config, &db, &source, "4\nJustin\n2\n\n0\n").await;
    assert!(out.contains(" 1. Justin Jefferson"));
    assert!(out.contains("Added Justin Tucker (K, BAL) to your team."));
}

#[tokio::test]
async fn menu_reports_full_position() {
    let config = inline_config();
    let db = seeded_db();
    let source = FakeSource::default();

    let script = "4\nButker\n\n4\nTucker\n\n0\n";
    let out = run_menu(&config, &db, &source, script).await;
    assert!(out.contains("Added Harrison Butker"));
    assert!(out.contains("position limit reached: max 1 K allowed"));
    assert_eq!(db.roster_entries().unwrap().len(), 1);
}

#[tokio::test]
async fn menu_suggests_csv_import_when_offline() {
    let config = inline_config();
    let db = seeded_db();
    let source = FakeSource {
        offline: true,
        ..FakeSource::default()
    };

    let out = run_menu(&config, &db, &source, "1\n0\n").await;
    assert!(out.contains("external service error"));
    assert!(out.contains("option 17 (Import CSV)"));
}

#[tokio::test]
async fn menu_trade_evaluation_is_recorded() {
    let config = inline_config();
    let db = seeded_db();
    let mut stats = Vec::new();
    for week in 1..=4 {
        stats.push(weekly("6794", week, 24.0));
        stats.push(weekly("7000", week, 4.0));
    }
    db.import_stats(&stats).unwrap();
    let source = FakeSource::default();

    let script = "14\nSlow Receiver\nJustin Jefferson\n19\n0\n";
    let out = run_menu(&config, &db, &source, script).await;
    assert!(out.contains("Recommendation: STRONG ACCEPT"));

    let history = db.trade_history(10).unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].given, vec!["7000".to_string()]);
    assert_eq!(history[0].received, vec!["6794".to_string()]);
    assert_eq!(history[0].recommendation, "STRONG ACCEPT");
}

#[tokio::test]
async fn menu_ranks_players_by_position() {
    let config = inline_config();
    let db = seeded_db();
    db.import_stats(&[
        weekly("6794", 1, 20.0),
        weekly("6794", 2, 22.0),
        weekly("7000", 1, 6.0),
        weekly("7000", 2, 8.0),
    ])
    .unwrap();
    let source = FakeSource::default();

    let out = run_menu(&config, &db, &source, "10\nWR\n0\n").await;
    let jefferson = out.find("Justin Jefferson").unwrap();
    let slow = out.find("Slow Receiver").unwrap();
    assert!(jefferson < slow);
}

#[tokio::test]
async fn menu_imports_players_from_csv() {
    let config = inline_config();
    let db = Database::open(":memory:").unwrap();
    let source = FakeSource::default();

    let path = std::env::temp_dir().join(format!("gridiron_menu_players_{}.csv", std::process::id()));
    std::fs::write(
        &path,
        "player_id,name,team,position\n\
         100,Alpha Back,DAL,RB\n\
         101,Beta End,SF,TE\n\
         102,Bad Row,SF,LB\n",
    )
    .unwrap();

    let script = format!("17\n1\n{}\n0\n", path.display());
    let out = run_menu(&config, &db, &source, &script).await;
    std::fs::remove_file(&path).ok();

    assert!(out.contains("Imported 2 rows"));
    assert!(out.contains("(1 skipped)"));
    assert_eq!(db.player_count().unwrap(), 2);
}

#[tokio::test]
async fn menu_exports_csv_templates() {
    let config = inline_config();
    let db = Database::open(":memory:").unwrap();
    let source = FakeSource::default();

    let dir = std::env::temp_dir().join(format!("gridiron_menu_export_{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();

    let mut out = Vec::new();
    {
        let mut menu = Menu::new(&config, &db, &source, "18\n0\n".as_bytes(), &mut out)
            .unwrap()
            .with_export_dir(&dir);
        menu.run().await.unwrap();
    }
    let out = String::from_utf8(out).unwrap();

    assert!(out.contains("Wrote"));
    assert!(dir.join(gridiron_football::csv_io::PLAYERS_TEMPLATE).exists());
    assert!(dir.join(gridiron_football::csv_io::STATS_TEMPLATE).exists());
    std::fs::remove_dir_all(&dir).ok();
}
