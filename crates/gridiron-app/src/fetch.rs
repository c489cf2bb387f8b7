// HTTP data sources: Sleeper for players and weekly stats, ESPN for the
// current NFL week.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{Datelike, NaiveDate};
use serde_json::Value;
use tracing::{debug, info};

use gridiron_core::config::ApiConfig;
use gridiron_core::error::{FantasyError, Result};
use gridiron_core::model::{Player, Position, StatLine};

/// First and last regular-season weeks.
pub const FIRST_WEEK: u32 = 1;
pub const LAST_WEEK: u32 = 18;

/// One player's box score as reported by a stats source.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceStat {
    pub player_id: String,
    pub line: StatLine,
}

/// Remote provider of players, weekly stats, and the current week.
#[async_trait]
pub trait StatsSource: Send + Sync {
    /// Active players at the six fantasy positions.
    async fn fetch_players(&self) -> Result<Vec<Player>>;

    /// Box scores for every player with stats in one regular-season week.
    async fn fetch_week_stats(&self, season: i32, week: u32) -> Result<Vec<SourceStat>>;

    /// Current NFL week according to the source.
    async fn current_week(&self) -> Result<u32>;
}

/// Week estimate from the calendar when no source can say: ISO week minus
/// 35, kept within the regular season.
pub fn fallback_week(date: NaiveDate) -> u32 {
    let iso_week = date.iso_week().week() as i64;
    (iso_week - 35).clamp(FIRST_WEEK as i64, LAST_WEEK as i64) as u32
}

// ---------------------------------------------------------------------------
// Response parsing
// ---------------------------------------------------------------------------

/// Parse the Sleeper `/players/nfl` map: keep active players at fantasy
/// positions with a non-empty name.
pub fn parse_sleeper_players(body: &Value) -> Vec<Player> {
    let Some(map) = body.as_object() else {
        return Vec::new();
    };

    map.iter()
        .filter_map(|(player_id, info)| {
            if info.get("status").and_then(Value::as_str) != Some("Active") {
                return None;
            }
            let position = info
                .get("position")
                .and_then(Value::as_str)
                .and_then(Position::from_str_pos)?;

            let first = info.get("first_name").and_then(Value::as_str).unwrap_or("");
            let last = info.get("last_name").and_then(Value::as_str).unwrap_or("");
            let name = format!("{first} {last}").trim().to_string();
            if name.is_empty() {
                return None;
            }

            let team = info
                .get("team")
                .and_then(Value::as_str)
                .filter(|t| !t.is_empty())
                .unwrap_or("FA")
                .to_string();

            Some(Player {
                player_id: player_id.clone(),
                name,
                team,
                position,
            })
        })
        .collect()
}

fn stat_f64(stats: &Value, key: &str) -> f64 {
    stats.get(key).and_then(Value::as_f64).unwrap_or(0.0)
}

fn stat_u32(stats: &Value, key: &str) -> u32 {
    stat_f64(stats, key).round().max(0.0) as u32
}

/// Parse the Sleeper weekly stats map (`player_id -> {pass_yd, ...}`).
pub fn parse_sleeper_stats(body: &Value) -> Vec<SourceStat> {
    let Some(map) = body.as_object() else {
        return Vec::new();
    };

    map.iter()
        .filter(|(_, stats)| stats.is_object())
        .map(|(player_id, stats)| SourceStat {
            player_id: player_id.clone(),
            line: StatLine {
                passing_yards: stat_f64(stats, "pass_yd"),
                passing_tds: stat_u32(stats, "pass_td"),
                interceptions: stat_u32(stats, "pass_int"),
                rushing_yards: stat_f64(stats, "rush_yd"),
                rushing_tds: stat_u32(stats, "rush_td"),
                receptions: stat_u32(stats, "rec"),
                receiving_yards: stat_f64(stats, "rec_yd"),
                receiving_tds: stat_u32(stats, "rec_td"),
                fumbles: stat_u32(stats, "fum_lost"),
            },
        })
        .collect()
}

/// Week number from an ESPN scoreboard response.
pub fn parse_espn_week(body: &Value) -> Option<u32> {
    body.get("week")
        .and_then(|w| w.get("number"))
        .and_then(Value::as_u64)
        .map(|n| n as u32)
}

// ---------------------------------------------------------------------------
// HTTP client
// ---------------------------------------------------------------------------

/// `StatsSource` backed by the public Sleeper and ESPN APIs.
pub struct HttpStatsSource {
    http: reqwest::Client,
    sleeper_base: String,
    espn_base: String,
}

impl HttpStatsSource {
    pub fn new(api: &ApiConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(api.timeout_secs))
            .build()
            .map_err(|e| FantasyError::ExternalService(format!("failed to create HTTP client: {e}")))?;

        Ok(Self {
            http,
            sleeper_base: api.sleeper_base.trim_end_matches('/').to_string(),
            espn_base: api.espn_base.trim_end_matches('/').to_string(),
        })
    }

    async fn get_json(&self, url: &str) -> Result<Value> {
        debug!("GET {}", url);
        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| FantasyError::ExternalService(format!("request to {url} failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FantasyError::ExternalService(format!(
                "{url} returned status {status}"
            )));
        }

        response
            .json::<Value>()
            .await
            .map_err(|e| FantasyError::ExternalService(format!("invalid JSON from {url}: {e}")))
    }
}

#[async_trait]
impl StatsSource for HttpStatsSource {
    async fn fetch_players(&self) -> Result<Vec<Player>> {
        let url = format!("{}/players/nfl", self.sleeper_base);
        let body = self.get_json(&url).await?;
        let players = parse_sleeper_players(&body);
        info!("Fetched {} active players from Sleeper", players.len());
        Ok(players)
    }

    async fn fetch_week_stats(&self, season: i32, week: u32) -> Result<Vec<SourceStat>> {
        let url = format!("{}/stats/nfl/regular/{season}/{week}", self.sleeper_base);
        let body = self.get_json(&url).await?;
        let stats = parse_sleeper_stats(&body);
        info!(
            "Fetched {} stat lines for season {} week {}",
            stats.len(),
            season,
            week
        );
        Ok(stats)
    }

    async fn current_week(&self) -> Result<u32> {
        let url = format!("{}/scoreboard", self.espn_base);
        let body = self.get_json(&url).await?;
        parse_espn_week(&body).ok_or_else(|| {
            FantasyError::ExternalService("scoreboard response has no week number".into())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn sleeper_players_keep_active_fantasy_positions() {
        let body = json!({
            "4046": {"status": "Active", "position": "QB", "first_name": "Patrick", "last_name": "Mahomes", "team": "KC"},
            "9999": {"status": "Inactive", "position": "WR", "first_name": "Old", "last_name": "Timer", "team": "NYJ"},
            "1234": {"status": "Active", "position": "OL", "first_name": "Big", "last_name": "Lineman", "team": "DAL"},
            "5678": {"status": "Active", "position": "RB", "first_name": "Free", "last_name": "Agent", "team": null},
            "KC":   {"status": "Active", "position": "DEF", "first_name": "Kansas City", "last_name": "Chiefs", "team": "KC"}
        });

        let mut players = parse_sleeper_players(&body);
        players.sort_by(|a, b| a.player_id.cmp(&b.player_id));

        let ids: Vec<&str> = players.iter().map(|p| p.player_id.as_str()).collect();
        assert_eq!(ids, vec!["4046", "5678", "KC"]);
        assert_eq!(players[0].name, "Patrick Mahomes");
        assert_eq!(players[1].team, "FA");
        assert_eq!(players[2].position, Position::Defense);
    }

    #[test]
    fn sleeper_stats_map_keys() {
        let body = json!({
            "4046": {"pass_yd": 291.0, "pass_td": 2.0, "pass_int": 1.0, "rush_yd": 5.0, "fum_lost": 0.0},
            "6794": {"rec": 8.0, "rec_yd": 95.0, "rec_td": 1.0},
            "junk": 3
        });

        let mut stats = parse_sleeper_stats(&body);
        stats.sort_by(|a, b| a.player_id.cmp(&b.player_id));
        assert_eq!(stats.len(), 2);

        assert_eq!(stats[0].line.passing_tds, 2);
        assert_eq!(stats[0].line.interceptions, 1);
        assert!((stats[0].line.passing_yards - 291.0).abs() < 1e-9);

        assert_eq!(stats[1].line.receptions, 8);
        assert_eq!(stats[1].line.receiving_tds, 1);
        assert_eq!(stats[1].line.passing_tds, 0);
    }

    #[test]
    fn espn_week_number() {
        assert_eq!(parse_espn_week(&json!({"week": {"number": 7}})), Some(7));
        assert_eq!(parse_espn_week(&json!({"season": {}})), None);
    }

    #[test]
    fn fallback_week_is_clamped() {
        // ISO week 41 -> week 6.
        let oct = NaiveDate::from_ymd_opt(2024, 10, 10).unwrap();
        assert_eq!(fallback_week(oct), 6);
        // Early in the year the estimate would go negative.
        let mar = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        assert_eq!(fallback_week(mar), FIRST_WEEK);
        // 2020 has an ISO week 53.
        let dec = NaiveDate::from_ymd_opt(2020, 12, 31).unwrap();
        assert_eq!(fallback_week(dec), LAST_WEEK);
    }

    #[test]
    fn client_builds_from_config() {
        let api = ApiConfig {
            sleeper_base: "https://api.sleeper.app/v1/".into(),
            espn_base: "https://example.test/nfl".into(),
            timeout_secs: 5,
        };
        let source = HttpStatsSource::new(&api).unwrap();
        assert_eq!(source.sleeper_base, "https://api.sleeper.app/v1");
    }
}
