// SQLite persistence layer: players, weekly stats, roster, trade history.

use std::sync::{Mutex, MutexGuard};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::model::{Player, Position, RosterEntry, StatLine, TradeRecord, WeeklyStat};
use crate::store::StatStore;

const STAT_COLUMNS: &str = "player_id, week, season, passing_yards, passing_tds, interceptions,
     rushing_yards, rushing_tds, receptions, receiving_yards, receiving_tds, fumbles,
     fantasy_points";

/// SQLite-backed store for players, weekly stats, the user's roster, trade
/// history, and key-value app state.
pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    /// Open (or create) a SQLite database at `path` and ensure all tables
    /// exist. Pass `":memory:"` for an ephemeral in-memory database (useful
    /// for tests).
    pub fn open(path: &str) -> Result<Self> {
        let conn = Connection::open(path)
            .with_context(|| format!("failed to open database at {path}"))?;

        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA busy_timeout = 5000;
             PRAGMA foreign_keys = ON;",
        )
        .context("failed to set database pragmas")?;

        conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS players (
                player_id    TEXT PRIMARY KEY,
                name         TEXT NOT NULL,
                team         TEXT NOT NULL DEFAULT 'FA',
                position     TEXT NOT NULL,
                last_updated TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
            );

            CREATE TABLE IF NOT EXISTS player_stats (
                player_id       TEXT NOT NULL REFERENCES players(player_id),
                week            INTEGER NOT NULL,
                season          INTEGER NOT NULL,
                passing_yards   REAL NOT NULL DEFAULT 0,
                passing_tds     INTEGER NOT NULL DEFAULT 0,
                interceptions   INTEGER NOT NULL DEFAULT 0,
                rushing_yards   REAL NOT NULL DEFAULT 0,
                rushing_tds     INTEGER NOT NULL DEFAULT 0,
                receptions      INTEGER NOT NULL DEFAULT 0,
                receiving_yards REAL NOT NULL DEFAULT 0,
                receiving_tds   INTEGER NOT NULL DEFAULT 0,
                fumbles         INTEGER NOT NULL DEFAULT 0,
                fantasy_points  REAL NOT NULL DEFAULT 0,
                updated_at      TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now')),
                PRIMARY KEY (player_id, season, week)
            );

            CREATE TABLE IF NOT EXISTS my_team (
                player_id TEXT PRIMARY KEY REFERENCES players(player_id),
                added_at  TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now')),
                notes     TEXT NOT NULL DEFAULT ''
            );

            CREATE TABLE IF NOT EXISTS trade_history (
                id             INTEGER PRIMARY KEY AUTOINCREMENT,
                created_at     TEXT NOT NULL,
                players_out    TEXT NOT NULL,
                players_in     TEXT NOT NULL,
                value_out      REAL NOT NULL,
                value_in       REAL NOT NULL,
                percent_change REAL,
                recommendation TEXT NOT NULL,
                reason         TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS app_state (
                key   TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_players_position ON players(position);
            ",
        )
        .context("failed to create database schema")?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Acquire the database connection.
    ///
    /// Panics if the mutex is poisoned (another thread panicked while
    /// holding the lock). This should never happen in normal operation.
    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().expect("database mutex poisoned")
    }

    // ------------------------------------------------------------------
    // Players
    // ------------------------------------------------------------------

    /// Insert a player or update name/team/position if the id exists.
    pub fn upsert_player(&self, player: &Player) -> Result<()> {
        let conn = self.conn();
        upsert_player_row(&conn, player).context("failed to upsert player")?;
        Ok(())
    }

    /// Upsert many players in a single transaction.
    pub fn import_players(&self, players: &[Player]) -> Result<usize> {
        let mut conn = self.conn();
        let tx = conn.transaction().context("failed to begin import transaction")?;
        for player in players {
            upsert_player_row(&tx, player)
                .with_context(|| format!("failed to upsert player {}", player.player_id))?;
        }
        tx.commit().context("failed to commit player import")?;
        Ok(players.len())
    }

    /// Look up a player by id.
    pub fn get_player(&self, player_id: &str) -> Result<Option<Player>> {
        let conn = self.conn();
        conn.query_row(
            "SELECT player_id, name, team, position FROM players WHERE player_id = ?1",
            params![player_id],
            |row| player_from_row(row, 0),
        )
        .optional()
        .context("failed to query player")
    }

    /// All players, optionally filtered by position, ordered by name.
    pub fn list_players(&self, position: Option<Position>) -> Result<Vec<Player>> {
        let conn = self.conn();
        let mut stmt = conn
            .prepare(
                "SELECT player_id, name, team, position FROM players
                 WHERE ?1 IS NULL OR position = ?1
                 ORDER BY name",
            )
            .context("failed to prepare list_players query")?;

        let players = stmt
            .query_map(params![position.map(|p| p.display_str())], |row| {
                player_from_row(row, 0)
            })
            .context("failed to query players")?
            .collect::<std::result::Result<Vec<_>, _>>()
            .context("failed to map player rows")?;
        Ok(players)
    }

    /// Case-insensitive substring search on player name.
    pub fn search_players(&self, term: &str, limit: usize) -> Result<Vec<Player>> {
        let escaped = term
            .trim()
            .replace('\\', "\\\\")
            .replace('%', "\\%")
            .replace('_', "\\_");
        let pattern = format!("%{escaped}%");

        let conn = self.conn();
        let mut stmt = conn
            .prepare(
                "SELECT player_id, name, team, position FROM players
                 WHERE name LIKE ?1 ESCAPE '\\'
                 ORDER BY name
                 LIMIT ?2",
            )
            .context("failed to prepare search query")?;

        let players = stmt
            .query_map(params![pattern, limit as i64], |row| player_from_row(row, 0))
            .context("failed to search players")?
            .collect::<std::result::Result<Vec<_>, _>>()
            .context("failed to map player rows")?;
        Ok(players)
    }

    pub fn player_count(&self) -> Result<usize> {
        let conn = self.conn();
        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM players", [], |row| row.get(0))
            .context("failed to count players")?;
        Ok(count as usize)
    }

    // ------------------------------------------------------------------
    // Weekly stats
    // ------------------------------------------------------------------

    /// Insert a player-week, replacing any existing row for the same
    /// (player, season, week). Fails if the player does not exist.
    pub fn upsert_player_stats(&self, stat: &WeeklyStat) -> Result<()> {
        let conn = self.conn();
        upsert_stat_row(&conn, stat).context("failed to upsert player stats")?;
        Ok(())
    }

    /// Upsert many stat rows in a single transaction.
    pub fn import_stats(&self, stats: &[WeeklyStat]) -> Result<usize> {
        let mut conn = self.conn();
        let tx = conn.transaction().context("failed to begin stats transaction")?;
        for stat in stats {
            upsert_stat_row(&tx, stat).with_context(|| {
                format!(
                    "failed to upsert stats for {} week {} season {}",
                    stat.player_id, stat.week, stat.season
                )
            })?;
        }
        tx.commit().context("failed to commit stats import")?;
        Ok(stats.len())
    }

    /// Up to `weeks` most recent stat lines for a player in `season`,
    /// newest first.
    pub fn recent_player_stats(
        &self,
        player_id: &str,
        season: i32,
        weeks: usize,
    ) -> Result<Vec<WeeklyStat>> {
        let conn = self.conn();
        let sql = format!(
            "SELECT {STAT_COLUMNS} FROM player_stats
             WHERE player_id = ?1 AND season = ?2
             ORDER BY week DESC
             LIMIT ?3"
        );
        let mut stmt = conn
            .prepare(&sql)
            .context("failed to prepare recent stats query")?;

        let stats = stmt
            .query_map(params![player_id, season, weeks as i64], stat_from_row)
            .context("failed to query player stats")?
            .collect::<std::result::Result<Vec<_>, _>>()
            .context("failed to map stat rows")?;
        Ok(stats)
    }

    /// Number of stored stat rows for a season.
    pub fn stat_count(&self, season: i32) -> Result<usize> {
        let conn = self.conn();
        let count: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM player_stats WHERE season = ?1",
                params![season],
                |row| row.get(0),
            )
            .context("failed to count stats")?;
        Ok(count as usize)
    }

    // ------------------------------------------------------------------
    // Roster (my_team)
    // ------------------------------------------------------------------

    /// All rostered players with their metadata, ordered by name.
    pub fn roster_entries(&self) -> Result<Vec<RosterEntry>> {
        let conn = self.conn();
        let mut stmt = conn
            .prepare(
                "SELECT p.player_id, p.name, p.team, p.position, mt.added_at, mt.notes
                 FROM my_team mt
                 JOIN players p ON p.player_id = mt.player_id
                 ORDER BY p.name",
            )
            .context("failed to prepare roster query")?;

        let entries = stmt
            .query_map([], |row| {
                Ok(RosterEntry {
                    player: player_from_row(row, 0)?,
                    added_at: timestamp_from_row(row, 4)?,
                    notes: row.get(5)?,
                })
            })
            .context("failed to query roster")?
            .collect::<std::result::Result<Vec<_>, _>>()
            .context("failed to map roster rows")?;
        Ok(entries)
    }

    /// Add a player to the roster table. Returns `false` if already present.
    pub fn add_roster_entry(&self, player_id: &str, notes: &str) -> Result<bool> {
        let conn = self.conn();
        let changed = conn
            .execute(
                "INSERT OR IGNORE INTO my_team (player_id, notes) VALUES (?1, ?2)",
                params![player_id, notes],
            )
            .context("failed to add roster entry")?;
        Ok(changed > 0)
    }

    /// Remove a player from the roster table. Returns `false` if absent.
    pub fn remove_roster_entry(&self, player_id: &str) -> Result<bool> {
        let conn = self.conn();
        let changed = conn
            .execute("DELETE FROM my_team WHERE player_id = ?1", params![player_id])
            .context("failed to remove roster entry")?;
        Ok(changed > 0)
    }

    // ------------------------------------------------------------------
    // Trade history
    // ------------------------------------------------------------------

    /// Append a trade record and return its row id.
    pub fn record_trade(&self, record: &TradeRecord) -> Result<i64> {
        let given = serde_json::to_string(&record.given).context("failed to serialize given ids")?;
        let received =
            serde_json::to_string(&record.received).context("failed to serialize received ids")?;

        let conn = self.conn();
        conn.execute(
            "INSERT INTO trade_history
                (created_at, players_out, players_in, value_out, value_in,
                 percent_change, recommendation, reason)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                record.created_at.to_rfc3339(),
                given,
                received,
                record.value_given,
                record.value_received,
                record.percent_change,
                record.recommendation,
                record.reason,
            ],
        )
        .context("failed to record trade")?;
        Ok(conn.last_insert_rowid())
    }

    /// Most recent trade records, newest first.
    pub fn trade_history(&self, limit: usize) -> Result<Vec<TradeRecord>> {
        let conn = self.conn();
        let mut stmt = conn
            .prepare(
                "SELECT id, created_at, players_out, players_in, value_out, value_in,
                        percent_change, recommendation, reason
                 FROM trade_history
                 ORDER BY id DESC
                 LIMIT ?1",
            )
            .context("failed to prepare trade history query")?;

        let records = stmt
            .query_map(params![limit as i64], |row| {
                Ok(TradeRecord {
                    id: Some(row.get(0)?),
                    created_at: timestamp_from_row(row, 1)?,
                    given: json_ids_from_row(row, 2)?,
                    received: json_ids_from_row(row, 3)?,
                    value_given: row.get(4)?,
                    value_received: row.get(5)?,
                    percent_change: row.get(6)?,
                    recommendation: row.get(7)?,
                    reason: row.get(8)?,
                })
            })
            .context("failed to query trade history")?
            .collect::<std::result::Result<Vec<_>, _>>()
            .context("failed to map trade rows")?;
        Ok(records)
    }

    // ------------------------------------------------------------------
    // Key-value app state
    // ------------------------------------------------------------------

    /// Persist an arbitrary JSON value under `key`, overwriting any previous
    /// value.
    pub fn save_state(&self, key: &str, value: &serde_json::Value) -> Result<()> {
        let conn = self.conn();
        let json_str =
            serde_json::to_string(value).context("failed to serialize state value")?;
        conn.execute(
            "INSERT OR REPLACE INTO app_state (key, value) VALUES (?1, ?2)",
            params![key, json_str],
        )
        .context("failed to save state")?;
        Ok(())
    }

    /// Load a previously saved JSON value by `key`.
    pub fn load_state(&self, key: &str) -> Result<Option<serde_json::Value>> {
        let conn = self.conn();
        let json_str: Option<String> = conn
            .query_row(
                "SELECT value FROM app_state WHERE key = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()
            .context("failed to query app state")?;

        json_str
            .map(|s| serde_json::from_str(&s).context("failed to deserialize state value"))
            .transpose()
    }

    const LAST_REFRESH_KEY: &'static str = "last_refresh";

    /// Record the time of the most recent successful data refresh.
    pub fn set_last_refresh(&self, at: DateTime<Utc>) -> Result<()> {
        self.save_state(
            Self::LAST_REFRESH_KEY,
            &serde_json::Value::String(at.to_rfc3339()),
        )
    }

    /// Time of the most recent successful data refresh, if any.
    pub fn last_refresh(&self) -> Result<Option<DateTime<Utc>>> {
        let value = self.load_state(Self::LAST_REFRESH_KEY)?;
        Ok(value
            .as_ref()
            .and_then(|v| v.as_str())
            .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
            .map(|dt| dt.with_timezone(&Utc)))
    }
}

impl StatStore for Database {
    fn player(&self, player_id: &str) -> Result<Option<Player>> {
        self.get_player(player_id)
    }

    fn players(&self, position: Option<Position>) -> Result<Vec<Player>> {
        self.list_players(position)
    }

    fn recent_stats(&self, player_id: &str, season: i32, weeks: usize) -> Result<Vec<WeeklyStat>> {
        self.recent_player_stats(player_id, season, weeks)
    }
}

// ---------------------------------------------------------------------------
// Row helpers
// ---------------------------------------------------------------------------

fn upsert_player_row(conn: &Connection, player: &Player) -> rusqlite::Result<usize> {
    conn.execute(
        "INSERT INTO players (player_id, name, team, position)
         VALUES (?1, ?2, ?3, ?4)
         ON CONFLICT(player_id) DO UPDATE SET
            name         = excluded.name,
            team         = excluded.team,
            position     = excluded.position,
            last_updated = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')",
        params![
            player.player_id,
            player.name,
            player.team,
            player.position.display_str()
        ],
    )
}

fn upsert_stat_row(conn: &Connection, stat: &WeeklyStat) -> rusqlite::Result<usize> {
    let l = &stat.line;
    conn.execute(
        &format!(
            "INSERT INTO player_stats ({STAT_COLUMNS})
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)
             ON CONFLICT(player_id, season, week) DO UPDATE SET
                passing_yards   = excluded.passing_yards,
                passing_tds     = excluded.passing_tds,
                interceptions   = excluded.interceptions,
                rushing_yards   = excluded.rushing_yards,
                rushing_tds     = excluded.rushing_tds,
                receptions      = excluded.receptions,
                receiving_yards = excluded.receiving_yards,
                receiving_tds   = excluded.receiving_tds,
                fumbles         = excluded.fumbles,
                fantasy_points  = excluded.fantasy_points,
                updated_at      = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')"
        ),
        params![
            stat.player_id,
            stat.week,
            stat.season,
            l.passing_yards,
            l.passing_tds,
            l.interceptions,
            l.rushing_yards,
            l.rushing_tds,
            l.receptions,
            l.receiving_yards,
            l.receiving_tds,
            l.fumbles,
            stat.fantasy_points,
        ],
    )
}

/// Map four consecutive columns (id, name, team, position) starting at
/// `offset` into a `Player`.
fn player_from_row(row: &Row<'_>, offset: usize) -> rusqlite::Result<Player> {
    let position_str: String = row.get(offset + 3)?;
    let position = Position::from_str_pos(&position_str).ok_or_else(|| {
        rusqlite::Error::InvalidColumnType(offset + 3, "position".into(), Type::Text)
    })?;
    Ok(Player {
        player_id: row.get(offset)?,
        name: row.get(offset + 1)?,
        team: row.get(offset + 2)?,
        position,
    })
}

fn stat_from_row(row: &Row<'_>) -> rusqlite::Result<WeeklyStat> {
    Ok(WeeklyStat {
        player_id: row.get(0)?,
        week: row.get(1)?,
        season: row.get(2)?,
        line: StatLine {
            passing_yards: row.get(3)?,
            passing_tds: row.get(4)?,
            interceptions: row.get(5)?,
            rushing_yards: row.get(6)?,
            rushing_tds: row.get(7)?,
            receptions: row.get(8)?,
            receiving_yards: row.get(9)?,
            receiving_tds: row.get(10)?,
            fumbles: row.get(11)?,
        },
        fantasy_points: row.get(12)?,
    })
}

fn timestamp_from_row(row: &Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let text: String = row.get(idx)?;
    DateTime::parse_from_rfc3339(&text)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn json_ids_from_row(row: &Row<'_>, idx: usize) -> rusqlite::Result<Vec<String>> {
    let text: String = row.get(idx)?;
    serde_json::from_str(&text)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}
