// Data refresh: pull players and recent weekly stats from a `StatsSource`
// into the local database.

use std::collections::HashSet;

use chrono::{DateTime, Local, NaiveDate, Utc};
use tracing::{info, warn};

use gridiron_core::config::Config;
use gridiron_core::db::Database;
use gridiron_core::error::Result;
use gridiron_core::model::{ScoringFormat, WeeklyStat};
use gridiron_football::scoring::fantasy_points;

use crate::fetch::{fallback_week, StatsSource};

/// Outcome of a refresh run.
#[derive(Debug, Clone, PartialEq)]
pub struct RefreshSummary {
    /// Players upserted, `None` when players were not refreshed.
    pub players: Option<usize>,
    /// Stat rows stored per week, oldest week first.
    pub weeks: Vec<(u32, usize)>,
    pub finished_at: DateTime<Utc>,
}

impl RefreshSummary {
    pub fn stat_rows(&self) -> usize {
        self.weeks.iter().map(|(_, n)| n).sum()
    }
}

pub struct RefreshService<'a> {
    source: &'a dyn StatsSource,
    db: &'a Database,
    season: i32,
    format: ScoringFormat,
}

impl<'a> RefreshService<'a> {
    pub fn new(
        source: &'a dyn StatsSource,
        db: &'a Database,
        season: i32,
        format: ScoringFormat,
    ) -> Self {
        RefreshService {
            source,
            db,
            season,
            format,
        }
    }

    /// Replace/insert every active player from the source.
    pub async fn refresh_players(&self) -> Result<usize> {
        let players = self.source.fetch_players().await?;
        let count = self.db.import_players(&players)?;
        info!("Updated {} players in database", count);
        Ok(count)
    }

    /// Current week from the source, or the calendar estimate if the source
    /// fails.
    pub async fn current_week(&self) -> u32 {
        match self.source.current_week().await {
            Ok(week) => week,
            Err(e) => {
                let week = fallback_week(Local::now().date_naive());
                warn!("Could not get current week ({}); estimating week {}", e, week);
                week
            }
        }
    }

    /// Fetch and store one week of stats. Players unknown to the database
    /// are skipped.
    pub async fn refresh_week(&self, week: u32) -> Result<usize> {
        let fetched = self.source.fetch_week_stats(self.season, week).await?;

        let known: HashSet<String> = self
            .db
            .list_players(None)?
            .into_iter()
            .map(|p| p.player_id)
            .collect();

        let rows: Vec<WeeklyStat> = fetched
            .into_iter()
            .filter(|s| known.contains(&s.player_id))
            .map(|s| WeeklyStat {
                fantasy_points: fantasy_points(&s.line, self.format),
                player_id: s.player_id,
                week,
                season: self.season,
                line: s.line,
            })
            .collect();

        let count = self.db.import_stats(&rows)?;
        info!(
            "Stored {} stat rows for season {} week {}",
            count, self.season, week
        );
        Ok(count)
    }

    /// Refresh the `weeks` most recent weeks up to the current one.
    pub async fn refresh_recent_weeks(&self, weeks: u32) -> Result<Vec<(u32, usize)>> {
        let current = self.current_week().await;
        let first = current.saturating_sub(weeks.saturating_sub(1)).max(1);

        let mut done = Vec::new();
        for week in first..=current {
            let count = self.refresh_week(week).await?;
            done.push((week, count));
        }
        Ok(done)
    }

    /// Stats for the current week only.
    pub async fn quick_update(&self) -> Result<RefreshSummary> {
        let week = self.current_week().await;
        let count = self.refresh_week(week).await?;
        self.finish(None, vec![(week, count)])
    }

    /// Players plus the `weeks` most recent weeks of stats.
    pub async fn full_refresh(&self, weeks: u32) -> Result<RefreshSummary> {
        info!("Starting full data refresh for season {}", self.season);
        let players = self.refresh_players().await?;
        let weeks = self.refresh_recent_weeks(weeks).await?;
        self.finish(Some(players), weeks)
    }

    fn finish(&self, players: Option<usize>, weeks: Vec<(u32, usize)>) -> Result<RefreshSummary> {
        let finished_at = Utc::now();
        self.db.set_last_refresh(finished_at)?;
        let summary = RefreshSummary {
            players,
            weeks,
            finished_at,
        };
        info!(
            "Refresh complete: {} players, {} stat rows",
            summary.players.unwrap_or(0),
            summary.stat_rows()
        );
        Ok(summary)
    }
}

/// One scheduled run: a full refresh of the season in effect on `today`.
pub async fn scheduled_refresh(
    source: &dyn StatsSource,
    db: &Database,
    config: &Config,
    today: NaiveDate,
) -> Result<RefreshSummary> {
    let season = config.season_on(today);
    RefreshService::new(source, db, season, config.league.scoring_format)
        .full_refresh(config.refresh.weeks_to_fetch)
        .await
}
