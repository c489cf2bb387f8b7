// Player and team analysis built on the valuation engine: rankings,
// comparisons, market signals, team strengths/weaknesses, depth, and
// upgrade/trade target searches.

use std::collections::BTreeSet;
use std::fmt;

use serde::Serialize;
use tracing::debug;

use gridiron_core::config::AnalysisConfig;
use gridiron_core::error::{FantasyError, Result};
use gridiron_core::model::{Player, Position, WeeklyStat};
use gridiron_core::store::StatStore;

use crate::roster::Roster;
use crate::valuation::{self, Trend, Valuation};

/// Default minimum slope (points/week) for a breakout candidate.
pub const DEFAULT_BREAKOUT_SLOPE: f64 = 3.0;

const BREAKOUT_LIMIT: usize = 20;
const MARKET_LIMIT: usize = 15;
const SUGGESTION_LIMIT: usize = 10;
const UPGRADE_LIMIT: usize = 10;
const TARGETS_PER_POSITION: usize = 5;

/// Weeks counted as "recent" when comparing against earlier weeks.
const RECENT_WEEKS: usize = 2;
/// Weekly lines kept on a `PlayerAnalysis` for display.
const DISPLAY_WEEKS: usize = 4;

const BUY_LOW_MIN_AVG: f64 = 10.0;
const SELL_HIGH_RATIO: f64 = 1.2;
const SHOP_RATIO: f64 = 1.3;
const UPGRADE_RATIO: f64 = 1.2;
const UPGRADE_MIN_GAMES: usize = 2;
/// A depth player is "good" above this weekly average.
const GOOD_PLAYER_AVG: f64 = 10.0;

/// Positions searched for upgrades when none is given.
const UPGRADE_POSITIONS: [Position; 4] = [
    Position::Quarterback,
    Position::RunningBack,
    Position::WideReceiver,
    Position::TightEnd,
];

/// Weekly fantasy points for a player's most recent `weeks` in `season`,
/// ordered oldest to newest.
pub fn recent_points<S: StatStore + ?Sized>(
    store: &S,
    player_id: &str,
    season: i32,
    weeks: usize,
) -> anyhow::Result<Vec<f64>> {
    let mut stats = store.recent_stats(player_id, season, weeks)?;
    stats.reverse();
    Ok(stats.into_iter().map(|s| s.fantasy_points).collect())
}

/// Position average above which a group counts as a strength.
pub fn strong_threshold(position: Position) -> f64 {
    match position {
        Position::Quarterback => 20.0,
        Position::RunningBack | Position::WideReceiver => 15.0,
        Position::TightEnd => 10.0,
        Position::Kicker | Position::Defense => 8.0,
    }
}

/// Position average below which a group counts as a weakness.
pub fn weak_threshold(position: Position) -> f64 {
    match position {
        Position::Quarterback => 15.0,
        Position::RunningBack | Position::WideReceiver => 10.0,
        Position::TightEnd => 6.0,
        Position::Kicker | Position::Defense => 5.0,
    }
}

// ---------------------------------------------------------------------------
// Result types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct PlayerAnalysis {
    pub player: Player,
    pub valuation: Valuation,
    /// Mean of the two newest weeks.
    pub recent_avg: f64,
    /// Mean of the older weeks, or `recent_avg` when there are none.
    pub earlier_avg: f64,
    pub games_played: usize,
    pub total_points: f64,
    /// Newest weeks first.
    pub recent_weeks: Vec<WeeklyStat>,
}

impl PlayerAnalysis {
    pub fn average(&self) -> f64 {
        self.valuation.average.unwrap_or(0.0)
    }

    pub fn trend(&self) -> Trend {
        self.valuation.trend.trend
    }

    pub fn has_stats(&self) -> bool {
        self.games_played > 0
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PlayerComparison {
    pub first: PlayerAnalysis,
    pub second: PlayerAnalysis,
    /// First minus second.
    pub points_diff: f64,
    pub consistency_diff: Option<f64>,
    pub points_leader: String,
    pub consistency_leader: Option<String>,
}

/// A buy-low or sell-high candidate. `delta` is the dip (earlier - recent)
/// for buy-low and the spike (recent - earlier) for sell-high.
#[derive(Debug, Clone, Serialize)]
pub struct MarketSignal {
    pub analysis: PlayerAnalysis,
    pub delta: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct PositionSummary {
    pub position: Position,
    pub count: usize,
    pub limit: usize,
    /// Mean weekly average of rostered players with stats.
    pub average: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Strength {
    pub position: Position,
    pub average: f64,
}

impl fmt::Display for Strength {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Strong {} position (avg {:.2} pts)", self.position, self.average)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Weakness {
    Empty(Position),
    Unfilled {
        position: Position,
        count: usize,
        limit: usize,
    },
    LowProduction {
        position: Position,
        average: f64,
    },
}

impl Weakness {
    pub fn position(&self) -> Position {
        match self {
            Weakness::Empty(position)
            | Weakness::Unfilled { position, .. }
            | Weakness::LowProduction { position, .. } => *position,
        }
    }
}

impl fmt::Display for Weakness {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Weakness::Empty(pos) => write!(f, "No {pos} on roster"),
            Weakness::Unfilled {
                position,
                count,
                limit,
            } => write!(f, "Only {count}/{limit} {position} positions filled"),
            Weakness::LowProduction { position, average } => {
                write!(f, "Weak {position} position (avg {average:.2} pts)")
            }
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct TeamAnalysis {
    pub team_size: usize,
    /// Sum of weekly averages across the roster.
    pub total_projected: f64,
    pub positions: Vec<PositionSummary>,
    pub players: Vec<PlayerAnalysis>,
    pub strengths: Vec<Strength>,
    pub weaknesses: Vec<Weakness>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DepthGrade {
    None,
    Shallow,
    Adequate,
    Good,
    Excellent,
}

impl fmt::Display for DepthGrade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            DepthGrade::None => "None",
            DepthGrade::Shallow => "Shallow",
            DepthGrade::Adequate => "Adequate",
            DepthGrade::Good => "Good",
            DepthGrade::Excellent => "Excellent",
        })
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PositionDepth {
    pub position: Position,
    pub count: usize,
    pub limit: usize,
    /// Rostered players with stats, best average first.
    pub players: Vec<PlayerAnalysis>,
    pub grade: DepthGrade,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub enum Priority {
    High,
    Medium,
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Priority::High => "high",
            Priority::Medium => "medium",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Suggestion {
    pub priority: Priority,
    pub action: String,
    pub reason: String,
    /// Position the suggestion asks to fill or upgrade, if any.
    pub position: Option<Position>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Upgrade {
    pub position: Position,
    pub upgrade_from: PlayerAnalysis,
    pub upgrade_to: PlayerAnalysis,
    pub value_gain: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct TradeTarget {
    pub analysis: PlayerAnalysis,
    pub reason: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct TradeTargets {
    pub to_acquire: Vec<TradeTarget>,
    pub to_trade_away: Vec<TradeTarget>,
}

fn grade_depth(players: &[PlayerAnalysis]) -> DepthGrade {
    let good = |p: &PlayerAnalysis| p.average() > GOOD_PLAYER_AVG;
    match players.len() {
        0 => DepthGrade::None,
        1 => DepthGrade::Shallow,
        2 if players.iter().all(good) => DepthGrade::Good,
        2 => DepthGrade::Adequate,
        _ if players.iter().take(2).all(good) => DepthGrade::Excellent,
        _ => DepthGrade::Good,
    }
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}

fn by_average_desc(a: &PlayerAnalysis, b: &PlayerAnalysis) -> std::cmp::Ordering {
    b.average().total_cmp(&a.average())
}

// ---------------------------------------------------------------------------
// Analyzer
// ---------------------------------------------------------------------------

/// Read-only analysis over a stat store for one season.
pub struct Analyzer<'a, S: StatStore> {
    store: &'a S,
    season: i32,
    config: AnalysisConfig,
}

impl<'a, S: StatStore> Analyzer<'a, S> {
    pub fn new(store: &'a S, season: i32, config: AnalysisConfig) -> Self {
        Analyzer {
            store,
            season,
            config,
        }
    }

    pub fn season(&self) -> i32 {
        self.season
    }

    /// Full analysis for one player. `NotFound` for an unknown id.
    pub fn player_analysis(&self, player_id: &str) -> Result<PlayerAnalysis> {
        let player = self
            .store
            .player(player_id)?
            .ok_or_else(|| FantasyError::NotFound(format!("player {player_id}")))?;
        self.analyze(player)
    }

    fn analyze(&self, player: Player) -> Result<PlayerAnalysis> {
        // Newest first.
        let stats =
            self.store
                .recent_stats(&player.player_id, self.season, self.config.weeks_to_analyze)?;
        let samples: Vec<f64> = stats.iter().rev().map(|s| s.fantasy_points).collect();
        let valuation = valuation::evaluate(&samples, &self.config.valuation);

        let newest: Vec<f64> = stats
            .iter()
            .take(RECENT_WEEKS)
            .map(|s| s.fantasy_points)
            .collect();
        let older: Vec<f64> = stats
            .iter()
            .skip(RECENT_WEEKS)
            .map(|s| s.fantasy_points)
            .collect();
        let recent_avg = mean(&newest);
        let earlier_avg = if older.is_empty() {
            recent_avg
        } else {
            mean(&older)
        };

        Ok(PlayerAnalysis {
            player,
            valuation,
            recent_avg,
            earlier_avg,
            games_played: stats.len(),
            total_points: samples.iter().sum(),
            recent_weeks: stats.into_iter().take(DISPLAY_WEEKS).collect(),
        })
    }

    /// Analyses for every player (optionally at one position) that has at
    /// least one stat line this season.
    fn analyze_pool(&self, position: Option<Position>) -> Result<Vec<PlayerAnalysis>> {
        let mut pool = Vec::new();
        for player in self.store.players(position)? {
            let analysis = self.analyze(player)?;
            if analysis.has_stats() {
                pool.push(analysis);
            }
        }
        debug!(
            "Analyzed pool of {} players with stats (position: {:?})",
            pool.len(),
            position
        );
        Ok(pool)
    }

    /// Players at `position` with a positive average, best first.
    pub fn position_rankings(&self, position: Position) -> Result<Vec<PlayerAnalysis>> {
        let mut ranked: Vec<PlayerAnalysis> = self
            .analyze_pool(Some(position))?
            .into_iter()
            .filter(|a| a.average() > 0.0)
            .collect();
        ranked.sort_by(by_average_desc);
        Ok(ranked)
    }

    /// Side-by-side comparison. `InvalidInput` if either player lacks stats.
    pub fn compare_players(&self, first_id: &str, second_id: &str) -> Result<PlayerComparison> {
        let first = self.player_analysis(first_id)?;
        let second = self.player_analysis(second_id)?;

        for a in [&first, &second] {
            if !a.has_stats() {
                return Err(FantasyError::InvalidInput(format!(
                    "{} has no stats this season",
                    a.player.name
                )));
            }
        }

        let points_diff = first.average() - second.average();
        let points_leader = if points_diff > 0.0 {
            first.player.name.clone()
        } else {
            second.player.name.clone()
        };

        let consistency_diff = match (first.valuation.consistency, second.valuation.consistency) {
            (Some(a), Some(b)) => Some(a - b),
            _ => None,
        };
        let consistency_leader = consistency_diff.map(|d| {
            if d > 0.0 {
                first.player.name.clone()
            } else {
                second.player.name.clone()
            }
        });

        Ok(PlayerComparison {
            first,
            second,
            points_diff,
            consistency_diff,
            points_leader,
            consistency_leader,
        })
    }

    /// Improving players with slope >= `min_slope` and enough games, steepest
    /// first.
    pub fn breakout_candidates(
        &self,
        position: Option<Position>,
        min_slope: f64,
    ) -> Result<Vec<PlayerAnalysis>> {
        let mut candidates: Vec<PlayerAnalysis> = self
            .analyze_pool(position)?
            .into_iter()
            .filter(|a| {
                a.trend() == Trend::Improving
                    && a.valuation.trend.slope.unwrap_or(0.0) >= min_slope
                    && a.games_played >= self.config.min_games_played
            })
            .collect();

        candidates.sort_by(|a, b| {
            let sa = a.valuation.trend.slope.unwrap_or(0.0);
            let sb = b.valuation.trend.slope.unwrap_or(0.0);
            sb.total_cmp(&sa)
        });
        candidates.truncate(BREAKOUT_LIMIT);
        Ok(candidates)
    }

    /// Good producers in a recent dip whose trend is not declining.
    pub fn buy_low_candidates(&self, position: Option<Position>) -> Result<Vec<MarketSignal>> {
        let mut candidates: Vec<MarketSignal> = self
            .analyze_pool(position)?
            .into_iter()
            .filter(|a| {
                a.average() > BUY_LOW_MIN_AVG
                    && a.recent_avg < a.earlier_avg
                    && a.trend() != Trend::Declining
            })
            .map(|a| MarketSignal {
                delta: a.earlier_avg - a.recent_avg,
                analysis: a,
            })
            .collect();

        candidates.sort_by(|a, b| by_average_desc(&a.analysis, &b.analysis));
        candidates.truncate(MARKET_LIMIT);
        Ok(candidates)
    }

    /// Recent hot streaks on players whose trend is stable or declining.
    pub fn sell_high_candidates(&self, position: Option<Position>) -> Result<Vec<MarketSignal>> {
        let mut candidates: Vec<MarketSignal> = self
            .analyze_pool(position)?
            .into_iter()
            .filter(|a| a.recent_avg > a.earlier_avg * SELL_HIGH_RATIO && a.trend() != Trend::Improving)
            .map(|a| MarketSignal {
                delta: a.recent_avg - a.earlier_avg,
                analysis: a,
            })
            .collect();

        candidates.sort_by(|a, b| b.delta.total_cmp(&a.delta));
        candidates.truncate(MARKET_LIMIT);
        Ok(candidates)
    }

    fn analyze_roster(&self, roster: &Roster) -> Result<Vec<PlayerAnalysis>> {
        roster
            .players()
            .into_iter()
            .map(|entry| self.analyze(entry.player.clone()))
            .collect()
    }

    /// Per-position breakdown, strengths, and weaknesses of the roster.
    pub fn team_analysis(&self, roster: &Roster) -> Result<TeamAnalysis> {
        let players = self.analyze_roster(roster)?;

        let positions: Vec<PositionSummary> = Position::ALL
            .iter()
            .map(|&position| {
                let averages: Vec<f64> = players
                    .iter()
                    .filter(|a| a.player.position == position && a.has_stats())
                    .map(|a| a.average())
                    .collect();
                PositionSummary {
                    position,
                    count: roster.count(position),
                    limit: roster.limits().limit(position),
                    average: (!averages.is_empty()).then(|| mean(&averages)),
                }
            })
            .collect();

        let strengths = positions
            .iter()
            .filter_map(|s| {
                s.average
                    .filter(|avg| *avg > strong_threshold(s.position))
                    .map(|average| Strength {
                        position: s.position,
                        average,
                    })
            })
            .collect();

        let mut weaknesses = Vec::new();
        for s in positions.iter().filter(|s| s.limit > 0) {
            if s.count == 0 {
                weaknesses.push(Weakness::Empty(s.position));
            } else if s.count < s.limit {
                weaknesses.push(Weakness::Unfilled {
                    position: s.position,
                    count: s.count,
                    limit: s.limit,
                });
            }
        }
        for s in &positions {
            if let Some(average) = s.average {
                if average > 0.0 && average < weak_threshold(s.position) {
                    weaknesses.push(Weakness::LowProduction {
                        position: s.position,
                        average,
                    });
                }
            }
        }

        let total_projected = players.iter().map(|a| a.average()).sum();

        Ok(TeamAnalysis {
            team_size: roster.len(),
            total_projected,
            positions,
            players,
            strengths,
            weaknesses,
        })
    }

    /// Rostered depth at one position with a grade.
    pub fn position_depth(&self, roster: &Roster, position: Position) -> Result<PositionDepth> {
        let mut players = Vec::new();
        for entry in roster.at_position(position) {
            let analysis = self.analyze(entry.player.clone())?;
            if analysis.has_stats() {
                players.push(analysis);
            }
        }
        players.sort_by(by_average_desc);

        Ok(PositionDepth {
            position,
            count: roster.count(position),
            limit: roster.limits().limit(position),
            grade: grade_depth(&players),
            players,
        })
    }

    /// Prioritized improvement suggestions, high priority first.
    pub fn suggest_improvements(&self, roster: &Roster) -> Result<Vec<Suggestion>> {
        let team = self.team_analysis(roster)?;
        Ok(suggestions_for(&team))
    }

    /// Non-rostered players clearly better than the weakest rostered player
    /// at the same position.
    pub fn upgrade_opportunities(
        &self,
        roster: &Roster,
        position: Option<Position>,
    ) -> Result<Vec<Upgrade>> {
        let positions: Vec<Position> = match position {
            Some(p) => vec![p],
            None => UPGRADE_POSITIONS.to_vec(),
        };

        let mut upgrades = Vec::new();
        for pos in positions {
            let mut mine = Vec::new();
            for entry in roster.at_position(pos) {
                mine.push(self.analyze(entry.player.clone())?);
            }
            let Some(weakest) = mine
                .into_iter()
                .min_by(|a, b| a.valuation.score.total_cmp(&b.valuation.score))
            else {
                continue;
            };

            for candidate in self.analyze_pool(Some(pos))? {
                if roster.contains(&candidate.player.player_id) {
                    continue;
                }
                if candidate.valuation.score > weakest.valuation.score * UPGRADE_RATIO
                    && candidate.games_played >= UPGRADE_MIN_GAMES
                {
                    upgrades.push(Upgrade {
                        position: pos,
                        value_gain: candidate.valuation.score - weakest.valuation.score,
                        upgrade_from: weakest.clone(),
                        upgrade_to: candidate,
                    });
                }
            }
        }

        upgrades.sort_by(|a, b| b.value_gain.total_cmp(&a.value_gain));
        upgrades.truncate(UPGRADE_LIMIT);
        Ok(upgrades)
    }

    /// Players to pursue for the roster's needs and rostered players to shop.
    pub fn trade_targets(&self, roster: &Roster) -> Result<TradeTargets> {
        let team = self.team_analysis(roster)?;
        let mut targets = TradeTargets::default();

        let mut seen: BTreeSet<Position> = BTreeSet::new();
        for suggestion in suggestions_for(&team) {
            let Some(pos) = suggestion.position else {
                continue;
            };
            if !seen.insert(pos) {
                continue;
            }
            for analysis in self
                .position_rankings(pos)?
                .into_iter()
                .take(TARGETS_PER_POSITION)
            {
                if roster.contains(&analysis.player.player_id) {
                    continue;
                }
                targets.to_acquire.push(TradeTarget {
                    analysis,
                    reason: suggestion.action.clone(),
                });
            }
        }

        for analysis in team.players.into_iter().filter(|a| a.has_stats()) {
            let reason = if analysis.trend() == Trend::Declining {
                "Trending declining".to_string()
            } else if analysis.recent_avg > analysis.earlier_avg * SHOP_RATIO {
                format!(
                    "Hot streak: {:.1} recent vs {:.1} earlier",
                    analysis.recent_avg, analysis.earlier_avg
                )
            } else {
                continue;
            };
            targets.to_trade_away.push(TradeTarget { analysis, reason });
        }

        Ok(targets)
    }
}

fn suggestions_for(team: &TeamAnalysis) -> Vec<Suggestion> {
    let mut suggestions = Vec::new();

    for weakness in &team.weaknesses {
        match weakness {
            Weakness::Empty(pos) => suggestions.push(Suggestion {
                priority: Priority::High,
                action: format!("Add a {pos} player to your roster"),
                reason: "Position not filled".into(),
                position: Some(*pos),
            }),
            Weakness::LowProduction { position, .. } => suggestions.push(Suggestion {
                priority: Priority::Medium,
                action: format!("Upgrade your {position} position"),
                reason: "Below average performance".into(),
                position: Some(*position),
            }),
            Weakness::Unfilled { .. } => {}
        }
    }

    for analysis in team.players.iter().filter(|a| a.has_stats()) {
        if analysis.trend() == Trend::Declining {
            suggestions.push(Suggestion {
                priority: Priority::Medium,
                action: format!("Consider trading {}", analysis.player.name),
                reason: "Performance declining".into(),
                position: None,
            });
        }
    }

    suggestions.sort_by_key(|s| s.priority);
    suggestions.truncate(SUGGESTION_LIMIT);
    suggestions
}

#[cfg(test)]
mod tests {
    use super::*;
    use gridiron_core::config::RosterLimits;
    use gridiron_core::model::StatLine;
    use std::collections::HashMap;

    const SEASON: i32 = 2024;

    /// In-memory stat store keyed by player id.
    #[derive(Default)]
    struct MemStore {
        players: Vec<Player>,
        // Points per week, oldest first, weeks numbered from 1.
        points: HashMap<String, Vec<f64>>,
    }

    impl MemStore {
        fn with(mut self, id: &str, name: &str, position: Position, points: &[f64]) -> Self {
            self.players.push(Player {
                player_id: id.into(),
                name: name.into(),
                team: "FA".into(),
                position,
            });
            self.points.insert(id.into(), points.to_vec());
            self
        }
    }

    impl StatStore for MemStore {
        fn player(&self, player_id: &str) -> anyhow::Result<Option<Player>> {
            Ok(self.players.iter().find(|p| p.player_id == player_id).cloned())
        }

        fn players(&self, position: Option<Position>) -> anyhow::Result<Vec<Player>> {
            let mut out: Vec<Player> = self
                .players
                .iter()
                .filter(|p| position.map_or(true, |pos| p.position == pos))
                .cloned()
                .collect();
            out.sort_by(|a, b| a.name.cmp(&b.name));
            Ok(out)
        }

        fn recent_stats(
            &self,
            player_id: &str,
            season: i32,
            weeks: usize,
        ) -> anyhow::Result<Vec<WeeklyStat>> {
            let points = self.points.get(player_id).cloned().unwrap_or_default();
            Ok(points
                .iter()
                .enumerate()
                .rev()
                .take(weeks)
                .map(|(i, &p)| WeeklyStat {
                    player_id: player_id.into(),
                    week: i as u32 + 1,
                    season,
                    line: StatLine::default(),
                    fantasy_points: p,
                })
                .collect())
        }
    }

    fn config() -> AnalysisConfig {
        AnalysisConfig {
            weeks_to_analyze: 4,
            min_games_played: 2,
            valuation: Default::default(),
            trade: Default::default(),
        }
    }

    fn limits() -> RosterLimits {
        RosterLimits::new([
            (Position::Quarterback, 2),
            (Position::RunningBack, 4),
            (Position::WideReceiver, 4),
            (Position::TightEnd, 2),
            (Position::Kicker, 1),
            (Position::Defense, 1),
        ])
    }

    fn roster_of(store: &MemStore, ids: &[&str]) -> Roster {
        let mut roster = Roster::new(limits());
        for id in ids {
            let player = store.player(id).unwrap().unwrap();
            roster.add(player, "").unwrap();
        }
        roster
    }

    #[test]
    fn player_analysis_splits_recent_and_earlier() {
        let store = MemStore::default().with("1", "Runner", Position::RunningBack, &[10.0, 12.0, 20.0, 24.0]);
        let analyzer = Analyzer::new(&store, SEASON, config());

        let a = analyzer.player_analysis("1").unwrap();
        assert_eq!(a.games_played, 4);
        assert!((a.recent_avg - 22.0).abs() < 1e-9);
        assert!((a.earlier_avg - 11.0).abs() < 1e-9);
        assert!((a.total_points - 66.0).abs() < 1e-9);
        assert_eq!(a.recent_weeks[0].week, 4);
    }

    #[test]
    fn earlier_average_falls_back_to_recent() {
        let store = MemStore::default().with("1", "Rookie", Position::WideReceiver, &[8.0, 14.0]);
        let analyzer = Analyzer::new(&store, SEASON, config());
        let a = analyzer.player_analysis("1").unwrap();
        assert!((a.earlier_avg - a.recent_avg).abs() < 1e-9);
    }

    #[test]
    fn only_configured_weeks_are_read() {
        let store = MemStore::default().with(
            "1",
            "Veteran",
            Position::Quarterback,
            &[40.0, 40.0, 10.0, 10.0, 10.0, 10.0],
        );
        let analyzer = Analyzer::new(&store, SEASON, config());
        let a = analyzer.player_analysis("1").unwrap();
        assert_eq!(a.games_played, 4);
        assert_eq!(a.valuation.average, Some(10.0));
    }

    #[test]
    fn unknown_player_is_not_found() {
        let store = MemStore::default();
        let analyzer = Analyzer::new(&store, SEASON, config());
        assert!(matches!(
            analyzer.player_analysis("nope"),
            Err(FantasyError::NotFound(_))
        ));
    }

    #[test]
    fn rankings_skip_players_without_points() {
        let store = MemStore::default()
            .with("1", "Low", Position::TightEnd, &[5.0, 6.0])
            .with("2", "High", Position::TightEnd, &[15.0, 16.0])
            .with("3", "Idle", Position::TightEnd, &[])
            .with("4", "Other", Position::Kicker, &[9.0]);
        let analyzer = Analyzer::new(&store, SEASON, config());

        let names: Vec<String> = analyzer
            .position_rankings(Position::TightEnd)
            .unwrap()
            .into_iter()
            .map(|a| a.player.name)
            .collect();
        assert_eq!(names, vec!["High", "Low"]);
    }

    #[test]
    fn compare_requires_stats_on_both_sides() {
        let store = MemStore::default()
            .with("1", "Steady", Position::WideReceiver, &[15.0, 15.0, 15.0])
            .with("2", "Swingy", Position::WideReceiver, &[5.0, 25.0, 12.0])
            .with("3", "Idle", Position::WideReceiver, &[]);
        let analyzer = Analyzer::new(&store, SEASON, config());

        let cmp = analyzer.compare_players("1", "2").unwrap();
        assert!(cmp.points_diff > 0.0);
        assert_eq!(cmp.points_leader, "Steady");
        assert_eq!(cmp.consistency_leader.as_deref(), Some("Steady"));

        assert!(matches!(
            analyzer.compare_players("1", "3"),
            Err(FantasyError::InvalidInput(_))
        ));
    }

    #[test]
    fn breakouts_need_slope_and_games() {
        let store = MemStore::default()
            .with("1", "Rising", Position::WideReceiver, &[4.0, 8.0, 12.0, 16.0])
            .with("2", "Creeping", Position::WideReceiver, &[10.0, 12.5, 15.0, 17.5])
            .with("3", "Flat", Position::WideReceiver, &[10.0, 10.0, 10.0, 10.0]);
        let analyzer = Analyzer::new(&store, SEASON, config());

        let names: Vec<String> = analyzer
            .breakout_candidates(None, DEFAULT_BREAKOUT_SLOPE)
            .unwrap()
            .into_iter()
            .map(|a| a.player.name)
            .collect();
        // Slope 2.5 is improving but below the breakout bar.
        assert_eq!(names, vec!["Rising"]);
    }

    #[test]
    fn buy_low_and_sell_high() {
        let store = MemStore::default()
            // Earlier 20, recent 17, slope -1.0: a dip, trend stable.
            .with("1", "Dipping", Position::RunningBack, &[20.0, 20.0, 16.0, 18.0])
            // Earlier 10, recent 16, slope 2.8: improving, not a sell.
            .with("2", "Heating", Position::RunningBack, &[10.0, 10.0, 14.0, 18.0])
            // Earlier 10, recent 14, slope 1.2: stable spike.
            .with("3", "Spiking", Position::RunningBack, &[10.0, 10.0, 16.0, 12.0]);
        let analyzer = Analyzer::new(&store, SEASON, config());

        let buys = analyzer.buy_low_candidates(None).unwrap();
        assert_eq!(buys.len(), 1);
        assert_eq!(buys[0].analysis.player.name, "Dipping");
        assert!((buys[0].delta - 3.0).abs() < 1e-9);

        let sells = analyzer.sell_high_candidates(Some(Position::RunningBack)).unwrap();
        let names: Vec<&str> = sells.iter().map(|s| s.analysis.player.name.as_str()).collect();
        assert_eq!(names, vec!["Spiking"]);
        assert!((sells[0].delta - 4.0).abs() < 1e-9);
    }

    #[test]
    fn team_strengths_and_weaknesses() {
        let store = MemStore::default()
            .with("qb", "Star QB", Position::Quarterback, &[24.0, 26.0])
            .with("te", "Weak TE", Position::TightEnd, &[3.0, 4.0])
            .with("te2", "Backup TE", Position::TightEnd, &[4.0, 5.0]);
        let analyzer = Analyzer::new(&store, SEASON, config());
        let roster = roster_of(&store, &["qb", "te", "te2"]);

        let team = analyzer.team_analysis(&roster).unwrap();
        assert_eq!(team.team_size, 3);
        assert!((team.total_projected - 33.0).abs() < 1e-9);

        assert_eq!(
            team.strengths,
            vec![Strength {
                position: Position::Quarterback,
                average: 25.0
            }]
        );
        assert!(team.weaknesses.contains(&Weakness::Empty(Position::RunningBack)));
        assert!(team.weaknesses.contains(&Weakness::Unfilled {
            position: Position::Quarterback,
            count: 1,
            limit: 2
        }));
        assert!(team
            .weaknesses
            .iter()
            .any(|w| matches!(w, Weakness::LowProduction { position: Position::TightEnd, .. })));
        assert_eq!(
            Weakness::Empty(Position::Kicker).to_string(),
            "No K on roster"
        );
    }

    #[test]
    fn depth_grades() {
        let store = MemStore::default()
            .with("1", "WR One", Position::WideReceiver, &[15.0, 15.0])
            .with("2", "WR Two", Position::WideReceiver, &[12.0, 12.0])
            .with("3", "WR Three", Position::WideReceiver, &[4.0, 4.0])
            .with("4", "TE One", Position::TightEnd, &[12.0]);
        let analyzer = Analyzer::new(&store, SEASON, config());

        let roster = roster_of(&store, &["1", "2", "3", "4"]);
        let wr = analyzer
            .position_depth(&roster, Position::WideReceiver)
            .unwrap();
        assert_eq!(wr.grade, DepthGrade::Excellent);
        assert_eq!(wr.players[0].player.name, "WR One");
        assert_eq!(wr.limit, 4);

        let te = analyzer.position_depth(&roster, Position::TightEnd).unwrap();
        assert_eq!(te.grade, DepthGrade::Shallow);

        let k = analyzer.position_depth(&roster, Position::Kicker).unwrap();
        assert_eq!(k.grade, DepthGrade::None);

        let roster = roster_of(&store, &["1", "3"]);
        let wr = analyzer
            .position_depth(&roster, Position::WideReceiver)
            .unwrap();
        assert_eq!(wr.grade, DepthGrade::Adequate);
    }

    #[test]
    fn suggestions_put_empty_positions_first() {
        let store = MemStore::default()
            .with("1", "Fading RB", Position::RunningBack, &[25.0, 20.0, 15.0, 10.0]);
        let analyzer = Analyzer::new(&store, SEASON, config());
        let roster = roster_of(&store, &["1"]);

        let suggestions = analyzer.suggest_improvements(&roster).unwrap();
        assert!(suggestions.len() <= 10);
        assert_eq!(suggestions[0].priority, Priority::High);
        assert_eq!(suggestions[0].action, "Add a QB player to your roster");
        assert!(suggestions
            .iter()
            .any(|s| s.action == "Consider trading Fading RB"));
    }

    #[test]
    fn upgrades_beat_weakest_by_margin() {
        let store = MemStore::default()
            .with("mine", "My WR", Position::WideReceiver, &[6.0, 6.0, 6.0])
            .with("big", "Big WR", Position::WideReceiver, &[20.0, 20.0, 20.0])
            .with("close", "Close WR", Position::WideReceiver, &[6.5, 6.5, 6.5])
            .with("once", "One-game WR", Position::WideReceiver, &[30.0]);
        let analyzer = Analyzer::new(&store, SEASON, config());
        let roster = roster_of(&store, &["mine"]);

        let upgrades = analyzer.upgrade_opportunities(&roster, None).unwrap();
        let targets: Vec<&str> = upgrades
            .iter()
            .map(|u| u.upgrade_to.player.name.as_str())
            .collect();
        assert_eq!(targets, vec!["Big WR"]);
        assert_eq!(upgrades[0].upgrade_from.player.name, "My WR");
        assert!(upgrades[0].value_gain > 0.0);
    }

    #[test]
    fn trade_targets_cover_needs_and_shop_decliners() {
        let store = MemStore::default()
            .with("rb", "Fading RB", Position::RunningBack, &[25.0, 20.0, 15.0, 10.0])
            .with("qb1", "Top QB", Position::Quarterback, &[25.0, 25.0])
            .with("qb2", "Next QB", Position::Quarterback, &[20.0, 20.0]);
        let analyzer = Analyzer::new(&store, SEASON, config());
        let roster = roster_of(&store, &["rb"]);

        let targets = analyzer.trade_targets(&roster).unwrap();
        let acquire: Vec<&str> = targets
            .to_acquire
            .iter()
            .map(|t| t.analysis.player.name.as_str())
            .collect();
        assert_eq!(acquire, vec!["Top QB", "Next QB"]);
        assert_eq!(targets.to_acquire[0].reason, "Add a QB player to your roster");

        assert_eq!(targets.to_trade_away.len(), 1);
        assert_eq!(targets.to_trade_away[0].reason, "Trending declining");
    }
}
