// Interactive text menu over the analysis, roster, trade, refresh, and CSV
// features. Input and output are generic so the loop can be scripted.

use std::io::{BufRead, Write};
use std::path::PathBuf;

use tabled::{Table, Tabled};
use tracing::{error, info};

use gridiron_core::config::Config;
use gridiron_core::db::Database;
use gridiron_core::error::FantasyError;
use gridiron_core::model::{Player, Position};
use gridiron_football::analysis::{
    Analyzer, MarketSignal, PlayerAnalysis, DEFAULT_BREAKOUT_SLOPE,
};
use gridiron_football::csv_io::{self, StatDefaults};
use gridiron_football::roster::Roster;
use gridiron_football::trade::{ScoredPlayer, TradeEvaluator};

use crate::fetch::StatsSource;
use crate::refresh::{RefreshService, RefreshSummary};

const SEARCH_LIMIT: usize = 10;
const RANKING_LIMIT: usize = 20;
const HISTORY_LIMIT: usize = 20;
/// Row errors printed after a CSV import.
const SHOWN_IMPORT_ERRORS: usize = 5;

const EXTERNAL_SERVICE_HINT: &str =
    "Could not reach the data service. You can load data manually with option 17 (Import CSV).";

const MENU: &str = "
=== Gridiron Fantasy Football ===
 1. Full data refresh
 2. Quick update (current week)
 3. View my team
 4. Add player to team
 5. Remove player from team
 6. Analyze my team
 7. Improvement suggestions
 8. Search and analyze a player
 9. Compare two players
10. Top players by position
11. Breakout candidates
12. Buy-low candidates
13. Sell-high candidates
14. Evaluate a trade
15. Upgrade opportunities
16. Trade recommendations
17. Import CSV
18. Export CSV templates
19. Trade history
 0. Exit";

// ---------------------------------------------------------------------------
// Table rows
// ---------------------------------------------------------------------------

fn fmt_opt(value: Option<f64>) -> String {
    value.map_or_else(|| "-".to_string(), |v| format!("{v:.1}"))
}

#[derive(Tabled)]
struct RosterRow {
    #[tabled(rename = "Pos")]
    pos: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Team")]
    team: String,
    #[tabled(rename = "Avg")]
    avg: String,
    #[tabled(rename = "Trend")]
    trend: String,
    #[tabled(rename = "Notes")]
    notes: String,
}

#[derive(Tabled)]
struct RankingRow {
    #[tabled(rename = "#")]
    rank: usize,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Pos")]
    pos: String,
    #[tabled(rename = "Team")]
    team: String,
    #[tabled(rename = "Avg")]
    avg: String,
    #[tabled(rename = "Consistency")]
    consistency: String,
    #[tabled(rename = "Trend")]
    trend: String,
    #[tabled(rename = "Value")]
    value: String,
    #[tabled(rename = "Games")]
    games: usize,
}

impl RankingRow {
    fn new(rank: usize, a: &PlayerAnalysis) -> Self {
        RankingRow {
            rank,
            name: a.player.name.clone(),
            pos: a.player.position.to_string(),
            team: a.player.team.clone(),
            avg: format!("{:.1}", a.average()),
            consistency: fmt_opt(a.valuation.consistency),
            trend: match a.valuation.trend.slope {
                Some(slope) => format!("{} ({slope:+.1})", a.trend()),
                None => a.trend().to_string(),
            },
            value: format!("{:.1}", a.valuation.score),
            games: a.games_played,
        }
    }
}

#[derive(Tabled)]
struct WeekRow {
    #[tabled(rename = "Week")]
    week: u32,
    #[tabled(rename = "Pts")]
    points: String,
    #[tabled(rename = "Pass Yds")]
    pass_yds: String,
    #[tabled(rename = "Rush Yds")]
    rush_yds: String,
    #[tabled(rename = "Rec")]
    receptions: u32,
    #[tabled(rename = "Rec Yds")]
    rec_yds: String,
    #[tabled(rename = "TD")]
    tds: u32,
}

#[derive(Tabled)]
struct PositionRow {
    #[tabled(rename = "Pos")]
    pos: String,
    #[tabled(rename = "Filled")]
    filled: String,
    #[tabled(rename = "Avg/Player")]
    avg: String,
}

#[derive(Tabled)]
struct MarketRow {
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Pos")]
    pos: String,
    #[tabled(rename = "Avg")]
    avg: String,
    #[tabled(rename = "Recent")]
    recent: String,
    #[tabled(rename = "Earlier")]
    earlier: String,
    #[tabled(rename = "Change")]
    change: String,
}

impl MarketRow {
    fn new(signal: &MarketSignal) -> Self {
        let a = &signal.analysis;
        MarketRow {
            name: a.player.name.clone(),
            pos: a.player.position.to_string(),
            avg: format!("{:.1}", a.average()),
            recent: format!("{:.1}", a.recent_avg),
            earlier: format!("{:.1}", a.earlier_avg),
            change: format!("{:.1}", signal.delta),
        }
    }
}

#[derive(Tabled)]
struct TradeRow {
    #[tabled(rename = "Side")]
    side: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Pos")]
    pos: String,
    #[tabled(rename = "Avg")]
    avg: String,
    #[tabled(rename = "Value")]
    value: String,
}

impl TradeRow {
    fn new(side: &str, s: &ScoredPlayer) -> Self {
        TradeRow {
            side: side.to_string(),
            name: s.player.name.clone(),
            pos: s.player.position.to_string(),
            avg: fmt_opt(s.valuation.average),
            value: if s.need_boost {
                format!("{:.1} (need)", s.value)
            } else {
                format!("{:.1}", s.value)
            },
        }
    }
}

#[derive(Tabled)]
struct UpgradeRow {
    #[tabled(rename = "Pos")]
    pos: String,
    #[tabled(rename = "Replace")]
    from: String,
    #[tabled(rename = "With")]
    to: String,
    #[tabled(rename = "Team")]
    team: String,
    #[tabled(rename = "Avg")]
    avg: String,
    #[tabled(rename = "Value Gain")]
    gain: String,
}

#[derive(Tabled)]
struct TargetRow {
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Pos")]
    pos: String,
    #[tabled(rename = "Team")]
    team: String,
    #[tabled(rename = "Avg")]
    avg: String,
    #[tabled(rename = "Reason")]
    reason: String,
}

#[derive(Tabled)]
struct HistoryRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Date")]
    date: String,
    #[tabled(rename = "Gave")]
    given: String,
    #[tabled(rename = "Got")]
    received: String,
    #[tabled(rename = "Change")]
    change: String,
    #[tabled(rename = "Recommendation")]
    recommendation: String,
}

// ---------------------------------------------------------------------------
// Menu
// ---------------------------------------------------------------------------

pub struct Menu<'a, R, W> {
    config: &'a Config,
    db: &'a Database,
    source: &'a dyn StatsSource,
    input: R,
    out: W,
    roster: Roster,
    /// Directory CSV templates are exported to.
    export_dir: PathBuf,
}

impl<'a, R: BufRead, W: Write> Menu<'a, R, W> {
    /// Build the menu, loading the saved roster from the database.
    pub fn new(
        config: &'a Config,
        db: &'a Database,
        source: &'a dyn StatsSource,
        input: R,
        out: W,
    ) -> anyhow::Result<Self> {
        let roster = Roster::from_entries(db.roster_entries()?, config.roster_limits.clone());
        Ok(Menu {
            config,
            db,
            source,
            input,
            out,
            roster,
            export_dir: PathBuf::from("."),
        })
    }

    pub fn with_export_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.export_dir = dir.into();
        self
    }

    pub fn roster(&self) -> &Roster {
        &self.roster
    }

    /// Main loop. Returns on option 0 or end of input.
    pub async fn run(&mut self) -> anyhow::Result<()> {
        self.print_banner()?;

        loop {
            writeln!(self.out, "{MENU}")?;
            let Some(choice) = self.read_line("\nSelect an option: ")? else {
                break;
            };

            let result = match choice.as_str() {
                "0" => {
                    writeln!(self.out, "Goodbye!")?;
                    break;
                }
                "1" => self.full_refresh().await,
                "2" => self.quick_update().await,
                "3" => self.view_team(),
                "4" => self.add_player(),
                "5" => self.remove_player(),
                "6" => self.analyze_team(),
                "7" => self.suggestions(),
                "8" => self.analyze_player(),
                "9" => self.compare_players(),
                "10" => self.top_players(),
                "11" => self.breakouts(),
                "12" => self.buy_low(),
                "13" => self.sell_high(),
                "14" => self.evaluate_trade(),
                "15" => self.upgrades(),
                "16" => self.trade_recommendations(),
                "17" => self.import_csv(),
                "18" => self.export_templates(),
                "19" => self.trade_history(),
                "" => continue,
                other => {
                    writeln!(self.out, "Invalid option '{other}'.")?;
                    continue;
                }
            };

            if let Err(e) = result {
                self.report_error(&e)?;
            }
        }
        Ok(())
    }

    fn report_error(&mut self, e: &anyhow::Error) -> anyhow::Result<()> {
        error!("Menu action failed: {:#}", e);
        match e.downcast_ref::<FantasyError>() {
            Some(FantasyError::ExternalService(_)) => {
                writeln!(self.out, "Error: {e}")?;
                writeln!(self.out, "{EXTERNAL_SERVICE_HINT}")?;
            }
            _ => writeln!(self.out, "Error: {e:#}")?,
        }
        Ok(())
    }

    fn print_banner(&mut self) -> anyhow::Result<()> {
        let players = self.db.player_count()?;
        writeln!(
            self.out,
            "Season {} | {} scoring | {} players in database | {} on your team",
            self.config.current_season(),
            self.config.league.scoring_format,
            players,
            self.roster.len()
        )?;
        match self.db.last_refresh()? {
            Some(at) => writeln!(self.out, "Last refresh: {}", at.format("%Y-%m-%d %H:%M UTC"))?,
            None => writeln!(
                self.out,
                "No data refresh yet. Run option 1 or import CSV data with option 17."
            )?,
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Input helpers
    // ------------------------------------------------------------------

    /// Prompt and read one trimmed line. `None` at end of input.
    fn read_line(&mut self, prompt: &str) -> anyhow::Result<Option<String>> {
        write!(self.out, "{prompt}")?;
        self.out.flush()?;
        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Ok(None);
        }
        Ok(Some(line.trim().to_string()))
    }

    /// Prompt and read one line, empty at end of input.
    fn ask(&mut self, prompt: &str) -> anyhow::Result<String> {
        Ok(self.read_line(prompt)?.unwrap_or_default())
    }

    fn ask_position(&mut self, optional: bool) -> anyhow::Result<Option<Position>> {
        let prompt = if optional {
            "Position (QB/RB/WR/TE/K/DEF, blank for all): "
        } else {
            "Position (QB/RB/WR/TE/K/DEF): "
        };
        let answer = self.ask(prompt)?;
        if answer.is_empty() && optional {
            return Ok(None);
        }
        let position = answer
            .parse::<Position>()
            .map_err(FantasyError::InvalidInput)?;
        Ok(Some(position))
    }

    /// Resolve a name fragment or id to one player without prompting.
    fn resolve_player(&self, term: &str) -> anyhow::Result<Player> {
        if let Some(player) = self.db.get_player(term)? {
            return Ok(player);
        }
        let matches = self.db.search_players(term, SEARCH_LIMIT)?;
        if let Some(exact) = matches.iter().find(|p| p.name.eq_ignore_ascii_case(term)) {
            return Ok(exact.clone());
        }
        match matches.as_slice() {
            [] => Err(FantasyError::NotFound(format!("no player matches '{term}'")).into()),
            [only] => Ok(only.clone()),
            many => Err(FantasyError::InvalidInput(format!(
                "'{term}' matches {} players; be more specific",
                many.len()
            ))
            .into()),
        }
    }

    /// Search by name and let the user pick from the matches.
    fn select_player(&mut self, prompt: &str) -> anyhow::Result<Option<Player>> {
        let term = self.ask(prompt)?;
        if term.is_empty() {
            return Ok(None);
        }
        if let Some(player) = self.db.get_player(&term)? {
            return Ok(Some(player));
        }

        let mut matches = self.db.search_players(&term, SEARCH_LIMIT)?;
        match matches.len() {
            0 => Err(FantasyError::NotFound(format!("no player matches '{term}'")).into()),
            1 => Ok(matches.pop()),
            _ => {
                for (i, p) in matches.iter().enumerate() {
                    writeln!(self.out, "{:>2}. {} ({}, {})", i + 1, p.name, p.position, p.team)?;
                }
                let pick = self.ask(&format!("Choose 1-{}: ", matches.len()))?;
                let idx: usize = pick
                    .parse()
                    .ok()
                    .filter(|n| (1..=matches.len()).contains(n))
                    .ok_or_else(|| FantasyError::InvalidInput(format!("invalid choice '{pick}'")))?;
                Ok(Some(matches.swap_remove(idx - 1)))
            }
        }
    }

    fn analyzer(&self) -> Analyzer<'a, Database> {
        Analyzer::new(
            self.db,
            self.config.current_season(),
            self.config.analysis.clone(),
        )
    }

    fn print_table<T: Tabled>(&mut self, rows: Vec<T>) -> anyhow::Result<()> {
        writeln!(self.out, "{}", Table::new(rows))?;
        Ok(())
    }

    fn print_rankings(&mut self, analyses: &[PlayerAnalysis]) -> anyhow::Result<()> {
        let rows: Vec<RankingRow> = analyses
            .iter()
            .enumerate()
            .map(|(i, a)| RankingRow::new(i + 1, a))
            .collect();
        self.print_table(rows)
    }

    // ------------------------------------------------------------------
    // 1-2: data refresh
    // ------------------------------------------------------------------

    fn refresh_service(&self) -> RefreshService<'a> {
        RefreshService::new(
            self.source,
            self.db,
            self.config.current_season(),
            self.config.league.scoring_format,
        )
    }

    fn print_refresh(&mut self, summary: &RefreshSummary) -> anyhow::Result<()> {
        if let Some(players) = summary.players {
            writeln!(self.out, "Updated {players} players.")?;
        }
        for (week, rows) in &summary.weeks {
            writeln!(self.out, "Week {week}: {rows} stat rows.")?;
        }
        writeln!(self.out, "Data refresh complete!")?;
        Ok(())
    }

    async fn full_refresh(&mut self) -> anyhow::Result<()> {
        writeln!(self.out, "Starting full data refresh...")?;
        let summary = self
            .refresh_service()
            .full_refresh(self.config.refresh.weeks_to_fetch)
            .await?;
        self.print_refresh(&summary)
    }

    async fn quick_update(&mut self) -> anyhow::Result<()> {
        writeln!(self.out, "Updating current week...")?;
        let summary = self.refresh_service().quick_update().await?;
        self.print_refresh(&summary)
    }

    // ------------------------------------------------------------------
    // 3-7: roster
    // ------------------------------------------------------------------

    fn view_team(&mut self) -> anyhow::Result<()> {
        if self.roster.is_empty() {
            writeln!(self.out, "Your team is empty. Use option 4 to add players.")?;
            return Ok(());
        }

        let analyzer = self.analyzer();
        let mut rows = Vec::new();
        for entry in self.roster.players() {
            let a = analyzer.player_analysis(&entry.player.player_id)?;
            rows.push(RosterRow {
                pos: entry.player.position.to_string(),
                name: entry.player.name.clone(),
                team: entry.player.team.clone(),
                avg: fmt_opt(a.valuation.average),
                trend: if a.has_stats() {
                    a.trend().to_string()
                } else {
                    "no data".to_string()
                },
                notes: entry.notes.clone(),
            });
        }

        writeln!(self.out, "\nMy Team ({} players)", self.roster.len())?;
        self.print_table(rows)
    }

    fn add_player(&mut self) -> anyhow::Result<()> {
        let Some(player) = self.select_player("Player name to add: ")? else {
            return Ok(());
        };
        let notes = self.ask("Notes (optional): ")?;

        self.roster.add(player.clone(), &notes)?;
        if let Err(e) = self.db.add_roster_entry(&player.player_id, &notes) {
            let _ = self.roster.remove(&player.player_id);
            return Err(e);
        }
        info!("Added {} to team", player.name);
        writeln!(
            self.out,
            "Added {} ({}, {}) to your team.",
            player.name, player.position, player.team
        )?;
        Ok(())
    }

    fn remove_player(&mut self) -> anyhow::Result<()> {
        if self.roster.is_empty() {
            writeln!(self.out, "Your team is empty.")?;
            return Ok(());
        }

        let listed: Vec<(String, String)> = self
            .roster
            .players()
            .iter()
            .map(|e| (e.player.player_id.clone(), e.player.name.clone()))
            .collect();
        for (i, (_, name)) in listed.iter().enumerate() {
            writeln!(self.out, "{:>2}. {}", i + 1, name)?;
        }

        let pick = self.ask("Number of the player to remove: ")?;
        if pick.is_empty() {
            return Ok(());
        }
        let (player_id, name) = pick
            .parse::<usize>()
            .ok()
            .and_then(|n| n.checked_sub(1))
            .and_then(|i| listed.get(i).cloned())
            .ok_or_else(|| FantasyError::InvalidInput(format!("invalid choice '{pick}'")))?;

        self.roster.remove(&player_id)?;
        self.db.remove_roster_entry(&player_id)?;
        info!("Removed {} from team", name);
        writeln!(self.out, "Removed {name} from your team.")?;
        Ok(())
    }

    fn analyze_team(&mut self) -> anyhow::Result<()> {
        if self.roster.is_empty() {
            writeln!(self.out, "Your team is empty. Use option 4 to add players.")?;
            return Ok(());
        }

        let team = self.analyzer().team_analysis(&self.roster)?;
        writeln!(
            self.out,
            "\nTeam size: {} | Projected weekly points: {:.1}",
            team.team_size, team.total_projected
        )?;

        let rows: Vec<PositionRow> = team
            .positions
            .iter()
            .map(|s| PositionRow {
                pos: s.position.to_string(),
                filled: format!("{}/{}", s.count, s.limit),
                avg: fmt_opt(s.average),
            })
            .collect();
        self.print_table(rows)?;

        writeln!(self.out, "\nStrengths:")?;
        if team.strengths.is_empty() {
            writeln!(self.out, "  (none)")?;
        }
        for s in &team.strengths {
            writeln!(self.out, "  + {s}")?;
        }
        writeln!(self.out, "Weaknesses:")?;
        if team.weaknesses.is_empty() {
            writeln!(self.out, "  (none)")?;
        }
        for w in &team.weaknesses {
            writeln!(self.out, "  - {w}")?;
        }

        for position in Position::ALL {
            let depth = self.analyzer().position_depth(&self.roster, position)?;
            if depth.count > 0 {
                writeln!(self.out, "{position} depth: {}", depth.grade)?;
            }
        }
        Ok(())
    }

    fn suggestions(&mut self) -> anyhow::Result<()> {
        let suggestions = self.analyzer().suggest_improvements(&self.roster)?;
        if suggestions.is_empty() {
            writeln!(self.out, "No suggestions. Your team looks solid!")?;
            return Ok(());
        }
        for (i, s) in suggestions.iter().enumerate() {
            writeln!(
                self.out,
                "{:>2}. [{}] {} ({})",
                i + 1,
                s.priority,
                s.action,
                s.reason
            )?;
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // 8-13: player analysis
    // ------------------------------------------------------------------

    fn analyze_player(&mut self) -> anyhow::Result<()> {
        let Some(player) = self.select_player("Player name: ")? else {
            return Ok(());
        };
        let a = self.analyzer().player_analysis(&player.player_id)?;

        writeln!(
            self.out,
            "\n{} ({}, {})",
            a.player.name, a.player.position, a.player.team
        )?;
        if !a.has_stats() {
            writeln!(self.out, "No stats available for season {}.", self.config.current_season())?;
            return Ok(());
        }
        writeln!(
            self.out,
            "Avg: {:.1} | Consistency: {} | Trend: {} | Value: {:.1}",
            a.average(),
            fmt_opt(a.valuation.consistency),
            a.trend(),
            a.valuation.score
        )?;
        writeln!(
            self.out,
            "Recent avg: {:.1} | Earlier avg: {:.1} | Games: {} | Total: {:.1}",
            a.recent_avg, a.earlier_avg, a.games_played, a.total_points
        )?;

        let rows: Vec<WeekRow> = a
            .recent_weeks
            .iter()
            .map(|w| WeekRow {
                week: w.week,
                points: format!("{:.2}", w.fantasy_points),
                pass_yds: format!("{:.0}", w.line.passing_yards),
                rush_yds: format!("{:.0}", w.line.rushing_yards),
                receptions: w.line.receptions,
                rec_yds: format!("{:.0}", w.line.receiving_yards),
                tds: w.line.passing_tds + w.line.rushing_tds + w.line.receiving_tds,
            })
            .collect();
        self.print_table(rows)
    }

    fn compare_players(&mut self) -> anyhow::Result<()> {
        let Some(first) = self.select_player("First player: ")? else {
            return Ok(());
        };
        let Some(second) = self.select_player("Second player: ")? else {
            return Ok(());
        };

        let cmp = self
            .analyzer()
            .compare_players(&first.player_id, &second.player_id)?;
        self.print_rankings(&[cmp.first.clone(), cmp.second.clone()])?;
        writeln!(
            self.out,
            "Points: {} by {:.1} per game",
            cmp.points_leader,
            cmp.points_diff.abs()
        )?;
        match (&cmp.consistency_leader, cmp.consistency_diff) {
            (Some(leader), Some(diff)) => {
                writeln!(self.out, "Consistency: {} by {:.1}", leader, diff.abs())?
            }
            _ => writeln!(self.out, "Consistency: not enough games to compare")?,
        }
        Ok(())
    }

    fn top_players(&mut self) -> anyhow::Result<()> {
        let Some(position) = self.ask_position(false)? else {
            return Ok(());
        };
        let mut ranked = self.analyzer().position_rankings(position)?;
        if ranked.is_empty() {
            writeln!(self.out, "No {position} players with stats yet.")?;
            return Ok(());
        }
        ranked.truncate(RANKING_LIMIT);
        writeln!(self.out, "\nTop {position}s")?;
        self.print_rankings(&ranked)
    }

    fn breakouts(&mut self) -> anyhow::Result<()> {
        let position = self.ask_position(true)?;
        let candidates = self
            .analyzer()
            .breakout_candidates(position, DEFAULT_BREAKOUT_SLOPE)?;
        if candidates.is_empty() {
            writeln!(self.out, "No breakout candidates found.")?;
            return Ok(());
        }
        writeln!(self.out, "\nBreakout candidates")?;
        self.print_rankings(&candidates)
    }

    fn buy_low(&mut self) -> anyhow::Result<()> {
        let position = self.ask_position(true)?;
        let candidates = self.analyzer().buy_low_candidates(position)?;
        if candidates.is_empty() {
            writeln!(self.out, "No buy-low candidates found.")?;
            return Ok(());
        }
        writeln!(self.out, "\nBuy-low candidates (Change = dip)")?;
        self.print_table(candidates.iter().map(MarketRow::new).collect())
    }

    fn sell_high(&mut self) -> anyhow::Result<()> {
        let position = self.ask_position(true)?;
        let candidates = self.analyzer().sell_high_candidates(position)?;
        if candidates.is_empty() {
            writeln!(self.out, "No sell-high candidates found.")?;
            return Ok(());
        }
        writeln!(self.out, "\nSell-high candidates (Change = spike)")?;
        self.print_table(candidates.iter().map(MarketRow::new).collect())
    }

    // ------------------------------------------------------------------
    // 14-16: trades
    // ------------------------------------------------------------------

    fn ask_trade_side(&mut self, prompt: &str) -> anyhow::Result<Vec<String>> {
        let answer = self.ask(prompt)?;
        answer
            .split(',')
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(|term| self.resolve_player(term).map(|p| p.player_id))
            .collect()
    }

    fn evaluate_trade(&mut self) -> anyhow::Result<()> {
        let given = self.ask_trade_side("Players you give (comma-separated names or ids): ")?;
        let received = self.ask_trade_side("Players you receive (comma-separated names or ids): ")?;

        let evaluator = TradeEvaluator::new(
            self.db,
            self.config.current_season(),
            self.config.analysis.weeks_to_analyze,
            self.config.analysis.valuation,
            self.config.analysis.trade,
        );
        let evaluation = evaluator.evaluate(&given, &received, &self.roster)?;

        let rows: Vec<TradeRow> = evaluation
            .given
            .iter()
            .map(|s| TradeRow::new("Give", s))
            .chain(evaluation.received.iter().map(|s| TradeRow::new("Get", s)))
            .collect();
        self.print_table(rows)?;

        writeln!(
            self.out,
            "Value given: {:.1} | Value received: {:.1} | Change: {}",
            evaluation.value_given,
            evaluation.value_received,
            evaluation
                .percent_change
                .map_or_else(|| "n/a".to_string(), |p| format!("{p:+.1}%"))
        )?;
        writeln!(self.out, "Recommendation: {}", evaluation.recommendation)?;
        for line in &evaluation.rationale {
            writeln!(self.out, "  - {line}")?;
        }

        let id = self.db.record_trade(&evaluation.to_record())?;
        info!("Recorded trade evaluation #{}", id);
        Ok(())
    }

    fn upgrades(&mut self) -> anyhow::Result<()> {
        let position = self.ask_position(true)?;
        let upgrades = self
            .analyzer()
            .upgrade_opportunities(&self.roster, position)?;
        if upgrades.is_empty() {
            writeln!(self.out, "No upgrade opportunities found.")?;
            return Ok(());
        }
        let rows = upgrades
            .iter()
            .map(|u| UpgradeRow {
                pos: u.position.to_string(),
                from: u.upgrade_from.player.name.clone(),
                to: u.upgrade_to.player.name.clone(),
                team: u.upgrade_to.player.team.clone(),
                avg: format!("{:.1}", u.upgrade_to.average()),
                gain: format!("{:+.1}", u.value_gain),
            })
            .collect();
        self.print_table(rows)
    }

    fn trade_recommendations(&mut self) -> anyhow::Result<()> {
        let targets = self.analyzer().trade_targets(&self.roster)?;
        let to_row = |t: &gridiron_football::analysis::TradeTarget| TargetRow {
            name: t.analysis.player.name.clone(),
            pos: t.analysis.player.position.to_string(),
            team: t.analysis.player.team.clone(),
            avg: format!("{:.1}", t.analysis.average()),
            reason: t.reason.clone(),
        };

        writeln!(self.out, "\nPlayers to target:")?;
        if targets.to_acquire.is_empty() {
            writeln!(self.out, "  (none)")?;
        } else {
            self.print_table(targets.to_acquire.iter().map(to_row).collect())?;
        }
        writeln!(self.out, "Players to shop:")?;
        if targets.to_trade_away.is_empty() {
            writeln!(self.out, "  (none)")?;
        } else {
            self.print_table(targets.to_trade_away.iter().map(to_row).collect())?;
        }
        Ok(())
    }

    fn trade_history(&mut self) -> anyhow::Result<()> {
        let history = self.db.trade_history(HISTORY_LIMIT)?;
        if history.is_empty() {
            writeln!(self.out, "No trades evaluated yet.")?;
            return Ok(());
        }
        let rows = history
            .iter()
            .map(|t| HistoryRow {
                id: t.id.map_or_else(String::new, |id| id.to_string()),
                date: t.created_at.format("%Y-%m-%d").to_string(),
                given: t.given.join(", "),
                received: t.received.join(", "),
                change: t
                    .percent_change
                    .map_or_else(|| "n/a".to_string(), |p| format!("{p:+.1}%")),
                recommendation: t.recommendation.clone(),
            })
            .collect();
        self.print_table(rows)
    }

    // ------------------------------------------------------------------
    // 17-18: CSV
    // ------------------------------------------------------------------

    fn import_csv(&mut self) -> anyhow::Result<()> {
        let kind = self.ask("Import (1) players or (2) stats? ")?;
        let path = PathBuf::from(self.ask("CSV file path: ")?);

        let report = match kind.as_str() {
            "1" => csv_io::import_players(self.db, &path)?,
            "2" => {
                let week = self.ask("Week for rows without one (blank to skip): ")?;
                let season = self.ask("Season for rows without one (blank for current): ")?;
                let defaults = StatDefaults {
                    week: if week.is_empty() {
                        None
                    } else {
                        Some(week.parse().map_err(|_| {
                            FantasyError::InvalidInput(format!("invalid week '{week}'"))
                        })?)
                    },
                    season: if season.is_empty() {
                        Some(self.config.current_season())
                    } else {
                        Some(season.parse().map_err(|_| {
                            FantasyError::InvalidInput(format!("invalid season '{season}'"))
                        })?)
                    },
                };
                csv_io::import_stats(self.db, &path, defaults, self.config.league.scoring_format)?
            }
            other => {
                return Err(FantasyError::InvalidInput(format!("invalid choice '{other}'")).into())
            }
        };

        writeln!(
            self.out,
            "Imported {} rows from {} ({} skipped).",
            report.imported,
            path.display(),
            report.errors.len()
        )?;
        for row in report.errors.iter().take(SHOWN_IMPORT_ERRORS) {
            writeln!(self.out, "  line {}: {}", row.line, row.error)?;
        }
        Ok(())
    }

    fn export_templates(&mut self) -> anyhow::Result<()> {
        let paths = csv_io::export_templates(&self.export_dir)?;
        for path in paths {
            writeln!(self.out, "Wrote {}", path.display())?;
        }
        Ok(())
    }
}
