// Core data model: players, positions, weekly stat lines, scoring formats.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ---------------------------------------------------------------------------
// Position
// ---------------------------------------------------------------------------

/// Fantasy-relevant NFL positions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Position {
    Quarterback,
    RunningBack,
    WideReceiver,
    TightEnd,
    Kicker,
    Defense,
}

impl Position {
    /// All positions in display order.
    pub const ALL: [Position; 6] = [
        Position::Quarterback,
        Position::RunningBack,
        Position::WideReceiver,
        Position::TightEnd,
        Position::Kicker,
        Position::Defense,
    ];

    /// Parse a position abbreviation. Case-insensitive; accepts `DST` and
    /// `D/ST` as aliases for team defense.
    pub fn from_str_pos(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "QB" => Some(Position::Quarterback),
            "RB" => Some(Position::RunningBack),
            "WR" => Some(Position::WideReceiver),
            "TE" => Some(Position::TightEnd),
            "K" | "PK" => Some(Position::Kicker),
            "DEF" | "DST" | "D/ST" => Some(Position::Defense),
            _ => None,
        }
    }

    /// Return the display abbreviation for this position.
    pub fn display_str(&self) -> &'static str {
        match self {
            Position::Quarterback => "QB",
            Position::RunningBack => "RB",
            Position::WideReceiver => "WR",
            Position::TightEnd => "TE",
            Position::Kicker => "K",
            Position::Defense => "DEF",
        }
    }

    /// Deterministic ordering index for roster display.
    pub fn sort_order(&self) -> u8 {
        match self {
            Position::Quarterback => 0,
            Position::RunningBack => 1,
            Position::WideReceiver => 2,
            Position::TightEnd => 3,
            Position::Kicker => 4,
            Position::Defense => 5,
        }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display_str())
    }
}

impl FromStr for Position {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Position::from_str_pos(s).ok_or_else(|| format!("unknown position '{s}'"))
    }
}

// ---------------------------------------------------------------------------
// Scoring format
// ---------------------------------------------------------------------------

/// League scoring format. Only the per-reception bonus differs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScoringFormat {
    #[serde(rename = "PPR")]
    Ppr,
    #[serde(rename = "Half-PPR")]
    HalfPpr,
    #[serde(rename = "Standard")]
    Standard,
}

impl ScoringFormat {
    /// Points awarded per reception.
    pub fn reception_points(&self) -> f64 {
        match self {
            ScoringFormat::Ppr => 1.0,
            ScoringFormat::HalfPpr => 0.5,
            ScoringFormat::Standard => 0.0,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ScoringFormat::Ppr => "PPR",
            ScoringFormat::HalfPpr => "Half-PPR",
            ScoringFormat::Standard => "Standard",
        }
    }
}

impl fmt::Display for ScoringFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for ScoringFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .trim()
            .to_uppercase()
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .collect();
        match normalized.as_str() {
            "PPR" | "FULLPPR" => Ok(ScoringFormat::Ppr),
            "HALFPPR" | "HALF" => Ok(ScoringFormat::HalfPpr),
            "STANDARD" | "STD" => Ok(ScoringFormat::Standard),
            _ => Err(format!(
                "unknown scoring format '{s}' (expected PPR, Half-PPR or Standard)"
            )),
        }
    }
}

// ---------------------------------------------------------------------------
// Players and stats
// ---------------------------------------------------------------------------

/// An NFL player as stored locally.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Player {
    pub player_id: String,
    pub name: String,
    /// Team abbreviation, `FA` for free agents.
    pub team: String,
    pub position: Position,
}

/// Box-score fields for one player-week. Yardage is fractional because some
/// upstream sources report it that way.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct StatLine {
    pub passing_yards: f64,
    pub passing_tds: u32,
    pub interceptions: u32,
    pub rushing_yards: f64,
    pub rushing_tds: u32,
    pub receptions: u32,
    pub receiving_yards: f64,
    pub receiving_tds: u32,
    pub fumbles: u32,
}

/// One player's stat line for a single week of a season.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeeklyStat {
    pub player_id: String,
    pub week: u32,
    pub season: i32,
    pub line: StatLine,
    pub fantasy_points: f64,
}

/// A player on the user's roster.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RosterEntry {
    pub player: Player,
    pub added_at: DateTime<Utc>,
    #[serde(default)]
    pub notes: String,
}

/// Append-only snapshot of an evaluated trade.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeRecord {
    /// Row id, `None` until persisted.
    pub id: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub given: Vec<String>,
    pub received: Vec<String>,
    pub value_given: f64,
    pub value_received: f64,
    /// `None` when the given side was worth nothing.
    pub percent_change: Option<f64>,
    pub recommendation: String,
    pub reason: String,
}
