// Narrow read interface the analysis layer queries player data through.

use anyhow::Result;

use crate::model::{Player, Position, WeeklyStat};

/// Read-only access to players and their weekly stats.
///
/// `Database` is the production implementation; tests may substitute an
/// in-memory one.
pub trait StatStore {
    /// Look up a player by id.
    fn player(&self, player_id: &str) -> Result<Option<Player>>;

    /// All players, optionally filtered by position, ordered by name.
    fn players(&self, position: Option<Position>) -> Result<Vec<Player>>;

    /// Up to `weeks` most recent stat lines for a player in `season`, newest
    /// first.
    fn recent_stats(&self, player_id: &str, season: i32, weeks: usize) -> Result<Vec<WeeklyStat>>;
}
