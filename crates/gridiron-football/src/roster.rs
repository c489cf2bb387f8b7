// The user's roster: entries bounded per position by configured limits.

use std::collections::BTreeMap;

use chrono::Utc;
use tracing::debug;

use gridiron_core::config::RosterLimits;
use gridiron_core::error::{FantasyError, Result};
use gridiron_core::model::{Player, Position, RosterEntry};

/// A position with fewer players than this (or than its limit, if smaller)
/// is under-depth.
pub const MIN_DEPTH: usize = 2;

#[derive(Debug, Clone)]
pub struct Roster {
    entries: Vec<RosterEntry>,
    limits: RosterLimits,
}

impl Roster {
    /// An empty roster.
    pub fn new(limits: RosterLimits) -> Self {
        Roster {
            entries: Vec::new(),
            limits,
        }
    }

    /// Rebuild a roster from persisted entries. Entries are taken as-is even
    /// if the limits have since been lowered.
    pub fn from_entries(entries: Vec<RosterEntry>, limits: RosterLimits) -> Self {
        Roster { entries, limits }
    }

    pub fn limits(&self) -> &RosterLimits {
        &self.limits
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Add a player.
    ///
    /// Fails with `InvalidInput` if the player is already rostered and with
    /// `CapacityExceeded` if the position is at its limit.
    pub fn add(&mut self, player: Player, notes: &str) -> Result<&RosterEntry> {
        if self.contains(&player.player_id) {
            return Err(FantasyError::InvalidInput(format!(
                "{} is already on your team",
                player.name
            )));
        }

        let limit = self.limits.limit(player.position);
        if self.count(player.position) >= limit {
            return Err(FantasyError::CapacityExceeded {
                position: player.position,
                limit,
            });
        }

        debug!("Adding {} ({}) to roster", player.name, player.position);
        self.entries.push(RosterEntry {
            player,
            added_at: Utc::now(),
            notes: notes.to_string(),
        });
        let idx = self.entries.len() - 1;
        Ok(&self.entries[idx])
    }

    /// Remove a player by id, returning the removed entry.
    pub fn remove(&mut self, player_id: &str) -> Result<RosterEntry> {
        let idx = self
            .entries
            .iter()
            .position(|e| e.player.player_id == player_id)
            .ok_or_else(|| FantasyError::NotFound(format!("player {player_id} is not on your team")))?;
        Ok(self.entries.remove(idx))
    }

    pub fn contains(&self, player_id: &str) -> bool {
        self.entries.iter().any(|e| e.player.player_id == player_id)
    }

    pub fn count(&self, position: Position) -> usize {
        self.entries
            .iter()
            .filter(|e| e.player.position == position)
            .count()
    }

    /// Count at `position` ignoring the given player ids.
    pub fn count_without(&self, position: Position, excluded: &[String]) -> usize {
        self.entries
            .iter()
            .filter(|e| e.player.position == position && !excluded.contains(&e.player.player_id))
            .count()
    }

    /// Count for every position, including empty ones.
    pub fn depth_counts(&self) -> BTreeMap<Position, usize> {
        Position::ALL
            .iter()
            .map(|&pos| (pos, self.count(pos)))
            .collect()
    }

    /// Depth a position needs before it stops being a need.
    pub fn target_depth(&self, position: Position) -> usize {
        MIN_DEPTH.min(self.limits.limit(position))
    }

    pub fn is_under_depth(&self, position: Position) -> bool {
        self.count(position) < self.target_depth(position)
    }

    pub fn open_slots(&self, position: Position) -> usize {
        self.limits.limit(position).saturating_sub(self.count(position))
    }

    /// Entries grouped QB, RB, WR, TE, K, DEF; by name within a position.
    pub fn players(&self) -> Vec<&RosterEntry> {
        let mut sorted: Vec<&RosterEntry> = self.entries.iter().collect();
        sorted.sort_by(|a, b| {
            a.player
                .position
                .sort_order()
                .cmp(&b.player.position.sort_order())
                .then_with(|| a.player.name.cmp(&b.player.name))
        });
        sorted
    }

    /// Entries at one position, by name.
    pub fn at_position(&self, position: Position) -> Vec<&RosterEntry> {
        self.players()
            .into_iter()
            .filter(|e| e.player.position == position)
            .collect()
    }
}
