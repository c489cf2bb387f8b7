// Library root: data model, configuration, errors, and the SQLite stat store
// shared by the analysis and application crates.

pub mod config;
pub mod db;
pub mod error;
pub mod model;
pub mod store;

pub use error::{FantasyError, Result};
pub use model::{Player, Position, RosterEntry, ScoringFormat, StatLine, TradeRecord, WeeklyStat};
pub use store::StatStore;
