// Configuration loading and parsing (gridiron.toml plus environment overrides).

use chrono::{Datelike, NaiveDate, NaiveTime};
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

use crate::model::{Position, ScoringFormat};

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("failed to parse config file {path}: {source}")]
    ParseError {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("validation error for field `{field}`: {message}")]
    ValidationError { field: String, message: String },

    #[error("failed to initialize config from defaults: {message}")]
    DefaultsCopyError { message: String },
}

fn invalid(field: &str, message: impl Into<String>) -> ConfigError {
    ConfigError::ValidationError {
        field: field.into(),
        message: message.into(),
    }
}

/// File name of the main config inside `config/` and `defaults/`.
pub const CONFIG_FILE: &str = "gridiron.toml";

// ---------------------------------------------------------------------------
// Top-level assembled Config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct Config {
    pub league: LeagueConfig,
    pub roster_limits: RosterLimits,
    pub refresh: RefreshConfig,
    pub analysis: AnalysisConfig,
    pub api: ApiConfig,
    pub db_path: String,
}

impl Config {
    /// Season the analysis should read. Uses the configured override when
    /// present, otherwise the season in progress today.
    pub fn current_season(&self) -> i32 {
        self.season_on(chrono::Local::now().date_naive())
    }

    /// Season in effect on `date`, honoring the configured override.
    pub fn season_on(&self, date: NaiveDate) -> i32 {
        self.league.season.unwrap_or_else(|| season_for_date(date))
    }
}

/// NFL seasons start in September and end in February, so January and
/// February belong to the previous year's season.
pub fn season_for_date(date: NaiveDate) -> i32 {
    if date.month() >= 3 {
        date.year()
    } else {
        date.year() - 1
    }
}

#[derive(Debug, Clone)]
pub struct LeagueConfig {
    pub size: usize,
    pub scoring_format: ScoringFormat,
    pub season: Option<i32>,
}

#[derive(Debug, Clone)]
pub struct RefreshConfig {
    pub time: RefreshTime,
    pub weeks_to_fetch: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AnalysisConfig {
    pub weeks_to_analyze: usize,
    pub min_games_played: usize,
    pub valuation: ValuationSettings,
    pub trade: TradeSettings,
}

/// Tunables for the valuation engine. The composite weights themselves are
/// fixed; these control how raw samples map onto the 0-100 scales.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct ValuationSettings {
    /// Consistency = 100 - cv * cv_scale, clamped to 0..=100.
    pub cv_scale: f64,
    /// Slope (points/week) beyond which a trend is improving or declining.
    pub trend_threshold: f64,
    /// Average points that map to a full 100 on the normalized scale.
    pub points_ceiling: f64,
    /// Trend component added (improving) or subtracted (declining).
    pub trend_adjustment: f64,
}

impl Default for ValuationSettings {
    fn default() -> Self {
        Self {
            cv_scale: 100.0,
            trend_threshold: 2.0,
            points_ceiling: 30.0,
            trend_adjustment: 50.0,
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct TradeSettings {
    /// Percent change within +/- this band is a neutral trade.
    pub neutral_band_pct: f64,
    /// Percent change beyond +/- this band is a strong accept/decline.
    pub strong_band_pct: f64,
    /// Multiplier on a received player's value when the roster is
    /// under-depth at his position.
    pub need_multiplier: f64,
}

impl Default for TradeSettings {
    fn default() -> Self {
        Self {
            neutral_band_pct: 5.0,
            strong_band_pct: 15.0,
            need_multiplier: 1.10,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    pub sleeper_base: String,
    pub espn_base: String,
    pub timeout_secs: u64,
}

// ---------------------------------------------------------------------------
// Roster limits
// ---------------------------------------------------------------------------

/// Maximum number of rostered players per position.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RosterLimits(BTreeMap<Position, usize>);

impl RosterLimits {
    pub fn new(limits: impl IntoIterator<Item = (Position, usize)>) -> Self {
        RosterLimits(limits.into_iter().collect())
    }

    /// Limit for a position. Positions without an entry allow no players.
    pub fn limit(&self, position: Position) -> usize {
        self.0.get(&position).copied().unwrap_or(0)
    }

    pub fn iter(&self) -> impl Iterator<Item = (Position, usize)> + '_ {
        self.0.iter().map(|(p, n)| (*p, *n))
    }

    /// Sum of all position limits.
    pub fn total(&self) -> usize {
        self.0.values().sum()
    }
}

// ---------------------------------------------------------------------------
// Refresh time
// ---------------------------------------------------------------------------

/// Daily wall-clock time for the scheduled data refresh.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RefreshTime {
    pub hour: u32,
    pub minute: u32,
}

impl RefreshTime {
    /// Parse a strict `HH:MM` 24-hour time.
    pub fn parse(s: &str) -> Result<Self, ConfigError> {
        let s = s.trim();
        let malformed = || invalid("refresh.time", format!("expected HH:MM, got '{s}'"));

        let (h, m) = s.split_once(':').ok_or_else(malformed)?;
        if h.len() != 2 || m.len() != 2 {
            return Err(malformed());
        }
        let hour: u32 = h.parse().map_err(|_| malformed())?;
        let minute: u32 = m.parse().map_err(|_| malformed())?;
        if hour > 23 || minute > 59 {
            return Err(invalid(
                "refresh.time",
                format!("hour must be < 24 and minute < 60, got '{s}'"),
            ));
        }
        Ok(RefreshTime { hour, minute })
    }

    pub fn as_naive_time(&self) -> NaiveTime {
        // Range was checked in `parse`.
        NaiveTime::from_hms_opt(self.hour, self.minute, 0).unwrap_or(NaiveTime::MIN)
    }
}

impl fmt::Display for RefreshTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.hour, self.minute)
    }
}

// ---------------------------------------------------------------------------
// gridiron.toml raw structs
// ---------------------------------------------------------------------------

/// Raw deserialization target for the entire gridiron.toml file.
#[derive(Debug, Clone, Deserialize)]
struct ConfigFile {
    league: LeagueSection,
    roster_limits: HashMap<String, usize>,
    refresh: RefreshSection,
    analysis: AnalysisConfig,
    api: ApiConfig,
    database: DatabaseSection,
}

#[derive(Debug, Clone, Deserialize)]
struct LeagueSection {
    size: usize,
    scoring_format: String,
    #[serde(default)]
    season: Option<i32>,
}

#[derive(Debug, Clone, Deserialize)]
struct RefreshSection {
    time: String,
    weeks_to_fetch: u32,
}

#[derive(Debug, Clone, Deserialize)]
struct DatabaseSection {
    path: String,
}

// ---------------------------------------------------------------------------
// Loading logic
// ---------------------------------------------------------------------------

/// Load and validate configuration from `config/gridiron.toml` relative to
/// `base_dir`, applying overrides from `env` (`REFRESH_TIME`, `LEAGUE_SIZE`,
/// `SCORING_FORMAT`).
///
/// This is the lower-level loading primitive that does not auto-copy defaults
/// or touch the process environment. Prefer `load_config()`.
pub fn load_config_from<F>(base_dir: &Path, env: F) -> Result<Config, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let path = base_dir.join("config").join(CONFIG_FILE);
    let text = read_file(&path)?;
    let mut raw: ConfigFile = toml::from_str(&text).map_err(|e| ConfigError::ParseError {
        path: path.clone(),
        source: e,
    })?;

    apply_env_overrides(&mut raw, &env)?;
    assemble(raw)
}

fn apply_env_overrides<F>(raw: &mut ConfigFile, env: &F) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(time) = env("REFRESH_TIME") {
        raw.refresh.time = time;
    }
    if let Some(size) = env("LEAGUE_SIZE") {
        raw.league.size = size
            .trim()
            .parse()
            .map_err(|_| invalid("LEAGUE_SIZE", format!("not a whole number: '{size}'")))?;
    }
    if let Some(format) = env("SCORING_FORMAT") {
        raw.league.scoring_format = format;
    }
    Ok(())
}

fn assemble(raw: ConfigFile) -> Result<Config, ConfigError> {
    let scoring_format: ScoringFormat = raw
        .league
        .scoring_format
        .parse()
        .map_err(|e: String| invalid("league.scoring_format", e))?;

    let mut limits = BTreeMap::new();
    for (pos_str, count) in &raw.roster_limits {
        let pos = Position::from_str_pos(pos_str)
            .ok_or_else(|| invalid("roster_limits", format!("unknown position '{pos_str}'")))?;
        limits.insert(pos, *count);
    }

    let config = Config {
        league: LeagueConfig {
            size: raw.league.size,
            scoring_format,
            season: raw.league.season,
        },
        roster_limits: RosterLimits(limits),
        refresh: RefreshConfig {
            time: RefreshTime::parse(&raw.refresh.time)?,
            weeks_to_fetch: raw.refresh.weeks_to_fetch,
        },
        analysis: raw.analysis,
        api: raw.api,
        db_path: raw.database.path,
    };

    validate(&config)?;
    Ok(config)
}

/// Ensure all config files exist by copying missing ones from `defaults/`.
/// Returns the list of files that were copied. Skips `.example` files.
pub fn ensure_config_files(base_dir: &Path) -> Result<Vec<PathBuf>, ConfigError> {
    let defaults_dir = base_dir.join("defaults");
    let config_dir = base_dir.join("config");

    if !defaults_dir.exists() {
        if !config_dir.exists() {
            return Err(ConfigError::DefaultsCopyError {
                message: format!(
                    "neither defaults/ nor config/ directory found in {}; \
                     run from the project root or ensure defaults/ is present",
                    base_dir.display()
                ),
            });
        }
        return Ok(vec![]);
    }

    std::fs::create_dir_all(&config_dir).map_err(|e| ConfigError::DefaultsCopyError {
        message: format!("failed to create config directory: {e}"),
    })?;

    let entries = std::fs::read_dir(&defaults_dir).map_err(|e| ConfigError::DefaultsCopyError {
        message: format!("failed to read defaults directory: {e}"),
    })?;

    let mut copied = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| ConfigError::DefaultsCopyError {
            message: format!("failed to read defaults entry: {e}"),
        })?;
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        let Some(file_name) = path.file_name() else {
            continue;
        };
        if file_name.to_str().is_some_and(|n| n.ends_with(".example")) {
            continue;
        }
        let target = config_dir.join(file_name);

        match std::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&target)
        {
            Ok(mut dest) => {
                let content = std::fs::read(&path).map_err(|e| ConfigError::DefaultsCopyError {
                    message: format!("failed to read {}: {e}", path.display()),
                })?;
                std::io::Write::write_all(&mut dest, &content).map_err(|e| {
                    ConfigError::DefaultsCopyError {
                        message: format!("failed to write {}: {e}", target.display()),
                    }
                })?;
                info!("Created {} from defaults", target.display());
                copied.push(target);
            }
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {}
            Err(e) => {
                return Err(ConfigError::DefaultsCopyError {
                    message: format!("failed to create {}: {e}", target.display()),
                });
            }
        }
    }

    Ok(copied)
}

/// Convenience wrapper: loads `.env` if present, copies defaults, then loads
/// config relative to the current working directory using the process
/// environment for overrides.
pub fn load_config() -> Result<Config, ConfigError> {
    let _ = dotenvy::dotenv();
    let cwd = std::env::current_dir().map_err(|_| ConfigError::FileNotFound {
        path: PathBuf::from("."),
    })?;
    ensure_config_files(&cwd)?;
    load_config_from(&cwd, |key| std::env::var(key).ok())
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn read_file(path: &Path) -> Result<String, ConfigError> {
    std::fs::read_to_string(path).map_err(|_| ConfigError::FileNotFound {
        path: path.to_path_buf(),
    })
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

fn validate(config: &Config) -> Result<(), ConfigError> {
    if config.league.size == 0 {
        return Err(invalid("league.size", "must be greater than 0"));
    }
    if config.refresh.weeks_to_fetch == 0 {
        return Err(invalid("refresh.weeks_to_fetch", "must be greater than 0"));
    }

    let analysis = &config.analysis;
    if analysis.weeks_to_analyze == 0 {
        return Err(invalid("analysis.weeks_to_analyze", "must be greater than 0"));
    }

    let v = &analysis.valuation;
    let positive_fields: &[(&str, f64)] = &[
        ("analysis.valuation.cv_scale", v.cv_scale),
        ("analysis.valuation.points_ceiling", v.points_ceiling),
        ("analysis.trade.need_multiplier", analysis.trade.need_multiplier),
    ];
    for (name, val) in positive_fields {
        if !val.is_finite() || *val <= 0.0 {
            return Err(invalid(name, format!("must be > 0, got {val}")));
        }
    }

    let t = &analysis.trade;
    let non_negative_fields: &[(&str, f64)] = &[
        ("analysis.valuation.trend_threshold", v.trend_threshold),
        ("analysis.valuation.trend_adjustment", v.trend_adjustment),
        ("analysis.trade.neutral_band_pct", t.neutral_band_pct),
        ("analysis.trade.strong_band_pct", t.strong_band_pct),
    ];
    for (name, val) in non_negative_fields {
        if !val.is_finite() || *val < 0.0 {
            return Err(invalid(name, format!("must be >= 0, got {val}")));
        }
    }

    if t.strong_band_pct < t.neutral_band_pct {
        return Err(invalid(
            "analysis.trade.strong_band_pct",
            format!(
                "must be >= neutral_band_pct ({}), got {}",
                t.neutral_band_pct, t.strong_band_pct
            ),
        ));
    }

    if config.roster_limits.total() == 0 {
        return Err(invalid("roster_limits", "at least one position must allow players"));
    }

    if config.api.timeout_secs == 0 {
        return Err(invalid("api.timeout_secs", "must be greater than 0"));
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
