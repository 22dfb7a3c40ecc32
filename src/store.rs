// Collaborator-facing data model and CSV readers.
//
// The engine does not own ingestion or storage; it consumes flat CSV exports
// of player game logs, team offense logs, team defense logs, a market-line
// snapshot, and a contest slate. Loaders follow the same shape everywhere:
// a raw serde row struct, a private reader-based loader that skips malformed
// rows with a warning, and a public path-based wrapper.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::io::Read;
use std::path::Path;
use tracing::warn;

// ---------------------------------------------------------------------------
// Core enums
// ---------------------------------------------------------------------------

/// NFL roster position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Position {
    QB,
    RB,
    WR,
    TE,
    K,
    DST,
}

impl Position {
    pub fn from_str_pos(s: &str) -> Option<Position> {
        match s.trim().to_uppercase().as_str() {
            "QB" => Some(Position::QB),
            "RB" => Some(Position::RB),
            "WR" => Some(Position::WR),
            "TE" => Some(Position::TE),
            "K" => Some(Position::K),
            "DST" | "D/ST" | "DEF" => Some(Position::DST),
            _ => None,
        }
    }

    pub fn display_str(&self) -> &'static str {
        match self {
            Position::QB => "QB",
            Position::RB => "RB",
            Position::WR => "WR",
            Position::TE => "TE",
            Position::K => "K",
            Position::DST => "DST",
        }
    }

    /// Positions whose production runs through the passing game.
    pub fn is_passing_position(&self) -> bool {
        matches!(self, Position::QB | Position::WR | Position::TE)
    }

    pub fn is_rushing_position(&self) -> bool {
        matches!(self, Position::RB)
    }
}

/// A projectable stat. The set is closed; adding a stat means registering a
/// new scoring model for it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Stat {
    FantasyPoints,
    PassingYards,
    RushingYards,
    ReceivingYards,
}

impl Stat {
    /// Parse either the internal column name or the sportsbook market key.
    pub fn from_str_stat(s: &str) -> Option<Stat> {
        match s.trim().to_lowercase().as_str() {
            "fantasy_points" | "fantasy_points_ppr" => Some(Stat::FantasyPoints),
            "passing_yards" | "player_pass_yds" => Some(Stat::PassingYards),
            "rushing_yards" | "player_rush_yds" => Some(Stat::RushingYards),
            "receiving_yards" | "player_reception_yds" => Some(Stat::ReceivingYards),
            _ => None,
        }
    }

    /// The base history column this stat projects.
    pub fn column_name(&self) -> &'static str {
        match self {
            Stat::FantasyPoints => "fantasy_points",
            Stat::PassingYards => "passing_yards",
            Stat::RushingYards => "rushing_yards",
            Stat::ReceivingYards => "receiving_yards",
        }
    }
}

// ---------------------------------------------------------------------------
// Record types
// ---------------------------------------------------------------------------

/// Weather and betting-market context attached to a single game.
#[derive(Debug, Clone, Copy, Default)]
pub struct GameContext {
    pub wind_speed: f64,
    pub temp_low: f64,
    pub humidity: f64,
    pub vegas_total: f64,
    /// Spread quoted for the home team (negative when home is favored).
    pub vegas_spread: f64,
}

/// One player-game from the historical feature store. Immutable once loaded.
#[derive(Debug, Clone)]
pub struct HistoricalRecord {
    pub player_id: String,
    pub name: String,
    pub position: Position,
    pub team: String,
    pub opponent: String,
    pub season: u16,
    pub week: u8,
    pub kickoff: DateTime<Utc>,
    pub is_home: bool,

    pub pass_attempts: f64,
    pub pass_completions: f64,
    pub passing_yards: f64,
    pub passing_tds: f64,
    pub interceptions: f64,
    pub rush_attempts: f64,
    pub rushing_yards: f64,
    pub rushing_tds: f64,
    pub targets: f64,
    pub receptions: f64,
    pub receiving_yards: f64,
    pub receiving_tds: f64,
    pub red_zone_targets: f64,
    pub red_zone_pass_attempts: f64,
    pub red_zone_rush_attempts: f64,
    pub fantasy_points: f64,

    pub context: GameContext,

    /// Prior-season baselines for player-quality features.
    pub vorp_last_season: f64,
    pub ppg_last_season: f64,
}

/// One team-game of offensive volume, for share denominators.
#[derive(Debug, Clone)]
pub struct TeamGameRecord {
    pub team: String,
    pub season: u16,
    pub week: u8,
    pub pass_attempts: f64,
    pub rush_attempts: f64,
    pub red_zone_pass_attempts: f64,
    pub red_zone_rush_attempts: f64,
}

/// One team-game of defensive output, for opponent-defense features.
#[derive(Debug, Clone)]
pub struct DefenseGameRecord {
    pub team: String,
    pub season: u16,
    pub week: u8,
    pub points_allowed: f64,
    pub yards_allowed: f64,
    pub sacks: f64,
    pub interceptions: f64,
    pub fumbles_recovered: f64,
}

/// A scheduled (not yet played) game from the team's perspective, carrying
/// the pre-game context that is known before kickoff: opponent, venue,
/// forecast weather, and the betting market. This is deliberately separate
/// from `HistoricalRecord` so features for a target week never touch a
/// record of that week.
#[derive(Debug, Clone)]
pub struct ScheduledGame {
    pub team: String,
    pub season: u16,
    pub week: u8,
    pub opponent: String,
    pub is_home: bool,
    pub context: GameContext,
}

/// A sportsbook prop line from the current market snapshot. Read-only.
#[derive(Debug, Clone)]
pub struct MarketLine {
    pub player_id: String,
    pub stat: Stat,
    pub threshold: f64,
    pub price_over: i64,
    pub price_under: i64,
    pub book: String,
    pub observed_at: DateTime<Utc>,
}

/// A contest-slate entry: who can be rostered and at what salary.
#[derive(Debug, Clone)]
pub struct SlatePlayer {
    pub player_id: String,
    pub name: String,
    pub position: Position,
    pub team: String,
    pub salary: u32,
    pub projected_points: f64,
}

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("failed to read file {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("CSV error in {path}: {source}")]
    Csv { path: String, source: csv::Error },

    #[error("validation error: {0}")]
    Validation(String),
}

// ---------------------------------------------------------------------------
// Ordered lookup stores
// ---------------------------------------------------------------------------

/// Per-player game history, ordered by (season, week). The feature engine
/// only ever reads a bounded trailing window from here.
#[derive(Debug, Clone, Default)]
pub struct FeatureStore {
    by_player: HashMap<String, Vec<HistoricalRecord>>,
}

impl FeatureStore {
    pub fn new(mut records: Vec<HistoricalRecord>) -> Self {
        records.sort_by_key(|r| (r.player_id.clone(), r.season, r.week));
        let mut by_player: HashMap<String, Vec<HistoricalRecord>> = HashMap::new();
        for record in records {
            by_player
                .entry(record.player_id.clone())
                .or_default()
                .push(record);
        }
        FeatureStore { by_player }
    }

    /// All games for the player strictly before the target week, oldest first.
    pub fn history_before(
        &self,
        player_id: &str,
        season: u16,
        week: u8,
    ) -> &[HistoricalRecord] {
        let Some(games) = self.by_player.get(player_id) else {
            return &[];
        };
        // Records are sorted, so the prefix before the target week is a slice.
        let end = games.partition_point(|r| (r.season, r.week) < (season, week));
        &games[..end]
    }

    pub fn player_count(&self) -> usize {
        self.by_player.len()
    }
}

/// Team offensive volume by (team, season, week).
#[derive(Debug, Clone, Default)]
pub struct TeamLog {
    by_team: HashMap<String, Vec<TeamGameRecord>>,
}

impl TeamLog {
    pub fn new(mut records: Vec<TeamGameRecord>) -> Self {
        records.sort_by_key(|r| (r.team.clone(), r.season, r.week));
        let mut by_team: HashMap<String, Vec<TeamGameRecord>> = HashMap::new();
        for record in records {
            by_team.entry(record.team.clone()).or_default().push(record);
        }
        TeamLog { by_team }
    }

    pub fn history_before(&self, team: &str, season: u16, week: u8) -> &[TeamGameRecord] {
        let Some(games) = self.by_team.get(team) else {
            return &[];
        };
        let end = games.partition_point(|r| (r.season, r.week) < (season, week));
        &games[..end]
    }
}

/// Team defensive output by (team, season, week).
#[derive(Debug, Clone, Default)]
pub struct DefenseLog {
    by_team: HashMap<String, Vec<DefenseGameRecord>>,
}

impl DefenseLog {
    pub fn new(mut records: Vec<DefenseGameRecord>) -> Self {
        records.sort_by_key(|r| (r.team.clone(), r.season, r.week));
        let mut by_team: HashMap<String, Vec<DefenseGameRecord>> = HashMap::new();
        for record in records {
            by_team.entry(record.team.clone()).or_default().push(record);
        }
        DefenseLog { by_team }
    }

    pub fn history_before(&self, team: &str, season: u16, week: u8) -> &[DefenseGameRecord] {
        let Some(games) = self.by_team.get(team) else {
            return &[];
        };
        let end = games.partition_point(|r| (r.season, r.week) < (season, week));
        &games[..end]
    }
}

/// Upcoming-game lookup by (team, season, week).
#[derive(Debug, Clone, Default)]
pub struct Schedule {
    by_key: HashMap<(String, u16, u8), ScheduledGame>,
}

impl Schedule {
    pub fn new(games: Vec<ScheduledGame>) -> Self {
        let mut by_key = HashMap::new();
        for game in games {
            by_key.insert((game.team.clone(), game.season, game.week), game);
        }
        Schedule { by_key }
    }

    pub fn upcoming(&self, team: &str, season: u16, week: u8) -> Option<&ScheduledGame> {
        self.by_key.get(&(team.to_string(), season, week))
    }
}

// ---------------------------------------------------------------------------
// Raw CSV serde structs (private)
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct RawHistoryRow {
    player_id: String,
    name: String,
    position: String,
    team: String,
    opponent: String,
    season: u16,
    week: u8,
    kickoff: String,
    is_home: u8,
    #[serde(default)]
    pass_attempts: f64,
    #[serde(default)]
    pass_completions: f64,
    #[serde(default)]
    passing_yards: f64,
    #[serde(default)]
    passing_tds: f64,
    #[serde(default)]
    interceptions: f64,
    #[serde(default)]
    rush_attempts: f64,
    #[serde(default)]
    rushing_yards: f64,
    #[serde(default)]
    rushing_tds: f64,
    #[serde(default)]
    targets: f64,
    #[serde(default)]
    receptions: f64,
    #[serde(default)]
    receiving_yards: f64,
    #[serde(default)]
    receiving_tds: f64,
    #[serde(default)]
    red_zone_targets: f64,
    #[serde(default)]
    red_zone_pass_attempts: f64,
    #[serde(default)]
    red_zone_rush_attempts: f64,
    fantasy_points: f64,
    #[serde(default)]
    wind_speed: f64,
    #[serde(default)]
    temp_low: f64,
    #[serde(default)]
    humidity: f64,
    #[serde(default)]
    vegas_total: f64,
    #[serde(default)]
    vegas_spread: f64,
    #[serde(default)]
    vorp_last_season: f64,
    #[serde(default)]
    ppg_last_season: f64,
}

#[derive(Debug, Deserialize)]
struct RawTeamRow {
    team: String,
    season: u16,
    week: u8,
    pass_attempts: f64,
    rush_attempts: f64,
    #[serde(default)]
    red_zone_pass_attempts: f64,
    #[serde(default)]
    red_zone_rush_attempts: f64,
}

#[derive(Debug, Deserialize)]
struct RawDefenseRow {
    team: String,
    season: u16,
    week: u8,
    points_allowed: f64,
    yards_allowed: f64,
    sacks: f64,
    interceptions: f64,
    fumbles_recovered: f64,
}

#[derive(Debug, Deserialize)]
struct RawScheduleRow {
    team: String,
    season: u16,
    week: u8,
    opponent: String,
    is_home: u8,
    #[serde(default)]
    wind_speed: f64,
    #[serde(default)]
    temp_low: f64,
    #[serde(default)]
    humidity: f64,
    #[serde(default)]
    vegas_total: f64,
    #[serde(default)]
    vegas_spread: f64,
}

#[derive(Debug, Deserialize)]
struct RawLineRow {
    player_id: String,
    stat: String,
    line: f64,
    over_price: i64,
    under_price: i64,
    book: String,
    observed_at: String,
}

#[derive(Debug, Deserialize)]
struct RawSlateRow {
    player_id: String,
    name: String,
    position: String,
    team: String,
    salary: u32,
}

// ---------------------------------------------------------------------------
// Reader-based loaders (private, enable testing without temp files)
// ---------------------------------------------------------------------------

fn parse_utc(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s.trim())
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

pub(crate) fn load_history_from_reader<R: Read>(
    rdr: R,
) -> Result<Vec<HistoricalRecord>, csv::Error> {
    let mut reader = csv::Reader::from_reader(rdr);
    let mut records = Vec::new();
    for result in reader.deserialize::<RawHistoryRow>() {
        match result {
            Ok(raw) => {
                let Some(position) = Position::from_str_pos(&raw.position) else {
                    warn!(
                        "skipping game log for '{}': unknown position '{}'",
                        raw.name.trim(),
                        raw.position
                    );
                    continue;
                };
                let Some(kickoff) = parse_utc(&raw.kickoff) else {
                    warn!(
                        "skipping game log for '{}': bad kickoff timestamp '{}'",
                        raw.name.trim(),
                        raw.kickoff
                    );
                    continue;
                };
                if !raw.fantasy_points.is_finite() {
                    warn!(
                        "skipping game log for '{}': non-finite fantasy points",
                        raw.name.trim()
                    );
                    continue;
                }
                records.push(HistoricalRecord {
                    player_id: raw.player_id.trim().to_string(),
                    name: raw.name.trim().to_string(),
                    position,
                    team: raw.team.trim().to_string(),
                    opponent: raw.opponent.trim().to_string(),
                    season: raw.season,
                    week: raw.week,
                    kickoff,
                    is_home: raw.is_home != 0,
                    pass_attempts: raw.pass_attempts,
                    pass_completions: raw.pass_completions,
                    passing_yards: raw.passing_yards,
                    passing_tds: raw.passing_tds,
                    interceptions: raw.interceptions,
                    rush_attempts: raw.rush_attempts,
                    rushing_yards: raw.rushing_yards,
                    rushing_tds: raw.rushing_tds,
                    targets: raw.targets,
                    receptions: raw.receptions,
                    receiving_yards: raw.receiving_yards,
                    receiving_tds: raw.receiving_tds,
                    red_zone_targets: raw.red_zone_targets,
                    red_zone_pass_attempts: raw.red_zone_pass_attempts,
                    red_zone_rush_attempts: raw.red_zone_rush_attempts,
                    fantasy_points: raw.fantasy_points,
                    context: GameContext {
                        wind_speed: raw.wind_speed,
                        temp_low: raw.temp_low,
                        humidity: raw.humidity,
                        vegas_total: raw.vegas_total,
                        vegas_spread: raw.vegas_spread,
                    },
                    vorp_last_season: raw.vorp_last_season,
                    ppg_last_season: raw.ppg_last_season,
                });
            }
            Err(e) => {
                warn!("skipping malformed game log row: {}", e);
            }
        }
    }
    Ok(records)
}

pub(crate) fn load_team_stats_from_reader<R: Read>(
    rdr: R,
) -> Result<Vec<TeamGameRecord>, csv::Error> {
    let mut reader = csv::Reader::from_reader(rdr);
    let mut records = Vec::new();
    for result in reader.deserialize::<RawTeamRow>() {
        match result {
            Ok(raw) => records.push(TeamGameRecord {
                team: raw.team.trim().to_string(),
                season: raw.season,
                week: raw.week,
                pass_attempts: raw.pass_attempts,
                rush_attempts: raw.rush_attempts,
                red_zone_pass_attempts: raw.red_zone_pass_attempts,
                red_zone_rush_attempts: raw.red_zone_rush_attempts,
            }),
            Err(e) => {
                warn!("skipping malformed team stats row: {}", e);
            }
        }
    }
    Ok(records)
}

pub(crate) fn load_defense_from_reader<R: Read>(
    rdr: R,
) -> Result<Vec<DefenseGameRecord>, csv::Error> {
    let mut reader = csv::Reader::from_reader(rdr);
    let mut records = Vec::new();
    for result in reader.deserialize::<RawDefenseRow>() {
        match result {
            Ok(raw) => records.push(DefenseGameRecord {
                team: raw.team.trim().to_string(),
                season: raw.season,
                week: raw.week,
                points_allowed: raw.points_allowed,
                yards_allowed: raw.yards_allowed,
                sacks: raw.sacks,
                interceptions: raw.interceptions,
                fumbles_recovered: raw.fumbles_recovered,
            }),
            Err(e) => {
                warn!("skipping malformed defense row: {}", e);
            }
        }
    }
    Ok(records)
}

pub(crate) fn load_schedule_from_reader<R: Read>(
    rdr: R,
) -> Result<Vec<ScheduledGame>, csv::Error> {
    let mut reader = csv::Reader::from_reader(rdr);
    let mut games = Vec::new();
    for result in reader.deserialize::<RawScheduleRow>() {
        match result {
            Ok(raw) => games.push(ScheduledGame {
                team: raw.team.trim().to_string(),
                season: raw.season,
                week: raw.week,
                opponent: raw.opponent.trim().to_string(),
                is_home: raw.is_home != 0,
                context: GameContext {
                    wind_speed: raw.wind_speed,
                    temp_low: raw.temp_low,
                    humidity: raw.humidity,
                    vegas_total: raw.vegas_total,
                    vegas_spread: raw.vegas_spread,
                },
            }),
            Err(e) => {
                warn!("skipping malformed schedule row: {}", e);
            }
        }
    }
    Ok(games)
}

pub(crate) fn load_lines_from_reader<R: Read>(rdr: R) -> Result<Vec<MarketLine>, csv::Error> {
    let mut reader = csv::Reader::from_reader(rdr);
    let mut lines = Vec::new();
    for result in reader.deserialize::<RawLineRow>() {
        match result {
            Ok(raw) => {
                let Some(stat) = Stat::from_str_stat(&raw.stat) else {
                    warn!(
                        "skipping line for '{}': unknown market '{}'",
                        raw.player_id.trim(),
                        raw.stat
                    );
                    continue;
                };
                let Some(observed_at) = parse_utc(&raw.observed_at) else {
                    warn!(
                        "skipping line for '{}': bad observed_at '{}'",
                        raw.player_id.trim(),
                        raw.observed_at
                    );
                    continue;
                };
                lines.push(MarketLine {
                    player_id: raw.player_id.trim().to_string(),
                    stat,
                    threshold: raw.line,
                    price_over: raw.over_price,
                    price_under: raw.under_price,
                    book: raw.book.trim().to_string(),
                    observed_at,
                });
            }
            Err(e) => {
                warn!("skipping malformed line row: {}", e);
            }
        }
    }
    Ok(lines)
}

pub(crate) fn load_slate_from_reader<R: Read>(rdr: R) -> Result<Vec<SlatePlayer>, csv::Error> {
    let mut reader = csv::Reader::from_reader(rdr);
    let mut players = Vec::new();
    for result in reader.deserialize::<RawSlateRow>() {
        match result {
            Ok(raw) => {
                let Some(position) = Position::from_str_pos(&raw.position) else {
                    warn!(
                        "skipping slate entry '{}': unknown position '{}'",
                        raw.name.trim(),
                        raw.position
                    );
                    continue;
                };
                players.push(SlatePlayer {
                    player_id: raw.player_id.trim().to_string(),
                    name: raw.name.trim().to_string(),
                    position,
                    team: raw.team.trim().to_string(),
                    salary: raw.salary,
                    projected_points: 0.0,
                });
            }
            Err(e) => {
                warn!("skipping malformed slate row: {}", e);
            }
        }
    }
    Ok(players)
}

// ---------------------------------------------------------------------------
// Public path-based loaders
// ---------------------------------------------------------------------------

fn open(path: &Path) -> Result<std::fs::File, StoreError> {
    std::fs::File::open(path).map_err(|e| StoreError::Io {
        path: path.display().to_string(),
        source: e,
    })
}

fn csv_err(path: &Path) -> impl FnOnce(csv::Error) -> StoreError + '_ {
    move |e| StoreError::Csv {
        path: path.display().to_string(),
        source: e,
    }
}

/// Load the player game-log history. Errors if zero valid rows are found,
/// since every downstream stage depends on this data.
pub fn load_history(path: &Path) -> Result<Vec<HistoricalRecord>, StoreError> {
    let records = load_history_from_reader(open(path)?).map_err(csv_err(path))?;
    if records.is_empty() {
        return Err(StoreError::Validation(
            "history CSV produced zero valid rows".into(),
        ));
    }
    Ok(records)
}

pub fn load_team_stats(path: &Path) -> Result<Vec<TeamGameRecord>, StoreError> {
    load_team_stats_from_reader(open(path)?).map_err(csv_err(path))
}

pub fn load_defense(path: &Path) -> Result<Vec<DefenseGameRecord>, StoreError> {
    load_defense_from_reader(open(path)?).map_err(csv_err(path))
}

pub fn load_schedule(path: &Path) -> Result<Vec<ScheduledGame>, StoreError> {
    load_schedule_from_reader(open(path)?).map_err(csv_err(path))
}

pub fn load_lines(path: &Path) -> Result<Vec<MarketLine>, StoreError> {
    load_lines_from_reader(open(path)?).map_err(csv_err(path))
}

pub fn load_slate(path: &Path) -> Result<Vec<SlatePlayer>, StoreError> {
    load_slate_from_reader(open(path)?).map_err(csv_err(path))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
