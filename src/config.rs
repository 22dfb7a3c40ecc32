// Configuration loading and parsing (engine.toml).

use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::store::{Position, Stat};

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
}

// ---------------------------------------------------------------------------
// Top-level assembled Config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct Config {
    pub pipeline: PipelineConfig,
    pub features: FeatureConfig,
    pub ev: EvConfig,
    pub optimizer: OptimizerConfig,
    pub simulator: SimulatorConfig,
    pub data_paths: DataPaths,
}

/// Wrapper for the full engine.toml file.
#[derive(Debug, Clone, Deserialize)]
struct EngineFile {
    pipeline: PipelineConfig,
    features: FeatureConfig,
    ev: EvConfig,
    optimizer: OptimizerConfig,
    simulator: SimulatorConfig,
    data_paths: DataPaths,
}

// ---------------------------------------------------------------------------
// Section structs
// ---------------------------------------------------------------------------

/// Which slate to run the pipeline against.
#[derive(Debug, Clone, Deserialize)]
pub struct PipelineConfig {
    pub season: u16,
    pub week: u8,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FeatureConfig {
    /// Trailing window size in games for rolling features.
    pub window: usize,
    /// EMA span for the main rolling features (alpha = 2 / (span + 1)).
    pub ema_span: usize,
    /// Short/long spans for the streak coefficient.
    pub streak_short_span: usize,
    pub streak_long_span: usize,
    /// Fantasy-point threshold for the consecutive-games streak counter.
    pub streak_threshold: f64,
    /// Below this many games in the window, rolling features get a
    /// companion `_low_confidence` indicator.
    pub min_games: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EvConfig {
    /// Candidates below this EV% are silently excluded from rankings.
    pub min_ev_percent: f64,
    pub stat_sigma: StatSigmas,
}

/// Residual standard deviation per projected stat, from offline model
/// evaluation.
#[derive(Debug, Clone, Deserialize)]
pub struct StatSigmas {
    pub fantasy_points: f64,
    pub passing_yards: f64,
    pub rushing_yards: f64,
    pub receiving_yards: f64,
}

impl StatSigmas {
    pub fn for_stat(&self, stat: Stat) -> f64 {
        match stat {
            Stat::FantasyPoints => self.fantasy_points,
            Stat::PassingYards => self.passing_yards,
            Stat::RushingYards => self.rushing_yards,
            Stat::ReceivingYards => self.receiving_yards,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct OptimizerConfig {
    pub salary_cap: u32,
    pub num_lineups: usize,
    /// Maximum number of players any two returned lineups may share.
    pub max_overlap: usize,
    /// Minimum same-team stack size (1 disables stacking).
    pub min_stack: usize,
    /// Maximum players selected from any single team.
    pub max_per_team: usize,
    /// Maximum lineups any single player may appear in across the batch.
    pub exposure_cap: usize,
    /// Wall-clock budget per batch, in milliseconds.
    pub solve_timeout_ms: u64,
    pub slots: Vec<SlotConfig>,
}

/// One roster slot definition: the slot label and the positions eligible
/// to fill it (e.g. FLEX = RB/WR/TE).
#[derive(Debug, Clone, Deserialize)]
pub struct SlotConfig {
    pub name: String,
    pub eligible: Vec<String>,
}

impl SlotConfig {
    /// Parse the eligible position strings, erroring on unknown positions.
    pub fn eligible_positions(&self) -> Result<Vec<Position>, ConfigError> {
        self.eligible
            .iter()
            .map(|s| {
                Position::from_str_pos(s).ok_or_else(|| ConfigError::ValidationError {
                    field: format!("optimizer.slots.{}", self.name),
                    message: format!("unknown position '{s}'"),
                })
            })
            .collect()
    }
}

/// Monte Carlo evaluation of the returned lineups.
#[derive(Debug, Clone, Deserialize)]
pub struct SimulatorConfig {
    /// Number of simulated slates.
    pub iterations: usize,
    /// Lineup score that counts as a contest win.
    pub win_threshold: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DataPaths {
    pub history: String,
    pub team_stats: String,
    pub defense: String,
    pub schedule: String,
    pub lines: String,
    pub slate: String,
    pub models_dir: String,
}

// ---------------------------------------------------------------------------
// Loading logic
// ---------------------------------------------------------------------------

/// Load and validate configuration from `engine.toml` at the given path.
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    let text = std::fs::read_to_string(path).map_err(|_| ConfigError::FileNotFound {
        path: path.to_path_buf(),
    })?;
    load_config_from_str(&text, path)
}

/// Parse a config from TOML text. Exposed for testing without temp files.
pub fn load_config_from_str(text: &str, path: &Path) -> Result<Config, ConfigError> {
    let file: EngineFile = toml::from_str(text).map_err(|e| ConfigError::ParseError {
        path: path.to_path_buf(),
        source: e,
    })?;

    let config = Config {
        pipeline: file.pipeline,
        features: file.features,
        ev: file.ev,
        optimizer: file.optimizer,
        simulator: file.simulator,
        data_paths: file.data_paths,
    };

    validate(&config)?;

    Ok(config)
}

fn validate(config: &Config) -> Result<(), ConfigError> {
    let f = &config.features;
    if f.window == 0 {
        return err("features.window", "must be at least 1");
    }
    if f.ema_span == 0 || f.streak_short_span == 0 || f.streak_long_span == 0 {
        return err("features", "EMA spans must be at least 1");
    }
    if f.streak_short_span >= f.streak_long_span {
        return err(
            "features.streak_short_span",
            "short span must be smaller than long span",
        );
    }

    let sigmas = &config.ev.stat_sigma;
    for (name, value) in [
        ("fantasy_points", sigmas.fantasy_points),
        ("passing_yards", sigmas.passing_yards),
        ("rushing_yards", sigmas.rushing_yards),
        ("receiving_yards", sigmas.receiving_yards),
    ] {
        if value <= 0.0 || !value.is_finite() {
            return err(
                &format!("ev.stat_sigma.{name}"),
                "must be a positive finite number",
            );
        }
    }

    let opt = &config.optimizer;
    if opt.salary_cap == 0 {
        return err("optimizer.salary_cap", "must be positive");
    }
    if opt.num_lineups == 0 {
        return err("optimizer.num_lineups", "must be at least 1");
    }
    if opt.slots.is_empty() {
        return err("optimizer.slots", "at least one roster slot is required");
    }
    if opt.max_overlap >= opt.slots.len() {
        return err(
            "optimizer.max_overlap",
            "must be smaller than the roster size",
        );
    }
    if opt.min_stack > opt.slots.len() {
        return err("optimizer.min_stack", "cannot exceed the roster size");
    }
    if opt.max_per_team == 0 {
        return err("optimizer.max_per_team", "must be at least 1");
    }
    if opt.exposure_cap == 0 {
        return err("optimizer.exposure_cap", "must be at least 1");
    }
    for slot in &opt.slots {
        slot.eligible_positions()?;
    }

    let sim = &config.simulator;
    if sim.iterations == 0 {
        return err("simulator.iterations", "must be at least 1");
    }
    if !sim.win_threshold.is_finite() || sim.win_threshold <= 0.0 {
        return err(
            "simulator.win_threshold",
            "must be a positive finite number",
        );
    }

    Ok(())
}

fn err(field: &str, message: &str) -> Result<(), ConfigError> {
    Err(ConfigError::ValidationError {
        field: field.to_string(),
        message: message.to_string(),
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
