// Feature engineering: turns ordered game history into a fixed-width,
// leak-free feature vector per (player, target week).

pub mod context;
pub mod defense;
pub mod rolling;
pub mod shares;

use std::collections::BTreeMap;

use thiserror::Error;
use tracing::debug;

use crate::config::FeatureConfig;
use crate::store::{
    DefenseLog, FeatureStore, GameContext, HistoricalRecord, Position, Schedule, TeamLog,
};

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum FeatureError {
    #[error("no history for player {player_id} entering season {season} week {week}")]
    InsufficientHistory {
        player_id: String,
        season: u16,
        week: u8,
    },
}

// ---------------------------------------------------------------------------
// FeatureVector
// ---------------------------------------------------------------------------

/// A named feature mapping for one (player, target week). Values are stored
/// in a BTreeMap so iteration order, and therefore anything derived from it,
/// is deterministic. Created fresh per request; never persisted.
#[derive(Debug, Clone)]
pub struct FeatureVector {
    pub player_id: String,
    pub name: String,
    pub position: Position,
    pub team: String,
    pub season: u16,
    pub week: u8,
    values: BTreeMap<String, f64>,
}

impl FeatureVector {
    pub fn new(
        player_id: &str,
        name: &str,
        position: Position,
        team: &str,
        season: u16,
        week: u8,
    ) -> Self {
        FeatureVector {
            player_id: player_id.to_string(),
            name: name.to_string(),
            position,
            team: team.to_string(),
            season,
            week,
            values: BTreeMap::new(),
        }
    }

    pub fn get(&self, feature: &str) -> Option<f64> {
        self.values.get(feature).copied()
    }

    pub fn insert(&mut self, feature: &str, value: f64) {
        self.values.insert(feature.to_string(), value);
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &f64)> {
        self.values.iter()
    }
}

// ---------------------------------------------------------------------------
// FeatureEngine
// ---------------------------------------------------------------------------

/// Stateless computation over borrowed stores. All methods are pure reads;
/// two calls with identical inputs produce identical vectors, which is what
/// makes downstream EV and optimizer runs reproducible.
pub struct FeatureEngine<'a> {
    config: &'a FeatureConfig,
    store: &'a FeatureStore,
    teams: &'a TeamLog,
    defenses: &'a DefenseLog,
    schedule: &'a Schedule,
}

/// Base columns that get an EMA (and a low-confidence companion).
const EMA_COLUMNS: &[(&str, fn(&HistoricalRecord) -> f64)] = &[
    ("fantasy_points", |r| r.fantasy_points),
    ("targets", |r| r.targets),
    ("rush_attempts", |r| r.rush_attempts),
    ("passing_yards", |r| r.passing_yards),
    ("rushing_yards", |r| r.rushing_yards),
    ("receiving_yards", |r| r.receiving_yards),
    ("red_zone_targets", |r| r.red_zone_targets),
    ("red_zone_rush_attempts", |r| r.red_zone_rush_attempts),
];

/// Columns that get a 1-game lag.
const LAG_COLUMNS: &[(&str, fn(&HistoricalRecord) -> f64)] = &[
    ("fantasy_points", |r| r.fantasy_points),
    ("targets", |r| r.targets),
    ("rush_attempts", |r| r.rush_attempts),
];

/// Feature name for the consecutive-games streak counter, e.g.
/// `fantasy_points_streak_over_15` for a 15.0-point threshold.
fn streak_key(threshold: f64) -> String {
    if threshold.fract() == 0.0 {
        format!("fantasy_points_streak_over_{}", threshold as i64)
    } else {
        format!("fantasy_points_streak_over_{threshold}")
    }
}

impl<'a> FeatureEngine<'a> {
    pub fn new(
        config: &'a FeatureConfig,
        store: &'a FeatureStore,
        teams: &'a TeamLog,
        defenses: &'a DefenseLog,
        schedule: &'a Schedule,
    ) -> Self {
        FeatureEngine {
            config,
            store,
            teams,
            defenses,
            schedule,
        }
    }

    /// Build the feature vector for one player entering (season, week),
    /// using at most `window` trailing games. Only records strictly before
    /// the target week are readable; the target game's own context comes
    /// from the schedule, which carries pre-kickoff information only.
    pub fn compute_features(
        &self,
        player_id: &str,
        season: u16,
        week: u8,
        window: usize,
    ) -> Result<FeatureVector, FeatureError> {
        let history = self.store.history_before(player_id, season, week);
        if history.is_empty() {
            return Err(FeatureError::InsufficientHistory {
                player_id: player_id.to_string(),
                season,
                week,
            });
        }

        let start = history.len().saturating_sub(window);
        let trailing = &history[start..];
        let latest = &history[history.len() - 1];
        let low_confidence = trailing.len() < self.config.min_games;

        let mut fv = FeatureVector {
            player_id: player_id.to_string(),
            name: latest.name.clone(),
            position: latest.position,
            team: latest.team.clone(),
            season,
            week,
            values: BTreeMap::new(),
        };

        // Rolling EMAs with low-confidence companions. Games absent from
        // the window are simply not there; no zero-filling.
        let span = self.config.ema_span;
        for (name, extract) in EMA_COLUMNS {
            let values: Vec<f64> = trailing.iter().map(|r| extract(r)).collect();
            if let Some(e) = rolling::ema(&values, span) {
                fv.insert(&format!("{name}_ema"), e);
            }
            fv.insert(
                &format!("{name}_ema_low_confidence"),
                if low_confidence { 1.0 } else { 0.0 },
            );
        }

        // 1-game lags.
        for (name, extract) in LAG_COLUMNS {
            let values: Vec<f64> = trailing.iter().map(|r| extract(r)).collect();
            if let Some(v) = rolling::lag(&values, 1) {
                fv.insert(&format!("{name}_lag_1"), v);
            }
        }

        // Streaks and trend on fantasy points. The streak key carries its
        // threshold so downstream model weights stay unambiguous when the
        // threshold changes.
        let fantasy: Vec<f64> = trailing.iter().map(|r| r.fantasy_points).collect();
        fv.insert(
            &streak_key(self.config.streak_threshold),
            rolling::streak_over(&fantasy, self.config.streak_threshold) as f64,
        );
        fv.insert(
            "streak_coefficient",
            rolling::streak_coefficient(
                &fantasy,
                self.config.streak_short_span,
                self.config.streak_long_span,
            ),
        );
        fv.insert("fantasy_points_velocity", rolling::velocity(&fantasy, span));

        // Opportunity shares against the team's volume. The team window is
        // clamped to the player's game count so a short player history does
        // not divide by a full season of team volume.
        let team_history = self.teams.history_before(&latest.team, season, week);
        let team_start = team_history.len().saturating_sub(trailing.len());
        let team_shares = shares::compute_shares(trailing, &team_history[team_start..]);
        fv.insert("target_share", team_shares.target_share);
        fv.insert("rush_share", team_shares.rush_share);
        fv.insert("red_zone_share", team_shares.red_zone_share);
        fv.insert("opportunity_share", team_shares.opportunity_share);

        // Target-game context. An unscheduled game (bye mismatch, data gap)
        // degrades to neutral context rather than failing the request. Mild
        // weather in the fallback keeps the binary flags from tripping.
        let neutral = GameContext {
            wind_speed: 0.0,
            temp_low: 60.0,
            humidity: 50.0,
            vegas_total: 0.0,
            vegas_spread: 0.0,
        };
        let (upcoming_context, opponent, is_home) =
            match self.schedule.upcoming(&latest.team, season, week) {
                Some(game) => (game.context, Some(game.opponent.clone()), game.is_home),
                None => {
                    debug!(
                        "no scheduled game for {} season {} week {}; using neutral context",
                        latest.team, season, week
                    );
                    (neutral, None, true)
                }
            };

        let spread = context::team_spread(upcoming_context.vegas_spread, is_home);
        fv.insert(
            "implied_team_total",
            context::implied_team_total(upcoming_context.vegas_total, upcoming_context.vegas_spread, is_home),
        );
        fv.insert("vegas_total", upcoming_context.vegas_total);
        fv.insert("vegas_spread", spread);

        let passing_ema = fv.get("passing_yards_ema").unwrap_or(0.0);
        let rushing_ema = fv.get("rushing_yards_ema").unwrap_or(0.0);
        let (pass_script, rush_script) =
            context::spread_interactions(spread, passing_ema, rushing_ema);
        fv.insert("spread_passing_interaction", pass_script);
        fv.insert("spread_rushing_interaction", rush_script);

        let weather = context::weather_features(&upcoming_context, latest.position);
        fv.insert("weather_wind_passing_penalty", weather.wind_passing_penalty);
        fv.insert("weather_wind_rushing_boost", weather.wind_rushing_boost);
        fv.insert("weather_temp_extreme", weather.temp_extreme);
        fv.insert("weather_high_humidity", weather.high_humidity);

        // Opponent defense entering this week.
        let def = match &opponent {
            Some(opp) => defense::defense_features(self.defenses, opp, season, week),
            None => defense::DefenseFeatures::default(),
        };
        fv.insert("opp_def_ppg_allowed", def.ppg_allowed);
        fv.insert("opp_def_ypg_allowed", def.ypg_allowed);
        fv.insert("opp_def_sacks_per_game", def.sacks_per_game);
        fv.insert("opp_def_turnovers_per_game", def.turnovers_per_game);
        fv.insert("opp_def_strength_score", def.strength_score);

        // Prior-season player-quality baselines.
        let fantasy_ema = fv.get("fantasy_points_ema").unwrap_or(0.0);
        let quality = context::quality_features(
            latest.vorp_last_season,
            latest.ppg_last_season,
            fantasy_ema,
        );
        fv.insert("vorp_last_season", quality.vorp_last_season);
        fv.insert("ppg_last_season", quality.ppg_last_season);
        fv.insert("ppg_last_season_squared", quality.ppg_last_season_squared);
        fv.insert("player_ppg_trend", quality.ppg_trend);
        fv.insert("vorp_tier", quality.vorp_tier);
        fv.insert("ppg_tier", quality.ppg_tier);

        Ok(fv)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
