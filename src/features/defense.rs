// Opponent-defense features: rolling 4-game averages of what a defensive
// unit has allowed and forced, plus a composite strength score.

use crate::features::rolling;
use crate::store::DefenseLog;

/// Number of trailing games the defense averages cover.
const DEFENSE_WINDOW: usize = 4;

/// League-average fallbacks used when the opponent has no defensive history
/// yet (early season, expansion data gaps).
const DEFAULT_PPG_ALLOWED: f64 = 25.0;
const DEFAULT_YPG_ALLOWED: f64 = 350.0;
const DEFAULT_SACKS_PER_GAME: f64 = 2.5;
const DEFAULT_TURNOVERS_PER_GAME: f64 = 1.5;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DefenseFeatures {
    pub ppg_allowed: f64,
    pub ypg_allowed: f64,
    pub sacks_per_game: f64,
    pub turnovers_per_game: f64,
    /// Composite 0-1 score; higher means a tougher defense.
    pub strength_score: f64,
}

impl Default for DefenseFeatures {
    fn default() -> Self {
        let strength = strength_score(
            DEFAULT_PPG_ALLOWED,
            DEFAULT_YPG_ALLOWED,
            DEFAULT_SACKS_PER_GAME,
            DEFAULT_TURNOVERS_PER_GAME,
        );
        DefenseFeatures {
            ppg_allowed: DEFAULT_PPG_ALLOWED,
            ypg_allowed: DEFAULT_YPG_ALLOWED,
            sacks_per_game: DEFAULT_SACKS_PER_GAME,
            turnovers_per_game: DEFAULT_TURNOVERS_PER_GAME,
            strength_score: strength,
        }
    }
}

/// Composite defensive strength: fewer points/yards allowed and more sacks
/// and takeaways score higher. Weighted 40/30/15/15 and clamped to [0, 1].
fn strength_score(ppg: f64, ypg: f64, sacks: f64, turnovers: f64) -> f64 {
    ((1.0 - (ppg - 10.0) / 30.0) * 0.4
        + (1.0 - (ypg - 250.0) / 200.0) * 0.3
        + (sacks / 5.0) * 0.15
        + (turnovers / 3.0) * 0.15)
        .clamp(0.0, 1.0)
}

/// Rolling defensive averages for `team` entering (season, week). Only games
/// strictly before the target week contribute; the most recent
/// `DEFENSE_WINDOW` of them are averaged.
pub fn defense_features(log: &DefenseLog, team: &str, season: u16, week: u8) -> DefenseFeatures {
    let history = log.history_before(team, season, week);
    if history.is_empty() {
        return DefenseFeatures::default();
    }
    let start = history.len().saturating_sub(DEFENSE_WINDOW);
    let window = &history[start..];

    let points: Vec<f64> = window.iter().map(|g| g.points_allowed).collect();
    let yards: Vec<f64> = window.iter().map(|g| g.yards_allowed).collect();
    let sacks: Vec<f64> = window.iter().map(|g| g.sacks).collect();
    let turnovers: Vec<f64> = window
        .iter()
        .map(|g| g.interceptions + g.fumbles_recovered)
        .collect();

    let ppg = rolling::mean(&points).unwrap_or(DEFAULT_PPG_ALLOWED);
    let ypg = rolling::mean(&yards).unwrap_or(DEFAULT_YPG_ALLOWED);
    let spg = rolling::mean(&sacks).unwrap_or(DEFAULT_SACKS_PER_GAME);
    let tpg = rolling::mean(&turnovers).unwrap_or(DEFAULT_TURNOVERS_PER_GAME);

    DefenseFeatures {
        ppg_allowed: ppg,
        ypg_allowed: ypg,
        sacks_per_game: spg,
        turnovers_per_game: tpg,
        strength_score: strength_score(ppg, ypg, spg, tpg),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
