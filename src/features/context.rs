// Game-context features: vegas market, weather, and player-quality baselines.

use crate::store::{GameContext, Position};

// ---------------------------------------------------------------------------
// Vegas / game-script features
// ---------------------------------------------------------------------------

/// The spread from the player's team's perspective. Spreads are quoted for
/// the home team (negative when home is favored), so away teams see the sign
/// flipped.
pub fn team_spread(home_spread: f64, is_home: bool) -> f64 {
    if is_home {
        home_spread
    } else {
        -home_spread
    }
}

/// Implied team total from the game total and spread:
/// (total - team_spread) / 2. A -3.5 favorite in a 47.5-total game is
/// implied at 25.5 points; the underdog at 22.0.
pub fn implied_team_total(vegas_total: f64, home_spread: f64, is_home: bool) -> f64 {
    (vegas_total - team_spread(home_spread, is_home)) / 2.0
}

/// Spread-volume interaction features. Underdogs (positive spread) lean on
/// the pass, favorites lean on the run, so each interaction is signed to be
/// positive in the game script that inflates that stat.
pub fn spread_interactions(spread: f64, passing_ema: f64, rushing_ema: f64) -> (f64, f64) {
    (spread * passing_ema, -spread * rushing_ema)
}

// ---------------------------------------------------------------------------
// Weather features
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct WeatherFeatures {
    pub wind_passing_penalty: f64,
    pub wind_rushing_boost: f64,
    pub temp_extreme: f64,
    pub high_humidity: f64,
}

/// Position-conditioned weather transforms.
///
/// Wind hurts the passing game (QB/WR/TE) once it matters at all, scaled by
/// wind/15 and capped at 2. It nudges game script toward the run, so RBs get
/// a boost above 10 mph, scaled by (wind-10)/10 and capped at 1. Temperature
/// below freezing or above 90F and humidity above 70% are binary flags.
pub fn weather_features(context: &GameContext, position: Position) -> WeatherFeatures {
    let wind = context.wind_speed.max(0.0);

    let wind_passing_penalty = if position.is_passing_position() {
        (wind / 15.0).clamp(0.0, 2.0)
    } else {
        0.0
    };

    let wind_rushing_boost = if position.is_rushing_position() {
        ((wind - 10.0) / 10.0).clamp(0.0, 1.0)
    } else {
        0.0
    };

    let temp_extreme = if context.temp_low < 32.0 || context.temp_low > 90.0 {
        1.0
    } else {
        0.0
    };
    let high_humidity = if context.humidity > 70.0 { 1.0 } else { 0.0 };

    WeatherFeatures {
        wind_passing_penalty,
        wind_rushing_boost,
        temp_extreme,
        high_humidity,
    }
}

// ---------------------------------------------------------------------------
// Player-quality features
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct QualityFeatures {
    pub vorp_last_season: f64,
    pub ppg_last_season: f64,
    pub ppg_last_season_squared: f64,
    /// Current fantasy-point EMA minus last season's points per game.
    pub ppg_trend: f64,
    pub vorp_tier: f64,
    pub ppg_tier: f64,
}

/// Tier bin edges for prior-season VORP (quartile cuts from offline fits).
const VORP_TIER_EDGES: [f64; 3] = [-99.0, -52.0, 7.0];
/// Tier bin edges for prior-season points per game.
const PPG_TIER_EDGES: [f64; 3] = [4.0, 8.7, 13.7];

/// Discretize a value into tiers 0-3 using right-closed bins:
/// value <= edge[0] is tier 0, (edge[0], edge[1]] is tier 1, and so on.
fn tier(value: f64, edges: &[f64; 3]) -> f64 {
    edges.iter().filter(|&&edge| value > edge).count() as f64
}

pub fn quality_features(
    vorp_last_season: f64,
    ppg_last_season: f64,
    fantasy_points_ema: f64,
) -> QualityFeatures {
    QualityFeatures {
        vorp_last_season,
        ppg_last_season,
        ppg_last_season_squared: ppg_last_season * ppg_last_season,
        ppg_trend: fantasy_points_ema - ppg_last_season,
        vorp_tier: tier(vorp_last_season, &VORP_TIER_EDGES),
        ppg_tier: tier(ppg_last_season, &PPG_TIER_EDGES),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn approx_eq(a: f64, b: f64, epsilon: f64) -> bool {
        (a - b).abs() < epsilon
    }

    fn context(wind: f64, temp: f64, humidity: f64) -> GameContext {
        GameContext {
            wind_speed: wind,
            temp_low: temp,
            humidity,
            vegas_total: 0.0,
            vegas_spread: 0.0,
        }
    }

    // -- Vegas --

    #[test]
    fn implied_total_favorite_and_underdog_sum_to_total() {
        // Home favored by 3.5 in a 47.5 game.
        let home = implied_team_total(47.5, -3.5, true);
        let away = implied_team_total(47.5, -3.5, false);
        assert!(approx_eq(home, 25.5, 1e-12));
        assert!(approx_eq(away, 22.0, 1e-12));
        assert!(approx_eq(home + away, 47.5, 1e-12));
    }

    #[test]
    fn pickem_splits_total_evenly() {
        let home = implied_team_total(44.0, 0.0, true);
        let away = implied_team_total(44.0, 0.0, false);
        assert!(approx_eq(home, 22.0, 1e-12));
        assert!(approx_eq(away, 22.0, 1e-12));
    }

    #[test]
    fn away_favorite_gets_larger_share() {
        // Home spread +6.5 means the away team is favored.
        let away = implied_team_total(40.0, 6.5, false);
        let home = implied_team_total(40.0, 6.5, true);
        assert!(away > home);
        assert!(approx_eq(away, 23.25, 1e-12));
    }

    #[test]
    fn spread_interactions_signs() {
        // Underdog (+7): passing interaction positive, rushing negative.
        let (pass, rush) = spread_interactions(7.0, 250.0, 80.0);
        assert!(pass > 0.0);
        assert!(rush < 0.0);

        // Favorite (-7): flipped.
        let (pass, rush) = spread_interactions(-7.0, 250.0, 80.0);
        assert!(pass < 0.0);
        assert!(rush > 0.0);
    }

    // -- Weather --

    #[test]
    fn wind_penalizes_passing_positions_only() {
        let ctx = context(15.0, 55.0, 40.0);
        for pos in [Position::QB, Position::WR, Position::TE] {
            let w = weather_features(&ctx, pos);
            assert!(approx_eq(w.wind_passing_penalty, 1.0, 1e-12));
            assert!(approx_eq(w.wind_rushing_boost, 0.0, 1e-12));
        }
        let rb = weather_features(&ctx, Position::RB);
        assert!(approx_eq(rb.wind_passing_penalty, 0.0, 1e-12));
        assert!(approx_eq(rb.wind_rushing_boost, 0.5, 1e-12));
    }

    #[test]
    fn wind_penalty_caps_at_two() {
        let ctx = context(60.0, 55.0, 40.0);
        let qb = weather_features(&ctx, Position::QB);
        assert!(approx_eq(qb.wind_passing_penalty, 2.0, 1e-12));
        let rb = weather_features(&ctx, Position::RB);
        assert!(approx_eq(rb.wind_rushing_boost, 1.0, 1e-12));
    }

    #[test]
    fn calm_wind_no_rushing_boost() {
        // Below the 10 mph threshold the boost clamps to zero.
        let ctx = context(8.0, 55.0, 40.0);
        let rb = weather_features(&ctx, Position::RB);
        assert!(approx_eq(rb.wind_rushing_boost, 0.0, 1e-12));
    }

    #[test]
    fn temp_and_humidity_flags() {
        let freezing = weather_features(&context(0.0, 20.0, 40.0), Position::WR);
        assert!(approx_eq(freezing.temp_extreme, 1.0, 1e-12));

        let scorching = weather_features(&context(0.0, 95.0, 40.0), Position::WR);
        assert!(approx_eq(scorching.temp_extreme, 1.0, 1e-12));

        let mild = weather_features(&context(0.0, 60.0, 40.0), Position::WR);
        assert!(approx_eq(mild.temp_extreme, 0.0, 1e-12));

        let humid = weather_features(&context(0.0, 60.0, 85.0), Position::WR);
        assert!(approx_eq(humid.high_humidity, 1.0, 1e-12));
    }

    // -- Quality --

    #[test]
    fn vorp_tiers() {
        assert!(approx_eq(quality_features(-150.0, 0.0, 0.0).vorp_tier, 0.0, 1e-12));
        assert!(approx_eq(quality_features(-75.0, 0.0, 0.0).vorp_tier, 1.0, 1e-12));
        assert!(approx_eq(quality_features(0.0, 0.0, 0.0).vorp_tier, 2.0, 1e-12));
        assert!(approx_eq(quality_features(50.0, 0.0, 0.0).vorp_tier, 3.0, 1e-12));
    }

    #[test]
    fn ppg_tiers() {
        assert!(approx_eq(quality_features(0.0, 2.0, 0.0).ppg_tier, 0.0, 1e-12));
        assert!(approx_eq(quality_features(0.0, 6.0, 0.0).ppg_tier, 1.0, 1e-12));
        assert!(approx_eq(quality_features(0.0, 10.0, 0.0).ppg_tier, 2.0, 1e-12));
        assert!(approx_eq(quality_features(0.0, 20.0, 0.0).ppg_tier, 3.0, 1e-12));
    }

    #[test]
    fn tier_edges_are_right_closed() {
        // A value exactly on an edge belongs to the lower tier.
        assert!(approx_eq(quality_features(0.0, 4.0, 0.0).ppg_tier, 0.0, 1e-12));
        assert!(approx_eq(quality_features(7.0, 0.0, 0.0).vorp_tier, 2.0, 1e-12));
    }

    #[test]
    fn ppg_trend_and_square() {
        let q = quality_features(10.0, 12.0, 18.5);
        assert!(approx_eq(q.ppg_trend, 6.5, 1e-12));
        assert!(approx_eq(q.ppg_last_season_squared, 144.0, 1e-12));
    }
}
