// Expected value: prop lines priced against projected distributions.
//
// Each market line yields two candidates (over and under). A candidate's
// edge is the probability-weighted profit against the quoted American price,
// assuming the projected stat is normal around the model mean.

use std::collections::HashMap;

use thiserror::Error;

use crate::projection::Projection;
use crate::projection::model::SIGMA_FLOOR;
use crate::store::{MarketLine, Stat};

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum EvError {
    #[error("invalid American odds {0}: must be nonzero with |odds| >= 100")]
    InvalidOdds(i64),
}

// ---------------------------------------------------------------------------
// Normal CDF
// ---------------------------------------------------------------------------

// Abramowitz & Stegun 7.1.26 rational approximation of erf, max absolute
// error ~1.5e-7.
const A1: f64 = 0.254829592;
const A2: f64 = -0.284496736;
const A3: f64 = 1.421413741;
const A4: f64 = -1.453152027;
const A5: f64 = 1.061405429;
const P: f64 = 0.3275911;

fn erf(x: f64) -> f64 {
    let sign = if x < 0.0 { -1.0 } else { 1.0 };
    let x = x.abs();
    let t = 1.0 / (1.0 + P * x);
    let y = 1.0 - ((((A5 * t + A4) * t + A3) * t + A2) * t + A1) * t * (-x * x).exp();
    sign * y
}

/// Standard normal CDF.
pub fn normal_cdf(z: f64) -> f64 {
    0.5 * (1.0 + erf(z / std::f64::consts::SQRT_2))
}

// ---------------------------------------------------------------------------
// Odds and probability
// ---------------------------------------------------------------------------

/// Profit per unit staked for American odds: +150 pays 1.5, -200 pays 0.5.
pub fn decimal_profit(odds: i64) -> Result<f64, EvError> {
    if odds == 0 || odds.abs() < 100 {
        return Err(EvError::InvalidOdds(odds));
    }
    if odds > 0 {
        Ok(odds as f64 / 100.0)
    } else {
        Ok(100.0 / odds.unsigned_abs() as f64)
    }
}

/// P(stat > line) under N(mean, sigma^2).
pub fn win_prob_over(mean: f64, sigma: f64, line: f64) -> f64 {
    let sigma = sigma.max(SIGMA_FLOOR);
    1.0 - normal_cdf((line - mean) / sigma)
}

/// Expected value as a percentage of stake: (p * profit - (1 - p)) * 100.
pub fn ev_percent(win_probability: f64, profit_per_unit: f64) -> f64 {
    (win_probability * profit_per_unit - (1.0 - win_probability)) * 100.0
}

// ---------------------------------------------------------------------------
// Candidates and ranking
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Side {
    Over,
    Under,
}

impl Side {
    pub fn display_str(&self) -> &'static str {
        match self {
            Side::Over => "over",
            Side::Under => "under",
        }
    }
}

/// One side of one prop line, priced against the matching projection.
#[derive(Debug, Clone)]
pub struct EvCandidate {
    pub player_id: String,
    pub name: String,
    pub stat: Stat,
    pub side: Side,
    pub threshold: f64,
    pub price: i64,
    pub book: String,
    pub projected_mean: f64,
    pub sigma: f64,
    pub win_probability: f64,
    pub ev_percent: f64,
}

/// Rank every line side against the projections, best edge first.
///
/// Lines without a matching (player, stat) projection are skipped; that is
/// a coverage gap, not an error. Candidates below `min_ev` are dropped
/// silently. The sort is stable: EV% descending, then lower sigma, so equal
/// edges with tighter distributions come first and reruns are reproducible.
pub fn rank_ev(
    projections: &[Projection],
    lines: &[MarketLine],
    min_ev: f64,
) -> Result<Vec<EvCandidate>, EvError> {
    let mut by_key: HashMap<(&str, Stat), &Projection> = HashMap::new();
    for p in projections {
        by_key.insert((p.player_id.as_str(), p.stat), p);
    }

    let mut candidates = Vec::new();
    for line in lines {
        let Some(projection) = by_key.get(&(line.player_id.as_str(), line.stat)) else {
            continue;
        };

        let p_over = win_prob_over(projection.mean, projection.sigma, line.threshold);
        for (side, probability, price) in [
            (Side::Over, p_over, line.price_over),
            (Side::Under, 1.0 - p_over, line.price_under),
        ] {
            let profit = decimal_profit(price)?;
            let ev = ev_percent(probability, profit);
            if ev < min_ev {
                continue;
            }
            candidates.push(EvCandidate {
                player_id: line.player_id.clone(),
                name: projection.name.clone(),
                stat: line.stat,
                side,
                threshold: line.threshold,
                price,
                book: line.book.clone(),
                projected_mean: projection.mean,
                sigma: projection.sigma,
                win_probability: probability,
                ev_percent: ev,
            });
        }
    }

    candidates.sort_by(|a, b| {
        b.ev_percent
            .partial_cmp(&a.ev_percent)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(
                a.sigma
                    .partial_cmp(&b.sigma)
                    .unwrap_or(std::cmp::Ordering::Equal),
            )
    });

    Ok(candidates)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
