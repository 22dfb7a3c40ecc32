// Monte Carlo lineup evaluation: draw a fantasy-point outcome for every
// player, then score each lineup against the same draws. Sharing the draws
// across lineups keeps the comparison fair when lineups overlap.

use std::collections::HashMap;

use rand::Rng;
use tracing::debug;

use crate::config::{SimulatorConfig, StatSigmas};
use crate::projection::model::residual_sigma;
use crate::store::Stat;

use super::Lineup;

// ---------------------------------------------------------------------------
// Summary type
// ---------------------------------------------------------------------------

/// Simulated distribution of one lineup's total score.
#[derive(Debug, Clone)]
pub struct SimulationSummary {
    /// Mean simulated score.
    pub mean_score: f64,
    /// 5th percentile of simulated scores.
    pub floor: f64,
    /// 95th percentile of simulated scores.
    pub ceiling: f64,
    /// Share of iterations where the score cleared the win threshold.
    pub win_probability: f64,
}

// ---------------------------------------------------------------------------
// Simulation
// ---------------------------------------------------------------------------

/// Simulate every lineup in the batch, one summary per lineup in order.
///
/// Each player's outcome is Normal(projected points, fantasy residual
/// sigma for their position). One outcome per player per iteration; a
/// player appearing in several lineups contributes the same draw to all
/// of them.
pub fn simulate_lineups(
    lineups: &[Lineup],
    sigmas: &StatSigmas,
    config: &SimulatorConfig,
    rng: &mut impl Rng,
) -> Vec<SimulationSummary> {
    if lineups.is_empty() {
        return Vec::new();
    }

    // Deduplicate players across lineups; each gets one (mean, sigma) entry
    // and one draw per iteration.
    let mut index: HashMap<&str, usize> = HashMap::new();
    let mut params: Vec<(f64, f64)> = Vec::new();
    let membership: Vec<Vec<usize>> = lineups
        .iter()
        .map(|lineup| {
            lineup
                .slots
                .iter()
                .map(|(_, player)| {
                    *index.entry(player.player_id.as_str()).or_insert_with(|| {
                        params.push((
                            player.projected_points,
                            residual_sigma(sigmas, Stat::FantasyPoints, player.position),
                        ));
                        params.len() - 1
                    })
                })
                .collect()
        })
        .collect();

    debug!(
        "simulating {} lineups over {} distinct players, {} iterations",
        lineups.len(),
        params.len(),
        config.iterations
    );

    let mut outcomes = vec![0.0f64; params.len()];
    let mut scores: Vec<Vec<f64>> = (0..lineups.len())
        .map(|_| Vec::with_capacity(config.iterations))
        .collect();
    for _ in 0..config.iterations {
        for (outcome, &(mean, sigma)) in outcomes.iter_mut().zip(&params) {
            *outcome = mean + sigma * sample_normal(rng);
        }
        for (members, lineup_scores) in membership.iter().zip(scores.iter_mut()) {
            lineup_scores.push(members.iter().map(|&i| outcomes[i]).sum());
        }
    }

    scores
        .into_iter()
        .map(|mut lineup_scores| {
            let mean_score =
                lineup_scores.iter().sum::<f64>() / lineup_scores.len() as f64;
            let wins = lineup_scores
                .iter()
                .filter(|&&s| s > config.win_threshold)
                .count();
            let win_probability = wins as f64 / lineup_scores.len() as f64;
            lineup_scores.sort_by(|a, b| a.total_cmp(b));
            SimulationSummary {
                mean_score,
                floor: percentile(&lineup_scores, 5.0),
                ceiling: percentile(&lineup_scores, 95.0),
                win_probability,
            }
        })
        .collect()
}

/// Sample from the standard normal distribution (Box-Muller transform).
fn sample_normal(rng: &mut impl Rng) -> f64 {
    let u1: f64 = rng.gen_range(0.0001..1.0);
    let u2: f64 = rng.gen();
    (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos()
}

/// Linearly interpolated percentile over an ascending-sorted slice.
fn percentile(sorted: &[f64], p: f64) -> f64 {
    let rank = p / 100.0 * (sorted.len() - 1) as f64;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    sorted[lo] + (sorted[hi] - sorted[lo]) * (rank - lo as f64)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{Position, SlatePlayer};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn sigmas() -> StatSigmas {
        StatSigmas {
            fantasy_points: 7.5,
            passing_yards: 35.0,
            rushing_yards: 15.0,
            receiving_yards: 15.0,
        }
    }

    fn player(id: &str, position: Position, points: f64) -> SlatePlayer {
        SlatePlayer {
            player_id: id.into(),
            name: id.into(),
            position,
            team: "PHI".into(),
            salary: 5_000,
            projected_points: points,
        }
    }

    fn lineup(players: Vec<SlatePlayer>) -> Lineup {
        let total_points = players.iter().map(|p| p.projected_points).sum();
        let total_salary = players.iter().map(|p| p.salary).sum();
        Lineup {
            slots: players
                .into_iter()
                .enumerate()
                .map(|(i, p)| (format!("S{i}"), p))
                .collect(),
            total_salary,
            total_points,
        }
    }

    fn config(iterations: usize) -> SimulatorConfig {
        SimulatorConfig {
            iterations,
            win_threshold: 150.0,
        }
    }

    #[test]
    fn near_zero_sigma_collapses_the_distribution() {
        // Residual sigma is floored at a tiny positive value, so every
        // draw is within a hair of the projected sum.
        let zeroed = StatSigmas {
            fantasy_points: 1e-12,
            passing_yards: 35.0,
            rushing_yards: 15.0,
            receiving_yards: 15.0,
        };
        let lineups = vec![lineup(vec![
            player("qb1", Position::QB, 20.0),
            player("rb1", Position::RB, 15.0),
        ])];
        let mut rng = StdRng::seed_from_u64(1);
        let summaries = simulate_lineups(&lineups, &zeroed, &config(500), &mut rng);

        assert_eq!(summaries.len(), 1);
        let s = &summaries[0];
        assert!((s.mean_score - 35.0).abs() < 1e-3);
        assert!((s.floor - 35.0).abs() < 1e-3);
        assert!((s.ceiling - 35.0).abs() < 1e-3);
        assert!((s.win_probability - 0.0).abs() < f64::EPSILON);
    }

    #[test]
    fn floor_mean_ceiling_are_ordered() {
        let lineups = vec![lineup(vec![
            player("qb1", Position::QB, 20.0),
            player("wr1", Position::WR, 14.0),
        ])];
        let mut rng = StdRng::seed_from_u64(2);
        let s = &simulate_lineups(&lineups, &sigmas(), &config(5_000), &mut rng)[0];

        assert!(s.floor <= s.mean_score);
        assert!(s.mean_score <= s.ceiling);
        assert!(s.floor < s.ceiling);
    }

    #[test]
    fn mean_tracks_the_projected_total() {
        let lineups = vec![lineup(vec![
            player("qb1", Position::QB, 22.0),
            player("rb1", Position::RB, 16.0),
            player("wr1", Position::WR, 13.0),
        ])];
        let mut rng = StdRng::seed_from_u64(3);
        let s = &simulate_lineups(&lineups, &sigmas(), &config(20_000), &mut rng)[0];

        // Three players with sigma near 7, so the mean of 20k draws lands
        // well within half a point of 51.
        assert!((s.mean_score - 51.0).abs() < 0.5);
    }

    #[test]
    fn identical_lineups_get_identical_summaries() {
        // Draws are shared per player per iteration, so two lineups with
        // the same players score identically every iteration.
        let players = vec![
            player("qb1", Position::QB, 20.0),
            player("rb1", Position::RB, 15.0),
        ];
        let lineups = vec![lineup(players.clone()), lineup(players)];
        let mut rng = StdRng::seed_from_u64(4);
        let summaries = simulate_lineups(&lineups, &sigmas(), &config(1_000), &mut rng);

        assert!((summaries[0].mean_score - summaries[1].mean_score).abs() < f64::EPSILON);
        assert!((summaries[0].floor - summaries[1].floor).abs() < f64::EPSILON);
        assert!((summaries[0].ceiling - summaries[1].ceiling).abs() < f64::EPSILON);
    }

    #[test]
    fn seeded_runs_are_reproducible() {
        let lineups = vec![lineup(vec![
            player("qb1", Position::QB, 20.0),
            player("te1", Position::TE, 9.0),
        ])];
        let a = simulate_lineups(
            &lineups,
            &sigmas(),
            &config(1_000),
            &mut StdRng::seed_from_u64(7),
        );
        let b = simulate_lineups(
            &lineups,
            &sigmas(),
            &config(1_000),
            &mut StdRng::seed_from_u64(7),
        );
        assert!((a[0].mean_score - b[0].mean_score).abs() < f64::EPSILON);
        assert!((a[0].win_probability - b[0].win_probability).abs() < f64::EPSILON);
    }

    #[test]
    fn high_projection_clears_the_win_threshold() {
        let lineups = vec![lineup(vec![player("qb1", Position::QB, 200.0)])];
        let mut rng = StdRng::seed_from_u64(5);
        let s = &simulate_lineups(&lineups, &sigmas(), &config(2_000), &mut rng)[0];
        // 200 projected against a 150 threshold with sigma 7.5: effectively
        // every iteration wins.
        assert!(s.win_probability > 0.99);
    }

    #[test]
    fn empty_batch_simulates_to_nothing() {
        let mut rng = StdRng::seed_from_u64(6);
        let summaries = simulate_lineups(&[], &sigmas(), &config(100), &mut rng);
        assert!(summaries.is_empty());
    }

    #[test]
    fn percentile_interpolates_between_ranks() {
        let sorted = [10.0, 20.0, 30.0, 40.0, 50.0];
        assert!((percentile(&sorted, 0.0) - 10.0).abs() < 1e-12);
        assert!((percentile(&sorted, 100.0) - 50.0).abs() < 1e-12);
        assert!((percentile(&sorted, 50.0) - 30.0).abs() < 1e-12);
        // 95th percentile of five points: 0.95 * 4 = rank 3.8.
        assert!((percentile(&sorted, 95.0) - 48.0).abs() < 1e-12);
    }
}
