// Lineup optimization: repeated single-lineup solves under diversity and
// exposure constraints until the requested count is reached or the pool
// runs dry.

pub mod constraints;
pub mod simulator;
mod solver;

use std::time::Instant;

use thiserror::Error;
use tracing::{debug, info};

use crate::store::SlatePlayer;

use constraints::{DiversityConstraints, ExposureTracker, LineupRules};
use solver::Solver;

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum OptimizerError {
    #[error("no feasible lineup exists for the given pool and rules")]
    Infeasible,
}

// ---------------------------------------------------------------------------
// Lineup types
// ---------------------------------------------------------------------------

/// One filled roster: slot label and the player assigned to it, in the
/// rule set's slot order.
#[derive(Debug, Clone)]
pub struct Lineup {
    pub slots: Vec<(String, SlatePlayer)>,
    pub total_salary: u32,
    pub total_points: f64,
}

impl Lineup {
    pub fn player_ids(&self) -> impl Iterator<Item = &str> {
        self.slots.iter().map(|(_, p)| p.player_id.as_str())
    }
}

/// The result of a batch request. `count_found` may be less than the
/// requested count; that is a normal outcome, not an error.
#[derive(Debug)]
pub struct LineupBatch {
    pub lineups: Vec<Lineup>,
    pub count_found: usize,
}

// ---------------------------------------------------------------------------
// Batch loop
// ---------------------------------------------------------------------------

/// Build up to `n` lineups from the pool.
///
/// Each iteration solves against a diversity snapshot of every lineup
/// returned so far, then records player exposure; capped players leave the
/// pool for the remaining solves. `Infeasible` only when not even one
/// lineup exists. The deadline bounds the whole batch.
pub fn optimize_lineups(
    pool: &[SlatePlayer],
    rules: &LineupRules,
    n: usize,
    deadline: Instant,
) -> Result<LineupBatch, OptimizerError> {
    let mut lineups: Vec<Lineup> = Vec::with_capacity(n);
    let mut diversity = DiversityConstraints::new();
    let mut exposure = ExposureTracker::new();

    while lineups.len() < n {
        let available = exposure.available(pool, rules.exposure_cap);
        if available.len() < rules.lineup_size() {
            debug!(
                "pool exhausted after {} lineups ({} players under the exposure cap)",
                lineups.len(),
                available.len()
            );
            break;
        }

        let assignment = Solver::new(&available, rules, &diversity, deadline).solve();
        let Some(assignment) = assignment else {
            debug!("no further feasible lineup after {} found", lineups.len());
            break;
        };

        let lineup = materialize(&available, rules, &assignment.indices, assignment.total_points);
        diversity = diversity.with_lineup(lineup.player_ids().map(str::to_string));
        exposure.record(lineup.player_ids());
        lineups.push(lineup);
    }

    if lineups.is_empty() {
        return Err(OptimizerError::Infeasible);
    }

    let count_found = lineups.len();
    info!("optimizer produced {count_found} of {n} requested lineups");
    Ok(LineupBatch {
        lineups,
        count_found,
    })
}

fn materialize(
    available: &[&SlatePlayer],
    rules: &LineupRules,
    indices: &[usize],
    total_points: f64,
) -> Lineup {
    let slots: Vec<(String, SlatePlayer)> = rules
        .slots
        .iter()
        .zip(indices)
        .map(|(slot, &i)| (slot.name.clone(), available[i].clone()))
        .collect();
    let total_salary = slots.iter().map(|(_, p)| p.salary).sum();
    Lineup {
        slots,
        total_salary,
        total_points,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use constraints::Slot;
    use crate::store::Position;
    use std::collections::HashSet;
    use std::time::Duration;

    fn player(id: &str, position: Position, team: &str, salary: u32, points: f64) -> SlatePlayer {
        SlatePlayer {
            player_id: id.into(),
            name: id.into(),
            position,
            team: team.into(),
            salary,
            projected_points: points,
        }
    }

    fn two_slot_rules() -> LineupRules {
        LineupRules {
            salary_cap: 50_000,
            slots: vec![
                Slot {
                    name: "QB".into(),
                    eligible: vec![Position::QB],
                },
                Slot {
                    name: "RB".into(),
                    eligible: vec![Position::RB],
                },
            ],
            min_stack: 1,
            max_per_team: 9,
            max_overlap: 1,
            exposure_cap: 9,
        }
    }

    fn deadline() -> Instant {
        Instant::now() + Duration::from_secs(5)
    }

    #[test]
    fn trivial_pool_fills_every_slot_exactly_once() {
        let pool = vec![
            player("qb1", Position::QB, "PHI", 8_000, 20.0),
            player("rb1", Position::RB, "SF", 7_000, 15.0),
        ];
        let batch = optimize_lineups(&pool, &two_slot_rules(), 1, deadline()).unwrap();

        assert_eq!(batch.count_found, 1);
        let lineup = &batch.lineups[0];
        assert_eq!(lineup.slots.len(), 2);
        assert_eq!(lineup.slots[0].0, "QB");
        assert_eq!(lineup.slots[1].0, "RB");
        assert_eq!(lineup.total_salary, 15_000);
        assert!(lineup.total_salary <= 50_000);
        assert!((lineup.total_points - 35.0).abs() < 1e-9);
    }

    #[test]
    fn empty_pool_is_infeasible() {
        let result = optimize_lineups(&[], &two_slot_rules(), 1, deadline());
        assert!(matches!(result, Err(OptimizerError::Infeasible)));
    }

    #[test]
    fn fewer_lineups_than_requested_is_not_an_error() {
        // Exactly one feasible lineup; asking for three returns one.
        let pool = vec![
            player("qb1", Position::QB, "PHI", 8_000, 20.0),
            player("rb1", Position::RB, "SF", 7_000, 15.0),
        ];
        let batch = optimize_lineups(&pool, &two_slot_rules(), 3, deadline()).unwrap();
        assert_eq!(batch.count_found, 1);
    }

    #[test]
    fn returned_lineups_respect_the_overlap_bound() {
        let pool = vec![
            player("qb1", Position::QB, "PHI", 5_000, 22.0),
            player("qb2", Position::QB, "DAL", 5_000, 18.0),
            player("qb3", Position::QB, "KC", 5_000, 16.0),
            player("rb1", Position::RB, "SF", 5_000, 19.0),
            player("rb2", Position::RB, "NYG", 5_000, 12.0),
            player("rb3", Position::RB, "MIA", 5_000, 10.0),
        ];
        let batch = optimize_lineups(&pool, &two_slot_rules(), 3, deadline()).unwrap();
        assert!(batch.count_found >= 2);

        for (i, a) in batch.lineups.iter().enumerate() {
            for b in &batch.lineups[i + 1..] {
                let ids_a: HashSet<&str> = a.player_ids().collect();
                let shared = b.player_ids().filter(|id| ids_a.contains(id)).count();
                assert!(shared <= 1, "lineups share {shared} players");
            }
        }
    }

    #[test]
    fn exposure_cap_retires_players_from_the_pool() {
        let pool = vec![
            player("qb1", Position::QB, "PHI", 5_000, 22.0),
            player("qb2", Position::QB, "DAL", 5_000, 18.0),
            player("rb1", Position::RB, "SF", 5_000, 19.0),
            player("rb2", Position::RB, "NYG", 5_000, 12.0),
        ];
        let mut rules = two_slot_rules();
        rules.max_overlap = 2;
        rules.exposure_cap = 1;

        let batch = optimize_lineups(&pool, &rules, 4, deadline()).unwrap();
        // Four players, two per lineup, each used at most once: two lineups.
        assert_eq!(batch.count_found, 2);

        let mut seen: Vec<&str> = batch
            .lineups
            .iter()
            .flat_map(|l| l.player_ids())
            .collect();
        seen.sort_unstable();
        let before = seen.len();
        seen.dedup();
        assert_eq!(before, seen.len(), "a player exceeded the exposure cap");
    }

    #[test]
    fn lineups_come_out_best_first() {
        let pool = vec![
            player("qb1", Position::QB, "PHI", 5_000, 22.0),
            player("qb2", Position::QB, "DAL", 5_000, 18.0),
            player("rb1", Position::RB, "SF", 5_000, 19.0),
            player("rb2", Position::RB, "NYG", 5_000, 12.0),
        ];
        let mut rules = two_slot_rules();
        rules.max_overlap = 1;

        let batch = optimize_lineups(&pool, &rules, 2, deadline()).unwrap();
        assert_eq!(batch.count_found, 2);
        assert!(batch.lineups[0].total_points >= batch.lineups[1].total_points);
        assert!((batch.lineups[0].total_points - 41.0).abs() < 1e-9);
    }
}
