// Single-lineup solver: depth-first branch and bound over roster slots.
//
// The search assigns one player per slot in order. Two admissible bounds
// prune the tree: remaining-slot minimum salaries against the cap, and
// remaining-slot maximum points against the best lineup found so far.
// Diversity overlap against prior lineups is tracked incrementally so a
// branch dies as soon as it shares too many players with any of them.

use std::collections::HashMap;
use std::time::Instant;

use tracing::debug;

use crate::store::SlatePlayer;

use super::constraints::{DiversityConstraints, LineupRules};

/// The best assignment found: one player index per slot, in slot order.
#[derive(Debug, Clone)]
pub(crate) struct Assignment {
    pub indices: Vec<usize>,
    pub total_points: f64,
}

pub(crate) struct Solver<'a> {
    players: &'a [&'a SlatePlayer],
    rules: &'a LineupRules,
    deadline: Instant,
    /// Per slot: eligible player indices, best points first.
    eligible: Vec<Vec<usize>>,
    /// Suffix sums over slots i..: the cheapest possible fill and the most
    /// points any fill could score. Both are admissible bounds.
    min_salary_from: Vec<u32>,
    max_points_from: Vec<f64>,
    /// Per prior lineup: how many selected players it already contains.
    overlap: Vec<usize>,
    prior_membership: Vec<Vec<bool>>,
    best: Option<Assignment>,
    timed_out: bool,
}

impl<'a> Solver<'a> {
    pub(crate) fn new(
        players: &'a [&'a SlatePlayer],
        rules: &'a LineupRules,
        diversity: &DiversityConstraints,
        deadline: Instant,
    ) -> Self {
        let slot_count = rules.slots.len();

        let mut eligible: Vec<Vec<usize>> = Vec::with_capacity(slot_count);
        for slot in &rules.slots {
            let mut indices: Vec<usize> = (0..players.len())
                .filter(|&i| slot.accepts(players[i].position))
                .collect();
            indices.sort_by(|&a, &b| {
                players[b]
                    .projected_points
                    .partial_cmp(&players[a].projected_points)
                    .unwrap_or(std::cmp::Ordering::Equal)
            });
            eligible.push(indices);
        }

        // Suffix bounds. An empty slot pool makes the whole search
        // infeasible; u32::MAX salary guarantees the root prunes.
        let mut min_salary_from = vec![0u32; slot_count + 1];
        let mut max_points_from = vec![0f64; slot_count + 1];
        for i in (0..slot_count).rev() {
            let slot_min = eligible[i]
                .iter()
                .map(|&p| players[p].salary)
                .min()
                .unwrap_or(u32::MAX);
            let slot_max = eligible[i]
                .first()
                .map(|&p| players[p].projected_points)
                .unwrap_or(0.0);
            min_salary_from[i] = min_salary_from[i + 1].saturating_add(slot_min);
            max_points_from[i] = max_points_from[i + 1] + slot_max;
        }

        // Prior-lineup membership, indexed [prior][player].
        let prior = diversity.prior_lineups();
        let prior_membership = prior
            .iter()
            .map(|ids| {
                players
                    .iter()
                    .map(|p| ids.contains(p.player_id.as_str()))
                    .collect()
            })
            .collect();

        Solver {
            players,
            rules,
            deadline,
            eligible,
            min_salary_from,
            max_points_from,
            overlap: vec![0; prior.len()],
            prior_membership,
            best: None,
            timed_out: false,
        }
    }

    /// Run the search. `None` means no feasible lineup exists within the
    /// deadline; on timeout the best lineup found so far is returned.
    pub(crate) fn solve(mut self) -> Option<Assignment> {
        let mut used = vec![false; self.players.len()];
        let mut chosen = Vec::with_capacity(self.rules.slots.len());
        let mut team_counts: HashMap<&str, usize> = HashMap::new();
        self.descend(0, 0, 0.0, &mut used, &mut chosen, &mut team_counts);
        if self.timed_out {
            debug!("lineup search hit its deadline; returning best found so far");
        }
        self.best
    }

    fn descend(
        &mut self,
        slot_idx: usize,
        salary: u32,
        points: f64,
        used: &mut Vec<bool>,
        chosen: &mut Vec<usize>,
        team_counts: &mut HashMap<&'a str, usize>,
    ) {
        if self.timed_out || Instant::now() >= self.deadline {
            self.timed_out = true;
            return;
        }

        if slot_idx == self.rules.slots.len() {
            if self.rules.min_stack > 1 {
                let biggest_stack = team_counts.values().copied().max().unwrap_or(0);
                if biggest_stack < self.rules.min_stack {
                    return;
                }
            }
            let improves = self
                .best
                .as_ref()
                .map(|b| points > b.total_points)
                .unwrap_or(true);
            if improves {
                self.best = Some(Assignment {
                    indices: chosen.clone(),
                    total_points: points,
                });
            }
            return;
        }

        // Bound checks against the best complete lineup so far.
        if salary.saturating_add(self.min_salary_from[slot_idx]) > self.rules.salary_cap {
            return;
        }
        if let Some(best) = &self.best {
            if points + self.max_points_from[slot_idx] <= best.total_points {
                return;
            }
        }

        let candidates = self.eligible[slot_idx].clone();
        for idx in candidates {
            if used[idx] {
                continue;
            }
            let player = self.players[idx];

            let committed = salary
                .saturating_add(player.salary)
                .saturating_add(self.min_salary_from[slot_idx + 1]);
            if committed > self.rules.salary_cap {
                continue;
            }
            let team_count = team_counts.get(player.team.as_str()).copied().unwrap_or(0);
            if team_count + 1 > self.rules.max_per_team {
                continue;
            }
            if self.exceeds_overlap(idx) {
                continue;
            }

            used[idx] = true;
            chosen.push(idx);
            *team_counts.entry(player.team.as_str()).or_insert(0) += 1;
            self.adjust_overlap(idx, 1);

            self.descend(
                slot_idx + 1,
                salary + player.salary,
                points + player.projected_points,
                used,
                chosen,
                team_counts,
            );

            self.adjust_overlap(idx, -1);
            *team_counts.get_mut(player.team.as_str()).unwrap() -= 1;
            chosen.pop();
            used[idx] = false;

            if self.timed_out {
                return;
            }
        }
    }

    /// Would selecting this player push any prior lineup's shared count
    /// past the overlap limit?
    fn exceeds_overlap(&self, player_idx: usize) -> bool {
        self.prior_membership
            .iter()
            .zip(&self.overlap)
            .any(|(members, &count)| members[player_idx] && count + 1 > self.rules.max_overlap)
    }

    fn adjust_overlap(&mut self, player_idx: usize, delta: isize) {
        for (members, count) in self.prior_membership.iter().zip(self.overlap.iter_mut()) {
            if members[player_idx] {
                *count = count.checked_add_signed(delta).unwrap_or(0);
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
