// Lineup constraints: roster rules parsed from config, the diversity
// snapshot carried between solves, and the exposure accumulator.

use std::collections::{HashMap, HashSet};

use crate::config::{ConfigError, OptimizerConfig};
use crate::store::{Position, SlatePlayer};

// ---------------------------------------------------------------------------
// Roster rules
// ---------------------------------------------------------------------------

/// One roster slot and the positions allowed to fill it.
#[derive(Debug, Clone)]
pub struct Slot {
    pub name: String,
    pub eligible: Vec<Position>,
}

impl Slot {
    pub fn accepts(&self, position: Position) -> bool {
        self.eligible.contains(&position)
    }
}

/// The full rule set for one contest format, resolved from config once and
/// shared by every solve in the batch.
#[derive(Debug, Clone)]
pub struct LineupRules {
    pub salary_cap: u32,
    pub slots: Vec<Slot>,
    pub min_stack: usize,
    pub max_per_team: usize,
    pub max_overlap: usize,
    pub exposure_cap: usize,
}

impl LineupRules {
    pub fn from_config(config: &OptimizerConfig) -> Result<Self, ConfigError> {
        let slots = config
            .slots
            .iter()
            .map(|s| {
                Ok(Slot {
                    name: s.name.clone(),
                    eligible: s.eligible_positions()?,
                })
            })
            .collect::<Result<Vec<_>, ConfigError>>()?;
        Ok(LineupRules {
            salary_cap: config.salary_cap,
            slots,
            min_stack: config.min_stack,
            max_per_team: config.max_per_team,
            max_overlap: config.max_overlap,
            exposure_cap: config.exposure_cap,
        })
    }

    pub fn lineup_size(&self) -> usize {
        self.slots.len()
    }
}

// ---------------------------------------------------------------------------
// Diversity constraints
// ---------------------------------------------------------------------------

/// An immutable snapshot of the player sets already returned in this batch.
/// Each solve consumes one snapshot and produces the next via `with_lineup`,
/// so no solve ever mutates the constraints another solve is reading.
#[derive(Debug, Clone, Default)]
pub struct DiversityConstraints {
    prior: Vec<HashSet<String>>,
}

impl DiversityConstraints {
    pub fn new() -> Self {
        DiversityConstraints { prior: Vec::new() }
    }

    /// The next snapshot, extended with one more returned lineup.
    pub fn with_lineup(&self, player_ids: impl IntoIterator<Item = String>) -> Self {
        let mut next = self.clone();
        next.prior.push(player_ids.into_iter().collect());
        next
    }

    pub fn prior_lineups(&self) -> &[HashSet<String>] {
        &self.prior
    }

    pub fn is_empty(&self) -> bool {
        self.prior.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Exposure tracking
// ---------------------------------------------------------------------------

/// Counts how many returned lineups each player appears in. Players at the
/// cap are excluded from the pool for subsequent solves.
#[derive(Debug, Default)]
pub struct ExposureTracker {
    counts: HashMap<String, usize>,
}

impl ExposureTracker {
    pub fn new() -> Self {
        ExposureTracker {
            counts: HashMap::new(),
        }
    }

    pub fn record<'a>(&mut self, player_ids: impl IntoIterator<Item = &'a str>) {
        for id in player_ids {
            *self.counts.entry(id.to_string()).or_insert(0) += 1;
        }
    }

    pub fn count(&self, player_id: &str) -> usize {
        self.counts.get(player_id).copied().unwrap_or(0)
    }

    pub fn is_capped(&self, player_id: &str, cap: usize) -> bool {
        self.count(player_id) >= cap
    }

    /// The subset of the pool still under the exposure cap.
    pub fn available<'a>(&self, pool: &'a [SlatePlayer], cap: usize) -> Vec<&'a SlatePlayer> {
        pool.iter()
            .filter(|p| !self.is_capped(&p.player_id, cap))
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
