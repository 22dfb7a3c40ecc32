// Scoring models: the trait every per-stat model implements, the linear
// model backing the default registry, and residual spread lookup.

use std::collections::BTreeMap;
use std::path::Path;

use serde::Deserialize;
use tracing::warn;

use crate::config::StatSigmas;
use crate::features::FeatureVector;
use crate::projection::ProjectionError;
use crate::store::{Position, Stat};

// ---------------------------------------------------------------------------
// ScoringModel trait
// ---------------------------------------------------------------------------

/// A point-estimate model for one stat. Implementations must be pure: the
/// same feature vector always yields the same prediction.
///
/// Callers verify `required_features` are present before calling `predict`;
/// `predict` itself treats an absent feature as an engine bug and reads it
/// as zero rather than panicking.
pub trait ScoringModel: Send + Sync {
    fn stat(&self) -> Stat;
    fn required_features(&self) -> &[String];
    fn predict(&self, features: &FeatureVector) -> f64;
}

// ---------------------------------------------------------------------------
// LinearModel
// ---------------------------------------------------------------------------

/// A linear model over named features: intercept + sum(weight * feature).
/// Weights come from an offline fit serialized as JSON, or from the built-in
/// fallback tables when no weight file exists for a stat.
#[derive(Debug, Clone)]
pub struct LinearModel {
    stat: Stat,
    intercept: f64,
    weights: BTreeMap<String, f64>,
    required: Vec<String>,
}

/// On-disk shape of a model weight file.
#[derive(Debug, Deserialize)]
struct WeightFile {
    stat: String,
    intercept: f64,
    weights: BTreeMap<String, f64>,
}

impl LinearModel {
    pub fn new(stat: Stat, intercept: f64, weights: BTreeMap<String, f64>) -> Self {
        let required = weights.keys().cloned().collect();
        LinearModel {
            stat,
            intercept,
            weights,
            required,
        }
    }

    /// Load a weight file like `models/passing_yards.json`.
    pub fn from_json_file(path: &Path) -> Result<Self, ProjectionError> {
        let text = std::fs::read_to_string(path).map_err(|source| ProjectionError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let file: WeightFile =
            serde_json::from_str(&text).map_err(|source| ProjectionError::Parse {
                path: path.display().to_string(),
                source,
            })?;
        let stat =
            Stat::from_str_stat(&file.stat).ok_or_else(|| ProjectionError::UnknownStat {
                path: path.display().to_string(),
                stat: file.stat.clone(),
            })?;
        Ok(LinearModel::new(stat, file.intercept, file.weights))
    }

    /// The fallback model for a stat, used when no weight file is present.
    ///
    /// Fantasy points use opportunity-volume weights (expected fantasy
    /// points from targets, carries, and red-zone usage); the yardage stats
    /// carry recent production forward.
    pub fn builtin(stat: Stat) -> Self {
        let (intercept, pairs): (f64, &[(&str, f64)]) = match stat {
            Stat::FantasyPoints => (
                0.0,
                &[
                    ("targets_ema", 1.5),
                    ("rush_attempts_ema", 0.6),
                    ("red_zone_targets_ema", 1.0),
                    ("red_zone_rush_attempts_ema", 1.5),
                ],
            ),
            Stat::PassingYards => (0.0, &[("passing_yards_ema", 1.0)]),
            Stat::RushingYards => (0.0, &[("rushing_yards_ema", 1.0)]),
            Stat::ReceivingYards => (0.0, &[("receiving_yards_ema", 1.0)]),
        };
        let weights = pairs
            .iter()
            .map(|(name, w)| (name.to_string(), *w))
            .collect();
        LinearModel::new(stat, intercept, weights)
    }

    /// Load `<stat>.json` from the models directory, falling back to the
    /// built-in weights when the file is absent or unreadable.
    pub fn load_or_builtin(models_dir: &Path, stat: Stat) -> Self {
        let path = models_dir.join(format!("{}.json", stat.column_name()));
        if !path.exists() {
            return LinearModel::builtin(stat);
        }
        match LinearModel::from_json_file(&path) {
            Ok(model) => model,
            Err(e) => {
                warn!("failed to load model weights {}: {e}; using built-in", path.display());
                LinearModel::builtin(stat)
            }
        }
    }
}

impl ScoringModel for LinearModel {
    fn stat(&self) -> Stat {
        self.stat
    }

    fn required_features(&self) -> &[String] {
        &self.required
    }

    fn predict(&self, features: &FeatureVector) -> f64 {
        let mut total = self.intercept;
        for (name, weight) in &self.weights {
            total += weight * features.get(name).unwrap_or(0.0);
        }
        total
    }
}

// ---------------------------------------------------------------------------
// Residual spread
// ---------------------------------------------------------------------------

/// Residual spread is never allowed to reach zero; a degenerate normal
/// breaks the probability math downstream.
pub const SIGMA_FLOOR: f64 = 1e-6;

/// Position adjustment on the per-stat residual spread. Volatile usage
/// profiles (boom-bust receivers) widen it, steady ones narrow it.
fn position_multiplier(position: Position) -> f64 {
    match position {
        Position::QB => 1.0,
        Position::RB => 0.95,
        Position::WR => 1.1,
        Position::TE => 0.9,
        Position::K => 0.8,
        Position::DST => 0.85,
    }
}

/// The residual standard deviation for one (stat, position) pair.
pub fn residual_sigma(sigmas: &StatSigmas, stat: Stat, position: Position) -> f64 {
    (sigmas.for_stat(stat) * position_multiplier(position)).max(SIGMA_FLOOR)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
