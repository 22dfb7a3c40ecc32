// Projection: per-stat point estimates with residual spreads, built on the
// feature engine. The stat registry is closed; each stat maps to one model.

pub mod model;

use std::collections::BTreeMap;
use std::path::Path;

use thiserror::Error;

use crate::config::StatSigmas;
use crate::features::{FeatureEngine, FeatureError, FeatureVector};
use crate::store::{Position, Stat};

use model::{residual_sigma, LinearModel, ScoringModel};

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ProjectionError {
    #[error("missing required feature '{feature}' for {stat:?} projection")]
    MissingFeature { stat: Stat, feature: String },

    #[error("no model registered for {0:?}")]
    NoModel(Stat),

    #[error("failed to read model weights {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("invalid model weight file {path}: {source}")]
    Parse {
        path: String,
        source: serde_json::Error,
    },

    #[error("model weight file {path} declares unknown stat '{stat}'")]
    UnknownStat { path: String, stat: String },

    #[error(transparent)]
    Feature(#[from] FeatureError),
}

// ---------------------------------------------------------------------------
// Projection
// ---------------------------------------------------------------------------

/// A projected distribution for one (player, stat, week): the model's point
/// estimate plus the residual spread used for probability math downstream.
#[derive(Debug, Clone)]
pub struct Projection {
    pub player_id: String,
    pub name: String,
    pub position: Position,
    pub team: String,
    pub season: u16,
    pub week: u8,
    pub stat: Stat,
    pub mean: f64,
    pub sigma: f64,
}

// ---------------------------------------------------------------------------
// ProjectionEngine
// ---------------------------------------------------------------------------

/// The four stats every engine carries a model for.
pub const PROJECTED_STATS: [Stat; 4] = [
    Stat::FantasyPoints,
    Stat::PassingYards,
    Stat::RushingYards,
    Stat::ReceivingYards,
];

pub struct ProjectionEngine<'a> {
    features: &'a FeatureEngine<'a>,
    sigmas: &'a StatSigmas,
    window: usize,
    models: BTreeMap<&'static str, Box<dyn ScoringModel>>,
}

impl<'a> ProjectionEngine<'a> {
    /// Engine with the built-in model for every stat.
    pub fn new(features: &'a FeatureEngine<'a>, sigmas: &'a StatSigmas, window: usize) -> Self {
        let mut engine = ProjectionEngine {
            features,
            sigmas,
            window,
            models: BTreeMap::new(),
        };
        for stat in PROJECTED_STATS {
            engine.register(Box::new(LinearModel::builtin(stat)));
        }
        engine
    }

    /// Engine that prefers fitted weight files from `models_dir`, one JSON
    /// file per stat, with built-in fallbacks for stats without a file.
    pub fn with_models_dir(
        features: &'a FeatureEngine<'a>,
        sigmas: &'a StatSigmas,
        window: usize,
        models_dir: &Path,
    ) -> Self {
        let mut engine = ProjectionEngine {
            features,
            sigmas,
            window,
            models: BTreeMap::new(),
        };
        for stat in PROJECTED_STATS {
            engine.register(Box::new(LinearModel::load_or_builtin(models_dir, stat)));
        }
        engine
    }

    /// Replace the model for a stat. The registry stays closed: only the
    /// four projected stats have keys.
    pub fn register(&mut self, model: Box<dyn ScoringModel>) {
        self.models.insert(model.stat().column_name(), model);
    }

    /// Project one stat from an already-computed feature vector.
    pub fn project_from_features(
        &self,
        features: &FeatureVector,
        stat: Stat,
    ) -> Result<Projection, ProjectionError> {
        let model = self
            .models
            .get(stat.column_name())
            .ok_or(ProjectionError::NoModel(stat))?;

        for feature in model.required_features() {
            if features.get(feature).is_none() {
                return Err(ProjectionError::MissingFeature {
                    stat,
                    feature: feature.clone(),
                });
            }
        }

        Ok(Projection {
            player_id: features.player_id.clone(),
            name: features.name.clone(),
            position: features.position,
            team: features.team.clone(),
            season: features.season,
            week: features.week,
            stat,
            mean: model.predict(features),
            sigma: residual_sigma(self.sigmas, stat, features.position),
        })
    }

    /// Project one (player, stat).
    pub fn project(
        &self,
        player_id: &str,
        season: u16,
        week: u8,
        stat: Stat,
    ) -> Result<Projection, ProjectionError> {
        let fv = self
            .features
            .compute_features(player_id, season, week, self.window)?;
        self.project_from_features(&fv, stat)
    }

    /// Project several stats for several players. Features are computed
    /// once per player and shared across all requested stats.
    pub fn project_batch(
        &self,
        player_ids: &[String],
        season: u16,
        week: u8,
        stats: &[Stat],
    ) -> Result<Vec<Projection>, ProjectionError> {
        let mut out = Vec::with_capacity(player_ids.len() * stats.len());
        for player_id in player_ids {
            let fv = self
                .features
                .compute_features(player_id, season, week, self.window)?;
            for &stat in stats {
                out.push(self.project_from_features(&fv, stat)?);
            }
        }
        Ok(out)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
