//! Model variants
//!
//! Every variant satisfies one capability: fit labeled feature rows into a
//! `TrainedModel` that predicts a single row. The training harness and the
//! prediction service never special-case a variant; adding a model type
//! means implementing `ModelTrainer` and extending the enum.

pub mod auto_regressive;
pub mod boosting;
pub mod forest;
pub mod tree;
pub mod window_mlp;

use crate::features::FeatureSchema;
use crate::{CricError, ModelsConfig, Result};

pub use auto_regressive::AutoRegressiveTrainer;
pub use boosting::GradientBoostingTrainer;
pub use forest::RandomForestTrainer;
pub use window_mlp::WindowMlpTrainer;

pub const RANDOM_FOREST: &str = "random_forest";
pub const GRADIENT_BOOSTING: &str = "gradient_boosting";
pub const WINDOW_MLP: &str = "window_mlp";
pub const AUTO_REGRESSIVE: &str = "auto_regressive";

/// Capability every model variant implements
pub trait ModelTrainer {
    fn model_type(&self) -> &'static str;

    /// Fit on the training rows. A variant that cannot converge returns a
    /// `CricError::Training`; the harness isolates it from the other
    /// variants.
    fn fit(
        &self,
        features: &[Vec<f64>],
        targets: &[f64],
        schema: &FeatureSchema,
    ) -> Result<TrainedModel>;
}

/// A trained predictor of any variant
#[derive(Debug, Clone)]
pub enum TrainedModel {
    Forest(forest::ForestModel),
    GradientBoosting(boosting::BoostedModel),
    WindowMlp(window_mlp::MlpModel),
    AutoRegressive(auto_regressive::ArModel),
}

impl TrainedModel {
    pub fn model_type(&self) -> &'static str {
        match self {
            TrainedModel::Forest(_) => RANDOM_FOREST,
            TrainedModel::GradientBoosting(_) => GRADIENT_BOOSTING,
            TrainedModel::WindowMlp(_) => WINDOW_MLP,
            TrainedModel::AutoRegressive(_) => AUTO_REGRESSIVE,
        }
    }

    /// Predict the runs label for one feature row
    pub fn predict_one(&self, row: &[f64]) -> f64 {
        match self {
            TrainedModel::Forest(m) => m.predict_one(row),
            TrainedModel::GradientBoosting(m) => m.predict_one(row),
            TrainedModel::WindowMlp(m) => m.predict_one(row),
            TrainedModel::AutoRegressive(m) => m.predict_one(row),
        }
    }

    /// Opaque serialized form for the artifact store
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        match self {
            TrainedModel::Forest(m) => Ok(serde_json::to_vec(m)?),
            TrainedModel::GradientBoosting(m) => Ok(serde_json::to_vec(m)?),
            TrainedModel::WindowMlp(m) => m.to_bytes(),
            TrainedModel::AutoRegressive(m) => Ok(serde_json::to_vec(m)?),
        }
    }

    /// Rebuild a model from its persisted bytes
    pub fn from_bytes(model_type: &str, bytes: &[u8]) -> Result<TrainedModel> {
        match model_type {
            RANDOM_FOREST => Ok(TrainedModel::Forest(serde_json::from_slice(bytes)?)),
            GRADIENT_BOOSTING => Ok(TrainedModel::GradientBoosting(serde_json::from_slice(
                bytes,
            )?)),
            WINDOW_MLP => Ok(TrainedModel::WindowMlp(window_mlp::MlpModel::from_bytes(
                bytes,
            )?)),
            AUTO_REGRESSIVE => Ok(TrainedModel::AutoRegressive(serde_json::from_slice(bytes)?)),
            other => Err(CricError::Parse(format!("unknown model type '{}'", other))),
        }
    }
}

/// The configured set of trainers, in registration order
pub fn default_trainers(config: &ModelsConfig, seed: u64) -> Vec<Box<dyn ModelTrainer>> {
    vec![
        Box::new(RandomForestTrainer::new(config.forest.clone(), seed)),
        Box::new(GradientBoostingTrainer::new(config.boosting.clone(), seed)),
        Box::new(WindowMlpTrainer::new(config.mlp.clone(), seed)),
        Box::new(AutoRegressiveTrainer::new(config.auto_regressive.clone())),
    ]
}
