//! Gradient-boosted tree ensemble
//!
//! Shallow trees fit to residuals with shrinkage and per-round row
//! subsampling. Prediction is the base value plus the shrunken sum of
//! tree outputs.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

use crate::features::FeatureSchema;
use crate::models::tree::{RegressionTree, TreeParams};
use crate::models::{ModelTrainer, TrainedModel, GRADIENT_BOOSTING};
use crate::{BoostingConfig, CricError, Result};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoostedModel {
    base: f64,
    learning_rate: f64,
    trees: Vec<RegressionTree>,
}

impl BoostedModel {
    pub fn predict_one(&self, row: &[f64]) -> f64 {
        let boost: f64 = self.trees.iter().map(|t| t.predict(row)).sum();
        self.base + self.learning_rate * boost
    }

    pub fn n_rounds(&self) -> usize {
        self.trees.len()
    }
}

pub struct GradientBoostingTrainer {
    config: BoostingConfig,
    seed: u64,
}

impl GradientBoostingTrainer {
    pub fn new(config: BoostingConfig, seed: u64) -> Self {
        GradientBoostingTrainer { config, seed }
    }
}

impl ModelTrainer for GradientBoostingTrainer {
    fn model_type(&self) -> &'static str {
        GRADIENT_BOOSTING
    }

    fn fit(
        &self,
        features: &[Vec<f64>],
        targets: &[f64],
        _schema: &FeatureSchema,
    ) -> Result<TrainedModel> {
        if features.is_empty() {
            return Err(CricError::Training {
                model_type: GRADIENT_BOOSTING.to_string(),
                message: "empty training set".to_string(),
            });
        }

        let n = features.len();
        let base = targets.iter().sum::<f64>() / n as f64;
        let params = TreeParams {
            max_depth: self.config.max_depth,
            min_leaf: 1,
            feature_subsample: None,
        };
        let sample_size = ((n as f64 * self.config.subsample).round() as usize)
            .clamp(1, n);

        let mut predictions = vec![base; n];
        let mut residuals = vec![0.0; n];
        let mut trees = Vec::with_capacity(self.config.n_rounds);
        let mut all_rows: Vec<usize> = (0..n).collect();

        for round in 0..self.config.n_rounds {
            for i in 0..n {
                residuals[i] = targets[i] - predictions[i];
            }

            let mut rng = StdRng::seed_from_u64(self.seed.wrapping_add(round as u64));
            all_rows.shuffle(&mut rng);
            let rows = &all_rows[..sample_size];

            let tree = RegressionTree::fit(features, &residuals, rows, &params, &mut rng);
            for i in 0..n {
                predictions[i] += self.config.learning_rate * tree.predict(&features[i]);
            }
            trees.push(tree);
        }

        Ok(TrainedModel::GradientBoosting(BoostedModel {
            base,
            learning_rate: self.config.learning_rate,
            trees,
        }))
    }
}
