//! Bagged-tree ensemble
//!
//! Random forest regressor: bootstrap-sampled rows per tree, √d feature
//! subsampling per split, prediction by averaging.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::models::tree::{RegressionTree, TreeParams};
use crate::models::{ModelTrainer, TrainedModel, RANDOM_FOREST};
use crate::features::FeatureSchema;
use crate::{CricError, ForestConfig, Result};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForestModel {
    trees: Vec<RegressionTree>,
}

impl ForestModel {
    pub fn predict_one(&self, row: &[f64]) -> f64 {
        if self.trees.is_empty() {
            return 0.0;
        }
        self.trees.iter().map(|t| t.predict(row)).sum::<f64>() / self.trees.len() as f64
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }
}

pub struct RandomForestTrainer {
    config: ForestConfig,
    seed: u64,
}

impl RandomForestTrainer {
    pub fn new(config: ForestConfig, seed: u64) -> Self {
        RandomForestTrainer { config, seed }
    }
}

impl ModelTrainer for RandomForestTrainer {
    fn model_type(&self) -> &'static str {
        RANDOM_FOREST
    }

    fn fit(
        &self,
        features: &[Vec<f64>],
        targets: &[f64],
        _schema: &FeatureSchema,
    ) -> Result<TrainedModel> {
        if features.is_empty() {
            return Err(CricError::Training {
                model_type: RANDOM_FOREST.to_string(),
                message: "empty training set".to_string(),
            });
        }

        let n = features.len();
        let n_features = features[0].len();
        let subsample = (n_features as f64).sqrt().ceil() as usize;
        let params = TreeParams {
            max_depth: self.config.max_depth,
            min_leaf: self.config.min_leaf,
            feature_subsample: Some(subsample.max(1)),
        };

        let mut trees = Vec::with_capacity(self.config.n_trees);
        for t in 0..self.config.n_trees {
            let mut rng = StdRng::seed_from_u64(self.seed.wrapping_add(t as u64));
            let rows: Vec<usize> = (0..n).map(|_| rng.gen_range(0..n)).collect();
            trees.push(RegressionTree::fit(features, targets, &rows, &params, &mut rng));
        }

        Ok(TrainedModel::Forest(ForestModel { trees }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn linear_data(n: usize) -> (Vec<Vec<f64>>, Vec<f64>) {
        let x: Vec<Vec<f64>> = (0..n).map(|i| vec![i as f64, (n - i) as f64]).collect();
        let y: Vec<f64> = (0..n).map(|i| 2.0 * i as f64).collect();
        (x, y)
    }

    fn fit(seed: u64) -> TrainedModel {
        let (x, y) = linear_data(60);
        let config = ForestConfig {
            n_trees: 20,
            max_depth: 8,
            min_leaf: 2,
        };
        RandomForestTrainer::new(config, seed)
            .fit(&x, &y, &FeatureSchema::batting())
            .unwrap()
    }

    #[test]
    fn test_fits_monotone_target() {
        let model = fit(42);
        let low = model.predict_one(&[5.0, 55.0]);
        let high = model.predict_one(&[55.0, 5.0]);
        assert!(high > low);
    }

    #[test]
    fn test_deterministic_for_fixed_seed() {
        let a = fit(42).predict_one(&[30.0, 30.0]);
        let b = fit(42).predict_one(&[30.0, 30.0]);
        assert_eq!(a, b);
    }

    #[test]
    fn test_empty_training_set_errors() {
        let config = ForestConfig {
            n_trees: 5,
            max_depth: 4,
            min_leaf: 1,
        };
        let result =
            RandomForestTrainer::new(config, 1).fit(&[], &[], &FeatureSchema::batting());
        assert!(matches!(result, Err(CricError::Training { .. })));
    }
}
