//! Autoregressive recent-form model
//!
//! Classical time-series baseline: regresses a player's match runs on
//! their rolling recent-form signal. Players with enough career volume get
//! their own least-squares fit; everyone else shares a global fit. The
//! per-player table is keyed by the schema's player code, so the model
//! works from a feature row alone.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::features::schema::{FeatureSchema, PLAYER_CODE, RUNS_LAST_5_AVG};
use crate::models::{ModelTrainer, TrainedModel, AUTO_REGRESSIVE};
use crate::{ArConfig, CricError, Result};

/// One least-squares line: runs = intercept + slope * recent_form
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct LinearFit {
    pub intercept: f64,
    pub slope: f64,
}

impl LinearFit {
    fn predict(&self, form: f64) -> f64 {
        self.intercept + self.slope * form
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArModel {
    form_slot: usize,
    player_slot: usize,
    global: LinearFit,
    /// Player code -> player-specific fit (high-volume players only)
    players: HashMap<i64, LinearFit>,
}

impl ArModel {
    pub fn predict_one(&self, row: &[f64]) -> f64 {
        let form = row[self.form_slot];
        let code = row[self.player_slot] as i64;
        self.players
            .get(&code)
            .unwrap_or(&self.global)
            .predict(form)
    }

    pub fn player_fits(&self) -> usize {
        self.players.len()
    }
}

pub struct AutoRegressiveTrainer {
    config: ArConfig,
}

impl AutoRegressiveTrainer {
    pub fn new(config: ArConfig) -> Self {
        AutoRegressiveTrainer { config }
    }
}

impl ModelTrainer for AutoRegressiveTrainer {
    fn model_type(&self) -> &'static str {
        AUTO_REGRESSIVE
    }

    fn fit(
        &self,
        features: &[Vec<f64>],
        targets: &[f64],
        schema: &FeatureSchema,
    ) -> Result<TrainedModel> {
        if features.is_empty() {
            return Err(CricError::Training {
                model_type: AUTO_REGRESSIVE.to_string(),
                message: "empty training set".to_string(),
            });
        }
        let form_slot = schema.slot_index(RUNS_LAST_5_AVG).ok_or_else(|| {
            CricError::Training {
                model_type: AUTO_REGRESSIVE.to_string(),
                message: format!("schema has no {} slot", RUNS_LAST_5_AVG),
            }
        })?;
        let player_slot = schema.slot_index(PLAYER_CODE).ok_or_else(|| {
            CricError::Training {
                model_type: AUTO_REGRESSIVE.to_string(),
                message: format!("schema has no {} slot", PLAYER_CODE),
            }
        })?;

        let pairs: Vec<(f64, f64)> = features
            .iter()
            .zip(targets.iter())
            .map(|(row, &y)| (row[form_slot], y))
            .collect();
        let global = least_squares(&pairs);

        // Group observations by player code; only high-volume players get
        // their own line.
        let mut by_player: HashMap<i64, Vec<(f64, f64)>> = HashMap::new();
        for (row, &y) in features.iter().zip(targets.iter()) {
            by_player
                .entry(row[player_slot] as i64)
                .or_default()
                .push((row[form_slot], y));
        }

        let players: HashMap<i64, LinearFit> = by_player
            .into_iter()
            .filter(|(_, obs)| obs.len() >= self.config.min_matches)
            .map(|(code, obs)| (code, least_squares(&obs)))
            .collect();

        log::info!(
            "Autoregressive model: {} player-specific fits, global fallback for the rest",
            players.len()
        );

        Ok(TrainedModel::AutoRegressive(ArModel {
            form_slot,
            player_slot,
            global,
            players,
        }))
    }
}

/// Ordinary least squares; degenerate inputs collapse to a mean predictor
fn least_squares(pairs: &[(f64, f64)]) -> LinearFit {
    let n = pairs.len() as f64;
    if pairs.is_empty() {
        return LinearFit {
            intercept: 0.0,
            slope: 0.0,
        };
    }
    let mean_x = pairs.iter().map(|p| p.0).sum::<f64>() / n;
    let mean_y = pairs.iter().map(|p| p.1).sum::<f64>() / n;

    let mut cov = 0.0;
    let mut var = 0.0;
    for (x, y) in pairs {
        cov += (x - mean_x) * (y - mean_y);
        var += (x - mean_x) * (x - mean_x);
    }

    if var < 1e-12 {
        return LinearFit {
            intercept: mean_y,
            slope: 0.0,
        };
    }
    let slope = cov / var;
    LinearFit {
        intercept: mean_y - slope * mean_x,
        slope,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::schema::FeatureSchema;

    /// Rows with only the slots the model reads populated
    fn make_row(schema: &FeatureSchema, player_code: f64, form: f64) -> Vec<f64> {
        let mut row = vec![0.0; schema.len()];
        row[schema.slot_index(PLAYER_CODE).unwrap()] = player_code;
        row[schema.slot_index(RUNS_LAST_5_AVG).unwrap()] = form;
        row
    }

    #[test]
    fn test_high_volume_player_gets_own_fit() {
        let schema = FeatureSchema::batting();
        let mut features = Vec::new();
        let mut targets = Vec::new();

        // Player 1: 25 matches, runs track form exactly
        for i in 0..25 {
            features.push(make_row(&schema, 1.0, i as f64));
            targets.push(i as f64);
        }
        // Player 2: 3 matches, runs are constant
        for _ in 0..3 {
            features.push(make_row(&schema, 2.0, 10.0));
            targets.push(50.0);
        }

        let trainer = AutoRegressiveTrainer::new(ArConfig { min_matches: 20 });
        let model = trainer.fit(&features, &targets, &schema).unwrap();
        let TrainedModel::AutoRegressive(ar) = &model else {
            panic!("wrong variant");
        };
        assert_eq!(ar.player_fits(), 1);

        // Player 1 follows its own line
        let p1 = model.predict_one(&make_row(&schema, 1.0, 12.0));
        assert!((p1 - 12.0).abs() < 1e-6);
    }

    #[test]
    fn test_low_volume_player_uses_global_fit() {
        let schema = FeatureSchema::batting();
        let mut features = Vec::new();
        let mut targets = Vec::new();
        for i in 0..10 {
            features.push(make_row(&schema, (i % 5) as f64, i as f64));
            targets.push(2.0 * i as f64);
        }

        let trainer = AutoRegressiveTrainer::new(ArConfig { min_matches: 20 });
        let model = trainer.fit(&features, &targets, &schema).unwrap();

        // Global fit is y = 2x; an unseen player rides it
        let pred = model.predict_one(&make_row(&schema, 99.0, 4.0));
        assert!((pred - 8.0).abs() < 1e-6);
    }

    #[test]
    fn test_degenerate_form_collapses_to_mean() {
        let fit = least_squares(&[(5.0, 10.0), (5.0, 20.0)]);
        assert_eq!(fit.slope, 0.0);
        assert_eq!(fit.intercept, 15.0);
    }
}
