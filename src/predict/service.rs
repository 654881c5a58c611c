//! Prediction service
//!
//! Validates a request, resolves the model (fails closed on a named but
//! absent model), computes the query feature row through the same engine
//! the models were trained on, and clamps the outputs to domain-valid
//! values. Every request reads one registry generation: the snapshot Arc
//! it cloned at entry.

use std::sync::Arc;

use crate::features::schema::STRIKE_RATE_LAST_5;
use crate::features::FeatureEngine;
use crate::registry::{ModelArtifact, ModelRegistry, ModelSummary};
use crate::{CricError, PredictionRequest, PredictionResult, Result};

pub struct PredictionService {
    engine: Arc<FeatureEngine>,
    registry: Arc<ModelRegistry>,
    strike_rate_slot: usize,
}

impl PredictionService {
    pub fn new(engine: Arc<FeatureEngine>, registry: Arc<ModelRegistry>) -> Result<Self> {
        let strike_rate_slot = engine
            .schema()
            .slot_index(STRIKE_RATE_LAST_5)
            .ok_or_else(|| {
                CricError::Config(format!("schema has no {} slot", STRIKE_RATE_LAST_5))
            })?;

        Ok(PredictionService {
            engine,
            registry,
            strike_rate_slot,
        })
    }

    /// Predict batting performance for one fixture
    pub fn predict(&self, request: &PredictionRequest) -> Result<PredictionResult> {
        validate(request)?;

        let snapshot = self.registry.snapshot()?;
        let artifact: Arc<ModelArtifact> = match &request.model_name {
            // Never silently substitute another model for a named one
            Some(name) => snapshot.get(name)?,
            None => snapshot.default_artifact(),
        };

        let row = self.engine.query_features(
            &request.player,
            &request.team,
            &request.opponent,
            &request.venue,
            &request.recent_form_overrides,
        );

        // A model extrapolating from weak recent form may go below zero;
        // negative runs and strike rates are domain-invalid.
        let predicted_runs = artifact.model.predict_one(&row).max(0.0);
        let predicted_strike_rate =
            estimate_strike_rate(row[self.strike_rate_slot], predicted_runs);
        let confidence = confidence_score(snapshot.label_scale(), artifact.metrics.rmse);

        Ok(PredictionResult {
            player: request.player.clone(),
            team: request.team.clone(),
            opponent: request.opponent.clone(),
            venue: request.venue.clone(),
            predicted_runs,
            predicted_strike_rate,
            confidence,
            model_used: artifact.model_type.clone(),
        })
    }

    /// Predict a batch; one item's failure never aborts the rest. Output
    /// order and cardinality match the input.
    pub fn predict_batch(&self, requests: &[PredictionRequest]) -> Vec<Result<PredictionResult>> {
        requests.iter().map(|r| self.predict(r)).collect()
    }

    /// Registered models with metrics, for model-selection display
    pub fn list_models(&self) -> Result<Vec<ModelSummary>> {
        Ok(self.registry.snapshot()?.summaries())
    }

    /// Version of the feature schema predictions are computed against
    pub fn feature_schema_version(&self) -> &str {
        self.engine.schema_version()
    }
}

fn validate(request: &PredictionRequest) -> Result<()> {
    let required = [
        ("player", &request.player),
        ("team", &request.team),
        ("opponent", &request.opponent),
        ("venue", &request.venue),
    ];
    for (field, value) in required {
        if value.trim().is_empty() {
            return Err(CricError::Validation(format!(
                "field '{}' must be non-empty",
                field
            )));
        }
    }
    Ok(())
}

/// Strike rate derived from the recent strike-rate signal, scaled by
/// predicted form: batters set for a big score tend to accelerate.
fn estimate_strike_rate(recent_strike_rate: f64, predicted_runs: f64) -> f64 {
    let factor = if predicted_runs > 50.0 {
        1.1
    } else if predicted_runs > 30.0 {
        1.0
    } else {
        0.9
    };
    (recent_strike_rate * factor).max(0.0)
}

/// 0-100 confidence, monotonically decreasing in held-out RMSE relative
/// to the observed scale of the runs label.
fn confidence_score(label_scale: f64, rmse: f64) -> f64 {
    let scale = if label_scale > 0.0 { label_scale } else { 1.0 };
    (100.0 * scale / (scale + rmse.max(0.0))).clamp(0.0, 100.0)
}
