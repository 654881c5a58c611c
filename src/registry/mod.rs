//! Model registry
//!
//! An immutable `RegistrySnapshot` holds every servable artifact plus the
//! default pointer (lowest held-out RMSE). `ModelRegistry` swaps whole
//! snapshots atomically: readers clone the current `Arc` and keep serving
//! from their generation even while a retraining run installs the next
//! one. A failed retraining run never reaches `install`, so the prior
//! generation stays live.

pub mod store;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::{Arc, PoisonError, RwLock};

use crate::models::TrainedModel;
use crate::training::EvalMetrics;
use crate::{CricError, Result};

/// A trained predictor with its evaluation metadata. Written once after
/// training, never mutated; retraining supersedes it with a new artifact.
#[derive(Debug, Clone)]
pub struct ModelArtifact {
    pub model_type: String,
    pub schema_version: String,
    pub model: TrainedModel,
    pub metrics: EvalMetrics,
    pub trained_at: DateTime<Utc>,
}

/// Listing entry for model-selection display
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelSummary {
    pub name: String,
    pub metrics: EvalMetrics,
    pub is_default: bool,
}

/// The complete, atomically-swappable set of servable artifacts
#[derive(Debug)]
pub struct RegistrySnapshot {
    artifacts: BTreeMap<String, Arc<ModelArtifact>>,
    default_name: String,
    label_scale: f64,
    schema_version: String,
}

impl RegistrySnapshot {
    /// Assemble a snapshot, refusing artifacts whose schema version does
    /// not match the active schema. An empty artifact set is an error:
    /// there would be nothing to serve.
    pub fn build(
        artifacts: Vec<ModelArtifact>,
        label_scale: f64,
        schema_version: &str,
    ) -> Result<Self> {
        let mut map = BTreeMap::new();
        for artifact in artifacts {
            if artifact.schema_version != schema_version {
                return Err(CricError::SchemaMismatch {
                    expected: schema_version.to_string(),
                    found: artifact.schema_version,
                });
            }
            map.insert(artifact.model_type.clone(), Arc::new(artifact));
        }

        let default_name = map
            .values()
            .min_by(|a, b| a.metrics.rmse.total_cmp(&b.metrics.rmse))
            .map(|a| a.model_type.clone())
            .ok_or(CricError::RegistryEmpty)?;

        Ok(RegistrySnapshot {
            artifacts: map,
            default_name,
            label_scale,
            schema_version: schema_version.to_string(),
        })
    }

    /// Look up an artifact by model type name
    pub fn get(&self, name: &str) -> Result<Arc<ModelArtifact>> {
        self.artifacts
            .get(name)
            .cloned()
            .ok_or_else(|| CricError::ModelNotFound(name.to_string()))
    }

    /// The artifact with the lowest held-out RMSE
    pub fn default_artifact(&self) -> Arc<ModelArtifact> {
        // Invariant: default_name always points at a present artifact
        self.artifacts[&self.default_name].clone()
    }

    pub fn default_name(&self) -> &str {
        &self.default_name
    }

    /// Observed scale of the runs label; confidence is judged against it
    pub fn label_scale(&self) -> f64 {
        self.label_scale
    }

    pub fn schema_version(&self) -> &str {
        &self.schema_version
    }

    pub fn len(&self) -> usize {
        self.artifacts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.artifacts.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<ModelArtifact>> {
        self.artifacts.values()
    }

    pub fn summaries(&self) -> Vec<ModelSummary> {
        self.artifacts
            .values()
            .map(|artifact| ModelSummary {
                name: artifact.model_type.clone(),
                metrics: artifact.metrics,
                is_default: artifact.model_type == self.default_name,
            })
            .collect()
    }
}

/// Holder of the current snapshot generation
#[derive(Debug, Default)]
pub struct ModelRegistry {
    current: RwLock<Option<Arc<RegistrySnapshot>>>,
}

impl ModelRegistry {
    pub fn new() -> Self {
        ModelRegistry {
            current: RwLock::new(None),
        }
    }

    pub fn with_snapshot(snapshot: RegistrySnapshot) -> Self {
        ModelRegistry {
            current: RwLock::new(Some(Arc::new(snapshot))),
        }
    }

    /// Replace the current generation in one store. In-flight readers
    /// keep the Arc they already cloned.
    pub fn install(&self, snapshot: RegistrySnapshot) {
        let mut guard = self
            .current
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        *guard = Some(Arc::new(snapshot));
    }

    /// The current generation, or RegistryEmpty before first training
    pub fn snapshot(&self) -> Result<Arc<RegistrySnapshot>> {
        let guard = self
            .current
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        guard.clone().ok_or(CricError::RegistryEmpty)
    }

    pub fn is_populated(&self) -> bool {
        self.snapshot().is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::FeatureSchema;
    use crate::models::{AutoRegressiveTrainer, ModelTrainer};
    use crate::ArConfig;

    fn make_artifact(name: &str, rmse: f64, schema_version: &str) -> ModelArtifact {
        let schema = FeatureSchema::batting();
        let features = vec![vec![0.0; schema.len()]; 6];
        let targets = vec![10.0, 12.0, 9.0, 11.0, 10.0, 13.0];
        let model = AutoRegressiveTrainer::new(ArConfig { min_matches: 100 })
            .fit(&features, &targets, &schema)
            .unwrap();

        ModelArtifact {
            model_type: name.to_string(),
            schema_version: schema_version.to_string(),
            model,
            metrics: EvalMetrics {
                mae: rmse * 0.8,
                rmse,
                r2: 0.5,
            },
            trained_at: Utc::now(),
        }
    }

    #[test]
    fn test_default_is_lowest_rmse() {
        let snapshot = RegistrySnapshot::build(
            vec![make_artifact("a", 20.0, "v1"), make_artifact("b", 10.0, "v1")],
            15.0,
            "v1",
        )
        .unwrap();
        assert_eq!(snapshot.default_name(), "b");
    }

    #[test]
    fn test_adding_worse_artifact_keeps_default() {
        let snapshot = RegistrySnapshot::build(
            vec![
                make_artifact("a", 20.0, "v1"),
                make_artifact("b", 10.0, "v1"),
                make_artifact("c", 30.0, "v1"),
            ],
            15.0,
            "v1",
        )
        .unwrap();
        assert_eq!(snapshot.default_name(), "b");

        let summaries = snapshot.summaries();
        assert_eq!(summaries.iter().filter(|s| s.is_default).count(), 1);
    }

    #[test]
    fn test_unregistered_name_is_not_found() {
        let snapshot =
            RegistrySnapshot::build(vec![make_artifact("gradient_boosting", 10.0, "v1")], 15.0, "v1")
                .unwrap();
        let result = snapshot.get("random_forest");
        assert!(matches!(result, Err(CricError::ModelNotFound(_))));
    }

    #[test]
    fn test_schema_mismatch_refused() {
        let result = RegistrySnapshot::build(
            vec![make_artifact("a", 10.0, "fs-old")],
            15.0,
            "fs-new",
        );
        assert!(matches!(result, Err(CricError::SchemaMismatch { .. })));
    }

    #[test]
    fn test_empty_snapshot_refused() {
        let result = RegistrySnapshot::build(vec![], 15.0, "v1");
        assert!(matches!(result, Err(CricError::RegistryEmpty)));
    }

    #[test]
    fn test_registry_swap_is_atomic_for_held_readers() {
        let registry = ModelRegistry::new();
        assert!(matches!(
            registry.snapshot(),
            Err(CricError::RegistryEmpty)
        ));

        registry.install(
            RegistrySnapshot::build(vec![make_artifact("a", 20.0, "v1")], 15.0, "v1").unwrap(),
        );
        let held = registry.snapshot().unwrap();

        registry.install(
            RegistrySnapshot::build(vec![make_artifact("b", 10.0, "v1")], 15.0, "v1").unwrap(),
        );

        // The reader that cloned before the swap still sees its generation
        assert_eq!(held.default_name(), "a");
        assert_eq!(registry.snapshot().unwrap().default_name(), "b");
    }
}
