//! Artifact store
//!
//! One JSON file per artifact under the models directory, plus a small
//! manifest carrying the schema version and the label scale. Loading is
//! tolerant per file: an unreadable artifact or one trained against a
//! different schema version is skipped with a warning, never served.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use chrono::{DateTime, Utc};

use crate::models::TrainedModel;
use crate::registry::{ModelArtifact, RegistrySnapshot};
use crate::training::EvalMetrics;
use crate::{CricError, Result};

const MANIFEST_FILE: &str = "registry.json";

/// Persisted artifact layout; `serialized_model` is opaque to collaborators
#[derive(Debug, Serialize, Deserialize)]
struct PersistedArtifact {
    model_type: String,
    feature_schema_version: String,
    serialized_model: Vec<u8>,
    metrics: EvalMetrics,
    trained_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Manifest {
    schema_version: String,
    label_scale: f64,
}

/// Write every artifact of a snapshot plus the manifest
pub fn save<P: AsRef<Path>>(dir: P, snapshot: &RegistrySnapshot) -> Result<()> {
    let dir = dir.as_ref();
    fs::create_dir_all(dir)?;

    for artifact in snapshot.iter() {
        let persisted = PersistedArtifact {
            model_type: artifact.model_type.clone(),
            feature_schema_version: artifact.schema_version.clone(),
            serialized_model: artifact.model.to_bytes()?,
            metrics: artifact.metrics,
            trained_at: artifact.trained_at,
        };
        let path = dir.join(format!("{}.json", artifact.model_type));
        fs::write(&path, serde_json::to_vec(&persisted)?)?;
        log::info!("Saved {} artifact to {}", artifact.model_type, path.display());
    }

    let manifest = Manifest {
        schema_version: snapshot.schema_version().to_string(),
        label_scale: snapshot.label_scale(),
    };
    fs::write(dir.join(MANIFEST_FILE), serde_json::to_vec(&manifest)?)?;

    Ok(())
}

/// Load a snapshot back from disk. The whole store is rejected when its
/// manifest was written against a different schema version.
pub fn load<P: AsRef<Path>>(dir: P, active_schema_version: &str) -> Result<RegistrySnapshot> {
    let dir = dir.as_ref();
    let manifest_raw = fs::read(dir.join(MANIFEST_FILE))?;
    let manifest: Manifest = serde_json::from_slice(&manifest_raw)?;
    if manifest.schema_version != active_schema_version {
        return Err(CricError::SchemaMismatch {
            expected: active_schema_version.to_string(),
            found: manifest.schema_version,
        });
    }

    let mut artifacts = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        if name == MANIFEST_FILE || !name.ends_with(".json") {
            continue;
        }

        match read_artifact(&path, active_schema_version) {
            Ok(Some(artifact)) => artifacts.push(artifact),
            Ok(None) => {}
            Err(e) => log::warn!("Skipping unreadable artifact {}: {}", path.display(), e),
        }
    }

    RegistrySnapshot::build(artifacts, manifest.label_scale, active_schema_version)
}

fn read_artifact(path: &Path, active_schema_version: &str) -> Result<Option<ModelArtifact>> {
    let raw = fs::read(path)?;
    let persisted: PersistedArtifact = serde_json::from_slice(&raw)?;

    if persisted.feature_schema_version != active_schema_version {
        log::warn!(
            "Skipping {} artifact: schema version {} does not match active {}",
            persisted.model_type,
            persisted.feature_schema_version,
            active_schema_version
        );
        return Ok(None);
    }

    let model = TrainedModel::from_bytes(&persisted.model_type, &persisted.serialized_model)?;
    Ok(Some(ModelArtifact {
        model_type: persisted.model_type,
        schema_version: persisted.feature_schema_version,
        model,
        metrics: persisted.metrics,
        trained_at: persisted.trained_at,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::FeatureSchema;
    use crate::models::{AutoRegressiveTrainer, ModelTrainer, AUTO_REGRESSIVE};
    use crate::ArConfig;

    fn temp_dir(tag: &str) -> std::path::PathBuf {
        let dir = std::env::temp_dir().join(format!("cricnex-store-{}-{}", tag, std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        dir
    }

    fn make_snapshot(schema_version: &str) -> RegistrySnapshot {
        let schema = FeatureSchema::batting();
        let features: Vec<Vec<f64>> = (0..10)
            .map(|i| {
                let mut row = vec![0.0; schema.len()];
                row[4] = i as f64;
                row
            })
            .collect();
        let targets: Vec<f64> = (0..10).map(|i| i as f64 * 1.5).collect();
        let model = AutoRegressiveTrainer::new(ArConfig { min_matches: 100 })
            .fit(&features, &targets, &schema)
            .unwrap();

        let artifact = ModelArtifact {
            model_type: AUTO_REGRESSIVE.to_string(),
            schema_version: schema_version.to_string(),
            model,
            metrics: EvalMetrics {
                mae: 3.0,
                rmse: 4.0,
                r2: 0.7,
            },
            trained_at: Utc::now(),
        };
        RegistrySnapshot::build(vec![artifact], 12.0, schema_version).unwrap()
    }

    #[test]
    fn test_save_load_roundtrip() {
        let dir = temp_dir("roundtrip");
        let snapshot = make_snapshot("v1");
        save(&dir, &snapshot).unwrap();

        let loaded = load(&dir, "v1").unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded.default_name(), AUTO_REGRESSIVE);
        assert_eq!(loaded.label_scale(), 12.0);

        let artifact = loaded.get(AUTO_REGRESSIVE).unwrap();
        assert_eq!(artifact.metrics.rmse, 4.0);

        // Predictions survive the round trip
        let schema = FeatureSchema::batting();
        let mut probe = vec![0.0; schema.len()];
        probe[4] = 4.0;
        let original = snapshot.get(AUTO_REGRESSIVE).unwrap();
        assert!(
            (original.model.predict_one(&probe) - artifact.model.predict_one(&probe)).abs()
                < 1e-9
        );

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_load_rejects_stale_schema_version() {
        let dir = temp_dir("stale");
        let snapshot = make_snapshot("fs-old");
        save(&dir, &snapshot).unwrap();

        let result = load(&dir, "fs-new");
        assert!(matches!(result, Err(CricError::SchemaMismatch { .. })));

        let _ = fs::remove_dir_all(&dir);
    }
}
