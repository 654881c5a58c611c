//! Training and evaluation harness
//!
//! Partitions the labeled feature table 80/20, fits each configured model
//! type on the training part, and scores it on the held-out part. A model
//! whose fit fails is logged and excluded; the run continues and the
//! survivors form the new registry snapshot.

use chrono::Utc;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use crate::features::{FeatureEngine, FeatureSchema, LabeledRow};
use crate::models::{default_trainers, ModelTrainer};
use crate::registry::{ModelArtifact, RegistrySnapshot};
use crate::training::metrics::{label_std, EvalMetrics};
use crate::{Config, CricError, PlayerMatchStat, Result, SplitStrategy};

/// Fewest rows a meaningful split needs
const MIN_ROWS: usize = 5;

/// Offline entry point: build the feature engine over the merged table,
/// train the configured model set, and return both. The engine and the
/// snapshot share one schema version by construction.
pub fn train_from_corpus(
    stats: &[PlayerMatchStat],
    config: &Config,
) -> Result<(FeatureEngine, RegistrySnapshot)> {
    let (engine, rows) = FeatureEngine::fit(stats);
    let snapshot = train_all(&rows, engine.schema(), config)?;
    Ok((engine, snapshot))
}

/// Train the configured model set and assemble a registry snapshot.
pub fn train_all(
    rows: &[LabeledRow],
    schema: &FeatureSchema,
    config: &Config,
) -> Result<RegistrySnapshot> {
    let trainers = default_trainers(&config.models, config.training.seed);
    train_with(rows, schema, config, &trainers)
}

/// Train an explicit set of model trainers. Exposed separately so a
/// caller (or a test) can run a reduced or extended variant set.
pub fn train_with(
    rows: &[LabeledRow],
    schema: &FeatureSchema,
    config: &Config,
    trainers: &[Box<dyn ModelTrainer>],
) -> Result<RegistrySnapshot> {
    if rows.len() < MIN_ROWS {
        return Err(CricError::Training {
            model_type: "harness".to_string(),
            message: format!("need at least {} feature rows, have {}", MIN_ROWS, rows.len()),
        });
    }

    let (train_idx, test_idx) = split_indices(rows.len(), config);
    let features_train: Vec<Vec<f64>> =
        train_idx.iter().map(|&i| rows[i].features.clone()).collect();
    let targets_train: Vec<f64> = train_idx.iter().map(|&i| rows[i].runs).collect();
    let features_test: Vec<Vec<f64>> =
        test_idx.iter().map(|&i| rows[i].features.clone()).collect();
    let targets_test: Vec<f64> = test_idx.iter().map(|&i| rows[i].runs).collect();

    log::info!(
        "Training on {} rows, evaluating on {} held-out rows",
        features_train.len(),
        features_test.len()
    );

    let mut artifacts = Vec::new();
    for trainer in trainers {
        let name = trainer.model_type();
        log::info!("Training {}...", name);

        match trainer.fit(&features_train, &targets_train, schema) {
            Ok(model) => {
                let predictions: Vec<f64> = features_test
                    .iter()
                    .map(|row| model.predict_one(row))
                    .collect();
                let metrics = EvalMetrics::compute(&predictions, &targets_test);
                log::info!("{}: {}", name, metrics);

                artifacts.push(ModelArtifact {
                    model_type: name.to_string(),
                    schema_version: schema.version().to_string(),
                    model,
                    metrics,
                    trained_at: Utc::now(),
                });
            }
            Err(e) => {
                log::warn!("Excluding {} from this run: {}", name, e);
            }
        }
    }

    let mut scale = label_std(&targets_test);
    if scale <= 0.0 {
        scale = label_std(&targets_train);
    }

    RegistrySnapshot::build(artifacts, scale, schema.version())
}

/// 80/20 partition of row indices, chronological or seeded-random.
/// Rows arrive in chronological order, so the chronological split is a
/// plain prefix/suffix cut.
fn split_indices(n: usize, config: &Config) -> (Vec<usize>, Vec<usize>) {
    let test_len = ((n as f64) * config.training.test_fraction).round() as usize;
    let test_len = test_len.clamp(1, n - 1);

    match config.training.split {
        SplitStrategy::Chronological => {
            let cut = n - test_len;
            ((0..cut).collect(), (cut..n).collect())
        }
        SplitStrategy::Random => {
            let mut indices: Vec<usize> = (0..n).collect();
            let mut rng = StdRng::seed_from_u64(config.training.seed);
            indices.shuffle(&mut rng);
            let test = indices.split_off(n - test_len);
            (indices, test)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TrainedModel;
    use crate::models::{AUTO_REGRESSIVE, GRADIENT_BOOSTING, RANDOM_FOREST};
    use crate::models::{AutoRegressiveTrainer, GradientBoostingTrainer, RandomForestTrainer};
    use crate::{ArConfig, Config};

    /// A trainer that always fails, standing in for a non-converging model
    struct FailingTrainer;

    impl ModelTrainer for FailingTrainer {
        fn model_type(&self) -> &'static str {
            "failing"
        }

        fn fit(
            &self,
            _features: &[Vec<f64>],
            _targets: &[f64],
            _schema: &FeatureSchema,
        ) -> Result<TrainedModel> {
            Err(CricError::Training {
                model_type: "failing".to_string(),
                message: "did not converge".to_string(),
            })
        }
    }

    fn sample_rows(n: usize) -> Vec<LabeledRow> {
        let schema = FeatureSchema::batting();
        (0..n)
            .map(|i| {
                let mut features = vec![0.0; schema.len()];
                features[0] = (i % 7) as f64 + 1.0;
                features[4] = i as f64; // runs_last_5_avg
                LabeledRow {
                    features,
                    runs: i as f64 + 2.0,
                    strike_rate: 100.0,
                    match_id: i as i64,
                    player: format!("P{}", i % 7),
                }
            })
            .collect()
    }

    fn fast_trainers(config: &Config) -> Vec<Box<dyn ModelTrainer>> {
        vec![
            Box::new(RandomForestTrainer::new(
                crate::ForestConfig {
                    n_trees: 10,
                    max_depth: 6,
                    min_leaf: 2,
                },
                config.training.seed,
            )),
            Box::new(GradientBoostingTrainer::new(
                crate::BoostingConfig {
                    n_rounds: 20,
                    learning_rate: 0.2,
                    max_depth: 3,
                    subsample: 1.0,
                },
                config.training.seed,
            )),
            Box::new(AutoRegressiveTrainer::new(ArConfig { min_matches: 100 })),
        ]
    }

    #[test]
    fn test_trains_and_selects_lowest_rmse_default() {
        let config = Config::default();
        let rows = sample_rows(100);
        let schema = FeatureSchema::batting();

        let snapshot = train_with(&rows, &schema, &config, &fast_trainers(&config)).unwrap();
        assert_eq!(snapshot.len(), 3);

        let default_rmse = snapshot.default_artifact().metrics.rmse;
        for summary in snapshot.summaries() {
            assert!(default_rmse <= summary.metrics.rmse);
        }
    }

    #[test]
    fn test_failing_model_excluded_but_run_continues() {
        let config = Config::default();
        let rows = sample_rows(100);
        let schema = FeatureSchema::batting();

        let mut trainers = fast_trainers(&config);
        trainers.push(Box::new(FailingTrainer));

        let snapshot = train_with(&rows, &schema, &config, &trainers).unwrap();
        let names: Vec<String> = snapshot
            .summaries()
            .into_iter()
            .map(|s| s.name)
            .collect();
        assert!(names.contains(&RANDOM_FOREST.to_string()));
        assert!(names.contains(&GRADIENT_BOOSTING.to_string()));
        assert!(names.contains(&AUTO_REGRESSIVE.to_string()));
        assert!(!names.contains(&"failing".to_string()));
    }

    #[test]
    fn test_all_models_failing_yields_registry_empty() {
        let config = Config::default();
        let rows = sample_rows(20);
        let schema = FeatureSchema::batting();

        let trainers: Vec<Box<dyn ModelTrainer>> = vec![Box::new(FailingTrainer)];
        let result = train_with(&rows, &schema, &config, &trainers);
        assert!(matches!(result, Err(CricError::RegistryEmpty)));
    }

    #[test]
    fn test_too_few_rows_rejected() {
        let config = Config::default();
        let rows = sample_rows(2);
        let schema = FeatureSchema::batting();
        let result = train_with(&rows, &schema, &config, &fast_trainers(&config));
        assert!(matches!(result, Err(CricError::Training { .. })));
    }

    #[test]
    fn test_train_from_corpus_end_to_end() {
        let mut config = Config::default();
        // Keep the test quick
        config.models.forest.n_trees = 10;
        config.models.boosting.n_rounds = 10;
        config.models.mlp.epochs = 30;

        let corpus: Vec<PlayerMatchStat> = (0..60)
            .map(|i| PlayerMatchStat {
                match_id: i,
                player: format!("P{}", i % 6),
                team: "Alpha".to_string(),
                opponent: "Beta".to_string(),
                venue: "Ground".to_string(),
                date: chrono::NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()
                    + chrono::Duration::days(i),
                runs: (i % 40) as f64,
                balls_faced: 20,
                strike_rate: 100.0,
                batting_position: 3,
            })
            .collect();

        let (engine, snapshot) = train_from_corpus(&corpus, &config).unwrap();
        assert_eq!(snapshot.schema_version(), engine.schema_version());
        // All four variants trained and registered
        assert_eq!(snapshot.len(), 4);
    }

    #[test]
    fn test_split_strategies_cover_all_rows() {
        let mut config = Config::default();
        let (train, test) = split_indices(100, &config);
        assert_eq!(train.len(), 80);
        assert_eq!(test.len(), 20);
        // Chronological: held-out rows are the newest
        assert!(test.iter().all(|&i| i >= 80));

        config.training.split = SplitStrategy::Random;
        let (train, test) = split_indices(100, &config);
        assert_eq!(train.len() + test.len(), 100);
        let mut all: Vec<usize> = train.iter().chain(test.iter()).copied().collect();
        all.sort();
        assert_eq!(all, (0..100).collect::<Vec<_>>());
    }
}
