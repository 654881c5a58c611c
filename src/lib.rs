//! Cricket player performance prediction
//!
//! Turns a ball-by-ball IPL corpus into per-player-match features, trains
//! several competing regression models on them, and serves single-fixture
//! predictions through the exact same feature computation used in training.

pub mod data;
pub mod features;
pub mod models;
pub mod predict;
pub mod registry;
pub mod training;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

/// One delivery (ball bowled), as ingested from the deliveries file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliveryRecord {
    pub match_id: i64,
    pub inning: u8,
    pub batting_team: String,
    pub bowling_team: String,
    pub over: u16,
    pub ball: u16,
    pub batter: String,
    pub bowler: String,
    /// Runs off the bat (excludes extras)
    pub runs_off_bat: u32,
    pub extras: u32,
    pub is_wide: bool,
    pub is_no_ball: bool,
    pub wicket: bool,
}

impl DeliveryRecord {
    /// Wides and no-balls do not count as balls faced by the batter
    pub fn is_valid_ball(&self) -> bool {
        !self.is_wide && !self.is_no_ball
    }
}

/// One match, as ingested from the matches file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchInfo {
    pub id: i64,
    pub date: NaiveDate,
    pub season: Option<i32>,
    pub city: Option<String>,
    pub venue: Option<String>,
    pub team1: String,
    pub team2: String,
    pub winner: Option<String>,
}

/// Aggregated batting line for one player in one match.
///
/// Produced by the record merger; the unit of feature computation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerMatchStat {
    pub match_id: i64,
    pub player: String,
    pub team: String,
    pub opponent: String,
    pub venue: String,
    pub date: NaiveDate,
    pub runs: f64,
    pub balls_faced: u32,
    pub strike_rate: f64,
    /// 1-based order of first appearance in the innings, capped at 11
    pub batting_position: u8,
}

/// A single prediction request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictionRequest {
    pub player: String,
    pub team: String,
    pub opponent: String,
    pub venue: String,
    /// Registered model to use; registry default when absent
    #[serde(default)]
    pub model_name: Option<String>,
    /// Overrides for numeric feature slots, keyed by slot name.
    /// Unknown keys are ignored.
    #[serde(default)]
    pub recent_form_overrides: BTreeMap<String, f64>,
}

impl PredictionRequest {
    pub fn new(player: &str, team: &str, opponent: &str, venue: &str) -> Self {
        PredictionRequest {
            player: player.to_string(),
            team: team.to_string(),
            opponent: opponent.to_string(),
            venue: venue.to_string(),
            model_name: None,
            recent_form_overrides: BTreeMap::new(),
        }
    }
}

/// A single prediction result
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictionResult {
    pub player: String,
    pub team: String,
    pub opponent: String,
    pub venue: String,
    pub predicted_runs: f64,
    pub predicted_strike_rate: f64,
    /// 0-100, monotonically decreasing in the model's held-out RMSE
    pub confidence: f64,
    pub model_used: String,
}

/// Application-wide errors
#[derive(Debug, Error)]
pub enum CricError {
    #[error("event references unknown match id {0}")]
    DataIntegrity(i64),

    #[error("invalid request: {0}")]
    Validation(String),

    #[error("model '{0}' is not registered")]
    ModelNotFound(String),

    #[error("training {model_type} failed: {message}")]
    Training { model_type: String, message: String },

    #[error("registry has no trained models")]
    RegistryEmpty,

    #[error("artifact schema version {found} does not match active schema {expected}")]
    SchemaMismatch { expected: String, found: String },

    #[error("configuration error: {0}")]
    Config(String),

    #[error("parse error: {0}")]
    Parse(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, CricError>;

/// Application configuration loaded from config.toml
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub data: DataConfig,
    pub training: TrainingConfig,
    pub models: ModelsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataConfig {
    pub deliveries_path: String,
    pub matches_path: String,
    pub models_dir: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingConfig {
    /// Held-out fraction of the feature table
    pub test_fraction: f64,
    pub split: SplitStrategy,
    pub seed: u64,
}

/// How the feature table is partitioned into train and held-out sets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SplitStrategy {
    /// Oldest rows train, newest rows evaluate
    Chronological,
    /// Seeded shuffle
    Random,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelsConfig {
    pub forest: ForestConfig,
    pub boosting: BoostingConfig,
    pub mlp: MlpConfig,
    pub auto_regressive: ArConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForestConfig {
    pub n_trees: usize,
    pub max_depth: usize,
    pub min_leaf: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoostingConfig {
    pub n_rounds: usize,
    pub learning_rate: f64,
    pub max_depth: usize,
    /// Row fraction sampled per boosting round
    pub subsample: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MlpConfig {
    pub hidden_dims: Vec<usize>,
    pub epochs: usize,
    pub learning_rate: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArConfig {
    /// Minimum career matches for a player-specific fit
    pub min_matches: usize,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            data: DataConfig {
                deliveries_path: "data/deliveries.csv".to_string(),
                matches_path: "data/matches.csv".to_string(),
                models_dir: "models".to_string(),
            },
            training: TrainingConfig {
                test_fraction: 0.2,
                split: SplitStrategy::Chronological,
                seed: 42,
            },
            models: ModelsConfig {
                forest: ForestConfig {
                    n_trees: 100,
                    max_depth: 20,
                    min_leaf: 4,
                },
                boosting: BoostingConfig {
                    n_rounds: 100,
                    learning_rate: 0.1,
                    max_depth: 6,
                    subsample: 0.8,
                },
                mlp: MlpConfig {
                    hidden_dims: vec![64, 32],
                    epochs: 300,
                    learning_rate: 1e-2,
                },
                auto_regressive: ArConfig { min_matches: 20 },
            },
        }
    }
}

impl Config {
    pub fn load(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            CricError::Config(format!("Failed to read config file {}: {}", path, e))
        })?;
        toml::from_str(&content)
            .map_err(|e| CricError::Config(format!("Failed to parse config: {}", e)))
    }

    pub fn save(&self, path: &str) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| CricError::Config(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(path, content)?;
        Ok(())
    }
}
