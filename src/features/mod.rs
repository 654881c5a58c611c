//! Feature engineering
//!
//! Converts merged batting lines into model-ready feature rows, and
//! reproduces the same computation for single serving-time queries.

pub mod encoding;
pub mod engine;
pub mod history;
pub mod schema;

pub use encoding::{CategoryEncoder, UNKNOWN_CODE};
pub use engine::{FeatureEngine, LabeledRow};
pub use history::HistoryIndex;
pub use schema::FeatureSchema;
