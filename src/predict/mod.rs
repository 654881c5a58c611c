//! Prediction serving
//!
//! Stateless request handling over the shared feature engine and the
//! current registry snapshot.

pub mod service;

pub use service::PredictionService;
