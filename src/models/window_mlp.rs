//! Neural recent-form model
//!
//! MLP regressor over the standardized feature row: the window of rolling
//! form aggregates plus the fixture context. Trained full-batch with Adam;
//! weights serialize through a byte-level record so the artifact store can
//! treat every model the same way.

use burn::backend::{Autodiff, NdArray};
use burn::module::{AutodiffModule, Module};
use burn::nn::{Linear, LinearConfig};
use burn::optim::{AdamConfig, GradientsParams, Optimizer};
use burn::record::{BinBytesRecorder, FullPrecisionSettings, Recorder};
use burn::tensor::activation::relu;
use burn::tensor::backend::Backend;
use burn::tensor::{ElementConversion, Tensor};
use serde::{Deserialize, Serialize};

use crate::features::FeatureSchema;
use crate::models::{ModelTrainer, TrainedModel, WINDOW_MLP};
use crate::{CricError, MlpConfig, Result};

pub type InferenceBackend = NdArray<f32>;
type TrainBackend = Autodiff<NdArray<f32>>;

/// Network shape, persisted alongside the weights
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MlpNetConfig {
    pub input_dim: usize,
    pub hidden_dims: Vec<usize>,
}

/// Per-slot standardization fitted on the training set
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureNorm {
    mean: Vec<f64>,
    std: Vec<f64>,
}

impl FeatureNorm {
    fn fit(rows: &[Vec<f64>]) -> Self {
        let dim = rows.first().map_or(0, |r| r.len());
        let n = rows.len() as f64;
        let mut mean = vec![0.0; dim];
        for row in rows {
            for (m, v) in mean.iter_mut().zip(row.iter()) {
                *m += v;
            }
        }
        for m in &mut mean {
            *m /= n;
        }

        let mut std = vec![0.0; dim];
        for row in rows {
            for ((s, v), m) in std.iter_mut().zip(row.iter()).zip(mean.iter()) {
                *s += (v - m) * (v - m);
            }
        }
        for s in &mut std {
            *s = (*s / n).sqrt();
            // Constant slots pass through unscaled
            if *s < 1e-8 {
                *s = 1.0;
            }
        }

        FeatureNorm { mean, std }
    }

    fn apply(&self, row: &[f64]) -> Vec<f32> {
        row.iter()
            .zip(self.mean.iter().zip(self.std.iter()))
            .map(|(v, (m, s))| ((v - m) / s) as f32)
            .collect()
    }
}

/// Stack of Linear/ReLU blocks with a scalar regression head
#[derive(Module, Debug)]
pub struct FormNet<B: Backend> {
    hidden: Vec<Linear<B>>,
    output: Linear<B>,
}

impl<B: Backend> FormNet<B> {
    pub fn new(device: &B::Device, config: &MlpNetConfig) -> Self {
        let mut hidden = Vec::with_capacity(config.hidden_dims.len());
        let mut in_dim = config.input_dim;
        for &h in &config.hidden_dims {
            hidden.push(LinearConfig::new(in_dim, h).init(device));
            in_dim = h;
        }

        FormNet {
            hidden,
            output: LinearConfig::new(in_dim, 1).init(device),
        }
    }

    pub fn forward(&self, x: Tensor<B, 2>) -> Tensor<B, 2> {
        let mut x = x;
        for layer in &self.hidden {
            x = relu(layer.forward(x));
        }
        self.output.forward(x)
    }
}

/// Trained MLP plus the normalization it was fit with
#[derive(Debug, Clone)]
pub struct MlpModel {
    net_config: MlpNetConfig,
    norm: FeatureNorm,
    net: FormNet<InferenceBackend>,
}

/// On-disk form: shape + normalization + weight record bytes
#[derive(Serialize, Deserialize)]
struct MlpEnvelope {
    config: MlpNetConfig,
    norm: FeatureNorm,
    weights: Vec<u8>,
}

impl MlpModel {
    pub fn predict_one(&self, row: &[f64]) -> f64 {
        let device = <InferenceBackend as Backend>::Device::default();
        let x = self.norm.apply(row);
        let input = Tensor::<InferenceBackend, 1>::from_floats(x.as_slice(), &device)
            .reshape([1, self.net_config.input_dim]);
        let output = self.net.forward(input);
        let value: f32 = output.into_scalar().elem();
        value as f64
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let recorder = BinBytesRecorder::<FullPrecisionSettings>::new();
        let weights = recorder
            .record(self.net.clone().into_record(), ())
            .map_err(|e| CricError::Parse(e.to_string()))?;
        let envelope = MlpEnvelope {
            config: self.net_config.clone(),
            norm: self.norm.clone(),
            weights,
        };
        Ok(serde_json::to_vec(&envelope)?)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let envelope: MlpEnvelope = serde_json::from_slice(bytes)?;
        let device = <InferenceBackend as Backend>::Device::default();
        let recorder = BinBytesRecorder::<FullPrecisionSettings>::new();
        let record = recorder
            .load(envelope.weights, &device)
            .map_err(|e| CricError::Parse(e.to_string()))?;
        let net = FormNet::new(&device, &envelope.config).load_record(record);

        Ok(MlpModel {
            net_config: envelope.config,
            norm: envelope.norm,
            net,
        })
    }
}

pub struct WindowMlpTrainer {
    config: MlpConfig,
    seed: u64,
}

impl WindowMlpTrainer {
    pub fn new(config: MlpConfig, seed: u64) -> Self {
        WindowMlpTrainer { config, seed }
    }
}

impl ModelTrainer for WindowMlpTrainer {
    fn model_type(&self) -> &'static str {
        WINDOW_MLP
    }

    fn fit(
        &self,
        features: &[Vec<f64>],
        targets: &[f64],
        _schema: &FeatureSchema,
    ) -> Result<TrainedModel> {
        if features.is_empty() {
            return Err(CricError::Training {
                model_type: WINDOW_MLP.to_string(),
                message: "empty training set".to_string(),
            });
        }

        let n = features.len();
        let input_dim = features[0].len();
        let norm = FeatureNorm::fit(features);
        let flat: Vec<f32> = features.iter().flat_map(|row| norm.apply(row)).collect();
        let labels: Vec<f32> = targets.iter().map(|&t| t as f32).collect();

        TrainBackend::seed(self.seed);
        let device = <TrainBackend as Backend>::Device::default();
        let x = Tensor::<TrainBackend, 1>::from_floats(flat.as_slice(), &device)
            .reshape([n, input_dim]);
        let y = Tensor::<TrainBackend, 1>::from_floats(labels.as_slice(), &device)
            .reshape([n, 1]);

        let net_config = MlpNetConfig {
            input_dim,
            hidden_dims: self.config.hidden_dims.clone(),
        };
        let mut model = FormNet::<TrainBackend>::new(&device, &net_config);
        let mut optimizer = AdamConfig::new().init();

        for epoch in 0..self.config.epochs {
            let predictions = model.forward(x.clone());
            let loss = (predictions - y.clone()).powf_scalar(2.0).mean();
            let loss_value: f32 = loss.clone().into_scalar().elem();

            if !loss_value.is_finite() {
                return Err(CricError::Training {
                    model_type: WINDOW_MLP.to_string(),
                    message: format!("loss diverged at epoch {}", epoch + 1),
                });
            }

            let grads = GradientsParams::from_grads(loss.backward(), &model);
            model = optimizer.step(self.config.learning_rate, model, grads);

            if (epoch + 1) % 50 == 0 {
                log::debug!(
                    "window_mlp epoch {}/{}: mse={:.4}",
                    epoch + 1,
                    self.config.epochs,
                    loss_value
                );
            }
        }

        Ok(TrainedModel::WindowMlp(MlpModel {
            net_config,
            norm,
            net: model.valid(),
        }))
    }
}
