//! Attune Predictor - Advisory scoring for controller decisions
//!
//! A predictor is a small trainable model that maps recent samples to a
//! bounded pair of scores: a confidence in [0, 1] and a signed adjustment
//! bias in [-1, 1]. The controller treats the output as advisory only:
//! its own correctness (bounds, no panics) never depends on which
//! concrete model sits behind the [`Predictor`] trait, or on the model
//! producing sensible output at all.

pub mod linear;

pub use linear::{LinearPredictor, PredictorConfig};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Bounded advisory scores.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    /// Confidence in current conditions, in [0, 1].
    pub confidence: f64,
    /// Signed nudge for the tuning parameter, in [-1, 1].
    pub adjustment_bias: f64,
}

impl Prediction {
    /// Construct a prediction, clamping both scores into bounds.
    pub fn clamped(confidence: f64, adjustment_bias: f64) -> Self {
        Self {
            confidence: confidence.clamp(0.0, 1.0),
            adjustment_bias: adjustment_bias.clamp(-1.0, 1.0),
        }
    }

    /// The neutral prediction: no confidence, no nudge.
    pub fn neutral() -> Self {
        Self {
            confidence: 0.0,
            adjustment_bias: 0.0,
        }
    }
}

/// One training pair: recent samples and the scores they should map to.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingExample {
    /// Input samples, oldest first (padded/truncated to the model width).
    pub input: Vec<f64>,
    /// Expected `[confidence, adjustment_bias]`.
    pub expected: [f64; 2],
}

/// Outcome of one training call.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct TrainingSummary {
    /// Epochs actually run.
    pub epochs_run: usize,
    /// Mean squared error before the first epoch.
    pub initial_error: f64,
    /// Mean squared error after the last epoch.
    pub final_error: f64,
}

/// Predictor errors.
#[derive(Debug, Error)]
pub enum PredictorError {
    /// Training was requested with no examples.
    #[error("training batch is empty")]
    EmptyBatch,

    /// An input or expected value was NaN or infinite.
    #[error("training batch contains a non-finite value")]
    NonFinite,
}

/// Result type for predictor operations.
pub type Result<T> = std::result::Result<T, PredictorError>;

/// A bounded-output, trainable, resettable scoring model.
pub trait Predictor: Send {
    /// Score the most recent samples. Must return bounded output for any
    /// input, including an empty slice.
    fn predict(&self, recent: &[f64]) -> Prediction;

    /// Train on a batch for a fixed number of epochs.
    ///
    /// The contract is convergence on average over many epochs on
    /// well-formed data, not monotonic per-epoch improvement.
    fn train(&mut self, batch: &[TrainingExample]) -> Result<TrainingSummary>;

    /// Re-initialize coefficients to a symmetric random small-magnitude
    /// state, discarding any residual bias toward an output.
    fn reset(&mut self);
}

/// A predictor that always returns the same scores. Useful for tests and
/// for running the controller with the model disabled.
#[derive(Debug, Clone)]
pub struct FixedPredictor {
    prediction: Prediction,
}

impl FixedPredictor {
    /// Always return the given (clamped) scores.
    pub fn new(confidence: f64, adjustment_bias: f64) -> Self {
        Self {
            prediction: Prediction::clamped(confidence, adjustment_bias),
        }
    }

    /// Always return the neutral prediction.
    pub fn neutral() -> Self {
        Self {
            prediction: Prediction::neutral(),
        }
    }
}

impl Predictor for FixedPredictor {
    fn predict(&self, _recent: &[f64]) -> Prediction {
        self.prediction
    }

    fn train(&mut self, batch: &[TrainingExample]) -> Result<TrainingSummary> {
        if batch.is_empty() {
            return Err(PredictorError::EmptyBatch);
        }
        Ok(TrainingSummary {
            epochs_run: 0,
            initial_error: 0.0,
            final_error: 0.0,
        })
    }

    fn reset(&mut self) {}
}
