//! Linear predictor trained by mini-batch gradient descent.

use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{Prediction, Predictor, PredictorError, Result, TrainingExample, TrainingSummary};

/// Tunables for [`LinearPredictor`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictorConfig {
    /// Number of input samples the model reads (newest `input_width`).
    pub input_width: usize,
    /// Epochs per training call.
    pub epochs: usize,
    /// Gradient descent step size.
    pub learning_rate: f64,
    /// Inputs are divided by this before entering the model.
    pub input_scale: f64,
    /// Reset draws weights uniformly from ±`init_magnitude`.
    pub init_magnitude: f64,
}

impl Default for PredictorConfig {
    fn default() -> Self {
        Self {
            input_width: 10,
            epochs: 50,
            learning_rate: 0.05,
            input_scale: 100.0,
            init_magnitude: 0.05,
        }
    }
}

/// One linear unit per output score, trained by gradient descent on
/// squared error.
///
/// Output is bounded by clamping the raw scores; training operates on the
/// raw (pre-clamp) scores so gradients stay informative near the bounds.
#[derive(Debug, Clone)]
pub struct LinearPredictor {
    config: PredictorConfig,
    // weights[k] and biases[k] produce output k: 0 = confidence, 1 = bias.
    weights: [Vec<f64>; 2],
    biases: [f64; 2],
}

impl LinearPredictor {
    /// Create a predictor with freshly initialized coefficients.
    pub fn new(config: PredictorConfig) -> Self {
        let width = config.input_width.max(1);
        let mut predictor = Self {
            config: PredictorConfig {
                input_width: width,
                ..config
            },
            weights: [vec![0.0; width], vec![0.0; width]],
            biases: [0.0; 2],
        };
        predictor.reset();
        predictor
    }

    /// The configured input width.
    pub fn input_width(&self) -> usize {
        self.config.input_width
    }

    /// Scale and shape `recent` into the model's fixed-width feature
    /// vector: newest samples kept, short inputs zero-padded at the front.
    fn features(&self, recent: &[f64]) -> Vec<f64> {
        let width = self.config.input_width;
        let mut features = vec![0.0; width];
        let tail = recent.len().min(width);
        let src = &recent[recent.len() - tail..];
        for (slot, value) in features[width - tail..].iter_mut().zip(src) {
            let scaled = value / self.config.input_scale;
            *slot = if scaled.is_finite() { scaled } else { 0.0 };
        }
        features
    }

    fn raw_score(&self, features: &[f64], output: usize) -> f64 {
        self.weights[output]
            .iter()
            .zip(features)
            .map(|(w, x)| w * x)
            .sum::<f64>()
            + self.biases[output]
    }

    fn batch_error(&self, batch: &[TrainingExample]) -> f64 {
        let mut sum = 0.0;
        for example in batch {
            let features = self.features(&example.input);
            for output in 0..2 {
                let diff = self.raw_score(&features, output) - example.expected[output];
                sum += diff * diff;
            }
        }
        sum / (batch.len() * 2) as f64
    }
}

impl Default for LinearPredictor {
    fn default() -> Self {
        Self::new(PredictorConfig::default())
    }
}

impl Predictor for LinearPredictor {
    fn predict(&self, recent: &[f64]) -> Prediction {
        let features = self.features(recent);
        Prediction::clamped(self.raw_score(&features, 0), self.raw_score(&features, 1))
    }

    fn train(&mut self, batch: &[TrainingExample]) -> Result<TrainingSummary> {
        if batch.is_empty() {
            return Err(PredictorError::EmptyBatch);
        }
        for example in batch {
            if example.input.iter().any(|v| !v.is_finite())
                || example.expected.iter().any(|v| !v.is_finite())
            {
                return Err(PredictorError::NonFinite);
            }
        }

        let initial_error = self.batch_error(batch);
        let lr = self.config.learning_rate;

        for _ in 0..self.config.epochs {
            for example in batch {
                let features = self.features(&example.input);
                for output in 0..2 {
                    let err = self.raw_score(&features, output) - example.expected[output];
                    for (w, x) in self.weights[output].iter_mut().zip(&features) {
                        *w -= lr * err * x;
                    }
                    self.biases[output] -= lr * err;
                }
            }
        }

        let final_error = self.batch_error(batch);
        debug!(
            examples = batch.len(),
            epochs = self.config.epochs,
            initial_error,
            final_error,
            "predictor trained"
        );

        Ok(TrainingSummary {
            epochs_run: self.config.epochs,
            initial_error,
            final_error,
        })
    }

    fn reset(&mut self) {
        let magnitude = self.config.init_magnitude;
        let mut rng = rand::thread_rng();
        for output in 0..2 {
            for w in self.weights[output].iter_mut() {
                *w = rng.gen_range(-magnitude..=magnitude);
            }
            self.biases[output] = rng.gen_range(-magnitude..=magnitude);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_config() -> PredictorConfig {
        PredictorConfig {
            input_width: 4,
            epochs: 200,
            learning_rate: 0.05,
            input_scale: 100.0,
            init_magnitude: 0.05,
        }
    }

    #[test]
    fn output_is_bounded_for_any_input() {
        let predictor = LinearPredictor::new(small_config());
        for input in [
            vec![],
            vec![1e9, -1e9, 1e9, -1e9],
            vec![f64::NAN, f64::INFINITY],
            vec![5.0; 100],
        ] {
            let p = predictor.predict(&input);
            assert!((0.0..=1.0).contains(&p.confidence), "{:?}", p);
            assert!((-1.0..=1.0).contains(&p.adjustment_bias), "{:?}", p);
        }
    }

    #[test]
    fn fresh_predictor_is_near_neutral() {
        let predictor = LinearPredictor::new(small_config());
        // With no input the raw scores are just the biases, which reset
        // bounds to the init magnitude.
        let p = predictor.predict(&[]);
        assert!(p.confidence <= 0.05);
        assert!(p.adjustment_bias.abs() <= 0.05);
    }

    #[test]
    fn training_reduces_error_on_well_formed_data() {
        let mut predictor = LinearPredictor::new(small_config());
        // Low latency should map to high confidence and positive bias,
        // high latency to the opposite.
        let batch = vec![
            TrainingExample {
                input: vec![10.0, 12.0, 11.0, 10.0],
                expected: [0.9, 0.8],
            },
            TrainingExample {
                input: vec![180.0, 190.0, 200.0, 185.0],
                expected: [0.2, -0.6],
            },
        ];

        let summary = predictor.train(&batch).expect("train");
        assert_eq!(summary.epochs_run, 200);
        assert!(
            summary.final_error < summary.initial_error,
            "error did not decrease: {} -> {}",
            summary.initial_error,
            summary.final_error
        );
        assert!(summary.final_error < 0.05);

        let calm = predictor.predict(&[10.0, 11.0, 10.0, 12.0]);
        let congested = predictor.predict(&[190.0, 185.0, 195.0, 200.0]);
        assert!(calm.confidence > congested.confidence);
    }

    #[test]
    fn train_rejects_empty_and_non_finite_batches() {
        let mut predictor = LinearPredictor::new(small_config());
        assert!(matches!(
            predictor.train(&[]),
            Err(PredictorError::EmptyBatch)
        ));
        let bad = vec![TrainingExample {
            input: vec![f64::NAN],
            expected: [0.5, 0.0],
        }];
        assert!(matches!(
            predictor.train(&bad),
            Err(PredictorError::NonFinite)
        ));
    }

    #[test]
    fn reset_discards_trained_state() {
        let mut predictor = LinearPredictor::new(small_config());
        let batch = vec![TrainingExample {
            input: vec![10.0, 10.0, 10.0, 10.0],
            expected: [1.0, 1.0],
        }];
        predictor.train(&batch).expect("train");
        let trained = predictor.predict(&[10.0, 10.0, 10.0, 10.0]);
        assert!(trained.confidence > 0.5);

        predictor.reset();
        let fresh = predictor.predict(&[]);
        assert!(fresh.confidence <= 0.05);
        assert!(fresh.adjustment_bias.abs() <= 0.05);
    }

    #[test]
    fn short_input_is_front_padded() {
        let predictor = LinearPredictor::new(small_config());
        let features = predictor.features(&[50.0]);
        assert_eq!(features.len(), 4);
        assert_eq!(features[0..3], [0.0, 0.0, 0.0]);
        assert!((features[3] - 0.5).abs() < 1e-12);
    }

    #[test]
    fn long_input_keeps_the_tail() {
        let predictor = LinearPredictor::new(small_config());
        let features = predictor.features(&[900.0, 1.0, 2.0, 3.0, 4.0]);
        assert_eq!(features, vec![0.01, 0.02, 0.03, 0.04]);
    }
}
