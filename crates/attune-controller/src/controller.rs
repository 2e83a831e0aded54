//! The evaluate-and-apply tuning cycle.

use std::sync::Arc;

use chrono::Utc;
use tokio::sync::{broadcast, mpsc, Mutex, RwLock};
use tokio::time::timeout;
use tracing::{debug, info, instrument, warn};

use attune_ledger::{KeyValueStore, MutationLedger, StoreValue};
use attune_predictor::{Predictor, TrainingExample, TrainingSummary};
use attune_stats::{PatternDetector, RollingWindow, StatsAggregator};
use attune_types::{
    ControllerState, EventSeverity, EventSource, Pattern, TuneEvent, TuneEventEnvelope,
};

use crate::config::{evaluate_steps, ControllerConfig};
use crate::error::{ControllerError, Result};

/// Chunk width used when deriving training examples from the latency
/// history.
const TRAIN_CHUNK: usize = 8;

/// Pending retrain requests are collapsed; the queue only needs to hold
/// "at least one".
const RETRAIN_QUEUE: usize = 8;

/// What a tick did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickOutcome {
    /// Too few samples to tune.
    Skipped,
    /// The hysteresis gate stayed closed; nothing was written.
    Held { optimal: i32 },
    /// A new parameter was written and committed.
    Applied { previous: i32, current: i32 },
}

/// The closed-loop tuner.
///
/// Ticks are serialized by the engine's controller loop; sampling runs
/// concurrently and only shares the aggregator lock and the state mutex
/// with this type.
pub struct AdaptiveController {
    config: ControllerConfig,
    aggregator: Arc<RwLock<StatsAggregator>>,
    detector: Mutex<PatternDetector>,
    predictor: Mutex<Box<dyn Predictor>>,
    ledger: Arc<MutationLedger>,
    store: Arc<dyn KeyValueStore>,
    state: Mutex<ControllerState>,
    event_tx: broadcast::Sender<TuneEventEnvelope>,
    retrain_tx: mpsc::Sender<()>,
    retrain_rx: Mutex<mpsc::Receiver<()>>,
}

impl AdaptiveController {
    /// Wire a controller to its collaborators.
    pub fn new(
        config: ControllerConfig,
        aggregator: Arc<RwLock<StatsAggregator>>,
        detector: PatternDetector,
        predictor: Box<dyn Predictor>,
        ledger: Arc<MutationLedger>,
        store: Arc<dyn KeyValueStore>,
        event_tx: broadcast::Sender<TuneEventEnvelope>,
    ) -> Self {
        let initial = config
            .base_target
            .clamp(config.min_parameter, config.max_parameter);
        let (retrain_tx, retrain_rx) = mpsc::channel(RETRAIN_QUEUE);

        Self {
            config,
            aggregator,
            detector: Mutex::new(detector),
            predictor: Mutex::new(predictor),
            ledger,
            store,
            state: Mutex::new(ControllerState::new(initial)),
            event_tx,
            retrain_tx,
            retrain_rx: Mutex::new(retrain_rx),
        }
    }

    /// Copy of the current tuning state.
    pub async fn state(&self) -> ControllerState {
        self.state.lock().await.clone()
    }

    /// The newest `n` detected patterns, oldest first.
    pub async fn recent_patterns(&self, n: usize) -> Vec<Pattern> {
        self.detector.lock().await.recent(n)
    }

    /// Ask the controller to retrain the predictor between ticks.
    ///
    /// Requests are collapsed: any number of pending requests produce one
    /// retrain, and a full queue simply means one is already pending.
    pub fn request_retrain(&self) {
        let _ = self.retrain_tx.try_send(());
    }

    /// Run one evaluate-and-possibly-apply cycle under the tick deadline.
    #[instrument(skip(self))]
    pub async fn tick(&self) -> Result<TickOutcome> {
        match timeout(self.config.tick_deadline, self.tick_inner()).await {
            Ok(outcome) => outcome,
            Err(_) => {
                self.mark_failed("tick deadline exceeded").await;
                Err(ControllerError::DeadlineExceeded)
            }
        }
    }

    async fn tick_inner(&self) -> Result<TickOutcome> {
        // Consistent read of the sampling side: snapshot, pattern, and
        // predictor input all come from the same window contents.
        let (snapshot, recent, pattern) = {
            let aggregator = self.aggregator.read().await;
            let pattern = self
                .detector
                .lock()
                .await
                .observe(aggregator.latency_window());
            (
                aggregator.snapshot(),
                aggregator.latency_window().values(),
                pattern,
            )
        };

        if let Some(pattern) = &pattern {
            self.emit(
                TuneEvent::PatternDetected {
                    pattern: pattern.clone(),
                },
                EventSeverity::Info,
            );
        }

        if snapshot.sample_count < self.config.min_samples {
            debug!(
                samples = snapshot.sample_count,
                needed = self.config.min_samples,
                "holding off: not enough samples"
            );
            return Ok(TickOutcome::Skipped);
        }

        let prediction = self.predictor.lock().await.predict(&recent);

        let adj_latency = evaluate_steps(
            &self.config.latency_steps,
            self.config.latency_fallback,
            snapshot.avg_latency_ms,
        );
        let adj_jitter = evaluate_steps(
            &self.config.jitter_steps,
            self.config.jitter_fallback,
            snapshot.avg_jitter_ms,
        );
        let adj_loss = evaluate_steps(
            &self.config.loss_steps,
            self.config.loss_fallback,
            snapshot.packet_loss_pct,
        );
        let bias_term = if prediction.adjustment_bias.is_finite() {
            prediction.adjustment_bias.round() as i32
        } else {
            0
        };

        let optimal = (self.config.base_target + adj_latency + adj_jitter + adj_loss + bias_term)
            .clamp(self.config.min_parameter, self.config.max_parameter);

        let (current, accuracy) = {
            let state = self.state.lock().await;
            (state.current_parameter, state.prediction_accuracy)
        };

        let accuracy_shifted =
            (prediction.confidence - accuracy).abs() > self.config.accuracy_hysteresis;
        if optimal == current && !accuracy_shifted {
            debug!(optimal, "hysteresis gate closed");
            let mut state = self.state.lock().await;
            state.ticks_completed += 1;
            return Ok(TickOutcome::Held { optimal });
        }

        // Apply: capture every address about to change, then write, then
        // commit. Any failure leaves the in-memory state untouched and
        // keeps the captured backups for retry.
        let profile = pattern
            .as_ref()
            .map(|p| p.kind.to_string())
            .unwrap_or_else(|| "baseline".to_string());
        let writes = [
            (
                self.config.parameter_address.clone(),
                StoreValue::Integer32(optimal),
            ),
            (self.config.profile_address.clone(), StoreValue::Text(profile)),
        ];

        for (address, _) in &writes {
            if let Err(e) = self.ledger.backup(address).await {
                self.mark_failed(&format!("backup of {} failed: {}", address, e))
                    .await;
                return Err(e.into());
            }
        }

        for (address, value) in writes {
            if let Err(e) = self.store.write(&address, value).await {
                self.mark_failed(&format!("write of {} failed: {}", address, e))
                    .await;
                return Err(e.into());
            }
        }

        let previous = {
            let mut state = self.state.lock().await;
            let previous = state.current_parameter;
            state.current_parameter = optimal;
            state.target_parameter = optimal;
            state.prediction_accuracy = prediction.confidence;
            state.last_adjustment_at = Some(Utc::now());
            state.ticks_completed += 1;
            previous
        };
        self.aggregator.write().await.record_advantage(optimal);

        info!(previous, current = optimal, "parameter applied");
        self.emit(
            TuneEvent::ParameterApplied {
                previous,
                current: optimal,
            },
            EventSeverity::Info,
        );

        Ok(TickOutcome::Applied {
            previous,
            current: optimal,
        })
    }

    /// Drain pending retrain requests; run at most one retrain.
    pub async fn drain_retrain(&self) -> Result<Option<TrainingSummary>> {
        let requested = {
            let mut rx = self.retrain_rx.lock().await;
            let mut requested = false;
            while rx.try_recv().is_ok() {
                requested = true;
            }
            requested
        };
        if !requested {
            return Ok(None);
        }
        self.retrain().await.map(Some)
    }

    /// Retrain the predictor from the recorded latency history (or a
    /// bootstrap batch when history is still thin).
    #[instrument(skip(self))]
    pub async fn retrain(&self) -> Result<TrainingSummary> {
        let history = {
            let aggregator = self.aggregator.read().await;
            aggregator.latency_window().values()
        };
        let batch = self.training_batch(&history);
        let summary = self.predictor.lock().await.train(&batch)?;
        info!(
            examples = batch.len(),
            final_error = summary.final_error,
            "predictor retrained"
        );
        Ok(summary)
    }

    /// Derive training pairs from latency history: each chunk maps to the
    /// confidence/bias the step heuristics would assign it, so the model
    /// learns to anticipate the controller's own reading of conditions.
    fn training_batch(&self, history: &[f64]) -> Vec<TrainingExample> {
        let chunks: Vec<&[f64]> = if history.len() >= TRAIN_CHUNK + 2 {
            history
                .windows(TRAIN_CHUNK)
                .step_by(TRAIN_CHUNK / 2)
                .collect()
        } else {
            Vec::new()
        };

        if chunks.is_empty() {
            return bootstrap_batch(&self.config);
        }

        chunks
            .into_iter()
            .map(|chunk| TrainingExample {
                input: chunk.to_vec(),
                expected: expected_scores(&self.config, chunk),
            })
            .collect()
    }

    async fn mark_failed(&self, reason: &str) {
        warn!(reason, "tick failed");
        {
            let mut state = self.state.lock().await;
            state.ticks_failed += 1;
        }
        self.emit(
            TuneEvent::MutationFailed {
                reason: reason.to_string(),
            },
            EventSeverity::Error,
        );
    }

    fn emit(&self, event: TuneEvent, severity: EventSeverity) {
        // No subscribers is fine.
        let _ = self
            .event_tx
            .send(TuneEventEnvelope::new(event, EventSource::Controller, severity));
    }
}

/// The confidence/bias pair the step heuristics assign to a chunk of
/// latency samples.
fn expected_scores(config: &ControllerConfig, chunk: &[f64]) -> [f64; 2] {
    let mut window = RollingWindow::new(chunk.len().max(1));
    for &value in chunk {
        window.push(value);
    }
    let confidence = (1.0 - window.stddev() / 50.0).clamp(0.0, 1.0);
    let adjustment = evaluate_steps(&config.latency_steps, config.latency_fallback, window.mean());
    let max_step = config
        .latency_steps
        .iter()
        .map(|s| s.adjustment.abs())
        .chain([config.latency_fallback.abs()])
        .max()
        .unwrap_or(1)
        .max(1);
    let bias = (adjustment as f64 / max_step as f64).clamp(-1.0, 1.0);
    [confidence, bias]
}

/// Canonical examples used before any real history exists.
fn bootstrap_batch(config: &ControllerConfig) -> Vec<TrainingExample> {
    let calm = vec![15.0; TRAIN_CHUNK];
    let congested = vec![250.0; TRAIN_CHUNK];
    let erratic: Vec<f64> = (0..TRAIN_CHUNK)
        .map(|i| if i % 2 == 0 { 10.0 } else { 90.0 })
        .collect();

    [calm, congested, erratic]
        .into_iter()
        .map(|input| {
            let expected = expected_scores(config, &input);
            TrainingExample { input, expected }
        })
        .collect()
}
