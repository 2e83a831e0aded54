//! The top-level lifecycle state machine.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::{broadcast, watch, Mutex, RwLock};
use tokio::task::JoinHandle;
use tokio::time::{interval, timeout};
use tracing::{debug, error, info, instrument, warn};

use attune_controller::AdaptiveController;
use attune_ledger::{KeyValueStore, LedgerEntry, MutationLedger, RestoreReport};
use attune_predictor::LinearPredictor;
use attune_stats::{PatternDetector, StatsAggregator};
use attune_types::{
    ControllerState, EngineState, EventSeverity, EventSource, SessionId, TuneEvent,
    TuneEventEnvelope,
};

use crate::config::EngineConfig;
use crate::error::{EngineError, Result};
use crate::probe::{NetworkProbe, ResourceSampler};
use crate::report::{recommendations, TuningReport};
use crate::sampler::{sampling_loop, SamplerContext};

/// Channel capacity for the unified event stream.
const EVENT_CHANNEL_CAPACITY: usize = 1024;

/// Wires sampler, controller, and ledger together and owns their
/// lifecycle.
///
/// The engine exclusively owns the worker task handles and the
/// cancellation signal; no other component starts or stops tasks. All
/// collaborators are injected, so multiple independent engines can
/// coexist (and be tested) in one process.
pub struct TuningEngine {
    config: EngineConfig,
    state: RwLock<EngineState>,
    store: Arc<dyn KeyValueStore>,
    probe: Arc<dyn NetworkProbe>,
    resources: Arc<dyn ResourceSampler>,
    aggregator: Arc<RwLock<StatsAggregator>>,
    controller: Arc<AdaptiveController>,
    ledger: Arc<MutationLedger>,
    event_tx: broadcast::Sender<TuneEventEnvelope>,
    cancel_tx: Mutex<Option<watch::Sender<bool>>>,
    workers: Mutex<Vec<JoinHandle<()>>>,
    session: Mutex<Option<SessionId>>,
}

impl TuningEngine {
    /// Create an engine over the given store and sample sources.
    pub fn new(
        config: EngineConfig,
        store: Arc<dyn KeyValueStore>,
        probe: Arc<dyn NetworkProbe>,
        resources: Arc<dyn ResourceSampler>,
    ) -> Self {
        let (event_tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);

        let aggregator = Arc::new(RwLock::new(StatsAggregator::new(config.window_capacity)));
        let ledger = Arc::new(MutationLedger::new(store.clone()));
        let controller = Arc::new(AdaptiveController::new(
            config.controller.clone(),
            aggregator.clone(),
            PatternDetector::new(config.detector.clone()),
            Box::new(LinearPredictor::new(config.predictor.clone())),
            ledger.clone(),
            store.clone(),
            event_tx.clone(),
        ));

        Self {
            config,
            state: RwLock::new(EngineState::Uninitialized),
            store,
            probe,
            resources,
            aggregator,
            controller,
            ledger,
            event_tx,
            cancel_tx: Mutex::new(None),
            workers: Mutex::new(Vec::new()),
            session: Mutex::new(None),
        }
    }

    /// Subscribe to the engine's event stream.
    pub fn subscribe(&self) -> broadcast::Receiver<TuneEventEnvelope> {
        self.event_tx.subscribe()
    }

    /// Current lifecycle state.
    pub async fn state(&self) -> EngineState {
        self.state.read().await.clone()
    }

    /// Copy of the controller's tuning state.
    pub async fn controller_state(&self) -> ControllerState {
        self.controller.state().await
    }

    /// Ask the controller to retrain the predictor between ticks.
    pub fn request_retrain(&self) {
        self.controller.request_retrain();
    }

    /// Snapshot of the mutation ledger, in capture order.
    pub async fn ledger_entries(&self) -> Vec<LedgerEntry> {
        self.ledger.entries().await
    }

    /// Check preconditions and prepare components. No worker tasks are
    /// started.
    #[instrument(skip(self))]
    pub async fn initialize(&self) -> Result<()> {
        {
            let state = self.state.read().await;
            if *state != EngineState::Uninitialized {
                return Err(EngineError::InvalidTransition {
                    operation: "initialize",
                    state: state.to_string(),
                });
            }
        }
        self.set_state(EngineState::Initializing).await;

        if let Err(problem) = self.config.validate() {
            return self.fail_initialize(format!("invalid configuration: {}", problem)).await;
        }

        // The external store must be reachable; a permission failure here
        // is fatal, whereas an absent value is fine.
        if let Err(e) = self
            .store
            .read(&self.config.controller.parameter_address)
            .await
        {
            return self.fail_initialize(format!("store unreachable: {}", e)).await;
        }

        // Train the predictor once so activation starts with a usable
        // model.
        if let Err(e) = self.controller.retrain().await {
            return self.fail_initialize(format!("predictor bootstrap failed: {}", e)).await;
        }

        self.set_state(EngineState::Ready).await;
        info!("engine ready");
        Ok(())
    }

    /// Start the sampler and controller loops. Idempotent while active.
    #[instrument(skip(self))]
    pub async fn activate(&self) -> Result<()> {
        {
            let state = self.state.read().await;
            match &*state {
                EngineState::Active => {
                    warn!("activate() called while already active");
                    return Ok(());
                }
                EngineState::Ready | EngineState::Inactive => {}
                other => {
                    return Err(EngineError::InvalidTransition {
                        operation: "activate",
                        state: other.to_string(),
                    });
                }
            }
        }

        let (cancel_tx, cancel_rx) = watch::channel(false);
        *self.cancel_tx.lock().await = Some(cancel_tx);

        let session = SessionId::generate();
        info!(session = %session, "starting worker loops");
        *self.session.lock().await = Some(session);

        let sampler_ctx = SamplerContext {
            config: self.config.clone(),
            probe: self.probe.clone(),
            resources: self.resources.clone(),
            aggregator: self.aggregator.clone(),
            controller: self.controller.clone(),
            event_tx: self.event_tx.clone(),
        };
        let sampler = tokio::spawn(sampling_loop(sampler_ctx, cancel_rx.clone()));
        let ticker = tokio::spawn(controller_loop(
            self.controller.clone(),
            self.config.tick_interval,
            cancel_rx,
        ));
        self.workers.lock().await.extend([sampler, ticker]);

        self.set_state(EngineState::Active).await;
        self.emit(TuneEvent::ActivationChanged { active: true }, EventSeverity::Info);
        Ok(())
    }

    /// Stop the worker loops and restore every configuration entry this
    /// activation mutated.
    ///
    /// Outside `Active` this is a logged no-op. Workers that outlive the
    /// join timeout are logged as anomalies and aborted rather than
    /// awaited forever.
    #[instrument(skip(self))]
    pub async fn deactivate(&self) -> Result<RestoreReport> {
        {
            let state = self.state.read().await;
            if *state != EngineState::Active {
                debug!(state = %state, "deactivate() outside Active; nothing to do");
                return Ok(RestoreReport::default());
            }
        }
        self.set_state(EngineState::Deactivating).await;

        self.stop_workers().await;

        let report = self.ledger.restore_all().await;
        let severity = if report.is_clean() {
            EventSeverity::Info
        } else {
            EventSeverity::Warning
        };
        self.emit(
            TuneEvent::RestoreCompleted {
                restored: report.restored.clone(),
                failed: report.failed.iter().map(|(id, _)| id.clone()).collect(),
            },
            severity,
        );

        *self.session.lock().await = None;
        self.set_state(EngineState::Inactive).await;
        self.emit(TuneEvent::ActivationChanged { active: false }, EventSeverity::Info);

        info!(
            restored = report.restored_count(),
            failed = report.failed_count(),
            "engine deactivated"
        );
        Ok(report)
    }

    /// Force the engine into `Faulted`, stopping any workers.
    pub async fn fault(&self, reason: impl Into<String>) {
        let reason = reason.into();
        error!(reason = %reason, "engine faulted");
        self.enter_fault(reason).await;
    }

    /// Leave `Faulted` and return to `Uninitialized`.
    #[instrument(skip(self))]
    pub async fn reset(&self) -> Result<()> {
        {
            let state = self.state.read().await;
            if !state.is_faulted() {
                return Err(EngineError::InvalidTransition {
                    operation: "reset",
                    state: state.to_string(),
                });
            }
        }
        self.stop_workers().await;
        self.set_state(EngineState::Uninitialized).await;
        info!("engine reset");
        Ok(())
    }

    /// Build a point-in-time report over the engine.
    pub async fn generate_report(&self) -> TuningReport {
        let snapshot = self.aggregator.read().await.snapshot();
        TuningReport {
            generated_at: Utc::now(),
            engine_state: self.state.read().await.clone(),
            controller: self.controller.state().await,
            recent_patterns: self.controller.recent_patterns(10).await,
            recommendations: recommendations(&snapshot),
            snapshot,
        }
    }

    async fn fail_initialize(&self, reason: String) -> Result<()> {
        self.enter_fault(reason.clone()).await;
        Err(EngineError::Precondition(reason))
    }

    async fn enter_fault(&self, reason: String) {
        self.stop_workers().await;
        self.emit(
            TuneEvent::CriticalError {
                message: reason.clone(),
            },
            EventSeverity::Critical,
        );
        self.set_state(EngineState::Faulted(reason)).await;
    }

    async fn stop_workers(&self) {
        if let Some(cancel) = self.cancel_tx.lock().await.take() {
            let _ = cancel.send(true);
        }

        let mut workers = self.workers.lock().await;
        for handle in workers.drain(..) {
            let abort = handle.abort_handle();
            match timeout(self.config.join_timeout, handle).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => warn!(error = %e, "worker ended abnormally"),
                Err(_) => {
                    warn!(
                        timeout_ms = self.config.join_timeout.as_millis() as u64,
                        "worker did not stop within the join timeout; aborting"
                    );
                    abort.abort();
                }
            }
        }
    }

    async fn set_state(&self, to: EngineState) {
        let from = {
            let mut state = self.state.write().await;
            let from = state.clone();
            *state = to.clone();
            from
        };
        if from != to {
            debug!(from = %from, to = %to, "state transition");
            self.emit(
                TuneEvent::EngineStateChanged { from, to },
                EventSeverity::Info,
            );
        }
    }

    fn emit(&self, event: TuneEvent, severity: EventSeverity) {
        // No subscribers is fine.
        let _ = self
            .event_tx
            .send(TuneEventEnvelope::new(event, EventSource::Engine, severity));
    }
}

impl Drop for TuningEngine {
    fn drop(&mut self) {
        // Abort any workers still running; deactivate() is the orderly
        // path.
        if let Ok(mut workers) = self.workers.try_lock() {
            for handle in workers.drain(..) {
                handle.abort();
            }
        }
    }
}

/// Interval-driven controller loop: serialized ticks, retrain requests
/// drained between them.
async fn controller_loop(
    controller: Arc<AdaptiveController>,
    period: Duration,
    mut cancel: watch::Receiver<bool>,
) {
    let mut ticker = interval(period);
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                if let Err(e) = controller.drain_retrain().await {
                    warn!(error = %e, "retrain failed");
                }
                match controller.tick().await {
                    Ok(outcome) => debug!(?outcome, "tick finished"),
                    // Already reported via events; the next tick retries
                    // independently.
                    Err(e) => warn!(error = %e, "tick failed"),
                }
            }
            changed = cancel.changed() => {
                if changed.is_err() || *cancel.borrow() {
                    break;
                }
            }
        }
    }
    debug!("controller loop stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::probe::{FixedProbe, FixedResources};
    use attune_ledger::{InMemoryStore, StoreValue};

    fn engine_with_store(store: Arc<InMemoryStore>) -> TuningEngine {
        TuningEngine::new(
            EngineConfig::default(),
            store,
            Arc::new(FixedProbe::new(30.0)),
            Arc::new(FixedResources::new(10.0, 128.0)),
        )
    }

    #[tokio::test]
    async fn initialize_reaches_ready() {
        let store = Arc::new(InMemoryStore::new());
        let engine = engine_with_store(store);

        assert_eq!(engine.state().await, EngineState::Uninitialized);
        engine.initialize().await.unwrap();
        assert_eq!(engine.state().await, EngineState::Ready);
    }

    #[tokio::test]
    async fn initialize_twice_is_an_error() {
        let store = Arc::new(InMemoryStore::new());
        let engine = engine_with_store(store);

        engine.initialize().await.unwrap();
        assert!(matches!(
            engine.initialize().await,
            Err(EngineError::InvalidTransition { .. })
        ));
    }

    #[tokio::test]
    async fn denied_store_faults_initialization() {
        let config = EngineConfig::default();
        let store = Arc::new(InMemoryStore::new());
        store.seed(
            config.controller.parameter_address.clone(),
            StoreValue::Integer32(5),
        );
        store.deny(config.controller.parameter_address.clone());
        let engine = engine_with_store(store);

        let mut events = engine.subscribe();
        let err = engine.initialize().await.unwrap_err();
        assert!(matches!(err, EngineError::Precondition(_)));
        assert!(engine.state().await.is_faulted());

        let mut saw_critical = false;
        while let Ok(envelope) = events.try_recv() {
            if matches!(envelope.event, TuneEvent::CriticalError { .. }) {
                saw_critical = true;
            }
        }
        assert!(saw_critical);

        // Faulted requires an explicit reset back to Uninitialized.
        engine.reset().await.unwrap();
        assert_eq!(engine.state().await, EngineState::Uninitialized);
    }

    #[tokio::test]
    async fn activate_requires_ready() {
        let store = Arc::new(InMemoryStore::new());
        let engine = engine_with_store(store);

        assert!(matches!(
            engine.activate().await,
            Err(EngineError::InvalidTransition { .. })
        ));
    }

    #[tokio::test]
    async fn reset_outside_faulted_is_an_error() {
        let store = Arc::new(InMemoryStore::new());
        let engine = engine_with_store(store);
        assert!(matches!(
            engine.reset().await,
            Err(EngineError::InvalidTransition { .. })
        ));
    }

    #[tokio::test]
    async fn report_before_sampling_asks_for_samples() {
        let store = Arc::new(InMemoryStore::new());
        let engine = engine_with_store(store);
        engine.initialize().await.unwrap();

        let report = engine.generate_report().await;
        assert_eq!(report.engine_state, EngineState::Ready);
        assert_eq!(report.snapshot.sample_count, 0);
        assert!(report.recommendations[0].contains("No samples"));
        assert!(report.recent_patterns.is_empty());
    }
}
