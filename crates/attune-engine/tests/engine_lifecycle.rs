//! End-to-end lifecycle tests with injected collaborators.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;
use tokio::time::sleep;

use attune_engine::probe::{FixedProbe, FixedResources, TimeoutProbe};
use attune_engine::{EngineConfig, EngineError, TuningEngine};
use attune_ledger::{InMemoryStore, StoreAddress, StoreValue};
use attune_types::{EngineState, TuneEvent, TuneEventEnvelope};

fn fast_config() -> EngineConfig {
    let mut config = EngineConfig::default();
    config.sample_interval = Duration::from_millis(10);
    config.tick_interval = Duration::from_millis(30);
    config.probe_timeout = Duration::from_millis(100);
    config.join_timeout = Duration::from_secs(1);
    config.controller.min_samples = 3;
    config
}

fn param_address() -> StoreAddress {
    EngineConfig::default().controller.parameter_address
}

fn profile_address() -> StoreAddress {
    EngineConfig::default().controller.profile_address
}

fn seeded_store() -> Arc<InMemoryStore> {
    let store = Arc::new(InMemoryStore::new());
    store.seed(param_address(), StoreValue::Integer32(5));
    store
}

fn engine(store: Arc<InMemoryStore>) -> TuningEngine {
    TuningEngine::new(
        fast_config(),
        store,
        Arc::new(FixedProbe::new(30.0)),
        Arc::new(FixedResources::new(10.0, 128.0)),
    )
}

fn drain(rx: &mut broadcast::Receiver<TuneEventEnvelope>) -> Vec<TuneEventEnvelope> {
    let mut events = Vec::new();
    while let Ok(envelope) = rx.try_recv() {
        events.push(envelope);
    }
    events
}

#[tokio::test]
async fn full_lifecycle_tunes_and_restores() {
    let store = seeded_store();
    let engine = engine(store.clone());
    let mut events = engine.subscribe();

    engine.initialize().await.unwrap();
    engine.activate().await.unwrap();
    assert_eq!(engine.state().await, EngineState::Active);

    // Idempotent while active.
    engine.activate().await.unwrap();
    assert_eq!(engine.state().await, EngineState::Active);

    sleep(Duration::from_millis(400)).await;

    let state = engine.controller_state().await;
    assert!(state.ticks_completed >= 1, "no tick completed");
    // 30 ms latency, no jitter, no loss pushes the parameter to the top
    // of its range regardless of the predictor's nudge.
    assert!((9..=10).contains(&state.current_parameter));
    assert_eq!(
        store.get(&param_address()),
        Some(StoreValue::Integer32(state.current_parameter))
    );
    assert!(store.get(&profile_address()).is_some());
    assert_eq!(engine.ledger_entries().await.len(), 2);

    let seen = drain(&mut events);
    assert!(seen
        .iter()
        .any(|e| matches!(e.event, TuneEvent::ActivationChanged { active: true })));
    assert!(seen
        .iter()
        .any(|e| matches!(e.event, TuneEvent::StatsUpdated { .. })));
    assert!(seen
        .iter()
        .any(|e| matches!(e.event, TuneEvent::ParameterApplied { .. })));
    assert!(seen
        .iter()
        .any(|e| matches!(e.event, TuneEvent::PatternDetected { .. })));

    // Deactivation restores every entry this activation mutated.
    let report = engine.deactivate().await.unwrap();
    assert!(report.is_clean());
    assert_eq!(report.restored_count(), 2);
    assert_eq!(engine.state().await, EngineState::Inactive);
    assert_eq!(store.get(&param_address()), Some(StoreValue::Integer32(5)));
    assert_eq!(store.get(&profile_address()), None);
    assert!(engine
        .ledger_entries()
        .await
        .iter()
        .all(|entry| entry.restored));

    let seen = drain(&mut events);
    assert!(seen
        .iter()
        .any(|e| matches!(e.event, TuneEvent::ActivationChanged { active: false })));
    assert!(seen
        .iter()
        .any(|e| matches!(e.event, TuneEvent::RestoreCompleted { .. })));

    // The engine can be activated again from Inactive.
    engine.activate().await.unwrap();
    assert_eq!(engine.state().await, EngineState::Active);
    engine.deactivate().await.unwrap();
}

#[tokio::test]
async fn failed_store_writes_leave_parameter_untouched() {
    let store = seeded_store();
    let engine = engine(store.clone());
    let mut events = engine.subscribe();

    engine.initialize().await.unwrap();

    // Every write fails from the start: ticks keep trying and keep
    // failing, and no partial numeric state is committed.
    store.set_fail_writes(true);
    engine.activate().await.unwrap();
    sleep(Duration::from_millis(250)).await;

    let state = engine.controller_state().await;
    assert_eq!(state.current_parameter, 5);
    assert!(state.ticks_failed >= 1, "no tick failed");
    assert_eq!(engine.state().await, EngineState::Active);

    let seen = drain(&mut events);
    assert!(seen
        .iter()
        .any(|e| matches!(e.event, TuneEvent::MutationFailed { .. })));
    assert!(!seen
        .iter()
        .any(|e| matches!(e.event, TuneEvent::ParameterApplied { .. })));

    // Once the store recovers the next tick applies cleanly.
    store.set_fail_writes(false);
    sleep(Duration::from_millis(200)).await;
    let state = engine.controller_state().await;
    assert!((9..=10).contains(&state.current_parameter));

    let report = engine.deactivate().await.unwrap();
    assert!(report.is_clean());
    assert_eq!(store.get(&param_address()), Some(StoreValue::Integer32(5)));
}

#[tokio::test]
async fn deactivation_reports_partial_restore_failure() {
    let store = seeded_store();
    let engine = engine(store.clone());

    engine.initialize().await.unwrap();
    engine.activate().await.unwrap();
    sleep(Duration::from_millis(200)).await;
    assert_eq!(engine.ledger_entries().await.len(), 2);

    // The parameter address becomes unwritable before deactivation; its
    // restore fails but the bulk restore still completes.
    store.deny(param_address());
    let report = engine.deactivate().await.unwrap();
    assert_eq!(report.restored_count() + report.failed_count(), 2);
    assert_eq!(report.failed_count(), 1);
    assert_eq!(engine.state().await, EngineState::Inactive);

    // The failed entry stays pending for a later retry.
    let pending: Vec<_> = engine
        .ledger_entries()
        .await
        .into_iter()
        .filter(|entry| !entry.restored)
        .collect();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].address, param_address());
}

#[tokio::test]
async fn engine_survives_a_dead_probe() {
    let store = seeded_store();
    let engine = TuningEngine::new(
        fast_config(),
        store,
        Arc::new(TimeoutProbe),
        Arc::new(FixedResources::new(10.0, 128.0)),
    );
    let mut events = engine.subscribe();

    engine.initialize().await.unwrap();
    engine.activate().await.unwrap();
    sleep(Duration::from_millis(200)).await;

    // Nothing but timeouts: full loss, no latency samples, no tuning,
    // and the engine keeps running.
    assert_eq!(engine.state().await, EngineState::Active);
    let state = engine.controller_state().await;
    assert_eq!(state.current_parameter, 5);

    let seen = drain(&mut events);
    let full_loss = seen.iter().any(|e| match &e.event {
        TuneEvent::StatsUpdated { snapshot, .. } => {
            snapshot.packet_loss_pct == 100.0 && snapshot.sample_count == 0
        }
        _ => false,
    });
    assert!(full_loss, "expected full-loss stats updates");

    engine.deactivate().await.unwrap();
}

#[tokio::test]
async fn lifecycle_transitions_are_guarded() {
    let store = seeded_store();
    let engine = engine(store);

    assert!(matches!(
        engine.activate().await,
        Err(EngineError::InvalidTransition { .. })
    ));

    // Deactivating before activation is a no-op, not an error.
    let report = engine.deactivate().await.unwrap();
    assert_eq!(report.restored_count(), 0);
}
