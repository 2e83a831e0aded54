//! Attune Engine - Lifecycle, sampling, and reporting
//!
//! The [`TuningEngine`] is the top-level state machine that wires the
//! sampling loop, the adaptive controller, and the mutation ledger
//! together. It owns every worker task and cancellation signal; no other
//! component starts or stops tasks.
//!
//! ## Lifecycle
//!
//! ```text
//! Uninitialized --initialize()--> Initializing --> Ready
//! Ready --activate()--> Active
//! Active --deactivate()--> Deactivating --> Inactive
//! fault --> Faulted --reset()--> Uninitialized
//! ```
//!
//! `initialize()` checks preconditions (the external store must be
//! readable) and trains the predictor once; `activate()` starts the
//! sampler and controller loops; `deactivate()` signals cancellation,
//! joins workers under a bounded timeout, and restores every
//! configuration entry this activation mutated.
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use attune_engine::{EngineConfig, TuningEngine};
//! use attune_engine::probe::{SimulatedProbe, SimulatedResources};
//! use attune_ledger::InMemoryStore;
//!
//! # async fn example() {
//! let engine = TuningEngine::new(
//!     EngineConfig::default(),
//!     Arc::new(InMemoryStore::new()),
//!     Arc::new(SimulatedProbe::default()),
//!     Arc::new(SimulatedResources::default()),
//! );
//!
//! engine.initialize().await.unwrap();
//! engine.activate().await.unwrap();
//! // ... later
//! engine.deactivate().await.unwrap();
//! # }
//! ```

pub mod config;
pub mod engine;
pub mod error;
pub mod probe;
pub mod report;
mod sampler;

pub use config::EngineConfig;
pub use engine::TuningEngine;
pub use error::{EngineError, Result};
pub use probe::{CounterKind, NetworkProbe, ProbeError, ProbeReading, ResourceSampler};
pub use report::{recommendations, TuningReport};
