//! Attune Types - Core types for adaptive network tuning
//!
//! Attune is a continuously-running telemetry and tuning engine. It samples
//! live operating conditions (network latency, jitter, loss, process
//! resource usage), maintains rolling statistics and pattern
//! classifications over those samples, and drives a closed-loop controller
//! that adjusts a bounded tuning parameter toward an operating target.
//!
//! ## Architectural Boundaries
//!
//! - **attune-stats** owns: rolling windows, aggregation, pattern detection
//! - **attune-controller** owns: the evaluate-and-apply tuning cycle
//! - **attune-ledger** owns: reversible mutation of the external store
//! - **attune-engine** owns: lifecycle, worker loops, event fan-out
//!
//! This crate carries the data model shared between them:
//!
//! - **Sample**: one timestamped scalar measurement of a metric
//! - **AggregateSnapshot**: derived statistics over the current windows
//! - **Pattern**: a classified variability regime with a confidence score
//! - **ControllerState**: the single mutable tuning state per engine
//! - **EngineState**: the lifecycle state machine
//! - **Events**: unified observability stream

pub mod controller;
pub mod events;
pub mod ids;
pub mod lifecycle;
pub mod metric;
pub mod pattern;

// Re-export main types
pub use controller::ControllerState;
pub use events::{EventSeverity, EventSource, TuneEvent, TuneEventEnvelope};
pub use ids::{EntryId, SessionId};
pub use lifecycle::EngineState;
pub use metric::{AggregateSnapshot, MetricKind, Sample};
pub use pattern::{Pattern, PatternKind};
