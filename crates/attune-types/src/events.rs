//! Event types for engine observability.
//!
//! Events provide a unified stream of sampling, tuning, and lifecycle
//! activity. Subsystems emit [`TuneEventEnvelope`]s on a broadcast channel
//! owned by the engine; UI and reporting collaborators subscribe.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::controller::ControllerState;
use crate::ids::EntryId;
use crate::lifecycle::EngineState;
use crate::metric::AggregateSnapshot;
use crate::pattern::Pattern;

/// Envelope wrapping all engine events.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TuneEventEnvelope {
    /// Unique event ID.
    pub id: Uuid,

    /// Event timestamp.
    pub timestamp: chrono::DateTime<chrono::Utc>,

    /// Which subsystem emitted the event.
    pub source: EventSource,

    /// Event severity.
    pub severity: EventSeverity,

    /// The actual event.
    pub event: TuneEvent,
}

impl TuneEventEnvelope {
    /// Wrap an event with a fresh ID and the current time.
    pub fn new(event: TuneEvent, source: EventSource, severity: EventSeverity) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp: chrono::Utc::now(),
            source,
            severity,
            event,
        }
    }
}

/// Event sources.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventSource {
    /// Sampling loop.
    Sampler,
    /// Controller tick loop.
    Controller,
    /// Mutation ledger.
    Ledger,
    /// Engine lifecycle.
    Engine,
}

/// Event severity levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventSeverity {
    /// Debug-level event.
    Debug,
    /// Informational event.
    Info,
    /// Warning event.
    Warning,
    /// Error event.
    Error,
    /// Critical event requiring immediate attention.
    Critical,
}

/// Engine events.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum TuneEvent {
    /// A pattern was detected over the latency window.
    PatternDetected { pattern: Pattern },

    /// Fresh statistics after a sampling cycle.
    StatsUpdated {
        snapshot: AggregateSnapshot,
        controller: ControllerState,
    },

    /// A controller tick applied a new parameter.
    ParameterApplied { previous: i32, current: i32 },

    /// A controller tick failed to apply its mutation batch.
    MutationFailed { reason: String },

    /// A bulk restore finished.
    RestoreCompleted {
        restored: Vec<EntryId>,
        failed: Vec<EntryId>,
    },

    /// Worker loops started or stopped.
    ActivationChanged { active: bool },

    /// The lifecycle state machine transitioned.
    EngineStateChanged {
        from: EngineState,
        to: EngineState,
    },

    /// An unrecoverable fault occurred.
    CriticalError { message: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn envelope_stamps_id_and_time() {
        let a = TuneEventEnvelope::new(
            TuneEvent::ActivationChanged { active: true },
            EventSource::Engine,
            EventSeverity::Info,
        );
        let b = TuneEventEnvelope::new(
            TuneEvent::ActivationChanged { active: false },
            EventSource::Engine,
            EventSeverity::Info,
        );
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn events_serialize() {
        let envelope = TuneEventEnvelope::new(
            TuneEvent::MutationFailed {
                reason: "write denied".into(),
            },
            EventSource::Controller,
            EventSeverity::Error,
        );
        let json = serde_json::to_string(&envelope).unwrap();
        assert!(json.contains("MutationFailed"));
    }
}
