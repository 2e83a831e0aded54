//! Engine lifecycle states.

use serde::{Deserialize, Serialize};

/// Lifecycle state of the engine.
///
/// Transitions:
///
/// ```text
/// Uninitialized --initialize()--> Initializing --> Ready
/// Ready --activate()--> Active
/// Active --deactivate()--> Deactivating --> Inactive
/// any --fault--> Faulted --reset()--> Uninitialized
/// ```
///
/// `Faulted` is terminal until an explicit `reset()`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum EngineState {
    /// Not yet initialized; no components exist.
    Uninitialized,
    /// Running precondition checks and preparing components.
    Initializing,
    /// Components prepared; no worker tasks running.
    Ready,
    /// Sampler and controller loops running.
    Active,
    /// Cancellation signalled; joining workers and restoring mutations.
    Deactivating,
    /// Workers stopped, mutations restored.
    Inactive,
    /// Unrecoverable fault; requires `reset()`.
    Faulted(String),
}

impl EngineState {
    /// Whether worker loops are (or should be) running.
    pub fn is_active(&self) -> bool {
        matches!(self, EngineState::Active)
    }

    /// Whether the engine has faulted.
    pub fn is_faulted(&self) -> bool {
        matches!(self, EngineState::Faulted(_))
    }
}

impl std::fmt::Display for EngineState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EngineState::Uninitialized => write!(f, "uninitialized"),
            EngineState::Initializing => write!(f, "initializing"),
            EngineState::Ready => write!(f, "ready"),
            EngineState::Active => write!(f, "active"),
            EngineState::Deactivating => write!(f, "deactivating"),
            EngineState::Inactive => write!(f, "inactive"),
            EngineState::Faulted(reason) => write!(f, "faulted: {}", reason),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn active_predicate() {
        assert!(EngineState::Active.is_active());
        assert!(!EngineState::Ready.is_active());
        assert!(!EngineState::Faulted("x".into()).is_active());
    }

    #[test]
    fn faulted_carries_reason_in_display() {
        let state = EngineState::Faulted("store unreachable".into());
        assert_eq!(state.to_string(), "faulted: store unreachable");
    }
}
