//! Controller tuning state.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The single mutable tuning state per engine.
///
/// Owned exclusively by the controller and guarded by a mutex there; the
/// sampler loop reads a copy for reporting.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ControllerState {
    /// Currently applied tuning parameter.
    pub current_parameter: i32,
    /// The parameter the controller is steering toward.
    pub target_parameter: i32,
    /// Predictor confidence from the last evaluation, in [0, 1].
    pub prediction_accuracy: f64,
    /// When a parameter change was last applied.
    pub last_adjustment_at: Option<DateTime<Utc>>,
    /// Ticks that ran to completion.
    pub ticks_completed: u64,
    /// Ticks that failed (deadline or store write).
    pub ticks_failed: u64,
}

impl ControllerState {
    /// Initial state at a given starting parameter.
    pub fn new(initial_parameter: i32) -> Self {
        Self {
            current_parameter: initial_parameter,
            target_parameter: initial_parameter,
            prediction_accuracy: 0.0,
            last_adjustment_at: None,
            ticks_completed: 0,
            ticks_failed: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_state_has_no_adjustment() {
        let state = ControllerState::new(5);
        assert_eq!(state.current_parameter, 5);
        assert_eq!(state.target_parameter, 5);
        assert!(state.last_adjustment_at.is_none());
        assert_eq!(state.ticks_completed, 0);
    }
}
