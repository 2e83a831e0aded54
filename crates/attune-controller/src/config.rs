//! Controller configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use attune_ledger::StoreAddress;

/// One row of an adjustment step table: inputs strictly below
/// `upper_bound` earn `adjustment`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdjustmentStep {
    /// Exclusive upper bound on the input, in the metric's native unit.
    pub upper_bound: f64,
    /// Parameter adjustment for inputs below the bound.
    pub adjustment: i32,
}

impl AdjustmentStep {
    /// Shorthand constructor.
    pub fn new(upper_bound: f64, adjustment: i32) -> Self {
        Self {
            upper_bound,
            adjustment,
        }
    }
}

/// Evaluate a step table: first row whose bound exceeds the input wins,
/// `fallback` applies past the last bound. A non-finite input contributes
/// the neutral adjustment 0.
pub fn evaluate_steps(steps: &[AdjustmentStep], fallback: i32, input: f64) -> i32 {
    if !input.is_finite() {
        return 0;
    }
    steps
        .iter()
        .find(|step| input < step.upper_bound)
        .map(|step| step.adjustment)
        .unwrap_or(fallback)
}

/// Tunables for the adaptive controller.
///
/// The step tables are the configuration surface for the adjustment
/// heuristics: each must be sorted ascending by bound with non-increasing
/// adjustments so the resulting term is a monotonic function of its
/// input. The defaults follow that shape.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ControllerConfig {
    /// Inclusive lower bound of the tuning parameter.
    pub min_parameter: i32,
    /// Inclusive upper bound of the tuning parameter.
    pub max_parameter: i32,
    /// Starting point of the optimal-parameter formula.
    pub base_target: i32,
    /// Latency (ms) step table.
    pub latency_steps: Vec<AdjustmentStep>,
    /// Adjustment past the last latency bound.
    pub latency_fallback: i32,
    /// Jitter (ms) step table.
    pub jitter_steps: Vec<AdjustmentStep>,
    /// Adjustment past the last jitter bound.
    pub jitter_fallback: i32,
    /// Packet-loss (%) step table, the effective-bandwidth term.
    pub loss_steps: Vec<AdjustmentStep>,
    /// Adjustment past the last loss bound.
    pub loss_fallback: i32,
    /// Minimum latency samples before the controller will tune.
    pub min_samples: usize,
    /// Accuracy delta that opens the hysteresis gate on its own.
    pub accuracy_hysteresis: f64,
    /// Deadline for one whole tick, I/O included.
    pub tick_deadline: Duration,
    /// Store address of the tuning parameter.
    pub parameter_address: StoreAddress,
    /// Store address of the companion tuning-profile entry.
    pub profile_address: StoreAddress,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            min_parameter: 1,
            max_parameter: 10,
            base_target: 5,
            latency_steps: vec![
                AdjustmentStep::new(20.0, 3),
                AdjustmentStep::new(50.0, 2),
                AdjustmentStep::new(100.0, 1),
                AdjustmentStep::new(200.0, 0),
            ],
            latency_fallback: -1,
            jitter_steps: vec![
                AdjustmentStep::new(5.0, 2),
                AdjustmentStep::new(15.0, 1),
                AdjustmentStep::new(30.0, 0),
            ],
            jitter_fallback: -1,
            loss_steps: vec![
                AdjustmentStep::new(0.1, 1),
                AdjustmentStep::new(1.0, 0),
            ],
            loss_fallback: -2,
            min_samples: 5,
            accuracy_hysteresis: 0.05,
            tick_deadline: Duration::from_secs(2),
            parameter_address: StoreAddress::new(r"software\attune\engine", "advantage"),
            profile_address: StoreAddress::new(r"software\attune\engine", "profile"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn step_tables_are_monotonic_in_their_input() {
        let config = ControllerConfig::default();
        let mut last = i32::MAX;
        for input in [0.0, 10.0, 30.0, 75.0, 150.0, 500.0] {
            let adj = evaluate_steps(&config.latency_steps, config.latency_fallback, input);
            assert!(adj <= last, "latency adjustment not monotonic at {input}");
            last = adj;
        }
    }

    #[test]
    fn default_latency_steps_match_the_heuristics() {
        let config = ControllerConfig::default();
        let f = |input| evaluate_steps(&config.latency_steps, config.latency_fallback, input);
        assert_eq!(f(10.0), 3);
        assert_eq!(f(35.0), 2);
        assert_eq!(f(80.0), 1);
        assert_eq!(f(150.0), 0);
        assert_eq!(f(350.0), -1);
    }

    #[test]
    fn non_finite_input_is_neutral() {
        let config = ControllerConfig::default();
        assert_eq!(
            evaluate_steps(&config.latency_steps, config.latency_fallback, f64::NAN),
            0
        );
        assert_eq!(
            evaluate_steps(&config.jitter_steps, config.jitter_fallback, f64::INFINITY),
            0
        );
    }

    #[test]
    fn empty_table_uses_fallback() {
        assert_eq!(evaluate_steps(&[], -2, 50.0), -2);
    }
}
