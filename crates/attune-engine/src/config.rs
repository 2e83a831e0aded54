//! Engine configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use attune_controller::ControllerConfig;
use attune_predictor::PredictorConfig;
use attune_stats::DetectorConfig;

/// Top-level configuration for a [`crate::TuningEngine`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Target handed to the network probe.
    pub probe_target: String,
    /// Period of the sampling loop.
    pub sample_interval: Duration,
    /// Period of the controller tick loop.
    pub tick_interval: Duration,
    /// Upper bound on a single probe or counter read.
    pub probe_timeout: Duration,
    /// How long `deactivate()` waits for a worker before declaring it an
    /// anomaly and aborting it.
    pub join_timeout: Duration,
    /// Capacity of each rolling sample window.
    pub window_capacity: usize,
    /// Controller tunables.
    pub controller: ControllerConfig,
    /// Pattern detector tunables.
    pub detector: DetectorConfig,
    /// Predictor tunables.
    pub predictor: PredictorConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            probe_target: "8.8.8.8:53".to_string(),
            sample_interval: Duration::from_millis(500),
            tick_interval: Duration::from_secs(2),
            probe_timeout: Duration::from_secs(1),
            join_timeout: Duration::from_secs(5),
            window_capacity: 64,
            controller: ControllerConfig::default(),
            detector: DetectorConfig::default(),
            predictor: PredictorConfig::default(),
        }
    }
}

impl EngineConfig {
    /// Validate the configuration; returns the first problem found.
    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.probe_target.is_empty() {
            return Err("probe target is empty".to_string());
        }
        if self.sample_interval.is_zero() || self.tick_interval.is_zero() {
            return Err("sampling and tick intervals must be non-zero".to_string());
        }
        if self.window_capacity == 0 {
            return Err("window capacity must be non-zero".to_string());
        }
        if self.controller.min_parameter >= self.controller.max_parameter {
            return Err(format!(
                "parameter bounds are inverted: [{}, {}]",
                self.controller.min_parameter, self.controller.max_parameter
            ));
        }
        Ok(())
    }
}
