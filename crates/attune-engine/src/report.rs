//! Tuning report generation.
//!
//! Recommendations are produced by pure rule evaluation over an
//! [`AggregateSnapshot`], so they are deterministic and testable without
//! an engine.

use chrono::{DateTime, Utc};
use serde::Serialize;

use attune_types::{AggregateSnapshot, ControllerState, EngineState, Pattern};

/// Jitter above this suggests the link itself is unstable.
const JITTER_WARN_MS: f64 = 15.0;

/// Packet loss above this percentage is worth flagging.
const LOSS_WARN_PCT: f64 = 1.0;

/// Latency above this suggests a closer endpoint.
const LATENCY_WARN_MS: f64 = 100.0;

/// CPU above this percentage competes with the tuned workload.
const CPU_WARN_PCT: f64 = 80.0;

/// Point-in-time report over the engine.
#[derive(Debug, Clone, Serialize)]
pub struct TuningReport {
    /// When the report was generated.
    pub generated_at: DateTime<Utc>,
    /// Lifecycle state at generation time.
    pub engine_state: EngineState,
    /// Tuning state at generation time.
    pub controller: ControllerState,
    /// Statistics at generation time.
    pub snapshot: AggregateSnapshot,
    /// The most recently detected patterns, oldest first.
    pub recent_patterns: Vec<Pattern>,
    /// Rule-derived advice for the operator.
    pub recommendations: Vec<String>,
}

/// Evaluate the recommendation rules against a snapshot.
pub fn recommendations(snapshot: &AggregateSnapshot) -> Vec<String> {
    if snapshot.sample_count == 0 {
        return vec!["No samples collected yet; activate the engine and let it observe.".to_string()];
    }

    let mut advice = Vec::new();

    if snapshot.avg_jitter_ms > JITTER_WARN_MS {
        advice.push(format!(
            "Jitter is {:.1} ms; prefer a wired connection over Wi-Fi.",
            snapshot.avg_jitter_ms
        ));
    }
    if snapshot.packet_loss_pct > LOSS_WARN_PCT {
        advice.push(format!(
            "Packet loss at {:.1}%; check the link or reduce concurrent transfers.",
            snapshot.packet_loss_pct
        ));
    }
    if snapshot.avg_latency_ms > LATENCY_WARN_MS {
        advice.push(format!(
            "Average latency is {:.0} ms; a closer endpoint would tune better.",
            snapshot.avg_latency_ms
        ));
    }
    if snapshot.avg_cpu_pct > CPU_WARN_PCT {
        advice.push(format!(
            "CPU usage at {:.0}%; background load is competing with the tuned workload.",
            snapshot.avg_cpu_pct
        ));
    }

    if advice.is_empty() {
        advice.push("Conditions look healthy; no changes recommended.".to_string());
    }
    advice
}
