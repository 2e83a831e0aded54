//! Samples and derived aggregate statistics.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The kind of metric a sample belongs to.
///
/// Each kind feeds exactly one rolling window; `Jitter` is derived from
/// consecutive latency samples rather than sampled directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MetricKind {
    /// Round-trip latency in milliseconds.
    Latency,
    /// Mean absolute difference between consecutive latency samples.
    Jitter,
    /// Packet loss percentage (0-100).
    PacketLoss,
    /// Process CPU usage percentage.
    CpuUsage,
    /// Process memory usage in megabytes.
    MemoryUsage,
    /// Applied tuning parameter history.
    Advantage,
}

impl std::fmt::Display for MetricKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MetricKind::Latency => write!(f, "latency"),
            MetricKind::Jitter => write!(f, "jitter"),
            MetricKind::PacketLoss => write!(f, "packet-loss"),
            MetricKind::CpuUsage => write!(f, "cpu-usage"),
            MetricKind::MemoryUsage => write!(f, "memory-usage"),
            MetricKind::Advantage => write!(f, "advantage"),
        }
    }
}

/// One timestamped scalar measurement. Immutable once created.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Sample {
    /// When the measurement was taken.
    pub timestamp: DateTime<Utc>,
    /// Which metric this sample measures.
    pub kind: MetricKind,
    /// The measured value, in the metric's native unit.
    pub value: f64,
}

impl Sample {
    /// Create a sample stamped with the current time.
    pub fn now(kind: MetricKind, value: f64) -> Self {
        Self {
            timestamp: Utc::now(),
            kind,
            value,
        }
    }
}

/// Derived statistics over the current windows.
///
/// Always recomputed from the rolling windows on demand, never mutated
/// independently.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AggregateSnapshot {
    /// Mean round-trip latency in milliseconds.
    pub avg_latency_ms: f64,
    /// Mean absolute difference between consecutive latency samples.
    pub avg_jitter_ms: f64,
    /// Mean packet loss percentage (0-100).
    pub packet_loss_pct: f64,
    /// Mean process CPU usage percentage.
    pub avg_cpu_pct: f64,
    /// Mean process memory usage in megabytes.
    pub avg_memory_mb: f64,
    /// Number of latency samples currently windowed.
    pub sample_count: usize,
    /// When the snapshot was derived.
    pub captured_at: DateTime<Utc>,
}

impl AggregateSnapshot {
    /// An empty snapshot with defined zero values.
    pub fn empty() -> Self {
        Self {
            avg_latency_ms: 0.0,
            avg_jitter_ms: 0.0,
            packet_loss_pct: 0.0,
            avg_cpu_pct: 0.0,
            avg_memory_mb: 0.0,
            sample_count: 0,
            captured_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sample_round_trips_through_json() {
        let sample = Sample::now(MetricKind::Latency, 42.5);
        let json = serde_json::to_string(&sample).unwrap();
        let back: Sample = serde_json::from_str(&json).unwrap();
        assert_eq!(back.kind, MetricKind::Latency);
        assert_eq!(back.value, 42.5);
    }

    #[test]
    fn empty_snapshot_is_zero_valued() {
        let snapshot = AggregateSnapshot::empty();
        assert_eq!(snapshot.avg_latency_ms, 0.0);
        assert_eq!(snapshot.sample_count, 0);
    }
}
