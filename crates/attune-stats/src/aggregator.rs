//! Per-engine rolling window set and snapshot derivation.

use chrono::Utc;
use tracing::trace;

use attune_types::{AggregateSnapshot, MetricKind, Sample};

use crate::window::RollingWindow;

/// Loss sample recorded for a probe that timed out.
const LOSS_SAMPLE_TIMEOUT: f64 = 100.0;

/// Loss sample recorded for a probe that answered.
const LOSS_SAMPLE_OK: f64 = 0.0;

/// Owns the rolling windows for every sampled metric and derives
/// [`AggregateSnapshot`]s from them.
///
/// The aggregator itself is not synchronized; the engine wraps it in a
/// read-write lock so the sampler (sole writer) and the controller
/// (reader) observe consistent contents. Snapshot derivation copies
/// nothing it does not need and never mutates the windows.
#[derive(Debug)]
pub struct StatsAggregator {
    latency: RollingWindow,
    loss: RollingWindow,
    cpu: RollingWindow,
    memory: RollingWindow,
    advantage: RollingWindow,
}

impl StatsAggregator {
    /// Create an aggregator whose windows each hold `window_capacity`
    /// samples.
    pub fn new(window_capacity: usize) -> Self {
        Self {
            latency: RollingWindow::new(window_capacity),
            loss: RollingWindow::new(window_capacity),
            cpu: RollingWindow::new(window_capacity),
            memory: RollingWindow::new(window_capacity),
            advantage: RollingWindow::new(window_capacity),
        }
    }

    /// Route a sample to the one window that consumes its metric kind.
    pub fn record(&mut self, sample: Sample) {
        match sample.kind {
            MetricKind::Latency => self.latency.push(sample.value),
            MetricKind::PacketLoss => self.loss.push(sample.value),
            MetricKind::CpuUsage => self.cpu.push(sample.value),
            MetricKind::MemoryUsage => self.memory.push(sample.value),
            MetricKind::Advantage => self.advantage.push(sample.value),
            // Jitter is derived from consecutive latency samples, never
            // sampled directly.
            MetricKind::Jitter => trace!("ignoring direct jitter sample"),
        }
    }

    /// Record the outcome of one network probe.
    ///
    /// An answered probe contributes its round-trip time to the latency
    /// window and a zero to the loss window; a timed-out probe contributes
    /// only a 100% loss sample, so the latency statistics are not skewed
    /// by sentinel values.
    pub fn record_probe(&mut self, round_trip_ms: Option<f64>) {
        match round_trip_ms {
            Some(rtt) => {
                self.record(Sample::now(MetricKind::Latency, rtt));
                self.record(Sample::now(MetricKind::PacketLoss, LOSS_SAMPLE_OK));
            }
            None => {
                self.record(Sample::now(MetricKind::PacketLoss, LOSS_SAMPLE_TIMEOUT));
            }
        }
        trace!(samples = self.latency.len(), "probe recorded");
    }

    /// Record a CPU usage sample (percent).
    pub fn record_cpu(&mut self, percent: f64) {
        self.record(Sample::now(MetricKind::CpuUsage, percent));
    }

    /// Record a memory usage sample (megabytes).
    pub fn record_memory(&mut self, megabytes: f64) {
        self.record(Sample::now(MetricKind::MemoryUsage, megabytes));
    }

    /// Record an applied tuning parameter.
    pub fn record_advantage(&mut self, parameter: i32) {
        self.record(Sample::now(MetricKind::Advantage, parameter as f64));
    }

    /// The latency window, for pattern detection.
    pub fn latency_window(&self) -> &RollingWindow {
        &self.latency
    }

    /// The newest `n` latency samples, oldest first, for predictor input.
    pub fn recent_latency(&self, n: usize) -> Vec<f64> {
        self.latency.last_n(n)
    }

    /// The applied-parameter history, oldest first.
    pub fn advantage_history(&self) -> Vec<f64> {
        self.advantage.values()
    }

    /// Derive a snapshot of the current windows.
    pub fn snapshot(&self) -> AggregateSnapshot {
        AggregateSnapshot {
            avg_latency_ms: self.latency.mean(),
            avg_jitter_ms: self.latency.jitter(),
            packet_loss_pct: self.loss.mean(),
            avg_cpu_pct: self.cpu.mean(),
            avg_memory_mb: self.memory.mean(),
            sample_count: self.latency.len(),
            captured_at: Utc::now(),
        }
    }
}
