//! Sample sources: network probes and process counters.
//!
//! These traits are the engine's consumed measurement interfaces. Real
//! deployments inject ICMP/TCP probes and OS counter readers; tests and
//! local runs use the simulated and fixed implementations below.

use std::time::Duration;

use async_trait::async_trait;
use rand::Rng;
use thiserror::Error;

/// One answered network probe.
#[derive(Debug, Clone, Copy)]
pub struct ProbeReading {
    /// Measured round-trip time.
    pub round_trip: Duration,
}

/// Process counters the engine samples.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CounterKind {
    /// CPU usage percentage.
    CpuPercent,
    /// Resident memory in megabytes.
    MemoryMb,
}

/// Probe errors. Timeouts are transient: the sampler records them as a
/// loss sample and moves on.
#[derive(Debug, Clone, Error)]
pub enum ProbeError {
    /// The probe did not answer in time.
    #[error("probe timed out")]
    Timeout,

    /// The target could not be reached at all.
    #[error("target unreachable: {0}")]
    Unreachable(String),

    /// A process counter could not be read.
    #[error("counter unavailable: {0}")]
    CounterUnavailable(String),
}

/// A single network measurement source.
#[async_trait]
pub trait NetworkProbe: Send + Sync {
    /// Measure the round-trip time to `target`.
    async fn probe(&self, target: &str) -> Result<ProbeReading, ProbeError>;
}

/// A process resource counter source.
#[async_trait]
pub trait ResourceSampler: Send + Sync {
    /// Read the current value of a counter.
    async fn read_counter(&self, kind: CounterKind) -> Result<f64, ProbeError>;
}

/// Simulated network probe for local runs: a base round-trip time with
/// uniform jitter and an occasional simulated drop.
#[derive(Debug, Clone)]
pub struct SimulatedProbe {
    /// Center of the simulated round-trip time, in milliseconds.
    pub base_ms: f64,
    /// Uniform jitter applied around the base, in milliseconds.
    pub jitter_ms: f64,
    /// Probability in [0, 1] that a probe is dropped.
    pub loss_probability: f64,
}

impl Default for SimulatedProbe {
    fn default() -> Self {
        Self {
            base_ms: 30.0,
            jitter_ms: 8.0,
            loss_probability: 0.01,
        }
    }
}

#[async_trait]
impl NetworkProbe for SimulatedProbe {
    async fn probe(&self, _target: &str) -> Result<ProbeReading, ProbeError> {
        let (dropped, rtt_ms) = {
            let mut rng = rand::thread_rng();
            let dropped = rng.gen_bool(self.loss_probability.clamp(0.0, 1.0));
            let rtt_ms =
                (self.base_ms + rng.gen_range(-self.jitter_ms..=self.jitter_ms)).max(0.1);
            (dropped, rtt_ms)
        };
        if dropped {
            return Err(ProbeError::Timeout);
        }
        Ok(ProbeReading {
            round_trip: Duration::from_secs_f64(rtt_ms / 1000.0),
        })
    }
}

/// Simulated process counters for local runs.
#[derive(Debug, Clone)]
pub struct SimulatedResources {
    /// Center of the simulated CPU percentage.
    pub cpu_pct: f64,
    /// Center of the simulated memory footprint in megabytes.
    pub memory_mb: f64,
}

impl Default for SimulatedResources {
    fn default() -> Self {
        Self {
            cpu_pct: 20.0,
            memory_mb: 256.0,
        }
    }
}

#[async_trait]
impl ResourceSampler for SimulatedResources {
    async fn read_counter(&self, kind: CounterKind) -> Result<f64, ProbeError> {
        let jittered = |center: f64| {
            let mut rng = rand::thread_rng();
            (center * rng.gen_range(0.9..=1.1)).max(0.0)
        };
        Ok(match kind {
            CounterKind::CpuPercent => jittered(self.cpu_pct).min(100.0),
            CounterKind::MemoryMb => jittered(self.memory_mb),
        })
    }
}

/// Probe that always answers with the same round-trip time.
#[derive(Debug, Clone)]
pub struct FixedProbe {
    /// Round-trip time returned for every probe.
    pub rtt_ms: f64,
}

impl FixedProbe {
    /// Answer every probe in `rtt_ms` milliseconds.
    pub fn new(rtt_ms: f64) -> Self {
        Self { rtt_ms }
    }
}

#[async_trait]
impl NetworkProbe for FixedProbe {
    async fn probe(&self, _target: &str) -> Result<ProbeReading, ProbeError> {
        Ok(ProbeReading {
            round_trip: Duration::from_secs_f64(self.rtt_ms / 1000.0),
        })
    }
}

/// Probe that always times out.
#[derive(Debug, Clone, Default)]
pub struct TimeoutProbe;

#[async_trait]
impl NetworkProbe for TimeoutProbe {
    async fn probe(&self, _target: &str) -> Result<ProbeReading, ProbeError> {
        Err(ProbeError::Timeout)
    }
}

/// Resource sampler that always returns the same counters.
#[derive(Debug, Clone)]
pub struct FixedResources {
    /// CPU percentage returned for every read.
    pub cpu_pct: f64,
    /// Memory megabytes returned for every read.
    pub memory_mb: f64,
}

impl FixedResources {
    /// Always report the given counters.
    pub fn new(cpu_pct: f64, memory_mb: f64) -> Self {
        Self { cpu_pct, memory_mb }
    }
}

#[async_trait]
impl ResourceSampler for FixedResources {
    async fn read_counter(&self, kind: CounterKind) -> Result<f64, ProbeError> {
        Ok(match kind {
            CounterKind::CpuPercent => self.cpu_pct,
            CounterKind::MemoryMb => self.memory_mb,
        })
    }
}
