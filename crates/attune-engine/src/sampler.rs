//! The sampling worker loop.

use std::sync::Arc;

use tokio::sync::{broadcast, watch, RwLock};
use tokio::time::{interval, timeout};
use tracing::{debug, warn};

use attune_controller::AdaptiveController;
use attune_stats::StatsAggregator;
use attune_types::{EventSeverity, EventSource, TuneEvent, TuneEventEnvelope};

use crate::config::EngineConfig;
use crate::probe::{CounterKind, NetworkProbe, ResourceSampler};

/// Everything one sampling loop needs; cloned into the spawned task.
pub(crate) struct SamplerContext {
    pub config: EngineConfig,
    pub probe: Arc<dyn NetworkProbe>,
    pub resources: Arc<dyn ResourceSampler>,
    pub aggregator: Arc<RwLock<StatsAggregator>>,
    pub controller: Arc<AdaptiveController>,
    pub event_tx: broadcast::Sender<TuneEventEnvelope>,
}

/// Interval-driven sampling loop.
///
/// Every iteration is error-wrapped: a failed probe or counter read
/// degrades to "skip and log", never to loop death. The cancellation
/// signal is observed at every await point.
pub(crate) async fn sampling_loop(ctx: SamplerContext, mut cancel: watch::Receiver<bool>) {
    let mut ticker = interval(ctx.config.sample_interval);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                sample_once(&ctx).await;
            }
            changed = cancel.changed() => {
                if changed.is_err() || *cancel.borrow() {
                    break;
                }
            }
        }
    }

    debug!("sampling loop stopped");
}

async fn sample_once(ctx: &SamplerContext) {
    // Probe the network. A timeout (ours or the probe's own) becomes a
    // loss sample; the latency window only sees real answers.
    let rtt_ms = match timeout(
        ctx.config.probe_timeout,
        ctx.probe.probe(&ctx.config.probe_target),
    )
    .await
    {
        Ok(Ok(reading)) => Some(reading.round_trip.as_secs_f64() * 1000.0),
        Ok(Err(e)) => {
            debug!(target = %ctx.config.probe_target, error = %e, "probe failed");
            None
        }
        Err(_) => {
            debug!(target = %ctx.config.probe_target, "probe exceeded timeout");
            None
        }
    };

    let cpu = read_counter(ctx, CounterKind::CpuPercent).await;
    let memory = read_counter(ctx, CounterKind::MemoryMb).await;

    let snapshot = {
        let mut aggregator = ctx.aggregator.write().await;
        aggregator.record_probe(rtt_ms);
        if let Some(cpu) = cpu {
            aggregator.record_cpu(cpu);
        }
        if let Some(memory) = memory {
            aggregator.record_memory(memory);
        }
        aggregator.snapshot()
    };

    let controller = ctx.controller.state().await;
    let _ = ctx.event_tx.send(TuneEventEnvelope::new(
        TuneEvent::StatsUpdated {
            snapshot,
            controller,
        },
        EventSource::Sampler,
        EventSeverity::Debug,
    ));
}

async fn read_counter(ctx: &SamplerContext, kind: CounterKind) -> Option<f64> {
    match timeout(ctx.config.probe_timeout, ctx.resources.read_counter(kind)).await {
        Ok(Ok(value)) if value.is_finite() => Some(value),
        Ok(Ok(value)) => {
            warn!(?kind, value, "discarding non-finite counter reading");
            None
        }
        Ok(Err(e)) => {
            debug!(?kind, error = %e, "counter read failed");
            None
        }
        Err(_) => {
            debug!(?kind, "counter read exceeded timeout");
            None
        }
    }
}
