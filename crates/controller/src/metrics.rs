use lazy_static::lazy_static;
use prometheus::{Encoder, IntCounterVec, IntGauge, Opts, Registry, TextEncoder};

use crate::{Error, Result};

lazy_static! {
    pub static ref POD_EVENTS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new(
            "batch_controller_pod_events_total",
            "Pod events received from the watch, by event kind and outcome."
        ),
        &["event", "outcome"]
    )
    .expect("pod event counter definition is valid");
    pub static ref TRACKED_JOBS: IntGauge = IntGauge::new(
        "batch_controller_tracked_jobs",
        "Number of jobs currently held in the registry."
    )
    .expect("tracked jobs gauge definition is valid");
    pub static ref TRACKED_PODS: IntGauge = IntGauge::new(
        "batch_controller_tracked_pods",
        "Number of pods currently held in task buckets."
    )
    .expect("tracked pods gauge definition is valid");
    pub static ref REGISTRY: Registry = {
        let registry = Registry::new();
        registry
            .register(Box::new(POD_EVENTS_TOTAL.clone()))
            .expect("Failed to register POD_EVENTS_TOTAL");
        registry
            .register(Box::new(TRACKED_JOBS.clone()))
            .expect("Failed to register TRACKED_JOBS");
        registry
            .register(Box::new(TRACKED_PODS.clone()))
            .expect("Failed to register TRACKED_PODS");
        registry
    };
}

/// Renders all controller metrics in the Prometheus text format.
pub fn gather_metrics() -> Result<String> {
    let mut buffer = vec![];
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    encoder
        .encode(&metric_families, &mut buffer)
        .map_err(|e| Error::Internal(format!("Failed to encode metrics: {}", e)))?;
    String::from_utf8(buffer)
        .map_err(|e| Error::Internal(format!("Failed to convert metrics to string: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gathers_registered_metrics() {
        POD_EVENTS_TOTAL.with_label_values(&["added", "added"]).inc();
        let text = gather_metrics().unwrap();
        assert!(text.contains("batch_controller_pod_events_total"));
        assert!(text.contains("batch_controller_tracked_jobs"));
    }
}
