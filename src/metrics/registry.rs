// Prometheus metrics registry and collectors
// Author: kelexine (https://github.com/kelexine)

use lazy_static::lazy_static;
use prometheus::{
    register_counter_vec_with_registry, register_gauge_vec_with_registry,
    register_gauge_with_registry, CounterVec, Encoder, Gauge, GaugeVec, Opts, Registry,
    TextEncoder,
};

lazy_static! {
    /// Global Prometheus registry
    pub static ref REGISTRY: Registry = Registry::new();

    // ============================================================================
    // FETCH METRICS
    // ============================================================================

    /// Intercepted requests by where the response came from
    pub static ref FETCH_EVENTS: CounterVec = register_counter_vec_with_registry!(
        Opts::new("fetch_events_total", "Total requests seen by the worker"),
        &["source"], // source: network, cache, passthrough, failed
        REGISTRY
    ).unwrap();

    // ============================================================================
    // LIFECYCLE METRICS
    // ============================================================================

    /// Install and activate events
    pub static ref LIFECYCLE_EVENTS: CounterVec = register_counter_vec_with_registry!(
        Opts::new("lifecycle_events_total", "Total worker lifecycle events"),
        &["event", "outcome"], // event: install, activate; outcome: success, failure
        REGISTRY
    ).unwrap();

    // ============================================================================
    // CACHE METRICS
    // ============================================================================

    /// Buckets currently in cache storage
    pub static ref CACHE_BUCKETS: Gauge = register_gauge_with_registry!(
        Opts::new("cache_buckets_current", "Current number of cache buckets"),
        REGISTRY
    ).unwrap();

    /// Entries per bucket
    pub static ref CACHE_ENTRIES: GaugeVec = register_gauge_vec_with_registry!(
        Opts::new("cache_entries_current", "Current number of entries per cache bucket"),
        &["bucket"],
        REGISTRY
    ).unwrap();
}

/// Gather all metrics and return as Prometheus text format
pub fn gather_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::warn!("Failed to encode metrics: {}", e);
    }
    String::from_utf8_lossy(&buffer).into_owned()
}
