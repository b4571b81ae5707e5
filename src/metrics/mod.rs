// Metrics module for Prometheus observability
// Author: kelexine (https://github.com/kelexine)

mod registry;

use crate::cache::CacheStorage;

pub use registry::{gather_metrics, CACHE_BUCKETS, CACHE_ENTRIES, FETCH_EVENTS, LIFECYCLE_EVENTS};

/// Where an intercepted request's response came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchSource {
    Network,
    Cache,
    Passthrough,
    Failed,
}

impl FetchSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            FetchSource::Network => "network",
            FetchSource::Cache => "cache",
            FetchSource::Passthrough => "passthrough",
            FetchSource::Failed => "failed",
        }
    }
}

pub fn record_fetch(source: FetchSource) {
    FETCH_EVENTS.with_label_values(&[source.as_str()]).inc();
}

pub fn record_lifecycle(event: &str, success: bool) {
    let outcome = if success { "success" } else { "failure" };
    LIFECYCLE_EVENTS.with_label_values(&[event, outcome]).inc();
}

/// Refresh the bucket gauges from the storage's current contents.
pub fn update_cache_gauges(storage: &CacheStorage, removed: &[String]) {
    for name in removed {
        let _ = CACHE_ENTRIES.remove_label_values(&[name.as_str()]);
    }

    let names = storage.keys();
    CACHE_BUCKETS.set(names.len() as f64);
    for name in names {
        if let Some(bucket) = storage.get(&name) {
            CACHE_ENTRIES
                .with_label_values(&[name.as_str()])
                .set(bucket.len() as f64);
        }
    }
}
