// Cache lifecycle manager - install, activate and fetch handlers
// Author: kelexine (https://github.com/kelexine)

use super::events::{ExtendableEvent, FetchEvent};
use super::scope::WorkerGlobalScope;
use crate::config::CacheConfig;
use crate::error::{OfflineError, Result};
use crate::metrics::{self, FetchSource};
use crate::network::{FetchRequest, FetchResponse};
use futures::future::try_join_all;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Event subscription interface a worker instance is built from.
///
/// Handlers are synchronous; asynchronous work is handed back through the
/// event (`wait_until`, `respond_with`) and awaited by the host.
pub trait LifecycleHandler: Send + Sync {
    fn on_install(&self, scope: &Arc<WorkerGlobalScope>, event: &mut ExtendableEvent);

    fn on_activate(&self, scope: &Arc<WorkerGlobalScope>, event: &mut ExtendableEvent);

    fn on_fetch(&self, scope: &Arc<WorkerGlobalScope>, event: &mut FetchEvent) -> Result<()>;
}

/// Owns one versioned cache bucket: fills it on install, drops every other
/// bucket on activate, and answers GETs network-first with cache fallback.
#[derive(Debug, Clone)]
pub struct CacheLifecycleManager {
    cache_name: Arc<str>,
    assets: Arc<[String]>,
}

impl CacheLifecycleManager {
    pub fn new(cache_name: impl Into<String>, assets: Vec<String>) -> Self {
        Self {
            cache_name: Arc::from(cache_name.into()),
            assets: Arc::from(assets),
        }
    }

    pub fn from_config(config: &CacheConfig) -> Self {
        Self::new(config.name.clone(), config.assets.clone())
    }

    pub fn cache_name(&self) -> &str {
        &self.cache_name
    }

    pub fn assets(&self) -> &[String] {
        &self.assets
    }
}

impl LifecycleHandler for CacheLifecycleManager {
    fn on_install(&self, scope: &Arc<WorkerGlobalScope>, event: &mut ExtendableEvent) {
        scope.skip_waiting();

        let scope = Arc::clone(scope);
        let name = Arc::clone(&self.cache_name);
        let assets = Arc::clone(&self.assets);
        event.wait_until(async move {
            let bucket = scope.caches().open(&name).await?;
            let stored = bucket.add_all(scope.network().as_ref(), &assets).await?;
            info!("Pre-cached {} asset(s) into '{}'", stored, name);
            metrics::update_cache_gauges(scope.caches(), &[]);
            Ok(())
        });
    }

    fn on_activate(&self, scope: &Arc<WorkerGlobalScope>, event: &mut ExtendableEvent) {
        let scope = Arc::clone(scope);
        let name = Arc::clone(&self.cache_name);
        event.wait_until(async move {
            let caches = scope.caches();
            let stale: Vec<String> = caches
                .keys()
                .into_iter()
                .filter(|key| key.as_str() != &*name)
                .collect();

            try_join_all(stale.iter().map(|key| caches.delete(key))).await?;
            if !stale.is_empty() {
                info!("Evicted {} stale bucket(s): {}", stale.len(), stale.join(", "));
            }
            metrics::update_cache_gauges(caches, &stale);
            Ok(())
        });
    }

    fn on_fetch(&self, scope: &Arc<WorkerGlobalScope>, event: &mut FetchEvent) -> Result<()> {
        // Only GET is ever answered from cache; everything else goes
        // through untouched
        if !event.request().is_get() {
            return Ok(());
        }

        let scope = Arc::clone(scope);
        let request = event.request().clone();
        event.respond_with(async move { network_first(&scope, request).await })
    }
}

/// Try the network; on a transport failure, replay a stored response from
/// any bucket. HTTP error statuses count as success and are returned as-is.
pub async fn network_first(scope: &WorkerGlobalScope, request: FetchRequest) -> Result<FetchResponse> {
    let url = request.url.clone();
    let network_error = match scope.fetch(request.clone()).await {
        Ok(response) => {
            metrics::record_fetch(FetchSource::Network);
            return Ok(response);
        }
        Err(e) => e,
    };

    debug!("Network failed for {}: {}, trying cache", url, network_error);
    match scope.caches().match_request(&request) {
        Some(response) => {
            info!("Served {} from cache (network: {})", url, network_error);
            metrics::record_fetch(FetchSource::Cache);
            Ok(response)
        }
        None => {
            warn!("Offline and not cached: {} ({})", url, network_error);
            metrics::record_fetch(FetchSource::Failed);
            Err(OfflineError::CacheMiss(url))
        }
    }
}
