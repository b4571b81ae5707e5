// Worker registration - which instance controls the origin
// Author: kelexine (https://github.com/kelexine)

use super::lifecycle::LifecycleHandler;
use super::runtime::WorkerRuntime;
use crate::cache::CacheStorage;
use crate::error::Result;
use crate::metrics::{self, FetchSource};
use crate::network::{FetchRequest, FetchResponse, Network};
use parking_lot::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::info;

/// Holds the active (controlling) instance and at most one installed
/// instance waiting to replace it.
pub struct Registration {
    caches: Arc<CacheStorage>,
    network: Arc<dyn Network>,
    active: RwLock<Option<Arc<WorkerRuntime>>>,
    waiting: RwLock<Option<Arc<WorkerRuntime>>>,
    next_id: AtomicU64,
}

impl Registration {
    pub fn new(caches: Arc<CacheStorage>, network: Arc<dyn Network>) -> Self {
        Self {
            caches,
            network,
            active: RwLock::new(None),
            waiting: RwLock::new(None),
            next_id: AtomicU64::new(1),
        }
    }

    pub fn caches(&self) -> &Arc<CacheStorage> {
        &self.caches
    }

    /// The instance currently intercepting requests.
    pub fn active(&self) -> Option<Arc<WorkerRuntime>> {
        self.active.read().clone()
    }

    pub fn waiting(&self) -> Option<Arc<WorkerRuntime>> {
        self.waiting.read().clone()
    }

    /// Install a new version alongside the current one.
    ///
    /// The previous controller keeps serving until the new instance has
    /// activated. If the new instance asked to skip waiting, or nothing is
    /// active yet, it is activated straight away; otherwise it is parked
    /// until [`activate_waiting`](Self::activate_waiting).
    pub async fn update(
        &self,
        version: impl Into<String>,
        handler: Arc<dyn LifecycleHandler>,
    ) -> Result<Arc<WorkerRuntime>> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let worker = Arc::new(WorkerRuntime::new(
            id,
            version,
            Arc::clone(&self.caches),
            Arc::clone(&self.network),
            handler,
        ));

        worker.install().await?;

        if worker.skip_waiting_requested() || self.active().is_none() {
            self.promote(Arc::clone(&worker)).await?;
        } else {
            info!(
                "Worker #{} ({}) installed, waiting for the current controller",
                worker.id(),
                worker.version()
            );
            if let Some(previous) = self.waiting.write().replace(Arc::clone(&worker)) {
                previous.retire();
            }
        }

        Ok(worker)
    }

    /// Promote the waiting instance, if any.
    pub async fn activate_waiting(&self) -> Result<Option<Arc<WorkerRuntime>>> {
        let Some(worker) = self.waiting.write().take() else {
            return Ok(None);
        };
        self.promote(Arc::clone(&worker)).await?;
        Ok(Some(worker))
    }

    async fn promote(&self, worker: Arc<WorkerRuntime>) -> Result<()> {
        worker.activate().await?;
        let previous = self.active.write().replace(Arc::clone(&worker));
        if let Some(previous) = previous {
            info!(
                "Worker #{} ({}) replaced #{} ({})",
                worker.id(),
                worker.version(),
                previous.id(),
                previous.version()
            );
            previous.retire();
        }
        Ok(())
    }

    /// Answer a request through the active controller, or straight from the
    /// network when there is none.
    pub async fn fetch(&self, request: FetchRequest) -> Result<FetchResponse> {
        match self.active() {
            Some(worker) => worker.dispatch_fetch(request).await,
            None => {
                metrics::record_fetch(FetchSource::Passthrough);
                self.network.fetch(request).await
            }
        }
    }
}
