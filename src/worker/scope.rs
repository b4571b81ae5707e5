// Worker global scope - what a handler can reach
// Author: kelexine (https://github.com/kelexine)

use crate::cache::CacheStorage;
use crate::error::Result;
use crate::network::{FetchRequest, FetchResponse, Network};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Per-instance scope. Cache storage and network are shared by every
/// instance on the origin; the skip-waiting flag belongs to this one.
pub struct WorkerGlobalScope {
    caches: Arc<CacheStorage>,
    network: Arc<dyn Network>,
    skip_waiting: AtomicBool,
}

impl WorkerGlobalScope {
    pub fn new(caches: Arc<CacheStorage>, network: Arc<dyn Network>) -> Self {
        Self {
            caches,
            network,
            skip_waiting: AtomicBool::new(false),
        }
    }

    pub fn caches(&self) -> &Arc<CacheStorage> {
        &self.caches
    }

    pub fn network(&self) -> &Arc<dyn Network> {
        &self.network
    }

    pub async fn fetch(&self, request: FetchRequest) -> Result<FetchResponse> {
        self.network.fetch(request).await
    }

    /// Ask to be activated as soon as install completes, without waiting
    /// for the current controller to go away.
    pub fn skip_waiting(&self) {
        self.skip_waiting.store(true, Ordering::SeqCst);
    }

    pub fn skip_waiting_requested(&self) -> bool {
        self.skip_waiting.load(Ordering::SeqCst)
    }
}
