// Shared test doubles
// Author: kelexine (https://github.com/kelexine)

#![allow(dead_code)]

use async_trait::async_trait;
use kegama_offline::error::{OfflineError, Result};
use kegama_offline::network::{FetchRequest, FetchResponse, Network};
use kegama_offline::worker::{ExtendableEvent, FetchEvent, LifecycleHandler, WorkerGlobalScope};
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// In-memory upstream origin that can be switched off.
pub struct FakeOrigin {
    pages: RwLock<HashMap<String, FetchResponse>>,
    online: AtomicBool,
    calls: Mutex<Vec<String>>,
}

impl FakeOrigin {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            pages: RwLock::new(HashMap::new()),
            online: AtomicBool::new(true),
            calls: Mutex::new(Vec::new()),
        })
    }

    /// Origin serving `200 <url>` for each listed URL.
    pub fn with_pages(urls: &[&str]) -> Arc<Self> {
        let origin = Self::new();
        for url in urls {
            origin.serve(url, 200, &format!("network {}", url));
        }
        origin
    }

    pub fn serve(&self, url: &str, status: u16, body: &str) {
        self.pages
            .write()
            .insert(url.to_string(), FetchResponse::new(status, body.to_string()));
    }

    pub fn go_offline(&self) {
        self.online.store(false, Ordering::SeqCst);
    }

    pub fn go_online(&self) {
        self.online.store(true, Ordering::SeqCst);
    }

    /// `"METHOD url"` for every request that reached the origin.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }
}

#[async_trait]
impl Network for FakeOrigin {
    async fn fetch(&self, request: FetchRequest) -> Result<FetchResponse> {
        if !self.online.load(Ordering::SeqCst) {
            return Err(OfflineError::Network("connection refused".to_string()));
        }
        self.calls
            .lock()
            .push(format!("{} {}", request.method, request.url));

        Ok(self
            .pages
            .read()
            .get(&request.url)
            .cloned()
            .unwrap_or_else(|| FetchResponse::new(404, "not found")))
    }
}

/// Handler that installs an empty bucket and never asks to skip waiting.
pub struct PatientHandler {
    pub cache_name: String,
}

impl LifecycleHandler for PatientHandler {
    fn on_install(&self, scope: &Arc<WorkerGlobalScope>, event: &mut ExtendableEvent) {
        let scope = Arc::clone(scope);
        let name = self.cache_name.clone();
        event.wait_until(async move {
            scope.caches().open(&name).await?;
            Ok(())
        });
    }

    fn on_activate(&self, _scope: &Arc<WorkerGlobalScope>, _event: &mut ExtendableEvent) {}

    fn on_fetch(&self, _scope: &Arc<WorkerGlobalScope>, _event: &mut FetchEvent) -> Result<()> {
        Ok(())
    }
}

pub fn assets(urls: &[&str]) -> Vec<String> {
    urls.iter().map(|s| s.to_string()).collect()
}
