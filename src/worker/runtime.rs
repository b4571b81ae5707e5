// Worker runtime - drives one worker instance through its lifecycle
// Author: kelexine (https://github.com/kelexine)

use super::events::{EventKind, ExtendableEvent, FetchEvent};
use super::lifecycle::LifecycleHandler;
use super::scope::WorkerGlobalScope;
use super::state::WorkerState;
use crate::cache::CacheStorage;
use crate::error::{OfflineError, Result};
use crate::metrics::{self, FetchSource};
use crate::network::{FetchRequest, FetchResponse, Network};
use parking_lot::RwLock;
use std::sync::Arc;
use tracing::{debug, error, info};

/// One worker instance: a handler, its scope, and where it is in the
/// lifecycle.
pub struct WorkerRuntime {
    id: u64,
    version: String,
    scope: Arc<WorkerGlobalScope>,
    handler: Arc<dyn LifecycleHandler>,
    state: RwLock<WorkerState>,
}

impl WorkerRuntime {
    pub fn new(
        id: u64,
        version: impl Into<String>,
        caches: Arc<CacheStorage>,
        network: Arc<dyn Network>,
        handler: Arc<dyn LifecycleHandler>,
    ) -> Self {
        Self {
            id,
            version: version.into(),
            scope: Arc::new(WorkerGlobalScope::new(caches, network)),
            handler,
            state: RwLock::new(WorkerState::Parsed),
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn state(&self) -> WorkerState {
        *self.state.read()
    }

    pub fn scope(&self) -> &Arc<WorkerGlobalScope> {
        &self.scope
    }

    pub fn skip_waiting_requested(&self) -> bool {
        self.scope.skip_waiting_requested()
    }

    fn set_state(&self, new_state: WorkerState) {
        let mut state = self.state.write();
        debug!("Worker #{} ({}): {} -> {}", self.id, self.version, *state, new_state);
        *state = new_state;
    }

    /// Move from `expected` to `next`, or fail without touching the state.
    fn transition(&self, expected: WorkerState, next: WorkerState) -> Result<()> {
        let mut state = self.state.write();
        if *state != expected {
            return Err(OfflineError::InvalidState {
                expected: expected.to_string(),
                actual: state.to_string(),
            });
        }
        debug!("Worker #{} ({}): {} -> {}", self.id, self.version, *state, next);
        *state = next;
        Ok(())
    }

    /// Dispatch the install event and wait for everything it extended.
    /// A failure leaves the instance redundant.
    pub async fn install(&self) -> Result<()> {
        self.transition(WorkerState::Parsed, WorkerState::Installing)?;

        let mut event = ExtendableEvent::new(EventKind::Install);
        self.handler.on_install(&self.scope, &mut event);

        match event.settle().await {
            Ok(()) => {
                self.set_state(WorkerState::Installed);
                metrics::record_lifecycle(EventKind::Install.as_str(), true);
                info!("Worker #{} ({}) installed", self.id, self.version);
                Ok(())
            }
            Err(e) => {
                self.set_state(WorkerState::Redundant);
                metrics::record_lifecycle(EventKind::Install.as_str(), false);
                error!("Worker #{} ({}) install failed: {}", self.id, self.version, e);
                Err(OfflineError::Install(e.to_string()))
            }
        }
    }

    /// Dispatch the activate event. Only an installed instance activates.
    pub async fn activate(&self) -> Result<()> {
        self.transition(WorkerState::Installed, WorkerState::Activating)?;

        let mut event = ExtendableEvent::new(EventKind::Activate);
        self.handler.on_activate(&self.scope, &mut event);

        match event.settle().await {
            Ok(()) => {
                self.set_state(WorkerState::Activated);
                metrics::record_lifecycle(EventKind::Activate.as_str(), true);
                info!("Worker #{} ({}) activated", self.id, self.version);
                Ok(())
            }
            Err(e) => {
                self.set_state(WorkerState::Redundant);
                metrics::record_lifecycle(EventKind::Activate.as_str(), false);
                error!("Worker #{} ({}) activation failed: {}", self.id, self.version, e);
                Err(OfflineError::Activation(e.to_string()))
            }
        }
    }

    /// Retire this instance after a newer one took over.
    pub fn retire(&self) {
        self.set_state(WorkerState::Redundant);
    }

    /// Route one request through the fetch handler. Requests the handler
    /// declines, or that arrive before activation, go straight to the
    /// network.
    pub async fn dispatch_fetch(&self, request: FetchRequest) -> Result<FetchResponse> {
        if !self.state().can_intercept_fetch() {
            metrics::record_fetch(FetchSource::Passthrough);
            return self.scope.fetch(request).await;
        }

        let mut event = FetchEvent::new(request);
        self.handler.on_fetch(&self.scope, &mut event)?;

        match event.into_parts() {
            (_, Some(response)) => response.await,
            (request, None) => {
                metrics::record_fetch(FetchSource::Passthrough);
                self.scope.fetch(request).await
            }
        }
    }
}

impl std::fmt::Debug for WorkerRuntime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkerRuntime")
            .field("id", &self.id)
            .field("version", &self.version)
            .field("state", &self.state())
            .finish()
    }
}
