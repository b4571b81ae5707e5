//! Lifecycle and fetch events dispatched to a [`LifecycleHandler`].
//!
//! Handlers run synchronously and hand their asynchronous work back to the
//! host as boxed futures: `wait_until` for install/activate, `respond_with`
//! for fetch. The host awaits those futures before it moves the worker to
//! its next state or answers the request.
//!
//! [`LifecycleHandler`]: super::LifecycleHandler
//!
//! Author: kelexine (<https://github.com/kelexine>)

use crate::error::{OfflineError, Result};
use crate::network::{FetchRequest, FetchResponse};
use futures::future::{try_join_all, BoxFuture};
use futures::FutureExt;
use std::future::Future;
use tracing::debug;

pub type EventFuture = BoxFuture<'static, Result<()>>;
pub type ResponseFuture = BoxFuture<'static, Result<FetchResponse>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    Install,
    Activate,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::Install => "install",
            EventKind::Activate => "activate",
        }
    }
}

/// An install or activate event, held open until every operation passed to
/// [`wait_until`](Self::wait_until) has resolved.
pub struct ExtendableEvent {
    kind: EventKind,
    pending: Vec<EventFuture>,
}

impl ExtendableEvent {
    pub fn new(kind: EventKind) -> Self {
        Self {
            kind,
            pending: Vec::new(),
        }
    }

    /// Extend the event's lifetime until `operation` resolves. A failed
    /// operation fails the event.
    pub fn wait_until<F>(&mut self, operation: F)
    where
        F: Future<Output = Result<()>> + Send + 'static,
    {
        self.pending.push(operation.boxed());
    }

    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    /// Drive every extension concurrently; the first failure wins.
    pub async fn settle(self) -> Result<()> {
        debug!(
            "Settling {} event with {} extension(s)",
            self.kind.as_str(),
            self.pending.len()
        );
        try_join_all(self.pending).await.map(|_| ())
    }
}

/// An intercepted request. A handler that does not call
/// [`respond_with`](Self::respond_with) lets it fall through to the network.
pub struct FetchEvent {
    request: FetchRequest,
    response: Option<ResponseFuture>,
}

impl FetchEvent {
    pub fn new(request: FetchRequest) -> Self {
        Self {
            request,
            response: None,
        }
    }

    pub fn request(&self) -> &FetchRequest {
        &self.request
    }

    /// Claim the request. Only the first call wins.
    pub fn respond_with<F>(&mut self, response: F) -> Result<()>
    where
        F: Future<Output = Result<FetchResponse>> + Send + 'static,
    {
        if self.response.is_some() {
            return Err(OfflineError::InvalidState {
                expected: "respond_with not yet called".to_string(),
                actual: "respond_with already called".to_string(),
            });
        }
        self.response = Some(response.boxed());
        Ok(())
    }

    pub fn was_responded(&self) -> bool {
        self.response.is_some()
    }

    pub fn into_parts(self) -> (FetchRequest, Option<ResponseFuture>) {
        (self.request, self.response)
    }
}
