// Network module - the fetch pathway to the upstream origin
// Author: kelexine (https://github.com/kelexine)

mod client;
pub mod models;

pub use client::{end_to_end_headers, HttpNetwork};
pub use models::{FetchRequest, FetchResponse};

use crate::error::Result;
use async_trait::async_trait;

/// Anything that can answer a request from the live network.
///
/// Errors returned here are transport failures. An HTTP error status is
/// still `Ok`.
#[async_trait]
pub trait Network: Send + Sync {
    /// Fetch on behalf of an intercepted request.
    async fn fetch(&self, request: FetchRequest) -> Result<FetchResponse>;

    /// Fetch a manifest URL for pre-caching.
    async fn fetch_for_cache(&self, url: &str) -> Result<FetchResponse> {
        self.fetch(FetchRequest::get(url)).await
    }
}
