//! Request and response values passed between the proxy, the worker and
//! the network.
//!
//! Author: kelexine (<https://github.com/kelexine>)

use bytes::Bytes;
use reqwest::header::HeaderMap;
use reqwest::Method;

/// An intercepted request. `url` is origin-relative (path plus query) and
/// doubles as the cache key.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchRequest {
    pub method: Method,
    pub url: String,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl FetchRequest {
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: HeaderMap::new(),
            body: Bytes::new(),
        }
    }

    /// Shorthand for a body-less GET, the only kind the cache ever answers.
    pub fn get(url: impl Into<String>) -> Self {
        Self::new(Method::GET, url)
    }

    pub fn with_headers(mut self, headers: HeaderMap) -> Self {
        self.headers = headers;
        self
    }

    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    pub fn is_get(&self) -> bool {
        self.method == Method::GET
    }
}

/// A fully buffered response, either fresh from the network or replayed
/// from a cache bucket.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchResponse {
    pub status: u16,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl FetchResponse {
    pub fn new(status: u16, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            body: body.into(),
        }
    }

    pub fn with_headers(mut self, headers: HeaderMap) -> Self {
        self.headers = headers;
        self
    }

    /// 2xx, the same test `Cache.addAll` applies before storing.
    pub fn ok(&self) -> bool {
        (200..300).contains(&self.status)
    }
}
