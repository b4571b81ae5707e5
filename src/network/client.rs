// Upstream HTTP client
// Author: kelexine (https://github.com/kelexine)

use super::models::{FetchRequest, FetchResponse};
use super::Network;
use crate::config::UpstreamConfig;
use crate::error::{OfflineError, Result};
use async_trait::async_trait;
use reqwest::header::HeaderMap;
use reqwest::{redirect, Client, Url};
use std::time::Duration;
use tracing::debug;

/// Connection-scoped headers that must not be relayed by a proxy, plus the
/// framing headers reqwest and hyper recompute for buffered bodies.
static HOP_BY_HOP: phf::Set<&'static str> = phf::phf_set! {
    "connection",
    "keep-alive",
    "proxy-authenticate",
    "proxy-authorization",
    "proxy-connection",
    "te",
    "trailer",
    "transfer-encoding",
    "upgrade",
    "host",
    "content-length",
};

/// Drop hop-by-hop headers, keeping everything end-to-end.
pub fn end_to_end_headers(headers: &HeaderMap) -> HeaderMap {
    headers
        .iter()
        .filter(|(name, _)| !HOP_BY_HOP.contains(name.as_str()))
        .map(|(name, value)| (name.clone(), value.clone()))
        .collect()
}

/// Network backed by the upstream origin.
///
/// Two pools are kept: intercepted requests never follow redirects so the
/// browser sees the upstream's 3xx untouched, while pre-caching follows them
/// the way `Cache.addAll` does.
pub struct HttpNetwork {
    client: Client,
    precache_client: Client,
    base_url: Url,
}

impl HttpNetwork {
    pub fn new(config: &UpstreamConfig) -> Result<Self> {
        let base_url = Url::parse(&config.base_url).map_err(|e| {
            OfflineError::Config(format!("Invalid upstream URL '{}': {}", config.base_url, e))
        })?;

        let client = Self::builder(config)
            .redirect(redirect::Policy::none())
            .build()
            .map_err(|e| OfflineError::Internal(format!("Failed to create HTTP client: {}", e)))?;
        let precache_client = Self::builder(config)
            .build()
            .map_err(|e| OfflineError::Internal(format!("Failed to create HTTP client: {}", e)))?;

        debug!("Created upstream HTTP clients for {}", base_url);

        Ok(Self {
            client,
            precache_client,
            base_url,
        })
    }

    fn builder(config: &UpstreamConfig) -> reqwest::ClientBuilder {
        Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .connect_timeout(Duration::from_secs(config.connect_timeout_seconds))
            .pool_max_idle_per_host(10)
            .pool_idle_timeout(Duration::from_secs(90))
            .tcp_keepalive(Some(Duration::from_secs(60)))
            .tcp_nodelay(true)
            .use_rustls_tls()
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Resolve an origin-relative URL against the upstream base.
    pub fn resolve(&self, url: &str) -> Result<Url> {
        self.base_url
            .join(url)
            .map_err(|e| OfflineError::InvalidRequest(format!("Cannot resolve '{}': {}", url, e)))
    }

    async fn send(&self, client: &Client, request: FetchRequest) -> Result<FetchResponse> {
        let target = self.resolve(&request.url)?;
        debug!("{} {}", request.method, target);

        let mut builder = client
            .request(request.method, target)
            .headers(end_to_end_headers(&request.headers));
        if !request.body.is_empty() {
            builder = builder.body(request.body);
        }

        // Transport failures only; any HTTP status is a successful fetch
        let response = builder
            .send()
            .await
            .map_err(|e| OfflineError::Network(e.to_string()))?;

        let status = response.status().as_u16();
        let headers = end_to_end_headers(response.headers());
        let body = response
            .bytes()
            .await
            .map_err(|e| OfflineError::Network(e.to_string()))?;

        Ok(FetchResponse {
            status,
            headers,
            body,
        })
    }
}

#[async_trait]
impl Network for HttpNetwork {
    async fn fetch(&self, request: FetchRequest) -> Result<FetchResponse> {
        self.send(&self.client, request).await
    }

    async fn fetch_for_cache(&self, url: &str) -> Result<FetchResponse> {
        self.send(&self.precache_client, FetchRequest::get(url)).await
    }
}
