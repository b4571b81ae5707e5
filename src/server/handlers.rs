// HTTP request handlers
// Author: kelexine (https://github.com/kelexine)

use super::routes::AppState;
use crate::error::OfflineError;
use crate::metrics::gather_metrics;
use crate::network::{FetchRequest, FetchResponse};
use axum::body::Body;
use axum::extract::{Request, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::debug;

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: HealthStatus,
    pub checks: HashMap<String, HealthCheck>,
    pub timestamp: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Degraded,
    Unhealthy,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthCheck {
    pub status: String,
    pub message: String,
}

pub async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    let mut checks = HashMap::new();
    let mut overall_status = HealthStatus::Healthy;

    // Worker: without a controller every request is plain pass-through
    let worker_check = match state.registration.active() {
        Some(worker) if worker.state().can_intercept_fetch() => HealthCheck {
            status: "ok".to_string(),
            message: format!("Worker #{} ({}) {}", worker.id(), worker.version(), worker.state()),
        },
        Some(worker) => {
            overall_status = HealthStatus::Degraded;
            HealthCheck {
                status: "warning".to_string(),
                message: format!("Worker #{} ({}) {}", worker.id(), worker.version(), worker.state()),
            }
        }
        None => {
            overall_status = HealthStatus::Degraded;
            HealthCheck {
                status: "warning".to_string(),
                message: "No active worker, serving pass-through".to_string(),
            }
        }
    };
    checks.insert("worker".to_string(), worker_check);

    if let Some(waiting) = state.registration.waiting() {
        checks.insert(
            "waiting_worker".to_string(),
            HealthCheck {
                status: "info".to_string(),
                message: format!("Worker #{} ({}) waiting", waiting.id(), waiting.version()),
            },
        );
    }

    // Current cache bucket
    let caches = state.registration.caches();
    let cache_name = &state.config.cache.name;
    let cache_check = match caches.get(cache_name) {
        Some(bucket) => HealthCheck {
            status: "ok".to_string(),
            message: format!(
                "'{}' holds {}/{} manifest assets; buckets: [{}]",
                cache_name,
                bucket.len(),
                state.config.cache.assets.len(),
                caches.keys().join(", ")
            ),
        },
        None => {
            overall_status = HealthStatus::Unhealthy;
            HealthCheck {
                status: "error".to_string(),
                message: format!("Cache bucket '{}' missing, offline fallback unavailable", cache_name),
            }
        }
    };
    checks.insert("cache".to_string(), cache_check);

    let upstream_check = HealthCheck {
        status: "ok".to_string(),
        message: format!("Upstream: {}", state.config.upstream.base_url),
    };
    checks.insert("upstream".to_string(), upstream_check);

    Json(HealthResponse {
        status: overall_status,
        checks,
        timestamp: chrono::Utc::now().to_rfc3339(),
    })
}

pub async fn metrics_handler() -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        gather_metrics(),
    )
}

/// Every other path: hand the request to the worker.
pub async fn proxy_handler(
    State(state): State<AppState>,
    request: Request,
) -> Result<Response, OfflineError> {
    let (parts, body) = request.into_parts();
    let url = parts
        .uri
        .path_and_query()
        .map(|pq| pq.as_str().to_string())
        .unwrap_or_else(|| "/".to_string());

    let body = axum::body::to_bytes(body, state.config.server.max_body_bytes)
        .await
        .map_err(|e| OfflineError::InvalidRequest(format!("Failed to read request body: {}", e)))?;

    debug!("Intercepted {} {}", parts.method, url);

    let request = FetchRequest::new(parts.method, url)
        .with_headers(parts.headers)
        .with_body(body);

    let response = state.registration.fetch(request).await?;
    Ok(response.into_response())
}

impl IntoResponse for FetchResponse {
    fn into_response(self) -> Response {
        let mut response = Response::new(Body::from(self.body));
        *response.status_mut() = StatusCode::from_u16(self.status).unwrap_or(StatusCode::BAD_GATEWAY);
        *response.headers_mut() = self.headers;
        response
    }
}
