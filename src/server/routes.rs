// HTTP routes configuration
// Author: kelexine (https://github.com/kelexine)

use super::handlers::{health_handler, metrics_handler, proxy_handler};
use crate::config::AppConfig;
use crate::error::Result;
use crate::worker::Registration;
use axum::{routing::get, Router};
use std::sync::Arc;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;

/// Paths under this prefix are answered by the proxy itself and never
/// reach the worker.
pub const ADMIN_PREFIX: &str = "/__offline";

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub registration: Arc<Registration>,
}

pub fn create_router(config: AppConfig, registration: Arc<Registration>) -> Result<Router> {
    let max_body_bytes = config.server.max_body_bytes;
    let state = AppState {
        config: Arc::new(config),
        registration,
    };

    let app = Router::new()
        .route(&format!("{}/health", ADMIN_PREFIX), get(health_handler))
        .route(&format!("{}/metrics", ADMIN_PREFIX), get(metrics_handler))
        .fallback(proxy_handler)
        .layer(tower_http::limit::RequestBodyLimitLayer::new(max_body_bytes))
        .layer(TraceLayer::new_for_http())
        // x-request-id is set before tracing sees the request and echoed back
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .with_state(state);

    Ok(app)
}
