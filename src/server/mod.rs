//! Axum-based HTTP front end for the offline worker.
//!
//! Every request is intercepted and handed to the active worker, which
//! answers it network-first with cache fallback. A small admin surface
//! lives under `/__offline`.
//!
//! # Components
//!
//! - `handlers`: the intercepting proxy handler plus health and metrics.
//! - `routes`: the router, with request ID and tracing layers.
//!
//! Author: kelexine (<https://github.com/kelexine>)

mod handlers;
mod routes;

pub use handlers::{HealthCheck, HealthResponse, HealthStatus};
pub use routes::{create_router, AppState, ADMIN_PREFIX};
