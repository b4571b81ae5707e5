// Error types for kegama-offline
// Author: kelexine (https://github.com/kelexine)

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum OfflineError {
    #[error("Install failed: {0}")]
    Install(String),

    #[error("Activation failed: {0}")]
    Activation(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("No cached response for {0}")]
    CacheMiss(String),

    #[error("Cache error: {0}")]
    Cache(String),

    #[error("Invalid worker state: expected {expected}, found {actual}")]
    InvalidState { expected: String, actual: String },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Config parsing error: {0}")]
    ConfigParsing(#[from] config::ConfigError),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl OfflineError {
    /// Whether this error came from the transport rather than the cache or
    /// the worker itself.
    pub fn is_network(&self) -> bool {
        matches!(self, OfflineError::Network(_) | OfflineError::Http(_))
    }
}

// Convert OfflineError to HTTP responses for Axum
impl IntoResponse for OfflineError {
    fn into_response(self) -> Response {
        let (status, error_type) = match &self {
            OfflineError::CacheMiss(_) | OfflineError::Network(_) | OfflineError::Http(_) => {
                (StatusCode::BAD_GATEWAY, "offline_error")
            }
            OfflineError::InvalidRequest(_) => (StatusCode::BAD_REQUEST, "invalid_request_error"),
            OfflineError::Config(_) | OfflineError::ConfigParsing(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "configuration_error")
            }
            OfflineError::Install(_) | OfflineError::Activation(_) | OfflineError::InvalidState { .. } => {
                (StatusCode::SERVICE_UNAVAILABLE, "worker_error")
            }
            _ => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error"),
        };

        let body = json!({
            "type": "error",
            "error": {
                "type": error_type,
                "message": self.to_string(),
            }
        });

        (status, axum::Json(body)).into_response()
    }
}

pub type Result<T> = std::result::Result<T, OfflineError>;
