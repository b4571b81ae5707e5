// Error handling tests
// Author: kelexine (https://github.com/kelexine)

use axum::http::StatusCode;
use axum::response::IntoResponse;
use kegama_offline::error::OfflineError;

#[test]
fn test_error_display_messages() {
    let errors = vec![
        OfflineError::Install("asset fetch failed".to_string()),
        OfflineError::Activation("delete failed".to_string()),
        OfflineError::Network("connection refused".to_string()),
        OfflineError::CacheMiss("/missing".to_string()),
        OfflineError::Cache("partial response".to_string()),
        OfflineError::InvalidRequest("Bad request".to_string()),
        OfflineError::Internal("boom".to_string()),
    ];

    for error in errors {
        let display = format!("{}", error);
        assert!(!display.is_empty(), "Error should have display message");
    }
}

#[test]
fn test_cache_miss_names_url() {
    let error = OfflineError::CacheMiss("/static/js/htmx.js".to_string());
    assert!(format!("{}", error).contains("/static/js/htmx.js"));
}

#[test]
fn test_invalid_state_error() {
    let error = OfflineError::InvalidState {
        expected: "installed".to_string(),
        actual: "redundant".to_string(),
    };
    let display = format!("{}", error);
    assert!(display.contains("installed"));
    assert!(display.contains("redundant"));
}

#[test]
fn test_only_transport_errors_are_network() {
    assert!(OfflineError::Network("reset".to_string()).is_network());
    assert!(!OfflineError::CacheMiss("/".to_string()).is_network());
    assert!(!OfflineError::Install("x".to_string()).is_network());
}

#[test]
fn test_status_codes() {
    let cases = vec![
        (OfflineError::CacheMiss("/".to_string()), StatusCode::BAD_GATEWAY),
        (OfflineError::Network("down".to_string()), StatusCode::BAD_GATEWAY),
        (OfflineError::InvalidRequest("too big".to_string()), StatusCode::BAD_REQUEST),
        (OfflineError::Install("x".to_string()), StatusCode::SERVICE_UNAVAILABLE),
        (OfflineError::Config("x".to_string()), StatusCode::INTERNAL_SERVER_ERROR),
        (OfflineError::Internal("x".to_string()), StatusCode::INTERNAL_SERVER_ERROR),
    ];

    for (error, expected) in cases {
        assert_eq!(error.into_response().status(), expected);
    }
}
