//! Shared helpers for the integration tests.

#![allow(dead_code)]

use pangea::{ConfigOverrides, Configuration};
use serde_json::{json, Value};
use std::time::Duration;
use wiremock::MockServer;

pub const TOKEN: &str = "pts_test_token";

/// Fast poll settings so polling tests finish quickly in real time.
pub fn fast_polling() -> ConfigOverrides {
    ConfigOverrides::new()
        .with_poll_interval(Duration::from_millis(20))
        .with_poll_timeout(Duration::from_secs(5))
}

/// Configuration pointing at the mock server over plain HTTP.
pub fn config(server: &MockServer, overrides: ConfigOverrides) -> Configuration {
    Configuration::with_overrides(
        TOKEN,
        server.address().to_string(),
        &overrides.with_insecure(true),
    )
    .expect("test configuration must be valid")
}

pub fn success(request_id: &str, result: Value) -> Value {
    json!({
        "request_id": request_id,
        "request_time": "2022-09-01T10:00:00.000000Z",
        "response_time": "2022-09-01T10:00:00.250000Z",
        "status": "Success",
        "summary": "Success",
        "result": result,
    })
}

pub fn in_progress(request_id: &str) -> Value {
    json!({
        "request_id": request_id,
        "request_time": "2022-09-01T10:00:00.000000Z",
        "response_time": "2022-09-01T10:00:00.100000Z",
        "status": "InProgress",
        "summary": "Request is being processed",
        "result": null,
    })
}

pub fn verdict(verdict: &str, score: i32) -> Value {
    json!({
        "data": {
            "category": ["Malware"],
            "score": score,
            "verdict": verdict,
        }
    })
}

/// Initializes a test subscriber honouring `RUST_LOG`. Safe to call more
/// than once.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
