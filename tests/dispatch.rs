//! Integration tests for the request dispatcher against a mock backend.
//!
//! Covers the call lifecycle end to end:
//! - Direct success and the request shape on the wire
//! - Polling of accepted jobs until they finish
//! - Deadline expiry and caller cancellation
//! - Error classification for transport, HTTP and envelope failures

mod common;

use common::{config, fast_polling, in_progress, success, verdict, TOKEN};
use pangea::services::ip_intel::IpLookupInput;
use pangea::{ApiClient, CallContext, ConfigOverrides, Configuration, IpIntel, PangeaError};
use serde_json::{json, Value};
use std::time::{Duration, Instant};
use wiremock::matchers::{body_json, body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const LOOKUP: &str = "/ip-intel/v1/lookup";
const POLL: &str = "/ip-intel/v1/request";
const BEARER: &str = "Bearer pts_test_token";

async fn request_count(server: &MockServer) -> usize {
    server.received_requests().await.map_or(0, |r| r.len())
}

// ============================================================================
// Success path
// ============================================================================

#[tokio::test]
async fn test_direct_success_sends_one_authenticated_request() {
    common::init_tracing();
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(LOOKUP))
        .and(header("authorization", BEARER))
        .and(header("content-type", "application/json"))
        .and(body_json(json!({"ip": "93.231.182.110", "provider": "crowdstrike"})))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(success("prq_1", verdict("malicious", 100))),
        )
        .expect(1)
        .mount(&server)
        .await;

    let intel = IpIntel::new(config(&server, ConfigOverrides::new())).unwrap();
    let input = IpLookupInput::new("93.231.182.110").with_provider("crowdstrike");
    let response = intel.lookup(&CallContext::new(), &input).await.unwrap();

    assert_eq!(response.request_id, "prq_1");
    assert_eq!(response.summary, "Success");
    assert!(response.request_time.is_some());
    assert!(response.result.data.is_malicious());
    assert_eq!(response.result.data.score, 100);
}

#[tokio::test]
async fn test_config_id_is_added_to_body() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(LOOKUP))
        .and(body_partial_json(json!({"ip": "1.1.1.1", "config_id": "pci_42"})))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(success("prq_1", verdict("benign", 0))),
        )
        .expect(1)
        .mount(&server)
        .await;

    let config = config(&server, ConfigOverrides::new().with_config_id("pci_42"));
    let intel = IpIntel::new(config).unwrap();
    intel
        .lookup(&CallContext::new(), &IpLookupInput::new("1.1.1.1"))
        .await
        .unwrap();
}

#[tokio::test]
async fn test_missing_result_decodes_as_unit() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/audit/v1/ping"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "request_id": "prq_9",
            "status": "Success",
            "summary": "pong",
        })))
        .mount(&server)
        .await;

    let client = ApiClient::new("audit", config(&server, ConfigOverrides::new())).unwrap();
    let response = client
        .post::<_, ()>(&CallContext::new(), "v1/ping", &json!({}))
        .await
        .unwrap();
    assert_eq!(response.summary, "pong");
}

// ============================================================================
// Polling
// ============================================================================

#[tokio::test]
async fn test_accepted_job_is_polled_until_success() {
    common::init_tracing();
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(LOOKUP))
        .respond_with(ResponseTemplate::new(202).set_body_json(in_progress("prq_job")))
        .expect(1)
        .mount(&server)
        .await;

    // Two more InProgress answers, then the result.
    Mock::given(method("POST"))
        .and(path(POLL))
        .and(body_json(json!({"request_id": "prq_job"})))
        .respond_with(ResponseTemplate::new(202).set_body_json(in_progress("prq_job")))
        .up_to_n_times(2)
        .with_priority(1)
        .expect(2)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path(POLL))
        .and(body_json(json!({"request_id": "prq_job"})))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(success("prq_job", verdict("suspicious", 60))),
        )
        .expect(1)
        .mount(&server)
        .await;

    let intel = IpIntel::new(config(&server, fast_polling())).unwrap();
    let response = intel
        .lookup(&CallContext::new(), &IpLookupInput::new("190.28.74.251"))
        .await
        .unwrap();

    assert_eq!(response.request_id, "prq_job");
    assert_eq!(response.result.data.verdict, "suspicious");
    assert_eq!(request_count(&server).await, 4);
}

#[tokio::test]
async fn test_poll_failure_is_returned_as_api_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(LOOKUP))
        .respond_with(ResponseTemplate::new(202).set_body_json(in_progress("prq_job")))
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path(POLL))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "request_id": "prq_job",
            "status": "Failure",
            "summary": "Provider unavailable",
            "result": {"errors": [
                {"code": "ProviderError", "detail": "upstream timed out", "source": "/provider"}
            ]}
        })))
        .mount(&server)
        .await;

    let intel = IpIntel::new(config(&server, fast_polling())).unwrap();
    let err = intel
        .lookup(&CallContext::new(), &IpLookupInput::new("8.8.8.8"))
        .await
        .unwrap_err();

    let structured = err.as_structured().expect("expected an API error");
    assert_eq!(structured.message, "API error: Provider unavailable");
    assert_eq!(structured.errors[0].code, "ProviderError");
    assert_eq!(structured.request_id.as_deref(), Some("prq_job"));
    assert_eq!(structured.http_status, Some(200));
}

// ============================================================================
// Deadline and cancellation
// ============================================================================

#[tokio::test]
async fn test_poll_deadline_expires_and_stops_polling() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(202).set_body_json(in_progress("prq_slow")))
        .mount(&server)
        .await;

    let overrides = ConfigOverrides::new()
        .with_poll_interval(Duration::from_millis(50))
        .with_poll_timeout(Duration::from_millis(300));
    let intel = IpIntel::new(config(&server, overrides)).unwrap();

    let started = Instant::now();
    let err = intel
        .lookup(&CallContext::new(), &IpLookupInput::new("8.8.8.8"))
        .await
        .unwrap_err();

    match &err {
        PangeaError::Timeout { elapsed, request_id } => {
            assert!(*elapsed >= Duration::from_millis(300));
            assert_eq!(request_id.as_deref(), Some("prq_slow"));
        }
        other => panic!("expected timeout, got {:?}", other),
    }
    assert!(started.elapsed() < Duration::from_secs(3));
    assert!(err.is_recoverable());

    // Nothing is sent once the call has returned.
    let sent = request_count(&server).await;
    assert!(sent >= 2);
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(request_count(&server).await, sent);
}

#[tokio::test]
async fn test_context_deadline_bounds_slow_exchange() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(LOOKUP))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(success("prq_1", verdict("benign", 0)))
                .set_delay(Duration::from_secs(3)),
        )
        .mount(&server)
        .await;

    let intel = IpIntel::new(config(&server, ConfigOverrides::new())).unwrap();
    let ctx = CallContext::new().with_timeout(Duration::from_millis(200));

    let started = Instant::now();
    let err = intel
        .lookup(&ctx, &IpLookupInput::new("8.8.8.8"))
        .await
        .unwrap_err();

    assert!(matches!(err, PangeaError::Timeout { request_id: None, .. }));
    assert!(started.elapsed() < Duration::from_secs(2));
}

#[tokio::test]
async fn test_cancellation_stops_polling() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(202).set_body_json(in_progress("prq_cancel")))
        .mount(&server)
        .await;

    let intel = IpIntel::new(config(&server, fast_polling())).unwrap();
    let ctx = CallContext::new();
    let canceller = ctx.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(150)).await;
        canceller.cancel();
    });

    let err = intel
        .lookup(&ctx, &IpLookupInput::new("8.8.8.8"))
        .await
        .unwrap_err();

    assert!(matches!(err, PangeaError::Cancelled { .. }));
    assert_eq!(err.request_id(), Some("prq_cancel"));
    assert!(!err.is_recoverable());

    let sent = request_count(&server).await;
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(request_count(&server).await, sent);
}

#[tokio::test]
async fn test_cancelled_before_start_sends_nothing() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(success("prq_1", verdict("benign", 0))),
        )
        .expect(0)
        .mount(&server)
        .await;

    let intel = IpIntel::new(config(&server, ConfigOverrides::new())).unwrap();
    let ctx = CallContext::new();
    ctx.cancel();

    let err = intel
        .lookup(&ctx, &IpLookupInput::new("8.8.8.8"))
        .await
        .unwrap_err();
    assert!(matches!(err, PangeaError::Cancelled { request_id: None }));
}

// ============================================================================
// Error classification
// ============================================================================

#[tokio::test]
async fn test_unreachable_host_is_transport_error() {
    let config = Configuration::with_overrides(
        TOKEN,
        "127.0.0.1:1",
        &ConfigOverrides::new().with_insecure(true),
    )
    .unwrap();
    let intel = IpIntel::new(config).unwrap();

    let err = intel
        .lookup(&CallContext::new(), &IpLookupInput::new("8.8.8.8"))
        .await
        .unwrap_err();

    assert!(matches!(err, PangeaError::Transport { .. }));
    assert!(err.is_recoverable());
}

#[tokio::test]
async fn test_non_json_error_body_uses_reason_phrase() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(503).set_body_string("<html>upstream down</html>"))
        .mount(&server)
        .await;

    let intel = IpIntel::new(config(&server, ConfigOverrides::new())).unwrap();
    let err = intel
        .lookup(&CallContext::new(), &IpLookupInput::new("8.8.8.8"))
        .await
        .unwrap_err();

    let structured = err.as_structured().expect("expected an API error");
    assert_eq!(structured.message, "API error: Service Unavailable");
    assert!(structured.errors.is_empty());
    assert_eq!(structured.http_status, Some(503));
}

#[tokio::test]
async fn test_malformed_success_body_is_protocol_violation() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(LOOKUP))
        .respond_with(ResponseTemplate::new(200).set_body_string("{\"request_id\": \"prq_1\""))
        .mount(&server)
        .await;

    let intel = IpIntel::new(config(&server, ConfigOverrides::new())).unwrap();
    let err = intel
        .lookup(&CallContext::new(), &IpLookupInput::new("8.8.8.8"))
        .await
        .unwrap_err();
    assert!(matches!(err, PangeaError::ProtocolViolation { .. }));
}

#[tokio::test]
async fn test_unknown_status_is_protocol_violation() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "request_id": "prq_1",
            "status": "Queued",
            "summary": "",
            "result": null,
        })))
        .mount(&server)
        .await;

    let intel = IpIntel::new(config(&server, ConfigOverrides::new())).unwrap();
    let err = intel
        .lookup(&CallContext::new(), &IpLookupInput::new("8.8.8.8"))
        .await
        .unwrap_err();
    assert!(matches!(err, PangeaError::ProtocolViolation { .. }));
}

#[tokio::test]
async fn test_result_shape_mismatch_is_protocol_violation() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(success("prq_1", json!({"data": "nope"}))),
        )
        .mount(&server)
        .await;

    let intel = IpIntel::new(config(&server, ConfigOverrides::new())).unwrap();
    let err = intel
        .lookup(&CallContext::new(), &IpLookupInput::new("8.8.8.8"))
        .await
        .unwrap_err();
    assert!(matches!(err, PangeaError::ProtocolViolation { .. }));
    assert!(err.to_string().contains("prq_1"));
}

// ============================================================================
// Concurrency
// ============================================================================

#[tokio::test]
async fn test_concurrent_calls_are_independent() {
    let server = MockServer::start().await;

    for i in 0..5 {
        let ip = format!("10.0.0.{}", i);
        Mock::given(method("POST"))
            .and(path(LOOKUP))
            .and(body_partial_json(json!({"ip": ip})))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(success(&format!("prq_{}", i), verdict("benign", i * 10)))
                    .set_delay(Duration::from_millis(50)),
            )
            .expect(1)
            .mount(&server)
            .await;
    }

    let intel = IpIntel::new(config(&server, ConfigOverrides::new())).unwrap();
    let ctx = CallContext::new();
    let inputs: Vec<IpLookupInput> = (0..5)
        .map(|i| IpLookupInput::new(format!("10.0.0.{}", i)))
        .collect();

    let calls = inputs.iter().map(|input| intel.lookup(&ctx, input));
    let results = futures::future::join_all(calls).await;

    for (i, result) in results.into_iter().enumerate() {
        let response = result.unwrap();
        assert_eq!(response.request_id, format!("prq_{}", i));
        assert_eq!(response.result.data.score, (i as i32) * 10);
    }
}

#[tokio::test]
async fn test_shared_pool_across_services() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/domain-intel/v1/lookup"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(success("prq_d", verdict("benign", 0))),
        )
        .expect(1)
        .mount(&server)
        .await;

    let base = ApiClient::new("ip-intel", config(&server, ConfigOverrides::new())).unwrap();
    let domains = pangea::DomainIntel::from_client(&base);
    let input: Value = json!({"domain": "example.org"});

    let response = pangea::Service::client(&domains)
        .post::<_, Value>(&CallContext::new(), "v1/lookup", &input)
        .await
        .unwrap();
    assert_eq!(response.request_id, "prq_d");
}
