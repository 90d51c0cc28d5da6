//! Failure injection tests: bad input, dead upstream, slow upstream.

use std::time::Duration;

use axum::http::StatusCode;
use serde_json::{json, Value};

mod common;

use common::{gateway_config, unreachable_url, MockReply, MockUpstream, TestGateway};

async fn error_body(response: reqwest::Response) -> (StatusCode, Value) {
    let status = response.status();
    (status, response.json().await.unwrap())
}

#[tokio::test]
async fn test_upload_without_files_is_rejected_locally() {
    let upstream = MockUpstream::json(json!({})).await;
    let gateway = TestGateway::start(gateway_config(&upstream.url())).await;
    let client = reqwest::Client::new();

    let form = reqwest::multipart::Form::new().text("note", "no files here");
    let (status, body) = error_body(
        client
            .post(gateway.url("/api/upload"))
            .multipart(form)
            .send()
            .await
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({"error": "Bad Request", "message": "No files uploaded"}));

    let (status, body) = error_body(
        client
            .post(gateway.url("/api/upload"))
            .json(&json!({"files": []}))
            .send()
            .await
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "No files uploaded");

    assert!(upstream.requests_to("/api/upload").is_empty());
}

#[tokio::test]
async fn test_upload_with_empty_file_is_rejected_locally() {
    let upstream = MockUpstream::json(json!({})).await;
    let gateway = TestGateway::start(gateway_config(&upstream.url())).await;

    let form = reqwest::multipart::Form::new()
        .part("files", reqwest::multipart::Part::bytes(b"data".to_vec()).file_name("a.txt"))
        .part("files", reqwest::multipart::Part::bytes(Vec::new()).file_name("empty.txt"));

    let (status, body) = error_body(
        reqwest::Client::new()
            .post(gateway.url("/api/upload"))
            .multipart(form)
            .send()
            .await
            .unwrap(),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Invalid file buffer");
    assert!(upstream.requests_to("/api/upload").is_empty());
}

#[tokio::test]
async fn test_invalid_json_is_rejected_locally() {
    let upstream = MockUpstream::json(json!({})).await;
    let gateway = TestGateway::start(gateway_config(&upstream.url())).await;

    let (status, body) = error_body(
        reqwest::Client::new()
            .post(gateway.url("/api/atoms"))
            .header("content-type", "application/json")
            .body("{not json")
            .send()
            .await
            .unwrap(),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Invalid JSON body");
    assert!(upstream.requests_to("/api/atoms").is_empty());
}

#[tokio::test]
async fn test_unsupported_methods_are_405() {
    let upstream = MockUpstream::json(json!({})).await;
    let gateway = TestGateway::start(gateway_config(&upstream.url())).await;
    let client = reqwest::Client::new();

    let response = client.delete(gateway.url("/api/atoms/5")).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);

    let response = client.get(gateway.url("/api/upload")).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);

    assert!(upstream.requests_to("/api").is_empty());
}

#[tokio::test]
async fn test_unreachable_upstream_is_503_with_details() {
    let mut config = gateway_config(&unreachable_url());
    config.health_check.enabled = false;
    let gateway = TestGateway::start(config).await;

    let (status, body) = error_body(
        reqwest::Client::new()
            .post(gateway.url("/api/redundafier/anything"))
            .json(&json!({}))
            .send()
            .await
            .unwrap(),
    )
    .await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["error"], "Service Unavailable");
    assert_eq!(body["message"], "Failed to process redundafier request");
    assert!(!body["details"].as_str().unwrap().is_empty());
}

#[tokio::test]
async fn test_forwarding_failure_triggers_probe() {
    let upstream = MockUpstream::start(|request| {
        if request.path() == "/" {
            MockReply::text("alive")
        } else {
            // declared JSON that does not parse counts as a failed call
            MockReply {
                body: b"{broken".to_vec(),
                ..MockReply::json(json!({}))
            }
        }
    })
    .await;
    let mut config = gateway_config(&upstream.url());
    config.health_check.interval_secs = 3600;
    let gateway = TestGateway::start(config).await;

    // the first periodic tick fires at once
    gateway.wait_for_health(true).await;
    let probes_before = upstream.requests_to("/").iter().filter(|r| r.path() == "/").count();
    assert_eq!(probes_before, 1);

    let (status, body) = error_body(reqwest::get(gateway.url("/api/atoms/1")).await.unwrap()).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["message"], "Failed to process atoms request");

    let mut probes_after = probes_before;
    for _ in 0..50 {
        probes_after = upstream.requests_to("/").iter().filter(|r| r.path() == "/").count();
        if probes_after > probes_before {
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert!(probes_after > probes_before, "no probe after forwarding failure");
}

#[tokio::test]
async fn test_fallback_unreachable_is_503() {
    let mut config = gateway_config(&unreachable_url());
    config.health_check.enabled = false;
    let gateway = TestGateway::start(config).await;

    let (status, body) = error_body(reqwest::get(gateway.url("/api/unknown")).await.unwrap()).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["message"], "Failed to proxy request to target server");
    assert!(!body["details"].as_str().unwrap().is_empty());
}

#[tokio::test]
async fn test_unhealthy_upstream_gates_requests() {
    let upstream = MockUpstream::start(|request| {
        if request.path() == "/" {
            MockReply::text("down").status(StatusCode::SERVICE_UNAVAILABLE)
        } else {
            MockReply::json(json!({"id": 1}))
        }
    })
    .await;
    let gateway = TestGateway::start(gateway_config(&upstream.url())).await;

    gateway.wait_for_health(false).await;

    let (status, body) = error_body(reqwest::get(gateway.url("/api/atoms/1")).await.unwrap()).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["message"], "Failed to process atoms request");
    assert!(body["details"].as_str().unwrap().contains("health check failed"));
    assert!(upstream.requests_to("/api/atoms").is_empty());
}

#[tokio::test]
async fn test_validation_runs_before_health_gate() {
    let upstream = MockUpstream::start(|request| {
        if request.path() == "/" {
            MockReply::text("down").status(StatusCode::INTERNAL_SERVER_ERROR)
        } else {
            MockReply::json(json!({}))
        }
    })
    .await;
    let gateway = TestGateway::start(gateway_config(&upstream.url())).await;
    gateway.wait_for_health(false).await;

    let response = reqwest::Client::new()
        .post(gateway.url("/api/upload"))
        .json(&json!({}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_slow_upstream_times_out_with_504() {
    let upstream = MockUpstream::start(|request| {
        let reply = MockReply::json(json!({"late": true}));
        if request.path() == "/" {
            reply
        } else {
            reply.delayed(Duration::from_secs(3))
        }
    })
    .await;
    let mut config = gateway_config(&upstream.url());
    config.timeouts.request_secs = 1;
    let gateway = TestGateway::start(config).await;

    let (status, body) = error_body(reqwest::get(gateway.url("/api/atoms/slow")).await.unwrap()).await;
    assert_eq!(status, StatusCode::GATEWAY_TIMEOUT);
    assert_eq!(
        body,
        json!({"error": "Gateway Timeout", "message": "Request took too long to process"})
    );
}
