//! Fetch client behaviour against a local mock server

use megaeth_tracker::models::{ErrorCode, RetryPolicy};
use megaeth_tracker::providers::{FetchClient, FetchOptions};
use serde_json::json;
use std::time::Duration;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn fast_client(max_attempts: u32) -> FetchClient {
    FetchClient::new(RetryPolicy {
        max_attempts,
        timeout: Duration::from_secs(2),
        base_backoff_ms: 1,
        max_status_backoff_ms: 4,
    })
    .unwrap()
}

#[tokio::test]
async fn test_server_error_exhausts_attempts() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/stats"))
        .respond_with(ResponseTemplate::new(500))
        .expect(3)
        .mount(&server)
        .await;

    let err = fast_client(3)
        .get_json(&format!("{}/stats", server.uri()))
        .await
        .unwrap_err();

    assert_eq!(err.code, ErrorCode::FetchHttpStatus);
    assert_eq!(err.status, Some(500));
    assert!(err.to_string().contains("HTTP 500"));
}

#[tokio::test]
async fn test_rate_limit_then_success() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/protocols"))
        .respond_with(ResponseTemplate::new(429))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/protocols"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{"name": "GTE"}])))
        .expect(1)
        .mount(&server)
        .await;

    let body = fast_client(3)
        .get_json(&format!("{}/protocols", server.uri()))
        .await
        .unwrap();

    assert_eq!(body[0]["name"], "GTE");
}

#[tokio::test]
async fn test_not_found_still_retried() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/smart-contracts/0xabc"))
        .respond_with(ResponseTemplate::new(404))
        .expect(3)
        .mount(&server)
        .await;

    let err = fast_client(3)
        .get_json(&format!("{}/smart-contracts/0xabc", server.uri()))
        .await
        .unwrap_err();

    assert!(err.is_not_found());
}

#[tokio::test]
async fn test_single_attempt_does_not_retry() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/stats"))
        .respond_with(ResponseTemplate::new(503))
        .expect(1)
        .mount(&server)
        .await;

    let err = fast_client(3)
        .fetch(&format!("{}/stats", server.uri()), &FetchOptions::get(), 1)
        .await
        .unwrap_err();

    assert_eq!(err.status, Some(503));
}

#[tokio::test]
async fn test_post_json_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/rpc"))
        .and(body_partial_json(json!({"method": "eth_blockNumber"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "jsonrpc": "2.0",
            "id": 1,
            "result": "0x10"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let body = fast_client(3)
        .post_json(
            &format!("{}/rpc", server.uri()),
            json!({"jsonrpc": "2.0", "id": 1, "method": "eth_blockNumber", "params": []}),
        )
        .await
        .unwrap();

    assert_eq!(body["result"], "0x10");
}

#[tokio::test]
async fn test_timeout_maps_to_fetch_timeout() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/slow"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_millis(500)))
        .mount(&server)
        .await;

    let client = FetchClient::new(RetryPolicy {
        max_attempts: 1,
        timeout: Duration::from_millis(50),
        base_backoff_ms: 1,
        max_status_backoff_ms: 4,
    })
    .unwrap();

    let err = client
        .get_json(&format!("{}/slow", server.uri()))
        .await
        .unwrap_err();

    assert_eq!(err.code, ErrorCode::FetchTimeout);
}
