//! Shared fixtures for the mock-server tests
#![allow(dead_code)]

use chrono::{DateTime, TimeZone, Utc};
use megaeth_tracker::models::{RetryPolicy, TrackerConfig};
use megaeth_tracker::providers::DataSources;
use megaeth_tracker::utils::Clock;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const BLOCKSCOUT: &str = "/api/v2";
pub const LLAMA: &str = "/llama";
pub const RPC: &str = "/rpc";

pub const CONTRACT_CODE: &str = "0x608060405234801561001057600080fd5b50";

pub fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap()
}

pub fn fixed_clock(at: DateTime<Utc>) -> Clock {
    Arc::new(move || at)
}

/// Every upstream pointed at `server`, no pauses, fast retries
pub fn config_for(server: &MockServer) -> TrackerConfig {
    TrackerConfig {
        rpc_url: format!("{}{}", server.uri(), RPC),
        blockscout_base: format!("{}{}", server.uri(), BLOCKSCOUT),
        defillama_base: format!("{}{}", server.uri(), LLAMA),
        retry: RetryPolicy {
            max_attempts: 2,
            timeout: Duration::from_secs(2),
            base_backoff_ms: 1,
            max_status_backoff_ms: 4,
        },
        project_pause: Duration::ZERO,
        resolution_pause: Duration::ZERO,
        ..TrackerConfig::default()
    }
}

pub fn sources_for(server: &MockServer, clock: Clock) -> DataSources {
    DataSources::from_config(&config_for(server), clock).unwrap()
}

pub fn rpc_result(result: Value) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({"jsonrpc": "2.0", "id": 1, "result": result}))
}

/// `eth_getCode(address)` answers with `code`
pub async fn mock_code(server: &MockServer, address: &str, code: &str) {
    Mock::given(method("POST"))
        .and(path(RPC))
        .and(body_partial_json(json!({"method": "eth_getCode", "params": [address, "latest"]})))
        .respond_with(rpc_result(json!(code)))
        .mount(server)
        .await;
}

pub async fn mock_get(server: &MockServer, route: String, body: Value) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}
