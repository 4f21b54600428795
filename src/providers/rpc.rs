//! RPC Client Module - JSON-RPC 2.0 over POST
//!
//! Single preferred endpoint (Alchemy when configured, otherwise the public
//! RPC). Transport retries come from the fetch client; a body `error`
//! member fails the call even on HTTP 200.

use alloy_primitives::U256;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;

use super::fetch::FetchClient;
use crate::models::errors::{AppError, AppResult};
use crate::utils::decoder::{parse_hex_u64, parse_u256, wei_to_eth};

/// JSON-RPC response structure
#[derive(Debug, Deserialize)]
struct RpcResponse {
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<RpcError>,
}

/// JSON-RPC error structure
#[derive(Debug, Clone, Deserialize)]
pub struct RpcError {
    #[serde(default)]
    pub code: i64,
    #[serde(default)]
    pub message: String,
}

/// `eth_getCode` result
#[derive(Debug, Clone, PartialEq)]
pub struct CodeInfo {
    pub code: String,
    pub is_contract: bool,
}

impl CodeInfo {
    pub fn from_code(code: String) -> Self {
        let is_contract = !matches!(code.trim(), "" | "0x" | "0x0");
        Self { code, is_contract }
    }
}

/// `eth_getBalance` result
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Balance {
    pub wei: U256,
    pub eth: f64,
}

impl Balance {
    pub fn from_wei(wei: U256) -> Self {
        Self {
            wei,
            eth: wei_to_eth(wei),
        }
    }
}

/// JSON-RPC client
#[derive(Clone)]
pub struct RpcClient {
    fetch: FetchClient,
    url: String,
}

impl RpcClient {
    pub fn new(fetch: FetchClient, url: &str) -> Self {
        Self {
            fetch,
            url: url.to_string(),
        }
    }

    /// Execute JSON-RPC call, returning the raw `result`
    pub async fn call(&self, method: &str, params: Value) -> AppResult<Value> {
        let payload = json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": method,
            "params": params,
        });

        let body = self.fetch.post_json(&self.url, payload).await?;
        let response: RpcResponse = serde_json::from_value(body)
            .map_err(|e| AppError::rpc_invalid(format!("Bad {} response: {}", method, e)))?;

        if let Some(error) = response.error {
            return Err(AppError::rpc_error(&error.message, error.code));
        }

        response
            .result
            .ok_or_else(|| AppError::rpc_invalid(format!("No result in {} response", method)))
    }

    async fn call_str(&self, method: &str, params: Value) -> AppResult<String> {
        match self.call(method, params).await? {
            Value::String(s) => Ok(s),
            other => Err(AppError::rpc_invalid(format!(
                "{} returned non-string result: {}",
                method, other
            ))),
        }
    }

    async fn call_u64(&self, method: &str, params: Value) -> AppResult<u64> {
        let hex = self.call_str(method, params).await?;
        parse_hex_u64(&hex).ok_or_else(|| {
            AppError::rpc_invalid(format!("{} returned bad quantity {}", method, hex))
        })
    }

    /// Get bytecode; `0x`/`0x0` means no contract
    pub async fn get_code(&self, address: &str) -> AppResult<CodeInfo> {
        let code = self.call_str("eth_getCode", json!([address, "latest"])).await?;
        let info = CodeInfo::from_code(code);
        debug!("📜 eth_getCode {}: contract={}", address, info.is_contract);
        Ok(info)
    }

    pub async fn get_transaction_count(&self, address: &str) -> AppResult<u64> {
        self.call_u64("eth_getTransactionCount", json!([address, "latest"]))
            .await
    }

    pub async fn get_balance(&self, address: &str) -> AppResult<Balance> {
        let hex = self.call_str("eth_getBalance", json!([address, "latest"])).await?;
        let wei = parse_u256(&hex)
            .ok_or_else(|| AppError::rpc_invalid(format!("eth_getBalance returned {}", hex)))?;
        Ok(Balance::from_wei(wei))
    }

    pub async fn get_block_number(&self) -> AppResult<u64> {
        self.call_u64("eth_blockNumber", json!([])).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_code_info() {
        assert!(!CodeInfo::from_code("0x".to_string()).is_contract);
        assert!(!CodeInfo::from_code("0x0".to_string()).is_contract);
        assert!(!CodeInfo::from_code(String::new()).is_contract);
        assert!(CodeInfo::from_code("0x6080604052".to_string()).is_contract);
    }

    #[test]
    fn test_balance_from_wei() {
        let balance = Balance::from_wei(U256::from(2_500_000_000_000_000_000u128));
        assert_eq!(balance.eth, 2.5);
    }

    #[test]
    fn test_rpc_error_body() {
        let response: RpcResponse = serde_json::from_value(serde_json::json!({
            "jsonrpc": "2.0", "id": 1,
            "error": {"code": -32602, "message": "invalid argument"}
        }))
        .unwrap();
        let error = response.error.unwrap();
        assert_eq!(error.code, -32602);
        assert!(response.result.is_none());
    }
}
