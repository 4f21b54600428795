//! Blockscout Client - Block Explorer Source (API v2)
//!
//! - `/stats`: chain-wide counters
//! - `/search?q=`: free-text search, reduced to contract/address/token items
//! - `/addresses/{addr}`: balance and tx count
//! - `/smart-contracts/{addr}`: verification flag (404 = unverified)

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use super::fetch::FetchClient;
use crate::models::errors::{AppError, AppResult};
use crate::utils::decoder::{lenient_f64, lenient_i64, lenient_string, value_as_string};

/// Search item types worth resolving
const SEARCH_TYPES: [&str; 3] = ["contract", "address", "token"];

/// Chain-wide counters from `/stats`; numbers may arrive as strings
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ChainStats {
    #[serde(default, deserialize_with = "lenient_i64")]
    pub total_addresses: Option<i64>,
    #[serde(default, deserialize_with = "lenient_i64")]
    pub total_transactions: Option<i64>,
    #[serde(default, deserialize_with = "lenient_i64")]
    pub transactions_today: Option<i64>,
    #[serde(default)]
    pub gas_prices: Option<GasPrices>,
    /// Milliseconds
    #[serde(default, deserialize_with = "lenient_f64")]
    pub average_block_time: Option<f64>,
}

impl ChainStats {
    /// Average gas price as text
    pub fn average_gas_price(&self) -> Option<String> {
        self.gas_prices.as_ref().and_then(GasPrices::average_text)
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct GasPrices {
    /// Either a bare number or `{ "price": ... }`
    #[serde(default)]
    pub average: Option<Value>,
}

impl GasPrices {
    fn average_text(&self) -> Option<String> {
        match self.average.as_ref()? {
            Value::Object(obj) => obj.get("price").and_then(value_as_string),
            other => value_as_string(other),
        }
    }
}

/// Search hit
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SearchItem {
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub address_hash: Option<String>,
}

impl SearchItem {
    /// `address`, else `address_hash`
    pub fn address(&self) -> Option<&str> {
        self.address
            .as_deref()
            .or(self.address_hash.as_deref())
            .filter(|a| !a.is_empty())
    }

    fn is_resolvable(&self) -> bool {
        self.kind
            .as_deref()
            .map(|k| SEARCH_TYPES.contains(&k))
            .unwrap_or(false)
    }
}

/// Address detail from `/addresses/{addr}`
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AddressInfo {
    /// Wei as a decimal string
    #[serde(default, deserialize_with = "lenient_string")]
    pub coin_balance: Option<String>,
    #[serde(default, deserialize_with = "lenient_i64")]
    pub transactions_count: Option<i64>,
    #[serde(default)]
    pub is_contract: Option<bool>,
}

/// Contract detail from `/smart-contracts/{addr}`
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ContractInfo {
    #[serde(default)]
    pub is_verified: Option<bool>,
}

impl ContractInfo {
    pub fn is_verified(&self) -> bool {
        self.is_verified.unwrap_or(false)
    }
}

/// Blockscout API v2 client
#[derive(Clone)]
pub struct BlockscoutClient {
    fetch: FetchClient,
    base_url: String,
}

impl BlockscoutClient {
    pub fn new(fetch: FetchClient, base_url: &str) -> Self {
        Self {
            fetch,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub async fn stats(&self) -> AppResult<ChainStats> {
        let body = self.fetch.get_json(&format!("{}/stats", self.base_url)).await?;
        Ok(serde_json::from_value(body)?)
    }

    /// Search, keeping only contract/address/token items in response order
    pub async fn search(&self, query: &str) -> AppResult<Vec<SearchItem>> {
        let base = format!("{}/search", self.base_url);
        let url = reqwest::Url::parse_with_params(&base, &[("q", query)])
            .map_err(|e| AppError::invalid_config(format!("Bad Blockscout base URL: {}", e)))?;
        let body = self.fetch.get_json(url.as_str()).await?;

        let items = match body.get("items") {
            Some(Value::Array(items)) => items.clone(),
            _ => return Ok(Vec::new()),
        };
        let hits: Vec<SearchItem> = items
            .into_iter()
            .filter_map(|item| serde_json::from_value::<SearchItem>(item).ok())
            .filter(SearchItem::is_resolvable)
            .collect();

        debug!("🔎 Blockscout search '{}': {} hits", query, hits.len());
        Ok(hits)
    }

    pub async fn address(&self, address: &str) -> AppResult<AddressInfo> {
        let body = self
            .fetch
            .get_json(&format!("{}/addresses/{}", self.base_url, address))
            .await?;
        Ok(serde_json::from_value(body)?)
    }

    pub async fn contract(&self, address: &str) -> AppResult<ContractInfo> {
        let body = self
            .fetch
            .get_json(&format!("{}/smart-contracts/{}", self.base_url, address))
            .await?;
        Ok(serde_json::from_value(body)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_stats_accepts_string_counters() {
        let stats: ChainStats = serde_json::from_value(json!({
            "total_addresses": "15234",
            "total_transactions": "2500000",
            "transactions_today": 48000,
            "gas_prices": {"average": 0.002, "fast": 0.003},
            "average_block_time": 1000.0
        }))
        .unwrap();
        assert_eq!(stats.total_addresses, Some(15234));
        assert_eq!(stats.total_transactions, Some(2_500_000));
        assert_eq!(stats.transactions_today, Some(48000));
        assert_eq!(stats.average_gas_price().as_deref(), Some("0.002"));
        assert_eq!(stats.average_block_time, Some(1000.0));
    }

    #[test]
    fn test_gas_price_object_form() {
        let stats: ChainStats =
            serde_json::from_value(json!({"gas_prices": {"average": {"price": 1.5, "time": 3000}}}))
                .unwrap();
        assert_eq!(stats.average_gas_price().as_deref(), Some("1.5"));
        assert!(ChainStats::default().average_gas_price().is_none());
    }

    #[test]
    fn test_search_item_address_fallback() {
        let item: SearchItem = serde_json::from_value(json!({
            "type": "contract",
            "address_hash": "0xabc"
        }))
        .unwrap();
        assert_eq!(item.address(), Some("0xabc"));
        assert!(item.is_resolvable());

        let block: SearchItem =
            serde_json::from_value(json!({"type": "block", "address": "0xdef"})).unwrap();
        assert!(!block.is_resolvable());
    }
}
