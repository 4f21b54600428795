//! Response decoding helpers
//!
//! Upstream JSON is loose: explorer counters arrive as numbers or as
//! decimal strings, RPC quantities are hex strings, and DeFiLlama address
//! fields may be chain-prefixed. These helpers turn all of that into typed
//! values or `None`.

use alloy_primitives::{Address, U256};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use std::str::FromStr;

use super::constants::WEI_PER_ETH;

// ============================================
// LENIENT SERDE FIELDS
// ============================================

/// Integer read from a JSON number or a numeric string
pub fn value_as_i64(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Value::String(s) => {
            let s = s.trim();
            s.parse::<i64>()
                .ok()
                .or_else(|| s.parse::<f64>().ok().filter(|f| f.is_finite()).map(|f| f as i64))
        }
        _ => None,
    }
}

/// Float read from a JSON number or a numeric string
pub fn value_as_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok().filter(|f| f.is_finite()),
        _ => None,
    }
}

/// Text form of a JSON scalar (numbers keep their JSON spelling)
pub fn value_as_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// `#[serde(default, deserialize_with = "lenient_i64")]`
pub fn lenient_i64<'de, D: Deserializer<'de>>(d: D) -> Result<Option<i64>, D::Error> {
    let value = Option::<Value>::deserialize(d)?;
    Ok(value.as_ref().and_then(value_as_i64))
}

/// `#[serde(default, deserialize_with = "lenient_f64")]`
pub fn lenient_f64<'de, D: Deserializer<'de>>(d: D) -> Result<Option<f64>, D::Error> {
    let value = Option::<Value>::deserialize(d)?;
    Ok(value.as_ref().and_then(value_as_f64))
}

/// `#[serde(default, deserialize_with = "lenient_string")]`
pub fn lenient_string<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
    let value = Option::<Value>::deserialize(d)?;
    Ok(value.as_ref().and_then(value_as_string))
}

// ============================================
// TIMESTAMPS
// ============================================

/// RFC3339, `YYYY-MM-DD HH:MM:SS` (UTC) or a bare `YYYY-MM-DD`
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S") {
        return Some(naive.and_utc());
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

// ============================================
// ADDRESSES
// ============================================

/// Lowercase `0x` + 40 hex, or `None` for anything else
pub fn normalize_address(raw: &str) -> Option<String> {
    let raw = raw.trim();
    if raw.len() != 42 || !(raw.starts_with("0x") || raw.starts_with("0X")) {
        return None;
    }
    let address = Address::from_str(&raw[2..]).ok()?;
    Some(format!("0x{}", alloy_primitives::hex::encode(address.as_slice())))
}

/// Pick an address for `chain` out of a DeFiLlama `address` field.
///
/// Accepts a bare address, `chain:0x...`, or a comma-separated list of
/// those. A prefix naming this chain wins; otherwise the first bare
/// address is used. Addresses prefixed with another chain are ignored.
pub fn pick_chain_address(raw: &str, chain: &str) -> Option<String> {
    let mut bare = None;
    for entry in raw.split(',').map(str::trim).filter(|e| !e.is_empty()) {
        match entry.split_once(':') {
            Some((prefix, addr)) if prefix.trim().eq_ignore_ascii_case(chain) => {
                if let Some(found) = normalize_address(addr) {
                    return Some(found);
                }
            }
            Some(_) => {}
            None => {
                if bare.is_none() {
                    bare = normalize_address(entry);
                }
            }
        }
    }
    bare
}

// ============================================
// QUANTITIES
// ============================================

/// `0x`-prefixed hex quantity → u64
pub fn parse_hex_u64(raw: &str) -> Option<u64> {
    let digits = raw.trim().strip_prefix("0x")?;
    if digits.is_empty() {
        return Some(0);
    }
    u64::from_str_radix(digits, 16).ok()
}

/// Hex (`0x...`) or decimal string → U256
pub fn parse_u256(raw: &str) -> Option<U256> {
    let raw = raw.trim();
    if raw.is_empty() || raw == "0x" {
        return None;
    }
    U256::from_str(raw).ok()
}

/// Wei → ether. Whole ether and the remainder are split as integers first so
/// balances beyond f64 integer precision keep their fractional part.
pub fn wei_to_eth(wei: U256) -> f64 {
    let unit = U256::from(WEI_PER_ETH);
    let whole = wei / unit;
    let frac = wei % unit;
    whole.saturating_to::<u128>() as f64 + frac.saturating_to::<u64>() as f64 / WEI_PER_ETH as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Deserialize)]
    struct Counters {
        #[serde(default, deserialize_with = "lenient_i64")]
        total: Option<i64>,
        #[serde(default, deserialize_with = "lenient_f64")]
        block_time: Option<f64>,
        #[serde(default, deserialize_with = "lenient_string")]
        gas: Option<String>,
    }

    #[test]
    fn test_lenient_fields_accept_numbers_and_strings() {
        let a: Counters =
            serde_json::from_value(json!({"total": "1234", "block_time": 1000.5, "gas": 0.01}))
                .unwrap();
        assert_eq!(a.total, Some(1234));
        assert_eq!(a.block_time, Some(1000.5));
        assert_eq!(a.gas.as_deref(), Some("0.01"));

        let b: Counters =
            serde_json::from_value(json!({"total": 99, "block_time": "250", "gas": null})).unwrap();
        assert_eq!(b.total, Some(99));
        assert_eq!(b.block_time, Some(250.0));
        assert!(b.gas.is_none());

        let c: Counters = serde_json::from_value(json!({"total": "n/a"})).unwrap();
        assert!(c.total.is_none());
        assert!(c.block_time.is_none());
    }

    #[test]
    fn test_parse_timestamp_formats() {
        let rfc = parse_timestamp("2025-03-01T12:00:00Z").unwrap();
        let sql = parse_timestamp("2025-03-01 12:00:00").unwrap();
        assert_eq!(rfc, sql);
        assert!(parse_timestamp("2025-03-01").is_some());
        assert!(parse_timestamp("last tuesday").is_none());
    }

    #[test]
    fn test_normalize_address() {
        assert_eq!(
            normalize_address("0x6A000a123a55b0E15CeCff1FE5f1D5B56FCB7f92").as_deref(),
            Some("0x6a000a123a55b0e15cecff1fe5f1d5b56fcb7f92")
        );
        assert!(normalize_address("0x1234").is_none());
        assert!(normalize_address("6a000a123a55b0e15cecff1fe5f1d5b56fcb7f92").is_none());
        assert!(normalize_address("0xzz000a123a55b0e15cecff1fe5f1d5b56fcb7f92").is_none());
    }

    #[test]
    fn test_pick_chain_address_prefers_chain() {
        let raw = "ethereum:0x1111111111111111111111111111111111111111,megaeth:0x2222222222222222222222222222222222222222";
        assert_eq!(
            pick_chain_address(raw, "MegaETH").as_deref(),
            Some("0x2222222222222222222222222222222222222222")
        );
        let other_chain = "ethereum:0x1111111111111111111111111111111111111111";
        assert!(pick_chain_address(other_chain, "MegaETH").is_none());
        assert_eq!(
            pick_chain_address("0xABCDEFabcdefABCDEFabcdefABCDEFabcdefABCD", "MegaETH").as_deref(),
            Some("0xabcdefabcdefabcdefabcdefabcdefabcdefabcd")
        );
        assert!(pick_chain_address("-", "MegaETH").is_none());
    }

    #[test]
    fn test_quantities() {
        assert_eq!(parse_hex_u64("0x1a"), Some(26));
        assert_eq!(parse_hex_u64("0x"), Some(0));
        assert_eq!(parse_hex_u64("26"), None);
        let two_eth = U256::from(2_000_000_000_000_000_000u128);
        assert_eq!(parse_u256("0x1bc16d674ec80000"), Some(two_eth));
        assert_eq!(parse_u256("2000000000000000000"), Some(two_eth));
        assert_eq!(parse_u256(""), None);
    }

    #[test]
    fn test_wei_to_eth() {
        assert_eq!(wei_to_eth(U256::from(2_000_000_000_000_000_000u128)), 2.0);
        assert_eq!(wei_to_eth(U256::from(500_000_000_000_000_000u128)), 0.5);
        assert_eq!(wei_to_eth(U256::ZERO), 0.0);
        // 10^30 wei = 10^12 ether
        let huge = U256::from(10u64).pow(U256::from(30u64));
        assert_eq!(wei_to_eth(huge), 1e12);
    }
}
