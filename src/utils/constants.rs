//! Constants Module - Single Source of Truth
//!
//! Endpoints, pacing, score tables, milestone thresholds and the
//! known-address table live here. Other modules refer to these names.

use lazy_static::lazy_static;
use std::collections::HashMap;

// ============================================
// APPLICATION CONSTANTS
// ============================================

/// Application name
pub const APP_NAME: &str = "MegaETH Tracker";

/// Application version
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// User-Agent for HTTP requests
pub const USER_AGENT: &str = concat!("megaeth-tracker/", env!("CARGO_PKG_VERSION"));

// ============================================
// ENDPOINTS
// ============================================

/// Chain name as used by DeFiLlama (`chains`, `chainTvls` keys)
pub const DEFAULT_CHAIN_NAME: &str = "MegaETH";

/// Public JSON-RPC endpoint
pub const PUBLIC_RPC_URL: &str = "https://rpc.megaeth.com";

/// Blockscout API v2 base
pub const DEFAULT_BLOCKSCOUT_BASE: &str = "https://megaeth.blockscout.com/api/v2";

/// DeFiLlama API base
pub const DEFAULT_DEFILLAMA_BASE: &str = "https://api.llama.fi";

/// SQLite database file
pub const DEFAULT_DB_PATH: &str = "data/tracker.db";

// ============================================
// FETCH / PACING
// ============================================

pub const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 15;
pub const DEFAULT_FETCH_MAX_ATTEMPTS: u32 = 3;
/// Backoff unit (1s → 2s → 4s ...)
pub const FETCH_BASE_BACKOFF_MS: u64 = 1000;
/// Cap for the 429/5xx backoff schedule
pub const FETCH_MAX_STATUS_BACKOFF_MS: u64 = 10_000;

/// Protocol listing cache lifetime (1 hour)
pub const DEFAULT_PROTOCOL_CACHE_TTL_SECS: u64 = 60 * 60;

/// Pause after each project during enrichment
pub const DEFAULT_PROJECT_PAUSE_MS: u64 = 200;
/// Pause after each address resolution
pub const DEFAULT_RESOLUTION_PAUSE_MS: u64 = 300;

/// Window used for the average daily tx delta
pub const TX_AVERAGE_WINDOW_DAYS: i64 = 7;

/// 1 ether in wei
pub const WEI_PER_ETH: u128 = 1_000_000_000_000_000_000;

// ============================================
// SCORING WEIGHTS (max points per component)
// ============================================

pub const WEIGHT_TVL_RELATIVE: u8 = 25;
pub const WEIGHT_CONTRACT_VERIFIED: u8 = 15;
pub const WEIGHT_TX_ACTIVITY: u8 = 20;
pub const WEIGHT_BALANCE_HEALTH: u8 = 10;
pub const WEIGHT_AGE_SUSTAINED: u8 = 5;
pub const WEIGHT_CATEGORY_STRENGTH: u8 = 10;
pub const WEIGHT_DEFILLAMA_LISTED: u8 = 15;

/// Category used when a project has none, or an unknown one
pub const DEFAULT_CATEGORY: &str = "other";

/// Points per project category
pub fn category_score(category: &str) -> u8 {
    match category.to_lowercase().as_str() {
        "defi" => 10,
        "oracle" => 10,
        "bridge" => 9,
        "infra" => 8,
        "trading" => 7,
        "launchpad" => 6,
        "gaming" => 5,
        "social" => 4,
        "nft" => 4,
        _ => 3,
    }
}

// ============================================
// MILESTONE THRESHOLDS (sorted ascending)
// ============================================

pub const ECOSYSTEM_TVL_THRESHOLDS: [f64; 9] =
    [1e6, 5e6, 10e6, 25e6, 50e6, 100e6, 250e6, 500e6, 1e9];

pub const PROJECT_TVL_THRESHOLDS: [f64; 7] = [10e3, 50e3, 100e3, 500e3, 1e6, 5e6, 10e6];

pub const ECOSYSTEM_TXS_THRESHOLDS: [f64; 8] =
    [100e3, 500e3, 1e6, 5e6, 10e6, 50e6, 100e6, 500e6];

pub const ACTIVE_WALLETS_THRESHOLDS: [f64; 7] = [1e3, 5e3, 10e3, 50e3, 100e3, 500e3, 1e6];

/// Deployment-count milestones every N deployments
pub const DEPLOYMENT_COUNT_INTERVAL: u64 = 10;

/// Tracking started with 36 deployments already known; nothing below 40 is raised
pub const DEPLOYMENT_COUNT_FLOOR: u64 = 40;

// ============================================
// KNOWN CONTRACT ADDRESSES
// ============================================

lazy_static! {
    /// Well-known project handles → contract address. `None` = known project,
    /// address not yet published on this chain.
    pub static ref KNOWN_ADDRESSES: HashMap<&'static str, Option<&'static str>> = {
        let mut m = HashMap::new();
        // Aave V3 Pool
        m.insert("aave", Some("0x6A000a123a55b0E15CeCff1FE5f1D5B56FCB7f92"));
        m.insert("chainlink", None);
        m.insert("LidoFinance", None);
        m
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_scores() {
        assert_eq!(category_score("defi"), 10);
        assert_eq!(category_score("DeFi"), 10);
        assert_eq!(category_score("bridge"), 9);
        assert_eq!(category_score("nft"), 4);
        assert_eq!(category_score("memecoin"), category_score(DEFAULT_CATEGORY));
    }

    #[test]
    fn test_weights_sum_to_hundred() {
        let total: u32 = [
            WEIGHT_TVL_RELATIVE,
            WEIGHT_CONTRACT_VERIFIED,
            WEIGHT_TX_ACTIVITY,
            WEIGHT_BALANCE_HEALTH,
            WEIGHT_AGE_SUSTAINED,
            WEIGHT_CATEGORY_STRENGTH,
            WEIGHT_DEFILLAMA_LISTED,
        ]
        .iter()
        .map(|w| *w as u32)
        .sum();
        assert_eq!(total, 100);
    }

    #[test]
    fn test_thresholds_sorted() {
        for table in [
            &ECOSYSTEM_TVL_THRESHOLDS[..],
            &PROJECT_TVL_THRESHOLDS[..],
            &ECOSYSTEM_TXS_THRESHOLDS[..],
            &ACTIVE_WALLETS_THRESHOLDS[..],
        ] {
            assert!(table.windows(2).all(|w| w[0] < w[1]));
        }
    }
}
