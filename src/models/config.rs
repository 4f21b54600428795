//! Configuration module for the deployment tracker
//!
//! Every endpoint, pause and milestone knob is read from the environment
//! and falls back to the defaults in `utils/constants.rs`.

use std::path::PathBuf;
use std::time::Duration;
use tracing::{info, warn};

use crate::utils::constants::{
    DEFAULT_BLOCKSCOUT_BASE, DEFAULT_CHAIN_NAME, DEFAULT_DB_PATH, DEFAULT_DEFILLAMA_BASE,
    DEFAULT_FETCH_MAX_ATTEMPTS, DEFAULT_FETCH_TIMEOUT_SECS, DEFAULT_PROJECT_PAUSE_MS,
    DEFAULT_PROTOCOL_CACHE_TTL_SECS, DEFAULT_RESOLUTION_PAUSE_MS, DEPLOYMENT_COUNT_FLOOR,
    DEPLOYMENT_COUNT_INTERVAL, FETCH_BASE_BACKOFF_MS, FETCH_MAX_STATUS_BACKOFF_MS, PUBLIC_RPC_URL,
};

/// Retry/timeout behaviour of the fetch client
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Attempts per call, including the first
    pub max_attempts: u32,
    /// Per-attempt timeout
    pub timeout: Duration,
    /// Backoff unit; delay before retry n is `base * 2^n`
    pub base_backoff_ms: u64,
    /// Cap applied only to the 429/5xx schedule
    pub max_status_backoff_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_FETCH_MAX_ATTEMPTS,
            timeout: Duration::from_secs(DEFAULT_FETCH_TIMEOUT_SECS),
            base_backoff_ms: FETCH_BASE_BACKOFF_MS,
            max_status_backoff_ms: FETCH_MAX_STATUS_BACKOFF_MS,
        }
    }
}

impl RetryPolicy {
    /// Delay after a 429/5xx on `attempt` (0-based)
    pub fn status_backoff(&self, attempt: u32) -> Duration {
        let delay = self.base_backoff_ms.saturating_mul(2_u64.saturating_pow(attempt));
        Duration::from_millis(delay.min(self.max_status_backoff_ms))
    }

    /// Delay after a transport failure on `attempt` (0-based), uncapped
    pub fn transport_backoff(&self, attempt: u32) -> Duration {
        Duration::from_millis(self.base_backoff_ms.saturating_mul(2_u64.saturating_pow(attempt)))
    }
}

/// Milestone generation parameters
#[derive(Debug, Clone)]
pub struct MilestoneConfig {
    /// Deployment-count milestones every N deployments
    pub deployment_interval: u64,
    /// First deployment-count milestone that may be raised
    pub deployment_floor: u64,
}

impl Default for MilestoneConfig {
    fn default() -> Self {
        Self {
            deployment_interval: DEPLOYMENT_COUNT_INTERVAL,
            deployment_floor: DEPLOYMENT_COUNT_FLOOR,
        }
    }
}

/// Configuration for the tracker
#[derive(Debug, Clone)]
pub struct TrackerConfig {
    /// SQLite database file
    pub db_path: PathBuf,
    /// Chain name as DeFiLlama spells it
    pub chain_name: String,
    /// JSON-RPC endpoint
    pub rpc_url: String,
    /// Blockscout API v2 base
    pub blockscout_base: String,
    /// DeFiLlama API base
    pub defillama_base: String,
    pub retry: RetryPolicy,
    /// Lifetime of the cached protocol listing
    pub protocol_cache_ttl: Duration,
    /// Pause after each project during enrichment
    pub project_pause: Duration,
    /// Pause after each address resolution
    pub resolution_pause: Duration,
    pub milestones: MilestoneConfig,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from(DEFAULT_DB_PATH),
            chain_name: DEFAULT_CHAIN_NAME.to_string(),
            rpc_url: PUBLIC_RPC_URL.to_string(),
            blockscout_base: DEFAULT_BLOCKSCOUT_BASE.to_string(),
            defillama_base: DEFAULT_DEFILLAMA_BASE.to_string(),
            retry: RetryPolicy::default(),
            protocol_cache_ttl: Duration::from_secs(DEFAULT_PROTOCOL_CACHE_TTL_SECS),
            project_pause: Duration::from_millis(DEFAULT_PROJECT_PAUSE_MS),
            resolution_pause: Duration::from_millis(DEFAULT_RESOLUTION_PAUSE_MS),
            milestones: MilestoneConfig::default(),
        }
    }
}

impl TrackerConfig {
    /// Build configuration from environment variables
    pub fn from_env() -> Self {
        let defaults = Self::default();

        // Alchemy endpoint wins over the public RPC; the URL embeds the key so it is never logged
        let rpc_url = env_string("ALCHEMY_HTTP_URL")
            .or_else(|| env_string("MEGAETH_ALCHEMY_RPC"))
            .map(|url| {
                info!("🔑 Using Alchemy RPC endpoint (key hidden)");
                url
            })
            .unwrap_or(defaults.rpc_url);

        let retry = RetryPolicy {
            max_attempts: env_parse("FETCH_MAX_ATTEMPTS", defaults.retry.max_attempts).max(1),
            timeout: Duration::from_secs(env_parse(
                "FETCH_TIMEOUT_SECS",
                DEFAULT_FETCH_TIMEOUT_SECS,
            )),
            ..defaults.retry
        };

        Self {
            db_path: env_string("TRACKER_DB_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.db_path),
            chain_name: env_string("TRACKER_CHAIN_NAME").unwrap_or(defaults.chain_name),
            rpc_url,
            blockscout_base: env_string("BLOCKSCOUT_BASE_URL").unwrap_or(defaults.blockscout_base),
            defillama_base: env_string("DEFILLAMA_BASE_URL").unwrap_or(defaults.defillama_base),
            retry,
            protocol_cache_ttl: Duration::from_secs(env_parse(
                "PROTOCOL_CACHE_TTL_SECS",
                DEFAULT_PROTOCOL_CACHE_TTL_SECS,
            )),
            project_pause: Duration::from_millis(env_parse(
                "PROJECT_PAUSE_MS",
                DEFAULT_PROJECT_PAUSE_MS,
            )),
            resolution_pause: Duration::from_millis(env_parse(
                "RESOLUTION_PAUSE_MS",
                DEFAULT_RESOLUTION_PAUSE_MS,
            )),
            milestones: MilestoneConfig {
                deployment_interval: env_parse(
                    "DEPLOYMENT_MILESTONE_INTERVAL",
                    DEPLOYMENT_COUNT_INTERVAL,
                ),
                deployment_floor: env_parse("DEPLOYMENT_MILESTONE_FLOOR", DEPLOYMENT_COUNT_FLOOR),
            },
        }
    }

    /// RPC URL with any API key path segment masked (for logging)
    pub fn masked_rpc_url(&self) -> String {
        if let Some((base, _)) = self.rpc_url.split_once("/v2/") {
            return format!("{}/v2/***HIDDEN***", base);
        }
        self.rpc_url.clone()
    }
}

fn env_string(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn env_parse<T: std::str::FromStr + Copy + std::fmt::Display>(key: &str, default: T) -> T {
    match env_string(key) {
        Some(raw) => raw.parse().unwrap_or_else(|_| {
            warn!("⚠️ {}={} is not valid, using default {}", key, raw, default);
            default
        }),
        None => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_backoff_is_capped() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.status_backoff(0), Duration::from_millis(1000));
        assert_eq!(policy.status_backoff(1), Duration::from_millis(2000));
        assert_eq!(policy.status_backoff(3), Duration::from_millis(8000));
        assert_eq!(policy.status_backoff(4), Duration::from_millis(10_000));
        assert_eq!(policy.status_backoff(10), Duration::from_millis(10_000));
    }

    #[test]
    fn test_transport_backoff_is_uncapped() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.transport_backoff(0), Duration::from_millis(1000));
        assert_eq!(policy.transport_backoff(4), Duration::from_millis(16_000));
    }

    #[test]
    fn test_defaults() {
        let config = TrackerConfig::default();
        assert_eq!(config.chain_name, "MegaETH");
        assert_eq!(config.retry.max_attempts, 3);
        assert_eq!(config.retry.timeout, Duration::from_secs(15));
        assert_eq!(config.protocol_cache_ttl, Duration::from_secs(3600));
        assert_eq!(config.project_pause, Duration::from_millis(200));
        assert_eq!(config.resolution_pause, Duration::from_millis(300));
        assert_eq!(config.milestones.deployment_interval, 10);
        assert_eq!(config.milestones.deployment_floor, 40);
    }

    #[test]
    fn test_masked_rpc_url() {
        let config = TrackerConfig {
            rpc_url: "https://megaeth-mainnet.g.alchemy.com/v2/secret".to_string(),
            ..TrackerConfig::default()
        };
        assert_eq!(
            config.masked_rpc_url(),
            "https://megaeth-mainnet.g.alchemy.com/v2/***HIDDEN***"
        );
    }
}
