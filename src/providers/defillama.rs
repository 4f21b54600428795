//! DeFiLlama Client - Chain Analytics Source
//!
//! Endpoints:
//! - `/v2/historicalChainTvl/{chain}`: ecosystem TVL series (last point = current)
//! - `/protocols`: every protocol, filtered here to those on this chain
//! - `/protocol/{slug}`: per-protocol detail (`currentChainTvls`)
//!
//! The filtered listing is cached in a single TTL slot (1 hour default).

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, info, warn};

use super::fetch::FetchClient;
use crate::models::config::TrackerConfig;
use crate::models::errors::{AppError, AppResult, ErrorCode};
use crate::utils::cache::{Clock, TtlSlot};
use crate::utils::decoder::{lenient_f64, lenient_i64, lenient_string, value_as_f64};

/// One point of the chain TVL series
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TvlPoint {
    #[serde(default, deserialize_with = "lenient_i64")]
    pub date: Option<i64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub tvl: Option<f64>,
}

/// Current ecosystem TVL plus the series it came from
#[derive(Debug, Clone, Serialize)]
pub struct EcosystemTvl {
    pub tvl: Option<f64>,
    pub date: Option<i64>,
    pub history: Vec<TvlPoint>,
}

/// Protocol entry from `/protocols`
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Protocol {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub slug: Option<String>,
    /// Contract address, possibly `chain:0x...` prefixed
    #[serde(default, deserialize_with = "lenient_string")]
    pub address: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub chains: Vec<String>,
    #[serde(default, rename = "chainTvls")]
    pub chain_tvls: HashMap<String, Value>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub tvl: Option<f64>,
}

impl Protocol {
    pub fn is_on_chain(&self, chain: &str) -> bool {
        self.chains.iter().any(|c| c == chain)
    }

    /// TVL on `chain` from `chainTvls`
    pub fn chain_tvl(&self, chain: &str) -> Option<f64> {
        self.chain_tvls.get(chain).and_then(value_as_f64)
    }

    /// Case-insensitive substring match of a lowercased name against name or slug
    fn matches(&self, needle: &str) -> bool {
        self.name.to_lowercase().contains(needle)
            || self
                .slug
                .as_deref()
                .map(|s| s.to_lowercase().contains(needle))
                .unwrap_or(false)
    }
}

fn nonzero(v: &f64) -> bool {
    *v != 0.0
}

/// First protocol whose name or slug contains `project` (case-insensitive).
/// An empty project name matches nothing.
pub fn find_protocol<'a>(protocols: &'a [Protocol], project: &str) -> Option<&'a Protocol> {
    let needle = project.trim().to_lowercase();
    if needle.is_empty() {
        return None;
    }
    protocols.iter().find(|p| p.matches(&needle))
}

/// TVL of a project from the cached listing.
///
/// An exact slug hit always counts as listed (`chainTvls[chain]`, else
/// `tvl`, else 0). A fuzzy name hit only counts when the figure is nonzero.
pub fn tvl_for_project(
    protocols: &[Protocol],
    chain: &str,
    project: &str,
    slug: Option<&str>,
) -> Option<f64> {
    if let Some(slug) = slug.filter(|s| !s.is_empty()) {
        if let Some(p) = protocols.iter().find(|p| p.slug.as_deref() == Some(slug)) {
            return Some(
                p.chain_tvl(chain)
                    .filter(nonzero)
                    .or(p.tvl.filter(nonzero))
                    .unwrap_or(0.0),
            );
        }
    }

    find_protocol(protocols, project)
        .and_then(|p| p.chain_tvl(chain).filter(nonzero).or(p.tvl.filter(nonzero)))
}

/// DeFiLlama API client
#[derive(Clone)]
pub struct DefiLlamaClient {
    fetch: FetchClient,
    base_url: String,
    chain: String,
    cache: TtlSlot<Vec<Protocol>>,
    clock: Clock,
}

impl DefiLlamaClient {
    pub fn new(
        fetch: FetchClient,
        base_url: &str,
        chain: &str,
        cache_ttl: Duration,
        clock: Clock,
    ) -> Self {
        Self {
            fetch,
            base_url: base_url.trim_end_matches('/').to_string(),
            chain: chain.to_string(),
            cache: TtlSlot::new(cache_ttl),
            clock,
        }
    }

    pub fn from_config(fetch: FetchClient, config: &TrackerConfig, clock: Clock) -> Self {
        Self::new(
            fetch,
            &config.defillama_base,
            &config.chain_name,
            config.protocol_cache_ttl,
            clock,
        )
    }

    pub fn chain(&self) -> &str {
        &self.chain
    }

    /// Current ecosystem TVL; `None` when the series is empty
    pub async fn ecosystem_tvl(&self) -> AppResult<Option<EcosystemTvl>> {
        let url = format!("{}/v2/historicalChainTvl/{}", self.base_url, self.chain);
        let body = self.fetch.get_json(&url).await?;

        let points = match body {
            Value::Array(items) => items,
            _ => return Ok(None),
        };
        let history: Vec<TvlPoint> = points
            .into_iter()
            .filter_map(|p| serde_json::from_value(p).ok())
            .collect();

        Ok(history.last().cloned().map(|latest| EcosystemTvl {
            tvl: latest.tvl,
            date: latest.date,
            history,
        }))
    }

    /// Protocols on this chain, served from the cache while fresh
    pub async fn protocols(&self) -> AppResult<Vec<Protocol>> {
        let now = (self.clock)();
        if let Some(cached) = self.cache.get(now) {
            return Ok(cached);
        }

        let url = format!("{}/protocols", self.base_url);
        let body = self.fetch.get_json(&url).await?;
        let items = match body {
            Value::Array(items) => items,
            _ => {
                return Err(AppError::new(
                    ErrorCode::FetchInvalidJson,
                    format!("Expected protocol array from {}", url),
                ))
            }
        };

        let total = items.len();
        let mut skipped = 0usize;
        let protocols: Vec<Protocol> = items
            .into_iter()
            .filter_map(|item| match serde_json::from_value::<Protocol>(item) {
                Ok(p) => Some(p),
                Err(_) => {
                    skipped += 1;
                    None
                }
            })
            .filter(|p| p.is_on_chain(&self.chain))
            .collect();

        if skipped > 0 {
            debug!("Skipped {} malformed protocol entries", skipped);
        }
        info!(
            "📚 DeFiLlama: {} of {} protocols on {}",
            protocols.len(),
            total,
            self.chain
        );

        self.cache.set(protocols.clone(), now);
        Ok(protocols)
    }

    /// Current TVL on this chain for one protocol (`currentChainTvls[chain]`)
    pub async fn protocol_tvl(&self, slug: &str) -> AppResult<Option<f64>> {
        let url = format!("{}/protocol/{}", self.base_url, slug);
        let body = self.fetch.get_json(&url).await?;
        let tvl = body
            .get("currentChainTvls")
            .and_then(|m| m.get(&self.chain))
            .and_then(value_as_f64);
        if tvl.is_none() {
            warn!("⚠️ DeFiLlama protocol {} has no {} TVL", slug, self.chain);
        }
        Ok(tvl)
    }

    /// Discard the cached listing
    pub fn clear_cache(&self) {
        self.cache.clear();
    }
}
