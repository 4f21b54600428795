//! Providers Module - External Data Sources
//!
//! Fetch client plus the three adapters built on it: DeFiLlama,
//! Blockscout and JSON-RPC.

pub mod blockscout;
pub mod defillama;
pub mod fetch;
pub mod rpc;

pub use blockscout::*;
pub use defillama::*;
pub use fetch::*;
pub use rpc::*;

use tracing::info;

use crate::models::config::TrackerConfig;
use crate::models::errors::AppResult;
use crate::utils::cache::Clock;

/// All upstream adapters, sharing one HTTP client
#[derive(Clone)]
pub struct DataSources {
    pub llama: DefiLlamaClient,
    pub explorer: BlockscoutClient,
    pub rpc: RpcClient,
}

impl DataSources {
    pub fn from_config(config: &TrackerConfig, clock: Clock) -> AppResult<Self> {
        let fetch = FetchClient::new(config.retry.clone())?;
        info!(
            "🔌 Sources: DeFiLlama={} Blockscout={} RPC={}",
            config.defillama_base,
            config.blockscout_base,
            config.masked_rpc_url()
        );
        Ok(Self {
            llama: DefiLlamaClient::from_config(fetch.clone(), config, clock),
            explorer: BlockscoutClient::new(fetch.clone(), &config.blockscout_base),
            rpc: RpcClient::new(fetch, &config.rpc_url),
        })
    }
}
