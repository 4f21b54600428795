//! Address Resolution Cascade
//!
//! Ordered strategies, first success wins:
//! 1. Known-address table (1.0), only if the address holds contract code
//! 2. Blockscout search (0.7), first hit, must hold contract code
//! 3. DeFiLlama name/slug match (0.6), protocol must carry an address
//!
//! Every strategy run is written to the resolution log, hit or miss, and
//! exhaustion adds one `all_methods_failed` row. Adapter errors are misses.

use std::collections::HashMap;
use tracing::{debug, info};

use crate::models::errors::AppResult;
use crate::models::types::{Deployment, NewResolutionAttempt, Resolution, ResolutionMethod};
use crate::providers::defillama::find_protocol;
use crate::providers::DataSources;
use crate::storage::Store;
use crate::utils::constants::KNOWN_ADDRESSES;
use crate::utils::decoder::{normalize_address, pick_chain_address};

/// Strategy order
pub const CASCADE: [ResolutionMethod; 3] = [
    ResolutionMethod::KnownAddress,
    ResolutionMethod::BlockscoutSearch,
    ResolutionMethod::DefillamaMatch,
];

/// Outcome of one strategy run
#[derive(Debug, Clone)]
pub struct StrategyAttempt {
    pub method: ResolutionMethod,
    /// Address the strategy looked at, accepted or not
    pub candidate: Option<String>,
    pub resolution: Option<Resolution>,
    pub detail: String,
}

impl StrategyAttempt {
    fn hit(method: ResolutionMethod, address: String, detail: impl Into<String>) -> Self {
        Self {
            method,
            candidate: Some(address.clone()),
            resolution: Some(Resolution {
                address,
                confidence: method.confidence(),
                method,
            }),
            detail: detail.into(),
        }
    }

    fn miss(
        method: ResolutionMethod,
        candidate: Option<String>,
        detail: impl Into<String>,
    ) -> Self {
        Self {
            method,
            candidate,
            resolution: None,
            detail: detail.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.resolution.is_some()
    }

    fn to_record(&self, deployment_id: &str, query: &str) -> NewResolutionAttempt {
        NewResolutionAttempt {
            deployment_id: deployment_id.to_string(),
            method: self.method,
            query: Some(query.to_string()),
            result_address: self.candidate.clone(),
            confidence: if self.is_success() {
                self.method.confidence()
            } else {
                0.0
            },
            success: self.is_success(),
        }
    }
}

/// Contract-address resolver
pub struct AddressResolver {
    /// Lowercased project handle → address; `None` = known project, no address yet
    known: HashMap<String, Option<String>>,
    chain: String,
}

impl AddressResolver {
    /// Resolver over the built-in known-address table
    pub fn new(chain: &str) -> Self {
        let known = KNOWN_ADDRESSES
            .iter()
            .map(|(name, addr)| (name.to_string(), addr.map(str::to_string)))
            .collect();
        Self::with_known(known, chain)
    }

    /// Keys are matched case-insensitively. When two names differ only by
    /// case, the one that sorts first wins.
    pub fn with_known(known: HashMap<String, Option<String>>, chain: &str) -> Self {
        let mut entries: Vec<_> = known.into_iter().collect();
        entries.sort_by(|a, b| a.0.cmp(&b.0));

        let mut table = HashMap::with_capacity(entries.len());
        for (name, addr) in entries {
            table.entry(name.trim().to_lowercase()).or_insert(addr);
        }
        Self {
            known: table,
            chain: chain.to_string(),
        }
    }

    /// Table entry for a project, case-insensitive
    pub fn known_entry(&self, project: &str) -> Option<Option<&str>> {
        self.known
            .get(&project.trim().to_lowercase())
            .map(|addr| addr.as_deref())
    }

    /// Run the cascade for one deployment. Only store failures are errors.
    pub async fn resolve(
        &self,
        sources: &DataSources,
        store: &Store,
        deployment: &Deployment,
    ) -> AppResult<Option<Resolution>> {
        let project = deployment.project.as_str();

        for method in CASCADE {
            let attempt = self.run_strategy(method, sources, project).await;
            store.log_address_resolution(&attempt.to_record(&deployment.id, project))?;

            if let Some(resolution) = attempt.resolution {
                info!(
                    "🎯 Resolved @{} → {} ({}, confidence: {})",
                    project,
                    resolution.address,
                    resolution.method.as_str(),
                    resolution.confidence
                );
                return Ok(Some(resolution));
            }
            debug!("   {} miss for @{}: {}", method.as_str(), project, attempt.detail);
        }

        store.log_address_resolution(&NewResolutionAttempt {
            deployment_id: deployment.id.clone(),
            method: ResolutionMethod::AllMethodsFailed,
            query: Some(project.to_string()),
            result_address: None,
            confidence: 0.0,
            success: false,
        })?;
        debug!("❓ No address found for @{}", project);
        Ok(None)
    }

    async fn run_strategy(
        &self,
        method: ResolutionMethod,
        sources: &DataSources,
        project: &str,
    ) -> StrategyAttempt {
        match method {
            ResolutionMethod::KnownAddress => self.try_known(sources, project).await,
            ResolutionMethod::BlockscoutSearch => Self::try_search(sources, project).await,
            ResolutionMethod::DefillamaMatch => self.try_defillama(sources, project).await,
            ResolutionMethod::AllMethodsFailed => {
                StrategyAttempt::miss(method, None, "terminal marker, not a strategy")
            }
        }
    }

    async fn try_known(&self, sources: &DataSources, project: &str) -> StrategyAttempt {
        let method = ResolutionMethod::KnownAddress;
        let raw = match self.known_entry(project) {
            None => return StrategyAttempt::miss(method, None, "not in known table"),
            Some(None) => return StrategyAttempt::miss(method, None, "no published address"),
            Some(Some(raw)) => raw,
        };
        let Some(address) = normalize_address(raw) else {
            return StrategyAttempt::miss(method, None, format!("malformed address {}", raw));
        };
        Self::confirm_contract(sources, method, address).await
    }

    async fn try_search(sources: &DataSources, project: &str) -> StrategyAttempt {
        let method = ResolutionMethod::BlockscoutSearch;
        let hits = match sources.explorer.search(project).await {
            Ok(hits) => hits,
            Err(e) => return StrategyAttempt::miss(method, None, format!("search failed: {}", e)),
        };
        let Some(first) = hits.first() else {
            return StrategyAttempt::miss(method, None, "no search results");
        };
        let Some(raw) = first.address() else {
            return StrategyAttempt::miss(method, None, "first result has no address");
        };
        let Some(address) = normalize_address(raw) else {
            return StrategyAttempt::miss(method, None, format!("malformed address {}", raw));
        };
        Self::confirm_contract(sources, method, address).await
    }

    async fn try_defillama(&self, sources: &DataSources, project: &str) -> StrategyAttempt {
        let method = ResolutionMethod::DefillamaMatch;
        let protocols = match sources.llama.protocols().await {
            Ok(protocols) => protocols,
            Err(e) => {
                let detail = format!("protocol listing failed: {}", e);
                return StrategyAttempt::miss(method, None, detail);
            }
        };
        let Some(protocol) = find_protocol(&protocols, project) else {
            return StrategyAttempt::miss(method, None, "no matching protocol");
        };
        match protocol
            .address
            .as_deref()
            .and_then(|raw| pick_chain_address(raw, &self.chain))
        {
            Some(address) => {
                StrategyAttempt::hit(method, address, format!("matched protocol {}", protocol.name))
            }
            None => StrategyAttempt::miss(
                method,
                None,
                format!("protocol {} has no {} address", protocol.name, self.chain),
            ),
        }
    }

    /// Accept `address` only if `eth_getCode` shows contract code
    async fn confirm_contract(
        sources: &DataSources,
        method: ResolutionMethod,
        address: String,
    ) -> StrategyAttempt {
        match sources.rpc.get_code(&address).await {
            Ok(code) if code.is_contract => {
                StrategyAttempt::hit(method, address, "contract code present")
            }
            Ok(_) => StrategyAttempt::miss(method, Some(address), "no contract code"),
            Err(e) => {
                let detail = format!("eth_getCode failed: {}", e);
                StrategyAttempt::miss(method, Some(address), detail)
            }
        }
    }
}
