//! Enrichment Orchestrator
//!
//! One run walks `Ecosystem → Projects → Resolution → Done`:
//! - Ecosystem: DeFiLlama TVL + Blockscout stats (each may fail alone), snapshot, milestones
//! - Projects: every deployment with an address, one at a time, paced
//! - Resolution: cascade for every deployment without an address, paced
//!
//! A failed phase is logged and recorded in the report; the next phase
//! still runs. A failed project is logged and the loop moves on.

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use serde::Serialize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

use super::milestones;
use super::resolver::AddressResolver;
use super::scoring::{score_project, ScoreParams, SignalScore};
use crate::models::config::TrackerConfig;
use crate::models::errors::{AppError, AppResult};
use crate::models::types::{
    Classification, Deployment, DeploymentUpdate, Milestone, NewEcosystemMetrics,
    NewProjectMetrics,
};
use crate::providers::defillama::{tvl_for_project, Protocol};
use crate::providers::DataSources;
use crate::storage::Store;
use crate::utils::cache::{system_clock, Clock};
use crate::utils::constants::TX_AVERAGE_WINDOW_DAYS;
use crate::utils::decoder::{parse_u256, wei_to_eth};
use crate::utils::format::{format_usd, or_na};

// ============================================
// RUN STATE
// ============================================

/// Run phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Ecosystem,
    Projects,
    Resolution,
    Done,
}

impl Phase {
    pub fn next(self) -> Self {
        match self {
            Self::Ecosystem => Self::Projects,
            Self::Projects => Self::Resolution,
            Self::Resolution | Self::Done => Self::Done,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ecosystem => "ecosystem",
            Self::Projects => "projects",
            Self::Resolution => "resolution",
            Self::Done => "done",
        }
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct EcosystemReport {
    pub total_tvl: Option<f64>,
    pub stats_available: bool,
    pub block_number: Option<u64>,
    pub deployment_count: i64,
    pub snapshot_id: i64,
    pub new_milestones: Vec<Milestone>,
}

/// Result of enriching one project
#[derive(Debug, Clone, Serialize)]
pub struct ProjectOutcome {
    pub deployment_id: String,
    pub project: String,
    pub snapshot_id: i64,
    pub score: SignalScore,
    pub new_milestones: Vec<Milestone>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ProjectsReport {
    pub attempted: usize,
    pub outcomes: Vec<ProjectOutcome>,
    /// (project, error) per failed project
    pub failures: Vec<(String, String)>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ResolutionReport {
    pub attempted: usize,
    pub resolved: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct PhaseFailure {
    pub phase: Phase,
    pub code: &'static str,
    pub message: String,
}

/// Everything one run did
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunReport {
    pub ecosystem: Option<EcosystemReport>,
    pub projects: Option<ProjectsReport>,
    pub resolution: Option<ResolutionReport>,
    pub failures: Vec<PhaseFailure>,
    pub elapsed_ms: u128,
}

impl RunReport {
    /// New milestones across all phases
    pub fn new_milestones(&self) -> usize {
        self.ecosystem.as_ref().map(|e| e.new_milestones.len()).unwrap_or(0)
            + self
                .projects
                .as_ref()
                .map(|p| p.outcomes.iter().map(|o| o.new_milestones.len()).sum())
                .unwrap_or(0)
    }

    fn fail(&mut self, phase: Phase, err: AppError) {
        error!("❌ {} phase failed: {}", phase.as_str(), err);
        self.failures.push(PhaseFailure {
            phase,
            code: err.code_str(),
            message: err.message,
        });
    }
}

// ============================================
// ENRICHER
// ============================================

/// Drives the enrichment pipeline against one store
pub struct Enricher {
    config: TrackerConfig,
    sources: DataSources,
    store: Arc<Store>,
    resolver: AddressResolver,
    clock: Clock,
}

impl Enricher {
    pub fn new(
        config: TrackerConfig,
        sources: DataSources,
        store: Arc<Store>,
        clock: Clock,
    ) -> Self {
        let resolver = AddressResolver::new(&config.chain_name);
        Self {
            config,
            sources,
            store,
            resolver,
            clock,
        }
    }

    /// Open the store and sources from configuration, on the wall clock
    pub fn from_config(config: TrackerConfig) -> AppResult<Self> {
        let clock = system_clock();
        let store = Arc::new(Store::open(&config.db_path)?.with_clock(clock.clone()));
        let sources = DataSources::from_config(&config, clock.clone())?;
        Ok(Self::new(config, sources, store, clock))
    }

    pub fn with_resolver(mut self, resolver: AddressResolver) -> Self {
        self.resolver = resolver;
        self
    }

    pub fn store(&self) -> &Arc<Store> {
        &self.store
    }

    pub fn sources(&self) -> &DataSources {
        &self.sources
    }

    pub fn resolver(&self) -> &AddressResolver {
        &self.resolver
    }

    fn now(&self) -> DateTime<Utc> {
        (self.clock)()
    }

    /// Full run through every phase
    pub async fn run(&self) -> RunReport {
        info!("=== Enrichment pipeline starting ===");
        let start = Instant::now();
        let mut report = RunReport::default();

        let mut phase = Phase::Ecosystem;
        while phase != Phase::Done {
            self.run_phase(phase, &mut report).await;
            phase = phase.next();
        }

        report.elapsed_ms = start.elapsed().as_millis();
        info!(
            "=== Enrichment complete in {:.1}s ({} phase failures, {} new milestones) ===",
            report.elapsed_ms as f64 / 1000.0,
            report.failures.len(),
            report.new_milestones()
        );
        report
    }

    /// Run a single phase, recording its result or failure in `report`
    pub async fn run_phase(&self, phase: Phase, report: &mut RunReport) {
        match phase {
            Phase::Ecosystem => match self.enrich_ecosystem().await {
                Ok(r) => report.ecosystem = Some(r),
                Err(e) => report.fail(phase, e),
            },
            Phase::Projects => match self.enrich_projects().await {
                Ok(r) => report.projects = Some(r),
                Err(e) => report.fail(phase, e),
            },
            Phase::Resolution => match self.resolve_new_addresses().await {
                Ok(r) => report.resolution = Some(r),
                Err(e) => report.fail(phase, e),
            },
            Phase::Done => {}
        }
    }

    // ============================================
    // ECOSYSTEM PHASE
    // ============================================

    pub async fn enrich_ecosystem(&self) -> AppResult<EcosystemReport> {
        info!("🌐 Enriching ecosystem metrics...");

        let total_tvl = match self.sources.llama.ecosystem_tvl().await {
            Ok(tvl) => tvl.and_then(|t| t.tvl),
            Err(e) => {
                warn!("⚠️ DeFiLlama TVL fetch failed: {}", e);
                None
            }
        };
        info!("   DeFiLlama TVL: {}", format_usd(total_tvl));

        let stats = match self.sources.explorer.stats().await {
            Ok(stats) => {
                info!(
                    "   Blockscout: {} addresses, {} txs",
                    or_na(stats.total_addresses),
                    or_na(stats.total_transactions)
                );
                Some(stats)
            }
            Err(e) => {
                warn!("⚠️ Blockscout stats fetch failed: {}", e);
                None
            }
        };

        let block_number = match self.sources.rpc.get_block_number().await {
            Ok(n) => {
                info!("   Chain head: block {}", n);
                Some(n)
            }
            Err(e) => {
                warn!("⚠️ eth_blockNumber failed: {}", e);
                None
            }
        };

        let deployment_count = self.store.get_deployment_count()?;
        let snapshot = NewEcosystemMetrics {
            total_tvl,
            total_addresses: stats.as_ref().and_then(|s| s.total_addresses),
            total_txs: stats.as_ref().and_then(|s| s.total_transactions),
            txs_24h: stats.as_ref().and_then(|s| s.transactions_today),
            avg_gas_price: stats.as_ref().and_then(|s| s.average_gas_price()),
            avg_block_time: stats.as_ref().and_then(|s| s.average_block_time),
            deployment_count,
            snapshot_at: self.now(),
        };
        let snapshot_id = self.store.insert_ecosystem_metrics(&snapshot)?;
        info!("💾 Ecosystem snapshot saved ({} deployments)", deployment_count);

        let new_milestones = milestones::check_ecosystem(
            &self.store,
            &self.config.milestones,
            total_tvl,
            stats.as_ref(),
            deployment_count,
        )?;

        Ok(EcosystemReport {
            total_tvl,
            stats_available: stats.is_some(),
            block_number,
            deployment_count,
            snapshot_id,
            new_milestones,
        })
    }

    // ============================================
    // PROJECT PHASE
    // ============================================

    pub async fn enrich_projects(&self) -> AppResult<ProjectsReport> {
        let projects = self.store.get_deployments_with_address()?;
        info!("📊 Enriching {} projects with contract addresses...", projects.len());

        let ecosystem_tvl = self
            .store
            .get_latest_ecosystem_metrics()?
            .and_then(|e| e.total_tvl);

        let protocols = match self.sources.llama.protocols().await {
            Ok(protocols) => protocols,
            Err(e) => {
                warn!("⚠️ DeFiLlama protocols fetch failed: {}", e);
                Vec::new()
            }
        };

        let mut report = ProjectsReport {
            attempted: projects.len(),
            ..Default::default()
        };
        for project in &projects {
            match self.enrich_project(project, ecosystem_tvl, &protocols).await {
                Ok(outcome) => report.outcomes.push(outcome),
                Err(e) => {
                    warn!("⚠️ Failed to enrich @{}: {}", project.project, e);
                    report.failures.push((project.project.clone(), e.to_string()));
                }
            }
            pause(self.config.project_pause).await;
        }

        info!(
            "   Enriched {}/{} projects",
            report.outcomes.len(),
            report.attempted
        );
        Ok(report)
    }

    /// Enrich, score and snapshot one deployment
    pub async fn enrich_project(
        &self,
        project: &Deployment,
        ecosystem_tvl: Option<f64>,
        protocols: &[Protocol],
    ) -> AppResult<ProjectOutcome> {
        let address = project
            .contract_address
            .as_deref()
            .filter(|a| !a.is_empty())
            .ok_or_else(|| {
                AppError::store(format!("@{} has no contract address", project.project))
            })?;
        let now = self.now();

        // Explorer address info, RPC balance when the explorer is down
        let (tx_count, balance_wei) = match self.sources.explorer.address(address).await {
            Ok(info) => (
                info.transactions_count,
                info.coin_balance.as_deref().and_then(parse_u256),
            ),
            Err(e) => {
                warn!("⚠️ Blockscout address failed for @{}: {}", project.project, e);
                match self.sources.rpc.get_balance(address).await {
                    Ok(balance) => (None, Some(balance.wei)),
                    Err(e) => {
                        debug!("   RPC balance fallback failed for @{}: {}", project.project, e);
                        (None, None)
                    }
                }
            }
        };
        let balance_eth = balance_wei.map(wei_to_eth);

        let tvl_usd = self.project_tvl(project, protocols).await;

        // Any failure scores as not verified; only Ok or 404 is written back
        let (is_verified, definitive) = match self.sources.explorer.contract(address).await {
            Ok(contract) => (contract.is_verified(), true),
            Err(e) if e.is_not_found() => (false, true),
            Err(e) => {
                warn!("⚠️ Verification lookup failed for @{}: {}", project.project, e);
                (false, false)
            }
        };
        if definitive && is_verified != project.contract_verified {
            self.store.update_deployment(
                &project.id,
                &DeploymentUpdate {
                    contract_verified: Some(is_verified),
                    ..Default::default()
                },
            )?;
        }

        let previous = self.store.get_latest_project_metrics(&project.id)?;
        let tx_count_delta = match (tx_count, previous.as_ref().and_then(|p| p.tx_count)) {
            (Some(current), Some(prev)) => Some(current - prev),
            _ => None,
        };
        let tx_count_7d_avg = self.average_delta(&project.id, now)?;

        let score = score_project(
            &ScoreParams {
                tvl_usd,
                ecosystem_tvl,
                is_verified,
                tx_count_delta,
                tx_count_7d_avg,
                balance_eth,
                created_at: project.created_at,
                tx_count,
                category: project.category.clone(),
                defillama_listed: tvl_usd.is_some(),
            },
            now,
        );

        let snapshot_id = self.store.insert_project_metrics(&NewProjectMetrics {
            deployment_id: project.id.clone(),
            tvl_usd,
            tx_count,
            tx_count_delta,
            balance_wei,
            balance_eth,
            is_verified: Some(is_verified),
            score: Some(score.total),
            classification: Some(score.classification),
            snapshot_at: now,
        })?;

        info!(
            "   @{}: score={} [{}] tvl={} txs={}",
            project.project,
            score.total,
            score.classification.as_str(),
            format_usd(tvl_usd),
            or_na(tx_count)
        );
        if score.classification == Classification::Alpha {
            info!("{} ALPHA signal: @{}", score.classification.emoji(), project.project);
        }

        let new_milestones = milestones::check_project(&self.store, &project.project, tvl_usd)?;

        Ok(ProjectOutcome {
            deployment_id: project.id.clone(),
            project: project.project.clone(),
            snapshot_id,
            score,
            new_milestones,
        })
    }

    /// Listing lookup, then `/protocol/{slug}` when a slug is set but unmatched
    async fn project_tvl(&self, project: &Deployment, protocols: &[Protocol]) -> Option<f64> {
        let slug = project.defillama_slug.as_deref().filter(|s| !s.is_empty());
        let listed = tvl_for_project(protocols, self.sources.llama.chain(), &project.project, slug);
        if listed.is_some() {
            return listed;
        }

        let slug = slug?;
        if protocols.iter().any(|p| p.slug.as_deref() == Some(slug)) {
            return None;
        }
        match self.sources.llama.protocol_tvl(slug).await {
            Ok(tvl) => tvl,
            Err(e) => {
                debug!("   DeFiLlama protocol {} lookup failed: {}", slug, e);
                None
            }
        }
    }

    /// Mean of stored deltas over the trailing window; needs ≥ 2 snapshots
    fn average_delta(&self, deployment_id: &str, now: DateTime<Utc>) -> AppResult<Option<f64>> {
        let since = now - ChronoDuration::days(TX_AVERAGE_WINDOW_DAYS);
        let history = self.store.get_project_metrics_since(deployment_id, since)?;
        if history.len() < 2 {
            return Ok(None);
        }
        let deltas: Vec<i64> = history.iter().filter_map(|h| h.tx_count_delta).collect();
        if deltas.is_empty() {
            return Ok(None);
        }
        Ok(Some(deltas.iter().sum::<i64>() as f64 / deltas.len() as f64))
    }

    // ============================================
    // RESOLUTION PHASE
    // ============================================

    pub async fn resolve_new_addresses(&self) -> AppResult<ResolutionReport> {
        let unresolved = self.store.get_deployments_without_address()?;
        info!("🔍 Attempting address resolution for {} projects...", unresolved.len());

        let mut report = ResolutionReport {
            attempted: unresolved.len(),
            resolved: 0,
        };
        for deployment in &unresolved {
            match self.resolve_one(deployment).await {
                Ok(true) => report.resolved += 1,
                Ok(false) => {}
                Err(e) => warn!("⚠️ Resolution failed for @{}: {}", deployment.project, e),
            }
            pause(self.config.resolution_pause).await;
        }

        info!("   Resolved {}/{} addresses", report.resolved, report.attempted);
        Ok(report)
    }

    /// Cascade for one deployment; stores the address on success
    pub async fn resolve_one(&self, deployment: &Deployment) -> AppResult<bool> {
        let Some(resolution) = self
            .resolver
            .resolve(&self.sources, &self.store, deployment)
            .await?
        else {
            return Ok(false);
        };
        self.store.update_deployment(
            &deployment.id,
            &DeploymentUpdate {
                contract_address: Some(resolution.address),
                ..Default::default()
            },
        )?;
        Ok(true)
    }
}

async fn pause(duration: Duration) {
    if !duration.is_zero() {
        tokio::time::sleep(duration).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phase_order() {
        let mut phase = Phase::Ecosystem;
        let mut seen = vec![phase];
        while phase != Phase::Done {
            phase = phase.next();
            seen.push(phase);
        }
        assert_eq!(
            seen,
            vec![Phase::Ecosystem, Phase::Projects, Phase::Resolution, Phase::Done]
        );
        assert_eq!(Phase::Done.next(), Phase::Done);
    }

    #[test]
    fn test_report_records_failures() {
        let mut report = RunReport::default();
        report.fail(Phase::Projects, AppError::store("disk full"));
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].code, "STORE_ERROR");
        assert_eq!(report.new_milestones(), 0);
    }
}
