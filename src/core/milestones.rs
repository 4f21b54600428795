//! Milestone Detector
//!
//! Compares current values against ascending threshold tables and records
//! every crossed threshold. Recording goes through the store's idempotent
//! insert, so re-running a check never duplicates a row or resets `alerted`.

use tracing::{debug, info};

use crate::models::config::MilestoneConfig;
use crate::models::errors::AppResult;
use crate::models::types::{
    Milestone, MilestoneInsert, MilestoneKind, MilestoneMetric, NewMilestone,
};
use crate::providers::blockscout::ChainStats;
use crate::storage::Store;
use crate::utils::constants::{
    ACTIVE_WALLETS_THRESHOLDS, ECOSYSTEM_TVL_THRESHOLDS, ECOSYSTEM_TXS_THRESHOLDS,
    PROJECT_TVL_THRESHOLDS,
};
use crate::utils::format::format_number;

/// Every threshold ≤ `value`, in table order
pub fn crossed_thresholds(value: f64, thresholds: &[f64]) -> Vec<f64> {
    thresholds.iter().copied().filter(|t| value >= *t).collect()
}

/// Multiples of `interval` in `[floor, count]`
pub fn deployment_milestones(count: u64, interval: u64, floor: u64) -> Vec<u64> {
    if interval == 0 {
        return Vec::new();
    }
    (1..=count / interval)
        .map(|n| n * interval)
        .filter(|m| *m >= floor)
        .collect()
}

fn ecosystem(metric: MilestoneMetric, threshold: f64, actual_value: f64) -> NewMilestone {
    NewMilestone {
        kind: MilestoneKind::Ecosystem,
        subject: None,
        metric,
        threshold,
        actual_value,
    }
}

/// Ecosystem candidates for TVL, total txs, active wallets and deployment count
pub fn ecosystem_candidates(
    tvl: Option<f64>,
    stats: Option<&ChainStats>,
    deployment_count: i64,
    config: &MilestoneConfig,
) -> Vec<NewMilestone> {
    let mut out = Vec::new();

    if let Some(tvl) = tvl.filter(|v| *v > 0.0) {
        out.extend(
            crossed_thresholds(tvl, &ECOSYSTEM_TVL_THRESHOLDS)
                .into_iter()
                .map(|t| ecosystem(MilestoneMetric::Tvl, t, tvl)),
        );
    }

    if let Some(stats) = stats {
        if let Some(txs) = stats.total_transactions.filter(|v| *v > 0) {
            let txs = txs as f64;
            out.extend(
                crossed_thresholds(txs, &ECOSYSTEM_TXS_THRESHOLDS)
                    .into_iter()
                    .map(|t| ecosystem(MilestoneMetric::TotalTxs, t, txs)),
            );
        }
        if let Some(addrs) = stats.total_addresses.filter(|v| *v > 0) {
            let addrs = addrs as f64;
            out.extend(
                crossed_thresholds(addrs, &ACTIVE_WALLETS_THRESHOLDS)
                    .into_iter()
                    .map(|t| ecosystem(MilestoneMetric::ActiveWallets, t, addrs)),
            );
        }
    }

    let count = deployment_count.max(0) as u64;
    out.extend(
        deployment_milestones(count, config.deployment_interval, config.deployment_floor)
            .into_iter()
            .map(|t| ecosystem(MilestoneMetric::DeploymentCount, t as f64, count as f64)),
    );

    out
}

/// Project TVL candidates; nothing when TVL is unknown or zero
pub fn project_candidates(project: &str, tvl: Option<f64>) -> Vec<NewMilestone> {
    let Some(tvl) = tvl.filter(|v| *v > 0.0) else {
        return Vec::new();
    };
    crossed_thresholds(tvl, &PROJECT_TVL_THRESHOLDS)
        .into_iter()
        .map(|threshold| NewMilestone {
            kind: MilestoneKind::Project,
            subject: Some(project.to_string()),
            metric: MilestoneMetric::Tvl,
            threshold,
            actual_value: tvl,
        })
        .collect()
}

/// Insert candidates; returns only the rows that did not exist yet
pub fn record(store: &Store, candidates: &[NewMilestone]) -> AppResult<Vec<Milestone>> {
    let mut created = Vec::new();
    for candidate in candidates {
        match store.insert_milestone(candidate)? {
            MilestoneInsert::Created(milestone) => {
                info!(
                    "🏆 New milestone: {}/{}{} crossed {}",
                    milestone.kind.as_str(),
                    milestone.metric.as_str(),
                    milestone
                        .subject
                        .as_deref()
                        .map(|s| format!(" @{}", s))
                        .unwrap_or_default(),
                    format_number(milestone.threshold)
                );
                created.push(milestone);
            }
            MilestoneInsert::Existing(milestone) => {
                debug!(
                    "Milestone {} already recorded ({}/{} {})",
                    milestone.id,
                    milestone.kind.as_str(),
                    milestone.metric.as_str(),
                    milestone.threshold
                );
            }
        }
    }
    Ok(created)
}

/// Check and record ecosystem milestones
pub fn check_ecosystem(
    store: &Store,
    config: &MilestoneConfig,
    tvl: Option<f64>,
    stats: Option<&ChainStats>,
    deployment_count: i64,
) -> AppResult<Vec<Milestone>> {
    record(
        store,
        &ecosystem_candidates(tvl, stats, deployment_count, config),
    )
}

/// Check and record project TVL milestones
pub fn check_project(store: &Store, project: &str, tvl: Option<f64>) -> AppResult<Vec<Milestone>> {
    record(store, &project_candidates(project, tvl))
}
