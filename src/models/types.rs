//! Type definitions for the deployment tracker
//! Rows persisted by the store and the enums that label them

use alloy_primitives::U256;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Signal tier derived from the 0-100 score
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Classification {
    /// Score >= 75
    Alpha,
    /// Score >= 40
    Routine,
    /// Score >= 20
    Warning,
    /// Everything below
    Risk,
}

impl Classification {
    /// Classify a final (capped) score
    pub fn from_score(score: u8) -> Self {
        match score {
            75..=u8::MAX => Self::Alpha,
            40..=74 => Self::Routine,
            20..=39 => Self::Warning,
            _ => Self::Risk,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Alpha => "ALPHA",
            Self::Routine => "ROUTINE",
            Self::Warning => "WARNING",
            Self::Risk => "RISK",
        }
    }

    pub fn from_db(value: &str) -> Option<Self> {
        match value {
            "ALPHA" => Some(Self::Alpha),
            "ROUTINE" => Some(Self::Routine),
            "WARNING" => Some(Self::Warning),
            "RISK" => Some(Self::Risk),
            _ => None,
        }
    }

    pub fn emoji(&self) -> &'static str {
        match self {
            Self::Alpha => "🚀",
            Self::Routine => "✅",
            Self::Warning => "🟠",
            Self::Risk => "💀",
        }
    }
}

/// A tracked project
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Deployment {
    pub id: String,
    pub project: String,
    pub url: Option<String>,
    /// Text of the announcement the deployment was detected from
    pub tweet_text: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub contract_address: Option<String>,
    pub category: Option<String>,
    pub defillama_slug: Option<String>,
    pub contract_verified: bool,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Deployment {
    /// Minimal deployment as first observed
    pub fn new(id: impl Into<String>, project: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            project: project.into(),
            url: None,
            tweet_text: None,
            created_at: None,
            contract_address: None,
            category: None,
            defillama_slug: None,
            contract_verified: false,
            updated_at: None,
        }
    }
}

/// Fields enrichment is allowed to change on a deployment. `None` = leave as is.
#[derive(Debug, Clone, Default)]
pub struct DeploymentUpdate {
    pub contract_address: Option<String>,
    pub category: Option<String>,
    pub defillama_slug: Option<String>,
    pub contract_verified: Option<bool>,
}

impl DeploymentUpdate {
    pub fn is_empty(&self) -> bool {
        self.contract_address.is_none()
            && self.category.is_none()
            && self.defillama_slug.is_none()
            && self.contract_verified.is_none()
    }
}

/// One per-project measurement, as written
#[derive(Debug, Clone)]
pub struct NewProjectMetrics {
    pub deployment_id: String,
    pub tvl_usd: Option<f64>,
    pub tx_count: Option<i64>,
    pub tx_count_delta: Option<i64>,
    pub balance_wei: Option<U256>,
    pub balance_eth: Option<f64>,
    pub is_verified: Option<bool>,
    pub score: Option<u8>,
    pub classification: Option<Classification>,
    pub snapshot_at: DateTime<Utc>,
}

/// Stored per-project snapshot
#[derive(Debug, Clone, Serialize)]
pub struct ProjectMetricsSnapshot {
    pub id: i64,
    pub deployment_id: String,
    pub tvl_usd: Option<f64>,
    pub tx_count: Option<i64>,
    pub tx_count_delta: Option<i64>,
    pub balance_wei: Option<U256>,
    pub balance_eth: Option<f64>,
    pub is_verified: Option<bool>,
    pub score: Option<u8>,
    pub classification: Option<Classification>,
    pub snapshot_at: DateTime<Utc>,
}

/// One ecosystem measurement, as written. Missing sources stay `None`.
#[derive(Debug, Clone)]
pub struct NewEcosystemMetrics {
    pub total_tvl: Option<f64>,
    pub total_addresses: Option<i64>,
    pub total_txs: Option<i64>,
    pub txs_24h: Option<i64>,
    pub avg_gas_price: Option<String>,
    pub avg_block_time: Option<f64>,
    pub deployment_count: i64,
    pub snapshot_at: DateTime<Utc>,
}

/// Stored ecosystem snapshot
#[derive(Debug, Clone, Serialize)]
pub struct EcosystemMetricsSnapshot {
    pub id: i64,
    pub total_tvl: Option<f64>,
    pub total_addresses: Option<i64>,
    pub total_txs: Option<i64>,
    pub txs_24h: Option<i64>,
    pub avg_gas_price: Option<String>,
    pub avg_block_time: Option<f64>,
    pub deployment_count: Option<i64>,
    pub snapshot_at: DateTime<Utc>,
}

/// Scope of a milestone
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MilestoneKind {
    Ecosystem,
    Project,
}

impl MilestoneKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ecosystem => "ecosystem",
            Self::Project => "project",
        }
    }

    pub fn from_db(value: &str) -> Option<Self> {
        match value {
            "ecosystem" => Some(Self::Ecosystem),
            "project" => Some(Self::Project),
            _ => None,
        }
    }
}

/// Metric a milestone threshold applies to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MilestoneMetric {
    Tvl,
    TotalTxs,
    ActiveWallets,
    DeploymentCount,
}

impl MilestoneMetric {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Tvl => "tvl",
            Self::TotalTxs => "total_txs",
            Self::ActiveWallets => "active_wallets",
            Self::DeploymentCount => "deployment_count",
        }
    }

    pub fn from_db(value: &str) -> Option<Self> {
        match value {
            "tvl" => Some(Self::Tvl),
            "total_txs" => Some(Self::TotalTxs),
            "active_wallets" => Some(Self::ActiveWallets),
            "deployment_count" => Some(Self::DeploymentCount),
            _ => None,
        }
    }
}

/// Milestone candidate produced by the detector
#[derive(Debug, Clone, PartialEq)]
pub struct NewMilestone {
    pub kind: MilestoneKind,
    /// `None` for ecosystem milestones
    pub subject: Option<String>,
    pub metric: MilestoneMetric,
    pub threshold: f64,
    pub actual_value: f64,
}

/// Stored milestone
#[derive(Debug, Clone, Serialize)]
pub struct Milestone {
    pub id: i64,
    #[serde(rename = "type")]
    pub kind: MilestoneKind,
    pub subject: Option<String>,
    pub metric: MilestoneMetric,
    pub threshold: f64,
    pub actual_value: f64,
    pub alerted: bool,
    pub created_at: DateTime<Utc>,
}

/// Result of an idempotent milestone insert
#[derive(Debug, Clone)]
pub enum MilestoneInsert {
    /// Row did not exist and was written
    Created(Milestone),
    /// Row already existed; returned untouched
    Existing(Milestone),
}

impl MilestoneInsert {
    pub fn milestone(&self) -> &Milestone {
        match self {
            Self::Created(m) | Self::Existing(m) => m,
        }
    }

    pub fn is_new(&self) -> bool {
        matches!(self, Self::Created(_))
    }
}

/// How an address was (or was not) found
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionMethod {
    KnownAddress,
    BlockscoutSearch,
    DefillamaMatch,
    AllMethodsFailed,
}

impl ResolutionMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::KnownAddress => "known_address",
            Self::BlockscoutSearch => "blockscout_search",
            Self::DefillamaMatch => "defillama_match",
            Self::AllMethodsFailed => "all_methods_failed",
        }
    }

    pub fn from_db(value: &str) -> Option<Self> {
        match value {
            "known_address" => Some(Self::KnownAddress),
            "blockscout_search" => Some(Self::BlockscoutSearch),
            "defillama_match" => Some(Self::DefillamaMatch),
            "all_methods_failed" => Some(Self::AllMethodsFailed),
            _ => None,
        }
    }

    /// Fixed confidence granted when this method succeeds
    pub fn confidence(&self) -> f64 {
        match self {
            Self::KnownAddress => 1.0,
            Self::BlockscoutSearch => 0.7,
            Self::DefillamaMatch => 0.6,
            Self::AllMethodsFailed => 0.0,
        }
    }
}

/// Audit row for a resolution try, as written
#[derive(Debug, Clone)]
pub struct NewResolutionAttempt {
    pub deployment_id: String,
    pub method: ResolutionMethod,
    pub query: Option<String>,
    pub result_address: Option<String>,
    pub confidence: f64,
    pub success: bool,
}

/// Stored resolution attempt
#[derive(Debug, Clone, Serialize)]
pub struct ResolutionAttempt {
    pub id: i64,
    pub deployment_id: String,
    pub method: ResolutionMethod,
    pub query: Option<String>,
    pub result_address: Option<String>,
    pub confidence: f64,
    pub success: bool,
    pub attempted_at: DateTime<Utc>,
}

/// Successful cascade outcome
#[derive(Debug, Clone, PartialEq)]
pub struct Resolution {
    pub address: String,
    pub confidence: f64,
    pub method: ResolutionMethod,
}
