//! MegaETH Deployment Tracker Library
//!
//! Enriches tracked MegaETH deployments with on-chain and DeFiLlama data:
//! - Ecosystem snapshots (TVL, explorer stats, deployment count)
//! - Per-project metrics and a 0-100 signal score (ALPHA / ROUTINE / WARNING / RISK)
//! - Idempotent milestone detection for ecosystem and project thresholds
//! - Contract-address resolution cascade with an audit log

pub mod core;
pub mod models;
pub mod providers;
pub mod storage;
pub mod utils;

pub use crate::core::{
    score_project, AddressResolver, Enricher, Phase, RunReport, ScoreParams, SignalScore,
};
pub use models::{AppError, AppResult, Classification, Deployment, ErrorCode, TrackerConfig};
pub use providers::{BlockscoutClient, DataSources, DefiLlamaClient, FetchClient, RpcClient};
pub use storage::Store;
