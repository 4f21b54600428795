//! Signal Scoring Module
//! Maps a project's raw metrics plus ecosystem context to a 0-100 signal score
//!
//! Seven components, each computed independently, summed and capped at 100:
//! - TVL relative to ecosystem (25)
//! - Contract verified (15)
//! - Tx activity, 24h delta vs 7-day average (20)
//! - Balance health (10)
//! - Age + sustained activity (5)
//! - Category strength (10)
//! - Listed on DeFiLlama (15)

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::types::Classification;
use crate::utils::constants::{
    category_score, DEFAULT_CATEGORY, WEIGHT_AGE_SUSTAINED, WEIGHT_BALANCE_HEALTH,
    WEIGHT_CATEGORY_STRENGTH, WEIGHT_CONTRACT_VERIFIED, WEIGHT_DEFILLAMA_LISTED,
    WEIGHT_TVL_RELATIVE, WEIGHT_TX_ACTIVITY,
};

/// Raw inputs for one project
#[derive(Debug, Clone, Default)]
pub struct ScoreParams {
    pub tvl_usd: Option<f64>,
    pub ecosystem_tvl: Option<f64>,
    pub is_verified: bool,
    /// Tx count change since the previous snapshot
    pub tx_count_delta: Option<i64>,
    /// Average of recent deltas
    pub tx_count_7d_avg: Option<f64>,
    pub balance_eth: Option<f64>,
    pub created_at: Option<DateTime<Utc>>,
    /// Lifetime tx count
    pub tx_count: Option<i64>,
    pub category: Option<String>,
    pub defillama_listed: bool,
}

/// Points per component
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignalComponents {
    pub tvl_relative: u8,
    pub contract_verified: u8,
    pub tx_activity: u8,
    pub balance_health: u8,
    pub age_sustained: u8,
    pub category_strength: u8,
    pub defillama_listed: u8,
}

impl SignalComponents {
    pub fn sum(&self) -> u32 {
        [
            self.tvl_relative,
            self.contract_verified,
            self.tx_activity,
            self.balance_health,
            self.age_sustained,
            self.category_strength,
            self.defillama_listed,
        ]
        .iter()
        .map(|p| *p as u32)
        .sum()
    }
}

/// Individual factor contributing to score
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoreFactor {
    pub name: String,
    pub score: u8,
    pub max: u8,
    pub reason: String,
}

/// Final signal score
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignalScore {
    /// Overall score (0-100)
    pub total: u8,
    pub classification: Classification,
    /// Individual component scores
    pub components: SignalComponents,
    /// Detailed breakdown for transparency
    pub breakdown: Vec<ScoreFactor>,
}

impl SignalScore {
    /// One-line summary for logs
    pub fn summary(&self) -> String {
        format!(
            "{} {} [{}]",
            self.classification.emoji(),
            self.total,
            self.classification.as_str()
        )
    }
}

// ============================================
// COMPONENT RULES
// ============================================

/// 0 unless both TVLs are known and the ecosystem TVL is positive
pub fn tvl_relative_points(tvl_usd: Option<f64>, ecosystem_tvl: Option<f64>) -> u8 {
    match (tvl_usd, ecosystem_tvl) {
        (Some(tvl), Some(eco)) if eco > 0.0 => {
            let ratio = tvl / eco;
            if ratio > 0.10 {
                25
            } else if ratio > 0.05 {
                20
            } else if ratio > 0.01 {
                15
            } else if ratio > 0.001 {
                10
            } else {
                5
            }
        }
        _ => 0,
    }
}

pub fn verified_points(is_verified: bool) -> u8 {
    if is_verified {
        WEIGHT_CONTRACT_VERIFIED
    } else {
        0
    }
}

/// Delta vs average when a positive average exists, otherwise 4 for any activity
pub fn tx_activity_points(
    delta: Option<i64>,
    average: Option<f64>,
    tx_count: Option<i64>,
) -> u8 {
    match (delta, average) {
        (Some(delta), Some(avg)) if avg > 0.0 => {
            let ratio = delta as f64 / avg;
            if ratio > 2.0 {
                20
            } else if ratio > 1.5 {
                16
            } else if ratio > 1.0 {
                12
            } else if ratio > 0.5 {
                8
            } else {
                4
            }
        }
        _ if tx_count.unwrap_or(0) > 0 => 4,
        _ => 0,
    }
}

pub fn balance_points(balance_eth: Option<f64>) -> u8 {
    match balance_eth {
        Some(b) if b > 10.0 => 10,
        Some(b) if b > 1.0 => 8,
        Some(b) if b > 0.1 => 5,
        Some(b) if b > 0.0 => 2,
        _ => 0,
    }
}

/// Age in fractional days at `now`
pub fn age_days(created_at: DateTime<Utc>, now: DateTime<Utc>) -> f64 {
    (now - created_at).num_milliseconds() as f64 / 86_400_000.0
}

/// Old and active scores highest; young gets 1; old and idle ("ghost") gets 0
pub fn age_points(
    created_at: Option<DateTime<Utc>>,
    tx_count: Option<i64>,
    now: DateTime<Utc>,
) -> u8 {
    let Some(created_at) = created_at else {
        return 0;
    };
    let age = age_days(created_at, now);
    let active = tx_count.unwrap_or(0) > 0;
    if age > 7.0 && active {
        5
    } else if age > 3.0 && active {
        3
    } else if age < 3.0 {
        1
    } else {
        0
    }
}

pub fn category_points(category: Option<&str>) -> u8 {
    category_score(category.unwrap_or(DEFAULT_CATEGORY))
}

pub fn listed_points(listed: bool) -> u8 {
    if listed {
        WEIGHT_DEFILLAMA_LISTED
    } else {
        0
    }
}

fn opt<T: std::fmt::Display>(value: Option<T>) -> String {
    value.map(|v| v.to_string()).unwrap_or_else(|| "unknown".to_string())
}

// ============================================
// SCORE
// ============================================

/// Score one project. Pure; `now` only feeds the age component.
pub fn score_project(params: &ScoreParams, now: DateTime<Utc>) -> SignalScore {
    let components = SignalComponents {
        tvl_relative: tvl_relative_points(params.tvl_usd, params.ecosystem_tvl),
        contract_verified: verified_points(params.is_verified),
        tx_activity: tx_activity_points(
            params.tx_count_delta,
            params.tx_count_7d_avg,
            params.tx_count,
        ),
        balance_health: balance_points(params.balance_eth),
        age_sustained: age_points(params.created_at, params.tx_count, now),
        category_strength: category_points(params.category.as_deref()),
        defillama_listed: listed_points(params.defillama_listed),
    };

    let total = components.sum().min(100) as u8;

    let share = match (params.tvl_usd, params.ecosystem_tvl) {
        (Some(tvl), Some(eco)) if eco > 0.0 => format!("{:.2}% of ecosystem", tvl / eco * 100.0),
        _ => "TVL unknown".to_string(),
    };
    let breakdown = vec![
        ScoreFactor {
            name: "TVL relative".to_string(),
            score: components.tvl_relative,
            max: WEIGHT_TVL_RELATIVE,
            reason: share,
        },
        ScoreFactor {
            name: "Contract verified".to_string(),
            score: components.contract_verified,
            max: WEIGHT_CONTRACT_VERIFIED,
            reason: if params.is_verified {
                "Source verified on Blockscout".to_string()
            } else {
                "Contract NOT verified".to_string()
            },
        },
        ScoreFactor {
            name: "Tx activity".to_string(),
            score: components.tx_activity,
            max: WEIGHT_TX_ACTIVITY,
            reason: format!(
                "delta {} vs 7d avg {}, total {}",
                opt(params.tx_count_delta),
                opt(params.tx_count_7d_avg.map(|a| format!("{:.1}", a))),
                opt(params.tx_count)
            ),
        },
        ScoreFactor {
            name: "Balance health".to_string(),
            score: components.balance_health,
            max: WEIGHT_BALANCE_HEALTH,
            reason: format!("{} ETH", opt(params.balance_eth.map(|b| format!("{:.4}", b)))),
        },
        ScoreFactor {
            name: "Age + activity".to_string(),
            score: components.age_sustained,
            max: WEIGHT_AGE_SUSTAINED,
            reason: match params.created_at {
                Some(created) => format!("{:.1} days old", age_days(created, now)),
                None => "creation time unknown".to_string(),
            },
        },
        ScoreFactor {
            name: "Category".to_string(),
            score: components.category_strength,
            max: WEIGHT_CATEGORY_STRENGTH,
            reason: params
                .category
                .clone()
                .unwrap_or_else(|| DEFAULT_CATEGORY.to_string()),
        },
        ScoreFactor {
            name: "DeFiLlama listed".to_string(),
            score: components.defillama_listed,
            max: WEIGHT_DEFILLAMA_LISTED,
            reason: if params.defillama_listed {
                "TVL figure found".to_string()
            } else {
                "Not listed".to_string()
            },
        },
    ];

    SignalScore {
        total,
        classification: Classification::from_score(total),
        components,
        breakdown,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 11, 0, 0, 0).unwrap()
    }

    fn strong_project() -> ScoreParams {
        ScoreParams {
            tvl_usd: Some(6_000_000.0),
            ecosystem_tvl: Some(50_000_000.0),
            is_verified: true,
            tx_count_delta: Some(120),
            tx_count_7d_avg: Some(50.0),
            balance_eth: Some(2.0),
            created_at: Some(now() - Duration::days(10)),
            tx_count: Some(5_000),
            category: Some("defi".to_string()),
            defillama_listed: true,
        }
    }

    #[test]
    fn test_strong_project_is_alpha() {
        let score = score_project(&strong_project(), now());
        assert_eq!(score.components.tvl_relative, 25);
        assert_eq!(score.components.contract_verified, 15);
        assert_eq!(score.components.tx_activity, 20);
        assert_eq!(score.components.balance_health, 8);
        assert_eq!(score.components.age_sustained, 5);
        assert_eq!(score.components.category_strength, 10);
        assert_eq!(score.components.defillama_listed, 15);
        assert_eq!(score.total, 98);
        assert_eq!(score.classification, Classification::Alpha);
        assert_eq!(score.breakdown.len(), 7);
    }

    #[test]
    fn test_empty_project_is_risk() {
        let score = score_project(&ScoreParams::default(), now());
        // only the "other" category weight
        assert_eq!(score.total, 3);
        assert_eq!(score.classification, Classification::Risk);
    }

    #[test]
    fn test_tvl_ratio_table() {
        let eco = Some(1_000_000.0);
        let cases = [
            (Some(100_001.0), 25),
            (Some(100_000.0), 20),
            (Some(50_001.0), 20),
            (Some(10_001.0), 15),
            (Some(1_001.0), 10),
            (Some(1_000.0), 5),
            (Some(0.0), 5),
            (None, 0),
        ];
        for (tvl, expected) in cases {
            assert_eq!(tvl_relative_points(tvl, eco), expected, "tvl {:?}", tvl);
        }
        assert_eq!(tvl_relative_points(Some(10.0), Some(0.0)), 0);
        assert_eq!(tvl_relative_points(Some(10.0), None), 0);
    }

    #[test]
    fn test_tx_activity_table() {
        let cases = [(201, 20), (200, 16), (151, 16), (101, 12), (51, 8), (50, 4), (-10, 4)];
        for (delta, expected) in cases {
            assert_eq!(
                tx_activity_points(Some(delta), Some(100.0), Some(1)),
                expected,
                "delta {}",
                delta
            );
        }
        // no usable average: any lifetime activity earns the floor
        assert_eq!(tx_activity_points(Some(10), Some(0.0), Some(7)), 4);
        assert_eq!(tx_activity_points(None, None, Some(7)), 4);
        assert_eq!(tx_activity_points(None, None, Some(0)), 0);
        assert_eq!(tx_activity_points(Some(10), None, None), 0);
    }

    #[test]
    fn test_balance_table() {
        let cases = [
            (Some(10.5), 10),
            (Some(10.0), 8),
            (Some(1.0), 5),
            (Some(0.1), 2),
            (Some(0.0), 0),
            (None, 0),
        ];
        for (balance, expected) in cases {
            assert_eq!(balance_points(balance), expected, "balance {:?}", balance);
        }
    }

    #[test]
    fn test_age_rules() {
        let at = |days: i64| Some(now() - Duration::days(days));
        assert_eq!(age_points(at(10), Some(1), now()), 5);
        assert_eq!(age_points(at(5), Some(1), now()), 3);
        assert_eq!(age_points(at(1), None, now()), 1);
        // old and idle
        assert_eq!(age_points(at(10), Some(0), now()), 0);
        assert_eq!(age_points(at(5), None, now()), 0);
        assert_eq!(age_points(None, Some(100), now()), 0);
    }

    #[test]
    fn test_category_defaults_to_other() {
        assert_eq!(category_points(Some("DeFi")), 10);
        assert_eq!(category_points(Some("oracle")), 10);
        assert_eq!(category_points(Some("unknown-thing")), 3);
        assert_eq!(category_points(None), 3);
    }

    #[test]
    fn test_score_bounds() {
        let mut params = strong_project();
        params.balance_eth = Some(100.0);
        let score = score_project(&params, now());
        assert_eq!(score.total, 100);
        assert!(score.total as u32 <= 100);
        assert_eq!(score.components.sum(), 100);
    }

    #[test]
    fn test_classification_tracks_total() {
        let mut params = strong_project();
        params.is_verified = false;
        params.defillama_listed = false;
        params.tvl_usd = None;
        let score = score_project(&params, now());
        // 20 + 8 + 5 + 10
        assert_eq!(score.total, 43);
        assert_eq!(score.classification, Classification::Routine);
        assert_eq!(score.classification, Classification::from_score(score.total));
    }
}
