//! Human-readable rendering for logs and alert text

use crate::models::types::{Milestone, MilestoneKind, MilestoneMetric};

/// 1.2B / 3.4M / 56K / 789
pub fn format_number(n: f64) -> String {
    if n >= 1e9 {
        format!("{:.1}B", n / 1e9)
    } else if n >= 1e6 {
        format!("{:.1}M", n / 1e6)
    } else if n >= 1e3 {
        format!("{:.0}K", n / 1e3)
    } else {
        format!("{:.0}", n)
    }
}

/// `$1.2M`, or `N/A` when unknown
pub fn format_usd(value: Option<f64>) -> String {
    match value {
        Some(v) if v > 0.0 => format!("${}", format_number(v)),
        _ => "N/A".to_string(),
    }
}

/// Any displayable value, or `N/A` when unknown
pub fn or_na<T: std::fmt::Display>(value: Option<T>) -> String {
    value.map(|v| v.to_string()).unwrap_or_else(|| "N/A".to_string())
}

fn metric_label(kind: MilestoneKind, metric: MilestoneMetric) -> &'static str {
    match (kind, metric) {
        (MilestoneKind::Ecosystem, MilestoneMetric::Tvl) => "Total TVL",
        (MilestoneKind::Project, MilestoneMetric::Tvl) => "TVL",
        (_, MilestoneMetric::TotalTxs) => "Total Transactions",
        (_, MilestoneMetric::ActiveWallets) => "Active Wallets",
        (_, MilestoneMetric::DeploymentCount) => "Deployments Tracked",
    }
}

/// Alert text for a milestone, handed to whoever drains the queue
pub fn milestone_message(milestone: &Milestone) -> String {
    let label = metric_label(milestone.kind, milestone.metric);
    let value = format_number(milestone.actual_value);
    let threshold = format_number(milestone.threshold);

    match milestone.kind {
        MilestoneKind::Ecosystem => format!(
            "*MEGAETH ECOSYSTEM MILESTONE*\n\n{} has crossed *{}*\nCurrent: *{}*\n\n#MegaETH #Milestone",
            label, threshold, value
        ),
        MilestoneKind::Project => format!(
            "*PROJECT MILESTONE*\n\n@{}: {} crossed *${}*\nCurrent: *${}*\n\n#MegaETH #Milestone",
            milestone.subject.as_deref().unwrap_or("unknown"),
            label,
            threshold,
            value
        ),
    }
}
