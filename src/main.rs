//! MegaETH Deployment Tracker - enrichment & signal scoring CLI
//!
//! Commands:
//! - `enrich`     run the pipeline (all phases, or one)
//! - `track`      register a deployment and try to resolve its address
//! - `milestones` dump unalerted milestones as JSON lines

use clap::{Parser, Subcommand, ValueEnum};
use eyre::{Result, WrapErr};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use megaeth_tracker::core::{Enricher, Phase, RunReport};
use megaeth_tracker::models::{Deployment, TrackerConfig};
use megaeth_tracker::utils::constants::{APP_NAME, APP_VERSION};
use megaeth_tracker::utils::decoder::parse_timestamp;
use megaeth_tracker::utils::format::milestone_message;

#[derive(Parser)]
#[command(
    name = "megaeth_tracker",
    version,
    about = "MegaETH deployment enrichment and signal scoring"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the enrichment pipeline
    Enrich {
        #[arg(long, value_enum, default_value_t = PhaseArg::All)]
        phase: PhaseArg,
    },
    /// Register a deployment, then attempt address resolution
    Track {
        /// Deployment id (announcement id); random when omitted
        #[arg(long)]
        id: Option<String>,
        #[arg(long)]
        project: String,
        #[arg(long)]
        url: Option<String>,
        /// Announcement text
        #[arg(long)]
        text: Option<String>,
        /// RFC3339 or `YYYY-MM-DD HH:MM:SS`
        #[arg(long)]
        created_at: Option<String>,
        #[arg(long)]
        category: Option<String>,
        /// DeFiLlama protocol slug
        #[arg(long)]
        slug: Option<String>,
    },
    /// Print unalerted milestones as JSON lines
    Milestones {
        /// Mark printed milestones as alerted
        #[arg(long)]
        mark: bool,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum PhaseArg {
    All,
    Ecosystem,
    Projects,
    Resolve,
}

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .init();

    let cli = Cli::parse();
    let config = TrackerConfig::from_env();
    info!("🚀 {} v{} ({})", APP_NAME, APP_VERSION, config.chain_name);

    let enricher = Enricher::from_config(config)
        .wrap_err("failed to open tracker store")?;

    match cli.command {
        Command::Enrich { phase } => {
            let report = match phase {
                PhaseArg::All => enricher.run().await,
                PhaseArg::Ecosystem => single_phase(&enricher, Phase::Ecosystem).await,
                PhaseArg::Projects => single_phase(&enricher, Phase::Projects).await,
                PhaseArg::Resolve => single_phase(&enricher, Phase::Resolution).await,
            };
            for failure in &report.failures {
                warn!(
                    "Phase {} failed [{}]: {}",
                    failure.phase.as_str(),
                    failure.code,
                    failure.message
                );
            }
        }
        Command::Track {
            id,
            project,
            url,
            text,
            created_at,
            category,
            slug,
        } => {
            let mut deployment = Deployment::new(
                id.unwrap_or_else(|| uuid::Uuid::new_v4().to_string()),
                project,
            );
            deployment.url = url;
            deployment.tweet_text = text;
            deployment.category = category;
            deployment.defillama_slug = slug;
            if let Some(raw) = created_at {
                deployment.created_at = parse_timestamp(&raw);
                if deployment.created_at.is_none() {
                    warn!("⚠️ Unparseable --created-at {:?}, leaving it empty", raw);
                }
            }

            let inserted = enricher.store().insert_deployment(&deployment)?;
            if inserted {
                info!("📝 Tracking @{} ({})", deployment.project, deployment.id);
            } else {
                info!("@{} ({}) already tracked", deployment.project, deployment.id);
            }

            let current = enricher
                .store()
                .get_deployment(&deployment.id)?
                .unwrap_or(deployment);
            if let Some(address) = current.contract_address.as_deref() {
                info!("   Address already known: {}", address);
            } else if !enricher.resolve_one(&current).await? {
                info!(
                    "   No address yet for @{}; the resolution phase will retry",
                    current.project
                );
            }
        }
        Command::Milestones { mark } => {
            let store = enricher.store();
            for milestone in store.get_unalerted_milestones()? {
                let mut line = serde_json::to_value(&milestone)?;
                line["message"] = serde_json::Value::String(milestone_message(&milestone));
                println!("{}", line);
                if mark {
                    store.mark_milestone_alerted(milestone.id)?;
                }
            }
        }
    }

    Ok(())
}

async fn single_phase(enricher: &Enricher, phase: Phase) -> RunReport {
    let mut report = RunReport::default();
    enricher.run_phase(phase, &mut report).await;
    report
}
