//! Persistence Store (SQLite)
//!
//! - Deployments: insert-or-ignore, enrichment fields updated in place
//! - Project/ecosystem snapshots: append-only, latest = newest `snapshot_at`, then `id`
//! - Milestones: one row per `(type, subject, metric, threshold)`, only `alerted` mutates
//! - Resolution attempts: append-only audit log
//!
//! Every call takes the connection lock and is its own atomic unit.

pub mod schema;

use chrono::{DateTime, Duration as ChronoDuration, SecondsFormat, Utc};
use rusqlite::types::{Type, Value as SqlValue};
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Params, Row};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, info};

use crate::models::errors::{AppError, AppResult};
use crate::models::types::{
    Classification, Deployment, DeploymentUpdate, EcosystemMetricsSnapshot, Milestone,
    MilestoneInsert, MilestoneKind, MilestoneMetric, NewEcosystemMetrics, NewMilestone,
    NewProjectMetrics, NewResolutionAttempt, ProjectMetricsSnapshot, ResolutionAttempt,
    ResolutionMethod,
};
use crate::utils::cache::{system_clock, Clock};
use crate::utils::decoder::{parse_timestamp, parse_u256};

/// Default number of snapshots returned by history queries
pub const DEFAULT_HISTORY_LIMIT: u32 = 48;

const DEPLOYMENT_COLUMNS: &str = "id, project, url, tweet_text, created_at, contract_address, \
     category, defillama_slug, contract_verified, updated_at";

const PROJECT_METRICS_COLUMNS: &str = "id, deployment_id, tvl_usd, tx_count, tx_count_delta, \
     balance_wei, balance_eth, is_verified, score, classification, snapshot_at";

const ECOSYSTEM_COLUMNS: &str = "id, total_tvl, total_addresses, total_txs, txs_24h, \
     avg_gas_price, avg_block_time, deployment_count, snapshot_at";

const MILESTONE_COLUMNS: &str =
    "id, type, subject, metric, threshold, actual_value, alerted, created_at";

const RESOLUTION_COLUMNS: &str = "id, deployment_id, method, query, result_address, confidence, \
     success, attempted_at";

/// Timestamp as stored
pub fn to_db_time(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

// ============================================
// ROW MAPPING
// ============================================

fn conversion_error(idx: usize, msg: String) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, msg.into())
}

fn time_at(row: &Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let raw: String = row.get(idx)?;
    parse_timestamp(&raw).ok_or_else(|| conversion_error(idx, format!("bad timestamp {}", raw)))
}

/// Unparsable optional timestamps read as `None`
fn opt_time_at(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<DateTime<Utc>>> {
    let raw: Option<String> = row.get(idx)?;
    Ok(raw.as_deref().and_then(parse_timestamp))
}

fn deployment_from_row(row: &Row<'_>) -> rusqlite::Result<Deployment> {
    Ok(Deployment {
        id: row.get(0)?,
        project: row.get(1)?,
        url: row.get(2)?,
        tweet_text: row.get(3)?,
        created_at: opt_time_at(row, 4)?,
        contract_address: row.get(5)?,
        category: row.get(6)?,
        defillama_slug: row.get(7)?,
        contract_verified: row.get::<_, i64>(8)? != 0,
        updated_at: opt_time_at(row, 9)?,
    })
}

fn project_metrics_from_row(row: &Row<'_>) -> rusqlite::Result<ProjectMetricsSnapshot> {
    Ok(ProjectMetricsSnapshot {
        id: row.get(0)?,
        deployment_id: row.get(1)?,
        tvl_usd: row.get(2)?,
        tx_count: row.get(3)?,
        tx_count_delta: row.get(4)?,
        balance_wei: row.get::<_, Option<String>>(5)?.as_deref().and_then(parse_u256),
        balance_eth: row.get(6)?,
        is_verified: row.get::<_, Option<i64>>(7)?.map(|v| v != 0),
        score: row
            .get::<_, Option<i64>>(8)?
            .and_then(|s| u8::try_from(s).ok()),
        classification: row
            .get::<_, Option<String>>(9)?
            .as_deref()
            .and_then(Classification::from_db),
        snapshot_at: time_at(row, 10)?,
    })
}

fn ecosystem_from_row(row: &Row<'_>) -> rusqlite::Result<EcosystemMetricsSnapshot> {
    Ok(EcosystemMetricsSnapshot {
        id: row.get(0)?,
        total_tvl: row.get(1)?,
        total_addresses: row.get(2)?,
        total_txs: row.get(3)?,
        txs_24h: row.get(4)?,
        avg_gas_price: row.get(5)?,
        avg_block_time: row.get(6)?,
        deployment_count: row.get(7)?,
        snapshot_at: time_at(row, 8)?,
    })
}

fn milestone_from_row(row: &Row<'_>) -> rusqlite::Result<Milestone> {
    let kind: String = row.get(1)?;
    let metric: String = row.get(3)?;
    Ok(Milestone {
        id: row.get(0)?,
        kind: MilestoneKind::from_db(&kind)
            .ok_or_else(|| conversion_error(1, format!("unknown milestone type {}", kind)))?,
        subject: row.get(2)?,
        metric: MilestoneMetric::from_db(&metric)
            .ok_or_else(|| conversion_error(3, format!("unknown milestone metric {}", metric)))?,
        threshold: row.get(4)?,
        actual_value: row.get(5)?,
        alerted: row.get::<_, i64>(6)? != 0,
        created_at: time_at(row, 7)?,
    })
}

fn resolution_from_row(row: &Row<'_>) -> rusqlite::Result<ResolutionAttempt> {
    let method: String = row.get(2)?;
    Ok(ResolutionAttempt {
        id: row.get(0)?,
        deployment_id: row.get(1)?,
        method: ResolutionMethod::from_db(&method)
            .ok_or_else(|| conversion_error(2, format!("unknown resolution method {}", method)))?,
        query: row.get(3)?,
        result_address: row.get(4)?,
        confidence: row.get(5)?,
        success: row.get::<_, i64>(6)? != 0,
        attempted_at: time_at(row, 7)?,
    })
}

fn query_all<T, P: Params>(
    conn: &Connection,
    sql: &str,
    params: P,
    map: fn(&Row<'_>) -> rusqlite::Result<T>,
) -> AppResult<Vec<T>> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt
        .query_map(params, map)?
        .collect::<rusqlite::Result<Vec<T>>>()?;
    Ok(rows)
}

// ============================================
// STORE
// ============================================

/// SQLite-backed store; single writer
pub struct Store {
    conn: Mutex<Connection>,
    clock: Clock,
}

impl Store {
    /// Open (and create) the database file, applying WAL and the schema
    pub fn open(path: &Path) -> AppResult<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| {
                AppError::store_connection(format!(
                    "Failed to create data directory {}: {}",
                    parent.display(),
                    e
                ))
            })?;
        }

        let conn = Connection::open(path).map_err(|e| {
            AppError::store_connection(format!("Failed to open {}: {}", path.display(), e))
        })?;
        let store = Self::from_connection(conn)?;
        info!("🗄️ Store opened at {}", path.display());
        Ok(store)
    }

    /// Throwaway database for tests and dry runs
    pub fn open_in_memory() -> AppResult<Self> {
        let conn = Connection::open_in_memory().map_err(|e| {
            AppError::store_connection(format!("Failed to open in-memory db: {}", e))
        })?;
        Self::from_connection(conn)
    }

    fn from_connection(conn: Connection) -> AppResult<Self> {
        let configure = || -> rusqlite::Result<()> {
            conn.pragma_update(None, "journal_mode", "WAL")?;
            conn.pragma_update(None, "foreign_keys", "ON")?;
            conn.busy_timeout(std::time::Duration::from_secs(10))?;
            schema::initialize(&conn)
        };
        configure().map_err(|e| {
            AppError::store_connection(format!("Failed to initialize schema: {}", e))
        })?;

        Ok(Self {
            conn: Mutex::new(conn),
            clock: system_clock(),
        })
    }

    /// Replace the clock used for `updated_at`, `created_at` and `attempted_at`
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    fn lock(&self) -> AppResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| AppError::store("Store connection lock poisoned"))
    }

    fn now(&self) -> DateTime<Utc> {
        (self.clock)()
    }

    // ============================================
    // DEPLOYMENTS
    // ============================================

    /// Insert unless the id exists; returns whether a row was written
    pub fn insert_deployment(&self, deployment: &Deployment) -> AppResult<bool> {
        let conn = self.lock()?;
        let changed = conn.execute(
            "INSERT OR IGNORE INTO deployments
                (id, project, url, tweet_text, created_at, contract_address, category,
                 defillama_slug, contract_verified, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                deployment.id,
                deployment.project,
                deployment.url,
                deployment.tweet_text,
                deployment.created_at.map(to_db_time),
                deployment.contract_address,
                deployment.category,
                deployment.defillama_slug,
                deployment.contract_verified as i64,
                to_db_time(self.now()),
            ],
        )?;
        Ok(changed > 0)
    }

    /// Apply the allowed subset of fields and bump `updated_at`.
    /// Returns false when nothing was set or the id is unknown.
    pub fn update_deployment(&self, id: &str, update: &DeploymentUpdate) -> AppResult<bool> {
        if update.is_empty() {
            return Ok(false);
        }

        let mut sets: Vec<&str> = Vec::new();
        let mut values: Vec<SqlValue> = Vec::new();
        if let Some(address) = &update.contract_address {
            sets.push("contract_address = ?");
            values.push(SqlValue::Text(address.clone()));
        }
        if let Some(category) = &update.category {
            sets.push("category = ?");
            values.push(SqlValue::Text(category.clone()));
        }
        if let Some(slug) = &update.defillama_slug {
            sets.push("defillama_slug = ?");
            values.push(SqlValue::Text(slug.clone()));
        }
        if let Some(verified) = update.contract_verified {
            sets.push("contract_verified = ?");
            values.push(SqlValue::Integer(verified as i64));
        }
        sets.push("updated_at = ?");
        values.push(SqlValue::Text(to_db_time(self.now())));
        values.push(SqlValue::Text(id.to_string()));

        let sql = format!("UPDATE deployments SET {} WHERE id = ?", sets.join(", "));
        let conn = self.lock()?;
        let changed = conn.execute(&sql, params_from_iter(values))?;
        Ok(changed > 0)
    }

    pub fn get_deployment(&self, id: &str) -> AppResult<Option<Deployment>> {
        let conn = self.lock()?;
        let deployment = conn
            .query_row(
                &format!("SELECT {} FROM deployments WHERE id = ?1", DEPLOYMENT_COLUMNS),
                params![id],
                deployment_from_row,
            )
            .optional()?;
        Ok(deployment)
    }

    /// All deployments in insertion order
    pub fn get_all_deployments(&self) -> AppResult<Vec<Deployment>> {
        let conn = self.lock()?;
        query_all(
            &conn,
            &format!("SELECT {} FROM deployments ORDER BY rowid ASC", DEPLOYMENT_COLUMNS),
            [],
            deployment_from_row,
        )
    }

    /// Deployments with a resolved address, insertion order
    pub fn get_deployments_with_address(&self) -> AppResult<Vec<Deployment>> {
        let conn = self.lock()?;
        query_all(
            &conn,
            &format!(
                "SELECT {} FROM deployments
                 WHERE contract_address IS NOT NULL AND contract_address != ''
                 ORDER BY rowid ASC",
                DEPLOYMENT_COLUMNS
            ),
            [],
            deployment_from_row,
        )
    }

    /// Deployments still waiting for an address, insertion order
    pub fn get_deployments_without_address(&self) -> AppResult<Vec<Deployment>> {
        let conn = self.lock()?;
        query_all(
            &conn,
            &format!(
                "SELECT {} FROM deployments
                 WHERE contract_address IS NULL OR contract_address = ''
                 ORDER BY rowid ASC",
                DEPLOYMENT_COLUMNS
            ),
            [],
            deployment_from_row,
        )
    }

    pub fn get_deployment_count(&self) -> AppResult<i64> {
        let conn = self.lock()?;
        let count = conn.query_row("SELECT COUNT(*) FROM deployments", [], |row| row.get(0))?;
        Ok(count)
    }

    /// Deployments created in the last `hours`, newest first
    pub fn get_recent_deployments(&self, hours: i64) -> AppResult<Vec<Deployment>> {
        let since = ChronoDuration::try_hours(hours)
            .and_then(|window| self.now().checked_sub_signed(window))
            .map(to_db_time)
            .ok_or_else(|| {
                AppError::invalid_config(format!("Recent window out of range: {}h", hours))
            })?;
        let conn = self.lock()?;
        query_all(
            &conn,
            &format!(
                "SELECT {} FROM deployments WHERE created_at >= ?1 ORDER BY created_at DESC",
                DEPLOYMENT_COLUMNS
            ),
            params![since],
            deployment_from_row,
        )
    }

    // ============================================
    // PROJECT METRICS
    // ============================================

    pub fn insert_project_metrics(&self, metrics: &NewProjectMetrics) -> AppResult<i64> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO project_metrics
                (deployment_id, tvl_usd, tx_count, tx_count_delta, balance_wei, balance_eth,
                 is_verified, score, classification, snapshot_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                metrics.deployment_id,
                metrics.tvl_usd,
                metrics.tx_count,
                metrics.tx_count_delta,
                metrics.balance_wei.map(|w| w.to_string()),
                metrics.balance_eth,
                metrics.is_verified.map(|v| v as i64),
                metrics.score.map(i64::from),
                metrics.classification.map(|c| c.as_str()),
                to_db_time(metrics.snapshot_at),
            ],
        )?;
        let id = conn.last_insert_rowid();
        debug!("💾 project snapshot {} for {}", id, metrics.deployment_id);
        Ok(id)
    }

    pub fn get_latest_project_metrics(
        &self,
        deployment_id: &str,
    ) -> AppResult<Option<ProjectMetricsSnapshot>> {
        let conn = self.lock()?;
        let latest = conn
            .query_row(
                &format!(
                    "SELECT {} FROM project_metrics WHERE deployment_id = ?1
                     ORDER BY snapshot_at DESC, id DESC LIMIT 1",
                    PROJECT_METRICS_COLUMNS
                ),
                params![deployment_id],
                project_metrics_from_row,
            )
            .optional()?;
        Ok(latest)
    }

    /// Newest first
    pub fn get_project_metrics_history(
        &self,
        deployment_id: &str,
        limit: u32,
    ) -> AppResult<Vec<ProjectMetricsSnapshot>> {
        let conn = self.lock()?;
        query_all(
            &conn,
            &format!(
                "SELECT {} FROM project_metrics WHERE deployment_id = ?1
                 ORDER BY snapshot_at DESC, id DESC LIMIT ?2",
                PROJECT_METRICS_COLUMNS
            ),
            params![deployment_id, limit],
            project_metrics_from_row,
        )
    }

    /// Snapshots taken at or after `since`, newest first
    pub fn get_project_metrics_since(
        &self,
        deployment_id: &str,
        since: DateTime<Utc>,
    ) -> AppResult<Vec<ProjectMetricsSnapshot>> {
        let conn = self.lock()?;
        query_all(
            &conn,
            &format!(
                "SELECT {} FROM project_metrics WHERE deployment_id = ?1 AND snapshot_at >= ?2
                 ORDER BY snapshot_at DESC, id DESC",
                PROJECT_METRICS_COLUMNS
            ),
            params![deployment_id, to_db_time(since)],
            project_metrics_from_row,
        )
    }

    // ============================================
    // ECOSYSTEM METRICS
    // ============================================

    pub fn insert_ecosystem_metrics(&self, metrics: &NewEcosystemMetrics) -> AppResult<i64> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO ecosystem_metrics
                (total_tvl, total_addresses, total_txs, txs_24h, avg_gas_price, avg_block_time,
                 deployment_count, snapshot_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                metrics.total_tvl,
                metrics.total_addresses,
                metrics.total_txs,
                metrics.txs_24h,
                metrics.avg_gas_price,
                metrics.avg_block_time,
                metrics.deployment_count,
                to_db_time(metrics.snapshot_at),
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    pub fn get_latest_ecosystem_metrics(&self) -> AppResult<Option<EcosystemMetricsSnapshot>> {
        let conn = self.lock()?;
        let latest = conn
            .query_row(
                &format!(
                    "SELECT {} FROM ecosystem_metrics ORDER BY snapshot_at DESC, id DESC LIMIT 1",
                    ECOSYSTEM_COLUMNS
                ),
                [],
                ecosystem_from_row,
            )
            .optional()?;
        Ok(latest)
    }

    /// Newest first
    pub fn get_ecosystem_metrics_history(
        &self,
        limit: u32,
    ) -> AppResult<Vec<EcosystemMetricsSnapshot>> {
        let conn = self.lock()?;
        query_all(
            &conn,
            &format!(
                "SELECT {} FROM ecosystem_metrics ORDER BY snapshot_at DESC, id DESC LIMIT ?1",
                ECOSYSTEM_COLUMNS
            ),
            params![limit],
            ecosystem_from_row,
        )
    }

    // ============================================
    // MILESTONES
    // ============================================

    /// Check-then-insert inside one transaction. An existing tuple is
    /// returned as is; its `actual_value` and `alerted` are not touched.
    pub fn insert_milestone(&self, milestone: &NewMilestone) -> AppResult<MilestoneInsert> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;

        let existing = tx
            .query_row(
                &format!(
                    "SELECT {} FROM milestones
                     WHERE type = ?1 AND subject IS ?2 AND metric = ?3 AND threshold = ?4",
                    MILESTONE_COLUMNS
                ),
                params![
                    milestone.kind.as_str(),
                    milestone.subject,
                    milestone.metric.as_str(),
                    milestone.threshold,
                ],
                milestone_from_row,
            )
            .optional()?;

        if let Some(found) = existing {
            tx.commit()?;
            return Ok(MilestoneInsert::Existing(found));
        }

        let created_at = self.now();
        tx.execute(
            "INSERT INTO milestones (type, subject, metric, threshold, actual_value, alerted, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, 0, ?6)",
            params![
                milestone.kind.as_str(),
                milestone.subject,
                milestone.metric.as_str(),
                milestone.threshold,
                milestone.actual_value,
                to_db_time(created_at),
            ],
        )?;
        let id = tx.last_insert_rowid();
        tx.commit()?;

        Ok(MilestoneInsert::Created(Milestone {
            id,
            kind: milestone.kind,
            subject: milestone.subject.clone(),
            metric: milestone.metric,
            threshold: milestone.threshold,
            actual_value: milestone.actual_value,
            alerted: false,
            created_at,
        }))
    }

    /// Unalerted milestones in creation order
    pub fn get_unalerted_milestones(&self) -> AppResult<Vec<Milestone>> {
        let conn = self.lock()?;
        query_all(
            &conn,
            &format!(
                "SELECT {} FROM milestones WHERE alerted = 0 ORDER BY created_at ASC, id ASC",
                MILESTONE_COLUMNS
            ),
            [],
            milestone_from_row,
        )
    }

    /// Flip `alerted` false→true; returns false if already alerted or unknown
    pub fn mark_milestone_alerted(&self, id: i64) -> AppResult<bool> {
        let conn = self.lock()?;
        let changed = conn.execute(
            "UPDATE milestones SET alerted = 1 WHERE id = ?1 AND alerted = 0",
            params![id],
        )?;
        Ok(changed > 0)
    }

    // ============================================
    // ADDRESS RESOLUTION LOG
    // ============================================

    pub fn log_address_resolution(&self, attempt: &NewResolutionAttempt) -> AppResult<i64> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO address_resolutions
                (deployment_id, method, query, result_address, confidence, success, attempted_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                attempt.deployment_id,
                attempt.method.as_str(),
                attempt.query,
                attempt.result_address,
                attempt.confidence,
                attempt.success as i64,
                to_db_time(self.now()),
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    /// Attempts for one deployment, oldest first
    pub fn get_resolution_attempts(
        &self,
        deployment_id: &str,
    ) -> AppResult<Vec<ResolutionAttempt>> {
        let conn = self.lock()?;
        query_all(
            &conn,
            &format!(
                "SELECT {} FROM address_resolutions WHERE deployment_id = ?1 ORDER BY id ASC",
                RESOLUTION_COLUMNS
            ),
            params![deployment_id],
            resolution_from_row,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::errors::ErrorCode;
    use alloy_primitives::U256;
    use chrono::TimeZone;
    use std::sync::Arc;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap()
    }

    fn store() -> Store {
        Store::open_in_memory().unwrap().with_clock(Arc::new(t0))
    }

    fn snapshot(deployment_id: &str, tx_count: i64, at: DateTime<Utc>) -> NewProjectMetrics {
        NewProjectMetrics {
            deployment_id: deployment_id.to_string(),
            tvl_usd: Some(1000.0),
            tx_count: Some(tx_count),
            tx_count_delta: None,
            balance_wei: Some(U256::from(2_000_000_000_000_000_000u128)),
            balance_eth: Some(2.0),
            is_verified: Some(true),
            score: Some(55),
            classification: Some(Classification::Routine),
            snapshot_at: at,
        }
    }

    fn ecosystem_tvl_milestone(threshold: f64, actual: f64) -> NewMilestone {
        NewMilestone {
            kind: MilestoneKind::Ecosystem,
            subject: None,
            metric: MilestoneMetric::Tvl,
            threshold,
            actual_value: actual,
        }
    }

    #[test]
    fn test_insert_deployment_first_wins() {
        let store = store();
        let mut first = Deployment::new("d1", "aave");
        first.category = Some("defi".to_string());
        assert!(store.insert_deployment(&first).unwrap());

        let second = Deployment::new("d1", "renamed");
        assert!(!store.insert_deployment(&second).unwrap());

        let stored = store.get_deployment("d1").unwrap().unwrap();
        assert_eq!(stored.project, "aave");
        assert_eq!(stored.category.as_deref(), Some("defi"));
        assert_eq!(store.get_deployment_count().unwrap(), 1);
    }

    #[test]
    fn test_update_deployment_allowed_fields() {
        let store = store();
        store.insert_deployment(&Deployment::new("d1", "gte")).unwrap();

        assert!(!store.update_deployment("d1", &DeploymentUpdate::default()).unwrap());
        let update = DeploymentUpdate {
            contract_address: Some("0x1111111111111111111111111111111111111111".to_string()),
            contract_verified: Some(true),
            ..Default::default()
        };
        assert!(store.update_deployment("d1", &update).unwrap());
        assert!(!store.update_deployment("missing", &update).unwrap());

        let stored = store.get_deployment("d1").unwrap().unwrap();
        assert!(stored.contract_verified);
        assert_eq!(stored.updated_at, Some(t0()));
        assert_eq!(store.get_deployments_with_address().unwrap().len(), 1);
        assert!(store.get_deployments_without_address().unwrap().is_empty());
    }

    #[test]
    fn test_deployments_keep_insertion_order() {
        let store = store();
        for (id, name) in [("z", "first"), ("a", "second"), ("m", "third")] {
            store.insert_deployment(&Deployment::new(id, name)).unwrap();
        }
        let names: Vec<String> = store
            .get_deployments_without_address()
            .unwrap()
            .into_iter()
            .map(|d| d.project)
            .collect();
        assert_eq!(names, vec!["first", "second", "third"]);
    }

    #[test]
    fn test_recent_deployments_window() {
        let store = store();
        let mut fresh = Deployment::new("fresh", "fresh");
        fresh.created_at = Some(t0() - ChronoDuration::hours(2));
        let mut old = Deployment::new("old", "old");
        old.created_at = Some(t0() - ChronoDuration::days(3));
        store.insert_deployment(&fresh).unwrap();
        store.insert_deployment(&old).unwrap();
        store.insert_deployment(&Deployment::new("undated", "undated")).unwrap();

        let recent = store.get_recent_deployments(24).unwrap();
        assert_eq!(recent.len(), 1);
        assert_eq!(recent[0].id, "fresh");
    }

    #[test]
    fn test_recent_deployments_rejects_huge_window() {
        let store = store();
        store.insert_deployment(&Deployment::new("d1", "gte")).unwrap();

        let err = store.get_recent_deployments(i64::MAX).unwrap_err();
        assert_eq!(err.code, ErrorCode::ConfigInvalidValue);
        assert!(store.get_recent_deployments(-i64::MAX).is_err());
    }

    #[test]
    fn test_latest_snapshot_breaks_ties_by_id() {
        let store = store();
        store.insert_deployment(&Deployment::new("d1", "aave")).unwrap();
        store.insert_project_metrics(&snapshot("d1", 10, t0())).unwrap();
        let second = store.insert_project_metrics(&snapshot("d1", 20, t0())).unwrap();
        store
            .insert_project_metrics(&snapshot("d1", 5, t0() - ChronoDuration::hours(1)))
            .unwrap();

        let latest = store.get_latest_project_metrics("d1").unwrap().unwrap();
        assert_eq!(latest.id, second);
        assert_eq!(latest.tx_count, Some(20));
        assert_eq!(latest.balance_wei, Some(U256::from(2_000_000_000_000_000_000u128)));
        assert_eq!(latest.classification, Some(Classification::Routine));
        assert_eq!(latest.score, Some(55));

        assert_eq!(store.get_project_metrics_history("d1", 2).unwrap().len(), 2);
        let since = store
            .get_project_metrics_since("d1", t0() - ChronoDuration::minutes(30))
            .unwrap();
        assert_eq!(since.len(), 2);
    }

    #[test]
    fn test_project_metrics_require_deployment() {
        let store = store();
        assert!(store.insert_project_metrics(&snapshot("ghost", 1, t0())).is_err());
    }

    #[test]
    fn test_ecosystem_snapshot_keeps_nulls() {
        let store = store();
        assert!(store.get_latest_ecosystem_metrics().unwrap().is_none());
        store
            .insert_ecosystem_metrics(&NewEcosystemMetrics {
                total_tvl: None,
                total_addresses: Some(15_000),
                total_txs: Some(2_500_000),
                txs_24h: None,
                avg_gas_price: Some("0.002".to_string()),
                avg_block_time: None,
                deployment_count: 41,
                snapshot_at: t0(),
            })
            .unwrap();

        let latest = store.get_latest_ecosystem_metrics().unwrap().unwrap();
        assert!(latest.total_tvl.is_none());
        assert_eq!(latest.total_addresses, Some(15_000));
        assert_eq!(latest.deployment_count, Some(41));
        assert_eq!(latest.snapshot_at, t0());
        assert_eq!(
            store
                .get_ecosystem_metrics_history(DEFAULT_HISTORY_LIMIT)
                .unwrap()
                .len(),
            1
        );
    }

    #[test]
    fn test_milestone_insert_is_idempotent() {
        let store = store();
        let first = store.insert_milestone(&ecosystem_tvl_milestone(1e6, 1.2e6)).unwrap();
        assert!(first.is_new());

        let again = store.insert_milestone(&ecosystem_tvl_milestone(1e6, 9.9e6)).unwrap();
        assert!(!again.is_new());
        assert_eq!(again.milestone().id, first.milestone().id);
        assert_eq!(again.milestone().actual_value, 1.2e6);
        assert_eq!(store.get_unalerted_milestones().unwrap().len(), 1);
    }

    #[test]
    fn test_milestone_subject_is_part_of_tuple() {
        let store = store();
        let project = |subject: &str| NewMilestone {
            kind: MilestoneKind::Project,
            subject: Some(subject.to_string()),
            metric: MilestoneMetric::Tvl,
            threshold: 10e3,
            actual_value: 20e3,
        };
        assert!(store.insert_milestone(&project("aave")).unwrap().is_new());
        assert!(store.insert_milestone(&project("gte")).unwrap().is_new());
        assert!(!store.insert_milestone(&project("aave")).unwrap().is_new());
        // project vs ecosystem with the same metric/threshold are distinct
        assert!(store
            .insert_milestone(&ecosystem_tvl_milestone(10e3, 20e3))
            .unwrap()
            .is_new());
        assert_eq!(store.get_unalerted_milestones().unwrap().len(), 3);
    }

    #[test]
    fn test_mark_alerted_survives_reinsert() {
        let store = store();
        let created = store.insert_milestone(&ecosystem_tvl_milestone(5e6, 6e6)).unwrap();
        let id = created.milestone().id;

        assert!(store.mark_milestone_alerted(id).unwrap());
        assert!(!store.mark_milestone_alerted(id).unwrap());

        let again = store.insert_milestone(&ecosystem_tvl_milestone(5e6, 7e6)).unwrap();
        assert!(again.milestone().alerted);
        assert!(store.get_unalerted_milestones().unwrap().is_empty());
    }

    #[test]
    fn test_unalerted_in_creation_order() {
        let store = store();
        for threshold in [10e6, 1e6, 5e6] {
            store
                .insert_milestone(&ecosystem_tvl_milestone(threshold, 12e6))
                .unwrap();
        }
        let thresholds: Vec<f64> = store
            .get_unalerted_milestones()
            .unwrap()
            .iter()
            .map(|m| m.threshold)
            .collect();
        assert_eq!(thresholds, vec![10e6, 1e6, 5e6]);
    }

    #[test]
    fn test_resolution_log() {
        let store = store();
        store.insert_deployment(&Deployment::new("d1", "aave")).unwrap();
        store
            .log_address_resolution(&NewResolutionAttempt {
                deployment_id: "d1".to_string(),
                method: ResolutionMethod::AllMethodsFailed,
                query: Some("aave".to_string()),
                result_address: None,
                confidence: 0.0,
                success: false,
            })
            .unwrap();

        let attempts = store.get_resolution_attempts("d1").unwrap();
        assert_eq!(attempts.len(), 1);
        assert_eq!(attempts[0].method, ResolutionMethod::AllMethodsFailed);
        assert!(!attempts[0].success);
        assert_eq!(attempts[0].attempted_at, t0());
    }

    #[test]
    fn test_open_creates_parent_dir() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("tracker.db");
        let store = Store::open(&path).unwrap();
        store.insert_deployment(&Deployment::new("d1", "aave")).unwrap();
        drop(store);

        let reopened = Store::open(&path).unwrap();
        assert_eq!(reopened.get_deployment_count().unwrap(), 1);
    }
}
