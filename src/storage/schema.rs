//! SQLite schema
//!
//! Timestamps are RFC3339 UTC text with millisecond precision, so text
//! ordering equals time ordering.

use rusqlite::Connection;

pub const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS deployments (
    id TEXT PRIMARY KEY,
    project TEXT NOT NULL,
    url TEXT,
    tweet_text TEXT,
    created_at TEXT,
    contract_address TEXT,
    category TEXT,
    defillama_slug TEXT,
    contract_verified INTEGER NOT NULL DEFAULT 0,
    updated_at TEXT
);

CREATE TABLE IF NOT EXISTS project_metrics (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    deployment_id TEXT NOT NULL REFERENCES deployments(id),
    tvl_usd REAL,
    tx_count INTEGER,
    tx_count_delta INTEGER,
    balance_wei TEXT,
    balance_eth REAL,
    is_verified INTEGER,
    score INTEGER,
    classification TEXT,
    snapshot_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_project_metrics_latest
    ON project_metrics(deployment_id, snapshot_at DESC, id DESC);

CREATE TABLE IF NOT EXISTS ecosystem_metrics (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    total_tvl REAL,
    total_addresses INTEGER,
    total_txs INTEGER,
    txs_24h INTEGER,
    avg_gas_price TEXT,
    avg_block_time REAL,
    deployment_count INTEGER,
    snapshot_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_ecosystem_metrics_latest
    ON ecosystem_metrics(snapshot_at DESC, id DESC);

CREATE TABLE IF NOT EXISTS milestones (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    type TEXT NOT NULL,
    subject TEXT,
    metric TEXT NOT NULL,
    threshold REAL NOT NULL,
    actual_value REAL NOT NULL,
    alerted INTEGER NOT NULL DEFAULT 0,
    created_at TEXT NOT NULL
);

-- one row per (type, subject, metric, threshold); NULL subject is a single value
CREATE UNIQUE INDEX IF NOT EXISTS idx_milestones_tuple
    ON milestones(type, IFNULL(subject, ''), metric, threshold);

CREATE INDEX IF NOT EXISTS idx_milestones_unalerted
    ON milestones(alerted, created_at);

CREATE TABLE IF NOT EXISTS address_resolutions (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    deployment_id TEXT NOT NULL REFERENCES deployments(id),
    method TEXT NOT NULL,
    query TEXT,
    result_address TEXT,
    confidence REAL NOT NULL,
    success INTEGER NOT NULL,
    attempted_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_address_resolutions_deployment
    ON address_resolutions(deployment_id);
";

pub fn initialize(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(SCHEMA)
}
