//! Auxiliary tables for hybrid control-plane sync and cross-repo federation.
//! Kept in the same database file as the core graph so a single
//! `GraphStore` handle drives indexing, querying, and sync bookkeeping.

pub const SYNC_SCHEMA_STATEMENTS: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS sync_queue (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        repo_id TEXT NOT NULL,
        local_snapshot TEXT NOT NULL,
        parent_snapshot TEXT,
        payload TEXT NOT NULL,
        status TEXT NOT NULL DEFAULT 'pending',
        created_at_utc TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
        updated_at_utc TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
    );",
    "CREATE TABLE IF NOT EXISTS artifact_pins (
        repo_id TEXT NOT NULL,
        snapshot_id TEXT NOT NULL,
        artifact_id TEXT NOT NULL,
        pinned_at_utc TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
        PRIMARY KEY (repo_id, snapshot_id)
    );",
    "CREATE TABLE IF NOT EXISTS circuit_breaker_state (
        breaker_name TEXT PRIMARY KEY,
        state TEXT NOT NULL DEFAULT 'closed',
        consecutive_failures INTEGER NOT NULL DEFAULT 0,
        opened_at_utc TEXT,
        updated_at_utc TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
    );",
    "CREATE TABLE IF NOT EXISTS quarantined_artifacts (
        artifact_id TEXT PRIMARY KEY,
        repo_id TEXT NOT NULL,
        reason TEXT NOT NULL,
        quarantined_at_utc TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
    );",
    "CREATE TABLE IF NOT EXISTS sync_events (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        repo_id TEXT NOT NULL,
        event_type TEXT NOT NULL,
        detail TEXT,
        occurred_at_utc TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
    );",
    "CREATE TABLE IF NOT EXISTS tool_metrics (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        tool_name TEXT NOT NULL,
        cache_hit BOOLEAN NOT NULL,
        lookup_ms REAL NOT NULL,
        compute_ms REAL NOT NULL,
        total_ms REAL NOT NULL,
        recorded_at_utc TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
    );",
    "CREATE TABLE IF NOT EXISTS indexing_diagnostics (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        run_id TEXT NOT NULL,
        ambiguity_rate REAL NOT NULL DEFAULT 0.0,
        unresolved_imports INTEGER NOT NULL DEFAULT 0,
        parse_failures INTEGER NOT NULL DEFAULT 0,
        recorded_at_utc TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
    );",
    "CREATE INDEX IF NOT EXISTS idx_sync_queue_status ON sync_queue(status);",
    "CREATE INDEX IF NOT EXISTS idx_sync_events_repo ON sync_events(repo_id);",
    "CREATE INDEX IF NOT EXISTS idx_tool_metrics_tool ON tool_metrics(tool_name);",
];
