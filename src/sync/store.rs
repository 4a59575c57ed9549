//! Raw-SQL helpers against the sync bookkeeping tables:
//! `sync_queue`, `artifact_pins`, and `sync_events`. Circuit breaker state
//! and quarantine records have their own persistence on
//! [`super::breaker::CircuitBreaker`] and [`super::quarantine::ArtifactQuarantineStore`].

use crate::error::{SyncError, SyncResult};
use rusqlite::{params, Connection};

pub fn enqueue(
    conn: &Connection,
    repo_id: &str,
    local_snapshot: &str,
    parent_snapshot: Option<&str>,
    payload: &str,
) -> SyncResult<i64> {
    conn.execute(
        "INSERT INTO sync_queue (repo_id, local_snapshot, parent_snapshot, payload, status)
         VALUES (?1, ?2, ?3, ?4, 'pending')",
        params![repo_id, local_snapshot, parent_snapshot, payload],
    )
    .map_err(|e| SyncError::Transport(e.to_string()))?;
    Ok(conn.last_insert_rowid())
}

pub fn mark_queue_status(conn: &Connection, queue_id: i64, status: &str) -> SyncResult<()> {
    conn.execute(
        "UPDATE sync_queue SET status = ?1, updated_at_utc = CURRENT_TIMESTAMP WHERE id = ?2",
        params![status, queue_id],
    )
    .map_err(|e| SyncError::Transport(e.to_string()))?;
    Ok(())
}

pub fn record_event(conn: &Connection, repo_id: &str, event_type: &str, detail: &str) -> SyncResult<()> {
    conn.execute(
        "INSERT INTO sync_events (repo_id, event_type, detail) VALUES (?1, ?2, ?3)",
        params![repo_id, event_type, detail],
    )
    .map_err(|e| SyncError::Transport(e.to_string()))?;
    Ok(())
}

pub fn pin_artifact(conn: &Connection, repo_id: &str, snapshot_id: &str, artifact_id: &str) -> SyncResult<()> {
    conn.execute(
        "INSERT INTO artifact_pins (repo_id, snapshot_id, artifact_id)
         VALUES (?1, ?2, ?3)
         ON CONFLICT(repo_id, snapshot_id) DO UPDATE SET
            artifact_id = excluded.artifact_id,
            pinned_at_utc = CURRENT_TIMESTAMP",
        params![repo_id, snapshot_id, artifact_id],
    )
    .map_err(|e| SyncError::Transport(e.to_string()))?;
    Ok(())
}

pub fn latest_parse_failures(conn: &Connection) -> SyncResult<u64> {
    conn.query_row(
        "SELECT parse_failures FROM indexing_diagnostics ORDER BY id DESC LIMIT 1",
        [],
        |row| row.get::<_, i64>(0),
    )
    .map(|v| v as u64)
    .or_else(|e| match e {
        rusqlite::Error::QueryReturnedNoRows => Ok(0),
        other => Err(SyncError::Transport(other.to_string())),
    })
}
