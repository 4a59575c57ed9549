//! Quarantine store for artifacts that fail checksum or compatibility
//! checks. Persisted to `quarantined_artifacts` so a
//! quarantine survives process restarts.

use crate::error::SyncResult;
use rusqlite::{params, Connection};
use std::collections::HashMap;

#[derive(Debug, Clone)]
pub struct QuarantineRecord {
    pub artifact_id: String,
    pub repo_id: String,
    pub reason: String,
    pub quarantined_at_utc: String,
}

#[derive(Debug, Clone, Default)]
pub struct ArtifactQuarantineStore {
    records: HashMap<String, QuarantineRecord>,
}

impl ArtifactQuarantineStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_quarantined(&self, artifact_id: &str) -> bool {
        self.records.contains_key(artifact_id)
    }

    pub fn add(&mut self, artifact_id: impl Into<String>, repo_id: impl Into<String>, reason: impl Into<String>, quarantined_at_utc: impl Into<String>) {
        let artifact_id = artifact_id.into();
        self.records.insert(
            artifact_id.clone(),
            QuarantineRecord {
                artifact_id,
                repo_id: repo_id.into(),
                reason: reason.into(),
                quarantined_at_utc: quarantined_at_utc.into(),
            },
        );
    }

    pub fn records(&self) -> impl Iterator<Item = &QuarantineRecord> {
        self.records.values()
    }

    pub fn preload(conn: &Connection) -> SyncResult<Self> {
        let mut store = Self::new();
        let mut stmt = conn
            .prepare("SELECT artifact_id, repo_id, reason, quarantined_at_utc FROM quarantined_artifacts")
            .map_err(|e| crate::error::SyncError::Transport(e.to_string()))?;
        let rows = stmt
            .query_map([], |row| {
                Ok(QuarantineRecord {
                    artifact_id: row.get(0)?,
                    repo_id: row.get(1)?,
                    reason: row.get(2)?,
                    quarantined_at_utc: row.get(3)?,
                })
            })
            .map_err(|e| crate::error::SyncError::Transport(e.to_string()))?;
        for row in rows {
            let record = row.map_err(|e| crate::error::SyncError::Transport(e.to_string()))?;
            store.records.insert(record.artifact_id.clone(), record);
        }
        Ok(store)
    }

    pub fn persist(&self, conn: &Connection, artifact_id: &str) -> SyncResult<()> {
        let Some(record) = self.records.get(artifact_id) else {
            return Ok(());
        };
        conn.execute(
            "INSERT INTO quarantined_artifacts (artifact_id, repo_id, reason, quarantined_at_utc)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(artifact_id) DO UPDATE SET
                reason = excluded.reason,
                quarantined_at_utc = excluded.quarantined_at_utc",
            params![record.artifact_id, record.repo_id, record.reason, record.quarantined_at_utc],
        )
        .map_err(|e| crate::error::SyncError::Transport(e.to_string()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_then_is_quarantined() {
        let mut store = ArtifactQuarantineStore::new();
        assert!(!store.is_quarantined("a1"));
        store.add("a1", "repo", "checksum_mismatch", "2026-01-01T00:00:00Z");
        assert!(store.is_quarantined("a1"));
    }
}
